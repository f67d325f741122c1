//! Foreign Function Interface (FFI) seam to the engine
//!
//! - Method-bind and object handles
//! - The `object_method_bind_ptrcall` and `object_method_bind_call` entry
//!   points, resolved through the engine's `get_proc_address`
//! - Loading a host library that exports a get-proc-address function
//!
//! # Safety
//!
//! Calls through this module run foreign code. Argument and return layouts
//! are whatever the engine's API descriptor says; nothing here can check them.

pub mod caller;
pub mod loader;

pub use caller::{
    CallError, CallErrorKind, GetProcAddressFn, MethodBind, MethodBindCall, MethodBindCallFn,
    ObjectHandle, PtrCall, PtrCallFn, RawCallError, METHOD_BIND_CALL_PROC, PTRCALL_PROC,
};
pub use loader::{LibraryLoader, LoadError, DEFAULT_PROC_ADDRESS_SYMBOL};
