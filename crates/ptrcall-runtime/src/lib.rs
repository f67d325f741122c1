//! ptrcall runtime
//!
//! Call-frame marshaling for engine method-bind calls:
//! - `callframe`: pooled fixed-size frames that stage arguments and returns
//! - `ffi`: method-bind handles and the pointer-call entry point

/// ptrcall runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod callframe;
pub mod ffi;

pub use callframe::{
    Addr, Args, ErrorKind, Frame, FrameError, FrameGuard, FramePool, Nil, PoolError, PoolStats,
    Ptr,
};
pub use ffi::{
    CallError, GetProcAddressFn, LibraryLoader, LoadError, MethodBind, MethodBindCall, ObjectHandle,
    PtrCall,
};
pub use ptrcall_config::{ConfigError, PoolConfig, MAX_IDLE_LIMIT};
