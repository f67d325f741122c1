//! Method-bind invocation
//!
//! The engine dispatches to any native method through two interface
//! functions, both resolved with the `get_proc_address` function it hands to
//! the extension's entry point:
//! - `object_method_bind_ptrcall`: every argument travels as the address of
//!   its in-memory representation, the result is written through one return
//!   address
//! - `object_method_bind_call`: arguments and result are variants, and
//!   failures come back as a call error

use crate::callframe::{Addr, Args};
use std::ffi::{c_char, c_void, CStr};
use std::fmt;
use thiserror::Error;

/// Interface name of the pointer-call function
// SAFETY: the literal ends in its only NUL byte.
pub const PTRCALL_PROC: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"object_method_bind_ptrcall\0") };

/// Interface name of the variant-call function
// SAFETY: the literal ends in its only NUL byte.
pub const METHOD_BIND_CALL_PROC: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"object_method_bind_call\0") };

/// FFI call errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("null method bind")]
    NullMethodBind,

    #[error("nil object dereference")]
    NullObject,

    #[error("interface function '{0}' not provided by get_proc_address")]
    ProcNotFound(String),

    #[error("method call failed: {kind:?} (argument {argument}, expected {expected})")]
    Call {
        kind: CallErrorKind,
        argument: i32,
        expected: i32,
    },
}

/// Failure reported by `object_method_bind_call`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallErrorKind {
    InvalidMethod,
    InvalidArgument,
    TooManyArguments,
    TooFewArguments,
    InstanceIsNull,
    MethodNotConst,
    /// A code this crate does not know about
    Unknown(i32),
}

impl CallErrorKind {
    /// `None` for the success code 0
    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            0 => return None,
            1 => Self::InvalidMethod,
            2 => Self::InvalidArgument,
            3 => Self::TooManyArguments,
            4 => Self::TooFewArguments,
            5 => Self::InstanceIsNull,
            6 => Self::MethodNotConst,
            other => Self::Unknown(other),
        };
        Some(kind)
    }
}

/// The engine's call error record, filled in by `object_method_bind_call`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCallError {
    pub error: i32,
    pub argument: i32,
    pub expected: i32,
}

impl RawCallError {
    pub fn into_result(self) -> Result<(), CallError> {
        match CallErrorKind::from_code(self.error) {
            None => Ok(()),
            Some(kind) => Err(CallError::Call {
                kind,
                argument: self.argument,
                expected: self.expected,
            }),
        }
    }
}

/// Opaque handle to a native method, from the engine's method-bind table
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodBind(*const c_void);

impl MethodBind {
    pub const fn from_raw(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for MethodBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodBind({:p})", self.0)
    }
}

// SAFETY: a method bind is an immutable table entry owned by the engine.
unsafe impl Send for MethodBind {}
unsafe impl Sync for MethodBind {}

/// Opaque handle to a native object
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(*mut c_void);

impl ObjectHandle {
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub const fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({:p})", self.0)
    }
}

/// Signature of the engine's `get_proc_address`: looks up an interface
/// function by NUL-terminated name, null when there is none
pub type GetProcAddressFn = unsafe extern "C" fn(name: *const c_char) -> *const c_void;

/// Signature of `object_method_bind_ptrcall`
pub type PtrCallFn =
    unsafe extern "C" fn(method: MethodBind, object: ObjectHandle, args: *const Addr, ret: Addr);

/// Signature of `object_method_bind_call`
pub type MethodBindCallFn = unsafe extern "C" fn(
    method: MethodBind,
    object: ObjectHandle,
    args: *const Addr,
    arg_count: i64,
    ret: Addr,
    error: *mut RawCallError,
);

/// # Safety
///
/// `get_proc_address` must be the engine's lookup function (or behave like it).
unsafe fn resolve(
    get_proc_address: GetProcAddressFn,
    name: &'static CStr,
) -> Result<*const c_void, CallError> {
    let proc = get_proc_address(name.as_ptr());
    if proc.is_null() {
        return Err(CallError::ProcNotFound(name.to_string_lossy().into_owned()));
    }
    Ok(proc)
}

fn check_method(method: MethodBind) -> Result<(), CallError> {
    if method.is_null() {
        return Err(CallError::NullMethodBind);
    }
    Ok(())
}

/// The engine's pointer-call entry point
#[derive(Clone, Copy)]
pub struct PtrCall {
    fn_ptr: PtrCallFn,
}

impl PtrCall {
    pub fn new(fn_ptr: PtrCallFn) -> Self {
        Self { fn_ptr }
    }

    /// Resolve `object_method_bind_ptrcall` through the engine's lookup.
    ///
    /// # Safety
    ///
    /// `get_proc_address` must be the function the engine passed to the
    /// extension's entry point, or one that returns functions of the same
    /// signatures.
    pub unsafe fn from_proc_address(get_proc_address: GetProcAddressFn) -> Result<Self, CallError> {
        let proc = resolve(get_proc_address, PTRCALL_PROC)?;
        Ok(Self::new(std::mem::transmute::<*const c_void, PtrCallFn>(proc)))
    }

    /// Call `method` on `object`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - `args` holds exactly the arguments `method` expects, each in its
    ///   native representation
    /// - `ret` addresses a slot large enough for the method's result, or is
    ///   null when the method returns nothing
    /// - `object` is a live instance of a class that has `method`
    pub unsafe fn call(
        &self,
        method: MethodBind,
        object: ObjectHandle,
        args: Args<'_>,
        ret: Addr,
    ) -> Result<(), CallError> {
        if object.is_null() {
            return Err(CallError::NullObject);
        }
        self.invoke(method, object, args, ret)
    }

    /// Call a static `method`, which takes no object.
    ///
    /// # Safety
    ///
    /// Same requirements as [`PtrCall::call`], minus the object.
    pub unsafe fn call_static(
        &self,
        method: MethodBind,
        args: Args<'_>,
        ret: Addr,
    ) -> Result<(), CallError> {
        self.invoke(method, ObjectHandle::null(), args, ret)
    }

    unsafe fn invoke(
        &self,
        method: MethodBind,
        object: ObjectHandle,
        args: Args<'_>,
        ret: Addr,
    ) -> Result<(), CallError> {
        check_method(method)?;
        (self.fn_ptr)(method, object, args.as_ptr(), ret);
        Ok(())
    }

    pub fn as_fn_ptr(&self) -> PtrCallFn {
        self.fn_ptr
    }
}

impl fmt::Debug for PtrCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtrCall({:p})", self.fn_ptr as *const ())
    }
}

/// The engine's variant-call entry point
#[derive(Clone, Copy)]
pub struct MethodBindCall {
    fn_ptr: MethodBindCallFn,
}

impl MethodBindCall {
    pub fn new(fn_ptr: MethodBindCallFn) -> Self {
        Self { fn_ptr }
    }

    /// Resolve `object_method_bind_call` through the engine's lookup.
    ///
    /// # Safety
    ///
    /// Same requirements as [`PtrCall::from_proc_address`].
    pub unsafe fn from_proc_address(get_proc_address: GetProcAddressFn) -> Result<Self, CallError> {
        let proc = resolve(get_proc_address, METHOD_BIND_CALL_PROC)?;
        Ok(Self::new(std::mem::transmute::<*const c_void, MethodBindCallFn>(
            proc,
        )))
    }

    /// Call `method` on `object` with variant arguments.
    ///
    /// The argument count passed to the engine is `args.len()`. A failure the
    /// engine reports comes back as [`CallError::Call`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - every entry of `args` addresses an initialized variant
    /// - `ret` addresses a slot that can hold a variant
    /// - `object` is a live instance of a class that has `method`
    pub unsafe fn call(
        &self,
        method: MethodBind,
        object: ObjectHandle,
        args: Args<'_>,
        ret: Addr,
    ) -> Result<(), CallError> {
        if object.is_null() {
            return Err(CallError::NullObject);
        }
        check_method(method)?;

        let mut error = RawCallError::default();
        (self.fn_ptr)(
            method,
            object,
            args.as_ptr(),
            args.len() as i64,
            ret,
            &mut error,
        );
        error.into_result()
    }

    pub fn as_fn_ptr(&self) -> MethodBindCallFn {
        self.fn_ptr
    }
}

impl fmt::Debug for MethodBindCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodBindCall({:p})", self.fn_ptr as *const ())
    }
}
