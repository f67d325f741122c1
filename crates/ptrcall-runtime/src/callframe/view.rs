//! Views onto frame slots
//!
//! - `Addr`: untyped address, ABI-compatible with `void *`
//! - `Ptr<'f, T>`: typed view over one slot of a frame
//! - `Nil`: return placeholder for methods without a result
//! - `Args<'a>`: contiguous run of argument addresses
//!
//! None of these own memory. Views created by a frame borrow it, so they
//! cannot outlive the call they were built for.

use super::frame::Frame;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;
use std::ptr::NonNull;
use std::slice;

/// Untyped address handed across the FFI boundary
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr(*mut c_void);

impl Addr {
    /// The null address
    pub const fn null() -> Self {
        Addr(std::ptr::null_mut())
    }

    pub fn from_ptr<T>(ptr: *mut T) -> Self {
        Addr(ptr.cast())
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// Address as an integer, as the native API spells it (`uintptr_t`)
    pub fn uintptr(self) -> usize {
        self.0 as usize
    }

    /// Copy a `T` out of the addressed memory.
    ///
    /// # Safety
    ///
    /// The address must be non-null, aligned for `T` and point to an
    /// initialized `T`.
    pub unsafe fn read<T: Copy>(self) -> T {
        self.0.cast::<T>().read()
    }

    /// Overwrite the addressed memory with `value`. Used to answer a return
    /// address the engine passed in.
    ///
    /// # Safety
    ///
    /// The address must be non-null, aligned for `T` and valid for writes of
    /// `size_of::<T>()` bytes.
    pub unsafe fn write<T: Copy>(self, value: T) {
        self.0.cast::<T>().write(value)
    }
}

impl Default for Addr {
    fn default() -> Self {
        Addr::null()
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({:#x})", self.uintptr())
    }
}

/// Typed view over one frame slot
pub struct Ptr<'f, T> {
    ptr: NonNull<T>,
    _frame: PhantomData<&'f Frame>,
}

impl<'f, T: Copy> Ptr<'f, T> {
    /// # Safety
    ///
    /// `ptr` must address a slot of a frame that outlives `'f` and currently
    /// holds a valid `T`.
    pub(crate) unsafe fn new(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _frame: PhantomData,
        }
    }

    /// Copy the current value out of the slot
    pub fn get(&self) -> T {
        // SAFETY: the slot was initialized with a valid `T` (argument write or
        // zeroed return of a `Zeroable` type) and the frame is borrowed for 'f.
        unsafe { self.ptr.as_ptr().read() }
    }

    /// Overwrite the slot
    pub fn set(&self, value: T) {
        // SAFETY: as in `get`; slots are only ever accessed through raw pointers.
        unsafe { self.ptr.as_ptr().write(value) }
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn addr(&self) -> Addr {
        Addr::from_ptr(self.ptr.as_ptr())
    }

    pub fn uintptr(&self) -> usize {
        self.addr().uintptr()
    }
}

impl<T> Clone for Ptr<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ptr<'_, T> {}

impl<T> fmt::Debug for Ptr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ptr<{}>({:#x})",
            std::any::type_name::<T>(),
            self.ptr.as_ptr() as usize
        )
    }
}

/// Return placeholder for methods that produce nothing; its address is null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nil;

impl Nil {
    pub const fn addr(&self) -> Addr {
        Addr::null()
    }

    pub fn uintptr(&self) -> usize {
        0
    }
}

/// Contiguous run of argument addresses
///
/// Built by [`Frame::array`] for outgoing calls, or with [`Args::from_raw`]
/// over an argument array the engine passed into a callback.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    base: *const Addr,
    addrs: &'a [Addr],
}

impl<'a> Args<'a> {
    /// `base` is where the run starts, even when it is empty, so that the
    /// native side always receives an in-bounds pointer.
    pub(crate) fn new(base: *const Addr, addrs: &'a [Addr]) -> Self {
        Self { base, addrs }
    }

    /// View an engine-provided argument array.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` addresses for `'a`, and the
    /// array must not be modified during `'a`. A null `ptr` is accepted only
    /// with `len == 0`.
    pub unsafe fn from_raw(ptr: *const *const c_void, len: usize) -> Self {
        let base = ptr.cast::<Addr>();
        let addrs = if len == 0 {
            &[]
        } else {
            slice::from_raw_parts(base, len)
        };
        Self { base, addrs }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Addr> {
        self.addrs.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Addr> + 'a {
        let addrs: &'a [Addr] = self.addrs;
        addrs.iter().copied()
    }

    pub fn as_slice(&self) -> &'a [Addr] {
        self.addrs
    }

    /// Address of the first entry, in the `const void *const *` form the
    /// native call expects
    pub fn as_ptr(&self) -> *const Addr {
        self.base
    }

    pub fn uintptr(&self) -> usize {
        self.base as usize
    }

    /// Copy argument `index` out as a `T`.
    ///
    /// Panics if `index` is out of range.
    ///
    /// # Safety
    ///
    /// Entry `index` must address an initialized, aligned `T`.
    #[track_caller]
    pub unsafe fn read<T: Copy>(&self, index: usize) -> T {
        self[index].read::<T>()
    }
}

impl Index<usize> for Args<'_> {
    type Output = Addr;

    #[track_caller]
    fn index(&self, index: usize) -> &Addr {
        match self.addrs.get(index) {
            Some(addr) => addr,
            None => panic!(
                "callframe: argument index {} out of range for {} arguments",
                index,
                self.addrs.len()
            ),
        }
    }
}

impl fmt::Debug for Args<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.addrs.iter()).finish()
    }
}
