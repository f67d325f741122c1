//! The call frame
//!
//! Arguments fill slots from index 0 upward, returns from `CAPACITY - 1`
//! downward. Every argument write also records the slot address in the
//! argument-address array, which is what the native side receives.
//!
//! A frame only ever lives in a `Box` owned by a pool or by one guard, and is
//! only reachable through `&Frame`, so slot addresses stay put for as long as
//! any view borrows the frame.

use super::error::FrameError;
use super::slot::{check_fits, Slot, CAPACITY};
use super::view::{Addr, Args, Ptr};
use bytemuck::Zeroable;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ptr::NonNull;

pub struct Frame {
    slots: UnsafeCell<[Slot; CAPACITY]>,
    addrs: UnsafeCell<[Addr; CAPACITY]>,
    args: Cell<usize>,
    rets: Cell<usize>,
}

// SAFETY: the raw addresses a frame stores point into its own boxed storage.
// Moving the box to another thread moves that storage with it. `Frame` stays
// `!Sync`, so it is never touched from two threads at once.
unsafe impl Send for Frame {}

impl Frame {
    pub(crate) fn new_boxed() -> Box<Frame> {
        Box::new(Frame {
            slots: UnsafeCell::new([Slot::ZERO; CAPACITY]),
            addrs: UnsafeCell::new([Addr::null(); CAPACITY]),
            args: Cell::new(0),
            rets: Cell::new(0),
        })
    }

    /// Write `value` into the next argument slot.
    ///
    /// Panics if `T` does not fit a slot or the frame is full.
    #[track_caller]
    pub fn arg<T: Copy>(&self, value: T) -> Ptr<'_, T> {
        match self.try_arg(value) {
            Ok(ptr) => ptr,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_arg<T: Copy>(&self, value: T) -> Result<Ptr<'_, T>, FrameError> {
        check_fits::<T>()?;
        self.check_capacity()?;

        let index = self.args.get();
        let slot = self.slot_ptr(index).cast::<T>();
        // SAFETY: `index` is a free slot inside the boxed array, and `T` fits
        // its size and alignment. No reference to slot memory exists.
        unsafe {
            slot.write(value);
            self.addrs_ptr().add(index).write(Addr::from_ptr(slot));
        }
        self.args.set(index + 1);

        // SAFETY: the slot now holds a valid `T`; the view borrows `self`.
        Ok(unsafe { Ptr::new(NonNull::new_unchecked(slot)) })
    }

    /// Reserve the next return slot, zero-initialized.
    ///
    /// Panics if `T` does not fit a slot or the frame is full.
    #[track_caller]
    pub fn ret<T: Copy + Zeroable>(&self) -> Ptr<'_, T> {
        match self.try_ret() {
            Ok(ptr) => ptr,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_ret<T: Copy + Zeroable>(&self) -> Result<Ptr<'_, T>, FrameError> {
        check_fits::<T>()?;
        self.check_capacity()?;

        let index = CAPACITY - 1 - self.rets.get();
        let slot = self.slot_ptr(index);
        // SAFETY: free slot inside the boxed array. All-zero is a valid `T`
        // because `T: Zeroable`.
        unsafe { slot.write(Slot::ZERO) };
        self.rets.set(self.rets.get() + 1);

        // SAFETY: see above.
        Ok(unsafe { Ptr::new(NonNull::new_unchecked(slot.cast::<T>())) })
    }

    /// Addresses of arguments `start..` as one array.
    ///
    /// Panics if `start` is past the last written argument.
    #[track_caller]
    pub fn array(&self, start: usize) -> Args<'_> {
        let args = self.args.get();
        if start > args {
            panic!(
                "callframe: array start {} is past the {} written arguments",
                start, args
            );
        }

        // SAFETY: entries `start..args` were initialized by `try_arg`. They are
        // not written again until the frame is reset, which needs `&mut self`.
        unsafe {
            let base = self.addrs_ptr().add(start) as *const Addr;
            Args::new(base, std::slice::from_raw_parts(base, args - start))
        }
    }

    /// Arguments written so far
    pub fn arg_count(&self) -> usize {
        self.args.get()
    }

    /// Return slots reserved so far
    pub fn ret_count(&self) -> usize {
        self.rets.get()
    }

    /// Slots still free for either arguments or returns
    pub fn remaining(&self) -> usize {
        CAPACITY - self.args.get() - self.rets.get()
    }

    pub fn is_empty(&self) -> bool {
        self.args.get() == 0 && self.rets.get() == 0
    }

    /// Forget all arguments and returns. With `scrub`, slot memory is zeroed.
    pub(crate) fn reset(&mut self, scrub: bool) {
        self.args.set(0);
        self.rets.set(0);
        if scrub {
            *self.slots.get_mut() = [Slot::ZERO; CAPACITY];
            *self.addrs.get_mut() = [Addr::null(); CAPACITY];
        }
    }

    fn check_capacity(&self) -> Result<(), FrameError> {
        let (args, rets) = (self.args.get(), self.rets.get());
        if args + rets >= CAPACITY {
            return Err(FrameError::CapacityExceeded {
                capacity: CAPACITY,
                args,
                rets,
            });
        }
        Ok(())
    }

    fn slot_ptr(&self, index: usize) -> *mut Slot {
        debug_assert!(index < CAPACITY);
        // SAFETY: in bounds of the slot array.
        unsafe { self.slots.get().cast::<Slot>().add(index) }
    }

    fn addrs_ptr(&self) -> *mut Addr {
        self.addrs.get().cast::<Addr>()
    }

    #[cfg(test)]
    pub(crate) fn slot_addr(&self, index: usize) -> usize {
        self.slot_ptr(index) as usize
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("args", &self.args.get())
            .field("rets", &self.rets.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callframe::slot::SLOT_SIZE;
    use crate::callframe::ErrorKind;

    #[test]
    fn test_arg_round_trip() {
        let frame = Frame::new_boxed();
        let a = frame.arg(100i64);
        let b = frame.arg(2.5f64);
        let c = frame.arg(true);

        assert_eq!(a.get(), 100);
        assert_eq!(b.get(), 2.5);
        assert!(c.get());
        assert_eq!(frame.arg_count(), 3);
    }

    #[test]
    fn test_args_fill_from_front() {
        let frame = Frame::new_boxed();
        let a = frame.arg(1u8);
        let b = frame.arg(2u8);
        assert_eq!(a.uintptr(), frame.slot_addr(0));
        assert_eq!(b.uintptr(), frame.slot_addr(1));
    }

    #[test]
    fn test_rets_fill_from_back() {
        let frame = Frame::new_boxed();
        let r0 = frame.ret::<i64>();
        let r1 = frame.ret::<i64>();
        assert_eq!(r0.uintptr(), frame.slot_addr(CAPACITY - 1));
        assert_eq!(r1.uintptr(), frame.slot_addr(CAPACITY - 2));
        assert_eq!(r0.get(), 0);
        assert_eq!(frame.ret_count(), 2);
    }

    #[test]
    fn test_argument_addresses_recorded() {
        let frame = Frame::new_boxed();
        let a = frame.arg(10u32);
        let b = frame.arg(20u32);

        let args = frame.array(0);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], a.addr());
        assert_eq!(args[1], b.addr());

        let tail = frame.array(1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0], b.addr());
    }

    #[test]
    fn test_empty_array_points_at_next_entry() {
        let frame = Frame::new_boxed();
        frame.arg(1u8);
        let full = frame.array(0);
        let empty = frame.array(1);
        assert!(empty.is_empty());
        assert_eq!(
            empty.uintptr(),
            full.uintptr() + std::mem::size_of::<Addr>()
        );
    }

    #[test]
    #[should_panic(expected = "past the 1 written arguments")]
    fn test_array_past_end_panics() {
        let frame = Frame::new_boxed();
        frame.arg(1u8);
        let _ = frame.array(2);
    }

    #[test]
    fn test_capacity_exceeded() {
        let frame = Frame::new_boxed();
        for i in 0..CAPACITY - 1 {
            frame.arg(i);
        }
        frame.ret::<usize>();
        assert_eq!(frame.remaining(), 0);

        let err = frame.try_arg(0u8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        let err = frame.try_ret::<u8>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    }

    #[test]
    fn test_oversized_does_not_touch_frame() {
        let frame = Frame::new_boxed();
        let before = frame.arg(0x5555u16);

        let err = frame.try_arg([0u8; SLOT_SIZE + 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMarshalSize);
        assert_eq!(frame.arg_count(), 1);
        assert_eq!(before.get(), 0x5555);
    }

    #[test]
    fn test_reset_clears_cursors() {
        let mut frame = Frame::new_boxed();
        frame.arg(1u64);
        frame.ret::<u64>();
        frame.reset(false);
        assert!(frame.is_empty());
        assert_eq!(frame.remaining(), CAPACITY);
    }

    #[test]
    fn test_scrub_zeroes_slots() {
        let mut frame = Frame::new_boxed();
        frame.arg(u64::MAX);
        frame.reset(true);

        // SAFETY: slot 0 is initialized memory inside the frame.
        let word = unsafe { (frame.slot_addr(0) as *const u64).read() };
        assert_eq!(word, 0);
        assert!(frame.array(0).is_empty());
    }
}
