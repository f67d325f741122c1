//! Slot layout

use super::error::FrameError;
use std::mem::{align_of, size_of, MaybeUninit};

/// Slots per frame, shared between arguments and returns.
pub const CAPACITY: usize = 16;

/// Machine words per slot.
pub const SLOT_WORDS: usize = 8;

/// Bytes per slot.
pub const SLOT_SIZE: usize = SLOT_WORDS * size_of::<usize>();

/// Alignment of every slot.
pub const SLOT_ALIGN: usize = 16;

/// One cell of a frame. Bytes are uninitialized until a value is written.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct Slot([MaybeUninit<usize>; SLOT_WORDS]);

const _: () = assert!(align_of::<Slot>() == SLOT_ALIGN);
const _: () = assert!(size_of::<Slot>() == SLOT_SIZE);

impl Slot {
    pub(crate) const ZERO: Slot = Slot([MaybeUninit::new(0); SLOT_WORDS]);
}

/// Whether values of `T` can be stored in a slot.
pub const fn fits<T>() -> bool {
    size_of::<T>() <= SLOT_SIZE && align_of::<T>() <= SLOT_ALIGN
}

pub(crate) fn check_fits<T>() -> Result<(), FrameError> {
    if fits::<T>() {
        Ok(())
    } else {
        Err(FrameError::OversizedType {
            type_name: std::any::type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
            slot_size: SLOT_SIZE,
        })
    }
}
