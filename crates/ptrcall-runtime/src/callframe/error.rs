//! Call-frame errors
//!
//! Both marshaling failures are programming errors in the code that builds a
//! call, never runtime data conditions. The panicking frame operations report
//! them with the `Display` text below; the `try_*` forms hand them back.

use thiserror::Error;

/// Failure class of a [`FrameError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The value type does not fit a slot (size or alignment)
    InvalidMarshalSize,
    /// Every slot of the frame is already in use
    CapacityExceeded,
}

/// Marshaling precondition violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error(
        "callframe: {type_name} (size {size}, align {align}) does not fit a {slot_size}-byte slot"
    )]
    OversizedType {
        type_name: &'static str,
        size: usize,
        align: usize,
        slot_size: usize,
    },

    #[error("callframe: all {capacity} slots in use ({args} arguments, {rets} returns)")]
    CapacityExceeded {
        capacity: usize,
        args: usize,
        rets: usize,
    },
}

impl FrameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameError::OversizedType { .. } => ErrorKind::InvalidMarshalSize,
            FrameError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
        }
    }
}

/// Errors from the process-wide pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("the global frame pool is already initialized")]
    AlreadyInitialized,
}
