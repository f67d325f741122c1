//! Call frames for method-bind calls
//!
//! A generated binding stages every native call the same way:
//!
//! ```
//! use ptrcall_runtime::callframe::FramePool;
//!
//! let pool = FramePool::default();
//! let frame = pool.acquire();
//! let count = frame.arg(3i64);
//! let ret = frame.ret::<i64>();
//!
//! // The native call receives `frame.array(0).as_ptr()` and `ret.addr()`.
//! ret.set(count.get() * 2);
//!
//! assert_eq!(ret.get(), 6);
//! drop(frame);
//! assert_eq!(pool.outstanding(), 0);
//! ```
//!
//! Slot views borrow the guard, so nothing read from a frame can be used
//! after it went back to the pool.

mod error;
mod frame;
mod pool;
mod slot;
mod view;

pub use error::{ErrorKind, FrameError, PoolError};
pub use frame::Frame;
pub use pool::{FrameGuard, FramePool, PoolStats};
pub use slot::{fits, CAPACITY, SLOT_ALIGN, SLOT_SIZE, SLOT_WORDS};
pub use view::{Addr, Args, Nil, Ptr};

/// Acquire a frame from the process-wide pool
pub fn acquire() -> FrameGuard<'static> {
    FramePool::global().acquire()
}
