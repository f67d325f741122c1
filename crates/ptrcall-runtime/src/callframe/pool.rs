//! Frame pool
//!
//! Recycles boxed frames through a bounded lock-free queue. Each frame popped
//! from the queue belongs to exactly one [`FrameGuard`] until the guard drops,
//! which resets the frame and pushes it back. When the queue is already full
//! the frame is freed instead.

use super::error::PoolError;
use super::frame::Frame;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use ptrcall_config::{ConfigResult, PoolConfig, MAX_IDLE_LIMIT};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

static GLOBAL: OnceLock<FramePool> = OnceLock::new();

/// Thread-safe recycling pool of call frames
pub struct FramePool {
    idle_sender: Sender<Box<Frame>>,
    idle_receiver: Receiver<Box<Frame>>,
    config: PoolConfig,
    acquired: AtomicUsize,
    allocated: AtomicUsize,
    reused: AtomicUsize,
    released: AtomicUsize,
    discarded: AtomicUsize,
    outstanding: AtomicUsize,
}

/// Pool counters. Each is read independently, so a snapshot taken while
/// other threads acquire or release may be slightly inconsistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total acquisitions
    pub acquired: usize,
    /// Frames allocated fresh (on acquisition or prewarm)
    pub allocated: usize,
    /// Acquisitions served from the idle queue
    pub reused: usize,
    /// Total releases
    pub released: usize,
    /// Released frames freed because the idle queue was full
    pub discarded: usize,
    /// Frames currently held by guards
    pub outstanding: usize,
    /// Frames waiting in the idle queue
    pub idle: usize,
}

impl FramePool {
    /// Build a pool, allocating `config.prewarm` frames up front.
    ///
    /// Settings that fail [`PoolConfig::validate`] are clamped with a
    /// warning: `max_idle` to [`MAX_IDLE_LIMIT`], then `prewarm` to
    /// `max_idle`. Use [`FramePool::try_new`] to reject them instead.
    pub fn new(config: PoolConfig) -> Self {
        Self::build(clamp(config))
    }

    /// Build a pool, failing on settings that do not validate
    pub fn try_new(config: PoolConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let (idle_sender, idle_receiver) = bounded(config.max_idle);
        let pool = Self {
            idle_sender,
            idle_receiver,
            config,
            acquired: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
        };
        if config.prewarm > 0 {
            pool.prewarm(config.prewarm);
        }
        pool
    }

    /// Take a frame from the pool, allocating one if none is idle
    pub fn acquire(&self) -> FrameGuard<'_> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_add(1, Ordering::Relaxed);

        let frame = match self.idle_receiver.try_recv() {
            Ok(frame) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                frame
            }
            Err(_) => {
                let total = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(total, "callframe pool allocating a new frame");
                Frame::new_boxed()
            }
        };
        let addr = &*frame as *const Frame as usize;
        trace!(addr, "callframe acquired");

        FrameGuard {
            frame: ManuallyDrop::new(frame),
            pool: self,
        }
    }

    fn release(&self, mut frame: Box<Frame>) {
        frame.reset(self.config.scrub_on_release);
        self.released.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        let addr = &*frame as *const Frame as usize;
        trace!(addr, "callframe released");

        match self.idle_sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                trace!(max_idle = self.config.max_idle, "callframe pool full, frame freed");
            }
        }
    }

    /// Allocate up to `count` idle frames ahead of time, never exceeding
    /// `max_idle`. Returns how many were added.
    pub fn prewarm(&self, count: usize) -> usize {
        let room = self.config.max_idle.saturating_sub(self.idle_receiver.len());
        let mut added = 0;
        for _ in 0..count.min(room) {
            if self.idle_sender.try_send(Frame::new_boxed()).is_err() {
                break;
            }
            added += 1;
        }
        self.allocated.fetch_add(added, Ordering::Relaxed);
        debug!(added, idle = self.idle_receiver.len(), "callframe pool prewarmed");
        added
    }

    /// Free every idle frame. Returns how many were freed. Frames held by
    /// guards are unaffected and come back on release as usual.
    pub fn drain(&self) -> usize {
        let mut freed = 0;
        while self.idle_receiver.try_recv().is_ok() {
            freed += 1;
        }
        debug!(
            freed,
            outstanding = self.outstanding.load(Ordering::Relaxed),
            "callframe pool drained"
        );
        freed
    }

    /// Frames waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle_receiver.len()
    }

    /// Frames currently held by guards. Zero once every call has finished;
    /// anything else after a test means a guard was leaked.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            outstanding: self.outstanding.load(Ordering::Relaxed),
            idle: self.idle_receiver.len(),
        }
    }

    /// Install the process-wide pool. Fails if one is already installed,
    /// including the default one `global()` creates on first use.
    pub fn init_global(config: PoolConfig) -> Result<&'static FramePool, PoolError> {
        let mut installed = false;
        let pool = GLOBAL.get_or_init(|| {
            installed = true;
            FramePool::new(config)
        });
        if installed {
            debug!(max_idle = pool.config.max_idle, "global callframe pool installed");
            Ok(pool)
        } else {
            warn!("global callframe pool already initialized, keeping the existing one");
            Err(PoolError::AlreadyInitialized)
        }
    }

    /// The process-wide pool, created with default settings on first use
    /// unless `init_global` ran before.
    pub fn global() -> &'static FramePool {
        GLOBAL.get_or_init(|| FramePool::new(PoolConfig::default()))
    }
}

fn clamp(mut config: PoolConfig) -> PoolConfig {
    if let Err(error) = config.validate() {
        config.max_idle = config.max_idle.min(MAX_IDLE_LIMIT);
        config.prewarm = config.prewarm.min(config.max_idle);
        warn!(
            %error,
            max_idle = config.max_idle,
            prewarm = config.prewarm,
            "invalid callframe pool settings clamped"
        );
    }
    config
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Scoped ownership of one frame; returns it to the pool on drop
pub struct FrameGuard<'p> {
    frame: ManuallyDrop<Box<Frame>>,
    pool: &'p FramePool,
}

impl FrameGuard<'_> {
    /// Return the frame to the pool now. Same as dropping the guard.
    pub fn release(self) {
        drop(self)
    }
}

impl Deref for FrameGuard<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `frame` is never touched again after this.
        let frame = unsafe { ManuallyDrop::take(&mut self.frame) };
        self.pool.release(frame);
    }
}

impl fmt::Debug for FrameGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameGuard").field(&**self.frame).finish()
    }
}
