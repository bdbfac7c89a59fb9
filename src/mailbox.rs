// FluxSand - Inter-task Handoffs
//
// Latest-value-wins slots between the sensor, AHRS, gesture and sand tasks,
// plus the shared shutdown flag and the gravity cell.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Single-slot handoff.  `post` overwrites whatever is pending; `take`
/// blocks until a value is present and consumes it.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Returns true when an unread value was replaced.
    pub fn post(&self, value: T) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let overwritten = slot.replace(value).is_some();
        drop(slot);
        self.ready.notify_one();
        overwritten
    }

    pub fn try_take(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Wait at most `timeout` for a value.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |s| s.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }

    /// Block until a value arrives or `shutdown` is raised.
    pub fn take(&self, shutdown: &Shutdown, poll: Duration) -> Option<T> {
        while !shutdown.is_requested() {
            if let Some(value) = self.take_timeout(poll) {
                return Some(value);
            }
        }
        None
    }
}

/// Process-wide stop flag checked at the top of every task loop.
#[derive(Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Current sand gravity direction in degrees.  Stored as raw f32 bits.
#[derive(Clone)]
pub struct GravityCell(Arc<AtomicU32>);

impl Default for GravityCell {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl GravityCell {
    pub fn new(deg: f32) -> Self {
        Self(Arc::new(AtomicU32::new(deg.to_bits())))
    }

    pub fn store(&self, deg: f32) {
        self.0.store(deg.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}
