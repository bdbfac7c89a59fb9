// FluxSand - Sand Task
//
// Owns the hourglass and advances it every SAND_TICK_MS.  Other threads only
// flip request flags and read the published snapshot, so every step and
// transfer is ordered by this thread alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{CHAMBER_CAPACITY, SAND_SETTLE_TICKS, SAND_TICK_MS};
use crate::mailbox::{GravityCell, Shutdown};
use crate::sand::{Chamber, Hourglass, SandGrid};

/// Flags in, snapshot out.
#[derive(Debug, Default)]
pub struct SandShared {
    enabled: AtomicBool,
    reset: AtomicBool,
    transfer: AtomicBool,
    snapshot: Mutex<(SandGrid, SandGrid)>,
}

impl SandShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Relaxed);
    }

    /// Requests made before the sand thread gets to them collapse into one.
    pub fn request_transfer(&self) {
        self.transfer.store(true, Ordering::Relaxed);
    }

    /// Both chambers as of the same step.
    pub fn snapshot(&self) -> (SandGrid, SandGrid) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lower_count(&self) -> usize {
        self.snapshot().1.count()
    }

    fn publish(&self, hourglass: &Hourglass) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = hourglass.snapshot();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pouring grains into the upper chamber, `added` so far.
    Fill { added: usize },
    Settle { left: usize },
    Run,
}

/// The per-tick animation state machine.
pub struct SandAnimator {
    hourglass: Hourglass,
    phase: Phase,
}

impl SandAnimator {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            hourglass: Hourglass::new(seed),
            phase: Phase::Fill { added: 0 },
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn hourglass(&self) -> &Hourglass {
        &self.hourglass
    }

    fn restart(&mut self) {
        self.hourglass.clear();
        self.phase = Phase::Fill { added: 0 };
    }

    /// Advance one tick and publish the result.
    pub fn tick(&mut self, shared: &SandShared, gravity_deg: f32) {
        if shared.reset.swap(false, Ordering::Relaxed) {
            log::info!("Sand reset");
            shared.transfer.store(false, Ordering::Relaxed);
            self.restart();
        }

        self.phase = match self.phase {
            Phase::Fill { added } => {
                let added = added + self.hourglass.add_grain() as usize;
                self.hourglass.step_chamber(Chamber::Upper, 0.0);
                if added >= CHAMBER_CAPACITY {
                    Phase::Settle { left: SAND_SETTLE_TICKS }
                } else {
                    Phase::Fill { added }
                }
            }
            Phase::Settle { left } => {
                self.hourglass.step_chamber(Chamber::Upper, 0.0);
                if left <= 1 {
                    log::debug!("Sand filled with {} grains", self.hourglass.count(Chamber::Upper));
                    Phase::Run
                } else {
                    Phase::Settle { left: left - 1 }
                }
            }
            Phase::Run => {
                if shared.is_enabled() {
                    if shared.transfer.swap(false, Ordering::Relaxed) {
                        self.hourglass.transfer(gravity_deg);
                    }
                    self.hourglass.step(gravity_deg);
                }
                Phase::Run
            }
        };

        shared.publish(&self.hourglass);
    }
}

pub fn sand_task(mut animator: SandAnimator, shared: Arc<SandShared>, gravity: GravityCell, shutdown: Shutdown) {
    log::info!("Sand task started");

    let interval = Duration::from_millis(SAND_TICK_MS);

    while !shutdown.is_requested() {
        let tick_start = Instant::now();

        animator.tick(&shared, gravity.load());

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
    log::info!("Sand task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_fill(animator: &mut SandAnimator, shared: &SandShared) -> usize {
        let mut ticks = 0;
        while animator.phase() != Phase::Run {
            animator.tick(shared, 0.0);
            ticks += 1;
            assert!(ticks < 10_000, "fill never finished");
        }
        ticks
    }

    #[test]
    fn fill_then_settle_then_run() {
        let shared = SandShared::new();
        let mut a = SandAnimator::new(Some(3));
        let ticks = run_fill(&mut a, &shared);
        assert!(ticks >= CHAMBER_CAPACITY + SAND_SETTLE_TICKS);
        assert_eq!(a.hourglass().count(Chamber::Upper), CHAMBER_CAPACITY);
        assert_eq!(shared.snapshot().0.count(), CHAMBER_CAPACITY);
        assert_eq!(shared.lower_count(), 0);
    }

    #[test]
    fn disabled_sand_does_not_move() {
        let shared = SandShared::new();
        let mut a = SandAnimator::new(Some(4));
        run_fill(&mut a, &shared);
        let before = shared.snapshot();
        shared.request_transfer();
        for _ in 0..20 {
            a.tick(&shared, 90.0);
        }
        assert_eq!(shared.snapshot(), before);
    }

    #[test]
    fn transfer_requests_coalesce() {
        let shared = SandShared::new();
        let mut a = SandAnimator::new(Some(5));
        run_fill(&mut a, &shared);
        shared.set_enabled(true);
        shared.request_transfer();
        shared.request_transfer();
        a.tick(&shared, 45.0);
        let (upper, lower) = shared.snapshot();
        assert!(lower.count() <= 1);
        assert_eq!(upper.count() + lower.count(), CHAMBER_CAPACITY);
    }

    #[test]
    fn reset_refills() {
        let shared = SandShared::new();
        let mut a = SandAnimator::new(Some(6));
        run_fill(&mut a, &shared);
        shared.request_reset();
        a.tick(&shared, 0.0);
        assert_eq!(a.phase(), Phase::Fill { added: 1 });
        assert_eq!(shared.snapshot().0.count(), 1);
    }
}
