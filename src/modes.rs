// FluxSand - Display Modes, Stopwatch & Timer
//
// All time arguments are milliseconds on the monotonic clock (`now_ms`).

/// Longest timer setting: 98:59.
pub const TIMER_MAX_SECS: i64 = 99 * 60 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Time,
    Humidity,
    Temperature,
    Stopwatch,
    Timer,
}

impl Mode {
    pub fn next(self) -> Self {
        match self {
            Self::Time => Self::Humidity,
            Self::Humidity => Self::Temperature,
            Self::Temperature => Self::Stopwatch,
            Self::Stopwatch => Self::Timer,
            Self::Timer => Self::Time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Landscape,
    #[default]
    Portrait,
}

/// Remaining countdown for one UI tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub remaining_secs: i64,
    /// The countdown hit zero on this tick.
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct ModeManager {
    mode: Option<Mode>,
    orientation: Orientation,

    stopwatch_start_ms: Option<u64>,

    timer_start_ms: Option<u64>,
    timer_secs: i64,
    timer_max_secs: i64,
}

impl ModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Time)
    }

    pub fn next_mode(&mut self) -> Mode {
        let next = self.mode().next();
        self.mode = Some(next);
        log::info!("Mode -> {next:?}");
        next
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn is_landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }

    // ---- stopwatch ----

    pub fn start_stopwatch(&mut self, now_ms: u64) {
        if self.stopwatch_start_ms.is_none() {
            self.stopwatch_start_ms = Some(now_ms);
            self.mode = Some(Mode::Stopwatch);
            log::info!("Stopwatch started");
        }
    }

    /// Stopping also resets the count.
    pub fn stop_stopwatch(&mut self) {
        if self.stopwatch_start_ms.take().is_some() {
            log::info!("Stopwatch stopped");
        }
    }

    pub fn is_stopwatch_running(&self) -> bool {
        self.stopwatch_start_ms.is_some()
    }

    pub fn stopwatch_secs(&self, now_ms: u64) -> i64 {
        self.stopwatch_start_ms
            .map_or(0, |start| (now_ms.saturating_sub(start) / 1000) as i64)
    }

    // ---- timer ----

    pub fn start_timer(&mut self, duration_secs: i64, now_ms: u64) {
        self.timer_secs = duration_secs;
        self.timer_max_secs = duration_secs;
        self.timer_start_ms = Some(now_ms);
        self.mode = Some(Mode::Timer);
        log::info!("Timer started for {duration_secs} s");
    }

    /// Stop and clear the setting.
    pub fn stop_timer(&mut self) {
        self.timer_start_ms = None;
        self.timer_secs = 0;
        log::info!("Timer stopped");
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer_start_ms.is_some()
    }

    pub fn timer_max_secs(&self) -> i64 {
        self.timer_max_secs
    }

    /// Whole seconds left.  The timer stops itself once it runs out.
    pub fn tick_timer(&mut self, now_ms: u64) -> TimerTick {
        let Some(start) = self.timer_start_ms else {
            return TimerTick {
                remaining_secs: self.timer_secs,
                finished: false,
            };
        };
        let elapsed = (now_ms.saturating_sub(start) / 1000) as i64;
        if elapsed >= self.timer_secs {
            self.timer_start_ms = None;
            log::info!("Timer finished");
            return TimerTick {
                remaining_secs: 0,
                finished: true,
            };
        }
        TimerTick {
            remaining_secs: self.timer_secs - elapsed,
            finished: false,
        }
    }

    /// Change the setting while stopped.
    pub fn adjust_timer(&mut self, delta_secs: i64) {
        if !self.is_timer_running() {
            self.timer_secs = (self.timer_secs + delta_secs).clamp(0, TIMER_MAX_SECS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_cycle() {
        let mut m = ModeManager::new();
        assert_eq!(m.mode(), Mode::Time);
        let seen: Vec<_> = (0..5).map(|_| m.next_mode()).collect();
        assert_eq!(
            seen,
            vec![Mode::Humidity, Mode::Temperature, Mode::Stopwatch, Mode::Timer, Mode::Time]
        );
    }

    #[test]
    fn stopwatch_counts_and_resets() {
        let mut m = ModeManager::new();
        m.start_stopwatch(1_000);
        assert_eq!(m.mode(), Mode::Stopwatch);
        assert_eq!(m.stopwatch_secs(62_500), 61);
        m.stop_stopwatch();
        assert_eq!(m.stopwatch_secs(70_000), 0);
    }

    #[test]
    fn timer_counts_down_and_stops() {
        let mut m = ModeManager::new();
        m.start_timer(3, 0);
        assert_eq!(m.tick_timer(1_500).remaining_secs, 2);
        let done = m.tick_timer(3_000);
        assert_eq!(done, TimerTick { remaining_secs: 0, finished: true });
        assert!(!m.is_timer_running());
        assert!(!m.tick_timer(4_000).finished);
    }

    #[test]
    fn adjust_clamps_and_only_when_stopped() {
        let mut m = ModeManager::new();
        m.adjust_timer(-300);
        assert_eq!(m.tick_timer(0).remaining_secs, 0);
        for _ in 0..30 {
            m.adjust_timer(300);
        }
        assert_eq!(m.tick_timer(0).remaining_secs, TIMER_MAX_SECS);

        m.start_timer(600, 0);
        m.adjust_timer(300);
        assert_eq!(m.tick_timer(0).remaining_secs, 600);
    }
}
