// FluxSand - Application Controller
//
// Maps gestures, button presses and the clock onto the mode state and decides
// what the matrix shows.  Side effects (buzzer, sand animation) come back as
// `Action`s so the controller stays free of hardware and threads.

use chrono::{NaiveTime, Timelike};

use crate::config::CHAMBER_CAPACITY;
use crate::display::render::Screen;
use crate::events::{ButtonId, EnvReading, UiEvent};
use crate::gesture::Gesture;
use crate::modes::{Mode, ModeManager, Orientation};
use crate::tone::{self, Tone};

/// Timer setting step for the tilt gestures.
pub const TIMER_STEP_SECS: i64 = 300;

/// Stopwatch display saturates at 99:59.
const STOPWATCH_MAX_SECS: i64 = 99 * 60 + 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Beep(Tone),
    /// Run or freeze the sand animation.
    SandEnabled(bool),
    /// Refill the upper chamber from scratch.
    SandReset,
    /// Move one grain through the waist.
    Transfer,
}

/// What one render tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub screen: Screen,
    pub actions: Vec<Action>,
}

#[derive(Debug, Default)]
pub struct Controller {
    modes: ModeManager,
    env: EnvReading,
    sand_enabled: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    pub fn sand_enabled(&self) -> bool {
        self.sand_enabled
    }

    fn set_sand(&mut self, enabled: bool, actions: &mut Vec<Action>) {
        if self.sand_enabled != enabled {
            self.sand_enabled = enabled;
            actions.push(Action::SandEnabled(enabled));
        }
    }

    fn start_timer(&mut self, duration_secs: i64, now_ms: u64, actions: &mut Vec<Action>) {
        self.modes.start_timer(duration_secs, now_ms);
        actions.push(Action::SandReset);
    }

    pub fn handle(&mut self, event: UiEvent, now_ms: u64) -> Vec<Action> {
        match event {
            UiEvent::Gesture(gesture) => self.on_gesture(gesture, now_ms),
            UiEvent::Button(id) => self.on_button(id, now_ms),
            UiEvent::Environment(reading) => {
                self.env = reading;
                Vec::new()
            }
        }
    }

    pub fn on_gesture(&mut self, gesture: Gesture, now_ms: u64) -> Vec<Action> {
        log::info!("New gesture: {}", gesture.display_name());
        let mut actions = vec![Action::Beep(tone::GESTURE_ACK)];

        let mode = self.modes.mode();
        let landscape = self.modes.is_landscape();
        let running = self.modes.is_timer_running();

        match gesture {
            Gesture::TiltRight => {
                if mode == Mode::Timer && !running {
                    self.modes.adjust_timer(TIMER_STEP_SECS);
                } else if mode == Mode::Time && !landscape {
                    self.modes.set_orientation(Orientation::Landscape);
                } else if mode == Mode::Timer && !landscape && running {
                    self.modes.set_orientation(Orientation::Landscape);
                    self.set_sand(false, &mut actions);
                }
            }
            Gesture::TiltLeft => {
                if mode == Mode::Timer && !running {
                    self.modes.adjust_timer(-TIMER_STEP_SECS);
                } else if mode == Mode::Time && landscape {
                    self.modes.set_orientation(Orientation::Portrait);
                } else if mode == Mode::Timer && landscape && running {
                    self.modes.set_orientation(Orientation::Portrait);
                    self.set_sand(true, &mut actions);
                }
            }
            Gesture::ShakeForward => {
                if mode == Mode::Timer && !running {
                    let setting = self.modes.tick_timer(now_ms).remaining_secs;
                    self.start_timer(setting, now_ms, &mut actions);
                }
            }
            Gesture::ShakeBackward => {
                if mode == Mode::Timer {
                    self.modes.stop_timer();
                    self.set_sand(false, &mut actions);
                }
            }
            _ => {}
        }
        actions
    }

    pub fn on_button(&mut self, id: ButtonId, now_ms: u64) -> Vec<Action> {
        let mut actions = Vec::new();
        match id {
            ButtonId::Mode => {
                self.modes.next_mode();
                self.set_sand(false, &mut actions);
                actions.push(Action::Beep(tone::CLICK));
            }
            ButtonId::Action => {
                actions.push(Action::Beep(tone::CLICK));
                match self.modes.mode() {
                    Mode::Stopwatch if self.modes.is_stopwatch_running() => {
                        self.modes.stop_stopwatch()
                    }
                    Mode::Stopwatch => self.modes.start_stopwatch(now_ms),
                    Mode::Timer if self.modes.is_timer_running() => {
                        self.modes.stop_timer();
                        self.set_sand(false, &mut actions);
                    }
                    _ => {}
                }
            }
        }
        actions
    }

    /// One render tick.  `lower_count` is the grain count of the lower
    /// chamber as last published by the sand thread.
    pub fn tick(&mut self, now_ms: u64, clock: NaiveTime, lower_count: usize) -> Tick {
        let mut actions = Vec::new();
        let orientation = self.modes.orientation();

        let screen = match self.modes.mode() {
            Mode::Time => Screen::Clock {
                hour: clock.hour() as u8,
                minute: clock.minute() as u8,
                orientation,
            },
            Mode::Humidity => Screen::Humidity(two_digits(self.env.humidity_pct)),
            Mode::Temperature => Screen::Temperature(two_digits(self.env.temperature_c)),
            Mode::Stopwatch => {
                let secs = self.modes.stopwatch_secs(now_ms).min(STOPWATCH_MAX_SECS);
                Screen::Clock {
                    hour: (secs / 60) as u8,
                    minute: (secs % 60) as u8,
                    orientation: Orientation::Landscape,
                }
            }
            Mode::Timer => self.timer_screen(now_ms, lower_count, &mut actions),
        };

        Tick { screen, actions }
    }

    fn timer_screen(&mut self, now_ms: u64, lower_count: usize, actions: &mut Vec<Action>) -> Screen {
        let tick = self.modes.tick_timer(now_ms);
        if tick.finished {
            actions.push(Action::Beep(tone::ALARM));
            self.set_sand(false, actions);
        }

        let remaining = tick.remaining_secs;
        let countdown = |orientation| Screen::Countdown {
            minutes: (remaining / 60).clamp(0, 99) as u8,
            seconds: (remaining % 60).clamp(0, 59) as u8,
            orientation,
        };

        if self.modes.is_landscape() {
            return countdown(Orientation::Landscape);
        }
        if !self.modes.is_timer_running() {
            return countdown(Orientation::Portrait);
        }

        self.set_sand(true, actions);
        if lower_count < target_lower_count(remaining, self.modes.timer_max_secs()) {
            actions.push(Action::Transfer);
        }
        Screen::Hourglass
    }
}

/// Grains that should have fallen by now.
pub fn target_lower_count(remaining_secs: i64, max_secs: i64) -> usize {
    if max_secs <= 0 {
        return CHAMBER_CAPACITY;
    }
    let capacity = CHAMBER_CAPACITY as i64;
    (capacity - capacity * remaining_secs / max_secs).clamp(0, capacity) as usize
}

fn two_digits(value: f32) -> u8 {
    if value.is_finite() {
        value.clamp(0.0, 99.0) as u8
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 34, 0).unwrap()
    }

    fn to_timer(c: &mut Controller) {
        while c.modes().mode() != Mode::Timer {
            c.on_button(ButtonId::Mode, 0);
        }
    }

    #[test]
    fn time_mode_follows_orientation() {
        let mut c = Controller::new();
        let t = c.tick(0, noon(), 0);
        assert_eq!(
            t.screen,
            Screen::Clock {
                hour: 12,
                minute: 34,
                orientation: Orientation::Portrait
            }
        );

        let actions = c.on_gesture(Gesture::TiltRight, 0);
        assert_eq!(actions, vec![Action::Beep(tone::GESTURE_ACK)]);
        assert_eq!(c.modes().orientation(), Orientation::Landscape);

        c.on_gesture(Gesture::TiltLeft, 0);
        assert_eq!(c.modes().orientation(), Orientation::Portrait);
    }

    #[test]
    fn mode_button_clicks_and_cycles() {
        let mut c = Controller::new();
        let actions = c.on_button(ButtonId::Mode, 0);
        assert_eq!(actions, vec![Action::Beep(tone::CLICK)]);
        assert_eq!(c.modes().mode(), Mode::Humidity);

        c.handle(
            UiEvent::Environment(EnvReading {
                humidity_pct: 47.6,
                ..EnvReading::default()
            }),
            0,
        );
        assert_eq!(c.tick(0, noon(), 0).screen, Screen::Humidity(47));
    }

    #[test]
    fn stopwatch_toggles_and_saturates() {
        let mut c = Controller::new();
        for _ in 0..3 {
            c.on_button(ButtonId::Mode, 0);
        }
        assert_eq!(c.modes().mode(), Mode::Stopwatch);
        c.on_button(ButtonId::Action, 1_000);
        assert_eq!(
            c.tick(66_000, noon(), 0).screen,
            Screen::Clock {
                hour: 1,
                minute: 5,
                orientation: Orientation::Landscape
            }
        );
        assert_eq!(
            c.tick(10_000_000, noon(), 0).screen,
            Screen::Clock {
                hour: 99,
                minute: 59,
                orientation: Orientation::Landscape
            }
        );
        c.on_button(ButtonId::Action, 10_000_000);
        assert!(!c.modes().is_stopwatch_running());
    }

    #[test]
    fn tilts_adjust_a_stopped_timer() {
        let mut c = Controller::new();
        to_timer(&mut c);
        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::TiltLeft, 0);
        let t = c.tick(0, noon(), 0);
        assert_eq!(
            t.screen,
            Screen::Countdown {
                minutes: 5,
                seconds: 0,
                orientation: Orientation::Portrait
            }
        );
    }

    #[test]
    fn running_timer_drives_the_hourglass() {
        let mut c = Controller::new();
        to_timer(&mut c);
        c.on_gesture(Gesture::TiltRight, 0);
        let actions = c.on_gesture(Gesture::ShakeForward, 1_000);
        assert!(actions.contains(&Action::SandReset));
        assert!(c.modes().is_timer_running());

        // Halfway: 64 grains should be down.
        let t = c.tick(151_000, noon(), 10);
        assert_eq!(t.screen, Screen::Hourglass);
        assert_eq!(t.actions, vec![Action::SandEnabled(true), Action::Transfer]);

        let t = c.tick(151_000, noon(), 64);
        assert!(t.actions.is_empty());
    }

    #[test]
    fn expiry_sounds_the_alarm_once() {
        let mut c = Controller::new();
        to_timer(&mut c);
        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::ShakeForward, 0);
        c.tick(1_000, noon(), 0);
        assert!(c.sand_enabled());

        let t = c.tick(300_000, noon(), 128);
        assert_eq!(
            t.actions,
            vec![Action::Beep(tone::ALARM), Action::SandEnabled(false)]
        );
        let t = c.tick(300_005, noon(), 128);
        assert!(t.actions.is_empty());
        assert!(!c.modes().is_timer_running());
    }

    #[test]
    fn tilt_switches_running_timer_between_views() {
        let mut c = Controller::new();
        to_timer(&mut c);
        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::ShakeForward, 0);
        c.tick(1_000, noon(), 0);

        let actions = c.on_gesture(Gesture::TiltRight, 2_000);
        assert!(actions.contains(&Action::SandEnabled(false)));
        assert!(matches!(
            c.tick(2_000, noon(), 0).screen,
            Screen::Countdown {
                orientation: Orientation::Landscape,
                ..
            }
        ));

        let actions = c.on_gesture(Gesture::TiltLeft, 3_000);
        assert!(actions.contains(&Action::SandEnabled(true)));
    }

    #[test]
    fn shake_backward_and_action_button_stop_the_timer() {
        let mut c = Controller::new();
        to_timer(&mut c);
        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::ShakeForward, 0);
        c.tick(1_000, noon(), 0);
        let actions = c.on_gesture(Gesture::ShakeBackward, 2_000);
        assert!(actions.contains(&Action::SandEnabled(false)));
        assert!(!c.modes().is_timer_running());

        c.on_gesture(Gesture::TiltRight, 0);
        c.on_gesture(Gesture::ShakeForward, 0);
        c.on_button(ButtonId::Action, 1_000);
        assert!(!c.modes().is_timer_running());
    }

    #[test]
    fn target_count_tracks_elapsed_fraction() {
        assert_eq!(target_lower_count(600, 600), 0);
        assert_eq!(target_lower_count(300, 600), 64);
        assert_eq!(target_lower_count(0, 600), 128);
        assert_eq!(target_lower_count(0, 0), 128);
    }
}
