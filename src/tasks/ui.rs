// FluxSand - UI Task
//
// Runs the controller at RENDER_TICK_MS: drains pending events, composes the
// screen into the shared frame buffer and flushes it to the matrix.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveTime;

use super::sand::SandShared;
use crate::config::RENDER_TICK_MS;
use crate::controller::{Action, Controller};
use crate::display::render::draw_screen;
use crate::display::{Frame, SharedFrame};
use crate::drivers::MatrixDisplay;
use crate::events::UiEvent;
use crate::mailbox::Shutdown;
use crate::tone::Tone;

/// Consecutive display failures between two warnings.
const PUSH_ERROR_LOG_EVERY: u32 = 200;

/// Controller plus the handles its actions drive.
pub struct Ui {
    controller: Controller,
    sand: Arc<SandShared>,
    beep_tx: Sender<Tone>,
    frame: SharedFrame,
}

impl Ui {
    pub fn new(controller: Controller, sand: Arc<SandShared>, beep_tx: Sender<Tone>, frame: SharedFrame) -> Self {
        Self {
            controller,
            sand,
            beep_tx,
            frame,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    fn apply(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Beep(tone) => {
                    // A missing buzzer is not worth stopping the UI for.
                    let _ = self.beep_tx.send(tone);
                }
                Action::SandEnabled(enabled) => self.sand.set_enabled(enabled),
                Action::SandReset => self.sand.request_reset(),
                Action::Transfer => self.sand.request_transfer(),
            }
        }
    }

    pub fn handle(&mut self, event: UiEvent, now_ms: u64) {
        let actions = self.controller.handle(event, now_ms);
        self.apply(actions);
    }

    /// Compose one frame.  The chambers are read once so the grain count
    /// and the picture come from the same sand step.
    pub fn render(&mut self, now_ms: u64, clock: NaiveTime) -> Frame {
        let (upper, lower) = self.sand.snapshot();
        let tick = self.controller.tick(now_ms, clock, lower.count());
        self.apply(tick.actions);

        let mut frame = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        draw_screen(&mut frame, &tick.screen, &upper, &lower);
        *frame
    }
}

pub fn ui_task<D: MatrixDisplay>(
    mut ui: Ui,
    mut display: D,
    ui_rx: Receiver<UiEvent>,
    intensity: Arc<AtomicU8>,
    shutdown: Shutdown,
) {
    log::info!("UI task started");

    let interval = Duration::from_millis(RENDER_TICK_MS);
    let mut push_errors: u32 = 0;

    while !shutdown.is_requested() {
        let tick_start = Instant::now();

        // 1. Drain all pending events (non-blocking).
        loop {
            match ui_rx.try_recv() {
                Ok(event) => ui.handle(event, crate::now_ms()),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("UI channel closed, exiting UI task");
                    return;
                }
            }
        }

        // 2. Compose and flush.
        let frame = ui.render(crate::now_ms(), chrono::Local::now().time());
        match display.push_frame(&frame, intensity.load(Ordering::Relaxed)) {
            Ok(()) => push_errors = 0,
            Err(e) => {
                if push_errors % PUSH_ERROR_LOG_EVERY == 0 {
                    log::warn!("Display push failed: {e}");
                }
                push_errors = push_errors.wrapping_add(1);
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
    log::info!("UI task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::render::Screen;
    use crate::events::ButtonId;
    use crate::gesture::Gesture;
    use crate::modes::{Mode, Orientation};
    use crate::tone;
    use std::sync::mpsc;
    use std::sync::Mutex;

    fn ui() -> (Ui, Arc<SandShared>, mpsc::Receiver<Tone>) {
        let sand = SandShared::new();
        let (tx, rx) = mpsc::channel();
        let frame = Arc::new(Mutex::new(Frame::new()));
        (Ui::new(Controller::new(), Arc::clone(&sand), tx, frame), sand, rx)
    }

    fn clock() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 48, 0).unwrap()
    }

    #[test]
    fn gestures_beep_and_change_the_frame() {
        let (mut ui, _sand, beeps) = ui();
        let portrait = ui.render(0, clock());
        ui.handle(UiEvent::Gesture(Gesture::TiltRight), 0);
        assert_eq!(beeps.try_recv().ok(), Some(tone::GESTURE_ACK));
        assert_eq!(ui.controller().modes().orientation(), Orientation::Landscape);

        let landscape = ui.render(0, clock());
        assert_ne!(portrait, landscape);

        let mut expected = Frame::new();
        draw_screen(
            &mut expected,
            &Screen::Clock {
                hour: 10,
                minute: 48,
                orientation: Orientation::Landscape,
            },
            &Default::default(),
            &Default::default(),
        );
        assert_eq!(landscape, expected);
    }

    #[test]
    fn running_timer_enables_sand_and_requests_grains() {
        let (mut ui, sand, _beeps) = ui();
        for _ in 0..4 {
            ui.handle(UiEvent::Button(ButtonId::Mode), 0);
        }
        assert_eq!(ui.controller().modes().mode(), Mode::Timer);
        ui.handle(UiEvent::Gesture(Gesture::TiltRight), 0);
        ui.handle(UiEvent::Gesture(Gesture::ShakeForward), 0);
        assert!(!sand.is_enabled());

        ui.render(150_000, clock());
        assert!(sand.is_enabled());

        ui.handle(UiEvent::Gesture(Gesture::ShakeBackward), 151_000);
        assert!(!sand.is_enabled());
    }
}
