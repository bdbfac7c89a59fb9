// FluxSand - Button Input
//
// Debounced press detection for the two user buttons.  The filter is fed the
// raw level and a millisecond timestamp so it runs the same on the device
// (polled GPIO) and in tests.

use std::sync::mpsc::Sender;

use crate::config::DEBOUNCE_MS;
use crate::events::{ButtonId, UiEvent};

/// Reports one edge per press once the level has been stable for
/// [`DEBOUNCE_MS`].
#[derive(Debug)]
pub struct Debouncer {
    last_raw: bool,
    last_change_ms: u64,
    pressed: bool,
}

impl Debouncer {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_raw: false,
            last_change_ms: now_ms,
            pressed: false,
        }
    }

    /// `raw_pressed` is the logical level (already inverted for active-LOW
    /// pins).  Returns `true` on the debounced press edge.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> bool {
        if raw_pressed != self.last_raw {
            self.last_raw = raw_pressed;
            self.last_change_ms = now_ms;
        }
        if now_ms.saturating_sub(self.last_change_ms) < DEBOUNCE_MS {
            return false;
        }
        let edge = raw_pressed && !self.pressed;
        self.pressed = raw_pressed;
        edge
    }
}

/// One debounced button that posts [`UiEvent::Button`] on each press.
pub struct Button {
    id: ButtonId,
    debouncer: Debouncer,
    ui_tx: Sender<UiEvent>,
}

impl Button {
    pub fn new(id: ButtonId, ui_tx: Sender<UiEvent>, now_ms: u64) -> Self {
        Self {
            id,
            debouncer: Debouncer::new(now_ms),
            ui_tx,
        }
    }

    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Call every [`crate::config::BUTTON_POLL_INTERVAL_MS`].
    pub fn poll(&mut self, raw_pressed: bool, now_ms: u64) {
        if self.debouncer.update(raw_pressed, now_ms) {
            log::debug!("Button {:?} pressed", self.id);
            if self.ui_tx.send(UiEvent::Button(self.id)).is_err() {
                log::debug!("Button {:?} press dropped, UI channel closed", self.id);
            }
        }
    }
}
