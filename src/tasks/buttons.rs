// FluxSand - Button Task
//
// Polls both user buttons at BUTTON_POLL_INTERVAL_MS through the debouncer.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::config::BUTTON_POLL_INTERVAL_MS;
use crate::events::{ButtonId, UiEvent};
use crate::input::Button;
use crate::mailbox::Shutdown;

/// `is_pressed` reads the logical level of one button.
pub fn button_task<F>(mut is_pressed: F, ui_tx: Sender<UiEvent>, shutdown: Shutdown)
where
    F: FnMut(ButtonId) -> bool,
{
    log::info!("Button task started");

    let now = crate::now_ms();
    let mut buttons = [
        Button::new(ButtonId::Mode, ui_tx.clone(), now),
        Button::new(ButtonId::Action, ui_tx, now),
    ];
    let poll = Duration::from_millis(BUTTON_POLL_INTERVAL_MS);

    while !shutdown.is_requested() {
        let now = crate::now_ms();
        for button in &mut buttons {
            let level = is_pressed(button.id());
            button.poll(level, now);
        }
        thread::sleep(poll);
    }
    log::info!("Button task stopped");
}
