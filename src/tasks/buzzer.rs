// FluxSand - Buzzer Task
//
// Plays queued tones one after another so a long alarm never stalls the
// render loop.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::config::MAILBOX_WAIT_MS;
use crate::drivers::Buzzer;
use crate::mailbox::Shutdown;
use crate::tone::Tone;

pub fn buzzer_task<B: Buzzer>(mut buzzer: B, tones: Receiver<Tone>, shutdown: Shutdown) {
    log::info!("Buzzer task started");

    let poll = Duration::from_millis(MAILBOX_WAIT_MS);

    while !shutdown.is_requested() {
        match tones.recv_timeout(poll) {
            Ok(tone) => {
                if let Err(e) = buzzer.play(tone) {
                    log::warn!("Buzzer error: {e}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::info!("Buzzer task stopped");
}
