// FluxSand - Environment Task
//
// Polls the environment sensors once per ENV_POLL_INTERVAL_MS, forwards the
// reading to the UI and derives the matrix brightness from ambient light.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ENV_POLL_INTERVAL_MS;
use crate::drivers::EnvSource;
use crate::env::LightSmoother;
use crate::events::UiEvent;
use crate::mailbox::Shutdown;

pub fn env_task<E: EnvSource>(mut env: E, ui_tx: Sender<UiEvent>, intensity: Arc<AtomicU8>, shutdown: Shutdown) {
    log::info!("Environment task started");

    let interval = Duration::from_millis(ENV_POLL_INTERVAL_MS);
    let mut light = LightSmoother::new();

    while !shutdown.is_requested() {
        let tick_start = Instant::now();

        match env.read_env() {
            Ok(reading) => {
                if let Some(level) = light.push(reading.lux) {
                    log::debug!("Matrix intensity -> {level}");
                    intensity.store(level, Ordering::Relaxed);
                }
                if ui_tx.send(UiEvent::Environment(reading)).is_err() {
                    log::warn!("UI channel closed, exiting environment task");
                    return;
                }
            }
            Err(e) => log::warn!("Environment read error: {e}"),
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
    log::info!("Environment task stopped");
}
