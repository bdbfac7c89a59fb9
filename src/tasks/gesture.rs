// FluxSand - Gesture Task
//
// Feeds every orientation frame into the pipeline and forwards confirmed
// gestures to the UI task.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::Classifier;
use crate::config::MAILBOX_WAIT_MS;
use crate::events::{OrientationFrame, UiEvent};
use crate::gesture::GesturePipeline;
use crate::mailbox::{Mailbox, Shutdown};

/// Pipeline statistics are logged this often (samples).
const STATS_EVERY: u64 = 60_000;

pub fn gesture_task<C: Classifier>(
    mut pipeline: GesturePipeline<C>,
    input: Arc<Mailbox<OrientationFrame>>,
    ui_tx: Sender<UiEvent>,
    shutdown: Shutdown,
) {
    log::info!("Gesture task started (stride {})", pipeline.stride());

    let poll = Duration::from_millis(MAILBOX_WAIT_MS);

    while let Some(frame) = input.take(&shutdown, poll) {
        if let Some(prediction) = pipeline.push(&frame) {
            if ui_tx.send(UiEvent::Gesture(prediction.gesture)).is_err() {
                log::warn!("UI channel closed, exiting gesture task");
                return;
            }
        }

        let stats = pipeline.stats();
        if stats.samples % STATS_EVERY == 0 {
            log::debug!(
                "Gesture stats: {} samples, {} inferences, {} failures, {} emitted",
                stats.samples,
                stats.inferences,
                stats.failures,
                stats.emitted
            );
        }
    }
    log::info!("Gesture task stopped");
}
