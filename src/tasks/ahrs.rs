// FluxSand - AHRS Task
//
// Blocks on the sensor mailbox, integrates each frame and fans the result out:
// the orientation to the gesture mailbox, the roll-derived sand direction to
// the gravity cell.

use std::sync::Arc;
use std::time::Duration;

use crate::ahrs::Ahrs;
use crate::config::MAILBOX_WAIT_MS;
use crate::events::{OrientationFrame, SensorFrame};
use crate::mailbox::{GravityCell, Mailbox, Shutdown};
use crate::sand::gravity_from_roll;

/// Run one frame through the filter and publish it.  Rejected frames leave
/// the filter state and both outputs untouched.
pub fn process(ahrs: &mut Ahrs, frame: &SensorFrame, out: &Mailbox<OrientationFrame>, gravity: &GravityCell) -> bool {
    match ahrs.update(frame) {
        Ok(orientation) => {
            out.post(orientation);
            gravity.store(gravity_from_roll(orientation.euler.roll));
            true
        }
        Err(e) => {
            log::debug!("AHRS dropped sample at {} us: {e}", frame.timestamp_us);
            false
        }
    }
}

pub fn ahrs_task(
    mut ahrs: Ahrs,
    input: Arc<Mailbox<SensorFrame>>,
    out: Arc<Mailbox<OrientationFrame>>,
    gravity: GravityCell,
    shutdown: Shutdown,
) {
    log::info!("AHRS task started");

    let poll = Duration::from_millis(MAILBOX_WAIT_MS);
    let mut rejected: u64 = 0;

    while let Some(frame) = input.take(&shutdown, poll) {
        if !process(&mut ahrs, &frame, &out, &gravity) {
            rejected += 1;
            if rejected % 1000 == 1 {
                log::warn!("AHRS rejected {rejected} samples so far");
            }
        }
    }
    log::info!("AHRS task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn level_frame_points_sand_down() {
        let mut ahrs = Ahrs::new(0.07, 10.0, 1.0);
        let out = Mailbox::new();
        let gravity = GravityCell::new(-1.0);
        for i in 0..500u64 {
            let frame = SensorFrame::new(i * 1000, Vector3::new(0.0, 0.0, 9.84), Vector3::ZERO);
            assert!(process(&mut ahrs, &frame, &out, &gravity));
        }
        let o = out.try_take().unwrap();
        assert_eq!(o.timestamp_us, 499_000);
        // Roll near 0 maps to 270 degrees.
        let g = gravity.load();
        assert!((g - 270.0).abs() < 2.0, "{g}");
    }

    #[test]
    fn bad_frame_publishes_nothing() {
        let mut ahrs = Ahrs::new(0.07, 10.0, 1.0);
        let out = Mailbox::new();
        let gravity = GravityCell::new(12.0);
        let frame = SensorFrame::new(0, Vector3::new(f32::NAN, 0.0, 9.8), Vector3::ZERO);
        assert!(!process(&mut ahrs, &frame, &out, &gravity));
        assert!(out.try_take().is_none());
        assert_eq!(gravity.load(), 12.0);
    }
}
