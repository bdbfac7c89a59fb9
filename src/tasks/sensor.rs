// FluxSand - Sensor Task
//
// Reads the IMU at IMU_SAMPLE_INTERVAL_US, removes the gyro bias, runs the
// one-shot bias estimator and posts each SensorFrame to the AHRS mailbox.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::calibration::{self, BiasEstimator, BiasOutcome};
use crate::config::IMU_SAMPLE_INTERVAL_US;
use crate::drivers::ImuSource;
use crate::events::SensorFrame;
use crate::mailbox::{Mailbox, Shutdown};
use crate::math::Vector3;

/// Consecutive read failures between two warnings.
const READ_ERROR_LOG_EVERY: u32 = 1000;

pub struct SensorReader<I: ImuSource> {
    imu: I,
    bias: Vector3,
    estimator: BiasEstimator,
    calibration_path: PathBuf,
    read_errors: u32,
}

impl<I: ImuSource> SensorReader<I> {
    pub fn new(imu: I, bias: Vector3, calibration_path: PathBuf) -> Self {
        Self {
            imu,
            bias,
            estimator: BiasEstimator::new(),
            calibration_path,
            read_errors: 0,
        }
    }

    pub fn bias(&self) -> Vector3 {
        self.bias
    }

    /// One bias-corrected sample, or `None` when the read failed.
    pub fn sample(&mut self, now_us: u64) -> Option<SensorFrame> {
        let (accel, gyro) = match self.imu.read_imu() {
            Ok(reading) => reading,
            Err(e) => {
                if self.read_errors % READ_ERROR_LOG_EVERY == 0 {
                    log::warn!("IMU read error: {e}");
                }
                self.read_errors = self.read_errors.wrapping_add(1);
                return None;
            }
        };
        self.read_errors = 0;

        let gyro = gyro - self.bias;
        if let Some(outcome) = self.estimator.feed(now_us / 1000, gyro) {
            self.finish_calibration(outcome);
        }
        Some(SensorFrame::new(now_us, accel, gyro))
    }

    fn finish_calibration(&mut self, outcome: BiasOutcome) {
        match outcome {
            BiasOutcome::Commit(residual) => {
                self.bias = self.bias + residual;
                log::info!(
                    "Gyro bias updated: X={:.5} Y={:.5} Z={:.5}",
                    self.bias.x,
                    self.bias.y,
                    self.bias.z
                );
                if let Err(e) = calibration::save(&self.calibration_path, self.bias) {
                    log::error!("Saving calibration failed: {e}");
                }
            }
            BiasOutcome::NotNeeded => log::info!("Gyro bias within tolerance, calibration unchanged"),
        }
    }
}

pub fn sensor_task<I: ImuSource>(mut reader: SensorReader<I>, out: Arc<Mailbox<SensorFrame>>, shutdown: Shutdown) {
    log::info!("Sensor task started");

    let interval = Duration::from_micros(IMU_SAMPLE_INTERVAL_US);

    while !shutdown.is_requested() {
        let tick_start = Instant::now();

        if let Some(frame) = reader.sample(crate::now_us()) {
            out.post(frame);
        }

        // Sleep for the remainder of the sampling interval.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
    log::info!("Sensor task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant {
        gyro: Vector3,
        fail: bool,
    }

    impl ImuSource for Constant {
        fn read_imu(&mut self) -> anyhow::Result<(Vector3, Vector3)> {
            if self.fail {
                anyhow::bail!("bus timeout");
            }
            Ok((Vector3::new(0.0, 0.0, 9.8), self.gyro))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fluxsand-{}-{name}", std::process::id()))
    }

    #[test]
    fn bias_is_subtracted() {
        let imu = Constant {
            gyro: Vector3::new(0.1, 0.2, 0.3),
            fail: false,
        };
        let mut r = SensorReader::new(imu, Vector3::new(0.1, 0.2, 0.3), temp_path("unused"));
        let frame = r.sample(1_000).unwrap();
        assert!(frame.gyro.norm() < 1e-6);
        assert_eq!(frame.timestamp_us, 1_000);
    }

    #[test]
    fn read_errors_yield_nothing() {
        let imu = Constant {
            gyro: Vector3::ZERO,
            fail: true,
        };
        let mut r = SensorReader::new(imu, Vector3::ZERO, temp_path("unused"));
        assert!(r.sample(0).is_none());
        assert!(r.sample(1_000).is_none());
    }

    #[test]
    fn still_device_calibrates_and_saves() {
        let path = temp_path("cali.bin");
        let drift = Vector3::new(0.02, -0.01, 0.0);
        let imu = Constant {
            gyro: drift,
            fail: false,
        };
        let mut r = SensorReader::new(imu, Vector3::ZERO, path.clone());
        for ms in (0..40_000u64).step_by(10) {
            r.sample(ms * 1000);
        }
        assert_eq!(r.bias(), drift);
        assert_eq!(calibration::try_load(&path).unwrap(), drift);

        // After the update the output is bias-free.
        let frame = r.sample(41_000_000).unwrap();
        assert!(frame.gyro.norm() < 1e-6);
        let _ = std::fs::remove_file(&path);
    }
}
