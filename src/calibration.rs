// FluxSand - Gyro Calibration
//
// The bias blob is three little-endian f32 values (x, y, z), 12 bytes.
// A missing or corrupt blob is never fatal: the loader logs and falls back
// to zero bias.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{
    CALIBRATION_ACCUMULATE_END_MS, CALIBRATION_BLOB_LEN, CALIBRATION_COMMIT_MS,
    CALIBRATION_MIN_BIAS, CALIBRATION_SETTLE_MS,
};
use crate::error::CalibrationError;
use crate::math::Vector3;

// Per-sample gyro change above which the device counts as moving (rad/s).
const STILL_DELTA_XY: f32 = 0.005;
const STILL_DELTA_Z: f32 = 0.01;

pub fn encode(bias: Vector3) -> [u8; CALIBRATION_BLOB_LEN] {
    let mut out = [0u8; CALIBRATION_BLOB_LEN];
    for (chunk, v) in out.chunks_exact_mut(4).zip([bias.x, bias.y, bias.z]) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn decode(bytes: &[u8]) -> Result<Vector3, CalibrationError> {
    if bytes.len() != CALIBRATION_BLOB_LEN {
        return Err(CalibrationError::Size(bytes.len()));
    }
    let mut values = [0.0f32; 3];
    for ((slot, chunk), axis) in values.iter_mut().zip(bytes.chunks_exact(4)).zip(['x', 'y', 'z']) {
        let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !v.is_finite() || v.abs() > 1.0 {
            return Err(CalibrationError::OutOfRange { axis, value: v });
        }
        *slot = v;
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

pub fn try_load(path: &Path) -> Result<Vector3, CalibrationError> {
    decode(&fs::read(path)?)
}

/// Stored bias, or zero (with a warning) when the blob is unusable.
pub fn load(path: &Path) -> Vector3 {
    load_checked(path).0
}

/// Like [`load`], but also hands back the reason the blob was not used.
pub fn load_checked(path: &Path) -> (Vector3, Option<CalibrationError>) {
    match try_load(path) {
        Ok(bias) => {
            log::info!(
                "Gyro calibration loaded: X={:.5} Y={:.5} Z={:.5}",
                bias.x,
                bias.y,
                bias.z
            );
            (bias, None)
        }
        Err(CalibrationError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("No calibration file at {}; using zero bias", path.display());
            (Vector3::ZERO, Some(CalibrationError::Io(e)))
        }
        Err(e) => {
            log::warn!("Calibration file {} rejected ({e}); using zero bias", path.display());
            (Vector3::ZERO, Some(e))
        }
    }
}

/// Write the blob next to its final name, then rename over it.
pub fn save(path: &Path, bias: Vector3) -> Result<(), CalibrationError> {
    let mut tmp = PathBuf::from(path);
    tmp.as_mut_os_string().push(".tmp");

    let mut file = fs::File::create(&tmp)?;
    file.write_all(&encode(bias))?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;

    log::info!("Gyro calibration saved to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Bias estimation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiasOutcome {
    /// Residual bias worth storing; add it to the current bias.
    Commit(Vector3),
    /// Residual below threshold, nothing to write.
    NotNeeded,
}

/// Averages the gyro over a still window.  Any motion restarts the window.
/// Produces one outcome, then goes quiet.
#[derive(Debug, Default)]
pub struct BiasEstimator {
    window_start_ms: Option<u64>,
    prev: Option<Vector3>,
    sum: [f64; 3],
    samples: u32,
    done: bool,
}

impl BiasEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn feed(&mut self, now_ms: u64, gyro: Vector3) -> Option<BiasOutcome> {
        if self.done {
            return None;
        }

        let moved = self.prev.map_or(false, |p| {
            let d = gyro - p;
            d.x.abs() > STILL_DELTA_XY || d.y.abs() > STILL_DELTA_XY || d.z.abs() > STILL_DELTA_Z
        });
        self.prev = Some(gyro);
        if moved {
            self.restart(now_ms);
            return None;
        }

        let start = *self.window_start_ms.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);

        if elapsed > CALIBRATION_SETTLE_MS && elapsed < CALIBRATION_ACCUMULATE_END_MS {
            self.samples += 1;
            self.sum[0] += gyro.x as f64;
            self.sum[1] += gyro.y as f64;
            self.sum[2] += gyro.z as f64;
        }

        if elapsed <= CALIBRATION_COMMIT_MS {
            return None;
        }

        self.done = true;
        if self.samples == 0 {
            return Some(BiasOutcome::NotNeeded);
        }
        let n = self.samples as f64;
        let bias = Vector3::new(
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        );
        if bias.x.abs() > CALIBRATION_MIN_BIAS
            || bias.y.abs() > CALIBRATION_MIN_BIAS
            || bias.z.abs() > CALIBRATION_MIN_BIAS
        {
            Some(BiasOutcome::Commit(bias))
        } else {
            Some(BiasOutcome::NotNeeded)
        }
    }

    fn restart(&mut self, now_ms: u64) {
        self.window_start_ms = Some(now_ms);
        self.sum = [0.0; 3];
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_bad_blobs() {
        assert!(matches!(decode(&[0u8; 11]), Err(CalibrationError::Size(11))));
        let blob = encode(Vector3::new(0.0, 1.5, 0.0));
        assert!(matches!(
            decode(&blob),
            Err(CalibrationError::OutOfRange { axis: 'y', .. })
        ));
        let mut nan = [0u8; 12];
        nan[8..].copy_from_slice(&f32::NAN.to_le_bytes());
        assert!(matches!(decode(&nan), Err(CalibrationError::OutOfRange { axis: 'z', .. })));
    }

    #[test]
    fn blob_is_little_endian() {
        let blob = encode(Vector3::new(1.0, 0.0, -0.5));
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode(&blob).unwrap(), Vector3::new(1.0, 0.0, -0.5));
    }

    fn run(est: &mut BiasEstimator, from_ms: u64, to_ms: u64, gyro: Vector3) -> Option<BiasOutcome> {
        (from_ms..to_ms).step_by(10).find_map(|t| est.feed(t, gyro))
    }

    #[test]
    fn still_device_commits_bias() {
        let mut est = BiasEstimator::new();
        let bias = Vector3::new(0.02, -0.01, 0.0);
        assert_eq!(run(&mut est, 0, 40_000, bias), Some(BiasOutcome::Commit(bias)));
        assert!(est.is_done());
        assert_eq!(est.feed(50_000, bias), None);
    }

    #[test]
    fn small_bias_is_not_saved() {
        let mut est = BiasEstimator::new();
        let out = run(&mut est, 0, 40_000, Vector3::new(0.001, 0.0, 0.002));
        assert_eq!(out, Some(BiasOutcome::NotNeeded));
    }

    #[test]
    fn motion_restarts_the_window() {
        let mut est = BiasEstimator::new();
        let still = Vector3::new(0.02, 0.0, 0.0);
        assert_eq!(run(&mut est, 0, 20_000, still), None);
        est.feed(20_000, Vector3::new(1.0, 0.0, 0.0));
        // Window restarted at 20 s, so nothing before 55 s.
        assert_eq!(run(&mut est, 20_010, 55_000, Vector3::new(1.0, 0.0, 0.0)), None);
        assert!(run(&mut est, 55_000, 56_000, Vector3::new(1.0, 0.0, 0.0)).is_some());
    }
}
