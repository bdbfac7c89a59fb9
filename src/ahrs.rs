// FluxSand - Orientation Estimator
//
// Madgwick gradient-descent filter, IMU (6-DoF) variant.  The quaternion
// rotates body frame into world frame; the correction step pulls the
// predicted gravity direction towards the measured accelerometer vector.

use crate::config::{
    Config, AHRS_DT_FALLBACK_S, AHRS_DT_MAX_S, AHRS_DT_MIN_S, AHRS_INITIAL_QUATERNION, GRAVITY,
};
use crate::error::AhrsError;
use crate::events::{OrientationFrame, SensorFrame};
use crate::math::{Quaternion, Vector3};

pub struct Ahrs {
    q: Quaternion,
    beta_steady: f32,
    bootstrap_beta: f32,
    bootstrap_us: u64,
    start_us: Option<u64>,
    prev_us: Option<u64>,
    last: OrientationFrame,
}

impl Ahrs {
    pub fn new(beta_steady: f32, bootstrap_beta: f32, bootstrap_secs: f32) -> Self {
        let [q0, q1, q2, q3] = AHRS_INITIAL_QUATERNION;
        let q = Quaternion::new(q0, q1, q2, q3);
        Self {
            q,
            beta_steady,
            bootstrap_beta,
            bootstrap_us: (bootstrap_secs.max(0.0) * 1e6) as u64,
            start_us: None,
            prev_us: None,
            last: OrientationFrame {
                quaternion: q,
                quaternion_without_yaw: q,
                ..Default::default()
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.beta_steady, config.bootstrap_beta, config.bootstrap_secs)
    }

    pub fn quaternion(&self) -> Quaternion {
        self.q
    }

    /// Last successfully published output.
    pub fn last_output(&self) -> &OrientationFrame {
        &self.last
    }

    /// Gain in effect `elapsed_us` after the first sample.
    pub fn beta_at(&self, elapsed_us: u64) -> f32 {
        if elapsed_us <= self.bootstrap_us {
            self.bootstrap_beta
        } else {
            self.beta_steady
        }
    }

    /// Integrate one sample.  On error the filter state and the last
    /// output are left untouched.
    pub fn update(&mut self, frame: &SensorFrame) -> Result<OrientationFrame, AhrsError> {
        if !frame.is_finite() {
            return Err(AhrsError::NonFiniteInput);
        }

        let now = frame.timestamp_us;
        let start = self.start_us.unwrap_or(now);
        let dt = match self.prev_us {
            Some(prev) => (now.saturating_sub(prev) as f32 * 1e-6).clamp(AHRS_DT_MIN_S, AHRS_DT_MAX_S),
            None => AHRS_DT_FALLBACK_S,
        };
        let beta = self.beta_at(now.saturating_sub(start));

        let q = step(&self.q, frame.accel, frame.gyro, beta, dt)
            .filter(Quaternion::is_finite)
            .ok_or(AhrsError::Diverged)?;

        self.q = q;
        self.start_us = Some(start);
        self.prev_us = Some(now);
        self.last = publish(&q, frame);
        Ok(self.last)
    }
}

/// One Madgwick iteration.  Returns `None` when normalization fails.
fn step(q: &Quaternion, accel: Vector3, gyro: Vector3, beta: f32, dt: f32) -> Option<Quaternion> {
    let Quaternion { q0, q1, q2, q3 } = *q;
    let (gx, gy, gz) = (gyro.x, gyro.y, gyro.z);

    // Rate of change from the gyroscope: ½ q ⊗ (0, ω)
    let mut dot0 = 0.5 * (-q1 * gx - q2 * gy - q3 * gz);
    let mut dot1 = 0.5 * (q0 * gx + q2 * gz - q3 * gy);
    let mut dot2 = 0.5 * (q0 * gy - q1 * gz + q3 * gx);
    let mut dot3 = 0.5 * (q0 * gz + q1 * gy - q2 * gx);

    if !accel.is_zero() {
        let n = accel.norm();
        let (ax, ay, az) = (accel.x / n, accel.y / n, accel.z / n);

        let (_2q0, _2q1, _2q2, _2q3) = (2.0 * q0, 2.0 * q1, 2.0 * q2, 2.0 * q3);
        let (_4q0, _4q1, _4q2) = (4.0 * q0, 4.0 * q1, 4.0 * q2);
        let (_8q1, _8q2) = (8.0 * q1, 8.0 * q2);
        let (q0q0, q1q1, q2q2, q3q3) = (q0 * q0, q1 * q1, q2 * q2, q3 * q3);

        // Gradient of the gravity-alignment objective
        let s0 = _4q0 * q2q2 + _2q2 * ax + _4q0 * q1q1 - _2q1 * ay;
        let s1 = _4q1 * q3q3 - _2q3 * ax + 4.0 * q0q0 * q1 - _2q0 * ay - _4q1
            + _8q1 * q1q1
            + _8q1 * q2q2
            + _4q1 * az;
        let s2 = 4.0 * q0q0 * q2 + _2q0 * ax + _4q2 * q3q3 - _2q3 * ay - _4q2
            + _8q2 * q1q1
            + _8q2 * q2q2
            + _4q2 * az;
        let s3 = 4.0 * q1q1 * q3 - _2q1 * ax + 4.0 * q2q2 * q3 - _2q2 * ay;

        // Zero gradient means already aligned.
        let s_norm = (s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3).sqrt();
        if s_norm > 0.0 {
            let k = beta / s_norm;
            dot0 -= k * s0;
            dot1 -= k * s1;
            dot2 -= k * s2;
            dot3 -= k * s3;
        }
    }

    Quaternion::new(q0 + dot0 * dt, q1 + dot1 * dt, q2 + dot2 * dt, q3 + dot3 * dt).normalized()
}

fn publish(q: &Quaternion, frame: &SensorFrame) -> OrientationFrame {
    let euler = q.to_euler();
    let world = q.rotate(frame.accel) - Vector3::new(0.0, 0.0, GRAVITY);
    let euler_without_yaw = euler.without_yaw();

    OrientationFrame {
        timestamp_us: frame.timestamp_us,
        quaternion: *q,
        euler,
        linear_accel: q.rotate_inverse(world),
        euler_without_yaw,
        quaternion_without_yaw: Quaternion::from_euler(&euler_without_yaw),
        accel: frame.accel,
        gyro: frame.gyro,
    }
}
