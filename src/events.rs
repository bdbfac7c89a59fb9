// FluxSand - System Events & Data Types

use crate::gesture::Gesture;
use crate::math::{EulerAngle, Quaternion, Vector3};

// ---------------------------------------------------------------------------
// Sensor Data (6-axis IMU reading from the MPU-9250)
// ---------------------------------------------------------------------------

/// One IMU sample.  Accel in m/s², gyro in rad/s, timestamp in microseconds
/// since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFrame {
    pub timestamp_us: u64,
    pub accel: Vector3,
    pub gyro: Vector3,
}

impl SensorFrame {
    pub fn new(timestamp_us: u64, accel: Vector3, gyro: Vector3) -> Self {
        Self {
            timestamp_us,
            accel,
            gyro,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.accel.is_finite() && self.gyro.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Orientation (AHRS output)
// ---------------------------------------------------------------------------

/// Everything the orientation filter publishes for one sample.  The raw
/// accel/gyro are carried along so consumers see a consistent set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationFrame {
    pub timestamp_us: u64,
    pub quaternion: Quaternion,
    pub euler: EulerAngle,
    /// Body-frame acceleration with gravity removed (m/s²).
    pub linear_accel: Vector3,
    pub euler_without_yaw: EulerAngle,
    pub quaternion_without_yaw: Quaternion,
    pub accel: Vector3,
    pub gyro: Vector3,
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_pa: f32,
    pub lux: f32,
    pub ntc_c: f32,
}

// ---------------------------------------------------------------------------
// UI Events - sent to the UI task via channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    /// Cycles the display mode.
    Mode,
    /// Stopwatch start/stop, timer cancel.
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    /// The gesture pipeline confirmed a new gesture.
    Gesture(Gesture),
    /// Rising edge on a user button.
    Button(ButtonId),
    /// Fresh environment reading.
    Environment(EnvReading),
}
