// FluxSand - Peripheral Interfaces
//
// The tasks only see these traits.  Register-level drivers for the board
// live in the submodules (device parts gated on `target_os = "espidf"`);
// `sim` provides host stand-ins.

#[cfg(target_os = "espidf")]
pub mod buzzer;
pub mod env;
pub mod imu;
pub mod max7219;
pub mod sim;

use crate::display::Frame;
use crate::events::EnvReading;
use crate::math::Vector3;
use crate::tone::Tone;

/// Thread-safe handle to the shared I2C bus.
#[cfg(target_os = "espidf")]
pub type SharedBus = &'static std::sync::Mutex<esp_idf_hal::i2c::I2cDriver<'static>>;

/// 6-axis inertial source.  Returns (accel m/s², gyro rad/s) without any
/// bias correction.
pub trait ImuSource: Send {
    fn read_imu(&mut self) -> anyhow::Result<(Vector3, Vector3)>;
}

pub trait EnvSource: Send {
    fn read_env(&mut self) -> anyhow::Result<EnvReading>;
}

/// The 16x32 LED matrix.  `intensity` is 0..=15.
pub trait MatrixDisplay: Send {
    fn push_frame(&mut self, frame: &Frame, intensity: u8) -> anyhow::Result<()>;
}

/// Blocks for the duration of the tone.
pub trait Buzzer: Send {
    fn play(&mut self, tone: Tone) -> anyhow::Result<()>;
}
