// FluxSand - Simulated Peripherals
//
// Host stand-ins so the full firmware runs off-target: an IMU that rocks the
// device slowly from side to side, fixed room conditions, a buzzer that
// logs, and a matrix that dumps itself at trace level.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Buzzer, EnvSource, ImuSource, MatrixDisplay};
use crate::config::{GRAVITY, IMU_SAMPLE_INTERVAL_US};
use crate::display::Frame;
use crate::events::EnvReading;
use crate::math::Vector3;
use crate::tone::Tone;

/// Peak roll of the rocking motion (rad).
const ROCK_AMPLITUDE: f32 = 0.6;
const ROCK_PERIOD_S: f32 = 20.0;
const ACCEL_NOISE: f32 = 0.02;
const GYRO_NOISE: f32 = 0.002;

pub struct SimImu {
    samples: u64,
    rng: StdRng,
}

impl SimImu {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            samples: 0,
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// Roll angle and rate of the synthetic motion at `t` seconds.
    pub fn roll_at(t: f32) -> (f32, f32) {
        let w = TAU / ROCK_PERIOD_S;
        (ROCK_AMPLITUDE * (w * t).sin(), ROCK_AMPLITUDE * w * (w * t).cos())
    }

    fn noise(&mut self, amplitude: f32) -> Vector3 {
        let mut n = || self.rng.gen_range(-amplitude..=amplitude);
        Vector3::new(n(), n(), n())
    }
}

impl ImuSource for SimImu {
    fn read_imu(&mut self) -> anyhow::Result<(Vector3, Vector3)> {
        let t = self.samples as f32 * IMU_SAMPLE_INTERVAL_US as f32 / 1e6;
        self.samples += 1;

        let (roll, rate) = Self::roll_at(t);
        let accel = Vector3::new(0.0, GRAVITY * roll.sin(), GRAVITY * roll.cos()) + self.noise(ACCEL_NOISE);
        let gyro = Vector3::new(rate, 0.0, 0.0) + self.noise(GYRO_NOISE);
        Ok((accel, gyro))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimEnv {
    pub reading: EnvReading,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self {
            reading: EnvReading {
                temperature_c: 22.5,
                humidity_pct: 45.0,
                pressure_pa: 101_325.0,
                lux: 150.0,
                ntc_c: 22.0,
            },
        }
    }
}

impl EnvSource for SimEnv {
    fn read_env(&mut self) -> anyhow::Result<EnvReading> {
        Ok(self.reading)
    }
}

#[derive(Debug, Default)]
pub struct LogBuzzer;

impl Buzzer for LogBuzzer {
    fn play(&mut self, tone: Tone) -> anyhow::Result<()> {
        log::info!(
            "Beep {:?}{} {:.0} Hz for {} ms",
            tone.note,
            tone.octave,
            tone.frequency_hz(),
            tone.duration_ms
        );
        thread::sleep(Duration::from_millis(tone.duration_ms as u64));
        Ok(())
    }
}

/// Keeps the last frame; logs it whenever it changes.
#[derive(Debug, Default)]
pub struct AsciiDisplay {
    last: Option<Frame>,
    intensity: u8,
    pushes: u64,
}

impl AsciiDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    pub fn pushes(&self) -> u64 {
        self.pushes
    }
}

impl MatrixDisplay for AsciiDisplay {
    fn push_frame(&mut self, frame: &Frame, intensity: u8) -> anyhow::Result<()> {
        self.pushes += 1;
        self.intensity = intensity.min(15);
        if self.last.as_ref() != Some(frame) {
            log::trace!("matrix (intensity {}):\n{}", self.intensity, frame.to_ascii());
            self.last = Some(*frame);
        }
        Ok(())
    }
}
