// FluxSand - Hardware & System Configuration
//
// Compile-time constants first, runtime `Config` (JSON, validated at
// startup) at the bottom.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::classifier::ModelShape;
use crate::error::ConfigError;
use crate::gesture::FeatureLayout;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (device build)
// ---------------------------------------------------------------------------
pub const PIN_BUTTON_MODE: i32 = 3;   // User button 1 (INPUT_PULLUP, active LOW)
pub const PIN_BUTTON_ACTION: i32 = 4; // User button 2 (INPUT_PULLUP, active LOW)
pub const PIN_BUZZER: i32 = 5;        // Passive piezo buzzer
pub const PIN_I2C_SDA: i32 = 6;
pub const PIN_I2C_SCL: i32 = 7;
pub const PIN_MATRIX_DIN: i32 = 8;    // MAX7219 chain data
pub const PIN_MATRIX_CLK: i32 = 9;
pub const PIN_MATRIX_CS: i32 = 10;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU9250: u8 = 0x68;
pub const I2C_ADDR_AHT20: u8 = 0x38;
pub const I2C_ADDR_BMP280: u8 = 0x76;
pub const I2C_ADDR_ADS1115: u8 = 0x48;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 4096;
pub const STACK_AHRS: usize = 4096;
pub const STACK_GESTURE: usize = 16384;
pub const STACK_SAND: usize = 4096;
pub const STACK_UI: usize = 8192;
pub const STACK_ENV: usize = 4096;
pub const STACK_BUZZER: usize = 3072;
pub const STACK_BUTTONS: usize = 3072;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
pub const IMU_SAMPLE_INTERVAL_US: u64 = 1000;   // 1 kHz
pub const SAND_TICK_MS: u64 = 25;
pub const RENDER_TICK_MS: u64 = 5;
pub const ENV_POLL_INTERVAL_MS: u64 = 1000;
pub const BUTTON_POLL_INTERVAL_MS: u64 = 10;
pub const DEBOUNCE_MS: u64 = 50;
pub const MAILBOX_WAIT_MS: u64 = 100;            // upper bound on shutdown latency

// ---------------------------------------------------------------------------
// Physics / AHRS
// ---------------------------------------------------------------------------
pub const GRAVITY: f32 = 9.84;                   // m/s², matches the training data
pub const AHRS_DT_MIN_S: f32 = 0.0001;
pub const AHRS_DT_MAX_S: f32 = 0.01;
pub const AHRS_DT_FALLBACK_S: f32 = 0.001;
pub const AHRS_INITIAL_QUATERNION: [f32; 4] = [-1.0, 0.0, 0.0, 0.0];
pub const AHRS_BETA_MIN: f32 = 0.07;
pub const AHRS_BETA_MAX: f32 = 2.0;

// ---------------------------------------------------------------------------
// Sand
// ---------------------------------------------------------------------------
pub const GRID_SIZE: usize = 16;
pub const CHAMBER_CAPACITY: usize = 128;         // grains in a full hourglass
pub const SAND_GRAVITY_OFFSET_DEG: f32 = 225.0;
pub const SAND_ACCEPT_ANGLE_DEG: f32 = 55.0;
pub const SAND_NOISE_DEG: f32 = 30.0;
pub const SAND_SETTLE_TICKS: usize = 16;

// ---------------------------------------------------------------------------
// Display (8 x MAX7219, 16x32 composite)
// ---------------------------------------------------------------------------
pub const MATRIX_ROWS: usize = 16;
pub const MATRIX_COLS: usize = 32;
pub const MATRIX_CHIPS: usize = 8;
pub const DEFAULT_INTENSITY: u8 = 3;

// ---------------------------------------------------------------------------
// Gyro calibration
// ---------------------------------------------------------------------------
pub const CALIBRATION_BLOB_LEN: usize = 12;
pub const CALIBRATION_SETTLE_MS: u64 = 5_000;
pub const CALIBRATION_ACCUMULATE_END_MS: u64 = 30_000;
pub const CALIBRATION_COMMIT_MS: u64 = 35_000;
pub const CALIBRATION_MIN_BIAS: f32 = 0.005;     // rad/s, below this nothing is saved

// ---------------------------------------------------------------------------
// MPU-9250 Scale Factors (±16 g, ±2000 °/s)
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_16G: f32 = 16.0 / 32768.0 * 9.80665;
pub const GYRO_SCALE_2000: f32 = 2000.0 / 32768.0 * std::f32::consts::PI / 180.0;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Runtime options.  Every field has a default so an empty `{}` (or no file
/// at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fraction of the model window refreshed between inferences.
    pub update_ratio: f32,
    pub confidence_threshold: f32,
    pub history_size: usize,
    pub min_consensus_votes: usize,
    /// Madgwick gain after the bootstrap phase.
    pub beta_steady: f32,
    pub bootstrap_beta: f32,
    pub bootstrap_secs: f32,
    pub model_path: String,
    pub labels_path: Option<String>,
    pub feature_layout: FeatureLayout,
    pub calibration_path: String,
    /// Fixed seed for the sand noise; random when absent.
    pub sand_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_ratio: 0.1,
            confidence_threshold: 0.6,
            history_size: 5,
            min_consensus_votes: 3,
            beta_steady: 0.07,
            bootstrap_beta: 10.0,
            bootstrap_secs: 1.0,
            model_path: "model.onnx".into(),
            labels_path: None,
            feature_layout: FeatureLayout::Full8,
            calibration_path: "cali_data.bin".into(),
            sand_seed: None,
        }
    }
}

impl Config {
    /// Read and validate a JSON config.  `None` yields the validated defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                Self::from_json(&text).map_err(|e| match e {
                    ConfigError::Unreadable { reason, .. } => ConfigError::Unreadable {
                        path: path.display().to_string(),
                        reason,
                    },
                    other => other,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Unreadable {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that do not depend on the model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.update_ratio > 0.0 && self.update_ratio <= 1.0) {
            return Err(ConfigError::UpdateRatio(self.update_ratio));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ConfidenceThreshold(self.confidence_threshold));
        }
        if self.history_size == 0 {
            return Err(ConfigError::HistorySize);
        }
        if self.min_consensus_votes == 0 || self.min_consensus_votes > self.history_size {
            return Err(ConfigError::ConsensusVotes {
                votes: self.min_consensus_votes,
                history_size: self.history_size,
            });
        }
        if !self.beta_steady.is_finite()
            || !(AHRS_BETA_MIN..=AHRS_BETA_MAX).contains(&self.beta_steady)
        {
            return Err(ConfigError::BetaSteady(self.beta_steady));
        }
        if !self.bootstrap_secs.is_finite() || self.bootstrap_secs < 0.0 {
            return Err(ConfigError::BootstrapSecs(self.bootstrap_secs));
        }
        Ok(())
    }

    /// Checks against the loaded model.  Returns the refresh stride.
    pub fn validate_model(&self, shape: &ModelShape) -> Result<usize, ConfigError> {
        if shape.features != self.feature_layout.width() {
            return Err(ConfigError::FeatureLayoutMismatch {
                model: shape.features,
                layout: self.feature_layout.name(),
                packed: self.feature_layout.width(),
            });
        }
        let stride = (shape.window as f32 * self.update_ratio).floor() as usize;
        if stride == 0 {
            return Err(ConfigError::ZeroStride {
                window: shape.window,
                ratio: self.update_ratio,
            });
        }
        Ok(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = Config::from_json(r#"{ "history_size": 15, "update_ratio": 0.01 }"#).unwrap();
        assert_eq!(c.history_size, 15);
        assert_eq!(c.min_consensus_votes, 3);
        assert_eq!(c.feature_layout, FeatureLayout::Full8);
    }

    #[test]
    fn layout_parses_from_json() {
        let c = Config::from_json(r#"{ "feature_layout": "accel3" }"#).unwrap();
        assert_eq!(c.feature_layout, FeatureLayout::Accel3);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = |json: &str| Config::from_json(json).unwrap_err();

        assert_eq!(bad(r#"{ "update_ratio": 0.0 }"#), ConfigError::UpdateRatio(0.0));
        assert_eq!(
            bad(r#"{ "confidence_threshold": 1.5 }"#),
            ConfigError::ConfidenceThreshold(1.5)
        );
        assert_eq!(bad(r#"{ "history_size": 0 }"#), ConfigError::HistorySize);
        assert_eq!(
            bad(r#"{ "min_consensus_votes": 6 }"#),
            ConfigError::ConsensusVotes {
                votes: 6,
                history_size: 5
            }
        );
        assert_eq!(bad(r#"{ "beta_steady": 3.0 }"#), ConfigError::BetaSteady(3.0));
        assert!(matches!(bad(r#"{ "nope": 1 }"#), ConfigError::Unreadable { .. }));
    }

    #[test]
    fn model_checks_stride_and_layout() {
        let c = Config::default();
        let shape = ModelShape {
            window: 100,
            features: 8,
            classes: 10,
        };
        assert_eq!(c.validate_model(&shape), Ok(10));

        let narrow = ModelShape { features: 3, ..shape };
        assert!(matches!(
            c.validate_model(&narrow),
            Err(ConfigError::FeatureLayoutMismatch { model: 3, .. })
        ));

        let tiny = ModelShape { window: 5, ..shape };
        assert_eq!(
            c.validate_model(&tiny),
            Err(ConfigError::ZeroStride {
                window: 5,
                ratio: 0.1
            })
        );
    }
}
