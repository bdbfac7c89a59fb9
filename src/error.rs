// FluxSand - Error Types
//
// Typed errors for the library layers.  Application glue (main, tasks,
// drivers) wraps these in `anyhow::Error`.

use thiserror::Error;

/// Invalid configuration.  Startup is refused when any of these surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("update_ratio must be in (0, 1], got {0}")]
    UpdateRatio(f32),

    #[error("confidence_threshold must be in [0, 1], got {0}")]
    ConfidenceThreshold(f32),

    #[error("history_size must be at least 1")]
    HistorySize,

    #[error("min_consensus_votes must be in [1, history_size = {history_size}], got {votes}")]
    ConsensusVotes { votes: usize, history_size: usize },

    #[error("beta_steady must be finite and in [0.07, 2.0], got {0}")]
    BetaSteady(f32),

    #[error("bootstrap_secs must be finite and non-negative, got {0}")]
    BootstrapSecs(f32),

    #[error("refresh stride floor({window} * {ratio}) is zero; raise update_ratio")]
    ZeroStride { window: usize, ratio: f32 },

    #[error("model expects {model} features per sample but layout {layout} packs {packed}")]
    FeatureLayoutMismatch {
        model: usize,
        layout: &'static str,
        packed: usize,
    },

    #[error("unknown gesture label {0:?} in labels file")]
    UnknownLabel(String),

    #[error("model declares {model} classes but the labels file lists {labels}")]
    LabelCount { model: usize, labels: usize },

    #[error("cannot read config {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Faults raised by a classifier backend.  None of them are fatal once the
/// pipeline is running: the affected inference is dropped.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    Onnx(#[from] ort::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input size: expected {expected}, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("invalid output: expected {expected} probabilities, got {actual}")]
    InvalidOutputSize { expected: usize, actual: usize },

    #[error("non-finite probability at index {0}")]
    NonFinite(usize),

    #[error("unsupported model shape {0:?}; expected (1, W, F) input and (1, C) output")]
    UnsupportedShape(Vec<i64>),

    #[error("missing model {kind}")]
    MissingIo { kind: &'static str },

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Calibration blob faults.  The loader recovers from all of them by falling
/// back to zero bias.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("calibration blob is {0} bytes, expected 12")]
    Size(usize),

    #[error("calibration value {axis} = {value} is not finite or exceeds 1.0")]
    OutOfRange { axis: char, value: f32 },
}

/// A sensor frame the orientation filter refused to integrate.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AhrsError {
    #[error("non-finite sensor input")]
    NonFiniteInput,

    #[error("quaternion update produced a non-finite or degenerate result")]
    Diverged,
}
