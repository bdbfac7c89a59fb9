// FluxSand - Gesture Recognition
//
// Sliding window of IMU/orientation features -> classifier -> confidence
// gate -> majority vote over recent windows -> transition-only events.

mod features;
mod pipeline;
mod voting;

pub use features::{FeatureBuffer, FeatureLayout, FeatureSample};
pub use pipeline::{GesturePipeline, PipelineStats};
pub use voting::PredictionHistory;

// ---------------------------------------------------------------------------
// Gesture taxonomy
// ---------------------------------------------------------------------------

/// Model output categories.  Discriminants are the model's class indices in
/// the default label order; `Unrecognized` is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Rotate 180 degrees.
    FlipOver,
    /// Sustained, strong vibration.
    LongVibration,
    RotateCw,
    RotateCcw,
    /// Quick backward shake.
    ShakeBackward,
    /// Quick forward shake.
    ShakeForward,
    /// Short, slight vibration.
    ShortVibration,
    /// Tilt left and hold.
    TiltLeft,
    /// Tilt right and hold.
    TiltRight,
    /// No motion or slow movement.
    Still,
    Unrecognized,
}

impl Gesture {
    /// Recognizable labels in default model index order.
    pub const ALL: [Gesture; 10] = [
        Gesture::FlipOver,
        Gesture::LongVibration,
        Gesture::RotateCw,
        Gesture::RotateCcw,
        Gesture::ShakeBackward,
        Gesture::ShakeForward,
        Gesture::ShortVibration,
        Gesture::TiltLeft,
        Gesture::TiltRight,
        Gesture::Still,
    ];

    /// Integer label id; `Unrecognized` is -1.
    pub fn id(&self) -> i8 {
        match self {
            Self::Unrecognized => -1,
            other => Self::ALL
                .iter()
                .position(|g| g == other)
                .map(|i| i as i8)
                .unwrap_or(-1),
        }
    }

    pub fn from_id(id: i8) -> Option<Self> {
        if id == -1 {
            return Some(Self::Unrecognized);
        }
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Canonical label name as used in label files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlipOver => "FLIP_OVER",
            Self::LongVibration => "LONG_VIBRATION",
            Self::RotateCw => "ROTATE_CW",
            Self::RotateCcw => "ROTATE_CCW",
            Self::ShakeBackward => "SHAKE_BACKWARD",
            Self::ShakeForward => "SHAKE_FORWARD",
            Self::ShortVibration => "SHORT_VIBRATION",
            Self::TiltLeft => "TILT_LEFT",
            Self::TiltRight => "TILT_RIGHT",
            Self::Still => "STILL",
            Self::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// Human-readable label for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FlipOver => "Flip Over",
            Self::LongVibration => "Long Vibration",
            Self::RotateCw => "Rotate Clockwise",
            Self::RotateCcw => "Rotate Counterclockwise",
            Self::ShakeBackward => "Shake Backward",
            Self::ShakeForward => "Shake Forward",
            Self::ShortVibration => "Short Vibration",
            Self::TiltLeft => "Tilt Left",
            Self::TiltRight => "Tilt Right",
            Self::Still => "Still",
            Self::Unrecognized => "Unrecognized",
        }
    }

    /// Parse a label file entry.  Accepts canonical names, the long
    /// rotation spellings and the human-readable forms, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match key.as_str() {
            "ROTATE_CLOCKWISE" => return Some(Self::RotateCw),
            "ROTATE_COUNTERCLOCKWISE" => return Some(Self::RotateCcw),
            _ => {}
        }
        Self::ALL
            .iter()
            .chain(std::iter::once(&Self::Unrecognized))
            .find(|g| g.name() == key)
            .copied()
    }
}

/// A classified label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub gesture: Gesture,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(gesture: Gesture, confidence: f32) -> Self {
        Self {
            gesture,
            confidence,
        }
    }

    pub fn unrecognized(confidence: f32) -> Self {
        Self::new(Gesture::Unrecognized, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_model_order() {
        assert_eq!(Gesture::FlipOver.id(), 0);
        assert_eq!(Gesture::TiltRight.id(), 8);
        assert_eq!(Gesture::Still.id(), 9);
        assert_eq!(Gesture::Unrecognized.id(), -1);
        for g in Gesture::ALL {
            assert_eq!(Gesture::from_id(g.id()), Some(g));
        }
        assert_eq!(Gesture::from_id(10), None);
    }

    #[test]
    fn labels_parse_in_several_spellings() {
        assert_eq!(Gesture::from_label("TILT_LEFT"), Some(Gesture::TiltLeft));
        assert_eq!(Gesture::from_label("Tilt Right"), Some(Gesture::TiltRight));
        assert_eq!(
            Gesture::from_label("rotate_counterclockwise"),
            Some(Gesture::RotateCcw)
        );
        assert_eq!(Gesture::from_label("wave"), None);
    }
}
