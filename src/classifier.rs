// FluxSand - Gesture Classifier Interface
//
// This module provides a safe Rust API over the gesture model.
//
// Architecture:
//   1. STUB mode (default) - a deterministic heuristic that declares a model
//      shape like a real artifact, so the pipeline can be developed and
//      tested without the ONNX runtime.
//   2. ONNX mode - enable the `onnx` feature to load the model file with
//      ONNX Runtime; window length, feature width and class count are read
//      from the session metadata.
//
// The gesture task calls `classify(input)` with a W x F float buffer in
// temporal order and receives one probability per class.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ClassifierError, ConfigError};
use crate::gesture::{FeatureLayout, Gesture};

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// Input (1, window, features) and output (1, classes) tensor geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub window: usize,
    pub features: usize,
    pub classes: usize,
}

impl ModelShape {
    pub fn input_len(&self) -> usize {
        self.window * self.features
    }
}

pub trait Classifier: Send {
    fn shape(&self) -> ModelShape;

    /// One inference over a full window.  Returns per-class probabilities.
    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn shape(&self) -> ModelShape {
        (**self).shape()
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        (**self).classify(input)
    }
}

/// Open the configured backend.
pub fn open(model_path: &str, layout: FeatureLayout) -> Result<Box<dyn Classifier>, ClassifierError> {
    #[cfg(feature = "onnx")]
    {
        let _ = layout;
        let model = onnx::OnnxClassifier::new(model_path)?;
        return Ok(Box::new(model));
    }

    #[cfg(not(feature = "onnx"))]
    {
        log::warn!("ONNX support not compiled in; using stub classifier instead of {model_path}");
        return Ok(Box::new(StubClassifier::new(layout)));
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClassesJson {
    index_to_class: HashMap<String, String>,
}

/// Map model output indices to gestures.  Without a labels file the
/// taxonomy's default order is used.
pub fn load_labels(path: Option<&Path>, classes: usize) -> Result<Vec<Gesture>, ConfigError> {
    let Some(path) = path else {
        if classes > Gesture::ALL.len() {
            return Err(ConfigError::LabelCount {
                model: classes,
                labels: Gesture::ALL.len(),
            });
        }
        return Ok(Gesture::ALL[..classes].to_vec());
    };

    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_labels(&content, classes).map_err(|e| match e {
        ConfigError::Unreadable { reason, .. } => ConfigError::Unreadable {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

pub fn parse_labels(json: &str, classes: usize) -> Result<Vec<Gesture>, ConfigError> {
    let data: ClassesJson = serde_json::from_str(json).map_err(|e| ConfigError::Unreadable {
        path: "<labels>".into(),
        reason: e.to_string(),
    })?;

    let mut pairs = Vec::with_capacity(data.index_to_class.len());
    for (index, name) in data.index_to_class {
        let index: usize = index
            .parse()
            .map_err(|_| ConfigError::UnknownLabel(format!("index {index}")))?;
        let gesture = Gesture::from_label(&name).ok_or(ConfigError::UnknownLabel(name))?;
        pairs.push((index, gesture));
    }
    pairs.sort_by_key(|(index, _)| *index);

    let contiguous = pairs.iter().enumerate().all(|(i, (index, _))| i == *index);
    if pairs.len() != classes || !contiguous {
        return Err(ConfigError::LabelCount {
            model: classes,
            labels: pairs.len(),
        });
    }
    Ok(pairs.into_iter().map(|(_, g)| g).collect())
}

// ---------------------------------------------------------------------------
// Stub back-end - development / testing without a model
// ---------------------------------------------------------------------------

pub const STUB_WINDOW: usize = 100;

/// Tilt/vibration heuristic over the accelerometer columns.  Produces the
/// default ten-class probability layout.
pub struct StubClassifier {
    layout: FeatureLayout,
}

impl StubClassifier {
    pub fn new(layout: FeatureLayout) -> Self {
        Self { layout }
    }
}

impl Classifier for StubClassifier {
    fn shape(&self) -> ModelShape {
        ModelShape {
            window: STUB_WINDOW,
            features: self.layout.width(),
            classes: Gesture::ALL.len(),
        }
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        let shape = self.shape();
        if input.len() != shape.input_len() {
            return Err(ClassifierError::InvalidInputSize {
                expected: shape.input_len(),
                actual: input.len(),
            });
        }

        // Accel columns are always the last three of a sample.
        let width = shape.features;
        let n = shape.window as f32;
        let (mut sx, mut sy, mut sz, mut energy) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for sample in input.chunks_exact(width) {
            let a = &sample[width - 3..];
            sx += a[0];
            sy += a[1];
            sz += a[2];
            let mag = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
            energy += (mag - 1.0).abs();
        }
        let (mean_x, mean_y, mean_z, mean_energy) = (sx / n, sy / n, sz / n, energy / n);

        let winner = if mean_energy > 0.8 {
            Gesture::LongVibration
        } else if mean_energy > 0.3 {
            Gesture::ShortVibration
        } else if mean_z < -0.7 {
            Gesture::FlipOver
        } else if mean_y > 0.5 {
            Gesture::TiltRight
        } else if mean_y < -0.5 {
            Gesture::TiltLeft
        } else if mean_x > 0.5 {
            Gesture::ShakeForward
        } else if mean_x < -0.5 {
            Gesture::ShakeBackward
        } else {
            Gesture::Still
        };

        let classes = shape.classes;
        let mut probs = vec![0.1 / (classes - 1) as f32; classes];
        probs[winner.id() as usize] = 0.9;

        log::debug!(
            "STUB inference - mean a = ({mean_x:.2}, {mean_y:.2}, {mean_z:.2}), energy {mean_energy:.2} -> {}",
            winner.display_name()
        );
        Ok(probs)
    }
}

// ---------------------------------------------------------------------------
// ONNX back-end
// ---------------------------------------------------------------------------
#[cfg(feature = "onnx")]
mod onnx {
    use ort::session::Session;
    use ort::value::ValueType;

    use super::{Classifier, ModelShape};
    use crate::error::ClassifierError;

    pub struct OnnxClassifier {
        session: Session,
        shape: ModelShape,
        input_name: String,
        output_name: String,
    }

    fn tensor_dims(ty: &ValueType) -> Option<Vec<i64>> {
        match ty {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    impl OnnxClassifier {
        pub fn new(model_path: &str) -> Result<Self, ClassifierError> {
            let session = Session::builder()?.commit_from_file(model_path)?;

            let input = session
                .inputs
                .first()
                .ok_or(ClassifierError::MissingIo { kind: "input" })?;
            let output = session
                .outputs
                .first()
                .ok_or(ClassifierError::MissingIo { kind: "output" })?;

            let in_dims = tensor_dims(&input.input_type)
                .ok_or(ClassifierError::MissingIo { kind: "input tensor" })?;
            let out_dims = tensor_dims(&output.output_type)
                .ok_or(ClassifierError::MissingIo { kind: "output tensor" })?;

            // A dynamic batch dimension (-1) is treated as 1.
            let shape = match (in_dims.as_slice(), out_dims.as_slice()) {
                (&[_, w, f], &[_, c]) if w > 0 && f > 0 && c > 0 => ModelShape {
                    window: w as usize,
                    features: f as usize,
                    classes: c as usize,
                },
                _ => {
                    let mut dims = in_dims.clone();
                    dims.extend(out_dims);
                    return Err(ClassifierError::UnsupportedShape(dims));
                }
            };

            let input_name = input.name.clone();
            let output_name = output.name.clone();

            log::info!("Model loaded: {model_path}");
            log::info!("  input  {input_name}: (1, {}, {})", shape.window, shape.features);
            log::info!("  output {output_name}: (1, {})", shape.classes);

            Ok(Self {
                session,
                shape,
                input_name,
                output_name,
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn shape(&self) -> ModelShape {
            self.shape
        }

        fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
            if input.len() != self.shape.input_len() {
                return Err(ClassifierError::InvalidInputSize {
                    expected: self.shape.input_len(),
                    actual: input.len(),
                });
            }

            let dims = vec![1_usize, self.shape.window, self.shape.features];
            let value = ort::value::Value::from_array((dims, input.to_vec()))?;
            let outputs = self.session.run(ort::inputs![
                self.input_name.as_str() => &value,
            ])?;

            let (_, probs) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
            Ok(probs.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_follow_taxonomy() {
        let labels = load_labels(None, 10).unwrap();
        assert_eq!(labels[8], Gesture::TiltRight);
        assert!(load_labels(None, 11).is_err());
    }

    #[test]
    fn labels_file_maps_indices() {
        let json = r#"{ "index_to_class": { "1": "Tilt Right", "0": "STILL", "2": "SHAKE_FORWARD" } }"#;
        let labels = parse_labels(json, 3).unwrap();
        assert_eq!(labels, vec![Gesture::Still, Gesture::TiltRight, Gesture::ShakeForward]);
    }

    #[test]
    fn labels_file_rejects_unknown_names_and_gaps() {
        let unknown = r#"{ "index_to_class": { "0": "wave" } }"#;
        assert_eq!(
            parse_labels(unknown, 1),
            Err(ConfigError::UnknownLabel("wave".into()))
        );

        let gap = r#"{ "index_to_class": { "0": "STILL", "2": "FLIP_OVER" } }"#;
        assert!(matches!(parse_labels(gap, 2), Err(ConfigError::LabelCount { .. })));
    }

    #[test]
    fn stub_reports_tilt() {
        let mut stub = StubClassifier::new(FeatureLayout::Accel3);
        let mut window = Vec::new();
        for _ in 0..STUB_WINDOW {
            window.extend_from_slice(&[0.0, 0.8, 0.6]);
        }
        let probs = stub.classify(&window).unwrap();
        assert_eq!(probs.len(), 10);
        let best = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(best, Gesture::TiltRight.id() as usize);
    }

    #[test]
    fn stub_rejects_wrong_input_size() {
        let mut stub = StubClassifier::new(FeatureLayout::Full8);
        assert!(matches!(
            stub.classify(&[0.0; 8]),
            Err(ClassifierError::InvalidInputSize { expected: 800, actual: 8 })
        ));
    }
}
