// FluxSand - Gesture Inference Pipeline
//
// Owns the feature window and the prediction history.  One `push` per AHRS
// output; every `stride` samples (once the window is full) the classifier
// runs and the smoothed result is surfaced only on a transition.

use super::{FeatureBuffer, FeatureLayout, FeatureSample, Gesture, Prediction, PredictionHistory};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::{ClassifierError, ConfigError};
use crate::events::OrientationFrame;

/// Counters for the periodic status log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub samples: u64,
    pub inferences: u64,
    pub failures: u64,
    pub emitted: u64,
}

pub struct GesturePipeline<C: Classifier> {
    classifier: C,
    labels: Vec<Gesture>,
    layout: FeatureLayout,
    buffer: FeatureBuffer,
    history: PredictionHistory,
    stride: usize,
    threshold: f32,
    min_votes: usize,
    /// Samples seen since the window first filled.
    counter: u64,
    last_emitted: Gesture,
    scratch: Vec<f32>,
    stats: PipelineStats,
}

impl<C: Classifier> GesturePipeline<C> {
    /// Bind a classifier to the runtime config.  Fails when the model shape
    /// and the config disagree (feature width, zero stride, label count).
    pub fn new(classifier: C, config: &Config, labels: Vec<Gesture>) -> Result<Self, ConfigError> {
        config.validate()?;
        let shape = classifier.shape();
        let stride = config.validate_model(&shape)?;
        if labels.len() != shape.classes {
            return Err(ConfigError::LabelCount {
                model: shape.classes,
                labels: labels.len(),
            });
        }

        log::info!(
            "Gesture pipeline: window {} x {} ({}), {} classes, stride {}, threshold {:.2}, vote {}/{}",
            shape.window,
            shape.features,
            config.feature_layout.name(),
            shape.classes,
            stride,
            config.confidence_threshold,
            config.min_consensus_votes,
            config.history_size,
        );

        Ok(Self {
            classifier,
            labels,
            layout: config.feature_layout,
            buffer: FeatureBuffer::new(shape.window),
            history: PredictionHistory::new(config.history_size),
            stride,
            threshold: config.confidence_threshold,
            min_votes: config.min_consensus_votes,
            counter: 0,
            last_emitted: Gesture::Unrecognized,
            scratch: Vec::with_capacity(shape.input_len()),
            stats: PipelineStats::default(),
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn last_emitted(&self) -> Gesture {
        self.last_emitted
    }

    /// Feed one orientation sample.  Returns a gesture only when the
    /// smoothed label changes to something recognizable.
    pub fn push(&mut self, frame: &OrientationFrame) -> Option<Prediction> {
        self.stats.samples += 1;
        self.buffer.push(FeatureSample::pack(self.layout, frame));
        if !self.buffer.is_full() {
            return None;
        }

        self.counter += 1;
        if self.counter % self.stride as u64 != 0 {
            return None;
        }

        let raw = match self.infer() {
            Ok(p) => p,
            Err(e) => {
                // The window stays intact; the next stride retries.
                self.stats.failures += 1;
                log::warn!("Inference dropped: {e}");
                return None;
            }
        };
        self.observe(raw)
    }

    /// Record one per-window prediction and apply vote + transition rules.
    pub fn observe(&mut self, raw: Prediction) -> Option<Prediction> {
        self.history.push(raw);
        let consensus = self.history.consensus(self.min_votes);

        if consensus.gesture == Gesture::Unrecognized || consensus.gesture == self.last_emitted {
            return None;
        }
        self.last_emitted = consensus.gesture;
        self.stats.emitted += 1;
        log::info!(
            "Gesture: {} ({:.0}%)",
            consensus.gesture.display_name(),
            consensus.confidence * 100.0
        );
        Some(consensus)
    }

    fn infer(&mut self) -> Result<Prediction, ClassifierError> {
        self.buffer.materialize_into(&mut self.scratch);
        let probs = self.classifier.classify(&self.scratch)?;
        self.stats.inferences += 1;

        if probs.len() != self.labels.len() {
            return Err(ClassifierError::InvalidOutputSize {
                expected: self.labels.len(),
                actual: probs.len(),
            });
        }
        if let Some(i) = probs.iter().position(|p| !p.is_finite()) {
            return Err(ClassifierError::NonFinite(i));
        }

        // First maximum wins.
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }
        let confidence = probs[best];

        let prediction = if confidence < self.threshold {
            Prediction::unrecognized(confidence)
        } else {
            Prediction::new(self.labels[best], confidence)
        };
        log::debug!(
            "raw {} ({:.2})",
            prediction.gesture.display_name(),
            prediction.confidence
        );
        Ok(prediction)
    }
}
