// FluxSand - Gesture Feature Packing
//
// One FeatureSample per AHRS output; the buffer holds the model's temporal
// window in arrival order.

use std::collections::VecDeque;

use serde::Deserialize;

use crate::config::GRAVITY;
use crate::events::OrientationFrame;

const MAX_WIDTH: usize = 8;

/// Which per-sample vector the model artifact was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureLayout {
    /// pitch, roll, gx, gy, gz, ax/g, ay/g, az/g
    Full8,
    /// ax/g, ay/g, az/g
    Accel3,
}

impl FeatureLayout {
    pub fn width(&self) -> usize {
        match self {
            Self::Full8 => 8,
            Self::Accel3 => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Full8 => "full8",
            Self::Accel3 => "accel3",
        }
    }
}

/// Packed features for one sample.  Angles in radians (`[0, 2π)`), rates in
/// rad/s, accelerations in g.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSample {
    values: [f32; MAX_WIDTH],
    width: usize,
}

impl FeatureSample {
    pub fn pack(layout: FeatureLayout, frame: &OrientationFrame) -> Self {
        let a = frame.accel.scale(1.0 / GRAVITY);
        let g = frame.gyro;
        let mut values = [0.0; MAX_WIDTH];
        match layout {
            FeatureLayout::Full8 => {
                values = [
                    frame.euler.pitch.value(),
                    frame.euler.roll.value(),
                    g.x,
                    g.y,
                    g.z,
                    a.x,
                    a.y,
                    a.z,
                ];
            }
            FeatureLayout::Accel3 => {
                values[..3].copy_from_slice(&[a.x, a.y, a.z]);
            }
        }
        Self {
            values,
            width: layout.width(),
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.width]
    }
}

/// FIFO of the last `capacity` samples.
#[derive(Debug, Clone)]
pub struct FeatureBuffer {
    samples: VecDeque<FeatureSample>,
    capacity: usize,
}

impl FeatureBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest once over capacity.
    pub fn push(&mut self, sample: FeatureSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flatten oldest-first into `out` (cleared first).
    pub fn materialize_into(&self, out: &mut Vec<f32>) {
        out.clear();
        for sample in &self.samples {
            out.extend_from_slice(sample.as_slice());
        }
    }
}
