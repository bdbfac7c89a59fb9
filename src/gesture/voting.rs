// FluxSand - Prediction History & Majority Vote

use std::collections::VecDeque;

use super::{Gesture, Prediction};

/// Last `capacity` per-window predictions, oldest first.
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    entries: VecDeque<Prediction>,
    capacity: usize,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, prediction: Prediction) {
        self.entries.push_back(prediction);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Majority label if it holds at least `min_votes` entries, otherwise
    /// `Unrecognized`.  Equal counts go to the label that entered the
    /// history first.  The confidence is the mean over the agreeing entries.
    pub fn consensus(&self, min_votes: usize) -> Prediction {
        // (label, votes, confidence sum) in first-seen order
        let mut tally: Vec<(Gesture, usize, f32)> = Vec::with_capacity(self.entries.len());
        for p in &self.entries {
            match tally.iter_mut().find(|(g, _, _)| *g == p.gesture) {
                Some(slot) => {
                    slot.1 += 1;
                    slot.2 += p.confidence;
                }
                None => tally.push((p.gesture, 1, p.confidence)),
            }
        }

        let mut best: Option<(Gesture, usize, f32)> = None;
        for entry in tally {
            if best.map_or(true, |(_, votes, _)| entry.1 > votes) {
                best = Some(entry);
            }
        }

        match best {
            Some((gesture, votes, sum)) if votes >= min_votes => {
                Prediction::new(gesture, sum / votes as f32)
            }
            _ => Prediction::unrecognized(0.0),
        }
    }
}
