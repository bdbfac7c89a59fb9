// FluxSand - Environment Sensing
//
// Conversions for the two analog channels on the ADS1115 (NTC thermistor and
// photodiode, both in a divider against 100 kΩ on 3.3 V) and the
// light-driven display brightness.

use std::collections::VecDeque;

use crate::config::DEFAULT_INTENSITY;

const SUPPLY_V: f32 = 3.3;
const DIVIDER_OHMS: f32 = 100_000.0;

const NTC_R25: f32 = 10_000.0;
const NTC_BETA: f32 = 3950.0;
const KELVIN_25C: f32 = 298.15;

const LIGHT_WINDOW: usize = 50;
const INTENSITY_EVERY: u32 = 6;
const MAX_INTENSITY: u8 = 15;

/// Sensor-side resistance of the divider, `None` at the rails.
fn divider_ohms(volts: f32) -> Option<f32> {
    if !volts.is_finite() || volts <= 0.0 || volts >= SUPPLY_V {
        return None;
    }
    Some(DIVIDER_OHMS * volts / (SUPPLY_V - volts))
}

/// Thermistor temperature in °C (beta model).
pub fn ntc_celsius(volts: f32) -> Option<f32> {
    let r = divider_ohms(volts)?;
    Some(1.0 / (1.0 / KELVIN_25C + (r / NTC_R25).ln() / NTC_BETA) - 273.15)
}

pub fn photo_lux(volts: f32) -> Option<f32> {
    let r = divider_ohms(volts)?;
    Some(1.5e6 / r.powf(1.5))
}

/// Moving average of the light level.  Every sixth reading past a full
/// window yields a new matrix intensity.
#[derive(Debug)]
pub struct LightSmoother {
    window: VecDeque<f32>,
    counter: u32,
    intensity: u8,
}

impl Default for LightSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSmoother {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(LIGHT_WINDOW + 1),
            counter: 0,
            intensity: DEFAULT_INTENSITY,
        }
    }

    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    /// Feed one lux reading.  Returns the new intensity when it is updated.
    pub fn push(&mut self, lux: f32) -> Option<u8> {
        if !lux.is_finite() {
            return None;
        }
        self.window.push_back(lux);
        if self.window.len() <= LIGHT_WINDOW {
            return None;
        }

        let mean = self.window.iter().sum::<f32>() / self.window.len() as f32;
        self.window.pop_front();

        self.counter += 1;
        if self.counter % INTENSITY_EVERY != 0 {
            return None;
        }
        self.intensity = ((mean / 20.0 + 1.0) as u32).min(MAX_INTENSITY as u32) as u8;
        Some(self.intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntc_reads_25c_at_midpoint_of_its_own_divider() {
        // R = 10k gives 25 °C: V = 3.3 * 10k / 110k.
        let v = SUPPLY_V * NTC_R25 / (DIVIDER_OHMS + NTC_R25);
        let t = ntc_celsius(v).unwrap();
        assert!((t - 25.0).abs() < 0.01, "{t}");
        // Lower resistance means hotter.
        assert!(ntc_celsius(v * 0.5).unwrap() > t);
    }

    #[test]
    fn rails_are_rejected() {
        assert_eq!(ntc_celsius(0.0), None);
        assert_eq!(photo_lux(3.3), None);
        assert_eq!(photo_lux(f32::NAN), None);
    }

    #[test]
    fn brighter_means_less_resistance() {
        assert!(photo_lux(0.1).unwrap() > photo_lux(2.0).unwrap());
    }

    #[test]
    fn intensity_updates_every_sixth_reading() {
        let mut s = LightSmoother::new();
        let updates: Vec<_> = (0..62).filter_map(|_| s.push(100.0)).collect();
        // Window fills at 50; readings 51..62 give 12 averages, every 6th counts.
        assert_eq!(updates, vec![6, 6]);
        assert_eq!(s.intensity(), 6);
    }

    #[test]
    fn intensity_is_clamped() {
        let mut s = LightSmoother::new();
        let last = (0..60).filter_map(|_| s.push(10_000.0)).last();
        assert_eq!(last, Some(15));
    }
}
