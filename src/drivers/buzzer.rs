// FluxSand - Piezo Buzzer
//
// Passive buzzer on a LEDC channel.  The pitch is the LEDC timer frequency,
// the volume a fixed 50 % duty.

use std::thread;
use std::time::Duration;

use esp_idf_hal::ledc::LedcDriver;
use esp_idf_sys::{esp, ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_set_freq, ledc_timer_t_LEDC_TIMER_0};

use crate::drivers::Buzzer;
use crate::tone::Tone;

pub struct PwmBuzzer {
    channel: LedcDriver<'static>,
}

impl PwmBuzzer {
    /// `channel` must be bound to LEDC timer 0, the one retuned per note.
    pub fn new(channel: LedcDriver<'static>) -> Self {
        Self { channel }
    }
}

impl Buzzer for PwmBuzzer {
    fn play(&mut self, tone: Tone) -> anyhow::Result<()> {
        let hz = tone.frequency_hz().round() as u32;
        // SAFETY: LEDC timer 0 is reserved for the buzzer.
        esp!(unsafe { ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_timer_t_LEDC_TIMER_0, hz) })?;

        let half = self.channel.get_max_duty() / 2;
        self.channel.set_duty(half)?;
        thread::sleep(Duration::from_millis(tone.duration_ms as u64));
        self.channel.set_duty(0)?;
        Ok(())
    }
}
