// FluxSand - Buzzer Tones

/// Semitones within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    C = 0,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

/// One beep request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub note: Note,
    pub octave: i8,
    pub duration_ms: u32,
}

impl Tone {
    pub const fn new(note: Note, octave: i8, duration_ms: u32) -> Self {
        Self {
            note,
            octave,
            duration_ms,
        }
    }

    /// Equal-tempered pitch, A4 = 440 Hz.
    pub fn frequency_hz(&self) -> f32 {
        note_frequency(self.note, self.octave)
    }
}

pub fn note_frequency(note: Note, octave: i8) -> f32 {
    let midi = note as i32 + 12 * (octave as i32 + 1);
    440.0 * 2f32.powf((midi - 69) as f32 / 12.0)
}

/// Short click for buttons.
pub const CLICK: Tone = Tone::new(Note::C, 7, 50);
/// Gesture acknowledged.
pub const GESTURE_ACK: Tone = Tone::new(Note::C, 7, 300);
/// Timer ran out.
pub const ALARM: Tone = Tone::new(Note::C, 8, 1000);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_pitch() {
        assert!((note_frequency(Note::A, 4) - 440.0).abs() < 1e-3);
        assert!((note_frequency(Note::A, 5) - 880.0).abs() < 1e-2);
        assert!((note_frequency(Note::C, 4) - 261.63).abs() < 0.01);
    }

    #[test]
    fn alarm_is_an_octave_above_the_click() {
        let ratio = ALARM.frequency_hz() / CLICK.frequency_hz();
        assert!((ratio - 2.0).abs() < 1e-4);
    }
}
