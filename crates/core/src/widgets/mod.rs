//! Small UI collaborators that make sound through the scene's synthesizer.

use crate::{Result, Tone, Waveform};

/// Typing tones sound on every this-many characters.
const TYPING_STRIDE: usize = 5;
const TYPING_BASE_HZ: f64 = 440.0;
const TYPING_DURATION: f64 = 0.1;
const FOCUS_HZ: f64 = 523.25;
const FOCUS_DURATION: f64 = 0.2;

/// Live character counter for the text panel.
#[derive(Debug, Default, Clone)]
pub struct CharacterCounter {
    count: usize,
}

impl CharacterCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Recounts `text` and returns the typing tone to play, if the new count
    /// lands on a positive multiple of five.
    pub fn input(&mut self, text: &str) -> Result<Option<Tone>> {
        self.count = text.chars().count();
        if self.count == 0 || self.count % TYPING_STRIDE != 0 {
            return Ok(None);
        }
        let frequency = TYPING_BASE_HZ + self.count as f64;
        Tone::new(frequency, TYPING_DURATION, Waveform::Sine).map(Some)
    }

    /// Tone played when the text field gains focus.
    pub fn focus(&self) -> Result<Tone> {
        Tone::new(FOCUS_HZ, FOCUS_DURATION, Waveform::Sine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        let mut counter = CharacterCounter::new();
        counter.input("héllo wörld").unwrap();
        assert_eq!(counter.count(), 11);
    }

    #[test]
    fn sounds_on_multiples_of_five() {
        let mut counter = CharacterCounter::new();

        assert!(counter.input("").unwrap().is_none());
        assert!(counter.input("abcd").unwrap().is_none());
        let tone = counter.input("abcde").unwrap().unwrap();
        assert_eq!(tone.frequency(), 445.0);
        assert_eq!(tone.duration(), 0.1);
        let tone = counter.input("abcdefghij").unwrap().unwrap();
        assert_eq!(tone.frequency(), 450.0);
    }

    #[test]
    fn focus_plays_c5() {
        let tone = CharacterCounter::new().focus().unwrap();
        assert_eq!(tone.frequency(), 523.25);
        assert_eq!(tone.waveform(), Waveform::Sine);
    }
}
