//! Tone synthesis.
//!
//! A [`ToneSynthesizer`] turns immutable [`Tone`] descriptions into scheduled
//! [`Voice`]s with a fixed exponential decay envelope and hands them to an
//! [`AudioBackend`]. The synthesizer never looks at the mute flag; callers
//! decide whether a tone should be emitted at all.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Result, SceneError};

mod offline;

pub use offline::{NullBackend, OfflineRenderer};

/// Gain a voice starts at, as a fraction of full scale.
pub const INITIAL_GAIN: f32 = 0.3;
/// Gain a voice has decayed to when its duration elapses.
pub const FLOOR_GAIN: f32 = 0.01;

/// Oscillator shape of a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Sawtooth,
    Triangle,
    Square,
}

impl Waveform {
    /// Evaluates the waveform at a normalised phase in `[0, 1)`.
    pub fn sample(self, phase: f64) -> f32 {
        let phase = phase.rem_euclid(1.0);
        let value = match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        value as f32
    }
}

/// A single synthesized audio event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTone", into = "RawTone")]
pub struct Tone {
    frequency: f64,
    duration: f64,
    waveform: Waveform,
}

impl Tone {
    /// Creates a tone, rejecting non-positive or non-finite parameters.
    pub fn new(frequency: f64, duration: f64, waveform: Waveform) -> Result<Self> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(SceneError::InvalidTone(format!(
                "frequency must be positive, got {frequency}"
            )));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(SceneError::InvalidTone(format!(
                "duration must be positive, got {duration}"
            )));
        }

        Ok(Self {
            frequency,
            duration,
            waveform,
        })
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }
}

#[derive(Serialize, Deserialize)]
struct RawTone {
    frequency: f64,
    duration: f64,
    #[serde(default)]
    waveform: Waveform,
}

impl TryFrom<RawTone> for Tone {
    type Error = SceneError;

    fn try_from(raw: RawTone) -> Result<Self> {
        Tone::new(raw.frequency, raw.duration, raw.waveform)
    }
}

impl From<Tone> for RawTone {
    fn from(tone: Tone) -> Self {
        Self {
            frequency: tone.frequency,
            duration: tone.duration,
            waveform: tone.waveform,
        }
    }
}

/// A tone bound to a start time on the backend's audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub tone: Tone,
    pub start: f64,
}

impl Voice {
    pub fn end(&self) -> f64 {
        self.start + self.tone.duration
    }

    /// Returns whether the voice is audible at `time`.
    pub fn is_sounding(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    /// Envelope gain at `time`: exponential ramp from [`INITIAL_GAIN`] to
    /// [`FLOOR_GAIN`] across the tone's duration, silent outside it.
    pub fn gain_at(&self, time: f64) -> f32 {
        if !self.is_sounding(time) {
            return 0.0;
        }
        let progress = (time - self.start) / self.tone.duration;
        let ratio = f64::from(FLOOR_GAIN) / f64::from(INITIAL_GAIN);
        (f64::from(INITIAL_GAIN) * ratio.powf(progress)) as f32
    }

    /// Output sample at `time`, envelope applied.
    pub fn sample_at(&self, time: f64) -> f32 {
        let gain = self.gain_at(time);
        if gain == 0.0 {
            return 0.0;
        }
        let phase = (time - self.start) * self.tone.frequency;
        gain * self.tone.waveform.sample(phase)
    }
}

/// Destination for scheduled voices.
pub trait AudioBackend {
    /// Current position of the backend's audio clock in seconds.
    fn current_time(&self) -> f64;

    /// Queues a voice for playback. Fails with
    /// [`SceneError::AudioUnavailable`] when the backend cannot produce
    /// sound right now.
    fn schedule(&mut self, voice: Voice) -> Result<()>;

    /// Lets clock-driven backends move their audio clock forward by one
    /// frame's worth of time. Real-time devices keep their own clock.
    fn advance(&mut self, _seconds: f64) {}
}

/// Low-level tone emitter wrapping an [`AudioBackend`].
#[derive(Debug)]
pub struct ToneSynthesizer<B> {
    backend: B,
}

impl<B: AudioBackend> ToneSynthesizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Current time on the backend's audio clock.
    pub fn now(&self) -> f64 {
        self.backend.current_time()
    }

    /// Schedules `tone` to start at `at_time`. An unavailable backend turns
    /// this into a silent no-op.
    pub fn emit(&mut self, tone: Tone, at_time: f64) {
        let voice = Voice {
            tone,
            start: at_time,
        };
        if let Err(err) = self.backend.schedule(voice) {
            tracing::debug!(%err, frequency = tone.frequency(), "tone dropped");
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        self.backend.advance(seconds);
    }
}

impl<B> ToneSynthesizer<B> {
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
