//! Named, possibly multi-tone audio cues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AudioBackend, Result, SceneError, Tone, ToneSynthesizer, TransportState, Waveform};

/// One tone of a cue, delayed by `offset` seconds from the moment the cue
/// is played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueStep {
    #[serde(default)]
    pub offset: f64,
    pub tone: Tone,
}

/// A named audio effect built from one or more tones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueDefinition {
    pub name: String,
    pub steps: Vec<CueStep>,
}

impl CueDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<CueStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Single tone cue starting immediately.
    pub fn single(name: impl Into<String>, tone: Tone) -> Self {
        Self::new(name, vec![CueStep { offset: 0.0, tone }])
    }
}

/// Registry of cues resolved by name at fire time.
#[derive(Debug, Clone, Default)]
pub struct CueLibrary {
    cues: BTreeMap<String, Vec<CueStep>>,
}

impl CueLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four cues used by the landscape scene.
    pub fn landscape() -> Result<Self> {
        let mut library = Self::new();
        for cue in landscape_cues()? {
            library.insert(cue)?;
        }
        Ok(library)
    }

    /// Builds a library from definitions, typically loaded from config.
    pub fn from_definitions(definitions: &[CueDefinition]) -> Result<Self> {
        let mut library = Self::new();
        for cue in definitions {
            library.insert(cue.clone())?;
        }
        Ok(library)
    }

    /// Adds or replaces a cue. Steps are kept sorted by offset.
    pub fn insert(&mut self, cue: CueDefinition) -> Result<()> {
        if let Some(step) = cue
            .steps
            .iter()
            .find(|step| !(step.offset.is_finite() && step.offset >= 0.0))
        {
            return Err(SceneError::msg(format!(
                "cue `{}` has invalid offset {}",
                cue.name, step.offset
            )));
        }

        let mut steps = cue.steps;
        steps.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        self.cues.insert(cue.name, steps);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cues.contains_key(name)
    }

    pub fn steps(&self, name: &str) -> Option<&[CueStep]> {
        self.cues.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cues.keys().map(String::as_str)
    }

    /// Schedules every tone of the named cue relative to the synthesizer's
    /// current time and returns how many tones were emitted.
    pub fn play<B: AudioBackend>(
        &self,
        name: &str,
        transport: &TransportState,
        synth: &mut ToneSynthesizer<B>,
    ) -> Result<usize> {
        let now = synth.now();
        self.play_at(name, transport, synth, now)
    }

    /// Schedules every tone of the named cue relative to `at` on the audio
    /// clock.
    ///
    /// Mute is read once per tone, here, at schedule time. Tones already
    /// handed to the synthesizer are never cancelled.
    pub fn play_at<B: AudioBackend>(
        &self,
        name: &str,
        transport: &TransportState,
        synth: &mut ToneSynthesizer<B>,
        at: f64,
    ) -> Result<usize> {
        let steps = self
            .cues
            .get(name)
            .ok_or_else(|| SceneError::UnknownCue(name.to_string()))?;

        let mut emitted = 0;
        for step in steps {
            if transport.muted {
                continue;
            }
            synth.emit(step.tone, at + step.offset);
            emitted += 1;
        }

        tracing::trace!(cue = name, at, emitted, "cue played");
        Ok(emitted)
    }
}

fn landscape_cues() -> Result<Vec<CueDefinition>> {
    let chime = |frequency, duration, offset| -> Result<CueStep> {
        Ok(CueStep {
            offset,
            tone: Tone::new(frequency, duration, Waveform::Triangle)?,
        })
    };

    Ok(vec![
        CueDefinition::single("bird", Tone::new(800.0, 0.2, Waveform::Sine)?),
        CueDefinition::single("whoosh", Tone::new(200.0, 0.5, Waveform::Sawtooth)?),
        CueDefinition::single("wind", Tone::new(150.0, 1.0, Waveform::Sine)?),
        CueDefinition::new(
            "chime",
            vec![
                chime(523.25, 0.3, 0.0)?,
                chime(659.25, 0.3, 0.1)?,
                chime(783.99, 0.5, 0.2)?,
            ],
        ),
    ])
}

/// Definitions of the landscape cue set, for writing out default configs.
pub fn landscape_cue_definitions() -> Vec<CueDefinition> {
    // The literals above are all positive, so this cannot fail.
    landscape_cues().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OfflineRenderer;

    fn synth() -> ToneSynthesizer<OfflineRenderer> {
        ToneSynthesizer::new(OfflineRenderer::new(1_000))
    }

    #[test]
    fn chime_schedules_three_tones_at_offsets() {
        let library = CueLibrary::landscape().unwrap();
        let mut synth = synth();
        synth.advance(2.0);

        let emitted = library
            .play("chime", &TransportState::default(), &mut synth)
            .unwrap();

        assert_eq!(emitted, 3);
        let starts: Vec<f64> = synth.backend().emitted().iter().map(|v| v.start).collect();
        assert_eq!(starts.len(), 3);
        assert!((starts[0] - 2.0).abs() < 1e-9);
        assert!((starts[1] - 2.1).abs() < 1e-9);
        assert!((starts[2] - 2.2).abs() < 1e-9);
        assert_eq!(synth.backend().emitted()[2].tone.frequency(), 783.99);
    }

    #[test]
    fn play_at_offsets_from_the_given_time() {
        let library = CueLibrary::landscape().unwrap();
        let mut synth = synth();

        library
            .play_at("chime", &TransportState::default(), &mut synth, 0.5)
            .unwrap();

        let starts: Vec<f64> = synth.backend().emitted().iter().map(|v| v.start).collect();
        assert!((starts[0] - 0.5).abs() < 1e-9);
        assert!((starts[2] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn unknown_cue_schedules_nothing() {
        let library = CueLibrary::landscape().unwrap();
        let mut synth = synth();

        let err = library
            .play("unknown", &TransportState::default(), &mut synth)
            .unwrap_err();

        assert!(matches!(err, SceneError::UnknownCue(ref name) if name == "unknown"));
        assert!(synth.backend().emitted().is_empty());
    }

    #[test]
    fn muted_transport_suppresses_every_tone() {
        let library = CueLibrary::landscape().unwrap();
        let mut synth = synth();
        let transport = TransportState {
            playing: true,
            muted: true,
        };

        let emitted = library.play("chime", &transport, &mut synth).unwrap();

        assert_eq!(emitted, 0);
        assert!(synth.backend().emitted().is_empty());
    }

    #[test]
    fn insert_sorts_steps_and_rejects_negative_offsets() {
        let tone = Tone::new(300.0, 0.1, Waveform::Square).unwrap();
        let mut library = CueLibrary::new();
        library
            .insert(CueDefinition::new(
                "pair",
                vec![
                    CueStep { offset: 0.4, tone },
                    CueStep { offset: 0.1, tone },
                ],
            ))
            .unwrap();
        let offsets: Vec<f64> = library.steps("pair").unwrap().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.1, 0.4]);

        let bad = CueDefinition::new("bad", vec![CueStep { offset: -1.0, tone }]);
        assert!(library.insert(bad).is_err());
        assert!(!library.contains("bad"));
    }

    #[test]
    fn definitions_round_trip_through_json() {
        let json = serde_json::to_string(&landscape_cue_definitions()).unwrap();
        let parsed: Vec<CueDefinition> = serde_json::from_str(&json).unwrap();
        let library = CueLibrary::from_definitions(&parsed).unwrap();
        assert_eq!(
            library.names().collect::<Vec<_>>(),
            vec!["bird", "chime", "whoosh", "wind"]
        );
    }
}
