use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    cues::landscape_cue_definitions, scene::landscape_subjects, CueDefinition, Ease, Repeat,
    Result, SubjectDefinition, Track,
};

/// Top-level configuration structure for a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Cue played on the first transition into playing.
    #[serde(default)]
    pub start_cue: Option<String>,
    #[serde(default)]
    pub subjects: Vec<SubjectDefinition>,
    #[serde(default)]
    pub cues: Vec<CueDefinition>,
    /// Tracks of the main timeline, in registration order.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Tracks that run from the first tick regardless of the transport.
    #[serde(default)]
    pub intro: Vec<Track>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::landscape()
    }
}

impl SceneConfig {
    /// The animated landscape: sun, drifting clouds, birds, swaying tree and
    /// parallax mountains, plus the text panel intro.
    pub fn landscape() -> Self {
        Self {
            audio: AudioConfig::default(),
            ui: UiConfig::default(),
            start_cue: Some("chime".to_string()),
            subjects: landscape_subjects(),
            cues: landscape_cue_definitions(),
            tracks: landscape_tracks(),
            intro: vec![Track::new("text_panel", 1.0)
                .from_to("y", 200.0, 0.0)
                .from_to("opacity", 0.0, 1.0)
                .ease(Ease::BackOut { overshoot: 1.7 })
                .at(0.5)],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn landscape_tracks() -> Vec<Track> {
    let swing = |target: &str, property: &str, value: f32, duration: f64| {
        Track::new(target, duration)
            .to(property, value)
            .ease(Ease::Power1InOut)
            .repeat(Repeat::Infinite)
            .yoyo()
    };
    let flight = |target: &str, y: f32, duration: f64, start: f64| {
        Track::new(target, duration)
            .to("x_vw", 100.0)
            .to("y", y)
            .ease(Ease::Power1InOut)
            .repeat(Repeat::Infinite)
            .at(start)
    };

    vec![
        swing("sun", "rotation", 360.0, 3.0).to("scale", 1.1),
        Track::new("cloud1", 20.0)
            .to("x_vw", 100.0)
            .repeat(Repeat::Infinite)
            .on_start("wind"),
        Track::new("cloud2", 25.0)
            .to("x_vw", -100.0)
            .repeat(Repeat::Infinite),
        Track::group(["bird1", "bird2", "bird3"], 0.5)
            .to("opacity", 1.0)
            .stagger(0.3)
            .at(1.0)
            .on_start("bird"),
        flight("bird1", -100.0, 8.0, 1.5).on_repeat("bird"),
        flight("bird2", -150.0, 10.0, 1.8),
        flight("bird3", -80.0, 9.0, 2.1),
        swing("tree", "rotation", 3.0, 2.0),
        swing("mountain1", "x", -20.0, 15.0),
        swing("mountain2", "x", 30.0, 18.0),
        swing("mountain3", "x", -15.0, 20.0),
    ]
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
        }
    }
}

/// Labels and colours of the two transport controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    pub start_label: String,
    pub pause_label: String,
    pub mute_label: String,
    pub unmute_label: String,
    pub sound_on_color: String,
    pub muted_color: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            start_label: "▶ Start Animation".to_string(),
            pause_label: "⏸ Pause Animation".to_string(),
            mute_label: "🔊 Mute".to_string(),
            unmute_label: "🔇 Unmute".to_string(),
            sound_on_color: "#ff9800".to_string(),
            muted_color: "#f44336".to_string(),
        }
    }
}
