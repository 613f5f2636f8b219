use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Result, SceneError};

use super::Ease;

/// How many extra cycles a track plays after its first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    #[default]
    None,
    Infinite,
    Count(u32),
}

impl Repeat {
    /// Total number of cycles, or `None` for endless tracks.
    pub fn cycles(self) -> Option<u64> {
        match self {
            Repeat::None => Some(1),
            Repeat::Count(count) => Some(u64::from(count) + 1),
            Repeat::Infinite => None,
        }
    }
}

/// One animated property timeline for one subject or a staggered group of
/// subjects. Pure data: cue hooks are names resolved at fire time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub targets: Vec<String>,
    pub properties: BTreeMap<String, f32>,
    /// Explicit start values. Properties not listed here start from
    /// whatever the subject holds when the track activates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub from: BTreeMap<String, f32>,
    #[serde(default)]
    pub start_offset: f64,
    pub duration: f64,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default)]
    pub yoyo: bool,
    #[serde(default)]
    pub stagger: f64,
    #[serde(default)]
    pub ease: Ease,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_repeat: Option<String>,
}

impl Track {
    pub fn new(target: impl Into<String>, duration: f64) -> Self {
        Self::group([target.into()], duration)
    }

    /// Track animating several subjects, staggered by [`Track::stagger`].
    pub fn group<I, S>(targets: I, duration: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            properties: BTreeMap::new(),
            from: BTreeMap::new(),
            start_offset: 0.0,
            duration,
            repeat: Repeat::None,
            yoyo: false,
            stagger: 0.0,
            ease: Ease::Linear,
            on_start: None,
            on_repeat: None,
        }
    }

    pub fn to(mut self, property: impl Into<String>, value: f32) -> Self {
        self.properties.insert(property.into(), value);
        self
    }

    /// Tweens `property` from `value` to the given target.
    pub fn from_to(mut self, property: impl Into<String>, from: f32, to: f32) -> Self {
        let property = property.into();
        self.from.insert(property.clone(), from);
        self.properties.insert(property, to);
        self
    }

    pub fn at(mut self, start_offset: f64) -> Self {
        self.start_offset = start_offset;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn stagger(mut self, stagger: f64) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn on_start(mut self, cue: impl Into<String>) -> Self {
        self.on_start = Some(cue.into());
        self
    }

    pub fn on_repeat(mut self, cue: impl Into<String>) -> Self {
        self.on_repeat = Some(cue.into());
        self
    }

    /// Start time of the `index`th member on the timeline's clock.
    pub fn member_start(&self, index: usize) -> f64 {
        self.start_offset + self.stagger * index as f64
    }

    /// Time the track spends playing, `None` when it repeats forever.
    pub fn total_duration(&self) -> Option<f64> {
        self.repeat
            .cycles()
            .map(|cycles| self.duration * cycles as f64)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let label = self.targets.join(",");
        if self.targets.is_empty() {
            return Err(SceneError::InvalidTrack("track has no targets".to_string()));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SceneError::InvalidTrack(format!(
                "`{label}` duration must be positive, got {}",
                self.duration
            )));
        }
        if !(self.start_offset.is_finite() && self.start_offset >= 0.0) {
            return Err(SceneError::InvalidTrack(format!(
                "`{label}` start offset must not be negative, got {}",
                self.start_offset
            )));
        }
        if !(self.stagger.is_finite() && self.stagger >= 0.0) {
            return Err(SceneError::InvalidTrack(format!(
                "`{label}` stagger must not be negative, got {}",
                self.stagger
            )));
        }
        Ok(())
    }
}
