//! Core library for the ambient landscape scene.
//!
//! The crate drives a master timeline of looping and parallel animation
//! tracks and fires time-correlated audio cues, all against one virtual
//! clock. Each module owns a distinct concern (tone synthesis, cue lookup,
//! track scheduling, scene state, transport control) so the pieces can be
//! tested in isolation and wired together by [`SceneController`].

pub mod audio;
pub mod config;
pub mod controller;
pub mod cues;
pub mod error;
pub mod scene;
pub mod timeline;
pub mod widgets;

pub use audio::{AudioBackend, NullBackend, OfflineRenderer, Tone, ToneSynthesizer, Voice, Waveform};
pub use config::{AudioConfig, SceneConfig, UiConfig};
pub use controller::{ControlAffordance, CueSource, FiredCue, PlaybackState, SceneController};
pub use cues::{CueDefinition, CueLibrary, CueStep};
pub use error::{Result, SceneError};
pub use scene::{PropertyUpdate, SceneInstance, SubjectDefinition, TargetRegistry};
pub use timeline::{
    CueTrigger, Ease, MemberSnapshot, PlaybackClock, Repeat, TickOutput, TimelineEngine, Track,
    TrackId, TrackPhase, TransportState, TriggerKind,
};
pub use widgets::CharacterCounter;
