//! Scene controller: the only writer of [`TransportState`].
//!
//! The input layer forwards two commands (toggle playback, toggle mute) and
//! reads the transport back to render its two controls. Everything else the
//! controller does happens on [`SceneController::tick`], once per display
//! refresh.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    AudioBackend, CharacterCounter, CueLibrary, Result, SceneConfig, SceneInstance, Tone,
    ToneSynthesizer, Track, TrackId, TimelineEngine, TransportState, TriggerKind, UiConfig,
};

/// Entries kept in the cue log before the oldest are dropped.
pub const CUE_LOG_CAPACITY: usize = 256;

/// Lifecycle of the playback control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Label and style of one on-screen control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlAffordance {
    pub label: String,
    pub background: Option<String>,
    pub pressed: bool,
}

/// What caused a cue to be played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CueSource {
    /// First transition of the session into playing.
    SessionStart,
    Track {
        track: TrackId,
        member: usize,
        trigger: TriggerKind,
        timeline_time: f64,
    },
    /// Played directly through [`SceneController::play_cue`].
    Direct,
}

/// One entry of the cue log, in firing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredCue {
    pub cue: String,
    pub source: CueSource,
    /// Audio clock time the cue's first tone was scheduled for.
    pub audio_time: f64,
    /// Tones handed to the synthesizer. Zero while muted.
    pub tones: usize,
}

pub struct SceneController<B> {
    transport: TransportState,
    playback: PlaybackState,
    timeline: TimelineEngine,
    intro: TimelineEngine,
    cues: CueLibrary,
    synth: ToneSynthesizer<B>,
    scene: SceneInstance,
    counter: CharacterCounter,
    ui: UiConfig,
    start_cue: Option<String>,
    cue_log: VecDeque<FiredCue>,
    fired_total: usize,
}

impl<B: AudioBackend> SceneController<B> {
    /// Builds the scene described by `config`. Tracks and cues that fail
    /// validation are logged and left out; the rest of the scene still runs.
    pub fn new(config: &SceneConfig, backend: B) -> Self {
        let mut cues = CueLibrary::new();
        for cue in &config.cues {
            if let Err(err) = cues.insert(cue.clone()) {
                tracing::warn!(%err, "cue rejected");
            }
        }

        let mut controller = Self {
            transport: TransportState::default(),
            playback: PlaybackState::Stopped,
            timeline: TimelineEngine::new(),
            intro: TimelineEngine::new(),
            cues,
            synth: ToneSynthesizer::new(backend),
            scene: SceneInstance::new(&config.subjects),
            counter: CharacterCounter::new(),
            ui: config.ui.clone(),
            start_cue: config.start_cue.clone(),
            cue_log: VecDeque::new(),
            fired_total: 0,
        };

        for track in &config.tracks {
            if let Err(err) = controller.register_track(track.clone()) {
                tracing::warn!(%err, "track rejected");
            }
        }
        for track in &config.intro {
            if let Err(err) = controller.intro.register_track(track.clone()) {
                tracing::warn!(%err, "intro track rejected");
            }
        }

        tracing::debug!(
            tracks = controller.timeline.len(),
            cues = controller.cues.names().count(),
            "scene built"
        );
        controller
    }

    /// Adds a track to the main timeline.
    pub fn register_track(&mut self, track: Track) -> Result<TrackId> {
        for cue in track.on_start.iter().chain(track.on_repeat.iter()) {
            if !self.cues.contains(cue) {
                tracing::warn!(cue = cue.as_str(), "track references unknown cue");
            }
        }
        self.timeline.register_track(track)
    }

    /// Stopped -> Playing -> Paused -> Playing ...
    ///
    /// The start cue plays on the first transition into playing only.
    pub fn toggle_playback(&mut self) -> PlaybackState {
        match self.playback {
            PlaybackState::Playing => {
                self.timeline.pause(&mut self.transport);
                self.playback = PlaybackState::Paused;
            }
            PlaybackState::Stopped => {
                self.timeline.play(&mut self.transport);
                self.playback = PlaybackState::Playing;
                if let Some(cue) = self.start_cue.clone() {
                    let now = self.synth.now();
                    self.fire(&cue, CueSource::SessionStart, now);
                }
            }
            PlaybackState::Paused => {
                self.timeline.play(&mut self.transport);
                self.playback = PlaybackState::Playing;
            }
        }

        tracing::info!(state = ?self.playback, elapsed = self.timeline.elapsed(), "playback toggled");
        self.playback
    }

    /// Flips the mute flag for every emission scheduled from now on.
    pub fn toggle_mute(&mut self) -> bool {
        self.transport.muted = !self.transport.muted;
        tracing::info!(muted = self.transport.muted, "mute toggled");
        self.transport.muted
    }

    /// Runs one frame: the audio clock, the intro, then the main timeline,
    /// then every cue the main timeline fired, in order.
    pub fn tick(&mut self, delta: f64) {
        self.synth.advance(delta);

        // The intro ignores the playback control.
        let intro_transport = TransportState {
            playing: true,
            muted: self.transport.muted,
        };
        let intro = self.intro.advance(delta, &intro_transport, &self.scene);
        self.scene.apply_updates(&intro.updates);

        let output = self.timeline.advance(delta, &self.transport, &self.scene);
        self.scene.apply_updates(&output.updates);

        // Triggers keep their spacing on the audio clock; the earliest one in
        // this tick sounds now.
        let now = self.synth.now();
        let anchor = output.triggers.first().map_or(0.0, |trigger| trigger.time);
        for trigger in output.triggers {
            let at = now + (trigger.time - anchor).max(0.0);
            let source = CueSource::Track {
                track: trigger.track,
                member: trigger.member,
                trigger: trigger.kind,
                timeline_time: trigger.time,
            };
            self.fire(&trigger.cue, source, at);
        }
    }

    /// Plays a cue right now. Unknown names are logged and ignored.
    pub fn play_cue(&mut self, cue: &str) {
        let now = self.synth.now();
        self.fire(cue, CueSource::Direct, now);
    }

    /// Feeds the text panel's contents to the character counter.
    pub fn input_text(&mut self, text: &str) -> usize {
        match self.counter.input(text) {
            Ok(Some(tone)) => self.emit_unless_muted(tone),
            Ok(None) => {}
            Err(err) => tracing::debug!(%err, "typing tone skipped"),
        }
        self.counter.count()
    }

    pub fn focus_text(&mut self) {
        match self.counter.focus() {
            Ok(tone) => self.emit_unless_muted(tone),
            Err(err) => tracing::debug!(%err, "focus tone skipped"),
        }
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn play_control(&self) -> ControlAffordance {
        let playing = self.transport.playing;
        ControlAffordance {
            label: if playing {
                self.ui.pause_label.clone()
            } else {
                self.ui.start_label.clone()
            },
            background: None,
            pressed: playing,
        }
    }

    pub fn mute_control(&self) -> ControlAffordance {
        let muted = self.transport.muted;
        let (label, background) = if muted {
            (&self.ui.unmute_label, &self.ui.muted_color)
        } else {
            (&self.ui.mute_label, &self.ui.sound_on_color)
        };
        ControlAffordance {
            label: label.clone(),
            background: Some(background.clone()),
            pressed: muted,
        }
    }

    pub fn timeline(&self) -> &TimelineEngine {
        &self.timeline
    }

    pub fn scene(&self) -> &SceneInstance {
        &self.scene
    }

    pub fn cues(&self) -> &CueLibrary {
        &self.cues
    }

    pub fn synthesizer(&self) -> &ToneSynthesizer<B> {
        &self.synth
    }

    pub fn synthesizer_mut(&mut self) -> &mut ToneSynthesizer<B> {
        &mut self.synth
    }

    /// The most recent cues fired this session, oldest first.
    pub fn cue_log(&self) -> &VecDeque<FiredCue> {
        &self.cue_log
    }

    /// Number of cues fired this session, including those aged out of the
    /// log.
    pub fn fired_total(&self) -> usize {
        self.fired_total
    }

    fn fire(&mut self, cue: &str, source: CueSource, at: f64) {
        match self.cues.play_at(cue, &self.transport, &mut self.synth, at) {
            Ok(tones) => {
                if self.cue_log.len() == CUE_LOG_CAPACITY {
                    self.cue_log.pop_front();
                }
                self.cue_log.push_back(FiredCue {
                    cue: cue.to_string(),
                    source,
                    audio_time: at,
                    tones,
                });
                self.fired_total += 1;
            }
            Err(err) => tracing::warn!(%err, "cue skipped"),
        }
    }

    fn emit_unless_muted(&mut self, tone: Tone) {
        if self.transport.muted {
            return;
        }
        let now = self.synth.now();
        self.synth.emit(tone, now);
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for SceneController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneController")
            .field("transport", &self.transport)
            .field("playback", &self.playback)
            .field("elapsed", &self.timeline.elapsed())
            .field("backend", self.synth.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OfflineRenderer, Repeat, TargetRegistry, TrackPhase};

    const FRAME: f64 = 1.0 / 60.0;

    fn landscape() -> SceneController<OfflineRenderer> {
        SceneController::new(&SceneConfig::landscape(), OfflineRenderer::new(8_000))
    }

    fn bare() -> SceneController<OfflineRenderer> {
        let config = SceneConfig {
            tracks: Vec::new(),
            intro: Vec::new(),
            ..SceneConfig::landscape()
        };
        SceneController::new(&config, OfflineRenderer::new(8_000))
    }

    fn run(controller: &mut SceneController<OfflineRenderer>, seconds: f64) {
        let frames = (seconds / FRAME).round() as usize;
        for _ in 0..frames {
            controller.tick(FRAME);
        }
    }

    fn tones(controller: &SceneController<OfflineRenderer>) -> usize {
        controller.synthesizer().backend().emitted().len()
    }

    #[test]
    fn playing_tracks_parity_of_toggles() {
        let mut controller = bare();
        for n in 1..=9 {
            controller.toggle_playback();
            assert_eq!(controller.transport().playing, n % 2 == 1, "after {n} toggles");
        }
        assert_eq!(controller.playback_state(), PlaybackState::Playing);
        controller.toggle_playback();
        assert_eq!(controller.playback_state(), PlaybackState::Paused);
    }

    #[test]
    fn mute_toggle_is_an_involution() {
        let mut controller = bare();
        let original = controller.transport().muted;
        controller.toggle_mute();
        assert_ne!(controller.transport().muted, original);
        controller.toggle_mute();
        assert_eq!(controller.transport().muted, original);
    }

    #[test]
    fn start_cue_plays_on_first_start_only() {
        let mut controller = bare();
        controller.toggle_playback();
        controller.toggle_playback();
        controller.toggle_playback();

        let starts: Vec<&FiredCue> = controller
            .cue_log()
            .iter()
            .filter(|fired| fired.source == CueSource::SessionStart)
            .collect();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].cue, "chime");
        assert_eq!(tones(&controller), 3);
    }

    #[test]
    fn paused_scene_does_not_advance() {
        let mut controller = landscape();
        controller.toggle_playback();
        run(&mut controller, 1.0);
        controller.toggle_playback();
        let elapsed = controller.timeline().elapsed();
        let sun = controller.scene().read("sun", "rotation");
        let logged = controller.cue_log().len();

        run(&mut controller, 30.0);

        assert_eq!(controller.timeline().elapsed(), elapsed);
        assert_eq!(controller.scene().read("sun", "rotation"), sun);
        assert_eq!(controller.cue_log().len(), logged);
    }

    #[test]
    fn landscape_fires_cues_in_timeline_order() {
        let mut controller = landscape();
        controller.toggle_playback();
        run(&mut controller, 2.5);

        let order: Vec<&str> = controller
            .cue_log()
            .iter()
            .map(|fired| fired.cue.as_str())
            .collect();
        assert_eq!(order, vec!["chime", "wind", "bird", "bird", "bird"]);
        assert_eq!(tones(&controller), 3 + 1 + 3);
        for bird in ["bird1", "bird2", "bird3"] {
            assert_eq!(controller.scene().read(bird, "opacity"), Some(1.0));
        }
    }

    #[test]
    fn muted_scene_logs_cues_without_tones() {
        let mut controller = landscape();
        controller.toggle_mute();
        controller.toggle_playback();
        run(&mut controller, 2.0);

        assert!(!controller.cue_log().is_empty());
        assert!(controller.cue_log().iter().all(|fired| fired.tones == 0));
        assert_eq!(tones(&controller), 0);
    }

    #[test]
    fn muted_chime_emits_nothing() {
        let mut controller = bare();
        controller.toggle_mute();
        controller.play_cue("chime");
        assert_eq!(tones(&controller), 0);
    }

    #[test]
    fn unknown_cue_returns_normally() {
        let mut controller = bare();
        controller.play_cue("unknown");
        assert_eq!(tones(&controller), 0);
        assert!(controller.cue_log().is_empty());
    }

    #[test]
    fn mute_is_not_retroactive() {
        let mut controller = bare();
        controller.play_cue("chime");
        controller.toggle_mute();
        run(&mut controller, 1.0);

        assert_eq!(tones(&controller), 3);
        assert!(controller.synthesizer().backend().peak() > 0.0);
    }

    #[test]
    fn pause_does_not_cancel_scheduled_tones() {
        let mut controller = bare();
        controller.toggle_playback();
        controller.toggle_playback();
        assert_eq!(controller.playback_state(), PlaybackState::Paused);

        run(&mut controller, 1.0);

        let starts: Vec<f64> = controller
            .synthesizer()
            .backend()
            .emitted()
            .iter()
            .map(|voice| voice.start)
            .collect();
        assert_eq!(starts.len(), 3);
        assert!((starts[2] - 0.2).abs() < 1e-9);
        assert!(controller.synthesizer().backend().peak() > 0.0);
    }

    #[test]
    fn staggered_group_keeps_spacing_within_one_tick() {
        let mut controller = bare();
        controller
            .register_track(
                Track::group(["bird1", "bird2", "bird3"], 0.5)
                    .to("opacity", 1.0)
                    .at(1.0)
                    .stagger(0.3)
                    .on_start("bird"),
            )
            .unwrap();
        controller.toggle_playback();
        controller.tick(0.1);
        controller.tick(2.0);

        let starts: Vec<f64> = controller
            .synthesizer()
            .backend()
            .emitted()
            .iter()
            .filter(|voice| voice.tone.frequency() == 800.0)
            .map(|voice| voice.start)
            .collect();
        assert_eq!(starts.len(), 3);
        assert!((starts[0] - 2.1).abs() < 1e-9);
        assert!((starts[1] - starts[0] - 0.3).abs() < 1e-9);
        assert!((starts[2] - starts[1] - 0.3).abs() < 1e-9);

        let logged: Vec<f64> = controller
            .cue_log()
            .iter()
            .filter(|fired| fired.cue == "bird")
            .map(|fired| fired.audio_time)
            .collect();
        assert_eq!(logged, starts);
    }

    #[test]
    fn long_stall_emits_a_single_repeat_tone() {
        let mut controller = bare();
        controller
            .register_track(
                Track::new("bird1", 0.5)
                    .to("x_vw", 100.0)
                    .repeat(Repeat::Infinite)
                    .on_repeat("bird"),
            )
            .unwrap();
        controller.toggle_playback();
        controller.tick(0.1);
        controller.tick(120.0);
        controller.tick(0.1);

        let birds = controller
            .synthesizer()
            .backend()
            .emitted()
            .iter()
            .filter(|voice| voice.tone.frequency() == 800.0)
            .count();
        assert_eq!(birds, 1);
        assert!(controller.synthesizer().backend().peak() <= 2.0 * crate::audio::INITIAL_GAIN);
    }

    #[test]
    fn cue_log_keeps_only_recent_entries() {
        let mut controller = bare();
        for _ in 0..CUE_LOG_CAPACITY + 10 {
            controller.play_cue("bird");
        }

        assert_eq!(controller.cue_log().len(), CUE_LOG_CAPACITY);
        assert_eq!(controller.fired_total(), CUE_LOG_CAPACITY + 10);
    }

    #[test]
    fn debug_output_names_transport_and_backend() {
        let mut controller = bare();
        controller.toggle_playback();

        let debug = format!("{controller:?}");
        assert!(debug.starts_with("SceneController"));
        assert!(debug.contains("playing: true"));
        assert!(debug.contains("OfflineRenderer"));
    }

    #[test]
    fn controls_follow_transport() {
        let mut controller = bare();
        assert_eq!(controller.play_control().label, "▶ Start Animation");
        assert_eq!(controller.mute_control().label, "🔊 Mute");
        assert_eq!(controller.mute_control().background.as_deref(), Some("#ff9800"));

        controller.toggle_playback();
        controller.toggle_mute();

        assert_eq!(controller.play_control().label, "⏸ Pause Animation");
        assert!(controller.play_control().pressed);
        assert_eq!(controller.mute_control().label, "🔇 Unmute");
        assert_eq!(controller.mute_control().background.as_deref(), Some("#f44336"));
    }

    #[test]
    fn intro_runs_without_playback() {
        let mut controller = landscape();
        run(&mut controller, 2.0);

        assert_eq!(controller.playback_state(), PlaybackState::Stopped);
        assert_eq!(controller.timeline().elapsed(), 0.0);
        assert_eq!(controller.scene().read("text_panel", "y"), Some(0.0));
        assert_eq!(controller.scene().read("text_panel", "opacity"), Some(1.0));
    }

    #[test]
    fn pause_resume_keeps_mid_cycle_position() {
        let mut controller = bare();
        let id = controller
            .register_track(Track::new("cloud1", 4.0).to("x_vw", 100.0).repeat(Repeat::Infinite))
            .unwrap();
        controller.toggle_playback();
        controller.tick(1.0);
        controller.toggle_playback();
        controller.tick(10.0);
        controller.toggle_playback();
        controller.tick(1.0);

        let member = controller.timeline().member(id, 0).unwrap();
        assert_eq!(member.phase, TrackPhase::Active);
        assert!((member.progress - 0.5).abs() < 1e-9);
        assert_eq!(controller.scene().read("cloud1", "x_vw"), Some(50.0));
    }

    #[test]
    fn invalid_config_tracks_are_skipped() {
        let mut config = SceneConfig::landscape();
        config.tracks.push(Track::new("sun", 0.0));
        let controller = SceneController::new(&config, OfflineRenderer::new(8_000));
        assert_eq!(controller.timeline().len(), SceneConfig::landscape().tracks.len());
    }

    #[test]
    fn suspended_audio_does_not_stall_animation() {
        let mut controller = landscape();
        controller.synthesizer_mut().backend_mut().suspend();
        controller.toggle_playback();
        run(&mut controller, 2.0);

        assert_eq!(tones(&controller), 0);
        assert!(controller.timeline().elapsed() > 1.9);
        assert_eq!(controller.scene().read("bird1", "opacity"), Some(1.0));
    }

    #[test]
    fn typing_sounds_every_fifth_character() {
        let mut controller = bare();
        controller.focus_text();
        assert_eq!(controller.input_text("abcd"), 4);
        assert_eq!(controller.input_text("abcde"), 5);

        let emitted = controller.synthesizer().backend().emitted();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[1].tone.frequency(), 445.0);

        controller.toggle_mute();
        controller.input_text("abcdefghij");
        assert_eq!(tones(&controller), 2);
    }
}
