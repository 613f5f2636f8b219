//! Master timeline: ordered tracks on one logical clock.
//!
//! Every member of every track walks `Pending -> Active -> Settled`, with
//! repeats looping back into `Active`. Endless tracks never settle. The
//! engine is pure with respect to audio: cue hooks come out of
//! [`TimelineEngine::advance`] as [`CueTrigger`] values for the caller to
//! resolve.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{scene::default_value, PropertyUpdate, Result, TargetRegistry};

mod ease;
mod track;

pub use ease::Ease;
pub use track::{Repeat, Track};

/// Logical clock shared by every track of a timeline.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// Scene-wide transport. Owned by the scene controller; the engine and cue
/// library only receive it by reference.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportState {
    pub playing: bool,
    pub muted: bool,
}

/// Registration index of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPhase {
    Pending,
    Active,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Start,
    Repeat,
}

/// A cue hook that fired during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueTrigger {
    pub cue: String,
    pub track: TrackId,
    pub member: usize,
    pub kind: TriggerKind,
    /// Timeline time at which the hook logically fired.
    pub time: f64,
}

/// Everything one tick of the timeline produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub triggers: Vec<CueTrigger>,
    pub updates: Vec<PropertyUpdate>,
}

/// Runtime view of one track member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberSnapshot {
    pub phase: TrackPhase,
    /// Zero-based cycle the member is in.
    pub cycle: u64,
    /// Linear position inside the current cycle, before easing and yoyo.
    pub progress: f64,
}

#[derive(Debug, Clone)]
struct MemberState {
    target: String,
    phase: TrackPhase,
    cycle: u64,
    progress: f64,
    from: BTreeMap<String, f32>,
}

#[derive(Debug, Clone)]
struct TrackRuntime {
    track: Track,
    members: Vec<MemberState>,
}

/// Ordered collection of tracks driven by one transport.
#[derive(Debug, Default)]
pub struct TimelineEngine {
    clock: PlaybackClock,
    tracks: Vec<TrackRuntime>,
}

impl TimelineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds the timeline has played since its zero point.
    pub fn elapsed(&self) -> f64 {
        self.clock.time_seconds
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0).map(|runtime| &runtime.track)
    }

    /// Resumes elapsed-time advancement from wherever each track stands.
    pub fn play(&mut self, transport: &mut TransportState) {
        if !transport.playing {
            tracing::debug!(elapsed = self.elapsed(), "timeline playing");
        }
        transport.playing = true;
    }

    /// Freezes every track in place. Progress is kept.
    pub fn pause(&mut self, transport: &mut TransportState) {
        if transport.playing {
            tracing::debug!(elapsed = self.elapsed(), "timeline paused");
        }
        transport.playing = false;
    }

    /// Adds a track. Its start offset counts from the timeline's zero point,
    /// so a track registered mid-playback with an offset in the past
    /// activates on the next tick.
    pub fn register_track(&mut self, track: Track) -> Result<TrackId> {
        track.validate()?;

        let id = TrackId(self.tracks.len());
        let members = track
            .targets
            .iter()
            .map(|target| MemberState {
                target: target.clone(),
                phase: TrackPhase::Pending,
                cycle: 0,
                progress: 0.0,
                from: BTreeMap::new(),
            })
            .collect();
        self.tracks.push(TrackRuntime { track, members });
        Ok(id)
    }

    /// Aggregate phase: pending until any member starts, settled once all
    /// members have.
    pub fn track_phase(&self, id: TrackId) -> Option<TrackPhase> {
        let runtime = self.tracks.get(id.0)?;
        let phases = runtime.members.iter().map(|member| member.phase);
        let phase = if phases.clone().all(|phase| phase == TrackPhase::Settled) {
            TrackPhase::Settled
        } else if phases.clone().all(|phase| phase == TrackPhase::Pending) {
            TrackPhase::Pending
        } else {
            TrackPhase::Active
        };
        Some(phase)
    }

    pub fn member(&self, id: TrackId, member: usize) -> Option<MemberSnapshot> {
        let state = self.tracks.get(id.0)?.members.get(member)?;
        Some(MemberSnapshot {
            phase: state.phase,
            cycle: state.cycle,
            progress: state.progress,
        })
    }

    /// Moves the clock forward by `delta` seconds and evaluates every track in
    /// registration order. Does nothing unless the transport is playing.
    ///
    /// Triggers are ordered by the time they logically fired; tracks and
    /// members sharing a time keep registration order.
    pub fn advance(
        &mut self,
        delta: f64,
        transport: &TransportState,
        targets: &dyn TargetRegistry,
    ) -> TickOutput {
        let mut output = TickOutput::default();
        if !transport.playing {
            return output;
        }

        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.clock.advance(delta);
        let now = self.clock.time_seconds;

        for (index, runtime) in self.tracks.iter_mut().enumerate() {
            runtime.evaluate(TrackId(index), now, targets, &mut output);
        }

        output.triggers.sort_by(|a, b| a.time.total_cmp(&b.time));
        output
    }
}

impl TrackRuntime {
    fn evaluate(
        &mut self,
        id: TrackId,
        now: f64,
        targets: &dyn TargetRegistry,
        output: &mut TickOutput,
    ) {
        let track = &self.track;
        for (index, member) in self.members.iter_mut().enumerate() {
            if member.phase == TrackPhase::Settled {
                continue;
            }

            let start = track.member_start(index);
            let local = now - start;
            if local < 0.0 {
                continue;
            }

            let previous_cycle = if member.phase == TrackPhase::Pending {
                member.from = capture_from(track, &member.target, targets);
                if let Some(cue) = &track.on_start {
                    output.triggers.push(CueTrigger {
                        cue: cue.clone(),
                        track: id,
                        member: index,
                        kind: TriggerKind::Start,
                        time: start,
                    });
                }
                0
            } else {
                member.cycle
            };

            let (phase, cycle, progress) = position(track, local);
            // One repeat hook per member per tick, however many cycle
            // boundaries the tick crossed.
            if let Some(cue) = &track.on_repeat {
                if cycle > previous_cycle {
                    output.triggers.push(CueTrigger {
                        cue: cue.clone(),
                        track: id,
                        member: index,
                        kind: TriggerKind::Repeat,
                        time: start + track.duration * cycle as f64,
                    });
                }
            }

            member.phase = phase;
            member.cycle = cycle;
            member.progress = progress;

            let reversed = track.yoyo && cycle % 2 == 1;
            let linear = if reversed { 1.0 - progress } else { progress };
            let eased = track.ease.apply(linear as f32);
            for (property, to) in &track.properties {
                let from = member
                    .from
                    .get(property)
                    .copied()
                    .unwrap_or_else(|| default_value(property));
                output.updates.push(PropertyUpdate {
                    target: member.target.clone(),
                    property: property.clone(),
                    value: from + (to - from) * eased,
                });
            }
        }
    }
}

/// Phase, cycle and in-cycle progress of a member `local` seconds past its
/// start.
fn position(track: &Track, local: f64) -> (TrackPhase, u64, f64) {
    if let Some(cycles) = track.repeat.cycles() {
        if local >= track.duration * cycles as f64 {
            return (TrackPhase::Settled, cycles - 1, 1.0);
        }
    }

    let cycles_done = local / track.duration;
    let cycle = cycles_done.floor();
    (TrackPhase::Active, cycle as u64, cycles_done - cycle)
}

fn capture_from(
    track: &Track,
    target: &str,
    targets: &dyn TargetRegistry,
) -> BTreeMap<String, f32> {
    track
        .properties
        .keys()
        .map(|property| {
            let value = track
                .from
                .get(property)
                .copied()
                .or_else(|| targets.read(target, property))
                .unwrap_or_else(|| default_value(property));
            (property.clone(), value)
        })
        .collect()
}
