use std::collections::VecDeque;

use crate::{Result, SceneError};

use super::{AudioBackend, Voice};

/// Voices kept in the emission history before the oldest are dropped.
pub const HISTORY_CAPACITY: usize = 256;

/// Backend that mixes voices into a sample buffer against its own audio
/// clock. Used for headless runs and tests.
#[derive(Debug)]
pub struct OfflineRenderer {
    sample_rate: u32,
    rendered_frames: u64,
    elapsed: f64,
    suspended: bool,
    active: Vec<Voice>,
    emitted: VecDeque<Voice>,
    emitted_total: usize,
    peak: f32,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            rendered_frames: 0,
            elapsed: 0.0,
            suspended: false,
            active: Vec::new(),
            emitted: VecDeque::new(),
            emitted_total: 0,
            peak: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The most recently accepted voices, in scheduling order.
    pub fn emitted(&self) -> &VecDeque<Voice> {
        &self.emitted
    }

    /// Number of voices accepted since the renderer was created.
    pub fn emitted_total(&self) -> usize {
        self.emitted_total
    }

    /// Largest absolute sample value produced by [`render`](Self::render).
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Stops the audio clock and refuses new voices until resumed.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Mixes the next `frames` mono samples and advances the audio clock.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let rate = f64::from(self.sample_rate);
        let mut block = Vec::with_capacity(frames);

        for _ in 0..frames {
            let time = self.rendered_frames as f64 / rate;
            let sample: f32 = self.active.iter().map(|voice| voice.sample_at(time)).sum();
            self.peak = self.peak.max(sample.abs());
            block.push(sample);
            self.rendered_frames += 1;
        }

        let now = self.rendered_frames as f64 / rate;
        self.active.retain(|voice| voice.end() > now);
        self.elapsed = self.elapsed.max(now);
        block
    }
}

impl AudioBackend for OfflineRenderer {
    fn current_time(&self) -> f64 {
        self.elapsed
    }

    fn schedule(&mut self, voice: Voice) -> Result<()> {
        if self.suspended {
            return Err(SceneError::AudioUnavailable(
                "offline renderer is suspended".to_string(),
            ));
        }
        self.active.push(voice);
        if self.emitted.len() == HISTORY_CAPACITY {
            self.emitted.pop_front();
        }
        self.emitted.push_back(voice);
        self.emitted_total += 1;
        Ok(())
    }

    fn advance(&mut self, seconds: f64) {
        if self.suspended || seconds.is_nan() || seconds <= 0.0 {
            return;
        }
        self.elapsed += seconds;
        let target = (self.elapsed * f64::from(self.sample_rate)).floor() as u64;
        let frames = target.saturating_sub(self.rendered_frames) as usize;
        self.render(frames);
        // Rounding in `render` must not pull the clock backwards.
        let rendered = self.rendered_frames as f64 / f64::from(self.sample_rate);
        self.elapsed = self.elapsed.max(rendered);
    }
}

/// Backend for hosts without audio output. Every voice is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn current_time(&self) -> f64 {
        0.0
    }

    fn schedule(&mut self, _voice: Voice) -> Result<()> {
        Err(SceneError::AudioUnavailable("no audio output".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Tone, Waveform, INITIAL_GAIN};

    fn voice(start: f64) -> Voice {
        Voice {
            tone: Tone::new(100.0, 0.5, Waveform::Square).unwrap(),
            start,
        }
    }

    #[test]
    fn advance_moves_clock_and_mixes_voices() {
        let mut renderer = OfflineRenderer::new(1_000);
        renderer.schedule(voice(0.0)).unwrap();

        renderer.advance(0.25);
        assert!((renderer.current_time() - 0.25).abs() < 1e-9);
        assert!((renderer.peak() - INITIAL_GAIN).abs() < 1e-3);
    }

    #[test]
    fn finished_voices_are_dropped_from_the_mix() {
        let mut renderer = OfflineRenderer::new(1_000);
        renderer.schedule(voice(0.0)).unwrap();

        renderer.advance(0.6);
        let tail = renderer.render(100);
        assert!(tail.iter().all(|sample| *sample == 0.0));
        assert_eq!(renderer.emitted().len(), 1);
    }

    #[test]
    fn history_keeps_only_recent_voices() {
        let mut renderer = OfflineRenderer::new(1_000);
        for index in 0..HISTORY_CAPACITY + 5 {
            renderer.schedule(voice(index as f64)).unwrap();
        }

        assert_eq!(renderer.emitted().len(), HISTORY_CAPACITY);
        assert_eq!(renderer.emitted_total(), HISTORY_CAPACITY + 5);
        assert_eq!(renderer.emitted()[0].start, 5.0);
    }

    #[test]
    fn suspended_renderer_refuses_voices_and_freezes_clock() {
        let mut renderer = OfflineRenderer::new(1_000);
        renderer.suspend();

        let err = renderer.schedule(voice(0.0)).unwrap_err();
        assert!(matches!(err, SceneError::AudioUnavailable(_)));
        renderer.advance(1.0);
        assert_eq!(renderer.current_time(), 0.0);

        renderer.resume();
        assert!(renderer.schedule(voice(0.0)).is_ok());
    }
}
