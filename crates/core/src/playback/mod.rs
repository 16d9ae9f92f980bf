use std::sync::Arc;

use crate::{asset::AudioAsset, Result};

/// One live instance of audio being rendered to the output device. The
/// controller never keeps more than one alive.
pub trait Voice {
    /// Adjusts the voice's gain without interrupting playback.
    fn set_gain(&mut self, gain: f32);
    /// Halts rendering. Called at most once; the voice is dropped afterwards.
    fn stop(&mut self);
}

/// Output device collaborator. The engine manages playback state and gain;
/// actually producing sound is the embedder's concern.
pub trait AudioOutput {
    /// Starts rendering `asset` from `offset_seconds` at the given gain and
    /// returns a handle to the running voice.
    fn start_voice(
        &mut self,
        asset: &Arc<AudioAsset>,
        offset_seconds: f32,
        gain: f32,
    ) -> Result<Box<dyn Voice>>;
}

/// Output backend that renders nothing. Used headless and as the default
/// until the embedder wires a real device.
#[derive(Debug, Default)]
pub struct NullOutput;

struct NullVoice;

impl Voice for NullVoice {
    fn set_gain(&mut self, _gain: f32) {}
    fn stop(&mut self) {}
}

impl AudioOutput for NullOutput {
    fn start_voice(
        &mut self,
        _asset: &Arc<AudioAsset>,
        _offset_seconds: f32,
        _gain: f32,
    ) -> Result<Box<dyn Voice>> {
        Ok(Box::new(NullVoice))
    }
}

/// Single-voice playback state machine: start/stop/volume/mute.
///
/// Volume and mute state persist across play/stop cycles and apply to the
/// live voice without restarting it.
pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    voice: Option<Box<dyn Voice>>,
    volume: f32,
    stored_volume: f32,
    muted: bool,
}

impl PlaybackController {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            voice: None,
            volume: 1.0,
            stored_volume: 1.0,
            muted: false,
        }
    }

    /// Starts playing `asset` from `offset_seconds`.
    ///
    /// Any active voice is torn down completely before the new one starts, so
    /// two voices never overlap. If the output refuses to start, the
    /// controller ends up stopped rather than half-started.
    pub fn play(&mut self, asset: &Arc<AudioAsset>, offset_seconds: f32) -> Result<()> {
        self.stop();
        let voice = self
            .output
            .start_voice(asset, offset_seconds.max(0.0), self.effective_gain())?;
        tracing::debug!(offset_seconds, "playback voice started");
        self.voice = Some(voice);
        Ok(())
    }

    /// Halts playback. A no-op when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(mut voice) = self.voice.take() {
            voice.stop();
            tracing::debug!("playback voice stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_some()
    }

    /// Sets the playback volume in [0, 1], applied live to the current voice
    /// and persisted for future ones. While muted the audible gain stays 0;
    /// the new value takes effect on unmute.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.muted {
            self.stored_volume = self.volume;
        }
        self.apply_gain();
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Flips mute state. Muting remembers the current volume; unmuting
    /// restores it.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.set_unmuted();
        } else {
            self.stored_volume = self.volume;
            self.muted = true;
            self.apply_gain();
        }
    }

    /// Leaves mute and restores the pre-mute volume.
    pub fn set_unmuted(&mut self) {
        self.volume = self.stored_volume;
        self.muted = false;
        self.apply_gain();
    }

    fn effective_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn apply_gain(&mut self) {
        let gain = self.effective_gain();
        if let Some(voice) = self.voice.as_mut() {
            voice.set_gain(gain);
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("playing", &self.is_playing())
            .field("volume", &self.volume)
            .field("muted", &self.muted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Started { offset: f32, gain: f32 },
        Gain(f32),
        Stopped,
    }

    #[derive(Default)]
    struct Log(Rc<RefCell<Vec<Event>>>);

    struct MockVoice(Rc<RefCell<Vec<Event>>>);

    impl Voice for MockVoice {
        fn set_gain(&mut self, gain: f32) {
            self.0.borrow_mut().push(Event::Gain(gain));
        }
        fn stop(&mut self) {
            self.0.borrow_mut().push(Event::Stopped);
        }
    }

    struct MockOutput(Rc<RefCell<Vec<Event>>>);

    impl AudioOutput for MockOutput {
        fn start_voice(
            &mut self,
            _asset: &Arc<AudioAsset>,
            offset_seconds: f32,
            gain: f32,
        ) -> Result<Box<dyn Voice>> {
            self.0.borrow_mut().push(Event::Started {
                offset: offset_seconds,
                gain,
            });
            Ok(Box::new(MockVoice(self.0.clone())))
        }
    }

    fn controller() -> (PlaybackController, Rc<RefCell<Vec<Event>>>) {
        let log = Log::default();
        let events = log.0.clone();
        (PlaybackController::new(Box::new(MockOutput(log.0))), events)
    }

    fn asset() -> Arc<AudioAsset> {
        Arc::new(AudioAsset::new(48_000, vec![vec![0.0; 48], vec![0.0; 48]]).unwrap())
    }

    #[test]
    fn play_while_playing_stops_the_old_voice_first() {
        let (mut playback, events) = controller();
        let asset = asset();

        playback.play(&asset, 0.0).unwrap();
        playback.play(&asset, 2.5).unwrap();

        let events = events.borrow();
        assert_eq!(
            events.as_slice(),
            &[
                Event::Started {
                    offset: 0.0,
                    gain: 1.0
                },
                Event::Stopped,
                Event::Started {
                    offset: 2.5,
                    gain: 1.0
                },
            ]
        );
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut playback, events) = controller();
        playback.stop();
        playback.stop();
        assert!(events.borrow().is_empty());
        assert!(!playback.is_playing());
    }

    #[test]
    fn volume_applies_live_without_restart() {
        let (mut playback, events) = controller();
        playback.play(&asset(), 0.0).unwrap();
        playback.set_volume(0.3);

        let events = events.borrow();
        assert_eq!(events.last(), Some(&Event::Gain(0.3)));
        assert!(!events.contains(&Event::Stopped));
    }

    #[test]
    fn mute_round_trip_restores_volume() {
        let (mut playback, _) = controller();
        playback.set_volume(0.8);
        playback.toggle_mute();
        assert!(playback.is_muted());
        assert_eq!(playback.effective_gain(), 0.0);

        playback.set_unmuted();
        assert!(!playback.is_muted());
        assert!((playback.volume() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn volume_set_while_muted_takes_effect_on_unmute() {
        let (mut playback, events) = controller();
        playback.play(&asset(), 0.0).unwrap();
        playback.set_volume(0.8);
        playback.toggle_mute();

        playback.set_volume(0.3);
        // Still muted: the audible gain stays zero.
        assert_eq!(events.borrow().last(), Some(&Event::Gain(0.0)));

        playback.set_unmuted();
        assert!((playback.volume() - 0.3).abs() < f32::EPSILON);
        assert_eq!(events.borrow().last(), Some(&Event::Gain(0.3)));
    }

    #[test]
    fn mute_state_survives_play_stop_cycles() {
        let (mut playback, events) = controller();
        playback.set_volume(0.6);
        playback.toggle_mute();

        playback.play(&asset(), 0.0).unwrap();
        assert_eq!(
            events.borrow().last(),
            Some(&Event::Started {
                offset: 0.0,
                gain: 0.0
            })
        );
        playback.stop();

        playback.toggle_mute();
        assert!((playback.volume() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn volume_is_clamped() {
        let (mut playback, _) = controller();
        playback.set_volume(1.8);
        assert_eq!(playback.volume(), 1.0);
        playback.set_volume(-0.5);
        assert_eq!(playback.volume(), 0.0);
    }

    #[test]
    fn negative_play_offset_is_clamped_to_zero() {
        let (mut playback, events) = controller();
        playback.play(&asset(), -3.0).unwrap();
        assert_eq!(
            events.borrow().last(),
            Some(&Event::Started {
                offset: 0.0,
                gain: 1.0
            })
        );
    }
}
