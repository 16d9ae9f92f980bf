use std::sync::Arc;

use crate::{EngineError, Result};

/// Fraction held back from decode progress so the bar never reaches the end
/// before post-decode bookkeeping runs.
const PROGRESS_HOLDBACK: f32 = 0.02;
/// Progress value reported once the decoded asset has been validated and
/// published. The remaining headroom belongs to the caller.
const PROGRESS_DECODED: f32 = 0.99;

/// Immutable decoded audio owned by the [`AudioStore`].
///
/// Shared via `Arc` between playback, analysis and export; none of the three
/// may mutate it, which is what makes lock-free concurrent reads safe.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    sample_rate: u32,
    duration_seconds: f32,
    channels: Vec<Vec<f32>>,
}

impl AudioAsset {
    /// Validates and wraps decoder output. Fails with
    /// [`EngineError::UnsupportedChannelLayout`] unless the layout is mono or
    /// stereo, and with [`EngineError::Decode`] when channel lengths differ.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(EngineError::UnsupportedChannelLayout {
                channels: channels.len(),
            });
        }
        if sample_rate == 0 {
            return Err(EngineError::Decode("sample rate must be positive".into()));
        }

        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(EngineError::Decode(
                "decoded channels have mismatched lengths".into(),
            ));
        }

        Ok(Self {
            sample_rate,
            duration_seconds: len as f32 / sample_rate as f32,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len_samples(&self) -> usize {
        self.channels[0].len()
    }

    /// Borrow one channel's samples. Panics on an out-of-range index; callers
    /// check [`channel_count`](Self::channel_count) first.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Decimated mono-folded waveform overview, one value per requested
    /// point, for timeline-style rendering of the whole track.
    pub fn overview(&self, points: usize) -> Vec<f32> {
        let len = self.len_samples();
        if points == 0 || len == 0 {
            return Vec::new();
        }

        let step = (len / points).max(1);
        let left = &self.channels[0];
        let mut data = Vec::with_capacity(points);
        let mut index = 0;
        while index < len && data.len() < points {
            let value = if self.channels.len() == 1 {
                left[index]
            } else {
                (left[index] + self.channels[1][index]) / 2.0
            };
            data.push(value);
            index += step;
        }
        data
    }
}

/// Raw decoder output, prior to validation by the store.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    /// Per-channel, non-interleaved samples in [-1, 1].
    pub channels: Vec<Vec<f32>>,
}

/// Opaque decode capability. The engine never implements codecs itself; the
/// embedding application supplies one of these.
pub trait AudioDecoder {
    /// Decodes `bytes` into per-channel float samples, reporting fractional
    /// progress along the way. Resolves or fails exactly once per call.
    fn decode(&mut self, bytes: &[u8], progress: &dyn ProgressSink) -> Result<DecodedAudio>;
}

/// Receives fractional load progress in [0, 1].
pub trait ProgressSink {
    fn progress(&self, fraction: f32);
}

/// Receives human-readable warnings for conditions the engine survives in a
/// degraded mode (unsupported layouts, transform initialization failure).
pub trait WarningSink {
    fn warning(&self, message: &str);
}

/// Progress sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _fraction: f32) {}
}

/// Warning sink that forwards to the log.
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Owns the decoded audio buffer for one engine instance.
#[derive(Debug, Default)]
pub struct AudioStore {
    asset: Option<Arc<AudioAsset>>,
    loading: bool,
}

impl AudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes` through the supplied capability, validates the channel
    /// layout, and publishes the asset.
    ///
    /// Exactly one load may be pending at a time; a re-entrant call is
    /// rejected with [`EngineError::LoadInProgress`] rather than silently
    /// overwriting the pending one. On any failure the store keeps its
    /// previous asset.
    ///
    /// Decode progress is forwarded to `progress` held slightly below 1.0;
    /// 0.99 is reported once the asset is published, leaving the tail for the
    /// caller's own bookkeeping.
    pub fn load(
        &mut self,
        bytes: &[u8],
        decoder: &mut dyn AudioDecoder,
        progress: &dyn ProgressSink,
        warnings: &dyn WarningSink,
    ) -> Result<Arc<AudioAsset>> {
        if self.loading {
            return Err(EngineError::LoadInProgress);
        }

        self.loading = true;
        let result = self.decode_and_publish(bytes, decoder, progress, warnings);
        self.loading = false;
        result
    }

    fn decode_and_publish(
        &mut self,
        bytes: &[u8],
        decoder: &mut dyn AudioDecoder,
        progress: &dyn ProgressSink,
        warnings: &dyn WarningSink,
    ) -> Result<Arc<AudioAsset>> {
        let held = HeldBackProgress { inner: progress };
        let decoded = decoder.decode(bytes, &held)?;

        let channel_count = decoded.channels.len();
        let asset = match AudioAsset::new(decoded.sample_rate, decoded.channels) {
            Ok(asset) => asset,
            Err(err) => {
                if let EngineError::UnsupportedChannelLayout { channels } = &err {
                    warnings.warning(&format!(
                        "only mono and stereo audio are supported; \
                         this file has {channels} channels, please load a different one"
                    ));
                }
                return Err(err);
            }
        };

        if channel_count == 1 {
            warnings.warning(
                "mono audio loaded; stereo export will duplicate the single channel",
            );
        }

        tracing::info!(
            sample_rate = asset.sample_rate(),
            duration_seconds = asset.duration_seconds(),
            channels = asset.channel_count(),
            "audio asset decoded"
        );

        let asset = Arc::new(asset);
        self.asset = Some(asset.clone());
        progress.progress(PROGRESS_DECODED);
        Ok(asset)
    }

    /// The current asset, if one has been loaded.
    pub fn asset(&self) -> Option<Arc<AudioAsset>> {
        self.asset.clone()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.asset.as_ref().map(|a| a.sample_rate())
    }

    pub fn duration_seconds(&self) -> Option<f32> {
        self.asset.as_ref().map(|a| a.duration_seconds())
    }

    /// Drops the current asset, returning the store to its unloaded state.
    pub fn clear(&mut self) {
        self.asset = None;
    }
}

/// Scales decode-time progress so the tail of the bar stays reserved for the
/// bookkeeping that follows decoding.
struct HeldBackProgress<'a> {
    inner: &'a dyn ProgressSink,
}

impl ProgressSink for HeldBackProgress<'_> {
    fn progress(&self, fraction: f32) {
        self.inner
            .progress((fraction.clamp(0.0, 1.0) - PROGRESS_HOLDBACK).max(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FixedDecoder {
        output: Result<DecodedAudio>,
        report: Vec<f32>,
    }

    impl AudioDecoder for FixedDecoder {
        fn decode(&mut self, _bytes: &[u8], progress: &dyn ProgressSink) -> Result<DecodedAudio> {
            for fraction in &self.report {
                progress.progress(*fraction);
            }
            match &self.output {
                Ok(decoded) => Ok(decoded.clone()),
                Err(_) => Err(EngineError::Decode("unreadable".into())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        values: RefCell<Vec<f32>>,
    }

    impl ProgressSink for RecordingProgress {
        fn progress(&self, fraction: f32) {
            self.values.borrow_mut().push(fraction);
        }
    }

    #[derive(Default)]
    struct RecordingWarnings {
        messages: RefCell<Vec<String>>,
    }

    impl WarningSink for RecordingWarnings {
        fn warning(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    fn stereo_decoder() -> FixedDecoder {
        FixedDecoder {
            output: Ok(DecodedAudio {
                sample_rate: 48_000,
                channels: vec![vec![0.5; 480], vec![-0.5; 480]],
            }),
            report: vec![0.5, 1.0],
        }
    }

    #[test]
    fn load_publishes_rate_and_duration() {
        let mut store = AudioStore::new();
        let asset = store
            .load(
                &[],
                &mut stereo_decoder(),
                &NullProgress,
                &RecordingWarnings::default(),
            )
            .unwrap();

        assert_eq!(asset.sample_rate(), 48_000);
        assert_eq!(asset.channel_count(), 2);
        assert!((asset.duration_seconds() - 0.01).abs() < 1e-6);
        assert_eq!(store.sample_rate(), Some(48_000));
    }

    #[test]
    fn progress_is_held_back_then_capped_at_bookkeeping() {
        let mut store = AudioStore::new();
        let progress = RecordingProgress::default();
        store
            .load(
                &[],
                &mut stereo_decoder(),
                &progress,
                &RecordingWarnings::default(),
            )
            .unwrap();

        let values = progress.values.borrow();
        // 0.5 and 1.0 from the decoder arrive held back; 0.99 closes the load.
        assert_eq!(values.len(), 3);
        assert!((values[0] - 0.48).abs() < 1e-6);
        assert!((values[1] - 0.98).abs() < 1e-6);
        assert!((values[2] - 0.99).abs() < 1e-6);
        assert!(values.iter().all(|v| *v < 1.0));
    }

    #[test]
    fn rejects_more_than_two_channels_and_keeps_previous_asset() {
        let mut store = AudioStore::new();
        let warnings = RecordingWarnings::default();
        store
            .load(&[], &mut stereo_decoder(), &NullProgress, &warnings)
            .unwrap();

        let mut surround = FixedDecoder {
            output: Ok(DecodedAudio {
                sample_rate: 48_000,
                channels: vec![vec![0.0; 8]; 6],
            }),
            report: Vec::new(),
        };
        let err = store
            .load(&[], &mut surround, &NullProgress, &warnings)
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::UnsupportedChannelLayout { channels: 6 }
        ));
        assert!(warnings.messages.borrow().iter().any(|m| m.contains("6")));
        // The stereo asset from the first load survives.
        assert_eq!(store.asset().unwrap().channel_count(), 2);
    }

    #[test]
    fn mono_loads_with_a_warning() {
        let mut store = AudioStore::new();
        let warnings = RecordingWarnings::default();
        let mut mono = FixedDecoder {
            output: Ok(DecodedAudio {
                sample_rate: 44_100,
                channels: vec![vec![0.1; 100]],
            }),
            report: Vec::new(),
        };

        let asset = store
            .load(&[], &mut mono, &NullProgress, &warnings)
            .unwrap();
        assert_eq!(asset.channel_count(), 1);
        assert!(warnings
            .messages
            .borrow()
            .iter()
            .any(|m| m.contains("mono")));
    }

    #[test]
    fn load_while_one_is_pending_is_rejected() {
        let mut store = AudioStore::new();
        store.loading = true;

        let err = store
            .load(
                &[],
                &mut stereo_decoder(),
                &NullProgress,
                &RecordingWarnings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::LoadInProgress));
        assert!(store.asset().is_none());

        // Once the pending load settles, loading works again.
        store.loading = false;
        assert!(store
            .load(
                &[],
                &mut stereo_decoder(),
                &NullProgress,
                &RecordingWarnings::default()
            )
            .is_ok());
    }

    #[test]
    fn decode_failure_leaves_store_unloaded() {
        let mut store = AudioStore::new();
        let mut broken = FixedDecoder {
            output: Err(EngineError::Decode("unreadable".into())),
            report: Vec::new(),
        };

        let err = store
            .load(
                &[],
                &mut broken,
                &NullProgress,
                &RecordingWarnings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert!(store.asset().is_none());
        // The failed load does not leave the pending flag stuck.
        assert!(store
            .load(
                &[],
                &mut stereo_decoder(),
                &NullProgress,
                &RecordingWarnings::default()
            )
            .is_ok());
    }

    #[test]
    fn rejects_mismatched_channel_lengths() {
        let err = AudioAsset::new(48_000, vec![vec![0.0; 10], vec![0.0; 9]]).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn overview_folds_stereo_and_honors_point_count() {
        let asset = AudioAsset::new(100, vec![vec![0.4; 1000], vec![0.2; 1000]]).unwrap();
        let overview = asset.overview(50);
        assert_eq!(overview.len(), 50);
        assert!(overview.iter().all(|v| (*v - 0.3).abs() < 1e-6));
        assert!(asset.overview(0).is_empty());
    }
}
