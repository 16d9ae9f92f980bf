use serde::{Deserialize, Serialize};

use crate::{
    asset::AudioAsset, config::AnalysisConfig, transform::SpectralTransform, EngineError, Result,
};

/// Both views of one analysed window. Ephemeral; recomputed per query and
/// never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectralFrame {
    /// Frequency magnitudes, `window_size / 2` bins.
    pub frequency_magnitudes: Vec<f32>,
    /// The raw window that was analysed, `window_size` samples.
    pub time_domain_samples: Vec<f32>,
}

/// On-demand spectral analysis over the decoded buffer.
///
/// Extracts a window of samples at a timestamp, runs it through the owned
/// [`SpectralTransform`], and returns both domains. Windows that run past the
/// end of the buffer are zero-padded to full length rather than shortened or
/// rejected, so a query near the tail always yields fixed-size output.
#[derive(Debug)]
pub struct AnalysisProvider {
    transform: SpectralTransform,
    fold_channels: bool,
}

impl AnalysisProvider {
    /// Creates a provider and plans the transform for `config.fft_size`.
    /// A planning failure surfaces as [`EngineError::Initialization`]; the
    /// caller should warn the user and continue without analysis.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let mut transform = SpectralTransform::new();
        transform.configure(config.fft_size)?;
        Ok(Self {
            transform,
            fold_channels: config.fold_channels,
        })
    }

    /// Currently configured window size.
    pub fn window_size(&self) -> usize {
        // The constructor and set_window_size both leave a valid plan behind.
        self.transform.window_size().unwrap_or_default()
    }

    /// Re-plans the transform for a new window size. Takes effect on the next
    /// `analyze` call; previously returned frames keep their old lengths.
    pub fn set_window_size(&mut self, window_size: usize) -> Result<()> {
        self.transform.configure(window_size)
    }

    /// Whether stereo sources are averaged down to mono before analysis.
    /// Defaults to off: channel 0 is analysed directly.
    pub fn set_fold_channels(&mut self, fold: bool) {
        self.fold_channels = fold;
    }

    /// Analyses the window starting at `time_seconds`.
    ///
    /// The start index is `floor(t × sample_rate)` clamped to ≥ 0. Transform
    /// failures surface as [`EngineError::AnalysisUnavailable`]; the
    /// visualization layer degrades to a blank or last-known frame.
    pub fn analyze(&mut self, asset: &AudioAsset, time_seconds: f32) -> Result<SpectralFrame> {
        let window = self.window_size();
        // f64 keeps the sample index exact on long timelines; in f32 the
        // product drifts once it passes 2^24.
        let index = (time_seconds.max(0.0) as f64 * asset.sample_rate() as f64).floor() as usize;
        let samples = extract_window(asset, index, window, self.fold_channels);

        let frequency_magnitudes = self
            .transform
            .transform(&samples)
            .map_err(|err| EngineError::AnalysisUnavailable(err.to_string()))?;

        Ok(SpectralFrame {
            frequency_magnitudes,
            time_domain_samples: samples,
        })
    }
}

/// Copies `window` samples starting at `start`, zero-padding past the end of
/// the buffer. Stereo is averaged sample-by-sample when `fold` is set,
/// otherwise channel 0 is read directly.
fn extract_window(asset: &AudioAsset, start: usize, window: usize, fold: bool) -> Vec<f32> {
    let mut samples = vec![0.0_f32; window];
    let len = asset.len_samples();
    if start >= len {
        return samples;
    }

    let available = (len - start).min(window);
    let left = &asset.channel(0)[start..start + available];
    if fold && asset.channel_count() == 2 {
        let right = &asset.channel(1)[start..start + available];
        for i in 0..available {
            samples[i] = (left[i] + right[i]) / 2.0;
        }
    } else {
        samples[..available].copy_from_slice(left);
    }
    samples
}
