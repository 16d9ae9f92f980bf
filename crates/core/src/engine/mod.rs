use std::sync::Arc;

use crate::{
    analysis::{AnalysisProvider, SpectralFrame},
    asset::{AudioAsset, AudioDecoder, AudioStore, ProgressSink, WarningSink},
    config::EngineConfig,
    export::{ExportFrame, ExportSequencer},
    playback::{AudioOutput, PlaybackController},
    EngineError, Result,
};

/// One editor session's audio engine: the decoded-audio store, the playback
/// controller, the spectral analysis provider and the export sequencer behind
/// a single owner.
///
/// Every instance carries its own transform state, so independent sessions
/// never share spectral configuration. If the transform backend fails to
/// initialize the engine stays usable in a degraded mode: playback and export
/// keep working, `analyze` reports [`EngineError::AnalysisUnavailable`], and
/// the warning sink receives a persistent notice.
pub struct AudioEngine {
    config: EngineConfig,
    store: AudioStore,
    playback: PlaybackController,
    analysis: Option<AnalysisProvider>,
    sequencer: ExportSequencer,
    decoder: Box<dyn AudioDecoder>,
    progress: Box<dyn ProgressSink>,
    warnings: Box<dyn WarningSink>,
}

impl AudioEngine {
    pub fn new(
        config: EngineConfig,
        decoder: Box<dyn AudioDecoder>,
        output: Box<dyn AudioOutput>,
        progress: Box<dyn ProgressSink>,
        warnings: Box<dyn WarningSink>,
    ) -> Self {
        let analysis = match AnalysisProvider::new(&config.analysis) {
            Ok(provider) => Some(provider),
            Err(err) => {
                warnings.warning(&format!(
                    "failed to initialize the analysis backend ({err}); \
                     visualization is unavailable, playback and export still work"
                ));
                None
            }
        };

        let sequencer = ExportSequencer::new(config.export.window_size);
        Self {
            config,
            store: AudioStore::new(),
            playback: PlaybackController::new(output),
            analysis,
            sequencer,
            decoder,
            progress,
            warnings,
        }
    }

    /// Decodes raw audio bytes and makes the result the engine's asset.
    /// Loading replaces any previously held asset; playback of the old asset
    /// is stopped first.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<AudioAsset>> {
        self.playback.stop();
        self.store.load(
            bytes,
            self.decoder.as_mut(),
            self.progress.as_ref(),
            self.warnings.as_ref(),
        )
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.store.sample_rate()
    }

    pub fn duration_seconds(&self) -> Option<f32> {
        self.store.duration_seconds()
    }

    /// Starts playback from `time_seconds`, replacing any active voice.
    pub fn play(&mut self, time_seconds: f32) -> Result<()> {
        let asset = self.require_asset()?;
        self.playback.play(&asset, time_seconds)
    }

    /// Stops playback; a no-op when nothing is playing.
    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.playback.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.playback.volume()
    }

    pub fn toggle_mute(&mut self) {
        self.playback.toggle_mute();
    }

    pub fn set_unmuted(&mut self) {
        self.playback.set_unmuted();
    }

    pub fn is_muted(&self) -> bool {
        self.playback.is_muted()
    }

    /// Computes the spectral frame at `time_seconds`.
    pub fn analyze(&mut self, time_seconds: f32) -> Result<SpectralFrame> {
        let asset = self.require_asset()?;
        let analysis = self.analysis.as_mut().ok_or_else(|| {
            EngineError::AnalysisUnavailable("analysis backend is not initialized".into())
        })?;
        analysis.analyze(&asset, time_seconds)
    }

    /// Changes the analysis window size. The next `analyze` call reflects the
    /// new size. When the backend previously failed to initialize this is
    /// also the retry path.
    pub fn set_fft_size(&mut self, fft_size: usize) -> Result<()> {
        self.config.analysis.fft_size = fft_size;
        match self.analysis.as_mut() {
            Some(analysis) => analysis.set_window_size(fft_size),
            None => {
                self.analysis = Some(AnalysisProvider::new(&self.config.analysis)?);
                Ok(())
            }
        }
    }

    pub fn set_fold_channels(&mut self, fold: bool) {
        self.config.analysis.fold_channels = fold;
        if let Some(analysis) = self.analysis.as_mut() {
            analysis.set_fold_channels(fold);
        }
    }

    /// Positions the export cursor so the next frame starts at `time_seconds`.
    pub fn set_export_start(&mut self, time_seconds: f32) -> Result<()> {
        let sample_rate = self.store.sample_rate().ok_or(EngineError::NoAssetLoaded)?;
        self.sequencer.set_start(time_seconds, sample_rate);
        Ok(())
    }

    /// Emits the next fixed-size stereo export frame and advances the cursor.
    pub fn next_export_frame(&mut self) -> Result<ExportFrame> {
        let asset = self.require_asset()?;
        Ok(self.sequencer.next_frame(&asset))
    }

    /// Decimated waveform overview of the loaded asset.
    pub fn overview(&self, points: usize) -> Result<Vec<f32>> {
        Ok(self.require_asset()?.overview(points))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_asset(&self) -> Result<Arc<AudioAsset>> {
        self.store.asset().ok_or(EngineError::NoAssetLoaded)
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("loaded", &self.store.asset().is_some())
            .field("playing", &self.is_playing())
            .field("config", &self.config)
            .finish()
    }
}
