//! Audio analysis and export engine for the Spectravis editor.
//!
//! The crate owns the decoded audio buffer and everything that reads it:
//! spectral analysis for real-time visualization, single-voice playback
//! state, and the fixed-size frame sequencer that feeds a frame-by-frame
//! video encoder. Decoding codecs, rendering audio to a device, and drawing
//! anything on screen are collaborator concerns, reached through the
//! [`asset::AudioDecoder`], [`playback::AudioOutput`],
//! [`asset::ProgressSink`] and [`asset::WarningSink`] traits.

pub mod analysis;
pub mod asset;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod playback;
pub mod transform;

pub use analysis::{AnalysisProvider, SpectralFrame};
pub use asset::{
    AudioAsset, AudioDecoder, AudioStore, DecodedAudio, LogWarnings, NullProgress, ProgressSink,
    WarningSink,
};
pub use config::{AnalysisConfig, EngineConfig, ExportConfig};
pub use engine::AudioEngine;
pub use error::{EngineError, Result};
pub use export::{ExportFrame, ExportSequencer};
pub use playback::{AudioOutput, NullOutput, PlaybackController, Voice};
pub use transform::SpectralTransform;
