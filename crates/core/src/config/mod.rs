use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub export: ExportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| crate::EngineError::Decode(format!("invalid engine config: {err}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| crate::EngineError::Decode(format!("config serialization: {err}")))
    }
}

/// Configuration for the spectral analysis path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Window size for visualization FFTs.
    pub fft_size: usize,
    /// Average the two stereo channels before analysis instead of reading
    /// channel 0 alone. Off by default; kept as a flag with no UI surface.
    pub fold_channels: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048 * 8,
            fold_channels: false,
        }
    }
}

/// Configuration for the export sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Samples per exported frame. 1152 matches one MPEG audio frame, which
    /// keeps a frame-per-call encoder fed at a constant rate.
    pub window_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { window_size: 1152 }
    }
}
