/// Result alias that carries the custom [`EngineError`] type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Common error type for the engine crate.
///
/// Extraction edge cases (a window running past the end of the decoded
/// buffer) are deliberately absent: those are handled locally with zero
/// padding so that export stays gapless.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The spectral transform backend could not be initialized. Analysis is
    /// unavailable until a successful reconfiguration; playback and export
    /// keep working.
    #[error("failed to initialize the spectral transform backend: {0}")]
    Initialization(String),

    /// `transform` was called before `configure`. A sequencing bug in the
    /// caller, never a recoverable runtime condition.
    #[error("spectral transform used before configuration")]
    NotConfigured,

    /// The sample block handed to the transform does not match the configured
    /// window size.
    #[error("sample block of {actual} samples does not match the configured window of {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The decoded asset has a channel layout the engine does not support.
    #[error("unsupported channel layout: {channels} channels (only mono and stereo are supported)")]
    UnsupportedChannelLayout { channels: usize },

    /// Decoding the source bytes failed. The store keeps its previous asset.
    #[error("audio decoding failed: {0}")]
    Decode(String),

    /// A `load` call arrived while another decode was still pending.
    #[error("another load is already in progress")]
    LoadInProgress,

    /// An operation that needs decoded audio ran before any asset was loaded.
    #[error("no audio asset is loaded")]
    NoAssetLoaded,

    /// Spectral analysis could not produce a frame. Callers should fall back
    /// to a blank or last-known frame instead of terminating the session.
    #[error("spectral analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// Wrapper around FFT processing errors from the numeric backend.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),

    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
