use std::{cell::Cell, fs, io::Cursor, path::PathBuf};

use clap::{Parser, Subcommand};
use spectravis_core::{
    AudioDecoder, AudioEngine, DecodedAudio, EngineConfig, EngineError, LogWarnings, NullOutput,
    ProgressSink,
};
use tracing_subscriber::EnvFilter;

fn main() -> spectravis_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => run_info(&input),
        Commands::Analyze {
            input,
            time,
            fft_size,
        } => run_analyze(&input, time, fft_size),
        Commands::Export {
            input,
            output,
            start,
            window,
        } => run_export(&input, &output, start, window),
    }
}

fn run_info(input: &PathBuf) -> spectravis_core::Result<()> {
    let mut engine = build_engine(EngineConfig::default())?;
    let asset = engine.load(&fs::read(input)?)?;

    tracing::info!(
        sample_rate = asset.sample_rate(),
        duration_seconds = asset.duration_seconds(),
        channels = asset.channel_count(),
        samples_per_channel = asset.len_samples(),
        "loaded audio asset"
    );

    let overview = engine.overview(16)?;
    tracing::info!(?overview, "waveform overview");
    Ok(())
}

fn run_analyze(input: &PathBuf, time: f32, fft_size: usize) -> spectravis_core::Result<()> {
    let mut config = EngineConfig::default();
    config.analysis.fft_size = fft_size;
    let mut engine = build_engine(config)?;
    engine.load(&fs::read(input)?)?;

    let frame = engine.analyze(time)?;
    let sample_rate = engine.sample_rate().unwrap_or_default();
    let bin_hz = sample_rate as f32 / fft_size as f32;

    let (peak_bin, peak_magnitude) = frame
        .frequency_magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, m)| (i, *m))
        .unwrap_or((0, 0.0));

    tracing::info!(
        time,
        fft_size,
        bins = frame.frequency_magnitudes.len(),
        peak_bin,
        peak_hz = peak_bin as f32 * bin_hz,
        peak_magnitude,
        "spectral frame"
    );
    Ok(())
}

fn run_export(
    input: &PathBuf,
    output: &PathBuf,
    start: f32,
    window: usize,
) -> spectravis_core::Result<()> {
    let mut config = EngineConfig::default();
    config.export.window_size = window;
    let mut engine = build_engine(config)?;
    let asset = engine.load(&fs::read(input)?)?;

    engine.set_export_start(start)?;
    // First sample the cursor will actually read; frame boundaries are
    // multiples of the window, not of the requested start time.
    let start_frame =
        (start.max(0.0) as f64 * asset.sample_rate() as f64 / window as f64).floor() as usize;
    let remaining = asset.len_samples().saturating_sub(start_frame * window);
    let frame_count = remaining.div_ceil(window);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: asset.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec).map_err(wav_error)?;

    for _ in 0..frame_count {
        let frame = engine.next_export_frame()?;
        for (left, right) in frame.left.iter().zip(frame.right.iter()) {
            writer.write_sample(*left).map_err(wav_error)?;
            writer.write_sample(*right).map_err(wav_error)?;
        }
    }
    writer.finalize().map_err(wav_error)?;

    tracing::info!(
        ?output,
        frames = frame_count,
        window,
        "export frames written"
    );
    Ok(())
}

fn build_engine(config: EngineConfig) -> spectravis_core::Result<AudioEngine> {
    Ok(AudioEngine::new(
        config,
        Box::new(WavDecoder),
        Box::new(NullOutput),
        Box::new(ConsoleProgress::default()),
        Box::new(LogWarnings),
    ))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn wav_error(err: hound::Error) -> EngineError {
    EngineError::Io(std::io::Error::other(err.to_string()))
}

/// WAV decode capability backed by `hound`. Integer samples are normalised to
/// [-1, 1]; interleaved data is split into per-channel buffers.
struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(
        &mut self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
    ) -> spectravis_core::Result<DecodedAudio> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|err| EngineError::Decode(err.to_string()))?;
        let spec = reader.spec();
        let channel_count = spec.channels as usize;
        let total = reader.len() as usize;

        let mut interleaved = Vec::with_capacity(total);
        match spec.sample_format {
            hound::SampleFormat::Float => {
                for (index, sample) in reader.samples::<f32>().enumerate() {
                    interleaved.push(sample.map_err(|err| EngineError::Decode(err.to_string()))?);
                    report_chunked(progress, index, total);
                }
            }
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                for (index, sample) in reader.samples::<i32>().enumerate() {
                    let value = sample.map_err(|err| EngineError::Decode(err.to_string()))?;
                    interleaved.push(value as f32 / scale);
                    report_chunked(progress, index, total);
                }
            }
        }

        if channel_count == 0 {
            return Err(EngineError::Decode("wav reports zero channels".into()));
        }
        let mut channels = vec![Vec::with_capacity(total / channel_count); channel_count];
        for (index, sample) in interleaved.into_iter().enumerate() {
            channels[index % channel_count].push(sample);
        }

        progress.progress(1.0);
        Ok(DecodedAudio {
            sample_rate: spec.sample_rate,
            channels,
        })
    }
}

fn report_chunked(progress: &dyn ProgressSink, index: usize, total: usize) {
    if total > 0 && index % 65_536 == 0 {
        progress.progress(index as f32 / total as f32);
    }
}

/// Logs load progress at coarse increments instead of flooding the output.
#[derive(Default)]
struct ConsoleProgress {
    last_reported: Cell<f32>,
}

impl ProgressSink for ConsoleProgress {
    fn progress(&self, fraction: f32) {
        if fraction - self.last_reported.get() >= 0.1 || fraction >= 0.99 {
            self.last_reported.set(fraction);
            tracing::info!(progress = format!("{:.0}%", fraction * 100.0), "loading");
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Spectravis audio engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a WAV file and print asset metadata plus a waveform overview.
    Info {
        /// Path to the audio file.
        input: PathBuf,
    },
    /// Compute one spectral frame at the given timestamp.
    Analyze {
        /// Path to the audio file.
        input: PathBuf,
        /// Timestamp in seconds to analyse.
        #[arg(short, long, default_value_t = 0.0)]
        time: f32,
        /// Analysis window size in samples.
        #[arg(short, long, default_value_t = 16_384)]
        fft_size: usize,
    },
    /// Re-sequence the audio into fixed-size export frames and write them out
    /// as a stereo WAV.
    Export {
        /// Path to the audio file.
        input: PathBuf,
        /// Output WAV path.
        output: PathBuf,
        /// Export start time in seconds.
        #[arg(short, long, default_value_t = 0.0)]
        start: f32,
        /// Samples per export frame.
        #[arg(short, long, default_value_t = 1152)]
        window: usize,
    },
}
