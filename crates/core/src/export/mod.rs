use crate::asset::AudioAsset;

/// One fixed-size block of stereo samples handed to the encoder, one per
/// exported video frame.
#[derive(Debug, Clone)]
pub struct ExportFrame {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

/// Cursor over the decoded buffer that deals out contiguous, non-overlapping,
/// gapless fixed-size frames in playback order.
///
/// The cursor only ever moves forward one frame per [`next_frame`]
/// (Self::next_frame) call; [`set_start`](Self::set_start) is the single way
/// to reposition it. Ranges past the end of the buffer come back zero-padded,
/// so the sequencer can be driven an unbounded number of times.
#[derive(Debug)]
pub struct ExportSequencer {
    window_size: usize,
    frame_index: usize,
    warned_mono: bool,
}

impl ExportSequencer {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            frame_index: 0,
            warned_mono: false,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Frames emitted so far, or the index set by [`set_start`](Self::set_start).
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Repositions the cursor so the next frame starts at `time_seconds`:
    /// `frame_index = floor(t × sample_rate / window_size)`.
    ///
    /// The product is computed in `f64`: past a few hundred seconds at
    /// 48 kHz it exceeds `f32`'s exact-integer range and single-precision
    /// arithmetic lands the cursor a few samples off.
    pub fn set_start(&mut self, time_seconds: f32, sample_rate: u32) {
        self.frame_index = (time_seconds.max(0.0) as f64 * sample_rate as f64
            / self.window_size as f64)
            .floor() as usize;
    }

    /// Emits the next frame and advances the cursor.
    ///
    /// Mono sources have channel 0 duplicated into both output channels (the
    /// encoder always receives stereo); a warning is logged once per
    /// sequencer when that happens.
    pub fn next_frame(&mut self, asset: &AudioAsset) -> ExportFrame {
        let start = self.frame_index * self.window_size;
        let left = copy_padded(asset.channel(0), start, self.window_size);
        let right = if asset.channel_count() == 2 {
            copy_padded(asset.channel(1), start, self.window_size)
        } else {
            if !self.warned_mono {
                tracing::warn!("exporting a mono source; duplicating channel 0 into both channels");
                self.warned_mono = true;
            }
            left.clone()
        };

        self.frame_index += 1;
        ExportFrame {
            left,
            right,
            sample_rate: asset.sample_rate(),
        }
    }
}

/// Copies `window` samples starting at `start`, zero-filling whatever the
/// channel cannot supply.
fn copy_padded(channel: &[f32], start: usize, window: usize) -> Vec<f32> {
    let mut block = vec![0.0_f32; window];
    if start < channel.len() {
        let available = (channel.len() - start).min(window);
        block[..available].copy_from_slice(&channel[start..start + available]);
    }
    block
}
