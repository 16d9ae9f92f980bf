use std::{fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{EngineError, Result};

/// Fixed-size forward real-FFT wrapper shared by the analysis provider.
///
/// Each engine instance owns its own `SpectralTransform`; there is no
/// process-wide transform state. The input, scratch and spectrum buffers are
/// owned by the planned state and reused on every call, so nothing has to be
/// freed manually on either the success or the error path.
pub struct SpectralTransform {
    planner: RealFftPlanner<f32>,
    planned: Option<PlannedFft>,
}

struct PlannedFft {
    window_size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
}

impl SpectralTransform {
    /// Creates an unconfigured transform. [`configure`](Self::configure) must
    /// run before the first [`transform`](Self::transform) call.
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            planned: None,
        }
    }

    /// Plans (or re-plans) the forward FFT for `window_size` samples.
    ///
    /// Safe to call repeatedly with different sizes; a size equal to the
    /// current one is a no-op. Fails with [`EngineError::Initialization`]
    /// when the size cannot back a real transform.
    pub fn configure(&mut self, window_size: usize) -> Result<()> {
        if window_size < 2 || window_size % 2 != 0 {
            return Err(EngineError::Initialization(format!(
                "window size {window_size} is not a valid real-FFT length"
            )));
        }

        if self
            .planned
            .as_ref()
            .map(|p| p.window_size == window_size)
            .unwrap_or(false)
        {
            return Ok(());
        }

        let plan = self.planner.plan_fft_forward(window_size);
        let input = plan.make_input_vec();
        let scratch = plan.make_scratch_vec();
        let spectrum = plan.make_output_vec();
        self.planned = Some(PlannedFft {
            window_size,
            plan,
            input,
            scratch,
            spectrum,
        });
        Ok(())
    }

    /// Window size of the current plan, if configured.
    pub fn window_size(&self) -> Option<usize> {
        self.planned.as_ref().map(|p| p.window_size)
    }

    /// Transforms one window of time-domain samples into frequency
    /// magnitudes of length `window_size / 2`.
    ///
    /// Fails fast with [`EngineError::NotConfigured`] before the first
    /// `configure`, and with [`EngineError::SizeMismatch`] when the block
    /// length disagrees with the plan. Neither condition silently yields
    /// zeroed bins.
    pub fn transform(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let planned = self.planned.as_mut().ok_or(EngineError::NotConfigured)?;
        if samples.len() != planned.window_size {
            return Err(EngineError::SizeMismatch {
                expected: planned.window_size,
                actual: samples.len(),
            });
        }

        planned.input.copy_from_slice(samples);
        planned.plan.process_with_scratch(
            &mut planned.input,
            &mut planned.spectrum,
            &mut planned.scratch,
        )?;

        let bins = planned.window_size / 2;
        Ok(planned.spectrum[..bins].iter().map(|c| c.norm()).collect())
    }
}

impl Default for SpectralTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("window_size", &self.window_size())
            .finish()
    }
}
