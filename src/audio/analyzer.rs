// src/audio/analyzer.rs
//! Windowed real-to-complex FFT over a ring buffer snapshot.

use std::f64::consts::PI;
use std::sync::Arc;

use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};
use tracing::warn;

use super::buffer::RingBuffer;
use crate::error::{Result, VizError};

/// Blackman coefficients normalized to a leading term of one.
const BLACKMAN_A1: f64 = 4620.0 / 3969.0;
const BLACKMAN_A2: f64 = 715.0 / 3969.0;

/// Floor applied before taking the logarithm of a bin magnitude.
const MIN_MAGNITUDE: f32 = 1e-10;

/// Planned transform together with the arrays it runs on.
///
/// The group is built and dropped as a unit; a new FFT length means a new
/// `FftPlan`, never a resized one.
struct FftPlan {
    r2c: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPlan {
    fn new(size: usize) -> Self {
        let r2c = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Self {
            input: r2c.make_input_vec(),
            output: r2c.make_output_vec(),
            scratch: r2c.make_scratch_vec(),
            r2c,
        }
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn execute(&mut self) {
        if let Err(e) =
            self.r2c
                .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
        {
            // Only reachable on a length mismatch, which the plan rules out.
            warn!("FFT execution failed: {e}");
            self.output.fill(Complex::new(0.0, 0.0));
        }
    }
}

/// Spectrum of one audio channel.
pub struct SpectralAnalyzer {
    plan: FftPlan,
    /// Coefficients for the last window length; empty until first use
    window: Vec<f32>,
    /// Set when the window must be rebuilt even if its length still matches
    window_stale: bool,
    transforms: u64,
}

impl SpectralAnalyzer {
    /// Plan a transform of `fft_size` samples.
    pub fn new(fft_size: usize) -> Result<Self> {
        check_size(fft_size)?;
        Ok(Self {
            plan: FftPlan::new(fft_size),
            window: Vec::new(),
            window_stale: true,
            transforms: 0,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.plan.len()
    }

    /// Number of complex bins, `fft_size / 2 + 1`.
    pub fn output_size(&self) -> usize {
        self.plan.output.len()
    }

    /// Length of the window applied by the last `calculate`.
    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// How many transforms have run since creation.
    pub fn transform_count(&self) -> u64 {
        self.transforms
    }

    /// Complex bins of the last transform.
    pub fn output(&self) -> &[Complex<f32>] {
        &self.plan.output
    }

    /// Replan for a new FFT length. Unchanged lengths keep the current plan.
    pub fn resize(&mut self, fft_size: usize) -> Result<()> {
        check_size(fft_size)?;
        if fft_size != self.plan.len() {
            self.plan = FftPlan::new(fft_size);
            self.window_stale = true;
        }
        Ok(())
    }

    /// Transform the newest samples of `buffer` if it changed since the last call.
    ///
    /// Only the windowed copy happens under the buffer lock; the FFT itself
    /// runs after the lock is released. Returns whether a transform ran.
    pub fn calculate(&mut self, buffer: &RingBuffer) -> bool {
        {
            let mut guard = buffer.acquire_lock();
            if !guard.is_dirty() {
                return false;
            }

            let samples = guard.samples();
            let window_size = self.plan.len().min(samples.len());
            self.ensure_window(window_size);

            let recent = &samples[samples.len() - window_size..];
            for ((slot, &sample), &w) in self.plan.input.iter_mut().zip(recent).zip(&self.window) {
                *slot = sample as f32 * w;
            }
            self.plan.input[window_size..].fill(0.0);

            guard.clear_dirty();
        }

        self.plan.execute();
        self.transforms += 1;
        true
    }

    /// Bin levels in dB relative to a full-scale sine of `max_amplitude`.
    pub fn magnitudes(&self, max_amplitude: f32) -> Vec<f32> {
        // Window gain correction: half the window length plus one.
        let effective = (self.window.len() / 2 + 1) as f32;
        let scale = 1.0 / (effective * max_amplitude);
        self.plan
            .output
            .iter()
            .map(|bin| 20.0 * (bin.norm() * scale).max(MIN_MAGNITUDE).log10())
            .collect()
    }

    /// Index of the strongest bin in `[start, stop)`.
    ///
    /// Both bounds are clamped to the output; an empty range yields `stop`.
    pub fn max_bin(&self, start: usize, stop: usize) -> usize {
        let bins = self.output_size();
        let stop = stop.min(bins);
        let start = start.min(bins);
        if start >= stop {
            return stop;
        }

        let mut best = start;
        let mut best_power = f32::NEG_INFINITY;
        for (i, bin) in self.plan.output[start..stop].iter().enumerate() {
            let power = bin.norm_sqr();
            if power > best_power {
                best_power = power;
                best = start + i;
            }
        }
        best
    }

    fn ensure_window(&mut self, size: usize) {
        if self.window_stale || self.window.len() != size {
            self.window = blackman_window(size);
            self.window_stale = false;
        }
    }
}

fn check_size(fft_size: usize) -> Result<()> {
    if fft_size < 2 {
        return Err(VizError::InvalidFftSize(fft_size));
    }
    Ok(())
}

/// Exact Blackman window of `size` coefficients, scaled so the constant term is one.
pub fn blackman_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    let n_1 = 1.0 / (size as f64 - 1.0);
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f64 * n_1;
            (1.0 - BLACKMAN_A1 * x.cos() + BLACKMAN_A2 * (2.0 * x).cos()) as f32
        })
        .collect()
}

/// Center frequency of bin `index` in Hz.
pub fn bin_frequency(index: usize, sample_rate: u32, fft_size: usize) -> f32 {
    index as f32 * sample_rate as f32 / fft_size as f32
}

/// Contiguous run of bins covering a frequency sub-range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    /// First bin of the range
    pub data_offset: usize,
    /// Number of bins in the range
    pub output_size: usize,
}

impl BinRange {
    /// Bins spanning `[f_start, f_stop]` for a transform of `fft_size` samples.
    ///
    /// The range never reaches past the last bin, so
    /// `data_offset + output_size <= fft_size / 2 + 1`.
    pub fn from_frequencies(f_start: f32, f_stop: f32, sample_rate: u32, fft_size: usize) -> Self {
        let bins = fft_size / 2 + 1;
        let d_freq = sample_rate as f32 / fft_size as f32;

        let data_offset = ((f_start.max(0.0) / d_freq).floor() as usize).min(bins - 1);
        let end = (f_stop.max(0.0) / d_freq).ceil() as usize;
        let output_size = end.saturating_sub(data_offset).min(bins - data_offset);

        Self {
            data_offset,
            output_size,
        }
    }

    /// One past the last bin.
    pub fn end(&self) -> usize {
        self.data_offset + self.output_size
    }
}
