use realfft::RealFftPlanner;
use serde::Serialize;

use crate::error::{FlightError, Result};

/// Single-sided amplitude spectrum of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumResult {
    /// Bin frequencies in Hz, `k * fs / n` for `k` in `[0, n/2)`.
    pub frequencies: Vec<f64>,
    /// `(2/n) * |X[k]|` for the same bins.
    pub magnitudes: Vec<f64>,
    pub dominant_frequency: f64,
    /// Samples that went into the transform after dropping missing values.
    pub sample_count: usize,
    pub sampling_rate_hz: f64,
}

impl SpectrumResult {
    /// Width of one frequency bin in Hz.
    pub fn resolution_hz(&self) -> f64 {
        self.sampling_rate_hz / self.sample_count as f64
    }

    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
    }
}

/// Transform the present samples of a channel.
///
/// Missing values are removed, not interpolated, so `n` is the count of
/// present values.
pub fn analyze(samples: &[Option<f64>], sampling_rate_hz: f64) -> Result<SpectrumResult> {
    if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
        return Err(FlightError::InvalidSamplingRate(sampling_rate_hz));
    }
    let mut input: Vec<f64> = samples.iter().filter_map(|v| *v).collect();
    let n = input.len();
    if n < 2 {
        return Err(FlightError::InsufficientSamples { found: n });
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let mut output = r2c.make_output_vec();
    r2c.process(&mut input, &mut output)
        .map_err(|e| FlightError::Transform(e.to_string()))?;

    let half = n / 2;
    let scale = 2.0 / n as f64;
    let frequencies: Vec<f64> = (0..half)
        .map(|k| k as f64 * sampling_rate_hz / n as f64)
        .collect();
    let magnitudes: Vec<f64> = output[..half].iter().map(|c| scale * c.norm()).collect();

    // First maximum wins on ties.
    let peak = magnitudes
        .iter()
        .enumerate()
        .fold(0, |best, (k, m)| if *m > magnitudes[best] { k } else { best });

    Ok(SpectrumResult {
        dominant_frequency: frequencies[peak],
        frequencies,
        magnitudes,
        sample_count: n,
        sampling_rate_hz,
    })
}
