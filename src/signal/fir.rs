//! Windowed-sinc FIR design and zero-phase application.

use std::f64::consts::PI;

use crate::config::FilterParams;
use crate::data::model::Band;
use crate::error::{Error, Result};

/// Linear-phase FIR filter with Hamming-windowed sinc taps.
#[derive(Debug, Clone, PartialEq)]
pub struct FirFilter {
    band: Band,
    taps: Vec<f64>,
}

impl FirFilter {
    /// Design the filter for `band` from the shared parameters.
    pub fn design(params: &FilterParams, band: Band) -> Result<Self> {
        let num_taps = params.tap_count;
        let cutoff = params.normalized_cutoff();

        if !(cutoff > 0.0 && cutoff < 1.0) {
            return Err(Error::Config(format!(
                "normalized cutoff must be in (0, 1), got {cutoff}"
            )));
        }
        if num_taps % 2 == 0 {
            // Even length forces a zero at Nyquist, which a highpass cannot have;
            // keep both bands on the same length.
            return Err(Error::Config(format!(
                "tap count must be odd, got {num_taps}"
            )));
        }

        let taps = match band {
            Band::Low => Self::lowpass_taps(num_taps, cutoff),
            Band::High => Self::highpass_taps(num_taps, cutoff),
        };
        Ok(Self { band, taps })
    }

    /// Ideal lowpass `[0, wc]`, windowed, scaled to unit gain at DC.
    fn lowpass_taps(num_taps: usize, wc: f64) -> Vec<f64> {
        let h: Vec<f64> = centered(num_taps)
            .zip(hamming(num_taps))
            .map(|(m, w)| wc * sinc(wc * m) * w)
            .collect();
        let gain: f64 = h.iter().sum();
        h.into_iter().map(|v| v / gain).collect()
    }

    /// Ideal highpass `[wc, 1]`, windowed, scaled to unit gain at Nyquist.
    fn highpass_taps(num_taps: usize, wc: f64) -> Vec<f64> {
        let h: Vec<f64> = centered(num_taps)
            .zip(hamming(num_taps))
            .map(|(m, w)| (sinc(m) - wc * sinc(wc * m)) * w)
            .collect();
        let gain: f64 = centered(num_taps)
            .zip(&h)
            .map(|(m, v)| v * (PI * m).cos())
            .sum();
        h.into_iter().map(|v| v / gain).collect()
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Samples of odd extension added at each end of a signal of length `len`.
    pub fn pad_len(&self, len: usize) -> usize {
        (3 * self.taps.len()).min(len.saturating_sub(1))
    }

    /// Single-pass magnitude response at `freq`, a fraction of Nyquist.
    pub fn magnitude_at(&self, freq: f64) -> f64 {
        let omega = PI * freq;
        let (re, im) = self
            .taps
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(re, im), (k, &b)| {
                let phase = omega * k as f64;
                (re + b * phase.cos(), im - b * phase.sin())
            });
        re.hypot(im)
    }

    /// Causal pass. The input is taken to have held its first value forever,
    /// which is the steady state of the filter for that value.
    fn filter_steady(&self, signal: &[f64]) -> Vec<f64> {
        (0..signal.len())
            .map(|n| {
                self.taps
                    .iter()
                    .enumerate()
                    .map(|(k, &b)| b * signal[n.saturating_sub(k)])
                    .sum::<f64>()
            })
            .collect()
    }

    /// Forward-backward filtering with odd extension at both ends.
    ///
    /// The output has the same length as `signal`, no delay, and the squared
    /// magnitude response of a single pass. `signal` must be finite.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        if signal.is_empty() {
            return Vec::new();
        }
        let pad = self.pad_len(signal.len());
        let extended = odd_extend(signal, pad);

        let mut y = self.filter_steady(&extended);
        y.reverse();
        let mut y = self.filter_steady(&y);
        y.reverse();

        y.drain(..pad);
        y.truncate(signal.len());
        y
    }
}

/// Point reflection of `pad` samples about each end.
fn odd_extend(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    out.extend_from_slice(signal);
    out.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    out
}

/// Tap positions relative to the filter centre.
fn centered(num_taps: usize) -> impl Iterator<Item = f64> {
    let alpha = 0.5 * (num_taps as f64 - 1.0);
    (0..num_taps).map(move |i| i as f64 - alpha)
}

/// Symmetric Hamming window.
fn hamming(num_taps: usize) -> impl Iterator<Item = f64> {
    let denom = (num_taps.max(2) - 1) as f64;
    (0..num_taps).map(move |i| {
        if num_taps == 1 {
            1.0
        } else {
            0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos()
        }
    })
}

/// Normalized sinc, `sin(pi x) / (pi x)`.
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}
