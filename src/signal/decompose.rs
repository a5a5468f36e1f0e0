use crate::config::FilterParams;
use crate::data::model::{Band, Sample, Trace};
use crate::error::{Error, Result};

use super::fir::FirFilter;

/// Splits gap-filled traces into a lowpass and a highpass stream.
///
/// Both filters are designed once and can be shared between worker threads.
#[derive(Debug, Clone)]
pub struct Decomposer {
    params: FilterParams,
    lowpass: FirFilter,
    highpass: FirFilter,
}

impl Decomposer {
    pub fn new(params: FilterParams) -> Result<Self> {
        Ok(Self {
            lowpass: FirFilter::design(&params, Band::Low)?,
            highpass: FirFilter::design(&params, Band::High)?,
            params,
        })
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn filter(&self, band: Band) -> &FirFilter {
        match band {
            Band::Low => &self.lowpass,
            Band::High => &self.highpass,
        }
    }

    /// Zero-phase filter `trace` in one band.
    ///
    /// Filtering covers the span from the first to the last valid sample;
    /// anything outside it is left missing. Inside the span every sample
    /// must carry two finite coordinates, otherwise the trace is rejected
    /// before a single value is filtered.
    pub fn decompose(&self, trace: &Trace, band: Band) -> Result<Trace> {
        let Some((first, last)) = filtered_span(trace) else {
            log::debug!("{}: no valid samples, nothing to {band}", trace.id);
            return Ok(trace.with_samples(
                trace.samples.iter().map(|s| Sample::missing(s.n)).collect(),
            ));
        };

        let span = &trace.samples[first..=last];
        let mut xs = Vec::with_capacity(span.len());
        let mut ys = Vec::with_capacity(span.len());
        for (offset, s) in span.iter().enumerate() {
            let (x, y) = finite_pair(trace, first + offset, s)?;
            xs.push(x);
            ys.push(y);
        }

        let filter = self.filter(band);
        let xs = filter.filtfilt(&xs);
        let ys = filter.filtfilt(&ys);

        let samples = trace
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if (first..=last).contains(&i) {
                    Sample::new(s.n, xs[i - first], ys[i - first])
                } else {
                    Sample::missing(s.n)
                }
            })
            .collect();
        Ok(trace.with_samples(samples))
    }
}

/// Indices of the first and last valid samples.
pub fn filtered_span(trace: &Trace) -> Option<(usize, usize)> {
    let first = trace.samples.iter().position(Sample::is_valid)?;
    let last = trace.samples.iter().rposition(Sample::is_valid)?;
    Some((first, last))
}

fn finite_pair(trace: &Trace, index: usize, s: &Sample) -> Result<(f64, f64)> {
    let violation = |what| Error::Precondition {
        trace: trace.id.clone(),
        index,
        n: s.n,
        what,
    };
    match (s.x, s.y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok((x, y)),
        (Some(_), Some(_)) => Err(violation("non-finite")),
        _ => Err(violation("missing inside the filtered span")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn decomposer() -> Decomposer {
        Decomposer::new(FilterParams::default()).unwrap()
    }

    fn sine_trace(len: usize, freq_hz: f64) -> Trace {
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / 1000.0;
                let phase = 2.0 * PI * freq_hz * t;
                Sample::new(i as i64, 5.0 * phase.sin(), 2.0 * phase.cos())
            })
            .collect();
        Trace::new("sine", samples)
    }

    #[test]
    fn slow_sine_survives_lowpass_and_vanishes_in_highpass() {
        let trace = sine_trace(2000, 5.0);
        let d = decomposer();
        let low = d.decompose(&trace, Band::Low).unwrap();
        let high = d.decompose(&trace, Band::High).unwrap();
        assert_eq!(low.len(), trace.len());
        assert_eq!(high.len(), trace.len());

        for i in 200..1800 {
            let (x, y) = (trace.samples[i].x.unwrap(), trace.samples[i].y.unwrap());
            // passband ripple of the squared response stays under 0.2 %
            assert_abs_diff_eq!(low.samples[i].x.unwrap(), x, epsilon = 1e-2);
            assert_abs_diff_eq!(low.samples[i].y.unwrap(), y, epsilon = 1e-2);
            assert!(high.samples[i].x.unwrap().abs() < 1e-2);
            assert!(high.samples[i].y.unwrap().abs() < 1e-2);
        }
    }

    #[test]
    fn impulse_stays_at_its_index() {
        let samples = (0..801)
            .map(|i| Sample::new(i, if i == 400 { 1.0 } else { 0.0 }, 0.0))
            .collect();
        let trace = Trace::new("impulse", samples);
        let low = decomposer().decompose(&trace, Band::Low).unwrap();
        let xs: Vec<f64> = low.samples.iter().map(|s| s.x.unwrap()).collect();
        let peak = xs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(400));
        for j in 1..150 {
            assert_abs_diff_eq!(xs[400 + j], xs[400 - j], epsilon = 1e-12);
        }
    }

    #[test]
    fn edges_outside_span_stay_missing() {
        let mut trace = sine_trace(50, 5.0);
        trace.samples[0] = Sample::missing(0);
        trace.samples[49] = Sample::missing(49);
        let low = decomposer().decompose(&trace, Band::Low).unwrap();
        assert_eq!(low.samples[0], Sample::missing(0));
        assert_eq!(low.samples[49], Sample::missing(49));
        assert!(low.samples[1..49].iter().all(Sample::is_valid));
    }

    #[test]
    fn interior_hole_is_a_precondition_violation() {
        let mut trace = sine_trace(50, 5.0);
        trace.samples[10] = Sample::missing(10);
        let err = decomposer().decompose(&trace, Band::High).unwrap_err();
        assert!(matches!(err, Error::Precondition { index: 10, n: 10, .. }));
    }

    #[test]
    fn non_finite_value_is_a_precondition_violation() {
        let mut trace = sine_trace(50, 5.0);
        trace.samples[20].y = Some(f64::NAN);
        let err = decomposer().decompose(&trace, Band::Low).unwrap_err();
        assert!(matches!(err, Error::Precondition { index: 20, what: "non-finite", .. }));
    }

    #[test]
    fn empty_and_all_missing_traces() {
        let d = decomposer();
        let empty = Trace::new("empty", Vec::new());
        assert!(d.decompose(&empty, Band::Low).unwrap().is_empty());

        let blank = Trace::new("blank", vec![Sample::missing(0), Sample::missing(1)]);
        let out = d.decompose(&blank, Band::High).unwrap();
        assert_eq!(out.missing_count(), 2);
    }
}
