//! Gap filling ahead of filtering.
//!
//! The decomposition filter is non-causal, so a single missing sample would
//! poison every output sample within reach of the kernel. Interior gaps are
//! bridged linearly; leading and trailing gaps have nothing to anchor to and
//! are left missing.

use super::model::{Sample, Trace, ValidityMask};

/// Fill interior gaps of `trace` and return the mask of the input.
///
/// Interpolation runs along the sample index `n`, separately for `x` and `y`.
/// The mask is the one that has to be restored after filtering.
pub fn interpolate(trace: &Trace) -> (Trace, ValidityMask) {
    let mask = trace.mask();

    let ns: Vec<i64> = trace.samples.iter().map(|s| s.n).collect();
    let xs: Vec<Option<f64>> = trace.samples.iter().map(|s| s.x).collect();
    let ys: Vec<Option<f64>> = trace.samples.iter().map(|s| s.y).collect();

    let xs = fill_interior(&ns, &xs);
    let ys = fill_interior(&ns, &ys);

    let samples = ns
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(&n, (x, y))| Sample { n, x, y })
        .collect();

    (trace.with_samples(samples), mask)
}

/// Linear interpolation over every run of `None` that has a value on both sides.
fn fill_interior(ns: &[i64], values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut last_valid: Option<usize> = None;

    for (i, v) in values.iter().enumerate() {
        let Some(right) = *v else { continue };
        if let Some(a) = last_valid {
            if i > a + 1 {
                // `values[a]` is Some by construction of `last_valid`
                let left = values[a].unwrap_or(right);
                // i64 differences overflow for indices near the ends of the range
                let origin = ns[a] as f64;
                let span = ns[i] as f64 - origin;
                for j in a + 1..i {
                    out[j] = Some(left + (right - left) * (ns[j] as f64 - origin) / span);
                }
            }
        }
        last_valid = Some(i);
    }
    out
}

/// Number of samples that are still missing after [`interpolate`], i.e. the
/// leading and trailing runs.
pub fn unfilled_edges(trace: &Trace) -> (usize, usize) {
    let lead = trace.samples.iter().take_while(|s| !s.is_valid()).count();
    if lead == trace.len() {
        return (lead, 0);
    }
    let trail = trace.samples.iter().rev().take_while(|s| !s.is_valid()).count();
    (lead, trail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_x(xs: &[Option<f64>]) -> Trace {
        let samples = xs
            .iter()
            .enumerate()
            .map(|(i, x)| Sample {
                n: i as i64,
                x: *x,
                y: x.map(|_| 0.0),
            })
            .collect();
        Trace::new("gaps", samples)
    }

    #[test]
    fn fills_single_interior_gap() {
        let (filled, mask) = interpolate(&trace_x(&[Some(1.0), None, Some(3.0)]));
        assert_eq!(filled.samples[1].x, Some(2.0));
        assert_eq!(filled.samples[1].y, Some(0.0));
        assert_eq!(mask, ValidityMask::from(vec![true, false, true]));
    }

    #[test]
    fn leaves_leading_and_trailing_gaps() {
        let (filled, mask) = interpolate(&trace_x(&[None, Some(2.0), Some(3.0), None, None]));
        assert_eq!(filled.samples[0].x, None);
        assert_eq!(filled.samples[3].x, None);
        assert_eq!(filled.samples[4].x, None);
        assert_eq!(mask.valid_count(), 2);
        assert_eq!(unfilled_edges(&filled), (1, 2));
    }

    #[test]
    fn fills_long_runs_linearly() {
        let (filled, _) = interpolate(&trace_x(&[Some(0.0), None, None, None, Some(8.0)]));
        let xs: Vec<f64> = filled.samples.iter().map(|s| s.x.unwrap()).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn interpolates_along_sample_index() {
        let mut t = trace_x(&[Some(0.0), None, Some(9.0)]);
        t.samples[0].n = 100;
        t.samples[1].n = 101;
        t.samples[2].n = 103;
        let (filled, _) = interpolate(&t);
        assert_eq!(filled.samples[1].x, Some(3.0));
    }

    #[test]
    fn extreme_indices_do_not_overflow() {
        let mut t = trace_x(&[Some(0.0), None, Some(8.0)]);
        t.samples[0].n = -9_223_372_036_854_775_800;
        t.samples[1].n = 0;
        t.samples[2].n = 9_223_372_036_854_775_800;
        let (filled, _) = interpolate(&t);
        assert_eq!(filled.samples[1].x, Some(4.0));
        assert_eq!(filled.samples[1].y, Some(0.0));
    }

    #[test]
    fn coordinates_are_filled_independently() {
        let mut t = trace_x(&[Some(0.0), Some(1.0), Some(4.0)]);
        t.samples[1].y = None;
        t.samples[2].y = Some(2.0);
        let (filled, mask) = interpolate(&t);
        assert_eq!(filled.samples[1].x, Some(1.0));
        assert_eq!(filled.samples[1].y, Some(1.0));
        assert_eq!(mask.get(1), Some(false));
    }

    #[test]
    fn all_missing_stays_missing() {
        let (filled, mask) = interpolate(&trace_x(&[None, None]));
        assert_eq!(filled.missing_count(), 2);
        assert_eq!(mask.valid_count(), 0);
        assert_eq!(unfilled_edges(&filled), (2, 0));
    }
}
