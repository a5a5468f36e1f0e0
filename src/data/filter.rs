use crate::config::{round_to, Bounds};

use super::model::{Sample, Trace};

// ---------------------------------------------------------------------------
// Boundary predicate: which samples survive cleaning
// ---------------------------------------------------------------------------

/// Drop gaze samples that fall outside `bounds` and round the rest.
///
/// A sample is kept when:
/// * Both coordinates are present → otherwise it becomes fully missing
/// * `x` lies in `[x_min, x_max]` and `y` in `[y_min, y_max]` (edges included)
///
/// Kept samples have both coordinates rounded to `precision` decimals.
/// Length, order and indices are never changed.
pub fn clean(trace: &Trace, bounds: &Bounds, precision: u32) -> Trace {
    let samples = trace
        .samples
        .iter()
        .map(|s| match (s.x, s.y) {
            (Some(x), Some(y)) if bounds.contains(x, y) => Sample::new(
                s.n,
                round_to(x, precision),
                round_to(y, precision),
            ),
            // Out of bounds, or half missing → both coordinates go
            _ => Sample::missing(s.n),
        })
        .collect();
    trace.with_samples(samples)
}

/// Indices rejected by [`clean`] that were present on input.
pub fn rejected_indices(trace: &Trace, bounds: &Bounds) -> Vec<usize> {
    trace
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| match (s.x, s.y) {
            (Some(x), Some(y)) => !bounds.contains(x, y),
            (None, None) => false,
            _ => true,
        })
        .map(|(i, _)| i)
        .collect()
}
