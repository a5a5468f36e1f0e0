use crate::config::round_to;
use crate::error::{Error, Result};

use super::model::{Sample, Trace, ValidityMask};

/// Put the missing samples back after filtering.
///
/// Every index where `mask` is `false` loses both coordinates; every other
/// coordinate is rounded to `precision` decimals. Interpolated filler never
/// survives this step.
pub fn reapply_mask(filtered: &Trace, mask: &ValidityMask, precision: u32) -> Result<Trace> {
    if mask.len() != filtered.len() {
        return Err(Error::LengthMismatch {
            trace: filtered.id.clone(),
            mask: mask.len(),
            samples: filtered.len(),
        });
    }

    let samples = filtered
        .samples
        .iter()
        .zip(mask.iter())
        .enumerate()
        .map(|(index, (s, valid))| match (valid, s.x, s.y) {
            (true, Some(x), Some(y)) => Ok(Sample::new(
                s.n,
                round_to(x, precision),
                round_to(y, precision),
            )),
            (true, _, _) => Err(Error::Precondition {
                trace: filtered.id.clone(),
                index,
                n: s.n,
                what: "missing where the mask expects a value",
            }),
            (false, _, _) => Ok(Sample::missing(s.n)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(filtered.with_samples(samples))
}
