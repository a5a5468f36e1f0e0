//! # gaze-split
//!
//! Cleans eye-tracking gaze traces and splits each one into a low-frequency
//! "signal" and a high-frequency "noise" stream with a zero-phase FIR filter,
//! keeping missing samples exactly where they were.
//!
//! ## Per-trace stages
//!
//! 1. **Clean**: samples off the screen rectangle become missing ([`clean`])
//! 2. **Interpolate**: interior gaps are bridged so the filter can run ([`interpolate`])
//! 3. **Decompose**: 79-tap lowpass / highpass, forward and backward ([`decompose`])
//! 4. **Restore**: the original missing samples are put back ([`reapply_mask`])
//!
//! [`pipeline::Pipeline`] chains the four with one configuration, and
//! [`batch::BatchRunner`] maps it over a directory.

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod signal;

pub use config::{Bounds, FilterParams, PipelineConfig};
pub use data::model::{Band, DecomposedPair, Sample, Trace, ValidityMask};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, ProcessedTrace};

/// Mark samples outside `bounds` as missing and round the rest.
pub fn clean(trace: &Trace, bounds: &Bounds) -> Trace {
    data::filter::clean(trace, bounds, config::PRECISION)
}

/// Bridge interior gaps; returns the filled trace and the mask of the input.
pub fn interpolate(trace: &Trace) -> (Trace, ValidityMask) {
    data::gaps::interpolate(trace)
}

/// Zero-phase filter a gap-filled trace with the default filter parameters.
pub fn decompose(trace: &Trace, band: Band) -> Result<Trace> {
    signal::decompose::Decomposer::new(FilterParams::default())?.decompose(trace, band)
}

/// Restore the missing samples recorded in `mask` and round the rest.
pub fn reapply_mask(trace: &Trace, mask: &ValidityMask) -> Result<Trace> {
    data::mask::reapply_mask(trace, mask, config::PRECISION)
}
