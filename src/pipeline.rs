//! Per-trace processing: clean → interpolate → decompose → restore mask.
//!
//! Every step is a pure function of its input. A [`Pipeline`] only holds the
//! configuration and the two designed filters, so one instance can be shared
//! by every worker of a batch.

use crate::config::PipelineConfig;
use crate::data::filter;
use crate::data::gaps;
use crate::data::mask;
use crate::data::model::{Band, DecomposedPair, Trace};
use crate::error::Result;
use crate::signal::decompose::Decomposer;

/// Output of the full pipeline for one input trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTrace {
    pub cleaned: Trace,
    pub pair: DecomposedPair,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    decomposer: Decomposer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let decomposer = Decomposer::new(config.filter)?;
        Ok(Self { config, decomposer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// Boundary validation and rounding.
    pub fn clean(&self, raw: &Trace) -> Trace {
        if log::log_enabled!(log::Level::Debug) {
            let rejected = filter::rejected_indices(raw, &self.config.bounds);
            if let Some(first) = rejected.first() {
                log::debug!(
                    "{}: {} samples off screen or half missing, first at index {first}",
                    raw.id,
                    rejected.len()
                );
            }
        }
        let cleaned = filter::clean(raw, &self.config.bounds, self.config.precision);
        log::debug!(
            "{}: {} of {} samples missing after cleaning",
            cleaned.id,
            cleaned.missing_count(),
            cleaned.len()
        );
        cleaned
    }

    /// Split an already cleaned trace into its signal and noise streams.
    ///
    /// Both bands are filtered from the same gap-filled trace and both get
    /// the mask of `cleaned` back.
    pub fn split(&self, cleaned: &Trace) -> Result<DecomposedPair> {
        let (filled, validity) = gaps::interpolate(cleaned);
        let (lead, trail) = gaps::unfilled_edges(&filled);
        if lead + trail > 0 {
            log::debug!(
                "{}: {lead} leading and {trail} trailing samples cannot be interpolated",
                cleaned.id
            );
        }

        let filter_band = |band: Band| -> Result<Trace> {
            let filtered = self.decomposer.decompose(&filled, band)?;
            mask::reapply_mask(&filtered, &validity, self.config.precision)
        };
        let pair = DecomposedPair {
            signal: filter_band(Band::Low)?,
            noise: filter_band(Band::High)?,
        };
        debug_assert_eq!(pair.signal.mask(), validity);
        debug_assert_eq!(pair.noise.mask(), validity);
        Ok(pair)
    }

    /// Clean, then split.
    pub fn process(&self, raw: &Trace) -> Result<ProcessedTrace> {
        let cleaned = self.clean(raw);
        let pair = self.split(&cleaned)?;
        Ok(ProcessedTrace { cleaned, pair })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Sample, ValidityMask};
    use approx::assert_abs_diff_eq;

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default()).unwrap()
    }

    #[test]
    fn off_screen_sample_is_bridged_then_removed() {
        let raw = Trace::new(
            "scenario",
            (0..5)
                .map(|n| Sample::new(n, if n == 2 { 30.0 } else { 0.0 }, 0.0))
                .collect(),
        );
        let p = pipeline();
        let processed = p.process(&raw).unwrap();

        assert_eq!(processed.cleaned.samples[2], Sample::missing(2));
        let (filled, _) = gaps::interpolate(&processed.cleaned);
        assert_eq!(filled.samples[2], Sample::new(2, 0.0, 0.0));

        let expected = ValidityMask::from(vec![true, true, false, true, true]);
        assert_eq!(processed.cleaned.mask(), expected);
        for band in Band::ALL {
            let out = processed.pair.band(band);
            assert_eq!(out.len(), 5);
            assert_eq!(out.mask(), expected);
            assert_eq!(out.samples[2], Sample::missing(2));
            for s in out.samples.iter().filter(|s| s.is_valid()) {
                assert_abs_diff_eq!(s.x.unwrap(), 0.0, epsilon = 1e-12);
                assert_abs_diff_eq!(s.y.unwrap(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn cleaning_blanks_exactly_the_rejected_samples() {
        let mut raw = Trace::new(
            "rejects",
            (0..8).map(|n| Sample::new(n, n as f64, -1.0)).collect(),
        );
        raw.samples[1] = Sample::missing(1);
        raw.samples[3].x = Some(-23.5);
        raw.samples[5].y = None;
        raw.samples[6].y = Some(11.7);

        let p = pipeline();
        let rejected = filter::rejected_indices(&raw, &p.config().bounds);
        assert_eq!(rejected, vec![3, 5]);

        let cleaned = p.clean(&raw);
        let missing: Vec<usize> = (0..cleaned.len())
            .filter(|&i| !cleaned.samples[i].is_valid())
            .collect();
        assert_eq!(missing, vec![1, 3, 5]);
        assert_eq!(cleaned.samples[6], Sample::new(6, 6.0, 11.7));
    }

    #[test]
    fn masks_agree_across_outputs_with_edge_gaps() {
        let mut samples: Vec<Sample> = (0..600)
            .map(|n| {
                let t = n as f64 / 1000.0;
                Sample::new(n, 10.0 * (6.0 * t).sin(), 3.0 * (4.0 * t).cos())
            })
            .collect();
        for i in (0..5).chain(100..130).chain(590..600) {
            samples[i] = Sample::missing(i as i64);
        }
        samples[300].x = Some(40.0);

        let processed = pipeline().process(&Trace::new("gappy", samples)).unwrap();
        let mask = processed.cleaned.mask();
        assert_eq!(mask.valid_count(), 600 - 5 - 30 - 10 - 1);
        assert_eq!(processed.pair.signal.mask(), mask);
        assert_eq!(processed.pair.noise.mask(), mask);
        assert_eq!(processed.pair.signal.len(), 600);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = PipelineConfig::default();
        config.filter.tap_count = 4;
        assert!(Pipeline::new(config).is_err());
    }
}
