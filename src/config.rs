use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// EyeLink 1000 recording rate.
pub const SAMPLING_RATE_HZ: f64 = 1000.0;
pub const TAP_COUNT: usize = 79;
pub const CUTOFF_HZ: f64 = 84.0;

/// Decimal digits kept in every written coordinate.
pub const PRECISION: u32 = 4;

/// Screen extent in degrees of visual angle.
pub const X_MIN: f64 = -23.3;
pub const X_MAX: f64 = 23.3;
pub const Y_MIN: f64 = -18.5;
pub const Y_MAX: f64 = 11.7;

pub const MISSING_TOKEN: &str = "NaN";

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Rectangle outside of which a gaze sample is considered invalid.
/// The edges themselves are inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x_min: X_MIN,
            x_max: X_MAX,
            y_min: Y_MIN,
            y_max: Y_MAX,
        }
    }
}

impl Bounds {
    /// NaN is never contained.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

// ---------------------------------------------------------------------------
// Filter parameters
// ---------------------------------------------------------------------------

/// Parameters shared by both decomposition bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub sampling_rate_hz: f64,
    pub tap_count: usize,
    pub cutoff_hz: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            sampling_rate_hz: SAMPLING_RATE_HZ,
            tap_count: TAP_COUNT,
            cutoff_hz: CUTOFF_HZ,
        }
    }
}

impl FilterParams {
    pub fn nyquist_hz(&self) -> f64 {
        0.5 * self.sampling_rate_hz
    }

    /// Cutoff as a fraction of Nyquist, in (0, 1).
    pub fn normalized_cutoff(&self) -> f64 {
        self.cutoff_hz / self.nyquist_hz()
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Everything a batch run needs besides the file lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub bounds: Bounds,
    pub filter: FilterParams,
    /// Decimal digits kept in every written coordinate.
    pub precision: u32,
    /// Literal written (and accepted) in place of a missing coordinate.
    pub missing_token: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            filter: FilterParams::default(),
            precision: PRECISION,
            missing_token: MISSING_TOKEN.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let b = &self.bounds;
        if !(b.x_min < b.x_max && b.y_min < b.y_max) {
            return Err(Error::Config(format!(
                "bounds are empty: x [{}, {}], y [{}, {}]",
                b.x_min, b.x_max, b.y_min, b.y_max
            )));
        }

        let f = &self.filter;
        if !(f.sampling_rate_hz.is_finite() && f.sampling_rate_hz > 0.0) {
            return Err(Error::Config(format!(
                "sampling rate must be positive, got {}",
                f.sampling_rate_hz
            )));
        }
        let wc = f.normalized_cutoff();
        if !(wc > 0.0 && wc < 1.0) {
            return Err(Error::Config(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                f.cutoff_hz,
                f.nyquist_hz()
            )));
        }
        // A highpass needs a type I filter (non-zero gain at Nyquist).
        if f.tap_count == 0 || f.tap_count % 2 == 0 {
            return Err(Error::Config(format!(
                "tap count must be odd, got {}",
                f.tap_count
            )));
        }

        if self.precision > 12 {
            return Err(Error::Config(format!(
                "precision of {} digits is beyond f64 resolution",
                self.precision
            )));
        }
        if self.missing_token.is_empty() || self.missing_token.contains(',') {
            return Err(Error::Config(format!(
                "missing token {:?} cannot be written as a CSV field",
                self.missing_token
            )));
        }
        Ok(())
    }
}

/// Round half to even at `digits` decimals, matching NumPy's `round`.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    (value * scale).round_ties_even() / scale
}
