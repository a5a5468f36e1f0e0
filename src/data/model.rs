use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sample – one row of a trace file
// ---------------------------------------------------------------------------

/// A single gaze observation. `None` marks a missing coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Sample index (1 kHz ticks).
    pub n: i64,
    /// Horizontal gaze position in degrees.
    pub x: Option<f64>,
    /// Vertical gaze position in degrees.
    pub y: Option<f64>,
}

impl Sample {
    pub fn new(n: i64, x: f64, y: f64) -> Self {
        Self {
            n,
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn missing(n: i64) -> Self {
        Self { n, x: None, y: None }
    }

    /// Both coordinates present.
    pub fn is_valid(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }

    /// Exactly one coordinate present.
    pub fn is_half_missing(&self) -> bool {
        self.x.is_some() != self.y.is_some()
    }
}

// ---------------------------------------------------------------------------
// ValidityMask
// ---------------------------------------------------------------------------

/// `true` where a sample carries both coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidityMask(Vec<bool>);

impl ValidityMask {
    pub fn of(trace: &Trace) -> Self {
        ValidityMask(trace.samples.iter().map(Sample::is_valid).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<bool> {
        self.0.get(i).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn valid_count(&self) -> usize {
        self.0.iter().filter(|&&v| v).count()
    }
}

impl From<Vec<bool>> for ValidityMask {
    fn from(v: Vec<bool>) -> Self {
        ValidityMask(v)
    }
}

// ---------------------------------------------------------------------------
// Band
// ---------------------------------------------------------------------------

/// Which half of the spectrum a decomposition keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Lowpass output, the "signal".
    Low,
    /// Highpass output, the "noise".
    High,
}

impl Band {
    pub const ALL: [Band; 2] = [Band::Low, Band::High];

    pub fn stream_name(self) -> &'static str {
        match self {
            Band::Low => "signal",
            Band::High => "noise",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Low => write!(f, "lowpass"),
            Band::High => write!(f, "highpass"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trace – one loaded file
// ---------------------------------------------------------------------------

pub const DEFAULT_COLUMNS: [&str; 3] = ["n", "x", "y"];

/// An ordered gaze recording, usually one subject and one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Identifier used in logs and error reports (the file stem).
    pub id: String,
    /// Header names of the index and the two coordinate columns.
    pub columns: [String; 3],
    pub samples: Vec<Sample>,
}

impl Trace {
    pub fn new(id: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            id: id.into(),
            columns: DEFAULT_COLUMNS.map(String::from),
            samples,
        }
    }

    /// Same id and header, different samples.
    pub fn with_samples(&self, samples: Vec<Sample>) -> Self {
        Self {
            id: self.id.clone(),
            columns: self.columns.clone(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mask(&self) -> ValidityMask {
        ValidityMask::of(self)
    }

    pub fn missing_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_valid()).count()
    }
}

/// The two band outputs of one input trace.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedPair {
    pub signal: Trace,
    pub noise: Trace,
}

impl DecomposedPair {
    pub fn band(&self, band: Band) -> &Trace {
        match band {
            Band::Low => &self.signal,
            Band::High => &self.noise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_marks_fully_present_samples() {
        let trace = Trace::new(
            "t",
            vec![
                Sample::new(0, 1.0, 2.0),
                Sample::missing(1),
                Sample {
                    n: 2,
                    x: Some(1.0),
                    y: None,
                },
            ],
        );
        assert_eq!(trace.mask(), ValidityMask::from(vec![true, false, false]));
        assert_eq!(trace.mask().valid_count(), 1);
        assert_eq!(trace.missing_count(), 2);
        assert!(trace.samples[2].is_half_missing());
    }

    #[test]
    fn band_names() {
        assert_eq!(Band::Low.stream_name(), "signal");
        assert_eq!(Band::High.stream_name(), "noise");
        assert_eq!(Band::High.to_string(), "highpass");
    }
}
