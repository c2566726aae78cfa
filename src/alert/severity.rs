//! Geomagnetic storm severity classification.
//!
//! Maps a Kp-like scalar to its storm class and NOAA G-scale tier:
//!
//! | Kp range  | class            | NOAA scale |
//! |-----------|------------------|------------|
//! | v < 3     | Quiet            | —          |
//! | 3 ≤ v < 5 | Unsettled/Active | —          |
//! | 5 ≤ v < 6 | Minor Storm      | G1         |
//! | 6 ≤ v < 7 | Moderate Storm   | G2         |
//! | 7 ≤ v < 8 | Strong Storm     | G3         |
//! | 8 ≤ v < 9 | Severe Storm     | G4         |
//! | v ≥ 9     | Extreme Storm    | G5         |
//!
//! Boundaries are inclusive on the lower edge, exclusive on the upper edge;
//! the top tier is open-ended. Classification is total over all reals:
//! negative values clamp to Quiet and no input raises an error.

/// Storm severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StormLevel {
    Quiet,
    Active,
    Minor,
    Moderate,
    Strong,
    Severe,
    Extreme,
}

impl StormLevel {
    /// Human-readable class label.
    pub fn label(&self) -> &'static str {
        match self {
            StormLevel::Quiet => "Quiet",
            StormLevel::Active => "Unsettled/Active",
            StormLevel::Minor => "Minor Storm",
            StormLevel::Moderate => "Moderate Storm",
            StormLevel::Strong => "Strong Storm",
            StormLevel::Severe => "Severe Storm",
            StormLevel::Extreme => "Extreme Storm",
        }
    }

    /// NOAA G-scale tier; the sub-storm classes have none.
    pub fn noaa_scale(&self) -> Option<&'static str> {
        match self {
            StormLevel::Quiet | StormLevel::Active => None,
            StormLevel::Minor => Some("G1"),
            StormLevel::Moderate => Some("G2"),
            StormLevel::Strong => Some("G3"),
            StormLevel::Severe => Some("G4"),
            StormLevel::Extreme => Some("G5"),
        }
    }

    pub fn is_storm(&self) -> bool {
        *self >= StormLevel::Minor
    }
}

impl std::fmt::Display for StormLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.noaa_scale() {
            Some(scale) => write!(f, "{} ({})", self.label(), scale),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Classifies a Kp value. Total over all reals; NaN and negative inputs
/// fall through every storm arm and classify Quiet.
pub fn classify(v: f64) -> StormLevel {
    if v >= 9.0 {
        StormLevel::Extreme
    } else if v >= 8.0 {
        StormLevel::Severe
    } else if v >= 7.0 {
        StormLevel::Strong
    } else if v >= 6.0 {
        StormLevel::Moderate
    } else if v >= 5.0 {
        StormLevel::Minor
    } else if v >= 3.0 {
        StormLevel::Active
    } else {
        StormLevel::Quiet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
