//! Match/mismatch and affine gap parameters.

use std::fmt;

use crate::error::{Error, Result};

/// Default reward for identical bases
pub const DEFAULT_MATCH: i32 = 5;
/// Default penalty for different bases
pub const DEFAULT_MISMATCH: i32 = -3;
/// Default cost of opening a gap
pub const DEFAULT_GAP_OPEN: i32 = -8;
/// Default cost of each gap position
pub const DEFAULT_GAP_EXTEND: i32 = -1;
/// Largest accepted absolute value of any parameter
pub const MAX_SCORE_MAGNITUDE: i32 = 1 << 20;

/// Scoring for one run. A gap of length `k` costs `gap_open + k * gap_extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringParams {
    /// Score of a match
    pub match_score: i32,
    /// Score of a mismatch
    pub mismatch:    i32,
    /// Gap opening cost, not positive
    pub gap_open:    i32,
    /// Gap extension cost, not positive
    pub gap_extend:  i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            match_score: DEFAULT_MATCH,
            mismatch:    DEFAULT_MISMATCH,
            gap_open:    DEFAULT_GAP_OPEN,
            gap_extend:  DEFAULT_GAP_EXTEND,
        }
    }
}

impl ScoringParams {
    /// Check the ranges the scan formulation relies on.
    ///
    /// The horizontal gap row is derived from the gap-free row, which is only
    /// exact for non-positive gap costs.
    pub fn validate(&self) -> Result<Self> {
        if self.gap_open > 0 || self.gap_extend > 0 {
            return Err(Error::InvalidScoring(format!(
                "gap open ({}) and gap extend ({}) must not be positive",
                self.gap_open, self.gap_extend
            )));
        }
        for (what, v) in [
            ("match", self.match_score),
            ("mismatch", self.mismatch),
            ("gap open", self.gap_open),
            ("gap extend", self.gap_extend),
        ] {
            if v.unsigned_abs() > MAX_SCORE_MAGNITUDE as u32 {
                return Err(Error::InvalidScoring(format!(
                    "{what} score {v} is outside ±{MAX_SCORE_MAGNITUDE}"
                )));
            }
        }
        Ok(*self)
    }

    /// Substitution score of two encoded bases
    #[inline(always)]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        if a == b {
            self.match_score
        } else {
            self.mismatch
        }
    }
}

impl fmt::Display for ScoringParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "match: {}; mismatch: {}; gap open: {}; gap extend: {};",
            self.match_score, self.mismatch, self.gap_open, self.gap_extend,
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_validate() {
        let s = ScoringParams::default();
        assert_eq!(s.validate().unwrap(), s);
        assert_eq!(s.score(1, 1), 5);
        assert_eq!(s.score(1, 2), -3);
        assert_eq!(s.to_string(), "match: 5; mismatch: -3; gap open: -8; gap extend: -1;");
    }

    #[test]
    fn test_rejects_positive_gaps() {
        let s = ScoringParams { gap_open: 2, ..Default::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidScoring(_))));
        let s = ScoringParams { gap_extend: 1, ..Default::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidScoring(_))));
    }

    #[test]
    fn test_rejects_huge_values() {
        let s = ScoringParams { match_score: i32::MAX, ..Default::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidScoring(_))));
        let s = ScoringParams { gap_extend: i32::MIN, ..Default::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidScoring(_))));
    }
}
