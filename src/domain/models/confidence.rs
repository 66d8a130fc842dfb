//! Confidence scoring model.
//!
//! A confidence score is a weighted, multi-component measure in [0, 1] of
//! whether a unit of work is ready to proceed, with a discrete
//! classification level. Construction outside [0, 1] is an error, not a
//! clamp.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

/// Weight of the completeness component in the overall score.
///
/// Wave and phase aggregates average child confidences instead of
/// re-applying these weights.
pub const WEIGHT_COMPLETENESS: f64 = 0.30;
/// Weight of the clarity component.
pub const WEIGHT_CLARITY: f64 = 0.25;
/// Weight of the feasibility component.
pub const WEIGHT_FEASIBILITY: f64 = 0.20;
/// Weight of the consistency component.
pub const WEIGHT_CONSISTENCY: f64 = 0.15;
/// Weight of the testability component.
pub const WEIGHT_TESTABILITY: f64 = 0.10;

/// Discrete classification of an overall confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Overall below 0.70.
    Critical,
    /// Overall in [0.70, 0.80).
    Low,
    /// Overall in [0.80, 0.90).
    Medium,
    /// Overall in [0.90, 0.95).
    High,
    /// Overall at or above 0.95.
    VeryHigh,
}

impl ConfidenceLevel {
    /// Classify an overall confidence value.
    pub fn from_overall(overall: f64) -> Self {
        if overall < 0.70 {
            Self::Critical
        } else if overall < 0.80 {
            Self::Low
        } else if overall < 0.90 {
            Self::Medium
        } else if overall < 0.95 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Stable string form for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// The five weighted components of a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceComponents {
    /// How much of the required work is covered.
    pub completeness: f64,
    /// How unambiguous the unit is.
    pub clarity: f64,
    /// How achievable the unit is.
    pub feasibility: f64,
    /// How internally coherent the unit is.
    pub consistency: f64,
    /// How verifiable the unit is.
    pub testability: f64,
}

impl ConfidenceComponents {
    /// Build components with one uniform value across the board.
    pub fn uniform(value: f64) -> Self {
        Self {
            completeness: value,
            clarity: value,
            feasibility: value,
            consistency: value,
            testability: value,
        }
    }

    /// Named component pairs, in weight order.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("completeness", self.completeness),
            ("clarity", self.clarity),
            ("feasibility", self.feasibility),
            ("consistency", self.consistency),
            ("testability", self.testability),
        ]
    }
}

/// A validated confidence score: components, weighted overall, and level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// The five components.
    pub components: ConfidenceComponents,
    /// Weighted overall value in [0, 1].
    pub overall: f64,
    /// Discrete classification of the overall value.
    pub level: ConfidenceLevel,
}

impl ConfidenceScore {
    /// Build a score from components, computing the weighted overall.
    ///
    /// Every component must lie in [0, 1]; out-of-range input is rejected.
    pub fn new(components: ConfidenceComponents) -> OrchestratorResult<Self> {
        for (name, value) in components.named() {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(OrchestratorError::ScoreOutOfRange {
                    component: name.to_string(),
                    value,
                });
            }
        }
        let overall = WEIGHT_COMPLETENESS * components.completeness
            + WEIGHT_CLARITY * components.clarity
            + WEIGHT_FEASIBILITY * components.feasibility
            + WEIGHT_CONSISTENCY * components.consistency
            + WEIGHT_TESTABILITY * components.testability;
        Ok(Self {
            components,
            overall,
            level: ConfidenceLevel::from_overall(overall),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ones_scores_very_high() {
        let score = ConfidenceScore::new(ConfidenceComponents::uniform(1.0)).unwrap();
        assert!((score.overall - 1.0).abs() < 1e-9);
        assert_eq!(score.level, ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn test_out_of_range_component_rejected() {
        let components = ConfidenceComponents {
            clarity: 1.2,
            ..ConfidenceComponents::uniform(0.9)
        };
        let err = ConfidenceScore::new(components).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::ScoreOutOfRange { ref component, .. } if component == "clarity"
        ));
    }

    #[test]
    fn test_negative_component_rejected() {
        let components = ConfidenceComponents {
            testability: -0.1,
            ..ConfidenceComponents::uniform(0.5)
        };
        assert!(ConfidenceScore::new(components).is_err());
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(ConfidenceLevel::from_overall(0.69), ConfidenceLevel::Critical);
        assert_eq!(ConfidenceLevel::from_overall(0.70), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_overall(0.85), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_overall(0.90), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_overall(0.95), ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn test_weighted_overall() {
        let components = ConfidenceComponents {
            completeness: 1.0,
            clarity: 0.0,
            feasibility: 0.0,
            consistency: 0.0,
            testability: 0.0,
        };
        let score = ConfidenceScore::new(components).unwrap();
        assert!((score.overall - 0.30).abs() < 1e-9);
    }
}
