//! Confidence-gated validation between scheduling stages.
//!
//! The gate turns weighted component scores into a pass/fail decision
//! against a threshold, with categorized issues and recommendations for
//! every component below its acceptable bound. Gates configured with
//! `allow_bypass` can be bypassed with a recorded reason; a bypassed gate
//! counts as passing for downstream control flow.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{
    ConfidenceComponents, ConfidenceScore, TaskStatus, WaveResult,
};

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Confidence cleared the threshold.
    Passed,
    /// Confidence fell short.
    Failed,
    /// Gate was explicitly bypassed; counts as passing downstream.
    Bypassed,
}

impl GateStatus {
    /// Whether downstream control flow may proceed.
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Passed | Self::Bypassed)
    }
}

/// Severity of a component shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Component below 0.5.
    Critical,
    /// Component in [0.5, 0.7).
    High,
    /// Component in [0.7, 0.8).
    Medium,
    /// Component at or above 0.8 but below the threshold.
    Low,
}

impl IssueSeverity {
    fn for_value(value: f64) -> Self {
        if value < 0.5 {
            Self::Critical
        } else if value < 0.7 {
            Self::High
        } else if value < 0.8 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One categorized shortfall found during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateIssue {
    /// How serious the shortfall is.
    pub severity: IssueSeverity,
    /// The component that fell short.
    pub component: String,
    /// Human-readable description.
    pub message: String,
}

/// The decision a gate renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// Pass/fail/bypass outcome.
    pub status: GateStatus,
    /// The overall confidence evaluated.
    pub overall: f64,
    /// The threshold evaluated against.
    pub threshold: f64,
    /// Component shortfalls, most severe first.
    pub issues: Vec<GateIssue>,
    /// Human-readable remediation hints.
    pub recommendations: Vec<String>,
    /// Reason recorded on bypass.
    pub bypass_reason: Option<String>,
}

/// Scores units of work and renders pass/fail decisions.
#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    threshold: f64,
    allow_bypass: bool,
}

impl ConfidenceGate {
    /// Create a gate with the given default threshold.
    pub fn new(threshold: f64) -> OrchestratorResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(OrchestratorError::Config(format!(
                "gate threshold {threshold} outside [0, 1]"
            )));
        }
        Ok(Self {
            threshold,
            allow_bypass: false,
        })
    }

    /// Permit explicit bypasses.
    pub fn with_bypass(mut self, allow: bool) -> Self {
        self.allow_bypass = allow;
        self
    }

    /// The gate's default threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score supplied components into a validated confidence score.
    pub fn score(&self, components: ConfidenceComponents) -> OrchestratorResult<ConfidenceScore> {
        ConfidenceScore::new(components)
    }

    /// Derive a confidence score from an observed wave result.
    ///
    /// Components come from the wave's execution statistics: completeness
    /// from the completion ratio, feasibility from the absence of
    /// timeouts, consistency from the absence of failures, clarity from
    /// the absence of cancellations, testability from how many tasks
    /// produced inspectable output.
    pub fn score_wave(&self, wave: &WaveResult) -> OrchestratorResult<ConfidenceScore> {
        if wave.total_tasks == 0 {
            return ConfidenceScore::new(ConfidenceComponents::uniform(0.0));
        }
        let total = wave.total_tasks as f64;
        let timed_out = wave
            .task_results
            .iter()
            .filter(|r| r.status == TaskStatus::TimedOut)
            .count() as f64;
        let failed = wave
            .task_results
            .iter()
            .filter(|r| r.status == TaskStatus::Failed)
            .count() as f64;
        let cancelled = wave
            .task_results
            .iter()
            .filter(|r| r.status == TaskStatus::Cancelled)
            .count() as f64;
        let with_output = wave
            .task_results
            .iter()
            .filter(|r| r.output.is_some())
            .count() as f64;

        ConfidenceScore::new(ConfidenceComponents {
            completeness: wave.success_rate(),
            clarity: 1.0 - (cancelled / total),
            feasibility: 1.0 - (timed_out / total),
            consistency: 1.0 - (failed / total),
            testability: with_output / total,
        })
    }

    /// Render a pass/fail decision for a score against a threshold.
    pub fn evaluate(&self, score: &ConfidenceScore, threshold: f64) -> GateDecision {
        let mut issues: Vec<GateIssue> = score
            .components
            .named()
            .iter()
            .filter(|(_, value)| *value < threshold)
            .map(|(name, value)| GateIssue {
                severity: IssueSeverity::for_value(*value),
                component: (*name).to_string(),
                message: format!("{name} at {value:.2} is below the acceptable bound {threshold:.2}"),
            })
            .collect();
        issues.sort_by_key(|issue| issue.severity);

        let recommendations = issues.iter().map(|issue| recommendation(&issue.component)).collect();

        let status = if score.overall >= threshold {
            GateStatus::Passed
        } else {
            GateStatus::Failed
        };

        debug!(
            overall = score.overall,
            threshold,
            status = ?status,
            level = score.level.as_str(),
            "Gate evaluated"
        );

        GateDecision {
            status,
            overall: score.overall,
            threshold,
            issues,
            recommendations,
            bypass_reason: None,
        }
    }

    /// Evaluate against the gate's own threshold.
    pub fn evaluate_default(&self, score: &ConfidenceScore) -> GateDecision {
        self.evaluate(score, self.threshold)
    }

    /// Bypass the gate with a recorded reason.
    ///
    /// Permitted only when the gate was configured with bypasses allowed.
    pub fn bypass(&self, gate_id: &str, reason: impl Into<String>) -> OrchestratorResult<GateDecision> {
        if !self.allow_bypass {
            return Err(OrchestratorError::Orchestration(format!(
                "gate '{gate_id}' does not permit bypass"
            )));
        }
        let reason = reason.into();
        info!(gate_id, reason = %reason, "Gate bypassed");
        Ok(GateDecision {
            status: GateStatus::Bypassed,
            overall: 0.0,
            threshold: self.threshold,
            issues: Vec::new(),
            recommendations: Vec::new(),
            bypass_reason: Some(reason),
        })
    }
}

fn recommendation(component: &str) -> String {
    match component {
        "completeness" => "Cover the remaining required work before proceeding".to_string(),
        "clarity" => "Resolve ambiguities and cancelled work in this unit".to_string(),
        "feasibility" => "Investigate timeouts; the unit may be over-scoped".to_string(),
        "consistency" => "Reconcile failures that contradict the unit's expectations".to_string(),
        "testability" => "Add verifiable outputs so the unit can be validated".to_string(),
        other => format!("Improve the {other} component before proceeding"),
    }
}
