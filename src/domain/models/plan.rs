//! Plan hierarchy: waves, phases, and the execution plan.
//!
//! All three are constructed before execution starts and are read-only
//! thereafter. Construction invariants are enforced eagerly through
//! `validate()`; an invalid plan never reaches the scheduler.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::task::Task;

/// Strategy a wave's tasks are driven under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStrategy {
    /// Ignore declared dependencies; run in chunks of `max_parallel`.
    Parallel,
    /// One task at a time, in declared order.
    Sequential,
    /// Dependency-respecting layers, each layer bounded by `max_parallel`.
    Dependency,
    /// Repeatedly run the highest-priority ready tasks.
    Priority,
}

impl WaveStrategy {
    /// Stable string form for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Dependency => "dependency",
            Self::Priority => "priority",
        }
    }
}

/// How often the controller emits checkpoints to the checkpoint store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointFrequency {
    /// Before every wave.
    PerWave,
    /// After every phase.
    PerPhase,
    /// Only when the embedder asks.
    Manual,
}

/// A group of tasks executed together under one strategy and one
/// confidence gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    /// Unique, stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Id of the owning phase.
    pub phase_id: String,
    /// Tasks in declared order.
    pub tasks: Vec<Task>,
    /// Maximum simultaneously in-flight tasks.
    pub max_parallel: usize,
    /// Cancel remaining tasks once one fails.
    pub fail_fast: bool,
    /// Retry timed-out tasks as if they had failed.
    pub retry_on_failure: bool,
    /// Confidence the wave must reach to pass validation.
    pub confidence_threshold: f64,
    /// Score the wave through the confidence gate instead of raw success rate.
    pub require_validation: bool,
    /// Fraction of tasks that must succeed.
    pub min_success_rate: f64,
    /// Execution strategy.
    pub strategy: WaveStrategy,
}

impl Wave {
    /// Create a wave with engine defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phase_id: String::new(),
            tasks,
            max_parallel: 4,
            fail_fast: false,
            retry_on_failure: false,
            confidence_threshold: 0.8,
            require_validation: false,
            min_success_rate: 1.0,
            strategy: WaveStrategy::Dependency,
        }
    }

    /// Set the owning phase id.
    pub fn with_phase(mut self, phase_id: impl Into<String>) -> Self {
        self.phase_id = phase_id.into();
        self
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: WaveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the parallelism bound.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Enable fail-fast cancellation.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Retry timed-out tasks.
    pub fn with_retry_on_failure(mut self, retry: bool) -> Self {
        self.retry_on_failure = retry;
        self
    }

    /// Set the wave confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Require gate validation for the wave confidence.
    pub fn with_validation(mut self, required: bool) -> Self {
        self.require_validation = required;
        self
    }

    /// Set the minimum success rate.
    pub fn with_min_success_rate(mut self, rate: f64) -> Self {
        self.min_success_rate = rate;
        self
    }

    /// Validate construction invariants, including every task's.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.tasks.is_empty() {
            return Err(OrchestratorError::Config(format!(
                "wave '{}' has no tasks",
                self.id
            )));
        }
        if self.max_parallel == 0 {
            return Err(OrchestratorError::Config(format!(
                "wave '{}' has non-positive max_parallel",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(OrchestratorError::Config(format!(
                "wave '{}' confidence threshold {} outside [0, 1]",
                self.id, self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(OrchestratorError::Config(format!(
                "wave '{}' min success rate {} outside [0, 1]",
                self.id, self.min_success_rate
            )));
        }
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

/// An ordered sequence of waves representing a project milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Unique, stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Position within the plan.
    pub sequence: u32,
    /// Waves in execution order.
    pub waves: Vec<Wave>,
    /// Confidence the phase must reach to pass validation.
    pub confidence_threshold: f64,
    /// Phases that must have completed before this one runs.
    pub requires: Vec<String>,
    /// Skip this phase instead of failing when a prerequisite's confidence
    /// was below its threshold.
    pub skip_on_low_confidence: bool,
}

impl Phase {
    /// Create a phase with engine defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>, sequence: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sequence,
            waves: Vec::new(),
            confidence_threshold: 0.8,
            requires: Vec::new(),
            skip_on_low_confidence: false,
        }
    }

    /// Append a wave, stamping it with this phase's id.
    pub fn with_wave(mut self, wave: Wave) -> Self {
        let wave = wave.with_phase(self.id.clone());
        self.waves.push(wave);
        self
    }

    /// Add a prerequisite phase id.
    pub fn with_requirement(mut self, phase_id: impl Into<String>) -> Self {
        self.requires.push(phase_id.into());
        self
    }

    /// Set the phase confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Skip instead of failing on an unmet low-confidence prerequisite.
    pub fn with_skip_on_low_confidence(mut self, skip: bool) -> Self {
        self.skip_on_low_confidence = skip;
        self
    }

    /// Validate construction invariants, including every wave's.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.waves.is_empty() {
            return Err(OrchestratorError::Config(format!(
                "phase '{}' has no waves",
                self.id
            )));
        }
        for wave in &self.waves {
            wave.validate()?;
        }
        Ok(())
    }
}

/// The full ordered sequence of phases for one execution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Unique, stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Phases in execution order.
    pub phases: Vec<Phase>,
    /// Halt all subsequent phases once one phase's validation fails.
    pub stop_on_phase_failure: bool,
    /// How often checkpoints are emitted.
    pub checkpoint_frequency: CheckpointFrequency,
    /// Plan-wide confidence threshold.
    pub confidence_threshold: f64,
}

impl ExecutionPlan {
    /// Create a plan with engine defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phases: Vec::new(),
            stop_on_phase_failure: true,
            checkpoint_frequency: CheckpointFrequency::PerWave,
            confidence_threshold: 0.8,
        }
    }

    /// Append a phase.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Set the stop-on-phase-failure flag.
    pub fn with_stop_on_phase_failure(mut self, stop: bool) -> Self {
        self.stop_on_phase_failure = stop;
        self
    }

    /// Set the checkpoint frequency.
    pub fn with_checkpoint_frequency(mut self, frequency: CheckpointFrequency) -> Self {
        self.checkpoint_frequency = frequency;
        self
    }

    /// Total waves across all phases.
    pub fn total_waves(&self) -> usize {
        self.phases.iter().map(|p| p.waves.len()).sum()
    }

    /// Validate construction invariants across the whole hierarchy.
    ///
    /// Prerequisite references must name phases that exist and come
    /// earlier in the sequence; phases execute strictly sequentially.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.phases.is_empty() {
            return Err(OrchestratorError::Config(format!(
                "plan '{}' has no phases",
                self.id
            )));
        }
        for (idx, phase) in self.phases.iter().enumerate() {
            phase.validate()?;
            for req in &phase.requires {
                let position = self.phases.iter().position(|p| &p.id == req);
                match position {
                    None => {
                        return Err(OrchestratorError::Config(format!(
                            "phase '{}' requires unknown phase '{}'",
                            phase.id, req
                        )));
                    }
                    Some(pos) if pos >= idx => {
                        return Err(OrchestratorError::Config(format!(
                            "phase '{}' requires phase '{}' which does not precede it",
                            phase.id, req
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: &str) -> Task {
        Task::new(id, format!("Task {id}"))
    }

    #[test]
    fn test_empty_wave_is_invalid() {
        let wave = Wave::new("w1", "Empty", vec![]);
        assert!(wave.validate().is_err());
    }

    #[test]
    fn test_zero_parallelism_is_invalid() {
        let wave = Wave::new("w1", "Wave", vec![sample_task("a")]).with_max_parallel(0);
        assert!(wave.validate().is_err());
    }

    #[test]
    fn test_unknown_prerequisite_is_invalid() {
        let plan = ExecutionPlan::new("plan", "Plan").with_phase(
            Phase::new("p1", "Phase 1", 1)
                .with_wave(Wave::new("w1", "Wave", vec![sample_task("a")]))
                .with_requirement("missing"),
        );
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_forward_prerequisite_is_invalid() {
        let plan = ExecutionPlan::new("plan", "Plan")
            .with_phase(
                Phase::new("p1", "Phase 1", 1)
                    .with_wave(Wave::new("w1", "Wave", vec![sample_task("a")]))
                    .with_requirement("p2"),
            )
            .with_phase(
                Phase::new("p2", "Phase 2", 2)
                    .with_wave(Wave::new("w2", "Wave", vec![sample_task("b")])),
            );
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_valid_plan() {
        let plan = ExecutionPlan::new("plan", "Plan")
            .with_phase(
                Phase::new("p1", "Phase 1", 1)
                    .with_wave(Wave::new("w1", "Wave 1", vec![sample_task("a")])),
            )
            .with_phase(
                Phase::new("p2", "Phase 2", 2)
                    .with_wave(Wave::new("w2", "Wave 2", vec![sample_task("b")]))
                    .with_requirement("p1"),
            );
        assert!(plan.validate().is_ok());
        assert_eq!(plan.total_waves(), 2);
    }

    #[test]
    fn test_wave_phase_id_stamped() {
        let phase =
            Phase::new("p1", "Phase", 1).with_wave(Wave::new("w1", "Wave", vec![sample_task("a")]));
        assert_eq!(phase.waves[0].phase_id, "p1");
    }
}
