//! Execution controller: drives a plan phase by phase, wave by wave,
//! with halt, resume, rollback, and checkpoint control on top of the
//! wave scheduler.
//!
//! The controller's mutable state lives behind one `RwLock` and is only
//! held across synchronous sections, never across an await into the
//! scheduler. That keeps `halt()` and `status()` responsive while a
//! wave is in flight.
//!
//! Resume is coarse-grained: a halted wave re-runs from its first task.
//! The snapshot taken before each wave makes that safe; nothing from a
//! half-finished wave enters history.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{
    CheckpointFrequency, ExecutionPlan, PhaseResult, Snapshot, Wave, WaveResult, WaveStatus,
};
use crate::domain::ports::approval::{
    ApprovalService, DecisionOption, DecisionRequest, AUTO_ACCEPT_CONFIDENCE,
};
use crate::domain::ports::checkpoint::CheckpointStore;
use crate::domain::ports::executor::TaskExecutor;
use crate::services::confidence_gate::ConfidenceGate;
use crate::services::events::{emit, EventSender, ExecutionEvent};
use crate::services::halt::HaltSignal;
use crate::services::snapshot_store::SnapshotStore;
use crate::services::task_runner::TaskRunner;
use crate::services::wave_scheduler::WaveScheduler;

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Constructed or reset; no run in progress.
    Idle,
    /// A run is in progress.
    Running,
    /// A run was interrupted and can be resumed.
    Halted,
    /// The last run finished.
    Completed,
    /// The last run aborted with an error.
    Failed,
}

impl ExecutionState {
    /// Stable string form for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Halted => "halted",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time view of controller progress.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    /// Current lifecycle state.
    pub state: ExecutionState,
    /// Global index of the next wave to run.
    pub wave_index: usize,
    /// Total waves across all phases.
    pub total_waves: usize,
    /// Halt request-to-stop latency of the most recent halt.
    pub halt_latency_ms: Option<u64>,
    /// Snapshots currently retained for rollback.
    pub snapshots_available: usize,
}

/// Final outcome of `execute` or `resume`.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Id of the executed plan.
    pub plan_id: String,
    /// Terminal state of the run.
    pub state: ExecutionState,
    /// Phase results aggregated so far, in execution order.
    pub phase_results: Vec<PhaseResult>,
    /// Global index of the interrupted wave, when halted.
    pub halted_at_wave: Option<usize>,
}

struct ControllerInner {
    state: ExecutionState,
    wave_index: usize,
    history: Vec<WaveResult>,
    wave_states: BTreeMap<String, WaveStatus>,
    phase_results: Vec<PhaseResult>,
    phase_passed: HashMap<String, bool>,
    snapshots: SnapshotStore,
    halt_requested_at: Option<Instant>,
    halt_latency: Option<Duration>,
}

impl ControllerInner {
    fn new(plan: &ExecutionPlan) -> Self {
        let mut inner = Self {
            state: ExecutionState::Idle,
            wave_index: 0,
            history: Vec::new(),
            wave_states: BTreeMap::new(),
            phase_results: Vec::new(),
            phase_passed: HashMap::new(),
            snapshots: SnapshotStore::new(),
            halt_requested_at: None,
            halt_latency: None,
        };
        inner.reset_progress(plan);
        inner
    }

    fn reset_progress(&mut self, plan: &ExecutionPlan) {
        self.wave_index = 0;
        self.history.clear();
        self.phase_results.clear();
        self.phase_passed.clear();
        self.halt_requested_at = None;
        self.halt_latency = None;
        self.wave_states = plan
            .phases
            .iter()
            .flat_map(|p| &p.waves)
            .map(|w| (w.id.clone(), WaveStatus::Pending))
            .collect();
    }

    fn capture_snapshot(&mut self) -> Snapshot {
        let Self {
            snapshots,
            wave_index,
            history,
            wave_states,
            ..
        } = self;
        snapshots.capture(*wave_index, history, wave_states).clone()
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.wave_index = snapshot.wave_index;
        self.history = snapshot.history;
        self.wave_states = snapshot.wave_states;

        // Phase aggregates built from waves past the restore point are no
        // longer valid; drop them so resume re-runs those phases.
        let history = &self.history;
        self.phase_results.retain(|p| {
            p.wave_results
                .iter()
                .all(|w| history.iter().any(|h| h.wave_id == w.wave_id))
        });
        let phase_results = &self.phase_results;
        self.phase_passed
            .retain(|id, _| phase_results.iter().any(|p| &p.phase_id == id));
    }
}

/// Drives an `ExecutionPlan` end to end.
///
/// Thread-safe behind `Arc`; `halt` and `status` may be called from any
/// task while `execute` runs.
pub struct ExecutionController {
    plan: ExecutionPlan,
    scheduler: WaveScheduler,
    halt: HaltSignal,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    approvals: Option<Arc<dyn ApprovalService>>,
    events: Option<EventSender>,
    inner: RwLock<ControllerInner>,
}

impl ExecutionController {
    /// Build a controller for a validated plan.
    pub fn new(plan: ExecutionPlan, executor: Arc<dyn TaskExecutor>) -> OrchestratorResult<Self> {
        plan.validate()?;
        let gate = ConfidenceGate::new(plan.confidence_threshold)?;
        let runner = Arc::new(TaskRunner::new(executor));
        let inner = RwLock::new(ControllerInner::new(&plan));
        Ok(Self {
            scheduler: WaveScheduler::new(runner, gate),
            halt: HaltSignal::new(),
            checkpoints: None,
            approvals: None,
            events: None,
            inner,
            plan,
        })
    }

    /// Attach a checkpoint persistence backend.
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Attach an approval backend for gate-failure escalation.
    pub fn with_approval_service(mut self, service: Arc<dyn ApprovalService>) -> Self {
        self.approvals = Some(service);
        self
    }

    /// Attach an event stream sender.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Override the rollback ring capacity.
    pub fn with_snapshot_capacity(mut self, capacity: usize) -> OrchestratorResult<Self> {
        self.inner.get_mut().snapshots = SnapshotStore::with_capacity(capacity)?;
        Ok(self)
    }

    /// Execute the plan from the recorded wave index.
    ///
    /// From `Idle` that is the beginning of the plan, or the restored
    /// position after a rollback. Rejected while a run is in progress
    /// or halted; a halted run is continued with `resume`, not
    /// restarted. A completed or failed run starts over from scratch.
    pub async fn execute(&self) -> OrchestratorResult<ExecutionReport> {
        {
            let mut inner = self.inner.write().await;
            match inner.state {
                ExecutionState::Running | ExecutionState::Halted => {
                    return Err(OrchestratorError::InvalidState {
                        operation: "execute",
                        state: inner.state.as_str().to_string(),
                    });
                }
                ExecutionState::Completed | ExecutionState::Failed => {
                    inner.reset_progress(&self.plan);
                    inner.snapshots.clear();
                }
                ExecutionState::Idle => {}
            }
            inner.state = ExecutionState::Running;
        }
        self.halt.clear();

        info!(
            plan_id = %self.plan.id,
            phases = self.plan.phases.len(),
            waves = self.plan.total_waves(),
            "Execution started"
        );
        emit(
            self.events.as_ref(),
            ExecutionEvent::Started {
                plan_id: self.plan.id.clone(),
                total_phases: self.plan.phases.len(),
                total_waves: self.plan.total_waves(),
            },
        );

        let outcome = self.run_loop().await;
        self.finish(outcome).await
    }

    /// Continue a halted run from the interrupted wave.
    pub async fn resume(&self) -> OrchestratorResult<ExecutionReport> {
        {
            let mut inner = self.inner.write().await;
            if inner.state != ExecutionState::Halted {
                return Err(OrchestratorError::InvalidState {
                    operation: "resume",
                    state: inner.state.as_str().to_string(),
                });
            }
            inner.state = ExecutionState::Running;
            inner.halt_requested_at = None;
        }
        self.halt.clear();
        info!(plan_id = %self.plan.id, "Resuming halted execution");

        let outcome = self.run_loop().await;
        self.finish(outcome).await
    }

    /// Request a halt. Returns immediately; the run stops at the next
    /// suspension point and the controller transitions to `Halted`.
    pub async fn halt(&self) {
        {
            let mut inner = self.inner.write().await;
            inner.halt_requested_at = Some(Instant::now());
        }
        self.halt.trigger();
        info!(plan_id = %self.plan.id, "Halt requested");
    }

    /// Restore progress to an earlier snapshot.
    ///
    /// `steps_back` of 1 restores the most recent snapshot. On success
    /// the halt signal is cleared and the controller is left `Idle`;
    /// `execute` then continues from the restored wave. Out-of-range
    /// requests leave state untouched.
    ///
    /// Rejected while `Running`: the active run loop owns the wave index,
    /// so halt first, then roll back.
    pub async fn rollback(&self, steps_back: usize) -> OrchestratorResult<usize> {
        let mut inner = self.inner.write().await;
        if inner.state == ExecutionState::Running {
            return Err(OrchestratorError::InvalidState {
                operation: "rollback",
                state: inner.state.as_str().to_string(),
            });
        }
        let snapshot = inner.snapshots.get(steps_back)?.clone();
        let restored = snapshot.wave_index;
        inner.apply_snapshot(snapshot);
        inner.state = ExecutionState::Idle;
        inner.halt_requested_at = None;
        self.halt.clear();
        info!(steps_back, wave_index = restored, "Rolled back");
        Ok(restored)
    }

    /// Persist the current progress under the given checkpoint id.
    ///
    /// Does not touch the rollback ring; only `save` is involved.
    pub async fn checkpoint(&self, checkpoint_id: &str) -> OrchestratorResult<()> {
        let store = self.require_checkpoint_store()?;
        let snapshot = {
            let inner = self.inner.read().await;
            Snapshot::capture(inner.wave_index, &inner.history, &inner.wave_states)
        };
        store.save(checkpoint_id, &snapshot).await
    }

    /// Restore progress from a previously saved checkpoint.
    pub async fn restore_checkpoint(&self, checkpoint_id: &str) -> OrchestratorResult<usize> {
        let store = self.require_checkpoint_store()?;
        let snapshot = store.load(checkpoint_id).await?.ok_or_else(|| {
            OrchestratorError::Orchestration(format!("checkpoint '{checkpoint_id}' not found"))
        })?;

        let mut inner = self.inner.write().await;
        if inner.state == ExecutionState::Running {
            return Err(OrchestratorError::InvalidState {
                operation: "restore_checkpoint",
                state: inner.state.as_str().to_string(),
            });
        }
        let restored = snapshot.wave_index;
        inner.apply_snapshot(snapshot);
        inner.state = ExecutionState::Idle;
        inner.halt_requested_at = None;
        self.halt.clear();
        info!(checkpoint_id, wave_index = restored, "Checkpoint restored");
        Ok(restored)
    }

    /// Discard all progress and snapshots, returning to `Idle`.
    pub async fn reset(&self) -> OrchestratorResult<()> {
        let mut inner = self.inner.write().await;
        if inner.state == ExecutionState::Running {
            return Err(OrchestratorError::InvalidState {
                operation: "reset",
                state: inner.state.as_str().to_string(),
            });
        }
        inner.reset_progress(&self.plan);
        inner.snapshots.clear();
        inner.state = ExecutionState::Idle;
        self.halt.clear();
        Ok(())
    }

    /// Current progress snapshot for observers.
    pub async fn status(&self) -> ControllerStatus {
        let inner = self.inner.read().await;
        ControllerStatus {
            state: inner.state,
            wave_index: inner.wave_index,
            total_waves: self.plan.total_waves(),
            halt_latency_ms: inner.halt_latency.map(|d| d.as_millis() as u64),
            snapshots_available: inner.snapshots.count(),
        }
    }

    fn require_checkpoint_store(&self) -> OrchestratorResult<&Arc<dyn CheckpointStore>> {
        self.checkpoints.as_ref().ok_or_else(|| {
            OrchestratorError::Config("no checkpoint store configured".to_string())
        })
    }

    async fn finish(
        &self,
        outcome: OrchestratorResult<ExecutionState>,
    ) -> OrchestratorResult<ExecutionReport> {
        let mut inner = self.inner.write().await;
        match outcome {
            Ok(state) => {
                inner.state = state;
                Ok(ExecutionReport {
                    plan_id: self.plan.id.clone(),
                    state,
                    phase_results: inner.phase_results.clone(),
                    halted_at_wave: (state == ExecutionState::Halted)
                        .then_some(inner.wave_index),
                })
            }
            Err(err) => {
                inner.state = ExecutionState::Failed;
                Err(err)
            }
        }
    }

    /// The phase/wave loop shared by `execute` and `resume`. Walks the
    /// flattened wave list, skipping waves already in history.
    async fn run_loop(&self) -> OrchestratorResult<ExecutionState> {
        let mut global_index = 0usize;

        for phase in &self.plan.phases {
            let phase_waves = phase.waves.len();

            let already_aggregated = {
                let inner = self.inner.read().await;
                inner.phase_results.iter().any(|p| p.phase_id == phase.id)
            };
            if already_aggregated {
                global_index += phase_waves;
                continue;
            }

            let unmet = {
                let inner = self.inner.read().await;
                phase
                    .requires
                    .iter()
                    .find(|req| !inner.phase_passed.get(*req).copied().unwrap_or(false))
                    .cloned()
            };
            if let Some(req) = unmet {
                if phase.skip_on_low_confidence {
                    warn!(
                        phase_id = %phase.id,
                        prerequisite = %req,
                        "Skipping phase: prerequisite did not pass validation"
                    );
                    let mut inner = self.inner.write().await;
                    inner.phase_passed.insert(phase.id.clone(), false);
                    inner.wave_index = global_index + phase_waves;
                    global_index += phase_waves;
                    continue;
                }
                return Err(OrchestratorError::Orchestration(format!(
                    "phase '{}' prerequisite '{}' did not pass validation",
                    phase.id, req
                )));
            }

            // On resume, earlier waves of a partially-run phase are
            // already in history; carry their results into aggregation.
            let mut phase_wave_results: Vec<WaveResult> = {
                let inner = self.inner.read().await;
                phase
                    .waves
                    .iter()
                    .filter_map(|w| inner.history.iter().find(|h| h.wave_id == w.id))
                    .cloned()
                    .collect()
            };

            for wave in &phase.waves {
                let current = {
                    let inner = self.inner.read().await;
                    inner.wave_index
                };
                if global_index < current {
                    global_index += 1;
                    continue;
                }

                if self.halt.is_halted() {
                    self.note_halt(global_index).await;
                    return Ok(ExecutionState::Halted);
                }

                let snapshot = {
                    let mut inner = self.inner.write().await;
                    inner.capture_snapshot()
                };
                if self.plan.checkpoint_frequency == CheckpointFrequency::PerWave {
                    self.save_checkpoint(
                        &format!("{}-wave-{}", self.plan.id, global_index),
                        &snapshot,
                    )
                    .await;
                }

                {
                    let mut inner = self.inner.write().await;
                    inner
                        .wave_states
                        .insert(wave.id.clone(), WaveStatus::Running);
                }
                emit(
                    self.events.as_ref(),
                    ExecutionEvent::WaveStarted {
                        wave_id: wave.id.clone(),
                        wave_index: global_index,
                        task_count: wave.tasks.len(),
                    },
                );

                let result = self
                    .scheduler
                    .execute_wave(wave, &self.halt, self.events.as_ref())
                    .await?;

                if result.status == WaveStatus::Halted {
                    let mut inner = self.inner.write().await;
                    inner.wave_states.insert(wave.id.clone(), WaveStatus::Halted);
                    drop(inner);
                    self.note_halt(global_index).await;
                    return Ok(ExecutionState::Halted);
                }

                {
                    let mut inner = self.inner.write().await;
                    inner.wave_states.insert(wave.id.clone(), result.status);
                    inner.history.push(result.clone());
                    inner.wave_index = global_index + 1;
                }

                if wave.require_validation && !result.validation_passed {
                    self.escalate(wave, &result).await?;
                }

                phase_wave_results.push(result);
                global_index += 1;
            }

            let phase_result = PhaseResult::from_waves(
                phase.id.clone(),
                phase_wave_results,
                phase.confidence_threshold,
            );
            info!(
                phase_id = %phase.id,
                confidence = phase_result.overall_confidence,
                passed = phase_result.validation_passed,
                "Phase completed"
            );
            emit(
                self.events.as_ref(),
                ExecutionEvent::PhaseCompleted {
                    phase_id: phase.id.clone(),
                    confidence: phase_result.overall_confidence,
                    validation_passed: phase_result.validation_passed,
                },
            );

            let passed = phase_result.validation_passed;
            {
                let mut inner = self.inner.write().await;
                inner.phase_passed.insert(phase.id.clone(), passed);
                inner.phase_results.push(phase_result);
            }

            if self.plan.checkpoint_frequency == CheckpointFrequency::PerPhase {
                // Persist only; the rollback ring takes its captures per wave.
                let snapshot = {
                    let inner = self.inner.read().await;
                    Snapshot::capture(inner.wave_index, &inner.history, &inner.wave_states)
                };
                self.save_checkpoint(&format!("{}-phase-{}", self.plan.id, phase.id), &snapshot)
                    .await;
            }

            if !passed && self.plan.stop_on_phase_failure {
                warn!(
                    phase_id = %phase.id,
                    "Phase failed validation; stopping remaining phases"
                );
                break;
            }
        }

        emit(
            self.events.as_ref(),
            ExecutionEvent::Completed {
                plan_id: self.plan.id.clone(),
            },
        );
        Ok(ExecutionState::Completed)
    }

    /// Record halt latency and announce the stop.
    async fn note_halt(&self, wave_index: usize) {
        {
            let mut inner = self.inner.write().await;
            if let Some(requested_at) = inner.halt_requested_at.take() {
                inner.halt_latency = Some(requested_at.elapsed());
            }
        }
        info!(wave_index, "Execution halted");
        emit(self.events.as_ref(), ExecutionEvent::Halted { wave_index });
    }

    /// Checkpoint persistence is best-effort; a failing backend never
    /// aborts the run.
    async fn save_checkpoint(&self, checkpoint_id: &str, snapshot: &Snapshot) {
        if let Some(store) = &self.checkpoints {
            if let Err(err) = store.save(checkpoint_id, snapshot).await {
                warn!(checkpoint_id, error = %err, "Checkpoint save failed");
            }
        }
    }

    /// Escalate a gate failure to the approval backend.
    ///
    /// Without a backend the failure is logged and execution proceeds;
    /// the phase aggregate still reflects it. With a backend, an "abort"
    /// selection stops the run.
    async fn escalate(&self, wave: &Wave, result: &WaveResult) -> OrchestratorResult<()> {
        let request = DecisionRequest::new(
            format!(
                "Wave '{}' confidence {:.2} is below threshold {:.2}; proceed?",
                wave.id, result.confidence, wave.confidence_threshold
            ),
            vec![
                DecisionOption {
                    label: "proceed".to_string(),
                    confidence: result.confidence,
                },
                DecisionOption {
                    label: "abort".to_string(),
                    confidence: 1.0 - result.confidence,
                },
            ],
        );

        if let Some(top) = request.top_option() {
            if top.confidence >= AUTO_ACCEPT_CONFIDENCE {
                let label = top.label.clone();
                info!(wave_id = %wave.id, selected = %label, "Gate escalation auto-accepted");
                if label == "abort" {
                    return Err(OrchestratorError::Orchestration(format!(
                        "execution aborted at wave '{}' after gate failure",
                        wave.id
                    )));
                }
                return Ok(());
            }
        }

        let Some(approvals) = &self.approvals else {
            warn!(
                wave_id = %wave.id,
                confidence = result.confidence,
                "Gate failed with no approval service configured; continuing"
            );
            return Ok(());
        };

        let response = approvals.request_decision(request).await?;
        info!(wave_id = %wave.id, selected = %response.selected, "Gate escalation decided");
        if response.selected == "abort" {
            return Err(OrchestratorError::Orchestration(format!(
                "execution aborted at wave '{}' after gate failure",
                wave.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_executor::{MockExecutor, MockOutcome};
    use crate::domain::models::{Phase, Task};
    use std::time::Duration;

    fn plan_of_waves(waves_per_phase: &[usize]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new("plan", "Plan");
        let mut wave_no = 0;
        for (p, count) in waves_per_phase.iter().enumerate() {
            let mut phase = Phase::new(format!("p{p}"), format!("Phase {p}"), p as u32 + 1);
            for _ in 0..*count {
                let task = Task::new(format!("t{wave_no}"), "Task");
                phase = phase.with_wave(Wave::new(
                    format!("w{wave_no}"),
                    format!("Wave {wave_no}"),
                    vec![task],
                ));
                wave_no += 1;
            }
            plan = plan.with_phase(phase);
        }
        plan
    }

    #[tokio::test]
    async fn test_execute_runs_all_phases() {
        let controller =
            ExecutionController::new(plan_of_waves(&[2, 1]), Arc::new(MockExecutor::new()))
                .unwrap();

        let report = controller.execute().await.unwrap();
        assert_eq!(report.state, ExecutionState::Completed);
        assert_eq!(report.phase_results.len(), 2);

        let status = controller.status().await;
        assert_eq!(status.state, ExecutionState::Completed);
        assert_eq!(status.wave_index, 3);
        assert_eq!(status.snapshots_available, 3);
    }

    #[tokio::test]
    async fn test_resume_rejected_unless_halted() {
        let controller =
            ExecutionController::new(plan_of_waves(&[1]), Arc::new(MockExecutor::new())).unwrap();
        let err = controller.resume().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_rollback_out_of_range_leaves_state() {
        let controller =
            ExecutionController::new(plan_of_waves(&[1]), Arc::new(MockExecutor::new())).unwrap();
        controller.execute().await.unwrap();

        let err = controller.rollback(5).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Rollback {
                requested: 5,
                available: 1
            }
        ));
        assert_eq!(controller.status().await.state, ExecutionState::Completed);
    }

    #[tokio::test]
    async fn test_rollback_then_execute_continues() {
        let controller =
            ExecutionController::new(plan_of_waves(&[3]), Arc::new(MockExecutor::new())).unwrap();
        controller.execute().await.unwrap();

        // Most recent snapshot was taken before the final wave.
        let restored = controller.rollback(1).await.unwrap();
        assert_eq!(restored, 2);
        assert_eq!(controller.status().await.state, ExecutionState::Idle);

        let report = controller.execute().await.unwrap();
        assert_eq!(report.state, ExecutionState::Completed);
        assert_eq!(controller.status().await.wave_index, 3);
    }

    #[tokio::test]
    async fn test_rollback_rejected_while_running() {
        let executor = MockExecutor::new().with_default_delay(Duration::from_millis(20));
        let controller = Arc::new(
            ExecutionController::new(plan_of_waves(&[3]), Arc::new(executor)).unwrap(),
        );
        let runner = Arc::clone(&controller);
        let handle = tokio::spawn(async move { runner.execute().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        let err = controller.rollback(1).await.expect_err("run in progress");
        assert!(matches!(
            err,
            OrchestratorError::InvalidState {
                operation: "rollback",
                ..
            }
        ));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stop_on_phase_failure() {
        let executor = MockExecutor::new();
        executor.script("t0", MockOutcome::always_fail("boom")).await;
        let mut plan = plan_of_waves(&[1, 1]);
        plan.stop_on_phase_failure = true;

        let controller = ExecutionController::new(plan, Arc::new(executor)).unwrap();
        let report = controller.execute().await.unwrap();

        // First phase fails validation; second never runs.
        assert_eq!(report.state, ExecutionState::Completed);
        assert_eq!(report.phase_results.len(), 1);
        assert!(!report.phase_results[0].validation_passed);
        assert_eq!(controller.status().await.wave_index, 1);
    }

    #[tokio::test]
    async fn test_failed_phase_continues_when_configured() {
        let executor = MockExecutor::new();
        executor.script("t0", MockOutcome::always_fail("boom")).await;
        let mut plan = plan_of_waves(&[1, 1]);
        plan.stop_on_phase_failure = false;

        let controller = ExecutionController::new(plan, Arc::new(executor)).unwrap();
        let report = controller.execute().await.unwrap();
        assert_eq!(report.phase_results.len(), 2);
        assert!(report.phase_results[1].validation_passed);
    }

    #[tokio::test]
    async fn test_halt_latency_is_bounded() {
        let executor = MockExecutor::new().with_default_delay(Duration::from_millis(10));
        let mut plan = ExecutionPlan::new("plan", "Plan");
        let tasks: Vec<Task> = (0..20).map(|i| Task::new(format!("t{i}"), "Task")).collect();
        plan = plan.with_phase(Phase::new("p0", "Phase", 1).with_wave(
            Wave::new("w0", "Wave", tasks)
                .with_strategy(crate::domain::models::WaveStrategy::Sequential),
        ));

        let controller = Arc::new(ExecutionController::new(plan, Arc::new(executor)).unwrap());
        let runner = Arc::clone(&controller);
        let handle = tokio::spawn(async move { runner.execute().await });

        tokio::time::sleep(Duration::from_millis(25)).await;
        controller.halt().await;
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.state, ExecutionState::Halted);
        let status = controller.status().await;
        assert_eq!(status.state, ExecutionState::Halted);
        let latency = status.halt_latency_ms.unwrap();
        assert!(latency < 100, "halt latency {latency}ms");
    }

    #[tokio::test]
    async fn test_prerequisite_skip_on_low_confidence() {
        let executor = MockExecutor::new();
        executor.script("t0", MockOutcome::always_fail("boom")).await;

        let mut plan = plan_of_waves(&[1, 1]);
        plan.stop_on_phase_failure = false;
        plan.phases[1] = plan.phases[1]
            .clone()
            .with_requirement("p0")
            .with_skip_on_low_confidence(true);

        let controller = ExecutionController::new(plan, Arc::new(executor)).unwrap();
        let report = controller.execute().await.unwrap();

        assert_eq!(report.state, ExecutionState::Completed);
        // Only the failed phase aggregated; the dependent one was skipped.
        assert_eq!(report.phase_results.len(), 1);
        assert_eq!(controller.status().await.wave_index, 2);
    }

    #[tokio::test]
    async fn test_prerequisite_failure_without_skip_aborts() {
        let executor = MockExecutor::new();
        executor.script("t0", MockOutcome::always_fail("boom")).await;

        let mut plan = plan_of_waves(&[1, 1]);
        plan.stop_on_phase_failure = false;
        plan.phases[1] = plan.phases[1].clone().with_requirement("p0");

        let controller = ExecutionController::new(plan, Arc::new(executor)).unwrap();
        let err = controller.execute().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Orchestration(_)));
        assert_eq!(controller.status().await.state, ExecutionState::Failed);
    }
}
