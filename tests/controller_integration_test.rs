//! End-to-end tests for the execution controller: halt/resume,
//! rollback, checkpointing, and gate escalation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use wavefront::{
    ApprovalService, AutoApprovalService, CheckpointFrequency, CheckpointStore, DecisionRequest,
    DecisionResponse, ExecutionController, ExecutionEvent, ExecutionPlan, ExecutionState,
    MemoryCheckpointStore, MockExecutor, MockOutcome, OrchestratorError, OrchestratorResult,
    Phase, Task, Wave,
};

/// Approval backend that always aborts.
struct AbortApproval;

#[async_trait]
impl ApprovalService for AbortApproval {
    async fn request_decision(
        &self,
        request: DecisionRequest,
    ) -> OrchestratorResult<DecisionResponse> {
        Ok(DecisionResponse {
            request_id: request.id,
            selected: "abort".to_string(),
            confidence: 1.0,
        })
    }
}

/// A plan with one single-task wave per entry in `waves_per_phase`.
fn plan_of_waves(waves_per_phase: &[usize]) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new("plan", "Plan");
    let mut wave_no = 0;
    for (p, count) in waves_per_phase.iter().enumerate() {
        let mut phase = Phase::new(format!("p{p}"), format!("Phase {p}"), p as u32 + 1);
        for _ in 0..*count {
            phase = phase.with_wave(Wave::new(
                format!("w{wave_no}"),
                format!("Wave {wave_no}"),
                vec![Task::new(format!("t{wave_no}"), "Task")],
            ));
            wave_no += 1;
        }
        plan = plan.with_phase(phase);
    }
    plan
}

#[tokio::test]
async fn test_per_wave_checkpoints_and_event_stream() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let (tx, mut rx) = mpsc::channel(256);

    let mut plan = plan_of_waves(&[2, 1]);
    plan.checkpoint_frequency = CheckpointFrequency::PerWave;

    let controller = ExecutionController::new(plan, Arc::new(MockExecutor::new()))
        .expect("valid plan")
        .with_checkpoint_store(Arc::clone(&store) as Arc<dyn CheckpointStore>)
        .with_events(tx);

    let report = controller.execute().await.expect("plan runs");
    assert_eq!(report.state, ExecutionState::Completed);

    assert_eq!(
        store.list().await.expect("list"),
        vec!["plan-wave-0", "plan-wave-1", "plan-wave-2"]
    );

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(ExecutionEvent::Started { .. })));
    assert!(matches!(events.last(), Some(ExecutionEvent::Completed { .. })));
    let phase_count = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::PhaseCompleted { .. }))
        .count();
    assert_eq!(phase_count, 2);
}

#[tokio::test]
async fn test_per_phase_checkpoints_leave_ring_per_wave() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut plan = plan_of_waves(&[2, 1]);
    plan.checkpoint_frequency = CheckpointFrequency::PerPhase;

    let controller = ExecutionController::new(plan, Arc::new(MockExecutor::new()))
        .expect("valid plan")
        .with_checkpoint_store(Arc::clone(&store) as Arc<dyn CheckpointStore>);

    controller.execute().await.expect("plan runs");

    assert_eq!(
        store.list().await.expect("list"),
        vec!["plan-phase-p0", "plan-phase-p1"]
    );
    // The rollback ring still holds exactly one capture per wave.
    assert_eq!(controller.status().await.snapshots_available, 3);
}

#[tokio::test]
async fn test_halt_and_resume_round_trip() {
    let executor = MockExecutor::new().with_default_delay(Duration::from_millis(10));
    let controller =
        Arc::new(ExecutionController::new(plan_of_waves(&[5]), Arc::new(executor)).expect("plan"));

    let running = Arc::clone(&controller);
    let handle = tokio::spawn(async move { running.execute().await });

    tokio::time::sleep(Duration::from_millis(22)).await;
    controller.halt().await;
    let report = handle.await.expect("join").expect("halted run is ok");
    assert_eq!(report.state, ExecutionState::Halted);

    let status = controller.status().await;
    assert_eq!(status.state, ExecutionState::Halted);
    assert!(status.wave_index < 5);
    assert!(status.halt_latency_ms.expect("latency recorded") < 100);

    let report = controller.resume().await.expect("resume runs");
    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(report.phase_results.len(), 1);
    assert_eq!(controller.status().await.wave_index, 5);
}

#[tokio::test]
async fn test_rollback_and_rerun() {
    let controller =
        ExecutionController::new(plan_of_waves(&[4]), Arc::new(MockExecutor::new())).expect("plan");
    controller.execute().await.expect("plan runs");
    assert_eq!(controller.status().await.snapshots_available, 4);

    // Two snapshots back was captured before the third wave.
    let restored = controller.rollback(2).await.expect("within range");
    assert_eq!(restored, 2);
    assert_eq!(controller.status().await.state, ExecutionState::Idle);

    let report = controller.execute().await.expect("continues from wave 2");
    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(controller.status().await.wave_index, 4);
}

#[tokio::test]
async fn test_snapshot_ring_evicts_oldest() {
    let controller =
        ExecutionController::new(plan_of_waves(&[4]), Arc::new(MockExecutor::new()))
            .expect("plan")
            .with_snapshot_capacity(2)
            .expect("valid capacity");
    controller.execute().await.expect("plan runs");

    let status = controller.status().await;
    assert_eq!(status.snapshots_available, 2);

    let err = controller.rollback(3).await.expect_err("out of range");
    assert!(matches!(
        err,
        OrchestratorError::Rollback {
            requested: 3,
            available: 2
        }
    ));
    assert_eq!(controller.status().await.state, ExecutionState::Completed);
}

#[tokio::test]
async fn test_gate_failure_abort_fails_the_run() {
    let executor = MockExecutor::new();
    executor.script("bad", MockOutcome::always_fail("boom")).await;

    let plan = ExecutionPlan::new("plan", "Plan").with_phase(
        Phase::new("p0", "Phase", 1).with_wave(
            Wave::new(
                "w0",
                "Wave",
                vec![Task::new("good", "Task"), Task::new("bad", "Task")],
            )
            .with_validation(true),
        ),
    );

    let controller = ExecutionController::new(plan, Arc::new(executor))
        .expect("plan")
        .with_approval_service(Arc::new(AbortApproval));

    let err = controller.execute().await.expect_err("aborted");
    assert!(matches!(err, OrchestratorError::Orchestration(_)));
    assert_eq!(controller.status().await.state, ExecutionState::Failed);
}

#[tokio::test]
async fn test_gate_failure_proceeds_under_auto_approval() {
    let executor = MockExecutor::new();
    executor.script("bad", MockOutcome::always_fail("boom")).await;

    let plan = ExecutionPlan::new("plan", "Plan").with_phase(
        Phase::new("p0", "Phase", 1).with_wave(
            Wave::new(
                "w0",
                "Wave",
                vec![Task::new("good", "Task"), Task::new("bad", "Task")],
            )
            .with_validation(true),
        ),
    );

    let controller = ExecutionController::new(plan, Arc::new(executor))
        .expect("plan")
        .with_approval_service(Arc::new(AutoApprovalService::new()));

    let report = controller.execute().await.expect("proceeds");
    assert_eq!(report.state, ExecutionState::Completed);
    assert!(!report.phase_results[0].validation_passed);
}

#[tokio::test]
async fn test_manual_checkpoint_and_restore() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut plan = plan_of_waves(&[2]);
    plan.checkpoint_frequency = CheckpointFrequency::Manual;

    let controller = ExecutionController::new(plan, Arc::new(MockExecutor::new()))
        .expect("plan")
        .with_checkpoint_store(Arc::clone(&store) as Arc<dyn CheckpointStore>);

    controller.execute().await.expect("plan runs");
    // No automatic checkpoints in manual mode.
    assert!(store.is_empty().await);

    // An explicit checkpoint persists to the store without growing the
    // rollback ring.
    let ring_before = controller.status().await.snapshots_available;
    controller.checkpoint("after-run").await.expect("saved");
    assert_eq!(
        controller.status().await.snapshots_available,
        ring_before
    );
    let restored = controller
        .restore_checkpoint("after-run")
        .await
        .expect("restored");
    assert_eq!(restored, 2);
    assert_eq!(controller.status().await.state, ExecutionState::Idle);

    // Nothing left to run; executing again finishes immediately.
    let report = controller.execute().await.expect("continues");
    assert_eq!(report.state, ExecutionState::Completed);
}
