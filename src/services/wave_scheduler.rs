//! Wave scheduling: drives one wave's task set to a `WaveResult` under a
//! selectable strategy.
//!
//! Concurrency is bounded, not unconstrained: a semaphore limits the
//! number of simultaneously in-flight tasks to the wave's `max_parallel`,
//! and the permit is released deterministically whether the task
//! succeeds, fails, times out, or is cancelled. The halt signal is
//! checked between every task dispatch, so pause latency is bounded by
//! the smallest unit of schedulable work.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{Task, TaskResult, TaskStatus, Wave, WaveResult, WaveStatus, WaveStrategy};
use crate::services::confidence_gate::ConfidenceGate;
use crate::services::dependency_resolver::DependencyResolver;
use crate::services::events::{emit, EventSender, ExecutionEvent};
use crate::services::halt::HaltSignal;
use crate::services::task_runner::TaskRunner;

/// Drives one wave at a time. Stateless between invocations; the
/// `WaveResult` is owned exclusively by the invocation that produced it.
pub struct WaveScheduler {
    runner: Arc<TaskRunner>,
    gate: ConfidenceGate,
}

impl WaveScheduler {
    /// Create a scheduler around a task runner and a validation gate.
    pub fn new(runner: Arc<TaskRunner>, gate: ConfidenceGate) -> Self {
        Self { runner, gate }
    }

    /// Execute one wave to completion (or to the halt signal).
    ///
    /// Individual task failures never surface here; they are recorded in
    /// the result. An `Err` is reserved for structural problems such as
    /// an invalid wave or an unresolved dependency cycle.
    pub async fn execute_wave(
        &self,
        wave: &Wave,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<WaveResult> {
        wave.validate()?;

        let mut result = WaveResult::new(&wave.id, wave.tasks.len());
        info!(
            wave_id = %wave.id,
            strategy = wave.strategy.as_str(),
            tasks = wave.tasks.len(),
            "Wave started"
        );

        let halted = match wave.strategy {
            WaveStrategy::Parallel => self.run_parallel(wave, &mut result, halt, events).await?,
            WaveStrategy::Sequential => self.run_sequential(wave, &mut result, halt, events).await?,
            WaveStrategy::Dependency => self.run_dependency(wave, &mut result, halt, events).await?,
            WaveStrategy::Priority => self.run_priority(wave, &mut result, halt, events).await?,
        };

        result.status = if halted {
            WaveStatus::Halted
        } else {
            result.derived_status()
        };

        result.confidence = if wave.require_validation {
            self.gate.score_wave(&result)?.overall
        } else {
            result.success_rate()
        };
        result.validation_passed = result.confidence >= wave.confidence_threshold
            && result.success_rate() >= wave.min_success_rate;

        info!(
            wave_id = %wave.id,
            status = result.status.as_str(),
            completed = result.completed_tasks,
            failed = result.failed_tasks,
            confidence = result.confidence,
            "Wave finished"
        );
        emit(
            events,
            ExecutionEvent::WaveCompleted {
                wave_id: wave.id.clone(),
                status: result.status,
                completed: result.completed_tasks,
                failed: result.failed_tasks,
                confidence: result.confidence,
            },
        );

        Ok(result)
    }

    /// Ignore declared dependencies; run declaration-order chunks of
    /// `max_parallel` tasks, each chunk concurrently, in chunk order.
    async fn run_parallel(
        &self,
        wave: &Wave,
        result: &mut WaveResult,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<bool> {
        let mut remaining: Vec<&Task> = wave.tasks.iter().collect();
        while !remaining.is_empty() {
            let chunk_len = remaining.len().min(wave.max_parallel);
            let chunk: Vec<Task> = remaining.drain(..chunk_len).map(Clone::clone).collect();

            if halt.is_halted() {
                return Ok(true);
            }
            let halted = self.run_group(&chunk, wave, result, halt, events).await?;
            if halted {
                return Ok(true);
            }
            if wave.fail_fast && result.failed_tasks > 0 {
                cancel_tasks(result, remaining.iter().map(|t| t.id.clone()));
                break;
            }
        }
        Ok(false)
    }

    /// One task at a time, in declared order.
    async fn run_sequential(
        &self,
        wave: &Wave,
        result: &mut WaveResult,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<bool> {
        for (idx, task) in wave.tasks.iter().enumerate() {
            if halt.is_halted() {
                return Ok(true);
            }
            let task_result = self
                .runner
                .run(task, wave.retry_on_failure, halt, events)
                .await;
            let failed = !task_result.status.is_success();
            result.record(task_result);

            if wave.fail_fast && failed {
                cancel_tasks(result, wave.tasks[idx + 1..].iter().map(|t| t.id.clone()));
                break;
            }
        }
        Ok(false)
    }

    /// Dependency-respecting layers, each layer's groups executed
    /// concurrently up to `max_parallel`.
    async fn run_dependency(
        &self,
        wave: &Wave,
        result: &mut WaveResult,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<bool> {
        let resolver = DependencyResolver::new(&wave.tasks);
        let groups = resolver.parallel_groups(wave.max_parallel)?;
        let by_id: HashMap<&str, &Task> =
            wave.tasks.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut pending: Vec<Vec<Vec<String>>> = groups;
        while !pending.is_empty() {
            let layer = pending.remove(0);
            for (group_idx, group) in layer.iter().enumerate() {
                if halt.is_halted() {
                    return Ok(true);
                }
                let tasks: Vec<Task> = group
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).map(|t| (*t).clone()))
                    .collect();
                let halted = self.run_group(&tasks, wave, result, halt, events).await?;
                if halted {
                    return Ok(true);
                }

                if wave.fail_fast && result.failed_tasks > 0 {
                    // Cancel everything not yet started: later groups in
                    // this layer plus all remaining layers.
                    let untouched = layer[group_idx + 1..]
                        .iter()
                        .flatten()
                        .cloned()
                        .chain(pending.iter().flatten().flatten().cloned());
                    cancel_tasks(result, untouched);
                    return Ok(false);
                }
            }
        }
        Ok(false)
    }

    /// Repeatedly run the highest-priority ready tasks, up to
    /// `max_parallel` at a time.
    async fn run_priority(
        &self,
        wave: &Wave,
        result: &mut WaveResult,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<bool> {
        let resolver = DependencyResolver::new(&wave.tasks);
        if let Some(err) = resolver.validate().into_iter().next() {
            return Err(err);
        }

        let mut completed: HashSet<String> = HashSet::new();
        let mut terminal: HashSet<String> = HashSet::new();

        while terminal.len() < wave.tasks.len() {
            if halt.is_halted() {
                return Ok(true);
            }

            let mut ready: Vec<&Task> = wave
                .tasks
                .iter()
                .filter(|t| !terminal.contains(&t.id))
                .filter(|t| t.depends_on.iter().all(|dep| completed.contains(dep)))
                .collect();

            if ready.is_empty() {
                // Tasks whose dependencies terminated without success can
                // never become ready; they are blocked, not cyclic.
                let blocked: Vec<String> = wave
                    .tasks
                    .iter()
                    .filter(|t| !terminal.contains(&t.id))
                    .filter(|t| {
                        t.depends_on
                            .iter()
                            .any(|dep| terminal.contains(dep) && !completed.contains(dep))
                    })
                    .map(|t| t.id.clone())
                    .collect();

                if blocked.is_empty() {
                    let stuck: Vec<String> = wave
                        .tasks
                        .iter()
                        .filter(|t| !terminal.contains(&t.id))
                        .map(|t| t.id.clone())
                        .collect();
                    return Err(OrchestratorError::Orchestration(format!(
                        "no ready tasks among remaining {stuck:?}; latent dependency cycle"
                    )));
                }

                warn!(wave_id = %wave.id, blocked = blocked.len(), "Cancelling tasks blocked by failed dependencies");
                for id in blocked {
                    terminal.insert(id.clone());
                    result.record(TaskResult::cancelled(id));
                }
                continue;
            }

            // Stable sort keeps declaration order among equal priorities.
            ready.sort_by_key(|t| std::cmp::Reverse(t.priority));
            let batch: Vec<Task> = ready
                .into_iter()
                .take(wave.max_parallel)
                .cloned()
                .collect();

            let before = result.task_results.len();
            let halted = self.run_group(&batch, wave, result, halt, events).await?;
            for task_result in &result.task_results[before..] {
                terminal.insert(task_result.task_id.clone());
                if task_result.status.is_success() {
                    completed.insert(task_result.task_id.clone());
                }
            }
            if halted {
                return Ok(true);
            }

            if wave.fail_fast && result.failed_tasks > 0 {
                let untouched: Vec<String> = wave
                    .tasks
                    .iter()
                    .filter(|t| !terminal.contains(&t.id))
                    .map(|t| t.id.clone())
                    .collect();
                for id in &untouched {
                    terminal.insert(id.clone());
                }
                cancel_tasks(result, untouched.into_iter());
                break;
            }
        }
        Ok(false)
    }

    /// Run one group of tasks concurrently, bounded by the wave's
    /// semaphore. Returns true if the halt signal interrupted dispatch.
    async fn run_group(
        &self,
        tasks: &[Task],
        wave: &Wave,
        result: &mut WaveResult,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> OrchestratorResult<bool> {
        let semaphore = Arc::new(Semaphore::new(wave.max_parallel));
        let mut handles = Vec::with_capacity(tasks.len());
        let mut halted = false;

        for task in tasks {
            // Waiting for a permit is a halt suspension point: latency is
            // bounded by one task's duration, never the whole group's.
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => {
                    permit.map_err(|_| {
                        OrchestratorError::Orchestration("parallelism gate closed".to_string())
                    })?
                }
                () = halt.halted() => {
                    halted = true;
                    break;
                }
            };

            let runner = Arc::clone(&self.runner);
            let task = task.clone();
            let halt = halt.clone();
            let events = events.cloned();
            let retry_timed_out = wave.retry_on_failure;
            let task_id = task.id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                runner.run(&task, retry_timed_out, &halt, events.as_ref()).await
            });
            handles.push((task_id, handle));
        }

        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(id, handle)| async move { (id, handle.await) }),
        )
        .await;
        for (task_id, outcome) in joined {
            match outcome {
                Ok(task_result) => result.record(task_result),
                Err(join_err) => {
                    // A panicking executor is recorded, not propagated.
                    warn!(task_id = %task_id, error = %join_err, "Task panicked");
                    let mut task_result = TaskResult::started(&task_id);
                    task_result.error = Some(format!("task panicked: {join_err}"));
                    task_result.finish(TaskStatus::Failed);
                    result.record(task_result);
                }
            }
        }

        Ok(halted)
    }
}

/// Mark untouched tasks as cancelled so they are never left unaccounted.
fn cancel_tasks(result: &mut WaveResult, ids: impl Iterator<Item = String>) {
    for id in ids {
        result.record(TaskResult::cancelled(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_executor::{MockExecutor, MockOutcome};
    use std::time::Duration;

    fn scheduler(executor: MockExecutor) -> WaveScheduler {
        let runner = Arc::new(
            TaskRunner::new(Arc::new(executor)).with_backoff_base(Duration::from_millis(1)),
        );
        WaveScheduler::new(runner, ConfidenceGate::new(0.8).unwrap())
    }

    fn task(id: &str, deps: &[&str]) -> Task {
        let mut t = Task::new(id, format!("Task {id}"));
        for dep in deps {
            t = t.with_dependency(*dep);
        }
        t
    }

    #[tokio::test]
    async fn test_parallel_wave_completes() {
        let scheduler = scheduler(MockExecutor::new());
        let wave = Wave::new("w1", "Wave", vec![task("a", &[]), task("b", &[]), task("c", &[])])
            .with_strategy(WaveStrategy::Parallel)
            .with_max_parallel(2);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.status, WaveStatus::Completed);
        assert_eq!(result.completed_tasks, 3);
        assert!((result.confidence - 1.0).abs() < 1e-9);
        assert!(result.validation_passed);
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_cancels_remaining() {
        let executor = MockExecutor::new();
        executor.script("b", MockOutcome::always_fail("boom")).await;
        let scheduler = scheduler(executor);

        let wave = Wave::new("w1", "Wave", vec![task("a", &[]), task("b", &[]), task("c", &[])])
            .with_strategy(WaveStrategy::Sequential)
            .with_fail_fast(true);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.completed_tasks, 1);
        assert_eq!(result.failed_tasks, 1);
        let cancelled: Vec<&str> = result
            .task_results
            .iter()
            .filter(|r| r.status == TaskStatus::Cancelled)
            .map(|r| r.task_id.as_str())
            .collect();
        assert_eq!(cancelled, vec!["c"]);
    }

    #[tokio::test]
    async fn test_retry_example_two_of_three() {
        // Wave of 3, fail-fast off, max-retries 1: t1 succeeds, t2 fails
        // both attempts, t3 succeeds.
        let executor = MockExecutor::new();
        executor.script("t2", MockOutcome::always_fail("broken")).await;
        let scheduler = scheduler(executor);

        let tasks = vec![
            task("t1", &[]).with_max_retries(1),
            task("t2", &[]).with_max_retries(1),
            task("t3", &[]).with_max_retries(1),
        ];
        let wave = Wave::new("w1", "Wave", tasks).with_strategy(WaveStrategy::Parallel);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.completed_tasks, 2);
        assert_eq!(result.failed_tasks, 1);
        let t2 = result
            .task_results
            .iter()
            .find(|r| r.task_id == "t2")
            .unwrap();
        assert_eq!(t2.retry_count, 1);
    }

    #[tokio::test]
    async fn test_dependency_strategy_orders_layers() {
        let scheduler = scheduler(MockExecutor::new());
        let tasks = vec![task("c", &["a", "b"]), task("a", &[]), task("b", &[])];
        let wave = Wave::new("w1", "Wave", tasks).with_strategy(WaveStrategy::Dependency);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.completed_tasks, 3);
        // c finishes last: it runs in the second layer.
        assert_eq!(result.task_results.last().unwrap().task_id, "c");
    }

    #[tokio::test]
    async fn test_dependency_strategy_rejects_cycle() {
        let scheduler = scheduler(MockExecutor::new());
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let wave = Wave::new("w1", "Wave", tasks).with_strategy(WaveStrategy::Dependency);

        let err = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DependencyCycle(_)));
    }

    #[tokio::test]
    async fn test_priority_strategy_runs_urgent_first() {
        let scheduler = scheduler(MockExecutor::new());
        let tasks = vec![
            task("low", &[]).with_priority(1),
            task("high", &[]).with_priority(10),
        ];
        let wave = Wave::new("w1", "Wave", tasks)
            .with_strategy(WaveStrategy::Priority)
            .with_max_parallel(1);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.task_results[0].task_id, "high");
        assert_eq!(result.task_results[1].task_id, "low");
    }

    #[tokio::test]
    async fn test_priority_strategy_cancels_blocked_dependents() {
        let executor = MockExecutor::new();
        executor.script("a", MockOutcome::always_fail("boom")).await;
        let scheduler = scheduler(executor);

        let tasks = vec![task("a", &[]), task("b", &["a"])];
        let wave = Wave::new("w1", "Wave", tasks).with_strategy(WaveStrategy::Priority);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        assert_eq!(result.failed_tasks, 1);
        let b = result
            .task_results
            .iter()
            .find(|r| r.task_id == "b")
            .unwrap();
        assert_eq!(b.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_min_success_rate_gates_validation() {
        let executor = MockExecutor::new();
        executor.script("b", MockOutcome::always_fail("boom")).await;
        let scheduler = scheduler(executor);

        let wave = Wave::new("w1", "Wave", vec![task("a", &[]), task("b", &[])])
            .with_strategy(WaveStrategy::Parallel)
            .with_confidence_threshold(0.4)
            .with_min_success_rate(0.9);

        let result = scheduler
            .execute_wave(&wave, &HaltSignal::new(), None)
            .await
            .unwrap();
        // Confidence (0.5) clears the threshold but the success rate
        // misses the floor.
        assert!(!result.validation_passed);
    }

    #[tokio::test]
    async fn test_halt_interrupts_dispatch() {
        let executor = MockExecutor::new().with_default_delay(Duration::from_millis(20));
        let scheduler = scheduler(executor);
        let tasks: Vec<Task> = (0..10).map(|i| task(&format!("t{i}"), &[])).collect();
        let wave = Wave::new("w1", "Wave", tasks)
            .with_strategy(WaveStrategy::Sequential)
            .with_max_parallel(1);

        let halt = HaltSignal::new();
        let halt_trigger = halt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            halt_trigger.trigger();
        });

        let result = scheduler.execute_wave(&wave, &halt, None).await.unwrap();
        assert_eq!(result.status, WaveStatus::Halted);
        assert!(result.task_results.len() < 10);
    }
}
