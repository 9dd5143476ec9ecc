use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::generation::TextGenerator;
use parley_core::ids::JobId;
use parley_core::jobs::{JobSnapshot, JobStatus, SimulationResult};
use parley_core::messages::SimulationRequest;
use parley_engine::{build_simulation_graph, DialogueEngine, DialogueOptions};

use crate::error::CoordinatorError;

const CANCELLED_MESSAGE: &str = "Simulation was cancelled";

/// Budgets applied to every job the coordinator runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Overall wall-clock budget per job. `None` means unlimited.
    pub job_timeout: Option<Duration>,
    pub dialogue: DialogueOptions,
}

enum JobPhase {
    Pending,
    Running { started_at: Instant },
    Completed(SimulationResult),
    Failed(String),
}

impl JobPhase {
    fn status(&self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::Running { .. } => JobStatus::Running,
            Self::Completed(_) => JobStatus::Completed,
            Self::Failed(_) => JobStatus::Failed,
        }
    }
}

struct JobRecord {
    request: Arc<SimulationRequest>,
    phase: JobPhase,
}

impl JobRecord {
    fn snapshot(&self, job_id: &JobId) -> JobSnapshot {
        let (result, error) = match &self.phase {
            JobPhase::Completed(result) => (Some(result.clone()), None),
            JobPhase::Failed(message) => (None, Some(message.clone())),
            JobPhase::Pending | JobPhase::Running { .. } => (None, None),
        };
        JobSnapshot {
            job_id: job_id.clone(),
            status: self.phase.status(),
            result,
            error,
        }
    }
}

/// Execution-side state of a job, kept apart from what callers see.
struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<JobId, JobRecord>,
    runs: HashMap<JobId, ActiveRun>,
}

/// How one execution of the dialogue engine ended.
enum RunOutcome {
    Completed(SimulationResult),
    Failed(String),
    TimedOut(Duration),
    Cancelled,
}

struct Shared {
    registry: Mutex<Registry>,
    config: CoordinatorConfig,
}

/// Owns every submitted job and the task running it.
///
/// Cloning is cheap and every clone sees the same registry. The registry
/// lock is only held for bookkeeping, never across generation calls.
#[derive(Clone)]
pub struct SimulationCoordinator {
    shared: Arc<Shared>,
}

impl SimulationCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    /// Register a new job and start it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        request: SimulationRequest,
        generator: Arc<dyn TextGenerator>,
    ) -> JobSnapshot {
        let job_id = JobId::new();
        let request = Arc::new(request);
        let cancel = CancellationToken::new();

        info!(
            job_id = %job_id,
            turns = request.turns,
            participants = request.participants.len(),
            generator = generator.name(),
            "simulation submitted"
        );

        // Record and handle go in under one acquisition. The task's first step
        // takes the same lock, so its entry always exists before it can finish.
        let mut registry = self.shared.registry.lock();
        let record = JobRecord {
            request: Arc::clone(&request),
            phase: JobPhase::Pending,
        };
        let snapshot = record.snapshot(&job_id);
        registry.jobs.insert(job_id.clone(), record);

        let shared = Arc::clone(&self.shared);
        let task_id = job_id.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            shared.drive(task_id, request, generator, task_cancel).await;
        });
        registry.runs.insert(job_id, ActiveRun { cancel, handle });

        snapshot
    }

    /// Current state of a job.
    ///
    /// A running job whose budget has lapsed is failed here, before the
    /// snapshot is taken, and its task is asked to stop.
    pub fn get(&self, job_id: &JobId) -> Result<JobSnapshot, CoordinatorError> {
        let mut registry = self.shared.registry.lock();
        let Registry { jobs, runs } = &mut *registry;
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| CoordinatorError::JobNotFound(job_id.clone()))?;

        let overrun = match (&record.phase, self.shared.config.job_timeout) {
            (JobPhase::Running { started_at }, Some(budget)) => {
                let elapsed = started_at.elapsed();
                (elapsed >= budget).then_some((elapsed, budget))
            }
            _ => None,
        };

        if let Some((elapsed, budget)) = overrun {
            warn!(
                job_id = %job_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "simulation over budget at poll, failing"
            );
            record.phase = JobPhase::Failed(timeout_message(budget));
            if let Some(run) = runs.get(job_id) {
                if !run.handle.is_finished() {
                    run.cancel.cancel();
                }
            }
        }

        Ok(record.snapshot(job_id))
    }

    /// The request a job was submitted with.
    pub fn request(&self, job_id: &JobId) -> Result<Arc<SimulationRequest>, CoordinatorError> {
        self.shared
            .registry
            .lock()
            .jobs
            .get(job_id)
            .map(|record| Arc::clone(&record.request))
            .ok_or_else(|| CoordinatorError::JobNotFound(job_id.clone()))
    }

    /// Number of jobs whose task has not settled yet.
    pub fn active_count(&self) -> usize {
        self.shared.registry.lock().runs.len()
    }

    /// Cancel every outstanding job and wait for its task to settle.
    pub async fn shutdown(&self) {
        let runs: Vec<(JobId, ActiveRun)> = self.shared.registry.lock().runs.drain().collect();
        if runs.is_empty() {
            return;
        }
        info!(count = runs.len(), "cancelling outstanding simulations");

        for (_, run) in &runs {
            run.cancel.cancel();
        }
        for (job_id, run) in runs {
            match run.handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!(job_id = %job_id, error = %e, "simulation task failed to join"),
            }
        }
    }
}

impl Shared {
    async fn drive(
        &self,
        job_id: JobId,
        request: Arc<SimulationRequest>,
        generator: Arc<dyn TextGenerator>,
        cancel: CancellationToken,
    ) {
        if !self.mark_running(&job_id) {
            self.registry.lock().runs.remove(&job_id);
            return;
        }

        let engine = DialogueEngine::new(generator, self.config.dialogue.clone());
        let outcome = execute(&engine, &request, &cancel, self.config.job_timeout).await;
        self.finish(&job_id, outcome);
    }

    fn mark_running(&self, job_id: &JobId) -> bool {
        let mut registry = self.registry.lock();
        match registry.jobs.get_mut(job_id) {
            Some(record) if matches!(record.phase, JobPhase::Pending) => {
                record.phase = JobPhase::Running {
                    started_at: Instant::now(),
                };
                debug!(job_id = %job_id, "simulation running");
                true
            }
            _ => false,
        }
    }

    /// Record a run's outcome unless the job already left Running.
    fn finish(&self, job_id: &JobId, outcome: RunOutcome) {
        let mut registry = self.registry.lock();
        registry.runs.remove(job_id);
        let Some(record) = registry.jobs.get_mut(job_id) else {
            return;
        };
        if !matches!(record.phase, JobPhase::Running { .. }) {
            debug!(job_id = %job_id, status = %record.phase.status(), "late outcome discarded");
            return;
        }

        record.phase = match outcome {
            RunOutcome::Completed(result) => {
                info!(job_id = %job_id, messages = result.messages.len(), "simulation completed");
                JobPhase::Completed(result)
            }
            RunOutcome::Failed(message) => {
                warn!(job_id = %job_id, error = %message, "simulation failed");
                JobPhase::Failed(message)
            }
            RunOutcome::TimedOut(budget) => {
                warn!(
                    job_id = %job_id,
                    budget_ms = budget.as_millis() as u64,
                    "simulation timed out"
                );
                JobPhase::Failed(timeout_message(budget))
            }
            RunOutcome::Cancelled => {
                info!(job_id = %job_id, "simulation cancelled");
                JobPhase::Failed(CANCELLED_MESSAGE.to_string())
            }
        };
    }
}

async fn execute(
    engine: &DialogueEngine,
    request: &SimulationRequest,
    cancel: &CancellationToken,
    budget: Option<Duration>,
) -> RunOutcome {
    let run = AssertUnwindSafe(engine.run(request, cancel)).catch_unwind();
    let result = match budget {
        Some(budget) => match tokio::time::timeout(budget, run).await {
            Ok(result) => result,
            Err(_) => return RunOutcome::TimedOut(budget),
        },
        None => run.await,
    };

    match result {
        Ok(Ok(output)) => {
            let graph = build_simulation_graph(request, &output.messages, &output.summary);
            RunOutcome::Completed(SimulationResult {
                messages: output.messages,
                summary: output.summary,
                graph,
            })
        }
        Ok(Err(e)) if e.is_cancelled() => RunOutcome::Cancelled,
        Ok(Err(e)) => RunOutcome::Failed(e.to_string()),
        Err(panic) => {
            let msg = panic_message(&panic);
            error!(panic = %msg, "simulation panicked");
            RunOutcome::Failed(format!("Simulation crashed: {msg}"))
        }
    }
}

fn timeout_message(budget: Duration) -> String {
    format!("Simulation exceeded the configured timeout of {budget:?}")
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}
