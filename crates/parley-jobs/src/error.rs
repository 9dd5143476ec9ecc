use parley_core::ids::JobId;

/// Failures raised synchronously to callers of the coordinator.
///
/// Everything that goes wrong while a job runs is recorded on the job
/// itself; only lookups of unknown identifiers surface here.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("simulation job not found: {0}")]
    JobNotFound(JobId),
}
