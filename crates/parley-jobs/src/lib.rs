//! Job registry for background simulations.
//!
//! [`SimulationCoordinator`] accepts requests, runs each one as its own tokio
//! task through the dialogue engine, and serves status polls. A job's overall
//! budget is enforced twice: the task bounds itself with a timer, and every
//! poll re-checks elapsed time so callers see the failure without waiting
//! for the task to unwind.

pub mod coordinator;
pub mod error;

pub use coordinator::{CoordinatorConfig, SimulationCoordinator};
pub use error::CoordinatorError;
