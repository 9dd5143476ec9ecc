//! Domain types shared across the parley crates.

pub mod errors;
pub mod generation;
pub mod graph;
pub mod ids;
pub mod jobs;
pub mod messages;

pub use errors::GenerationError;
pub use generation::{GenerateOptions, TextGenerator};
pub use graph::{GraphEdge, GraphNode, GraphSnapshot};
pub use ids::JobId;
pub use jobs::{JobSnapshot, JobStatus, SimulationResult};
pub use messages::{ChatMessage, Participant, RequestError, SimulationRequest};
