pub mod dialogue;
pub mod error;
pub mod graph;
pub mod prompt;

pub use dialogue::{DialogueEngine, DialogueOptions, DialogueOutput};
pub use error::DialogueError;
pub use graph::build_simulation_graph;
