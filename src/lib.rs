pub mod generator;
pub mod graph;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod storage;
mod utils;

pub use graph::{GraphDb, GraphRepository};
pub use settings::PipelineSettings;
pub use storage::SnapshotStore;
