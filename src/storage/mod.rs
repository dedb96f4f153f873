pub mod checkpoint;
pub mod results;

// Re-export common types
pub use checkpoint::{CheckpointStore, JsonCheckpoint};
pub use results::{ResultLayout, ResultSet};
