//! Training module: the episode loop that feeds the skill library.

pub mod pipeline;

pub use pipeline::{EpisodeReport, TrainingPipeline, TrainingStats};
