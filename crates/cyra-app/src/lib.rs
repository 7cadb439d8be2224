//! Training shell for Cyra: population control, generation loop, and run configuration.

pub mod config;
pub mod population;
pub mod trainer;

pub use config::TrainingConfig;
pub use population::{Population, select_elite};
pub use trainer::{
    GenerationOutcome, GenerationSummary, Trainer, TrainerError, TrainingControl, TrainingReport,
};
