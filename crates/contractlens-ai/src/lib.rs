//! Contract analysis with a chat-completions model.

pub mod engine;
pub mod generator;
pub mod prompt;

pub use engine::{AnalysisEngine, AnalysisOutcome, DegradedReason};
pub use generator::{GenerationError, GenerationRequest, OpenAiGenerator, TextGenerator};
