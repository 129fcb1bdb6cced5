//! Graph synthesis - prompts and the generation state machine

pub mod orchestrator;
pub mod prompts;

pub use orchestrator::{FailureKind, GenerationLimits, GraphSynthesisOrchestrator, SynthesisOutcome};
