//! InterKnow Core Library
//!
//! Turns a free-text concept into a validated, cross-disciplinary knowledge
//! graph using a generative text model, and caches the result so each
//! concept is generated once:
//! - Membership filter gating cache lookups
//! - Graph model, structural validation and content quality gate
//! - Generation / repair / regeneration state machine
//! - Cache coordination over pluggable storage (SQLite or in-memory)
//! - OpenAI-compatible LLM client
//! - Configuration with file persistence

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod llm;
pub mod storage;
pub mod synthesis;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::CacheCoordinator;
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::filter::MembershipFilter;
    pub use crate::graph::{ConceptGraph, Discipline, GraphView};
    pub use crate::llm::{Generation, LlmClient, TextGenerator, TokenUsage};
    pub use crate::storage::{ConceptStore, InMemoryConceptStore, SqliteConceptStore, UsageTotals};
    pub use crate::synthesis::{FailureKind, GraphSynthesisOrchestrator, SynthesisOutcome};
}
