//! Repository trait for concept graph persistence
//!
//! The cache coordinator only talks to this trait, so the backend (SQLite or
//! in-process memory) is chosen by whoever wires the service together.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::ConceptGraph;

/// Aggregate usage counters across all resolutions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Tokens spent on generation
    pub total_tokens: u64,
    /// Number of resolutions served (hits and misses)
    pub total_counts: u64,
}

/// Durable mapping from concept to its finalized graph
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Fetch the stored graph for a concept
    async fn get(&self, concept: &str) -> Result<Option<ConceptGraph>>;

    /// Insert or replace the graph for a concept (last write wins)
    async fn put(&self, concept: &str, graph: &ConceptGraph) -> Result<()>;

    /// Atomically add to the usage counters
    async fn increment_usage(&self, tokens: u64, counts: u64) -> Result<()>;

    /// Current usage counters
    async fn usage_totals(&self) -> Result<UsageTotals>;

    /// Every stored concept key
    async fn list_concepts(&self) -> Result<Vec<String>>;

    /// Number of stored graphs
    async fn count(&self) -> Result<u64>;
}
