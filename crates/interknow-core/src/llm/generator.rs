//! Text-generation seam used by graph synthesis

use async_trait::async_trait;

use crate::error::Result;

use super::types::Generation;

/// Anything that turns a prompt into text plus token usage
///
/// Implementations make exactly one upstream call per invocation. Retries and
/// escalation belong to the caller.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}
