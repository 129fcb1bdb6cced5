//! In-process concept store for tests and ephemeral runs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::graph::ConceptGraph;

use super::repository::{ConceptStore, UsageTotals};

#[derive(Debug, Default)]
struct State {
    graphs: HashMap<String, ConceptGraph>,
    usage: UsageTotals,
}

/// Concept store backed by a `HashMap`; nothing survives the process
#[derive(Debug, Clone, Default)]
pub struct InMemoryConceptStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryConceptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Other("concept store lock poisoned".to_string())
}

#[async_trait]
impl ConceptStore for InMemoryConceptStore {
    async fn get(&self, concept: &str) -> Result<Option<ConceptGraph>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.graphs.get(concept).cloned())
    }

    async fn put(&self, concept: &str, graph: &ConceptGraph) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.graphs.insert(concept.to_string(), graph.clone());
        Ok(())
    }

    async fn increment_usage(&self, tokens: u64, counts: u64) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.usage.total_tokens += tokens;
        state.usage.total_counts += counts;
        Ok(())
    }

    async fn usage_totals(&self) -> Result<UsageTotals> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.usage)
    }

    async fn list_concepts(&self) -> Result<Vec<String>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut concepts: Vec<String> = state.graphs.keys().cloned().collect();
        concepts.sort();
        Ok(concepts)
    }

    async fn count(&self) -> Result<u64> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.graphs.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(warning: &str) -> ConceptGraph {
        ConceptGraph::empty_with_warning(warning, 7)
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = InMemoryConceptStore::new();
        assert!(store.get("熵").await.unwrap().is_none());

        store.put("熵", &graph("first")).await.unwrap();
        store.put("熵", &graph("second")).await.unwrap();

        let stored = store.get("熵").await.unwrap().unwrap();
        assert_eq!(stored.warnings, vec!["second".to_string()]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_usage_accumulates() {
        let store = InMemoryConceptStore::new();
        store.increment_usage(100, 1).await.unwrap();
        store.increment_usage(0, 1).await.unwrap();

        let totals = store.usage_totals().await.unwrap();
        assert_eq!(totals.total_tokens, 100);
        assert_eq!(totals.total_counts, 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryConceptStore::new();
        let other = store.clone();
        other.put("b", &graph("x")).await.unwrap();
        other.put("a", &graph("y")).await.unwrap();

        assert_eq!(store.list_concepts().await.unwrap(), vec!["a", "b"]);
    }
}
