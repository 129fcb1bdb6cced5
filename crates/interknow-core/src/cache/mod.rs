//! Cache coordination - compute each concept graph once, reuse it after
//!
//! The membership filter answers "definitely new" without touching storage.
//! A filter hit is only a hint: the store is authoritative, and a hit that
//! finds nothing falls through to generation. A concept enters the filter only
//! after its graph has been persisted, so the filter never claims a concept
//! storage cannot serve.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::filter::MembershipFilter;
use crate::graph::{ConceptGraph, ContentQualityGate, refresh_visual_weights};
use crate::llm::TextGenerator;
use crate::storage::{ConceptStore, UsageTotals};
use crate::synthesis::{GenerationLimits, GraphSynthesisOrchestrator};

/// Warning returned for blank input
pub const EMPTY_CONCEPT_WARNING: &str = "empty concept";

/// Snapshot of the membership filter's sizing and load
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FilterStats {
    pub bits: usize,
    pub hash_rounds: usize,
    pub inserted: usize,
    pub memory_bytes: usize,
    pub estimated_false_positive_rate: f64,
}

type InFlight = Arc<OnceCell<ConceptGraph>>;

/// Filter + store + orchestrator behind a single `resolve` call
pub struct CacheCoordinator {
    filter: RwLock<MembershipFilter>,
    store: Arc<dyn ConceptStore>,
    orchestrator: GraphSynthesisOrchestrator,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl CacheCoordinator {
    pub fn new(
        filter: MembershipFilter,
        store: Arc<dyn ConceptStore>,
        orchestrator: GraphSynthesisOrchestrator,
    ) -> Self {
        Self {
            filter: RwLock::new(filter),
            store,
            orchestrator,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Wire a coordinator from configuration
    pub fn from_config(
        config: &Config,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ConceptStore>,
    ) -> Result<Self> {
        let filter = MembershipFilter::from_config(&config.filter)?;
        let orchestrator = GraphSynthesisOrchestrator::new(
            generator,
            ContentQualityGate::new(config.quality.clone()),
            GenerationLimits::from(&config.generation),
        );
        Ok(Self::new(filter, store, orchestrator))
    }

    /// Resolve a concept to its graph, generating it at most once
    ///
    /// Never fails: upstream and storage problems surface as warnings on the
    /// returned graph or in the log.
    pub async fn resolve(&self, concept: &str) -> ConceptGraph {
        let concept = concept.trim();
        if concept.is_empty() {
            return ConceptGraph::empty_with_warning(EMPTY_CONCEPT_WARNING, 0);
        }

        if let Some(graph) = self.lookup(concept).await {
            self.record_usage(concept, 0).await;
            return graph;
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(concept.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut generated_here = false;
        let charged = &mut generated_here;
        let graph = cell
            .get_or_init(move || self.fill(concept, charged))
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight
                .get(concept)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(concept);
            }
        }

        if !generated_here {
            debug!(concept = %concept, "Joined in-flight generation");
        }
        let tokens = if generated_here { graph.token_cost } else { 0 };
        self.record_usage(concept, tokens).await;
        graph
    }

    /// Register every stored concept in the filter; returns how many were added
    pub async fn warm(&self) -> Result<usize> {
        let concepts = self.store.list_concepts().await?;
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        for concept in &concepts {
            filter.add(concept);
        }
        info!(concepts = concepts.len(), "Membership filter warmed from storage");
        Ok(concepts.len())
    }

    /// Aggregate usage counters
    pub async fn usage(&self) -> Result<UsageTotals> {
        self.store.usage_totals().await
    }

    /// Whether the filter reports the concept as possibly seen
    pub fn probably_seen(&self, concept: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(concept.trim())
    }

    pub fn filter_stats(&self) -> FilterStats {
        let filter = self.filter.read().unwrap_or_else(PoisonError::into_inner);
        FilterStats {
            bits: filter.bit_len(),
            hash_rounds: filter.hash_rounds(),
            inserted: filter.inserted(),
            memory_bytes: filter.memory_usage(),
            estimated_false_positive_rate: filter.estimated_false_positive_rate(),
        }
    }

    /// Stored graph for a filter hit, with visual weights recomputed
    async fn lookup(&self, concept: &str) -> Option<ConceptGraph> {
        if !self.probably_seen(concept) {
            debug!(concept = %concept, "Filter miss");
            return None;
        }

        match self.store.get(concept).await {
            Ok(Some(mut graph)) => {
                refresh_visual_weights(&mut graph);
                info!(concept = %concept, nodes = graph.nodes.len(), "Cache hit");
                Some(graph)
            }
            Ok(None) => {
                debug!(concept = %concept, "Filter false positive");
                None
            }
            Err(e) => {
                warn!(concept = %concept, error = %e, "Cache lookup failed, regenerating");
                None
            }
        }
    }

    /// Initialize an in-flight cell
    ///
    /// Storage is checked again first: a previous cell for the same concept
    /// may have been filled and removed after this caller's first lookup.
    async fn fill(&self, concept: &str, generated: &mut bool) -> ConceptGraph {
        if let Some(graph) = self.lookup(concept).await {
            return graph;
        }
        *generated = true;
        self.generate_and_store(concept).await
    }

    async fn generate_and_store(&self, concept: &str) -> ConceptGraph {
        let outcome = self.orchestrator.synthesize(concept).await;

        if !outcome.is_cacheable() {
            debug!(concept = %concept, failure = ?outcome.failure, "Outcome not cached");
            return outcome.graph;
        }

        match self.store.put(concept, &outcome.graph).await {
            Ok(()) => {
                self.filter
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .add(concept);
                info!(concept = %concept, tokens = outcome.graph.token_cost, "Concept graph cached");
            }
            Err(e) => {
                warn!(concept = %concept, error = %e, "Failed to persist concept graph");
            }
        }

        outcome.graph
    }

    async fn record_usage(&self, concept: &str, tokens: u64) {
        if let Err(e) = self.store.increment_usage(tokens, 1).await {
            warn!(concept = %concept, tokens, error = %e, "Failed to update usage counters");
        }
    }
}
