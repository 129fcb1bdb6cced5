//! Bounded multi-attempt graph synthesis
//!
//! One concept resolves in at most two generation calls:
//!
//! ```text
//! initial ──parse ok──> content check ──pass──────────────> finalize
//!    │                        └─needs regeneration─> regenerate ─> select ─> finalize
//!    └─parse failed─> repair ─> content check (filter only) ──> finalize
//! ```
//!
//! Repair and regeneration are mutually exclusive. Every failure collapses to
//! an empty graph carrying a machine-readable warning; nothing is raised.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::graph::{ConceptGraph, ContentQualityGate, extract_json, finalize, validate};
use crate::llm::TextGenerator;

use super::prompts::{build_prompt, force_json_repair_prompt, stronger_prompt_for_regen};

/// Size caps and per-call time bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub max_nodes: usize,
    pub max_links: usize,
    pub call_timeout: Duration,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for GenerationLimits {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            max_links: config.max_links,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }
}

/// Terminal failure classes of a synthesis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// First call failed, timed out, or returned blank text
    EmptyOutput,
    /// The repair call itself failed
    RepairCallFailed,
    /// Output still unparseable after repair
    UnreadableOutput,
    /// Winning candidate had no nodes left
    NoValidNodes,
}

impl FailureKind {
    /// Machine-readable warning prefix
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::EmptyOutput => "llm_output_empty_or_unreadable",
            FailureKind::RepairCallFailed => "repair_call_failed",
            FailureKind::UnreadableOutput => "llm_output_unreadable_after_repair",
            FailureKind::NoValidNodes => "no_valid_nodes_after_validation",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of one synthesis run
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    /// Finalized winner, or an empty graph carrying the failure warning
    pub graph: ConceptGraph,
    pub failure: Option<FailureKind>,
    /// Generation calls issued (1 or 2)
    pub attempts: usize,
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether the graph may be persisted and registered in the filter
    pub fn is_cacheable(&self) -> bool {
        self.is_success() && !self.graph.is_empty()
    }
}

/// Per-run accounting shared by every attempt
#[derive(Default)]
struct Run {
    tokens: u64,
    attempts: usize,
    warnings: Vec<String>,
}

impl Run {
    fn fail(self, kind: FailureKind, detail: impl std::fmt::Display) -> SynthesisOutcome {
        warn!(failure = %kind, tokens = self.tokens, "Graph synthesis failed");
        SynthesisOutcome {
            graph: ConceptGraph::empty_with_warning(format!("{}: {}", kind.code(), detail), self.tokens),
            failure: Some(kind),
            attempts: self.attempts,
        }
    }
}

/// Drives generation, repair, regeneration and finalization for a concept
#[derive(Clone)]
pub struct GraphSynthesisOrchestrator {
    generator: Arc<dyn TextGenerator>,
    gate: ContentQualityGate,
    limits: GenerationLimits,
}

impl GraphSynthesisOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        gate: ContentQualityGate,
        limits: GenerationLimits,
    ) -> Self {
        Self {
            generator,
            gate,
            limits,
        }
    }

    pub fn limits(&self) -> &GenerationLimits {
        &self.limits
    }

    /// Synthesize a finalized graph for an already-trimmed concept
    pub async fn synthesize(&self, concept: &str) -> SynthesisOutcome {
        let mut run = Run::default();
        let limits = self.limits;

        info!(concept = %concept, "Generating concept graph");
        let prompt = build_prompt(concept, limits.max_nodes, limits.max_links);
        let text = match self.call(&mut run, &prompt).await {
            Ok(text) => text,
            Err(e) => return run.fail(FailureKind::EmptyOutput, e),
        };
        if text.trim().is_empty() {
            return run.fail(FailureKind::EmptyOutput, "blank response");
        }

        let mut notes = Vec::new();
        let winner = match self.parse(&text) {
            Ok(candidate) => {
                let (candidate, verdict) = self.apply_gate(candidate);
                run.warnings.extend(candidate.warnings.iter().cloned());

                if verdict.needs_regeneration {
                    self.regenerate(concept, &verdict.reason, candidate, &mut run, &mut notes)
                        .await
                } else {
                    candidate
                }
            }
            Err(parse_error) => {
                warn!(concept = %concept, error = %parse_error, "Unreadable output, requesting repair");
                let prompt = force_json_repair_prompt(&text, concept, limits.max_nodes, limits.max_links);
                let repaired = match self.call(&mut run, &prompt).await {
                    Ok(text) => text,
                    Err(e) => return run.fail(FailureKind::RepairCallFailed, e),
                };
                let candidate = match self.parse(&repaired) {
                    Ok(candidate) => candidate,
                    Err(e) => return run.fail(FailureKind::UnreadableOutput, e),
                };

                // Repaired output is filtered but never regenerated
                let (candidate, _) = self.apply_gate(candidate);
                run.warnings.extend(candidate.warnings.iter().cloned());
                notes.push(format!("repair: recovered from unreadable output ({})", parse_error));
                candidate
            }
        };

        if winner.is_empty() {
            return run.fail(FailureKind::NoValidNodes, "no valid nodes after validation");
        }

        let mut graph = winner;
        graph.warnings = std::mem::take(&mut run.warnings);
        finalize(&mut graph, concept, notes, run.tokens);

        info!(
            concept = %concept,
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            tokens = graph.token_cost,
            attempts = run.attempts,
            "Concept graph synthesized"
        );

        SynthesisOutcome {
            graph,
            failure: None,
            attempts: run.attempts,
        }
    }

    /// One regeneration attempt; the original stands if it cannot be improved on
    async fn regenerate(
        &self,
        concept: &str,
        reason: &str,
        original: ConceptGraph,
        run: &mut Run,
        notes: &mut Vec<String>,
    ) -> ConceptGraph {
        let reason = if reason.trim().is_empty() {
            "content_check_failed"
        } else {
            reason
        };
        info!(concept = %concept, reason = %reason, "Content check failed, regenerating");

        let prompt = stronger_prompt_for_regen(
            concept,
            reason,
            self.gate.thresholds().min_disciplines,
            self.limits.max_nodes,
            self.limits.max_links,
        );

        let text = match self.call(run, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(concept = %concept, error = %e, "Regeneration call failed, keeping original");
                notes.push(format!("regeneration_failed: {}", e));
                return original;
            }
        };

        let candidate = match self.parse(&text) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(concept = %concept, error = %e, "Regenerated output unusable, keeping original");
                notes.push(format!("regeneration_unreadable: {}", e));
                return original;
            }
        };

        let (candidate, _) = self.apply_gate(candidate);
        run.warnings.extend(candidate.warnings.iter().cloned());

        let (old_score, new_score) = (original.score(), candidate.score());
        if new_score >= old_score {
            info!(concept = %concept, old_score, new_score, "Using regenerated candidate");
            candidate
        } else {
            info!(concept = %concept, old_score, new_score, "Keeping original candidate");
            notes.push(format!(
                "regeneration: kept original candidate (score {} > {})",
                old_score, new_score
            ));
            original
        }
    }

    /// Issue one bounded generation call, charging its tokens to the run
    async fn call(&self, run: &mut Run, prompt: &str) -> Result<String> {
        run.attempts += 1;
        let timeout = self.limits.call_timeout;

        let generation = tokio::time::timeout(timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| Error::GenerationTimeout(timeout.as_secs()))??;

        run.tokens += generation.usage.total();
        Ok(generation.text)
    }

    fn parse(&self, text: &str) -> Result<ConceptGraph> {
        let raw = extract_json(text)?;
        validate(&raw, self.limits.max_nodes, self.limits.max_links)
    }

    /// Replace the candidate's edges with the gate's kept set
    fn apply_gate(&self, mut candidate: ConceptGraph) -> (ConceptGraph, crate::graph::ValidationVerdict) {
        let verdict = self.gate.check(&candidate.nodes, &candidate.links);
        candidate.links = verdict.kept_edges.clone();
        candidate.warnings = verdict.warnings.clone();
        (candidate, verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Generation, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned responses in order
    struct Scripted {
        replies: Mutex<Vec<Result<Generation>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Generation>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<Generation> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::LLMError("script exhausted".into())))
        }
    }

    fn reply(text: &str, tokens: u64) -> Result<Generation> {
        Ok(Generation::new(text, TokenUsage::new(0, 0, tokens)))
    }

    fn orchestrator(generator: Arc<Scripted>) -> GraphSynthesisOrchestrator {
        GraphSynthesisOrchestrator::new(generator, ContentQualityGate::default(), GenerationLimits::default())
    }

    const GOOD: &str = r#"{
        "nodes": [
            {"id": "h", "name": "熵", "category": "物理学"},
            {"id": "i", "name": "信息熵", "category": "计算机科学"},
            {"id": "p", "name": "概率分布", "category": "数学"},
            {"id": "e", "name": "进化", "category": "生物学"}
        ],
        "links": [
            {"source": "h", "target": "i", "relation": "推广为信息度量"},
            {"source": "p", "target": "i", "relation": "用于定义信息熵"},
            {"source": "p", "target": "h", "relation": "用于推导玻尔兹曼熵"},
            {"source": "e", "target": "h", "relation": "受热力学第二定律约束"},
            {"source": "i", "target": "e", "relation": "度量遗传信息编码"},
            {"source": "h", "target": "p", "relation": "对应最大熵分布"}
        ]
    }"#;

    #[tokio::test]
    async fn test_accepted_on_first_attempt() {
        let generator = Scripted::new(vec![reply(GOOD, 900)]);
        let outcome = orchestrator(generator.clone()).synthesize("熵").await;

        assert!(outcome.is_cacheable());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.graph.token_cost, 900);
        assert_eq!(outcome.graph.links.len(), 6);
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_first_reply_is_empty_output() {
        let generator = Scripted::new(vec![reply("   ", 12)]);
        let outcome = orchestrator(generator.clone()).synthesize("熵").await;

        assert_eq!(outcome.failure, Some(FailureKind::EmptyOutput));
        assert!(outcome.graph.is_empty());
        assert_eq!(outcome.graph.token_cost, 12);
        assert!(outcome.graph.warnings[0].starts_with("llm_output_empty_or_unreadable"));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_repair_failure_classes() {
        let generator = Scripted::new(vec![
            reply("not json at all", 5),
            Err(Error::LLMError("boom".into())),
        ]);
        let outcome = orchestrator(generator).synthesize("熵").await;
        assert_eq!(outcome.failure, Some(FailureKind::RepairCallFailed));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.graph.token_cost, 5);

        let generator = Scripted::new(vec![reply("not json", 5), reply("still not json", 6)]);
        let outcome = orchestrator(generator).synthesize("熵").await;
        assert_eq!(outcome.failure, Some(FailureKind::UnreadableOutput));
        assert_eq!(outcome.graph.token_cost, 11);
        assert!(!outcome.is_cacheable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_is_upstream_failure() {
        struct Stalled;

        #[async_trait]
        impl TextGenerator for Stalled {
            async fn generate(&self, _prompt: &str) -> Result<Generation> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Generation::default())
            }
        }

        let limits = GenerationLimits {
            call_timeout: Duration::from_secs(5),
            ..GenerationLimits::default()
        };
        let orchestrator =
            GraphSynthesisOrchestrator::new(Arc::new(Stalled), ContentQualityGate::default(), limits);

        let outcome = orchestrator.synthesize("熵").await;
        assert_eq!(outcome.failure, Some(FailureKind::EmptyOutput));
        assert!(outcome.graph.warnings[0].contains("timed out after 5 seconds"));
    }
}
