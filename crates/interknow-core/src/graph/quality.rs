//! Content quality gate
//!
//! Judges whether a structurally valid graph is semantically acceptable:
//! relations must carry information, nodes must span enough disciplines and
//! enough edges must cross discipline boundaries. Low-value edges are filtered
//! out; a shortfall only ever produces a verdict, never an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::model::{Discipline, Edge, Node, distinct_disciplines};

/// Vague relation terms. ASCII entries match whole words, others substrings.
const GENERIC_RELATION_PATTERNS: &[&str] = &[
    "有关", "相关", "联系", "关系", "影响", "作用", "涉及", "包含", "属于", "是一种", "一种", "类似",
    "相似", "相互", "关联",
    "related to", "relates to", "relation", "relationship", "associated with", "connected to",
    "linked to", "affects", "affect", "influences", "influence", "involves", "involve",
    "includes", "include", "belongs to", "is a", "kind of", "similar to", "interacts with",
];

/// Mechanism verbs that make a relation informative even when it is vague
const INFORMATIVE_RELATION_KEYWORDS: &[&str] = &[
    "用于", "导致", "推导", "定义", "推广", "对应", "解释", "建模", "优化", "学习", "编码", "度量",
    "估计", "约束", "预测", "控制", "演化", "证明", "依赖", "实现",
    "used for", "causes", "derives", "derived from", "defines", "generalizes", "corresponds to",
    "explains", "models", "optimizes", "learns", "encodes", "measures", "estimates",
    "constrains", "predicts", "controls", "evolves", "proves", "depends on", "implements",
];

/// Tunable thresholds for the content check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub min_disciplines: usize,
    pub min_valid_links: usize,
    pub min_relation_len: usize,
    pub max_relation_len: usize,
    pub max_generic_relation_ratio: f64,
    pub min_cross_discipline_edge_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_disciplines: 3,
            min_valid_links: 6,
            min_relation_len: 4,
            max_relation_len: 40,
            max_generic_relation_ratio: 0.55,
            min_cross_discipline_edge_ratio: 0.25,
        }
    }
}

/// Outcome of one content check. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ValidationVerdict {
    pub kept_edges: Vec<Edge>,
    pub warnings: Vec<String>,
    pub needs_regeneration: bool,
    pub reason: String,
    pub discipline_count: usize,
    /// Kept edges before any backfill
    pub informative_count: usize,
    pub generic_ratio: Option<f64>,
    pub cross_discipline_ratio: Option<f64>,
}

impl ValidationVerdict {
    /// Candidate score: 10 per kept edge plus one per distinct discipline
    pub fn score(&self) -> usize {
        self.kept_edges.len() * 10 + self.discipline_count
    }
}

/// Semantic gate applied after structural validation
#[derive(Debug, Clone, Default)]
pub struct ContentQualityGate {
    thresholds: QualityThresholds,
}

impl ContentQualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Run the content check over a structurally valid graph
    pub fn check(&self, nodes: &[Node], links: &[Edge]) -> ValidationVerdict {
        let t = &self.thresholds;
        let mut warnings = Vec::new();

        let mut kept: Vec<Edge> = Vec::new();
        let mut discarded: Vec<Edge> = Vec::new();
        let mut considered = 0usize;
        let mut generic_total = 0usize;
        let mut generic_discarded = 0usize;

        for edge in links {
            let relation = edge.relation.trim();
            if relation.is_empty() {
                continue;
            }
            considered += 1;

            let generic = is_generic_relation(relation);
            if generic {
                generic_total += 1;
            }

            if is_informative_relation(relation, t.min_relation_len, t.max_relation_len) {
                kept.push(edge.clone());
            } else {
                if generic {
                    generic_discarded += 1;
                }
                discarded.push(edge.clone());
            }
        }

        if kept.len() < links.len() {
            warnings.push(format!(
                "content_check: filtered {} low-quality relations",
                links.len() - kept.len()
            ));
        }
        if generic_discarded > 0 {
            warnings.push(format!(
                "content_check: generic relations filtered = {}",
                generic_discarded
            ));
        }

        let discipline_count = distinct_disciplines(nodes);
        let too_few_disciplines = discipline_count < t.min_disciplines;
        if too_few_disciplines {
            warnings.push(format!(
                "content_check: discipline coverage too low ({}<{}), disciplines={:?}",
                discipline_count,
                t.min_disciplines,
                sorted_disciplines(nodes)
            ));
        }

        let cross_ratio = cross_discipline_ratio(nodes, &kept);
        let cross_too_low = match cross_ratio {
            Some((ratio, cross, total)) if ratio < t.min_cross_discipline_edge_ratio => {
                warnings.push(format!(
                    "content_check: cross-discipline edge ratio too low ({:.2} < {}), cross={}/{}",
                    ratio, t.min_cross_discipline_edge_ratio, cross, total
                ));
                true
            }
            _ => false,
        };

        let generic_ratio = (considered > 0).then(|| generic_total as f64 / considered as f64);
        let too_generic = match generic_ratio {
            Some(ratio) if ratio > t.max_generic_relation_ratio => {
                warnings.push(format!(
                    "content_check: too many generic relations (ratio={:.2} > {})",
                    ratio, t.max_generic_relation_ratio
                ));
                true
            }
            _ => false,
        };

        let informative_count = kept.len();
        let too_few_links = informative_count < t.min_valid_links;
        if too_few_links {
            warnings.push(format!(
                "content_check: too few valid links after filtering ({}<{})",
                informative_count, t.min_valid_links
            ));

            let need = t.min_valid_links - informative_count;
            if !discarded.is_empty() {
                let restored = need.min(discarded.len());
                kept.extend(discarded.into_iter().take(restored));
                warnings.push(format!(
                    "content_check: relaxed filter to keep +{} links",
                    restored
                ));
            }
        }

        let needs_regeneration = too_few_disciplines || too_generic || too_few_links || cross_too_low;
        let reason = warnings.join("; ");

        ValidationVerdict {
            kept_edges: kept,
            warnings,
            needs_regeneration,
            reason,
            discipline_count,
            informative_count,
            generic_ratio,
            cross_discipline_ratio: cross_ratio.map(|(ratio, _, _)| ratio),
        }
    }
}

/// Whether a relation is too vague to carry information on its own
pub fn is_generic_relation(relation: &str) -> bool {
    let relation = relation.trim();
    if relation.is_empty() {
        return true;
    }
    matches_any(relation, GENERIC_RELATION_PATTERNS)
}

/// Whether a relation is informative enough to keep
///
/// Length is measured in characters. A generic relation survives only when it
/// also names a mechanism.
pub fn is_informative_relation(relation: &str, min_len: usize, max_len: usize) -> bool {
    let relation = relation.trim();
    let len = relation.chars().count();
    if len < min_len || len > max_len {
        return false;
    }
    matches_any(relation, INFORMATIVE_RELATION_KEYWORDS) || !is_generic_relation(relation)
}

fn matches_any(relation: &str, patterns: &[&str]) -> bool {
    let words = word_padded(relation);
    patterns.iter().any(|pattern| {
        if pattern.is_ascii() {
            words.contains(&format!(" {} ", pattern))
        } else {
            relation.contains(pattern)
        }
    })
}

/// Lowercased text with non-alphanumeric ASCII turned into spaces and padded,
/// so ASCII patterns only match on word boundaries
fn word_padded(text: &str) -> String {
    let body: String = text
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_alphanumeric() {
                ' '
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect();
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(" {} ", collapsed)
}

/// (ratio, cross, total) over edges whose endpoints both carry a discipline
fn cross_discipline_ratio(nodes: &[Node], edges: &[Edge]) -> Option<(f64, usize, usize)> {
    let by_id: HashMap<&str, Discipline> =
        nodes.iter().map(|n| (n.id.as_str(), n.discipline)).collect();

    let mut total = 0usize;
    let mut cross = 0usize;
    for edge in edges {
        let (Some(source), Some(target)) =
            (by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str()))
        else {
            continue;
        };
        total += 1;
        if source != target {
            cross += 1;
        }
    }

    (total > 0).then(|| (cross as f64 / total as f64, cross, total))
}

fn sorted_disciplines(nodes: &[Node]) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = nodes.iter().map(|n| n.discipline.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    names
}
