//! Concept graph data model
//!
//! `ConceptGraph` is the artifact produced for one concept. `GraphView` is the
//! caller-facing rendering of it, with denormalized endpoint names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical discipline tag used to measure cross-domain coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Mathematics,
    Physics,
    ComputerScience,
    Biology,
    PhilosophySocial,
}

/// Accepted labels per discipline. ASCII labels are matched case-insensitively.
const DISCIPLINE_ALIASES: &[(&str, Discipline)] = &[
    ("数学", Discipline::Mathematics),
    ("mathematics", Discipline::Mathematics),
    ("math", Discipline::Mathematics),
    ("maths", Discipline::Mathematics),
    ("物理学", Discipline::Physics),
    ("物理", Discipline::Physics),
    ("physics", Discipline::Physics),
    ("计算机科学", Discipline::ComputerScience),
    ("计算机", Discipline::ComputerScience),
    ("computer science", Discipline::ComputerScience),
    ("cs", Discipline::ComputerScience),
    ("computing", Discipline::ComputerScience),
    ("生物学", Discipline::Biology),
    ("生物", Discipline::Biology),
    ("biology", Discipline::Biology),
    ("哲学/社会科学", Discipline::PhilosophySocial),
    ("社会科学", Discipline::PhilosophySocial),
    ("哲学", Discipline::PhilosophySocial),
    ("社会学", Discipline::PhilosophySocial),
    ("philosophy/social science", Discipline::PhilosophySocial),
    ("philosophy", Discipline::PhilosophySocial),
    ("social science", Discipline::PhilosophySocial),
    ("social sciences", Discipline::PhilosophySocial),
    ("sociology", Discipline::PhilosophySocial),
];

impl Discipline {
    /// All disciplines, in prompt order
    pub const ALL: [Discipline; 5] = [
        Discipline::Mathematics,
        Discipline::Physics,
        Discipline::ComputerScience,
        Discipline::Biology,
        Discipline::PhilosophySocial,
    ];

    /// Normalize a generator-provided category label
    pub fn normalize(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        let lowered = label.to_ascii_lowercase();
        DISCIPLINE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, discipline)| *discipline)
    }

    /// Label used in prompts (the generator answers in these terms)
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Discipline::Mathematics => "数学",
            Discipline::Physics => "物理学",
            Discipline::ComputerScience => "计算机科学",
            Discipline::Biology => "生物学",
            Discipline::PhilosophySocial => "哲学/社会科学",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Mathematics => "mathematics",
            Discipline::Physics => "physics",
            Discipline::ComputerScience => "computer_science",
            Discipline::Biology => "biology",
            Discipline::PhilosophySocial => "philosophy_social",
        }
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concept node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Category label exactly as the generator produced it
    pub raw_category: String,
    pub discipline: Discipline,
    #[serde(default)]
    pub description: String,
    /// Presentation hint in [10, 50], recomputed on every finalization
    #[serde(default)]
    pub visual_weight: u32,
}

/// A relation between two nodes of the same graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: String,
    pub short_relation: String,
    #[serde(default)]
    pub description: String,
}

impl Edge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Knowledge graph synthesized for one concept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Edge>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub token_cost: u64,
}

impl ConceptGraph {
    /// Empty graph carrying a single diagnostic
    pub fn empty_with_warning(warning: impl Into<String>, token_cost: u64) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            warnings: vec![warning.into()],
            token_cost,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Number of distinct disciplines across nodes
    pub fn discipline_count(&self) -> usize {
        distinct_disciplines(&self.nodes)
    }

    /// Candidate score: links dominate, discipline coverage breaks ties
    pub fn score(&self) -> usize {
        self.links.len() * 10 + self.discipline_count()
    }

    /// Caller-facing view with endpoint names resolved
    pub fn to_view(&self) -> GraphView {
        GraphView::from(self)
    }
}

pub(crate) fn distinct_disciplines(nodes: &[Node]) -> usize {
    let mut seen: Vec<Discipline> = nodes.iter().map(|n| n.discipline).collect();
    seen.sort();
    seen.dedup();
    seen.len()
}

/// Truncate a relation for display: first `max_len - 1` chars plus an ellipsis
pub fn shorten_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_len.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Node as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub discipline: Discipline,
    pub value: u32,
    pub description: String,
}

/// Edge as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub source_name: Vec<String>,
    pub target_name: Vec<String>,
    pub relation: String,
    pub description: String,
}

/// Graph as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub links: Vec<EdgeView>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub tokens: u64,
}

impl From<&ConceptGraph> for GraphView {
    fn from(graph: &ConceptGraph) -> Self {
        let names: HashMap<&str, &str> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.name.as_str()))
            .collect();
        let resolve = |id: &str| -> Vec<String> {
            names.get(id).map(|n| vec![n.to_string()]).unwrap_or_default()
        };

        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|n| NodeView {
                    id: n.id.clone(),
                    name: n.name.clone(),
                    discipline: n.discipline,
                    value: n.visual_weight,
                    description: n.description.clone(),
                })
                .collect(),
            links: graph
                .links
                .iter()
                .map(|e| EdgeView {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    source_name: resolve(&e.source),
                    target_name: resolve(&e.target),
                    relation: e.relation.clone(),
                    description: e.description.clone(),
                })
                .collect(),
            warnings: graph.warnings.clone(),
            tokens: graph.token_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, discipline: Discipline) -> Node {
        Node {
            id: id.to_string(),
            name: format!("name-{}", id),
            raw_category: discipline.prompt_label().to_string(),
            discipline,
            description: String::new(),
            visual_weight: 0,
        }
    }

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(Discipline::normalize("数学"), Some(Discipline::Mathematics));
        assert_eq!(Discipline::normalize(" 物理 "), Some(Discipline::Physics));
        assert_eq!(Discipline::normalize("社会学"), Some(Discipline::PhilosophySocial));
        assert_eq!(
            Discipline::normalize("Computer Science"),
            Some(Discipline::ComputerScience)
        );
        assert_eq!(Discipline::normalize("化学"), None);
        assert_eq!(Discipline::normalize(""), None);
    }

    #[test]
    fn test_prompt_labels_normalize_back() {
        for discipline in Discipline::ALL {
            assert_eq!(Discipline::normalize(discipline.prompt_label()), Some(discipline));
        }
    }

    #[test]
    fn test_shorten_text() {
        assert_eq!(shorten_text("短关系", 10), "短关系");
        assert_eq!(shorten_text("exactly10!", 10), "exactly10!");
        assert_eq!(shorten_text("用于估计系统的宏观热力学状态", 10), "用于估计系统的宏观…");
        assert_eq!(shorten_text("describes the evolution", 10).chars().count(), 10);
    }

    #[test]
    fn test_score_and_disciplines() {
        let graph = ConceptGraph {
            nodes: vec![
                node("a", Discipline::Mathematics),
                node("b", Discipline::Mathematics),
                node("c", Discipline::Biology),
            ],
            links: vec![Edge {
                source: "a".into(),
                target: "c".into(),
                relation: "用于建模种群".into(),
                short_relation: "用于建模种群".into(),
                description: String::new(),
            }],
            ..Default::default()
        };
        assert_eq!(graph.discipline_count(), 2);
        assert_eq!(graph.score(), 12);
    }

    #[test]
    fn test_view_resolves_names() {
        let graph = ConceptGraph {
            nodes: vec![node("a", Discipline::Physics), node("b", Discipline::Biology)],
            links: vec![Edge {
                source: "a".into(),
                target: "b".into(),
                relation: "驱动细胞代谢".into(),
                short_relation: "驱动细胞代谢".into(),
                description: "d".into(),
            }],
            warnings: vec![],
            token_cost: 42,
        };

        let view = graph.to_view();
        assert_eq!(view.links[0].source_name, vec!["name-a".to_string()]);
        assert_eq!(view.links[0].target_name, vec!["name-b".to_string()]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["tokens"], 42);
        assert!(json["links"][0].get("sourceName").is_some());
        assert!(json.get("warnings").is_none());
    }
}
