//! Presentation finalization for the winning candidate
//!
//! Fills blank descriptions, prunes isolated nodes and recomputes visual
//! weights. Every step is deterministic given the same edge set, so running
//! finalization twice yields the same graph.

use std::collections::{HashMap, HashSet};

use super::model::{ConceptGraph, Edge, Node};

/// Lower bound of the visual weight scale
pub const MIN_VISUAL_WEIGHT: u32 = 10;
/// Upper bound of the visual weight scale
pub const MAX_VISUAL_WEIGHT: u32 = 50;
/// Weight added per incident edge
const WEIGHT_PER_EDGE: u32 = 6;

/// Finalize a graph in place for the given concept
///
/// `extra_warnings` are appended after the graph's own warnings; the token
/// cost replaces whatever the candidate carried.
pub fn finalize(graph: &mut ConceptGraph, concept: &str, extra_warnings: Vec<String>, token_cost: u64) {
    fill_default_descriptions(graph, concept);

    let pruned = prune_isolated_nodes(graph, concept);
    if pruned > 0 {
        graph
            .warnings
            .push(format!("sanitize: pruned {} isolated nodes", pruned));
    }

    refresh_visual_weights(graph);
    graph.warnings.extend(extra_warnings);
    graph.token_cost = token_cost;
}

/// Give every node and edge without a description a templated default
pub fn fill_default_descriptions(graph: &mut ConceptGraph, concept: &str) {
    for node in graph.nodes.iter_mut().filter(|n| n.description.trim().is_empty()) {
        node.description = format!("{}：与“{}”相关的概念。", node.name, concept);
    }

    for edge in graph.links.iter_mut().filter(|e| e.description.trim().is_empty()) {
        edge.description = format!(
            "{}：描述 {} → {} 与“{}”的关联。",
            edge.relation, edge.source, edge.target, concept
        );
    }
}

/// Drop nodes that appear in no edge, keeping the node named after the concept
///
/// Returns the number of pruned nodes.
pub fn prune_isolated_nodes(graph: &mut ConceptGraph, concept: &str) -> usize {
    let used: HashSet<&str> = graph
        .links
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();

    let before = graph.nodes.len();
    let kept: Vec<Node> = graph
        .nodes
        .iter()
        .filter(|n| used.contains(n.id.as_str()) || n.name.trim() == concept)
        .cloned()
        .collect();
    graph.nodes = kept;

    before - graph.nodes.len()
}

/// Recompute every node's visual weight from its current edge degree
pub fn refresh_visual_weights(graph: &mut ConceptGraph) {
    let degrees = degrees(&graph.nodes, &graph.links);
    for (node, degree) in graph.nodes.iter_mut().zip(degrees) {
        node.visual_weight = visual_weight(degree);
    }
}

/// clamp(10 + max(1, degree)·6, 10, 50)
pub fn visual_weight(degree: usize) -> u32 {
    let degree = degree.clamp(1, MAX_VISUAL_WEIGHT as usize) as u32;
    (MIN_VISUAL_WEIGHT + degree * WEIGHT_PER_EDGE).clamp(MIN_VISUAL_WEIGHT, MAX_VISUAL_WEIGHT)
}

/// Edge degree of each node, in node order
fn degrees(nodes: &[Node], links: &[Edge]) -> Vec<usize> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut degrees = vec![0; nodes.len()];
    for edge in links {
        for endpoint in [edge.source.as_str(), edge.target.as_str()] {
            if let Some(&i) = index.get(endpoint) {
                degrees[i] += 1;
            }
        }
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::Discipline;

    fn node(id: &str, name: &str) -> Node {
        Node {
            id: id.to_string(),
            name: name.to_string(),
            raw_category: "数学".to_string(),
            discipline: Discipline::Mathematics,
            description: String::new(),
            visual_weight: 0,
        }
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            relation: "用于推导".to_string(),
            short_relation: "用于推导".to_string(),
            description: String::new(),
        }
    }

    fn sample() -> ConceptGraph {
        ConceptGraph {
            nodes: vec![
                node("core", "熵"),
                node("a", "玻尔兹曼分布"),
                node("b", "信息论"),
                node("lonely", "孤立概念"),
            ],
            links: vec![edge("a", "b"), edge("a", "b"), edge("b", "a")],
            warnings: vec!["content_check: something".into()],
            token_cost: 0,
        }
    }

    #[test]
    fn test_visual_weight_scale() {
        assert_eq!(visual_weight(0), 16);
        assert_eq!(visual_weight(1), 16);
        assert_eq!(visual_weight(3), 28);
        assert_eq!(visual_weight(6), 46);
        assert_eq!(visual_weight(7), 50);
        assert_eq!(visual_weight(1_000), 50);

        let mut last = 0;
        for degree in 0..20 {
            let w = visual_weight(degree);
            assert!((MIN_VISUAL_WEIGHT..=MAX_VISUAL_WEIGHT).contains(&w));
            assert!(w >= last);
            last = w;
        }
    }

    #[test]
    fn test_finalize_prunes_but_keeps_concept_node() {
        let mut graph = sample();
        finalize(&mut graph, "熵", vec!["attempt 1: regenerated".into()], 1234);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["core", "a", "b"]);
        assert_eq!(graph.token_cost, 1234);
        assert_eq!(
            graph.warnings,
            vec![
                "content_check: something".to_string(),
                "sanitize: pruned 1 isolated nodes".to_string(),
                "attempt 1: regenerated".to_string(),
            ]
        );
        assert_eq!(graph.node("a").unwrap().visual_weight, 28);
        assert_eq!(graph.node("core").unwrap().visual_weight, 16);
    }

    #[test]
    fn test_refresh_visual_weights_from_degree() {
        let mut graph = sample();
        graph.links.push(edge("core", "ghost"));
        refresh_visual_weights(&mut graph);

        let weights: Vec<u32> = graph.nodes.iter().map(|n| n.visual_weight).collect();
        // core 1, a 3, b 3, lonely 0 (floored to one edge); ghost is ignored
        assert_eq!(weights, vec![16, 28, 28, 16]);
    }

    #[test]
    fn test_default_descriptions() {
        let mut graph = sample();
        graph.nodes[1].description = "已有描述".into();
        fill_default_descriptions(&mut graph, "熵");

        assert_eq!(graph.nodes[0].description, "熵：与“熵”相关的概念。");
        assert_eq!(graph.nodes[1].description, "已有描述");
        assert_eq!(graph.links[0].description, "用于推导：描述 a → b 与“熵”的关联。");
    }

    #[test]
    fn test_finalization_is_idempotent() {
        let mut graph = sample();
        finalize(&mut graph, "熵", Vec::new(), 10);
        let once = graph.clone();

        finalize(&mut graph, "熵", Vec::new(), 10);
        assert_eq!(graph.nodes, once.nodes);
        assert_eq!(graph.links, once.links);

        let weights: Vec<u32> = graph.nodes.iter().map(|n| n.visual_weight).collect();
        refresh_visual_weights(&mut graph);
        let again: Vec<u32> = graph.nodes.iter().map(|n| n.visual_weight).collect();
        assert_eq!(weights, again);
    }
}
