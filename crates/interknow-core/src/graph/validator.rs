//! Structural validation of decoded generator output
//!
//! Enforces the structural contract of a concept graph: size caps, unique
//! non-empty node ids, normalizable categories and edges that only reference
//! surviving nodes. Processing is stable, so truncation and duplicate-id
//! tie-breaks follow the generator's ordering.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

use super::model::{ConceptGraph, Discipline, Edge, Node, shorten_text};

/// Display length for `Edge::short_relation`
pub const SHORT_RELATION_LEN: usize = 10;

/// Validate a decoded candidate and build a structurally sound graph
///
/// Fails with [`Error::Structure`] when the payload is not an object or its
/// `nodes`/`links` fields are not both arrays. A missing field counts as empty.
pub fn validate(raw: &Value, max_nodes: usize, max_links: usize) -> Result<ConceptGraph> {
    let object = raw
        .as_object()
        .ok_or_else(|| Error::Structure("graph payload must be a JSON object".to_string()))?;

    let raw_nodes = array_field(object, "nodes")?;
    let raw_links = array_field(object, "links")?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes = Vec::new();

    for entry in raw_nodes.iter().take(max_nodes) {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let id = text_field(entry, "id");
        let name = text_field(entry, "name");
        if id.is_empty() || name.is_empty() || seen.contains(&id) {
            continue;
        }

        let raw_category = text_field(entry, "category");
        let Some(discipline) = Discipline::normalize(&raw_category) else {
            debug!(node_id = %id, category = %raw_category, "Dropping node with unknown category");
            continue;
        };

        seen.insert(id.clone());
        nodes.push(Node {
            id,
            name,
            raw_category,
            discipline,
            description: text_field(entry, "description"),
            visual_weight: 0,
        });
    }

    let mut links = Vec::new();
    for entry in raw_links.iter().take(max_links) {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let source = text_field(entry, "source");
        let target = text_field(entry, "target");
        let relation = text_field(entry, "relation");
        if source.is_empty() || target.is_empty() || relation.is_empty() {
            continue;
        }
        if !seen.contains(&source) || !seen.contains(&target) {
            continue;
        }

        links.push(Edge {
            short_relation: shorten_text(&relation, SHORT_RELATION_LEN),
            source,
            target,
            relation,
            description: text_field(entry, "description"),
        });
    }

    debug!(
        nodes_in = raw_nodes.len(),
        nodes_out = nodes.len(),
        links_in = raw_links.len(),
        links_out = links.len(),
        "Structural validation complete"
    );

    Ok(ConceptGraph {
        nodes,
        links,
        warnings: Vec::new(),
        token_cost: 0,
    })
}

fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a [Value]> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(Error::Structure(format!(
            "invalid graph structure: {} must be a list",
            key
        ))),
    }
}

/// Trimmed string form of a scalar field; empty for missing or nested values
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_id_keeps_first() {
        let raw = json!({
            "nodes": [
                {"id": "a", "name": "X", "category": "数学"},
                {"id": "a", "name": "Y", "category": "物理学"}
            ],
            "links": []
        });

        let graph = validate(&raw, 30, 60).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "a");
        assert_eq!(graph.nodes[0].name, "X");
        assert_eq!(graph.nodes[0].discipline, Discipline::Mathematics);
    }

    #[test]
    fn test_rejects_non_list_fields() {
        let raw = json!({"nodes": {"a": 1}, "links": []});
        assert!(matches!(validate(&raw, 30, 60), Err(Error::Structure(_))));

        let raw = json!({"nodes": [], "links": "none"});
        assert!(validate(&raw, 30, 60).is_err());

        assert!(validate(&json!([1, 2]), 30, 60).is_err());
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let graph = validate(&json!({}), 30, 60).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_drops_invalid_nodes() {
        let raw = json!({
            "nodes": [
                {"id": "", "name": "no id", "category": "数学"},
                {"id": "b", "name": "  ", "category": "数学"},
                {"id": "c", "name": "化学键", "category": "化学"},
                "not an object",
                {"id": 7, "name": "numeric id", "category": "biology"}
            ],
            "links": []
        });

        let graph = validate(&raw, 30, 60).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "7");
        assert_eq!(graph.nodes[0].raw_category, "biology");
    }

    #[test]
    fn test_edges_never_dangle() {
        let raw = json!({
            "nodes": [
                {"id": "a", "name": "熵", "category": "物理学"},
                {"id": "b", "name": "信息熵", "category": "计算机科学"},
                {"id": "c", "name": "未知", "category": "炼金术"}
            ],
            "links": [
                {"source": "a", "target": "b", "relation": "推广为信息度量"},
                {"source": "a", "target": "c", "relation": "连接到被丢弃节点"},
                {"source": "a", "target": "ghost", "relation": "指向不存在节点"},
                {"source": "b", "target": "a", "relation": ""}
            ]
        });

        let graph = validate(&raw, 30, 60).unwrap();
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(graph.links.len(), 1);
        for link in &graph.links {
            assert!(ids.contains(link.source.as_str()));
            assert!(ids.contains(link.target.as_str()));
        }
    }

    #[test]
    fn test_size_containment() {
        let nodes: Vec<Value> = (0..50)
            .map(|i| json!({"id": format!("n{}", i), "name": format!("N{}", i), "category": "数学"}))
            .collect();
        let links: Vec<Value> = (0..100)
            .map(|i| json!({"source": "n0", "target": format!("n{}", i % 5), "relation": "用于推导定理"}))
            .collect();

        let graph = validate(&json!({"nodes": nodes, "links": links}), 30, 60).unwrap();
        assert_eq!(graph.nodes.len(), 30);
        assert_eq!(graph.links.len(), 60);
        assert_eq!(graph.nodes[29].id, "n29");
    }

    #[test]
    fn test_truncation_happens_before_filtering() {
        let raw = json!({
            "nodes": [
                {"id": "a", "name": "A", "category": "bogus"},
                {"id": "b", "name": "B", "category": "数学"},
                {"id": "c", "name": "C", "category": "数学"}
            ],
            "links": []
        });

        let graph = validate(&raw, 2, 60).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "b");
    }

    #[test]
    fn test_short_relation_derived() {
        let raw = json!({
            "nodes": [
                {"id": "a", "name": "A", "category": "数学"},
                {"id": "b", "name": "B", "category": "物理学"}
            ],
            "links": [
                {"source": "a", "target": "b", "relation": "为热力学第二定律提供统计解释", "description": "  "}
            ]
        });

        let graph = validate(&raw, 30, 60).unwrap();
        assert_eq!(graph.links[0].short_relation, "为热力学第二定律提…");
        assert_eq!(graph.links[0].description, "");
    }
}
