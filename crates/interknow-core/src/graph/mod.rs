//! Concept graph model, validation and finalization
//!
//! - `model`: graph, node and edge types plus the caller-facing view
//! - `extract`: pulls the JSON object out of free-text model output
//! - `validator`: structural contract (ids, referential integrity, size caps)
//! - `quality`: semantic content gate deciding pass or regenerate
//! - `finalize`: presentation defaults, isolated-node pruning, visual weights

pub mod extract;
pub mod finalize;
pub mod model;
pub mod quality;
pub mod validator;

pub use extract::extract_json;
pub use finalize::{finalize, refresh_visual_weights};
pub use model::{ConceptGraph, Discipline, Edge, EdgeView, GraphView, Node, NodeView};
pub use quality::{ContentQualityGate, QualityThresholds, ValidationVerdict};
pub use validator::validate;
