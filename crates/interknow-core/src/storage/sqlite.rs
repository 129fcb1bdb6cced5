//! SQLite implementation of the ConceptStore
//!
//! Graphs are stored as JSON text keyed by the trimmed concept. Usage counters
//! live in a single-row table updated with an in-place increment.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::graph::ConceptGraph;

use super::database::Database;
use super::repository::{ConceptStore, UsageTotals};

/// SQLite implementation of the concept store
#[derive(Clone)]
pub struct SqliteConceptStore {
    pool: SqlitePool,
}

impl SqliteConceptStore {
    /// Create a new store over an existing pool (migrations must have run)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a store sharing the database's pool
    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

#[derive(FromRow)]
struct GraphRow {
    graph: String,
}

#[derive(FromRow)]
struct UsageRow {
    total_tokens: i64,
    total_counts: i64,
}

#[async_trait]
impl ConceptStore for SqliteConceptStore {
    async fn get(&self, concept: &str) -> Result<Option<ConceptGraph>> {
        let row: Option<GraphRow> =
            sqlx::query_as("SELECT graph FROM concept_graphs WHERE concept = ?")
                .bind(concept)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.graph)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, concept: &str, graph: &ConceptGraph) -> Result<()> {
        let graph_json = serde_json::to_string(graph)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO concept_graphs (concept, graph, token_cost, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(concept) DO UPDATE SET
                graph = excluded.graph,
                token_cost = excluded.token_cost,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(concept)
        .bind(&graph_json)
        .bind(graph.token_cost as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(
            concept = %concept,
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "Concept graph saved"
        );
        Ok(())
    }

    async fn increment_usage(&self, tokens: u64, counts: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_totals (id, total_tokens, total_counts, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                total_tokens = total_tokens + excluded.total_tokens,
                total_counts = total_counts + excluded.total_counts,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(tokens as i64)
        .bind(counts as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn usage_totals(&self) -> Result<UsageTotals> {
        let row: Option<UsageRow> =
            sqlx::query_as("SELECT total_tokens, total_counts FROM usage_totals WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .map(|r| UsageTotals {
                total_tokens: r.total_tokens.max(0) as u64,
                total_counts: r.total_counts.max(0) as u64,
            })
            .unwrap_or_default())
    }

    async fn list_concepts(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT concept FROM concept_graphs ORDER BY concept")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM concept_graphs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
