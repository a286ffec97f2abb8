//! Schema probe — discovers which columns the current deployment actually
//! has, so writes never assume an optional attribute is present.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::AppError;

/// Queries the live schema for the column set of `table`. A table with no
/// visible columns cannot be written safely, so that probe result is fatal.
pub async fn probe_columns(pool: &PgPool, table: &str) -> Result<HashSet<String>, AppError> {
    let columns: Vec<String> = sqlx::query_scalar(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    if columns.is_empty() {
        return Err(AppError::SchemaProbe(format!(
            "table '{table}' has no visible columns"
        )));
    }

    Ok(columns.into_iter().collect())
}

/// Process-lifetime cache of probed column sets, keyed by table name.
/// The schema cannot change under a running deployment, so the first
/// successful probe per table is reused for every later request.
#[derive(Clone, Default)]
pub struct SchemaCache {
    inner: Arc<RwLock<HashMap<String, Arc<HashSet<String>>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn columns(
        &self,
        pool: &PgPool,
        table: &str,
    ) -> Result<Arc<HashSet<String>>, AppError> {
        if let Some(columns) = self.inner.read().await.get(table) {
            return Ok(columns.clone());
        }

        // Failed probes are not cached; the next request retries.
        let columns = Arc::new(probe_columns(pool, table).await?);
        info!(
            "Probed schema for '{table}': {} columns available",
            columns.len()
        );
        self.inner
            .write()
            .await
            .insert(table.to_string(), columns.clone());
        Ok(columns)
    }
}
