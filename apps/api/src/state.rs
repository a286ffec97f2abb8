use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::identity::IdentitySync;
use crate::notifier::NotificationSink;
use crate::profile::schema::SchemaCache;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Identity-provider metadata sync. Default: HTTP admin client.
    /// Held as a trait object so tests can inject a failing sync.
    pub identity: Arc<dyn IdentitySync>,
    /// One-shot completion notification sink (webhook by default).
    pub notifier: Arc<dyn NotificationSink>,
    /// Per-table column sets probed from the live schema, cached for the
    /// lifetime of the process.
    pub schema: SchemaCache,
    pub config: Config,
}
