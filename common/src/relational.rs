use std::sync::Arc;

use crate::{db::SurrealDbClient, error::AppError};

/// Typed façade over the relational half of the SurrealDB connection.
/// Individual table access lives on each model type in [`crate::model`];
/// this client exists for operations that cut across tables (transactions,
/// health probes) rather than duplicating per-table methods.
pub struct RelationalStoreClient {
    db: Arc<SurrealDbClient>,
}

impl RelationalStoreClient {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<SurrealDbClient> {
        &self.db
    }

    /// A trivial round-trip used by the `status` operation to report
    /// relational-store reachability without assuming any table exists.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.db.client.query("RETURN 1").await?;
        Ok(())
    }
}
