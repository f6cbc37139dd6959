use crate::{db::SurrealDbClient, error::AppError, model::entity::normalize_name, store::StoredObject, stored_object};

stored_object!(EntityAlias, "entity_alias", {
    entity_id: String,
    alias: String,
    normalized_alias: String
});

impl EntityAlias {
    pub fn new(entity_id: String, alias: String) -> Self {
        let now = chrono::Utc::now();
        let normalized_alias = normalize_name(&alias);
        Self {
            id: crate::ids::uuid(),
            created_at: now,
            updated_at: now,
            entity_id,
            alias,
            normalized_alias,
        }
    }

    pub async fn find_by_normalized_alias(
        db: &SurrealDbClient,
        normalized_alias: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM entity_alias WHERE normalized_alias = $alias")
            .bind(("alias", normalized_alias.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    /// Inserts the alias unless `(entity_id, normalized_alias)` already
    /// exists, keeping the table's uniqueness invariant a no-op on repeats.
    pub async fn upsert(db: &SurrealDbClient, entity_id: &str, alias: &str) -> Result<(), AppError> {
        let normalized_alias = normalize_name(alias);
        let existing: Vec<Self> = {
            let mut response = db
                .client
                .query(
                    "SELECT * FROM entity_alias WHERE entity_id = $eid AND normalized_alias = $alias",
                )
                .bind(("eid", entity_id.to_string()))
                .bind(("alias", normalized_alias.clone()))
                .await?;
            response.take(0)?
        };
        if existing.is_empty() {
            db.store_item(Self::new(entity_id.to_string(), alias.to_string()))
                .await?;
        }
        Ok(())
    }
}
