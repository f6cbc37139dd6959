use crate::{db::SurrealDbClient, error::AppError, store::StoredObject, stored_object};

stored_object!(EntityMention, "entity_mention", {
    entity_id: Option<String>,
    artifact_uid: String,
    revision_id: String,
    surface_form: String,
    start_char: usize,
    end_char: usize
});

impl EntityMention {
    pub fn new(
        entity_id: Option<String>,
        artifact_uid: String,
        revision_id: String,
        surface_form: String,
        start_char: usize,
        end_char: usize,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: crate::ids::uuid(),
            created_at: now,
            updated_at: now,
            entity_id,
            artifact_uid,
            revision_id,
            surface_form,
            start_char,
            end_char,
        }
    }

    pub async fn delete_by_uid_rev(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<(), AppError> {
        db.client
            .query("DELETE entity_mention WHERE artifact_uid = $uid AND revision_id = $rev")
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        Ok(())
    }

    /// Deletes every mention row for an artifact, across all revisions, for
    /// the `forget` cascade.
    pub async fn delete_by_uid(db: &SurrealDbClient, artifact_uid: &str) -> Result<(), AppError> {
        db.client
            .query("DELETE entity_mention WHERE artifact_uid = $uid")
            .bind(("uid", artifact_uid.to_string()))
            .await?;
        Ok(())
    }
}
