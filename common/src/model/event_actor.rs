use serde::Deserialize;

use crate::{
    db::SurrealDbClient, error::AppError, model::semantic_event::ActorRole, store::StoredObject,
    stored_object,
};

stored_object!(EventActor, "event_actor", {
    event_id: String,
    entity_id: String,
    role: ActorRole
});

impl EventActor {
    pub fn new(event_id: String, entity_id: String, role: ActorRole) -> Self {
        let now = chrono::Utc::now();
        let id = format!("{event_id}:{entity_id}");
        Self {
            id,
            created_at: now,
            updated_at: now,
            event_id,
            entity_id,
            role,
        }
    }

    pub async fn find_by_event(
        db: &SurrealDbClient,
        event_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM event_actor WHERE event_id = $eid")
            .bind(("eid", event_id.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    /// Events that share an actor with any event in `seed_event_ids`,
    /// excluding the seeds themselves (one half of §4.8's 1-hop join).
    pub async fn co_actor_event_ids(
        db: &SurrealDbClient,
        seed_event_ids: &[String],
    ) -> Result<Vec<(String, String)>, AppError> {
        if seed_event_ids.is_empty() {
            return Ok(Vec::new());
        }
        #[derive(Deserialize)]
        struct Row {
            entity_id: String,
        }
        let mut seed_response = db
            .client
            .query("SELECT entity_id FROM event_actor WHERE event_id IN $seeds")
            .bind(("seeds", seed_event_ids.to_vec()))
            .await?;
        let seed_rows: Vec<Row> = seed_response.take(0)?;
        let entity_ids: Vec<String> = seed_rows.into_iter().map(|r| r.entity_id).collect();
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Deserialize)]
        struct NeighborRow {
            event_id: String,
            entity_id: String,
        }
        let mut response = db
            .client
            .query(
                "SELECT DISTINCT event_id, entity_id FROM event_actor
                 WHERE entity_id IN $entities AND event_id NOT IN $seeds",
            )
            .bind(("entities", entity_ids))
            .bind(("seeds", seed_event_ids.to_vec()))
            .await?;
        let rows: Vec<NeighborRow> = response.take(0)?;
        Ok(rows.into_iter().map(|r| (r.event_id, r.entity_id)).collect())
    }

    pub async fn delete_by_event(db: &SurrealDbClient, event_id: &str) -> Result<(), AppError> {
        db.client
            .query("DELETE event_actor WHERE event_id = $eid")
            .bind(("eid", event_id.to_string()))
            .await?;
        Ok(())
    }

    /// Deletes every actor row for a revision's current events. Must run
    /// before the owning `semantic_event` rows are deleted, since it joins
    /// through them.
    pub async fn delete_by_revision(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<(), AppError> {
        db.client
            .query(
                "DELETE event_actor WHERE event_id IN (
                    SELECT VALUE id FROM semantic_event WHERE artifact_uid = $uid AND revision_id = $rev
                 )",
            )
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        Ok(())
    }
}
