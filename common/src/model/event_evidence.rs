use serde::Deserialize;

use crate::{db::SurrealDbClient, error::AppError, store::StoredObject, stored_object};

stored_object!(EventEvidence, "event_evidence", {
    event_id: String,
    artifact_uid: String,
    revision_id: String,
    chunk_id: Option<String>,
    start_char: usize,
    end_char: usize,
    quote: String
});

impl EventEvidence {
    pub async fn find_by_event(
        db: &SurrealDbClient,
        event_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM event_evidence WHERE event_id = $eid")
            .bind(("eid", event_id.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn find_by_events(
        db: &SurrealDbClient,
        event_ids: &[String],
    ) -> Result<Vec<Self>, AppError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut response = db
            .client
            .query("SELECT * FROM event_evidence WHERE event_id IN $ids")
            .bind(("ids", event_ids.to_vec()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn delete_by_uid_rev(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<(), AppError> {
        db.client
            .query("DELETE event_evidence WHERE artifact_uid = $uid AND revision_id = $rev")
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        Ok(())
    }

    pub async fn count(db: &SurrealDbClient) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }
        let mut response = db
            .client
            .query("SELECT count() FROM event_evidence GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.into_iter().next().map_or(0, |r| r.count))
    }
}
