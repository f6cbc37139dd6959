use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::SurrealDbClient, error::AppError, store::StoredObject, stored_object};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Email,
    Doc,
    Chat,
    Transcript,
    Note,
}

impl ArtifactType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::Email => "email",
            ArtifactType::Doc => "doc",
            ArtifactType::Chat => "chat",
            ArtifactType::Transcript => "transcript",
            ArtifactType::Note => "note",
        }
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ArtifactType::Email),
            "doc" => Ok(ArtifactType::Doc),
            "chat" => Ok(ArtifactType::Chat),
            "transcript" => Ok(ArtifactType::Transcript),
            "note" => Ok(ArtifactType::Note),
            other => Err(AppError::Validation(format!(
                "unknown artifact_type '{other}'"
            ))),
        }
    }
}

stored_object!(ArtifactRevision, "artifact_revision", {
    artifact_uid: String,
    revision_id: String,
    artifact_id: String,
    artifact_type: ArtifactType,
    source_system: String,
    source_id: Option<String>,
    source_ts: Option<DateTime<Utc>>,
    content_hash: String,
    token_count: usize,
    is_chunked: bool,
    chunk_count: usize,
    sensitivity: Option<String>,
    visibility_scope: Option<String>,
    retention_policy: Option<String>,
    is_latest: bool,
    ingested_at: DateTime<Utc>,
    conversation_id: Option<String>,
    role: Option<String>,
    turn_index: Option<i64>
});

impl ArtifactRevision {
    pub async fn find_by_uid_rev(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM artifact_revision WHERE artifact_uid = $uid AND revision_id = $rev LIMIT 1")
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        let rows: Vec<Self> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    pub async fn find_by_artifact_id(
        db: &SurrealDbClient,
        artifact_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM artifact_revision WHERE artifact_id = $aid LIMIT 1")
            .bind(("aid", artifact_id.to_string()))
            .await?;
        let rows: Vec<Self> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Turns of a conversation in chronological order, for the `recall`
    /// `conversation_id` lookup path.
    pub async fn find_by_conversation(
        db: &SurrealDbClient,
        conversation_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query(
                "SELECT * FROM artifact_revision WHERE conversation_id = $cid ORDER BY turn_index ASC",
            )
            .bind(("cid", conversation_id.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn find_latest_by_uid(
        db: &SurrealDbClient,
        artifact_uid: &str,
    ) -> Result<Option<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM artifact_revision WHERE artifact_uid = $uid AND is_latest = true LIMIT 1")
            .bind(("uid", artifact_uid.to_string()))
            .await?;
        let rows: Vec<Self> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Demotes any existing `is_latest` row for `artifact_uid` and inserts
    /// `revision` as the new latest, in one relational transaction.
    pub async fn demote_and_insert(
        db: &SurrealDbClient,
        revision: Self,
    ) -> Result<(), AppError> {
        db.client
            .query(
                "BEGIN TRANSACTION;
                 UPDATE artifact_revision SET is_latest = false WHERE artifact_uid = $uid AND is_latest = true;
                 CREATE type::thing('artifact_revision', $id) CONTENT $revision;
                 COMMIT TRANSACTION;",
            )
            .bind(("uid", revision.artifact_uid.clone()))
            .bind(("id", revision.id.clone()))
            .bind(("revision", revision))
            .await?;
        Ok(())
    }

    /// Deletes every revision for `artifact_uid`. Dependent event tables are
    /// deleted separately by the coordinator within the same cascade.
    pub async fn delete_by_uid(db: &SurrealDbClient, artifact_uid: &str) -> Result<(), AppError> {
        db.client
            .query("DELETE artifact_revision WHERE artifact_uid = $uid")
            .bind(("uid", artifact_uid.to_string()))
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
            .query("SELECT count() FROM artifact_revision GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.into_iter().next().map_or(0, |r| r.count))
    }
}
