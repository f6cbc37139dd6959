use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::SurrealDbClient,
    error::AppError,
    model::{event_actor::EventActor, event_evidence::EventEvidence, event_subject::EventSubjectRow},
    store::StoredObject,
    stored_object,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventCategory {
    Commitment,
    Execution,
    Decision,
    Collaboration,
    QualityRisk,
    Feedback,
    Change,
    Stakeholder,
    Other,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Commitment => "Commitment",
            EventCategory::Execution => "Execution",
            EventCategory::Decision => "Decision",
            EventCategory::Collaboration => "Collaboration",
            EventCategory::QualityRisk => "QualityRisk",
            EventCategory::Feedback => "Feedback",
            EventCategory::Change => "Change",
            EventCategory::Stakeholder => "Stakeholder",
            EventCategory::Other => "Other",
        }
    }

    /// Normalizes an arbitrary LLM-proposed category to the canonical set
    /// case-insensitively, via a small synonym table, falling back to
    /// `Other` for anything unrecognized (§4.4 response handling).
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "commitment" | "promise" | "pledge" => EventCategory::Commitment,
            "execution" | "delivery" | "completion" | "done" => EventCategory::Execution,
            "decision" | "choice" | "resolution" => EventCategory::Decision,
            "collaboration" | "meeting" | "discussion" => EventCategory::Collaboration,
            "qualityrisk" | "quality_risk" | "risk" | "issue" | "bug" => EventCategory::QualityRisk,
            "feedback" | "review" | "comment" => EventCategory::Feedback,
            "change" | "update" | "modification" => EventCategory::Change,
            "stakeholder" | "stakeholder_update" | "announcement" => EventCategory::Stakeholder,
            _ => EventCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Org,
    Project,
    Object,
    Place,
    Other,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Org => "org",
            EntityType::Project => "project",
            EntityType::Object => "object",
            EntityType::Place => "place",
            EntityType::Other => "other",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "person" => Ok(EntityType::Person),
            "org" | "organization" | "organisation" => Ok(EntityType::Org),
            "project" => Ok(EntityType::Project),
            "object" => Ok(EntityType::Object),
            "place" => Ok(EntityType::Place),
            _ => Ok(EntityType::Other),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Owner,
    Contributor,
    Reviewer,
    Stakeholder,
    Other,
}

impl std::str::FromStr for ActorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(ActorRole::Owner),
            "contributor" => Ok(ActorRole::Contributor),
            "reviewer" => Ok(ActorRole::Reviewer),
            "stakeholder" => Ok(ActorRole::Stakeholder),
            _ => Ok(ActorRole::Other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSubject {
    #[serde(rename = "type")]
    pub subject_type: EntityType,
    #[serde(rename = "ref")]
    pub subject_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventActorRef {
    #[serde(rename = "ref")]
    pub actor_ref: String,
    pub role: ActorRole,
}

stored_object!(SemanticEvent, "semantic_event", {
    artifact_uid: String,
    revision_id: String,
    category: EventCategory,
    event_time: Option<DateTime<Utc>>,
    narrative: String,
    subject: EventSubject,
    actors: Vec<EventActorRef>,
    confidence: f32,
    extraction_run_id: String
});

impl SemanticEvent {
    /// Replaces every row extraction owns for a revision in one transaction:
    /// old events/evidence/actors/subjects are deleted and the new set is
    /// inserted, so a mid-write failure rolls back to the prior state
    /// instead of leaving a half-replaced event set (§4.5).
    #[allow(clippy::too_many_arguments)]
    pub async fn replace_extraction_result(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
        events: Vec<Self>,
        evidence: Vec<EventEvidence>,
        actors: Vec<EventActor>,
        subjects: Vec<EventSubjectRow>,
    ) -> Result<(), AppError> {
        let query = "
            BEGIN TRANSACTION;
            DELETE event_actor WHERE event_id IN (
                SELECT VALUE id FROM semantic_event WHERE artifact_uid = $uid AND revision_id = $rev
            );
            DELETE event_subject WHERE event_id IN (
                SELECT VALUE id FROM semantic_event WHERE artifact_uid = $uid AND revision_id = $rev
            );
            DELETE event_evidence WHERE artifact_uid = $uid AND revision_id = $rev;
            DELETE semantic_event WHERE artifact_uid = $uid AND revision_id = $rev;
            FOR $e IN $events { CREATE type::thing('semantic_event', $e.id) CONTENT $e };
            FOR $ev IN $evidence { CREATE type::thing('event_evidence', $ev.id) CONTENT $ev };
            FOR $a IN $actors { CREATE type::thing('event_actor', $a.id) CONTENT $a };
            FOR $s IN $subjects { CREATE type::thing('event_subject', $s.id) CONTENT $s };
            COMMIT TRANSACTION;
        ";

        db.client
            .query(query)
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .bind(("events", events))
            .bind(("evidence", evidence))
            .bind(("actors", actors))
            .bind(("subjects", subjects))
            .await?
            .check()?;
        Ok(())
    }

    /// Cascades a full `forget` across every table extraction owns for an
    /// artifact, regardless of revision. Must run before `entity_mention`
    /// and `artifact_revision` are dropped by the caller.
    pub async fn delete_by_uid(db: &SurrealDbClient, artifact_uid: &str) -> Result<(), AppError> {
        let query = "
            BEGIN TRANSACTION;
            DELETE event_actor WHERE event_id IN (
                SELECT VALUE id FROM semantic_event WHERE artifact_uid = $uid
            );
            DELETE event_subject WHERE event_id IN (
                SELECT VALUE id FROM semantic_event WHERE artifact_uid = $uid
            );
            DELETE event_evidence WHERE artifact_uid = $uid;
            DELETE semantic_event WHERE artifact_uid = $uid;
            COMMIT TRANSACTION;
        ";
        db.client
            .query(query)
            .bind(("uid", artifact_uid.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn find_by_uid_rev(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query("SELECT * FROM semantic_event WHERE artifact_uid = $uid AND revision_id = $rev")
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn find_by_ids(db: &SurrealDbClient, ids: &[String]) -> Result<Vec<Self>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let things: Vec<surrealdb::sql::Thing> = ids
            .iter()
            .map(|id| surrealdb::sql::Thing::from(("semantic_event".to_string(), id.clone())))
            .collect();
        let mut response = db
            .client
            .query("SELECT * FROM $things")
            .bind(("things", things))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn count(db: &SurrealDbClient) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }
        let mut response = db
            .client
            .query("SELECT count() FROM semantic_event GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.into_iter().next().map_or(0, |r| r.count))
    }
}
