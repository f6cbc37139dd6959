use std::collections::{HashMap, HashSet};

use common::{
    db::SurrealDbClient,
    error::AppError,
    model::{
        entity::Entity,
        event_actor::EventActor,
        event_subject::EventSubjectRow,
        semantic_event::{EventCategory, SemanticEvent},
    },
};

#[derive(Debug, Clone)]
pub struct ExpandedEvent {
    pub event: SemanticEvent,
    pub reason: String,
}

/// One-hop expansion from a seed set of events to events that share an actor
/// or subject entity, capped at `budget` neighbors total (§4.8). `category_filter`
/// (when non-empty) is applied before the cap, so a restrictive filter never
/// spends the budget on neighbors it then discards. Results are ordered by
/// `event_time` descending with events missing a time sorted last, matching
/// how `recall` orders its own direct hits.
pub async fn expand(
    db: &SurrealDbClient,
    seed_events: &[SemanticEvent],
    budget: usize,
    category_filter: &[EventCategory],
) -> Result<Vec<ExpandedEvent>, AppError> {
    if budget == 0 || seed_events.is_empty() {
        return Ok(Vec::new());
    }

    let seed_ids: Vec<String> = seed_events.iter().map(|e| e.id.clone()).collect();
    let seed_id_set: HashSet<&str> = seed_ids.iter().map(String::as_str).collect();

    let actor_neighbors = EventActor::co_actor_event_ids(db, &seed_ids).await?;
    let subject_neighbors = EventSubjectRow::co_subject_event_ids(db, &seed_ids).await?;

    let mut entity_ids: Vec<String> = actor_neighbors
        .iter()
        .chain(subject_neighbors.iter())
        .map(|(_, entity_id)| entity_id.clone())
        .collect();
    entity_ids.sort();
    entity_ids.dedup();
    let entities = Entity::find_by_ids(db, &entity_ids).await?;
    let names: HashMap<&str, &str> = entities
        .iter()
        .map(|e| (e.id.as_str(), e.canonical_name.as_str()))
        .collect();

    // First reason wins per neighbor event: actor relationships are checked
    // before subject relationships.
    let mut reason_by_event: HashMap<String, String> = HashMap::new();
    for (event_id, entity_id) in &actor_neighbors {
        if seed_id_set.contains(event_id.as_str()) {
            continue;
        }
        let name = names.get(entity_id.as_str()).copied().unwrap_or("unknown");
        reason_by_event
            .entry(event_id.clone())
            .or_insert_with(|| format!("same_actor:{name}"));
    }
    for (event_id, entity_id) in &subject_neighbors {
        if seed_id_set.contains(event_id.as_str()) {
            continue;
        }
        let name = names.get(entity_id.as_str()).copied().unwrap_or("unknown");
        reason_by_event
            .entry(event_id.clone())
            .or_insert_with(|| format!("same_subject:{name}"));
    }

    if reason_by_event.is_empty() {
        return Ok(Vec::new());
    }

    let neighbor_ids: Vec<String> = reason_by_event.keys().cloned().collect();
    let neighbor_events = SemanticEvent::find_by_ids(db, &neighbor_ids).await?;

    let mut expanded: Vec<ExpandedEvent> = neighbor_events
        .into_iter()
        .filter_map(|event| {
            reason_by_event.get(&event.id).map(|reason| ExpandedEvent {
                event,
                reason: reason.clone(),
            })
        })
        .collect();

    expanded.sort_by(|a, b| match (a.event.event_time, b.event.event_time) {
        (Some(at), Some(bt)) => bt.cmp(&at),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.event.id.cmp(&b.event.id),
    });
    if !category_filter.is_empty() {
        expanded.retain(|e| category_filter.contains(&e.event.category));
    }
    expanded.truncate(budget);

    Ok(expanded)
}
