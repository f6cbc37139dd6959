use std::{cmp::Ordering, collections::HashMap};

use common::vector::VectorHit;

/// Reciprocal rank fusion: `score = sum(1 / (k + rank))` over every ranked
/// list a hit appears in, rank counted from 0. Replaces naive score
/// averaging across collections whose raw similarity scales aren't
/// comparable (§4.6 step 4).
pub fn fuse(ranked_lists: &[Vec<VectorHit>], k: u32) -> Vec<(VectorHit, f32)> {
    let mut fused: HashMap<String, (VectorHit, f32)> = HashMap::new();

    for list in ranked_lists {
        for (rank, hit) in list.iter().enumerate() {
            let contribution = 1.0 / (k as f32 + rank as f32);
            fused
                .entry(hit.id.clone())
                .and_modify(|(_, score)| *score += contribution)
                .or_insert_with(|| (hit.clone(), contribution));
        }
    }

    let mut results: Vec<(VectorHit, f32)> = fused.into_values().collect();
    sort_by_score_desc(&mut results);
    results
}

fn sort_by_score_desc(results: &mut [(VectorHit, f32)]) {
    results.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Keeps the best-scored hit per `artifact_uid`, preserving the fused rank
/// order (§4.6 step 5: one representative passage per artifact).
pub fn dedup_by_artifact(ranked: Vec<(VectorHit, f32)>) -> Vec<(VectorHit, f32)> {
    let mut seen = HashMap::new();
    let mut out = Vec::new();
    for (hit, score) in ranked {
        if seen.insert(hit.artifact_uid.clone(), ()).is_none() {
            out.push((hit, score));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, artifact_uid: &str) -> VectorHit {
        VectorHit {
            id: id.to_string(),
            artifact_uid: artifact_uid.to_string(),
            revision_id: "rev1".to_string(),
            text: "text".to_string(),
            chunk_index: None,
            start_char: None,
            end_char: None,
            similarity: 0.0,
        }
    }

    #[test]
    fn hits_present_in_multiple_lists_outrank_single_list_hits() {
        let list_a = vec![hit("x", "art1"), hit("y", "art2")];
        let list_b = vec![hit("y", "art2"), hit("x", "art1")];
        let fused = fuse(&[list_a, list_b], 60);
        // both appear in both lists at ranks 0 and 1, so scores tie; either
        // order is valid, but fused score must exceed a single-list hit.
        let single = fuse(&[vec![hit("z", "art3")]], 60);
        assert!(fused[0].1 > single[0].1);
    }

    #[test]
    fn dedup_keeps_first_occurrence_per_artifact() {
        let ranked = vec![
            (hit("c1", "art1"), 0.9),
            (hit("c2", "art1"), 0.5),
            (hit("c3", "art2"), 0.4),
        ];
        let deduped = dedup_by_artifact(ranked);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].0.id, "c1");
        assert_eq!(deduped[1].0.id, "c3");
    }
}
