use crate::error::{EngineError, Result};
use crate::state::MatchingState;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use votematch_protocol::{GlobalMemberScore, MemberId};
use votematch_vector_store::{cosine_similarity, ClusterVectorData};

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 5;

pub fn validate_importance(importance: u8) -> Result<u8> {
    if (MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&importance) {
        Ok(importance)
    } else {
        Err(EngineError::InvalidImportance(importance))
    }
}

/// Importance-weighted average of per-cluster similarities.
///
/// ```text
/// global(m) = Σ_c (importance_c / Σ importance) * similarity_c(m)
/// ```
///
/// A member missing from a cluster's vector table contributes `0` for that
/// cluster rather than being dropped. Each cluster label may appear once.
/// Pure: recomputed from the states on every call. Sorted by score
/// descending, ties by member id.
pub fn aggregate(
    per_cluster: &[(MatchingState, u8)],
    clusters: &BTreeMap<String, Arc<ClusterVectorData>>,
) -> Result<Vec<GlobalMemberScore>> {
    let mut total_importance = 0u32;
    let mut resolved = Vec::with_capacity(per_cluster.len());
    let mut seen = HashSet::with_capacity(per_cluster.len());
    for (state, importance) in per_cluster {
        let importance = validate_importance(*importance)?;
        let label = state.cluster_label();
        let cluster = clusters
            .get(label)
            .ok_or_else(|| EngineError::UnknownCluster(label.to_string()))?;
        if !seen.insert(label) {
            return Err(EngineError::DuplicateCluster(label.to_string()));
        }
        total_importance += u32::from(importance);
        resolved.push((state, importance, cluster));
    }

    if resolved.is_empty() {
        return Ok(Vec::new());
    }

    let mut scores: BTreeMap<MemberId, GlobalMemberScore> = BTreeMap::new();
    for (state, importance, cluster) in resolved {
        let weight = f32::from(importance) / total_importance as f32;
        for (member_id, vector) in cluster.members() {
            let similarity = cosine_similarity(state.user_vector(), vector);
            let entry = scores.entry(member_id).or_insert_with(|| GlobalMemberScore {
                member_id,
                global_score: 0.0,
                cluster_scores: BTreeMap::new(),
            });
            entry.global_score += weight * similarity;
            entry
                .cluster_scores
                .insert(state.cluster_label().to_string(), similarity);
        }
    }

    let mut ranked: Vec<GlobalMemberScore> = scores.into_values().collect();
    ranked.sort_by(|a, b| {
        b.global_score
            .partial_cmp(&a.global_score)
            .unwrap_or(Ordering::Equal)
            .then(a.member_id.cmp(&b.member_id))
    });

    log::debug!(
        "Aggregated {} members across {} clusters",
        ranked.len(),
        per_cluster.len()
    );
    Ok(ranked)
}
