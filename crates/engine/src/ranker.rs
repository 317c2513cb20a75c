use std::cmp::Ordering;
use votematch_protocol::{MatchResult, MemberId};
use votematch_vector_store::{cosine_similarity, ClusterVectorData};

/// Rank every member of a cluster by cosine similarity to `user_vector`.
///
/// Sorted by similarity descending, ties by member id ascending; ranks are
/// 1-based. `top_n` of `None` or `Some(0)` returns the full list.
pub fn rank(
    user_vector: &[f32],
    cluster: &ClusterVectorData,
    top_n: Option<usize>,
) -> Vec<MatchResult> {
    let mut scored: Vec<(MemberId, f32)> = cluster
        .members()
        .map(|(member_id, vector)| (member_id, cosine_similarity(user_vector, vector)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    if let Some(limit) = top_n.filter(|n| *n > 0) {
        scored.truncate(limit);
    }

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (member_id, similarity))| MatchResult {
            member_id,
            similarity,
            rank: idx + 1,
        })
        .collect()
}

/// Similarity of a single member, `None` when the member has no vector in this cluster.
pub fn member_similarity(
    user_vector: &[f32],
    cluster: &ClusterVectorData,
    member_id: MemberId,
) -> Option<f32> {
    cluster
        .member_vector(member_id)
        .map(|vector| cosine_similarity(user_vector, vector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn cluster(members: &[(MemberId, [f32; 2])]) -> ClusterVectorData {
        let vectors: BTreeMap<MemberId, Vec<f32>> =
            members.iter().map(|(id, v)| (*id, v.to_vec())).collect();
        ClusterVectorData::new("r", 2, vectors, vec![1], vec![vec![1.0, 0.0]]).unwrap()
    }

    #[test]
    fn identical_direction_ranks_first() {
        let cluster = cluster(&[(7, [1.0, 0.0])]);
        let results = rank(&[1.0, 0.0], &cluster, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].member_id, 7);
        assert_eq!(results[0].rank, 1);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_user_vector_gives_zero_similarity_and_id_order() {
        let cluster = cluster(&[(3, [0.0, 0.0]), (1, [0.5, 0.5]), (2, [-1.0, 0.0])]);
        let results = rank(&[0.0, 0.0], &cluster, None);
        let ids: Vec<MemberId> = results.iter().map(|r| r.member_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(results.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn sorted_descending_with_truncation() {
        let cluster = cluster(&[
            (1, [-1.0, 0.0]),
            (2, [1.0, 1.0]),
            (3, [1.0, 0.0]),
            (4, [0.0, 1.0]),
        ]);
        let results = rank(&[1.0, 0.2], &cluster, Some(2));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].member_id, 3);
        assert_eq!(results[1].member_id, 2);
        assert_eq!(results[1].rank, 2);

        let full = rank(&[1.0, 0.2], &cluster, Some(0));
        assert_eq!(full.len(), 4);
        assert!(full.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(full[3].member_id, 1);
    }

    #[test]
    fn member_similarity_for_absent_member_is_none() {
        let cluster = cluster(&[(1, [1.0, 0.0])]);
        assert_eq!(member_similarity(&[1.0, 0.0], &cluster, 2), None);
        assert!(member_similarity(&[1.0, 0.0], &cluster, 1).is_some());
    }
}
