use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::state::MatchingState;
use votematch_protocol::UserAnswer;
use votematch_vector_store::ClusterVectorData;

/// Incorporate one answer and return the resulting state.
///
/// The input state is never modified, so a failed or retried call leaves the
/// caller's copy intact. Answers to an already-answered bill and answers after
/// completion return an unchanged copy.
///
/// Per dimension `d`, with loading `L` of the answered bill:
///
/// ```text
/// user[d]        = clip(user[d] + learning_rate * L[d] * score, -1, 1)
/// uncertainty[d] = max(floor, uncertainty[d] - decay_rate * |L[d]|)
/// ```
pub fn update(
    state: &MatchingState,
    answer: UserAnswer,
    cluster: &ClusterVectorData,
    config: &EngineConfig,
) -> Result<MatchingState> {
    if state.is_complete() {
        log::debug!(
            "Ignoring answer for bill {}: cluster {} already complete",
            answer.bill_id,
            state.cluster_label
        );
        return Ok(state.clone());
    }
    if state.has_answered(answer.bill_id) {
        log::debug!("Ignoring duplicate answer for bill {}", answer.bill_id);
        return Ok(state.clone());
    }

    let loading = cluster
        .loading(answer.bill_id)
        .ok_or_else(|| EngineError::unknown_bill(cluster.label(), answer.bill_id))?;
    if loading.len() != state.dimensions {
        return Err(EngineError::DimensionMismatch {
            expected: state.dimensions,
            actual: loading.len(),
        });
    }

    let score = clip_score(answer.score)?;

    let mut next = state.clone();
    for (d, l) in loading.iter().enumerate() {
        let moved = state.user_vector[d] + config.learning_rate * l * score;
        next.user_vector[d] = moved.clamp(-1.0, 1.0);

        let prior = state.dimension_uncertainty[d];
        let decayed = prior - config.decay_rate * l.abs();
        next.dimension_uncertainty[d] = decayed.max(config.uncertainty_floor).min(prior);
    }

    next.answered_bills.push(UserAnswer::new(answer.bill_id, score));
    next.question_count += 1;
    next.refresh_status(cluster.bill_count(), config);

    log::debug!(
        "Bill {} answered {:+.1} in cluster {}: uncertainty {:.3} -> {:.3}",
        answer.bill_id,
        score,
        cluster.label(),
        state.aggregate_uncertainty(),
        next.aggregate_uncertainty()
    );

    Ok(next)
}

/// Non-finite scores are rejected; finite ones outside `[-1, 1]` are clipped.
pub fn clip_score(score: f32) -> Result<f32> {
    if !score.is_finite() {
        return Err(EngineError::InvalidScore(score));
    }
    if !(-1.0..=1.0).contains(&score) {
        log::warn!("Clipping out-of-range answer score {score}");
    }
    Ok(score.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn cluster() -> ClusterVectorData {
        ClusterVectorData::new(
            "t",
            2,
            BTreeMap::new(),
            vec![1, 2, 3],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        )
        .unwrap()
    }

    fn fresh(cluster: &ClusterVectorData) -> MatchingState {
        MatchingState::for_cluster(cluster, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn agree_moves_vector_along_loading() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let next = update(&fresh(&cluster), UserAnswer::new(1, 1.0), &cluster, &config).unwrap();

        assert!((next.user_vector()[0] - 0.3).abs() < 1e-6);
        assert_eq!(next.user_vector()[1], 0.0);
        assert!((next.dimension_uncertainty()[0] - 0.4).abs() < 1e-6);
        assert_eq!(next.dimension_uncertainty()[1], 1.0);
        assert_eq!(next.question_count(), 1);
    }

    #[test]
    fn neutral_reduces_uncertainty_without_moving() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let next = update(&fresh(&cluster), UserAnswer::new(3, 0.0), &cluster, &config).unwrap();

        assert_eq!(next.user_vector(), &[0.0, 0.0]);
        assert!(next.dimension_uncertainty().iter().all(|u| *u < 1.0));
    }

    #[test]
    fn duplicate_answer_is_idempotent() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let once = update(&fresh(&cluster), UserAnswer::new(2, -1.0), &cluster, &config).unwrap();
        let twice = update(&once, UserAnswer::new(2, -1.0), &cluster, &config).unwrap();
        assert_eq!(once, twice);

        let contradicting = update(&once, UserAnswer::new(2, 1.0), &cluster, &config).unwrap();
        assert_eq!(once, contradicting);
    }

    #[test]
    fn unknown_bill_leaves_state_untouched() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let state = fresh(&cluster);
        let err = update(&state, UserAnswer::new(99, 1.0), &cluster, &config).unwrap_err();
        assert!(matches!(err, EngineError::UnknownBill { bill_id: 99, .. }));
        assert_eq!(state, fresh(&cluster));
    }

    #[test]
    fn non_finite_score_is_rejected_and_large_score_clipped() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let state = fresh(&cluster);
        assert!(matches!(
            update(&state, UserAnswer::new(1, f32::NAN), &cluster, &config),
            Err(EngineError::InvalidScore(_))
        ));

        let next = update(&state, UserAnswer::new(1, 7.0), &cluster, &config).unwrap();
        assert_eq!(next.answered_bills()[0].score, 1.0);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let cluster = cluster();
        let state = MatchingState::initialize(3).unwrap();
        assert!(matches!(
            update(&state, UserAnswer::new(1, 1.0), &cluster, &EngineConfig::default()),
            Err(EngineError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn answering_every_bill_completes_and_further_answers_are_noops() {
        let cluster = cluster();
        let config = EngineConfig::default();
        let mut state = fresh(&cluster);
        for bill in [1, 2, 3] {
            state = update(&state, UserAnswer::new(bill, 1.0), &cluster, &config).unwrap();
        }
        assert!(state.is_complete());

        let after = update(&state, UserAnswer::new(1, -1.0), &cluster, &config).unwrap();
        assert_eq!(after, state);
    }

    #[test]
    fn question_cap_completes_early() {
        let cluster = cluster();
        let config = EngineConfig {
            question_cap: 1,
            ..Default::default()
        };
        let state = MatchingState::for_cluster(&cluster, &config).unwrap();
        let next = update(&state, UserAnswer::new(2, 1.0), &cluster, &config).unwrap();
        assert!(next.is_complete());
    }

    #[test]
    fn floor_everywhere_completes() {
        let cluster = ClusterVectorData::new(
            "floor",
            2,
            BTreeMap::new(),
            vec![1, 2, 3, 4],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7], vec![0.1, 0.1]],
        )
        .unwrap();
        let config = EngineConfig {
            decay_rate: 1.0,
            ..Default::default()
        };
        let state = MatchingState::for_cluster(&cluster, &config).unwrap();
        let next = update(&state, UserAnswer::new(1, 1.0), &cluster, &config).unwrap();
        assert_eq!(next.dimension_uncertainty()[0], config.uncertainty_floor);
        assert!(!next.is_complete());

        let next = update(&next, UserAnswer::new(2, -1.0), &cluster, &config).unwrap();
        assert_eq!(next.question_count(), 2);
        assert!(next.is_complete());
    }
}
