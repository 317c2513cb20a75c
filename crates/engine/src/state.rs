use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use votematch_protocol::{BillId, MatchStatus, UserAnswer};
use votematch_vector_store::ClusterVectorData;

/// Slack when comparing the mean uncertainty against the floor.
const FLOOR_EPSILON: f32 = 1e-6;

/// One user's progress through one cluster's questionnaire.
///
/// Invariants kept by every constructor and by [`crate::update`]:
/// - `question_count == answered_bills.len()`, each bill answered at most once
/// - every `user_vector` component lies in `[-1, 1]`
/// - every `dimension_uncertainty` component lies in `[uncertainty_floor, 1]`
///   and never increases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingState {
    pub(crate) cluster_label: String,
    pub(crate) dimensions: usize,
    pub(crate) user_vector: Vec<f32>,
    pub(crate) dimension_uncertainty: Vec<f32>,
    pub(crate) answered_bills: Vec<UserAnswer>,
    pub(crate) question_count: usize,
    pub(crate) status: MatchStatus,
}

impl MatchingState {
    /// Zero vector, full uncertainty, no answers.
    pub fn initialize(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(EngineError::InvalidDimension(dimensions));
        }
        Ok(Self {
            cluster_label: String::new(),
            dimensions,
            user_vector: vec![0.0; dimensions],
            dimension_uncertainty: vec![1.0; dimensions],
            answered_bills: Vec::new(),
            question_count: 0,
            status: MatchStatus::Active,
        })
    }

    /// Fresh state bound to a cluster. A cluster without bills starts complete.
    pub fn for_cluster(cluster: &ClusterVectorData, config: &EngineConfig) -> Result<Self> {
        let mut state = Self::initialize(cluster.dimensions())?;
        state.cluster_label = cluster.label().to_string();
        state.refresh_status(cluster.bill_count(), config);
        Ok(state)
    }

    pub fn cluster_label(&self) -> &str {
        &self.cluster_label
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn user_vector(&self) -> &[f32] {
        &self.user_vector
    }

    pub fn dimension_uncertainty(&self) -> &[f32] {
        &self.dimension_uncertainty
    }

    /// Answers in the order the questions were asked.
    pub fn answered_bills(&self) -> &[UserAnswer] {
        &self.answered_bills
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == MatchStatus::Complete
    }

    pub fn has_answered(&self, bill_id: BillId) -> bool {
        self.answered_bills.iter().any(|a| a.bill_id == bill_id)
    }

    pub fn answer_for(&self, bill_id: BillId) -> Option<&UserAnswer> {
        self.answered_bills.iter().find(|a| a.bill_id == bill_id)
    }

    /// Mean of the per-dimension uncertainties.
    pub fn aggregate_uncertainty(&self) -> f32 {
        if self.dimension_uncertainty.is_empty() {
            return 0.0;
        }
        self.dimension_uncertainty.iter().sum::<f32>() / self.dimension_uncertainty.len() as f32
    }

    /// `Complete` is terminal; otherwise re-evaluate the three stop conditions.
    pub(crate) fn refresh_status(&mut self, total_bills: usize, config: &EngineConfig) {
        if self.is_complete() {
            return;
        }

        let exhausted = self.answered_bills.len() >= total_bills;
        let confident = self.aggregate_uncertainty() <= config.uncertainty_floor + FLOOR_EPSILON;
        let capped = self.question_count >= config.question_limit(total_bills);

        if exhausted || confident || capped {
            log::debug!(
                "Cluster {} complete after {} questions (exhausted={}, confident={}, capped={})",
                self.cluster_label,
                self.question_count,
                exhausted,
                confident,
                capped
            );
            self.status = MatchStatus::Complete;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn initialize_is_zero_and_fully_uncertain() {
        let state = MatchingState::initialize(3).unwrap();
        assert_eq!(state.user_vector(), &[0.0, 0.0, 0.0]);
        assert_eq!(state.dimension_uncertainty(), &[1.0, 1.0, 1.0]);
        assert_eq!(state.question_count(), 0);
        assert_eq!(state.status(), MatchStatus::Active);
        assert_eq!(state.aggregate_uncertainty(), 1.0);
    }

    #[test]
    fn initialize_rejects_zero_dimensions() {
        assert!(matches!(
            MatchingState::initialize(0),
            Err(EngineError::InvalidDimension(0))
        ));
    }

    #[test]
    fn cluster_without_bills_starts_complete() {
        let cluster = ClusterVectorData::new("empty", 2, BTreeMap::new(), vec![], vec![]).unwrap();
        let state = MatchingState::for_cluster(&cluster, &EngineConfig::default()).unwrap();
        assert_eq!(state.cluster_label(), "empty");
        assert!(state.is_complete());
    }

    #[test]
    fn complete_is_terminal() {
        let mut state = MatchingState::initialize(1).unwrap();
        state.status = MatchStatus::Complete;
        state.refresh_status(100, &EngineConfig::default());
        assert!(state.is_complete());
    }
}
