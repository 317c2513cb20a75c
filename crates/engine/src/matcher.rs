use crate::aggregate::aggregate;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::ranker::rank;
use crate::selector::select_next_question;
use crate::state::MatchingState;
use crate::updater::update;
use std::collections::BTreeMap;
use std::sync::Arc;
use votematch_protocol::{GlobalMemberScore, MatchResult, Question, UserAnswer};
use votematch_vector_store::{BillCatalog, ClusterVectorData};

/// The engine's operations bound to one validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: EngineConfig,
}

impl Matcher {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::invalid_config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn initialize(&self, dimensions: usize) -> Result<MatchingState> {
        MatchingState::initialize(dimensions)
    }

    pub fn start(&self, cluster: &ClusterVectorData) -> Result<MatchingState> {
        MatchingState::for_cluster(cluster, &self.config)
    }

    pub fn select_next_question(
        &self,
        state: &MatchingState,
        cluster: &ClusterVectorData,
        bills: &BillCatalog,
    ) -> Option<Question> {
        select_next_question(state, cluster, bills, &self.config)
    }

    pub fn update(
        &self,
        state: &MatchingState,
        answer: UserAnswer,
        cluster: &ClusterVectorData,
    ) -> Result<MatchingState> {
        update(state, answer, cluster, &self.config)
    }

    pub fn rank(
        &self,
        user_vector: &[f32],
        cluster: &ClusterVectorData,
        top_n: Option<usize>,
    ) -> Vec<MatchResult> {
        rank(user_vector, cluster, top_n)
    }

    /// Top matches for feedback after each answer.
    pub fn live_matches(&self, state: &MatchingState, cluster: &ClusterVectorData) -> Vec<MatchResult> {
        rank(state.user_vector(), cluster, Some(self.config.live_top_n))
    }

    pub fn aggregate(
        &self,
        per_cluster: &[(MatchingState, u8)],
        clusters: &BTreeMap<String, Arc<ClusterVectorData>>,
    ) -> Result<Vec<GlobalMemberScore>> {
        aggregate(per_cluster, clusters)
    }

    /// Replay recorded answers in order, stopping silently once the cluster completes.
    pub fn replay(
        &self,
        cluster: &ClusterVectorData,
        answers: &[UserAnswer],
    ) -> Result<MatchingState> {
        let mut state = self.start(cluster)?;
        for answer in answers {
            state = self.update(&state, *answer, cluster)?;
        }
        Ok(state)
    }
}
