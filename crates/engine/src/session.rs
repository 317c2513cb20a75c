use crate::error::{EngineError, Result};
use crate::state::MatchingState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque session identifier (16 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Random id; falls back to clock + counter when the OS RNG is unavailable.
    pub fn generate() -> Self {
        let value = random_u64_best_effort().unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
            nanos ^ FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed).rotate_left(32)
        });
        Self(format!("{value:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_u64_best_effort() -> Option<u64> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).ok()?;
    Some(u64::from_be_bytes(bytes))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProgress {
    pub state: MatchingState,
    pub importance: u8,
}

/// One user's questionnaire across several clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    clusters: BTreeMap<String, ClusterProgress>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            clusters: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn add_cluster(&mut self, state: MatchingState, importance: u8) {
        self.clusters.insert(
            state.cluster_label().to_string(),
            ClusterProgress { state, importance },
        );
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.clusters.keys().map(String::as_str)
    }

    pub fn progress(&self, label: &str) -> Result<&ClusterProgress> {
        self.clusters
            .get(label)
            .ok_or_else(|| EngineError::UnknownCluster(label.to_string()))
    }

    pub fn progress_mut(&mut self, label: &str) -> Result<&mut ClusterProgress> {
        self.clusters
            .get_mut(label)
            .ok_or_else(|| EngineError::UnknownCluster(label.to_string()))
    }

    /// True once every cluster in the session is complete.
    pub fn is_complete(&self) -> bool {
        self.clusters.values().all(|p| p.state.is_complete())
    }

    /// States with at least one answer, paired with their importance.
    pub fn answered_states(&self) -> Vec<(MatchingState, u8)> {
        self.clusters
            .values()
            .filter(|p| p.state.question_count() > 0)
            .map(|p| (p.state.clone(), p.importance))
            .collect()
    }
}
