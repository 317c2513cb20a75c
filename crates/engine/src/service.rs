use crate::aggregate::validate_importance;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::matcher::Matcher;
use crate::session::{Session, SessionId};
use crate::store::{InMemorySessionStore, SessionStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use votematch_protocol::{AnswerOutcome, GlobalMemberScore, MatchResult, Question, UserAnswer};
use votematch_vector_store::{BillCatalog, ClusterCatalog, ClusterVectorData};

/// One async mutex per live session id.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    fn forget(&self, id: &SessionId) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Multi-cluster questionnaires over a shared cluster catalog.
///
/// Calls on the same session are applied one at a time; different sessions
/// proceed in parallel.
pub struct MatchService<S: SessionStore> {
    matcher: Matcher,
    clusters: Arc<ClusterCatalog>,
    bills: Arc<BillCatalog>,
    store: S,
    locks: SessionLocks,
}

impl MatchService<InMemorySessionStore> {
    /// Service backed by a process-local store sized from `config`.
    pub fn in_memory(
        config: EngineConfig,
        clusters: Arc<ClusterCatalog>,
        bills: Arc<BillCatalog>,
    ) -> Result<Self> {
        let store = InMemorySessionStore::new(config.session_ttl(), config.session_capacity);
        Ok(Self::new(Matcher::new(config)?, clusters, bills, store))
    }
}

impl<S: SessionStore> MatchService<S> {
    pub fn new(
        matcher: Matcher,
        clusters: Arc<ClusterCatalog>,
        bills: Arc<BillCatalog>,
        store: S,
    ) -> Self {
        Self {
            matcher,
            clusters,
            bills,
            store,
            locks: SessionLocks::default(),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn clusters(&self) -> &ClusterCatalog {
        &self.clusters
    }

    pub fn bills(&self) -> &BillCatalog {
        &self.bills
    }

    /// Open a session over `labels`, or over every questionable cluster when `None`.
    ///
    /// Sessions the store discarded since the last sweep are released first.
    pub async fn start_session(&self, labels: Option<Vec<String>>) -> Result<SessionId> {
        self.sweep_expired().await;
        let labels = labels.unwrap_or_else(|| self.clusters.questionable_labels());
        let importance = self.matcher.config().default_importance;

        let mut session = Session::new(SessionId::generate());
        for label in labels {
            let cluster = self.cluster(&label)?;
            if cluster.is_empty() {
                log::warn!("Skipping cluster {label}: no bills or dimensions to ask about");
                continue;
            }
            session.add_cluster(self.matcher.start(cluster)?, importance);
        }

        let id = session.id().clone();
        log::info!(
            "Started session {id} over {} clusters",
            session.labels().count()
        );
        self.store.put(session).await;
        Ok(id)
    }

    /// Snapshot of a session.
    pub async fn session(&self, id: &SessionId) -> Result<Session> {
        self.load(id).await
    }

    pub async fn next_question(&self, id: &SessionId, label: &str) -> Result<Option<Question>> {
        let session = self.load(id).await?;
        let progress = session.progress(label)?;
        let cluster = self.cluster(label)?;
        Ok(self
            .matcher
            .select_next_question(&progress.state, cluster, &self.bills))
    }

    /// Apply one answer and report the cluster's new position.
    pub async fn submit_answer(
        &self,
        id: &SessionId,
        label: &str,
        answer: UserAnswer,
    ) -> Result<AnswerOutcome> {
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        let cluster = self.cluster(label)?;

        let progress = session.progress_mut(label)?;
        progress.state = self.matcher.update(&progress.state, answer, cluster)?;
        let state = &progress.state;

        let outcome = AnswerOutcome {
            cluster_label: label.to_string(),
            status: state.status(),
            question_count: state.question_count(),
            aggregate_uncertainty: state.aggregate_uncertainty(),
            next_question: self
                .matcher
                .select_next_question(state, cluster, &self.bills),
            live_matches: self.matcher.live_matches(state, cluster),
        };

        self.store.put(session).await;
        Ok(outcome)
    }

    pub async fn set_importance(&self, id: &SessionId, label: &str, importance: u8) -> Result<()> {
        let importance = validate_importance(importance)?;
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        session.progress_mut(label)?.importance = importance;
        self.store.put(session).await;
        Ok(())
    }

    pub async fn cluster_matches(
        &self,
        id: &SessionId,
        label: &str,
        top_n: Option<usize>,
    ) -> Result<Vec<MatchResult>> {
        let session = self.load(id).await?;
        let progress = session.progress(label)?;
        let cluster = self.cluster(label)?;
        Ok(self
            .matcher
            .rank(progress.state.user_vector(), cluster, top_n))
    }

    /// Ranking across every cluster that has at least one answer.
    pub async fn global_ranking(&self, id: &SessionId) -> Result<Vec<GlobalMemberScore>> {
        let session = self.load(id).await?;
        self.matcher
            .aggregate(&session.answered_states(), self.clusters.clusters())
    }

    pub async fn end_session(&self, id: &SessionId) -> bool {
        let removed = {
            let _guard = self.locks.acquire(id).await;
            self.store.delete(id).await
        };
        self.locks.forget(id);
        if removed {
            log::info!("Ended session {id}");
        }
        removed
    }

    /// Discard idle sessions and release the locks of every session the store
    /// dropped; returns how many were released.
    pub async fn sweep_expired(&self) -> usize {
        let expired = self.store.sweep_expired().await;
        for id in &expired {
            self.locks.forget(id);
        }
        expired.len()
    }

    fn cluster(&self, label: &str) -> Result<&ClusterVectorData> {
        self.clusters
            .get(label)
            .map(Arc::as_ref)
            .ok_or_else(|| EngineError::UnknownCluster(label.to_string()))
    }

    async fn load(&self, id: &SessionId) -> Result<Session> {
        match self.store.get(id).await {
            Some(session) => Ok(session),
            None => {
                self.locks.forget(id);
                Err(EngineError::SessionNotFound(id.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn locks_serialize_same_session() {
        let locks = Arc::new(SessionLocks::default());
        let id = SessionId::new("s");

        let guard = locks.acquire(&id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let service = MatchService::in_memory(
            EngineConfig::default(),
            Arc::new(ClusterCatalog::default()),
            Arc::new(BillCatalog::default()),
        )
        .unwrap();

        let missing = SessionId::new("nope");
        assert!(matches!(
            service.next_question(&missing, "a").await,
            Err(EngineError::SessionNotFound(id)) if id == "nope"
        ));
        assert!(!service.end_session(&missing).await);
    }

    fn one_cluster_catalog() -> Arc<ClusterCatalog> {
        let catalog = ClusterCatalog::from_json(
            r#"{
              "clusters": {
                "economy": {
                  "memberVectors": { "1": [1.0, 0.0], "2": [-1.0, 0.0] },
                  "billLoadings": [[1.0, 0.0], [0.0, 1.0]],
                  "billIds": [10, 11],
                  "dimensions": 2
                }
              }
            }"#,
        )
        .unwrap();
        Arc::new(catalog)
    }

    fn service_with_store(store: InMemorySessionStore) -> MatchService<InMemorySessionStore> {
        MatchService::new(
            Matcher::new(EngineConfig::default()).unwrap(),
            one_cluster_catalog(),
            Arc::new(BillCatalog::default()),
            store,
        )
    }

    async fn start_and_answer(service: &MatchService<InMemorySessionStore>) -> SessionId {
        let id = service.start_session(None).await.unwrap();
        service
            .submit_answer(&id, "economy", UserAnswer::new(10, 1.0))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn evicted_sessions_release_their_locks() {
        let service = service_with_store(InMemorySessionStore::new(Duration::from_secs(60), 1));
        for _ in 0..50 {
            start_and_answer(&service).await;
        }

        service.sweep_expired().await;
        assert_eq!(service.store.len(), 1);
        assert_eq!(service.locks.len(), service.store.len());
    }

    #[tokio::test]
    async fn expired_sessions_release_their_locks() {
        let service =
            service_with_store(InMemorySessionStore::new(Duration::from_millis(100), 64));
        for _ in 0..20 {
            start_and_answer(&service).await;
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        start_and_answer(&service).await;
        service.sweep_expired().await;

        assert_eq!(service.store.len(), 1);
        assert_eq!(service.locks.len(), service.store.len());
    }
}
