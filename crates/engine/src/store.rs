use crate::session::{Session, SessionId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Where sessions live between requests.
///
/// The matching core never sees this; only [`crate::MatchService`] does, so an
/// external cache can replace the in-memory map.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Option<Session>;

    async fn put(&self, session: Session);

    /// Returns whether a session was removed.
    async fn delete(&self, id: &SessionId) -> bool;

    /// Drops every session idle beyond the TTL and returns the ids of all
    /// sessions discarded since the previous sweep, including ones expired or
    /// evicted during `get`/`put`.
    async fn sweep_expired(&self) -> Vec<SessionId>;
}

struct StoreEntry {
    session: Session,
    expires_at: Instant,
}

#[derive(Default)]
struct Entries {
    map: HashMap<SessionId, StoreEntry>,
    order: VecDeque<SessionId>,
    /// Expired or evicted ids not yet handed out by a sweep.
    discarded: Vec<SessionId>,
}

impl Entries {
    fn touch(&mut self, id: &SessionId) {
        self.order.retain(|k| k != id);
        self.order.push_back(id.clone());
    }

    fn prune_expired(&mut self, now: Instant) {
        let expired: Vec<SessionId> = self
            .map
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        if expired.is_empty() {
            return;
        }

        for id in &expired {
            self.map.remove(id);
        }
        self.order.retain(|id| self.map.contains_key(id));
        self.discarded.extend(expired);
    }

    fn evict_over(&mut self, capacity: usize) {
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                log::debug!("Evicting least recently used session {evicted}");
                self.map.remove(&evicted);
                self.discarded.push(evicted);
            }
        }
    }

    fn take_discarded(&mut self) -> Vec<SessionId> {
        let mut ids = std::mem::take(&mut self.discarded);
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Process-local session store with idle expiry and LRU eviction.
pub struct InMemorySessionStore {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Option<Session> {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.prune_expired(now);

        let entry = entries.map.get_mut(id)?;
        entry.expires_at = now + self.ttl;
        let session = entry.session.clone();
        entries.touch(id);
        Some(session)
    }

    async fn put(&self, session: Session) {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.prune_expired(now);

        let id = session.id().clone();
        entries.discarded.retain(|k| k != &id);
        entries.map.insert(
            id.clone(),
            StoreEntry {
                session,
                expires_at: now + self.ttl,
            },
        );
        entries.touch(&id);
        entries.evict_over(self.capacity);
    }

    async fn delete(&self, id: &SessionId) -> bool {
        let mut entries = self.lock();
        entries.order.retain(|k| k != id);
        entries.discarded.retain(|k| k != id);
        entries.map.remove(id).is_some()
    }

    async fn sweep_expired(&self) -> Vec<SessionId> {
        let discarded = {
            let mut entries = self.lock();
            entries.prune_expired(Instant::now());
            entries.take_discarded()
        };
        if !discarded.is_empty() {
            log::info!("Discarded {} expired or evicted sessions", discarded.len());
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(id: &str) -> Session {
        Session::new(SessionId::new(id))
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 8);
        store.put(session("a")).await;

        let got = store.get(&SessionId::new("a")).await.unwrap();
        assert_eq!(got.id().as_str(), "a");
        assert!(store.delete(&SessionId::new("a")).await);
        assert!(!store.delete(&SessionId::new("a")).await);
        assert!(store.get(&SessionId::new("a")).await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let store = InMemorySessionStore::new(Duration::ZERO, 8);
        store.put(session("a")).await;
        store.put(session("b")).await;

        let mut swept = store.sweep_expired().await;
        swept.sort();
        assert_eq!(swept, vec![SessionId::new("a"), SessionId::new("b")]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 2);
        store.put(session("a")).await;
        store.put(session("b")).await;
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(store.get(&SessionId::new("a")).await.is_some());
        store.put(session("c")).await;

        assert_eq!(store.len(), 2);
        assert!(store.get(&SessionId::new("b")).await.is_none());
        assert!(store.get(&SessionId::new("a")).await.is_some());
    }

    #[tokio::test]
    async fn sweep_reports_evictions_once() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 1);
        store.put(session("a")).await;
        store.put(session("b")).await;
        store.put(session("c")).await;

        assert_eq!(
            store.sweep_expired().await,
            vec![SessionId::new("a"), SessionId::new("b")]
        );
        assert_eq!(store.sweep_expired().await, Vec::<SessionId>::new());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn reinserted_session_is_not_reported() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 1);
        store.put(session("a")).await;
        store.put(session("b")).await;
        store.put(session("a")).await;

        assert_eq!(store.sweep_expired().await, vec![SessionId::new("b")]);
        assert!(store.get(&SessionId::new("a")).await.is_some());
    }
}
