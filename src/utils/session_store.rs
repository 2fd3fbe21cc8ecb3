use moka::future::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::session::AttendanceSession;

/// One live capture session and the principal that created it.
pub struct SessionEntry {
    pub id: Uuid,
    pub owner: String,
    pub session: Mutex<AttendanceSession>,
}

/// Live sessions, evicted after `ttl` of inactivity or when over capacity.
pub struct SessionStore {
    sessions: Cache<Uuid, Arc<SessionEntry>>,
}

impl SessionStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(ttl)
                .build(),
        }
    }

    pub async fn insert(&self, owner: &str, session: AttendanceSession) -> Arc<SessionEntry> {
        let entry = Arc::new(SessionEntry {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            session: Mutex::new(session),
        });
        self.sessions.insert(entry.id, entry.clone()).await;
        entry
    }

    /// Sessions of other principals are reported as missing.
    pub async fn get(&self, id: &Uuid, owner: &str) -> Option<Arc<SessionEntry>> {
        self.sessions
            .get(id)
            .await
            .filter(|entry| entry.owner == owner)
    }

    pub async fn remove(&self, id: &Uuid, owner: &str) -> bool {
        match self.get(id, owner).await {
            Some(_) => {
                self.sessions.invalidate(id).await;
                true
            }
            None => false,
        }
    }
}
