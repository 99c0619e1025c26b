use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::SessionId;
use tokio::sync::RwLock;

/// State of one authenticated client. Absence from the store means anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    pub authenticated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            authenticated_at: Utc::now(),
        }
    }
}

/// Authenticated sessions keyed by session id. Lives for one server run.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, session_id: SessionId) -> Option<Session> {
        self.inner.read().await.get(&session_id).cloned()
    }

    pub async fn insert(&self, session_id: SessionId, session: Session) {
        self.inner.write().await.insert(session_id, session);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
