//! Durable per-user to-do cache.
//!
//! Every operation is best effort: a missing namespace turns it into a no-op,
//! a broken entry reads as a miss and a failed write is only logged.

use std::sync::Arc;

use planner_core::{DateKey, TaskItem, TodosByDate, UserSession};

use crate::database::KeyValueStore;

pub const TODOS_BY_DATE_PREFIX: &str = "mentee-todos-by-date_";

/// The storage key for `session`, if it owns a to-do namespace at all.
pub fn cache_key(session: Option<&UserSession>) -> Option<String> {
    let session = session?;
    if !session.owns_todos() {
        return None;
    }
    Some(format!("{}{}", TODOS_BY_DATE_PREFIX, session.user_id.trim()))
}

#[derive(Clone)]
pub struct LocalCacheStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LocalCacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn read(&self, session: Option<&UserSession>) -> Option<TodosByDate> {
        let key = cache_key(session)?;

        let raw = match self.kv.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("CACHE {}: read failed, treating as empty: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<TodosByDate>(&raw) {
            Ok(todos) => Some(todos),
            Err(e) => {
                tracing::warn!("CACHE {}: unreadable entry ignored: {}", key, e);
                None
            }
        }
    }

    pub async fn write(&self, session: Option<&UserSession>, todos: &TodosByDate) {
        let Some(key) = cache_key(session) else {
            return;
        };

        let raw = match serde_json::to_string(todos) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("CACHE {}: could not serialize entry: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.kv.set(&key, &raw).await {
            tracing::warn!("CACHE {}: write dropped: {}", key, e);
        }
    }

    pub async fn read_date(&self, session: Option<&UserSession>, date: &DateKey) -> Vec<TaskItem> {
        self.read(session)
            .await
            .map(|todos| todos.items(date))
            .unwrap_or_default()
    }

    /// Replaces one date's entry, leaving the other dates as stored.
    pub async fn write_date(
        &self,
        session: Option<&UserSession>,
        date: DateKey,
        items: Vec<TaskItem>,
    ) {
        if cache_key(session).is_none() {
            return;
        }
        let mut todos = self.read(session).await.unwrap_or_default();
        tracing::debug!("CACHE: storing {} item(s) for {}", items.len(), date);
        todos.set(date, items);
        self.write(session, &todos).await;
    }

    pub async fn clear(&self, session: Option<&UserSession>) {
        let Some(key) = cache_key(session) else {
            return;
        };
        if let Err(e) = self.kv.remove(&key).await {
            tracing::warn!("CACHE {}: clear failed: {}", key, e);
        }
    }
}
