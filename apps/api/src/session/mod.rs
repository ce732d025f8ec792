//! In-process session bookkeeping.
//!
//! A session is a UUID v4 plus a namespaced key/value bag. Sessions live only
//! as long as the process. `SessionStore::resolve` is the one way to obtain a
//! `SessionContext`: it returns a known session unchanged and creates unknown
//! or missing ones, so an existing id is never regenerated.
//!
//! Sessions untouched for longer than the configured TTL are dropped by
//! `SessionStore::spawn_sweeper`.

pub mod handlers;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Every stored key carries this prefix.
pub const KEY_PREFIX: &str = "rs_";

/// Adds `KEY_PREFIX` unless the key already has it.
pub fn namespaced(key: &str) -> String {
    if key.starts_with(KEY_PREFIX) {
        key.to_string()
    } else {
        format!("{KEY_PREFIX}{key}")
    }
}

/// Identity of the session a request belongs to, threaded through handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// True when `resolve` created the session on this call.
    #[serde(skip)]
    pub is_new: bool,
}

#[derive(Debug, Clone)]
struct SessionData {
    created_at: DateTime<Utc>,
    touched_at: DateTime<Utc>,
    values: BTreeMap<String, Value>,
}

impl SessionData {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            touched_at: now,
            values: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-if-absent. A known id comes back with its original `created_at`.
    pub fn resolve(&self, id: Option<Uuid>) -> SessionContext {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut is_new = false;
        let mut entry = self.sessions.entry(id).or_insert_with(|| {
            is_new = true;
            SessionData::new()
        });
        entry.touched_at = Utc::now();
        if is_new {
            debug!(session_id = %id, "Created session");
        }
        SessionContext {
            id,
            created_at: entry.created_at,
            is_new,
        }
    }

    pub fn exists(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn set(&self, session: &SessionContext, key: &str, value: Value) {
        let mut entry = self
            .sessions
            .entry(session.id)
            .or_insert_with(SessionData::new);
        entry.touched_at = Utc::now();
        entry.values.insert(namespaced(key), value);
    }

    pub fn get(&self, id: Uuid, key: &str) -> Option<Value> {
        self.sessions
            .get(&id)
            .and_then(|data| data.values.get(&namespaced(key)).cloned())
    }

    pub fn remove(&self, id: Uuid, key: &str) -> Option<Value> {
        self.sessions
            .get_mut(&id)
            .and_then(|mut data| data.values.remove(&namespaced(key)))
    }

    /// Drops every value but keeps the session itself.
    pub fn clear(&self, id: Uuid) {
        if let Some(mut data) = self.sessions.get_mut(&id) {
            data.values.clear();
        }
    }

    /// All values with the namespace prefix stripped. `None` for an unknown session.
    pub fn get_all(&self, id: Uuid) -> Option<BTreeMap<String, Value>> {
        self.sessions.get(&id).map(|data| {
            data.values
                .iter()
                .map(|(k, v)| {
                    let key = k.strip_prefix(KEY_PREFIX).unwrap_or(k).to_string();
                    (key, v.clone())
                })
                .collect()
        })
    }

    /// Drops every session last resolved or written before `now - max_idle`.
    /// Returns how many were removed.
    pub fn purge_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, data| data.touched_at >= cutoff);
        before.saturating_sub(self.sessions.len())
    }

    /// Runs `purge_idle` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, max_idle: chrono::Duration, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.purge_idle(max_idle);
                if removed > 0 {
                    info!("Expired {removed} idle sessions");
                }
            }
        })
    }

    pub fn set_typed<T: Serialize>(&self, session: &SessionContext, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(session, key, v),
            Err(e) => warn!(session_id = %session.id, "Failed to store '{key}': {e}"),
        }
    }

    /// `None` if missing or if the stored value does not decode as `T`.
    pub fn get_typed<T: DeserializeOwned>(&self, id: Uuid, key: &str) -> Option<T> {
        let value = self.get(id, key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(session_id = %id, "Stored '{key}' has an unexpected shape: {e}");
                None
            }
        }
    }
}
