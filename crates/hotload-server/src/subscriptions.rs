//! Per-resource subscriptions: URI → ids of the sessions subscribed to it.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

#[derive(Clone, Default)]
pub struct SubscriptionTable {
    entries: Arc<DashMap<String, HashSet<String>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, uri: &str, session_id: &str) {
        self.entries
            .entry(uri.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    /// Returns `false` if the session was not subscribed to `uri`.
    pub fn unsubscribe(&self, uri: &str, session_id: &str) -> bool {
        self.entries
            .get_mut(uri)
            .map(|mut sessions| sessions.remove(session_id))
            .unwrap_or(false)
    }

    /// Whether any session is subscribed to `uri`. An emptied entry is
    /// pruned here.
    pub fn is_subscribed(&self, uri: &str) -> bool {
        let subscribed = self
            .entries
            .get(uri)
            .is_some_and(|sessions| !sessions.is_empty());
        if !subscribed {
            self.entries.remove_if(uri, |_, sessions| sessions.is_empty());
        }
        subscribed
    }

    pub fn subscribers(&self, uri: &str) -> Vec<String> {
        self.entries
            .get(uri)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every subscription held by `session_id`.
    pub fn unsubscribe_session(&self, session_id: &str) {
        self.entries.retain(|_, sessions| {
            sessions.remove(session_id);
            !sessions.is_empty()
        });
    }

    /// Number of URIs with at least one entry, including not-yet-pruned empty ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
