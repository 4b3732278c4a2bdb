use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// Live view of one subscriber session
#[derive(Clone, Debug, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub peer: Option<String>,
    pub started_at: DateTime<Utc>,
    pub deliveries: u64,
    /// Store generation of the last delivered snapshot
    pub last_generation: Option<u64>,
}

/// Sessions currently running, keyed by session id
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn register(&self, peer: Option<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionInfo {
                id,
                peer,
                started_at: Utc::now(),
                deliveries: 0,
                last_generation: None,
            },
        );
        id
    }

    pub fn record_delivery(&self, id: &Uuid, generation: u64) {
        if let Some(mut info) = self.sessions.get_mut(id) {
            info.deliveries += 1;
            info.last_generation = Some(generation);
        }
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionInfo> {
        self.sessions.remove(id).map(|(_, info)| info)
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionInfo> {
        self.sessions.get(id).map(|info| info.clone())
    }

    /// All sessions, oldest first
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let registry = SessionRegistry::new();

        let a = registry.register(Some("10.0.0.1:5000".to_string()));
        let b = registry.register(None);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(&a).unwrap();
        assert_eq!(removed.peer.as_deref(), Some("10.0.0.1:5000"));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&a).is_none());
    }

    #[test]
    fn test_record_delivery() {
        let registry = SessionRegistry::new();
        let id = registry.register(None);

        registry.record_delivery(&id, 4);
        registry.record_delivery(&id, 7);

        let info = registry.get(&id).unwrap();
        assert_eq!(info.deliveries, 2);
        assert_eq!(info.last_generation, Some(7));
    }

    #[test]
    fn test_delivery_for_unknown_session_is_ignored() {
        let registry = SessionRegistry::new();
        registry.record_delivery(&Uuid::new_v4(), 1);
        assert!(registry.is_empty());
    }
}
