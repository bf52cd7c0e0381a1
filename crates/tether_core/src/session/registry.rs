//! Process-wide session registry.
//!
//! Single source of truth for status and listing queries. Backed by a
//! sharded map so unrelated sessions never contend on one lock; each
//! mutation runs as a closure under the entry's shard lock, which together
//! with the one-writer-task-per-session discipline keeps per-session
//! updates atomic.

use dashmap::DashMap;
use tracing::warn;

use crate::id::SessionId;
use crate::session::{SessionRecord, SessionSnapshot, SessionStatus};

/// Keyed collection of [`SessionRecord`]s, one per linking attempt.
///
/// Intentionally ephemeral: durability is delegated to the remote
/// credential store once upload succeeds.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Insert a freshly created record. Ids are generated from a
    /// high-resolution timestamp and never reused, so a displaced record
    /// indicates a bug worth logging rather than a normal path.
    pub fn insert(&self, record: SessionRecord) {
        let id = record.id.clone();
        if self.sessions.insert(id.clone(), record).is_some() {
            warn!(session = %id, "session id collision: replaced an existing record");
        }
    }

    /// Mutate the record under its key lock, returning the closure's value.
    /// `None` when the id is unknown.
    pub fn update<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(id).map(|mut record| f(&mut record))
    }

    /// Remove a record entirely (creation-failure cleanup only; terminal
    /// teardown keeps records queryable).
    pub fn remove(&self, id: &SessionId) -> Option<SessionRecord> {
        self.sessions.remove(id).map(|(_, record)| record)
    }

    /// Point-in-time copy of one record.
    pub fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(id).map(|record| record.snapshot())
    }

    /// Snapshots of every record currently `Connected`, in registry
    /// iteration order.
    pub fn connected(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .iter()
            .filter(|entry| entry.status == SessionStatus::Connected)
            .map(|entry| entry.snapshot())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::id::AccountId;

    fn record(account: &str) -> SessionRecord {
        let account = AccountId::parse(account).expect("valid account");
        let id = SessionId::generate(&account);
        let staging = PathBuf::from("/tmp/staging").join(account.as_str());
        SessionRecord::new(id, account, staging)
    }

    #[test]
    fn snapshot_returns_point_in_time_copy() {
        let registry = SessionRegistry::new();
        let record = record("2348140825959");
        let id = record.id.clone();
        registry.insert(record);

        let before = registry.snapshot(&id).expect("known id");
        assert_eq!(before.status, SessionStatus::Waiting);

        registry.update(&id, |r| r.mark_connected(Utc::now()));

        // The earlier snapshot is unaffected; a fresh one sees the change.
        assert_eq!(before.status, SessionStatus::Waiting);
        let after = registry.snapshot(&id).expect("known id");
        assert_eq!(after.status, SessionStatus::Connected);
    }

    #[test]
    fn connected_listing_excludes_other_states() {
        let registry = SessionRegistry::new();

        let waiting = record("2348140825959");
        let connected = record("14155552671");
        let disconnected = record("447911123456");
        let connected_id = connected.id.clone();
        let disconnected_id = disconnected.id.clone();

        registry.insert(waiting);
        registry.insert(connected);
        registry.insert(disconnected);

        registry.update(&connected_id, |r| r.mark_connected(Utc::now()));
        registry.update(&disconnected_id, |r| {
            r.mark_connected(Utc::now());
            r.mark_disconnected();
        });

        let listed = registry.connected();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, connected_id);

        // Disconnected records stay resolvable even though they are not listed.
        let gone = registry.snapshot(&disconnected_id).expect("still queryable");
        assert_eq!(gone.status, SessionStatus::Disconnected);
    }

    #[test]
    fn update_on_unknown_id_is_none() {
        let registry = SessionRegistry::new();
        let account = AccountId::parse("2348140825959").expect("valid account");
        let id = SessionId::generate(&account);
        assert!(registry.update(&id, |_| ()).is_none());
        assert!(registry.snapshot(&id).is_none());
    }
}
