// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::model::derive_title;
use crate::{KvStore, Message, Result, Role, Session, StoreError};

/// Storage key holding the session collection snapshot.
pub const SESSIONS_KEY: &str = "sessions";

/// The persisted envelope.  Sessions and the current id travel in one blob
/// so the stored selection can never name a session that was not stored.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    sessions: Vec<Session>,
    #[serde(default)]
    current_id: Option<String>,
}

/// How many sessions a search hit.  Callers auto-select on `Single` and
/// present a choice on `Many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    None,
    Single(String),
    Many(Vec<String>),
}

/// Owner of every conversation.
///
/// Single-writer: all mutation goes through `&mut self` and runs to
/// completion, flushing a full snapshot after each structural change.
/// Whenever the collection is non-empty, `current_id` names a member, and
/// the collection is only ever empty before [`load`](Self::load) has run.
pub struct SessionStore {
    kv: Box<dyn KvStore>,
    /// Collection order; new sessions go to the front.
    sessions: Vec<Session>,
    current_id: Option<String>,
    /// Set when `load` could not read storage.  Writes stay off until the
    /// backend reads back empty, so stored history is never overwritten by
    /// a collection that never saw it.
    unreadable: bool,
}

impl SessionStore {
    /// An empty, unloaded store.  Call [`load`](Self::load) before use, or
    /// use [`open`](Self::open).
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv, sessions: Vec::new(), current_id: None, unreadable: false }
    }

    /// Construct and load in one step.
    pub fn open(kv: Box<dyn KvStore>) -> Self {
        let mut store = Self::new(kv);
        store.load();
        store
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Missing, unreadable or corrupt data yields an empty collection; the
    /// error is logged, never returned.  Afterwards the store holds at least
    /// one session and a valid current id.
    ///
    /// Corrupt data is replaced on the next flush.  After a read error
    /// nothing is written back (see [`flush`](Self::flush)).
    pub fn load(&mut self) {
        let (snapshot, unreadable) = self.read_snapshot();
        self.unreadable = unreadable;

        let mut seen = HashSet::new();
        let before = snapshot.sessions.len();
        self.sessions = snapshot
            .sessions
            .into_iter()
            .filter(|s| seen.insert(s.id.clone()))
            .collect();
        if self.sessions.len() != before {
            warn!(dropped = before - self.sessions.len(), "dropped sessions with duplicate ids");
        }
        self.current_id = snapshot.current_id;

        let repaired = self.ensure_current(Utc::now());
        info!(sessions = self.sessions.len(), current = ?self.current_id, "session store loaded");
        if repaired {
            self.flush();
        }
    }

    /// The stored snapshot, and whether storage itself failed to read.
    fn read_snapshot(&self) -> (Snapshot, bool) {
        let blob = match self.kv.get(SESSIONS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("no stored sessions; starting fresh");
                return (Snapshot::default(), false);
            }
            Err(e) => {
                warn!(error = %e, "could not read stored sessions; starting fresh without saving");
                return (Snapshot::default(), true);
            }
        };
        let snapshot = serde_json::from_str(&blob).unwrap_or_else(|e| {
            warn!(error = %e, "stored sessions are corrupt; starting fresh");
            Snapshot::default()
        });
        (snapshot, false)
    }

    /// Write the whole collection and the current id as one blob.
    pub fn save(&self) -> Result<()> {
        let snapshot = SnapshotRef {
            sessions: &self.sessions,
            current_id: self.current_id.as_deref(),
        };
        let blob = serde_json::to_string(&snapshot)?;
        self.kv.set(SESSIONS_KEY, &blob)?;
        debug!(sessions = self.sessions.len(), bytes = blob.len(), "saved sessions");
        Ok(())
    }

    /// Persist after a mutation.  A failed write keeps the in-memory state,
    /// which stays valid; the next successful flush catches storage up.
    ///
    /// If `load` hit a read error, storage is probed again first and the
    /// write only happens once it reads back with nothing stored.
    fn flush(&mut self) {
        if self.unreadable {
            match self.kv.get(SESSIONS_KEY) {
                Ok(None) => self.unreadable = false,
                Ok(Some(_)) => {
                    warn!("stored sessions were never loaded; not overwriting them");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "storage still unreadable; skipping save");
                    return;
                }
            }
        }
        if let Err(e) = self.save() {
            error!(error = %e, "failed to persist sessions");
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Sessions in collection order (most recently created first unless the
    /// stored order said otherwise).
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current_id.as_deref().and_then(|id| self.get(id))
    }

    /// All sessions, most recently updated first.  Equal timestamps keep
    /// collection order.
    pub fn list_by_recency(&self) -> Vec<&Session> {
        let mut sorted: Vec<&Session> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sorted
    }

    /// Sessions whose title or any message contains `query`, ignoring case
    /// and surrounding whitespace.  A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Session> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.list_by_recency()
            .into_iter()
            .filter(|s| s.matches(&needle))
            .collect()
    }

    pub fn search_outcome(&self, query: &str) -> SearchOutcome {
        let mut ids: Vec<String> = self.search(query).into_iter().map(|s| s.id.clone()).collect();
        match ids.len() {
            0 => SearchOutcome::None,
            1 => SearchOutcome::Single(ids.remove(0)),
            _ => SearchOutcome::Many(ids),
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Create an empty session at the front of the collection.  The current
    /// selection is left alone.
    pub fn create(&mut self, title: &str) -> &Session {
        self.create_at(title, Utc::now())
    }

    pub fn create_at(&mut self, title: &str, now: DateTime<Utc>) -> &Session {
        self.insert_new(title, now);
        self.flush();
        &self.sessions[0]
    }

    /// Remove a session.  Unknown ids are ignored.
    ///
    /// Deleting the current session selects the most recently updated one
    /// left; deleting the last session replaces it with a blank one.
    pub fn delete(&mut self, id: &str) {
        let Some(pos) = self.position(id) else {
            debug!(id, "delete of unknown session ignored");
            return;
        };
        self.sessions.remove(pos);
        if self.current_id.as_deref() == Some(id) {
            self.current_id = self.most_recent_id();
        }
        self.ensure_current(Utc::now());
        info!(id, remaining = self.sessions.len(), "deleted session");
        self.flush();
    }

    /// Append a message stamped `now`.
    ///
    /// The first message of a session also sets its title (see
    /// [`derive_title`]).  `updated_at` moves to `now` and never backwards.
    pub fn append_message(
        &mut self,
        id: &str,
        role: Role,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<&Message> {
        let pos = self.position(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let session = &mut self.sessions[pos];

        if session.messages.is_empty() {
            session.title = derive_title(content);
        }
        session.messages.push(Message { role, content: content.to_string(), created_at: now });
        session.updated_at = session.updated_at.max(now);
        debug!(id, %role, messages = session.messages.len(), "appended message");

        self.flush();
        let messages = &self.sessions[pos].messages;
        Ok(&messages[messages.len() - 1])
    }

    /// Change a session's title without touching `updated_at`.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        let pos = self.position(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.sessions[pos].title = title.trim().to_string();
        self.flush();
        Ok(())
    }

    /// Make `id` the current session.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.position(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.current_id = Some(id.to_string());
        self.flush();
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn most_recent_id(&self) -> Option<String> {
        self.list_by_recency().first().map(|s| s.id.clone())
    }

    fn insert_new(&mut self, title: &str, now: DateTime<Utc>) {
        let mut id = Uuid::now_v7().to_string();
        while self.position(&id).is_some() {
            id = Uuid::now_v7().to_string();
        }
        info!(id = %id, title, "created session");
        self.sessions.insert(0, Session::new(id, title, now));
    }

    /// Restore "non-empty with a valid current id".  Returns whether
    /// anything had to change.
    fn ensure_current(&mut self, now: DateTime<Utc>) -> bool {
        if self.sessions.is_empty() {
            self.insert_new("", now);
            self.current_id = Some(self.sessions[0].id.clone());
            return true;
        }
        let valid = self
            .current_id
            .as_deref()
            .is_some_and(|id| self.position(id).is_some());
        if !valid {
            self.current_id = self.most_recent_id();
        }
        !valid
    }
}

/// Borrowing twin of [`Snapshot`] so saving does not clone every session.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    sessions: &'a [Session],
    current_id: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(4_000_000_000 + secs, 0).unwrap()
    }

    fn fresh() -> (SessionStore, MemoryKv) {
        let kv = MemoryKv::new();
        let store = SessionStore::open(Box::new(kv.clone()));
        (store, kv)
    }

    fn ids(sessions: &[&Session]) -> Vec<String> {
        sessions.iter().map(|s| s.id.clone()).collect()
    }

    fn assert_current_valid(store: &SessionStore) {
        assert!(!store.is_empty());
        let current = store.current_id().expect("current id set");
        assert!(store.get(current).is_some(), "current id {current} is dangling");
    }

    /// Store with one placeholder from `load` plus `n` sessions created at
    /// increasing timestamps.  Returns the created ids oldest first.
    fn with_sessions(n: usize) -> (SessionStore, Vec<String>) {
        let (mut store, _) = fresh();
        let created = (0..n)
            .map(|i| store.create_at(&format!("s{i}"), at(i as i64 + 1)).id.clone())
            .collect();
        (store, created)
    }

    // ── load / save ──────────────────────────────────────────────────────────

    #[test]
    fn load_on_empty_storage_creates_one_selected_session() {
        let (store, kv) = fresh();
        assert_eq!(store.len(), 1);
        assert_current_valid(&store);
        assert!(kv.get(SESSIONS_KEY).unwrap().is_some(), "repaired state is persisted");
    }

    #[test]
    fn load_recovers_from_corrupt_data() {
        let kv = MemoryKv::new();
        kv.set(SESSIONS_KEY, "{\"sessions\": [oops").unwrap();
        let store = SessionStore::open(Box::new(kv.clone()));
        assert_eq!(store.len(), 1);
        assert_current_valid(&store);
    }

    #[test]
    fn load_recovers_from_wrong_shape() {
        let kv = MemoryKv::new();
        kv.set(SESSIONS_KEY, "[1, 2, 3]").unwrap();
        let store = SessionStore::open(Box::new(kv));
        assert_eq!(store.len(), 1);
        assert_current_valid(&store);
    }

    #[test]
    fn load_repairs_dangling_current_id() {
        let (mut store, kv) = fresh();
        store.create_at("newer", at(50));
        let newest = store.sessions()[0].id.clone();
        store.save().unwrap();

        let mut blob: serde_json::Value =
            serde_json::from_str(&kv.get(SESSIONS_KEY).unwrap().unwrap()).unwrap();
        blob["currentId"] = serde_json::json!("ghost");
        kv.set(SESSIONS_KEY, &blob.to_string()).unwrap();

        let reloaded = SessionStore::open(Box::new(kv));
        assert_eq!(reloaded.current_id(), Some(newest.as_str()));
    }

    #[test]
    fn load_drops_duplicate_ids() {
        let (store, kv) = fresh();
        let only = store.sessions()[0].clone();
        let snapshot = serde_json::json!({
            "sessions": [only.clone(), only.clone()],
            "currentId": only.id,
        });
        kv.set(SESSIONS_KEY, &snapshot.to_string()).unwrap();
        let reloaded = SessionStore::open(Box::new(kv));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (mut store, kv) = fresh();
        let id = store.create_at("", at(1)).id.clone();
        store.append_message(&id, Role::User, "What is the weather?", at(2)).unwrap();
        store.append_message(&id, Role::Assistant, "|a|\n|-|\n|1|", at(3)).unwrap();
        store.select(&id).unwrap();

        let reloaded = SessionStore::open(Box::new(kv));
        assert_eq!(reloaded.sessions(), store.sessions());
        assert_eq!(reloaded.current_id(), Some(id.as_str()));
    }

    #[test]
    fn persisted_blob_uses_stable_field_names() {
        let (store, kv) = fresh();
        let blob: serde_json::Value =
            serde_json::from_str(&kv.get(SESSIONS_KEY).unwrap().unwrap()).unwrap();
        assert!(blob["sessions"].is_array());
        assert_eq!(blob["currentId"], serde_json::json!(store.current_id().unwrap()));
    }

    #[test]
    fn loads_previously_written_format() {
        let kv = MemoryKv::new();
        kv.set(
            SESSIONS_KEY,
            r#"{
                "sessions": [{
                    "id": "legacy-1",
                    "title": "Old chat",
                    "messages": [
                        {"role": "user", "content": "hi", "createdAt": "2024-01-01T00:00:00Z"}
                    ],
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-01-01T00:00:00Z"
                }],
                "currentId": "legacy-1"
            }"#,
        )
        .unwrap();
        let store = SessionStore::open(Box::new(kv));
        assert_eq!(store.len(), 1);
        let s = store.current().unwrap();
        assert_eq!(s.title, "Old chat");
        assert_eq!(s.messages[0].role, Role::User);
    }

    // ── create ───────────────────────────────────────────────────────────────

    #[test]
    fn create_inserts_at_front_without_selecting() {
        let (mut store, _) = fresh();
        let before = store.current_id().unwrap().to_string();
        let created = store.create_at("fresh", at(10)).clone();
        assert_eq!(store.sessions()[0].id, created.id);
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.messages.is_empty());
        assert_eq!(store.current_id(), Some(before.as_str()));
    }

    #[test]
    fn created_ids_are_unique() {
        let (store, created) = with_sessions(200);
        let unique: HashSet<_> = created.iter().collect();
        assert_eq!(unique.len(), 200);
        assert_eq!(store.len(), 201);
    }

    #[test]
    fn create_is_persisted_immediately() {
        let (mut store, kv) = fresh();
        let id = store.create("persisted").id.clone();
        let reloaded = SessionStore::open(Box::new(kv));
        assert!(reloaded.get(&id).is_some());
    }

    // ── delete ───────────────────────────────────────────────────────────────

    #[test]
    fn deleting_only_session_leaves_exactly_one() {
        let (mut store, _) = fresh();
        let only = store.current_id().unwrap().to_string();
        store.delete(&only);
        assert_eq!(store.len(), 1);
        assert_ne!(store.sessions()[0].id, only);
        assert_current_valid(&store);
    }

    #[test]
    fn deleting_current_selects_most_recently_updated() {
        let (mut store, created) = with_sessions(3);
        // Bump the oldest so it becomes the most recently updated.
        store.append_message(&created[0], Role::User, "bump", at(100)).unwrap();
        store.select(&created[2]).unwrap();
        store.delete(&created[2]);
        assert_eq!(store.current_id(), Some(created[0].as_str()));
    }

    #[test]
    fn deleting_other_session_keeps_selection() {
        let (mut store, created) = with_sessions(2);
        store.select(&created[0]).unwrap();
        store.delete(&created[1]);
        assert_eq!(store.current_id(), Some(created[0].as_str()));
    }

    #[test]
    fn delete_unknown_is_a_no_op() {
        let (mut store, _) = with_sessions(2);
        let before = store.sessions().to_vec();
        store.delete("no-such-id");
        store.delete("no-such-id");
        assert_eq!(store.sessions(), before.as_slice());
    }

    #[test]
    fn current_stays_valid_across_create_delete_sequences() {
        let (mut store, _) = fresh();
        for round in 0..20i64 {
            let id = store.create_at("x", at(round)).id.clone();
            if round % 3 == 0 {
                store.select(&id).unwrap();
            }
            if round % 2 == 0 {
                let victim = store.current_id().unwrap().to_string();
                store.delete(&victim);
            } else {
                let last = store.sessions().last().unwrap().id.clone();
                store.delete(&last);
            }
            assert_current_valid(&store);
        }
        while store.len() > 1 {
            let id = store.sessions()[0].id.clone();
            store.delete(&id);
            assert_current_valid(&store);
        }
        let last = store.sessions()[0].id.clone();
        store.delete(&last);
        assert_eq!(store.len(), 1);
        assert_current_valid(&store);
    }

    // ── append ───────────────────────────────────────────────────────────────

    #[test]
    fn append_to_unknown_session_is_not_found() {
        let (mut store, _) = fresh();
        let err = store.append_message("missing", Role::User, "hi", at(1)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn append_sets_updated_at_and_never_decreases_it() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(0)).id.clone();
        let mut last = store.get(&id).unwrap().updated_at;
        for t in 1..=5 {
            store.append_message(&id, Role::User, "m", at(t)).unwrap();
            let s = store.get(&id).unwrap();
            assert_eq!(s.updated_at, at(t));
            assert!(s.updated_at >= last);
            assert!(s.updated_at >= s.created_at);
            last = s.updated_at;
        }
    }

    #[test]
    fn append_with_earlier_clock_keeps_updated_at() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(10)).id.clone();
        store.append_message(&id, Role::User, "late clock", at(5)).unwrap();
        let s = store.get(&id).unwrap();
        assert_eq!(s.updated_at, at(10));
        assert_eq!(s.messages[0].created_at, at(5));
    }

    #[test]
    fn first_message_derives_title() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(0)).id.clone();
        store.append_message(&id, Role::User, "  hello   world  ", at(1)).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "hello world");
        store.append_message(&id, Role::Assistant, "something else", at(2)).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "hello world");
    }

    #[test]
    fn whitespace_first_message_gets_placeholder_title() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(0)).id.clone();
        store.append_message(&id, Role::User, "   \n  ", at(1)).unwrap();
        assert_eq!(store.get(&id).unwrap().title, crate::DEFAULT_TITLE);
    }

    #[test]
    fn messages_keep_insertion_order() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(0)).id.clone();
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append_message(&id, role, text, at(i as i64 + 1)).unwrap();
        }
        let contents: Vec<_> =
            store.get(&id).unwrap().messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    // ── ordering ─────────────────────────────────────────────────────────────

    #[test]
    fn list_by_recency_sorts_descending() {
        let (mut store, created) = with_sessions(3);
        store.append_message(&created[0], Role::User, "bump", at(100)).unwrap();
        let order = ids(&store.list_by_recency());
        assert_eq!(&order[..3], &[created[0].clone(), created[2].clone(), created[1].clone()]);
    }

    #[test]
    fn list_by_recency_is_stable_on_ties() {
        let (mut store, _) = fresh();
        let a = store.create_at("a", at(7)).id.clone();
        let b = store.create_at("b", at(7)).id.clone();
        let c = store.create_at("c", at(7)).id.clone();
        // Collection order is c, b, a (front insertion); ties keep it.
        let order = ids(&store.list_by_recency());
        assert_eq!(&order[..3], &[c.clone(), b.clone(), a.clone()]);

        // Equal updates on a and c: a must not overtake c.
        store.append_message(&a, Role::User, "x", at(9)).unwrap();
        store.append_message(&c, Role::User, "y", at(9)).unwrap();
        let order = ids(&store.list_by_recency());
        assert_eq!(&order[..3], &[c, a, b]);
    }

    // ── search ───────────────────────────────────────────────────────────────

    #[test]
    fn blank_query_matches_nothing() {
        let (store, _) = with_sessions(3);
        assert!(store.search("").is_empty());
        assert!(store.search("   \t").is_empty());
        assert_eq!(store.search_outcome(""), SearchOutcome::None);
    }

    #[test]
    fn search_is_case_insensitive_on_title() {
        let (mut store, _) = fresh();
        let id = store.create_at("Weather", at(1)).id.clone();
        assert_eq!(ids(&store.search("weather")), vec![id.clone()]);
        assert_eq!(ids(&store.search("  WEATHER  ")), vec![id]);
    }

    #[test]
    fn search_matches_message_content() {
        let (mut store, _) = fresh();
        let id = store.create_at("", at(1)).id.clone();
        store.append_message(&id, Role::User, "Tell me about Oslo", at(2)).unwrap();
        store.append_message(&id, Role::Assistant, "| City |\n|-|\n| Bergen |", at(3)).unwrap();
        assert_eq!(ids(&store.search("bergen")), vec![id]);
    }

    #[test]
    fn search_outcomes_none_single_many() {
        let (mut store, _) = fresh();
        let a = store.create_at("rust tips", at(1)).id.clone();
        let b = store.create_at("Rust traits", at(2)).id.clone();
        store.create_at("cooking", at(3));

        assert_eq!(store.search_outcome("python"), SearchOutcome::None);
        assert_eq!(store.search_outcome("tips"), SearchOutcome::Single(a.clone()));
        assert_eq!(store.search_outcome("rust"), SearchOutcome::Many(vec![b, a]));
    }

    // ── rename / select ──────────────────────────────────────────────────────

    #[test]
    fn rename_updates_title_only() {
        let (mut store, _) = fresh();
        let id = store.create_at("old", at(1)).id.clone();
        store.rename(&id, "  new name ").unwrap();
        let s = store.get(&id).unwrap();
        assert_eq!(s.title, "new name");
        assert_eq!(s.updated_at, at(1));
        assert!(store.rename("missing", "x").unwrap_err().is_not_found());
    }

    #[test]
    fn select_unknown_is_not_found() {
        let (mut store, _) = fresh();
        let before = store.current_id().unwrap().to_string();
        assert!(store.select("missing").unwrap_err().is_not_found());
        assert_eq!(store.current_id(), Some(before.as_str()));
    }

    // ── failing storage ──────────────────────────────────────────────────────

    struct BrokenKv;

    impl KvStore for BrokenKv {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(StoreError::Backend("disk on fire".into()))
        }
        fn set(&self, _key: &str, _blob: &str) -> Result<()> {
            Err(StoreError::Backend("disk on fire".into()))
        }
    }

    /// Fails the first `get`, then behaves like the wrapped store.
    struct FlakyKv {
        inner: MemoryKv,
        failed: std::sync::atomic::AtomicBool,
    }

    impl FlakyKv {
        fn over(inner: MemoryKv) -> Self {
            Self { inner, failed: std::sync::atomic::AtomicBool::new(false) }
        }
    }

    impl KvStore for FlakyKv {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
                return Err(StoreError::Io(denied));
            }
            self.inner.get(key)
        }
        fn set(&self, key: &str, blob: &str) -> Result<()> {
            self.inner.set(key, blob)
        }
    }

    #[test]
    fn read_error_does_not_overwrite_stored_history() {
        let (mut store, kv) = fresh();
        for i in 0..3 {
            store.create_at(&format!("s{i}"), at(i + 1));
        }
        assert_eq!(store.len(), 4);

        let mut degraded = SessionStore::open(Box::new(FlakyKv::over(kv.clone())));
        assert_eq!(degraded.len(), 1);
        assert_current_valid(&degraded);
        degraded.create_at("while degraded", at(10));

        let reopened = SessionStore::open(Box::new(kv));
        assert_eq!(reopened.len(), 4);
        assert!(reopened.sessions().iter().all(|s| s.title != "while degraded"));
    }

    #[test]
    fn read_error_over_empty_storage_saves_once_readable() {
        let kv = MemoryKv::new();
        let mut store = SessionStore::open(Box::new(FlakyKv::over(kv.clone())));
        // The retry inside the repair flush reads back empty, so saving resumes.
        assert!(kv.get(SESSIONS_KEY).unwrap().is_some());

        let id = store.create_at("kept", at(1)).id.clone();
        let reopened = SessionStore::open(Box::new(kv));
        assert!(reopened.get(&id).is_some());
    }

    #[test]
    fn broken_storage_never_breaks_invariants() {
        let mut store = SessionStore::open(Box::new(BrokenKv));
        assert_current_valid(&store);
        let id = store.create_at("t", at(1)).id.clone();
        store.append_message(&id, Role::User, "still works", at(2)).unwrap();
        assert!(store.save().is_err());
        let only = store.current_id().unwrap().to_string();
        store.delete(&only);
        store.delete(&id);
        assert_current_valid(&store);
    }
}
