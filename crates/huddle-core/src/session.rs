//! Preview session orchestrator.
//!
//! Owns one snapshot for the lifetime of a preview, an append-only event log,
//! and a list of subscribers. All writes go through [`PreviewSession::set_state`];
//! subscribers are called synchronously after each write or logged event is
//! committed. Simulated participants are just local states merged into the
//! shared snapshot by [`PreviewSession::sync`], and identities swapped in as
//! the caller when resolving.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::aggregate::{self, ParticipantLocalState};
use crate::resolve::ResolveContext;
use crate::state::{self, PHASE_KEY, Snapshot};

/// Lifecycle of a session. There is no explicit end; an owner simply drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Running,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Running => f.write_str("running"),
        }
    }
}

/// Something that happened in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl SessionEvent {
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            participant_id: None,
            payload,
        }
    }

    #[must_use]
    pub fn from_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }
}

/// One entry in the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub seq: u64,
    pub at_ms: i64,
    pub event: SessionEvent,
}

/// What subscribers are told.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// The snapshot changed; `changed` lists the root keys that were written.
    StateChanged {
        snapshot: &'a Snapshot,
        changed: &'a [String],
    },
    /// An event was appended to the log.
    Event(&'a LogEntry),
}

/// Handle returned by [`PreviewSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Notification<'_>)>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("slide '{0}' is not part of this session")]
    UnknownSlide(String),
    #[error("participant '{0}' has not joined this session")]
    UnknownParticipant(String),
    #[error("participant '{0}' already joined this session")]
    DuplicateParticipant(String),
}

pub struct PreviewSession {
    slides: Vec<String>,
    status: SessionStatus,
    snapshot: Snapshot,
    log: Vec<LogEntry>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    participants: BTreeMap<String, ParticipantLocalState>,
}

impl fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewSession")
            .field("slides", &self.slides)
            .field("status", &self.status)
            .field("snapshot", &self.snapshot)
            .field("log_len", &self.log.len())
            .field("subscribers", &self.subscribers.len())
            .field("participants", &self.participants.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PreviewSession {
    /// New session over `slides`, in presentation order.
    #[must_use]
    pub fn new(slides: Vec<String>) -> Self {
        Self {
            slides,
            status: SessionStatus::Created,
            snapshot: Snapshot::new(),
            log: Vec::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
            participants: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn slides(&self) -> &[String] {
        &self.slides
    }

    /// Read-only view of the current snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Owned copy of the current snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        state::phase(&self.snapshot)
    }

    /// Seed one empty namespace per slide, point `phase` at the first slide
    /// and log a `start` event.
    pub fn start(&mut self) {
        if self.status == SessionStatus::Running {
            tracing::warn!("session already running; reseeding state");
        }
        let mut seed = Map::new();
        for slide in &self.slides {
            seed.insert(slide.clone(), state::empty_namespace());
        }
        if let Some(first) = self.slides.first() {
            seed.insert(PHASE_KEY.to_string(), Value::from(first.as_str()));
        }
        let started = SessionEvent::new("start", json!({ "slides": self.slides }));
        self.status = SessionStatus::Running;
        self.set_state(seed);
        self.send_event(started);
        tracing::info!(slides = self.slides.len(), "preview session started");
    }

    /// Shallow-merge `patch` into the snapshot and notify subscribers.
    pub fn set_state(&mut self, patch: Snapshot) {
        self.commit(patch, Vec::new());
    }

    /// Apply `patch`, drop `removed`, then notify once with every touched key.
    fn commit(&mut self, patch: Snapshot, removed: Vec<String>) {
        if patch.is_empty() && removed.is_empty() {
            return;
        }
        let mut changed: Vec<String> = patch.keys().cloned().collect();
        for (key, value) in patch {
            self.snapshot.insert(key, value);
        }
        for key in removed {
            self.snapshot.remove(&key);
            changed.push(key);
        }
        tracing::debug!(keys = ?changed, "state updated");

        let notification = Notification::StateChanged {
            snapshot: &self.snapshot,
            changed: &changed,
        };
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&notification);
        }
    }

    /// Append `event` to the log and notify subscribers.
    pub fn send_event(&mut self, event: SessionEvent) {
        let entry = LogEntry {
            seq: self.log.len() as u64,
            at_ms: chrono::Utc::now().timestamp_millis(),
            event,
        };
        tracing::debug!(seq = entry.seq, kind = %entry.event.kind, "event logged");
        self.log.push(entry);

        if let Some(entry) = self.log.last() {
            let notification = Notification::Event(entry);
            for (_, subscriber) in &mut self.subscribers {
                subscriber(&notification);
            }
        }
    }

    /// Register a callback for every state write and logged event.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&Notification<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Move `phase` to `slide`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSlide`] if `slide` is not in the deck.
    pub fn go_to(&mut self, slide: &str) -> Result<(), SessionError> {
        if !self.slides.iter().any(|s| s == slide) {
            return Err(SessionError::UnknownSlide(slide.to_string()));
        }
        let mut patch = Map::new();
        patch.insert(PHASE_KEY.to_string(), Value::from(slide));
        self.set_state(patch);
        self.send_event(SessionEvent::new("phase", json!({ "phase": slide })));
        Ok(())
    }

    /// Move to the next slide. Returns the new phase, or `None` on the last.
    pub fn advance(&mut self) -> Option<String> {
        let current = self
            .phase()
            .and_then(|phase| self.slides.iter().position(|s| s == phase));
        let next_index = current.map_or(0, |idx| idx + 1);
        let next = self.slides.get(next_index)?.clone();
        self.go_to(&next).ok()?;
        Some(next)
    }

    /// Add a simulated participant with empty local state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateParticipant`] if the id is taken.
    pub fn join(&mut self, participant_id: &str) -> Result<(), SessionError> {
        if self.participants.contains_key(participant_id) {
            return Err(SessionError::DuplicateParticipant(participant_id.to_string()));
        }
        self.participants.insert(
            participant_id.to_string(),
            ParticipantLocalState::new(participant_id),
        );
        self.send_event(SessionEvent::new("join", Value::Null).from_participant(participant_id));
        Ok(())
    }

    #[must_use]
    pub fn participant(&self, participant_id: &str) -> Option<&ParticipantLocalState> {
        self.participants.get(participant_id)
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.keys().map(String::as_str)
    }

    /// Record a participant's answer to one block. Call [`Self::sync`] to
    /// publish it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownParticipant`] if the id never joined.
    pub fn record_response(
        &mut self,
        participant_id: &str,
        namespace_id: &str,
        block_id: &str,
        value: Value,
    ) -> Result<(), SessionError> {
        self.local_mut(participant_id)?
            .record_response(namespace_id, block_id, value);
        self.send_event(
            SessionEvent::new(
                "response",
                json!({ "namespaceId": namespace_id, "blockId": block_id }),
            )
            .from_participant(participant_id),
        );
        Ok(())
    }

    /// Record the items handed to a participant on one slide.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownParticipant`] if the id never joined.
    pub fn record_assignments(
        &mut self,
        participant_id: &str,
        namespace_id: &str,
        item_ids: Vec<String>,
    ) -> Result<(), SessionError> {
        self.local_mut(participant_id)?
            .record_assignments(namespace_id, item_ids);
        Ok(())
    }

    /// Set a custom variable on a participant.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownParticipant`] if the id never joined.
    pub fn set_variable(
        &mut self,
        participant_id: &str,
        name: &str,
        value: Value,
    ) -> Result<(), SessionError> {
        self.local_mut(participant_id)?.set_variable(name, value);
        Ok(())
    }

    /// Merge every participant's local state into the shared snapshot,
    /// writing only the root keys that changed and removing the root
    /// accessors the merge drops.
    pub fn sync(&mut self) {
        let locals: Vec<ParticipantLocalState> = self.participants.values().cloned().collect();
        let merged = aggregate::merge_participant_states(&self.snapshot, &locals);
        let removed: Vec<String> = self
            .snapshot
            .keys()
            .filter(|key| !merged.contains_key(*key))
            .cloned()
            .collect();
        let patch: Snapshot = merged
            .into_iter()
            .filter(|(key, value)| self.snapshot.get(key) != Some(value))
            .collect();
        self.commit(patch, removed);
    }

    /// Context for resolving as `caller_id`.
    #[must_use]
    pub fn context_for<'a>(&'a self, caller_id: &'a str, is_host: bool) -> ResolveContext<'a> {
        let ctx = ResolveContext::new(&self.snapshot, caller_id);
        if is_host { ctx.as_host() } else { ctx }
    }

    fn local_mut(&mut self, participant_id: &str) -> Result<&mut ParticipantLocalState, SessionError> {
        self.participants
            .get_mut(participant_id)
            .ok_or_else(|| SessionError::UnknownParticipant(participant_id.to_string()))
    }
}
