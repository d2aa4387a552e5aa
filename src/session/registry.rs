//! Registry of live sessions, keyed by remote endpoint.
//!
//! # Design Decisions
//! - At most one session per endpoint; `try_add` never overwrites
//! - Removal hands the session back to exactly one caller, which is what makes
//!   teardown run once even when several paths race for it
//! - Worker-triggered removal matches on session id so a late signal from an
//!   old session cannot tear down a newer one on the same endpoint

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Session, SessionId};
use crate::net::Endpoint;

/// Concurrent endpoint → session map.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<Endpoint, Session>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `endpoint`.
    ///
    /// Returns false when the endpoint is already registered; the existing
    /// entry is left untouched.
    pub fn try_add(&self, endpoint: Endpoint, session: Session) -> bool {
        match self.sessions.entry(endpoint) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    /// Remove whatever session is registered under `endpoint`.
    pub fn try_remove(&self, endpoint: &Endpoint) -> Option<Session> {
        self.sessions.remove(endpoint).map(|(_, session)| session)
    }

    /// Remove the session under `endpoint` only if it is `id`.
    pub fn try_remove_session(&self, endpoint: &Endpoint, id: SessionId) -> Option<Session> {
        self.sessions
            .remove_if(endpoint, |_, session| session.id() == id)
            .map(|(_, session)| session)
    }

    /// Whether `id` is the session currently registered under `endpoint`.
    pub fn is_current(&self, endpoint: &Endpoint, id: SessionId) -> bool {
        self.sessions
            .get(endpoint)
            .is_some_and(|session| session.id() == id)
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.sessions.contains_key(endpoint)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of the registered endpoints, in no particular order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }
}
