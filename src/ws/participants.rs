use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::ServerEvent;
use super::session::{deliver, ConnectionId, Outbox};

/// Public view of one room member, as sent in `participants-update`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ConnectionId,
    pub username: String,
}

#[derive(Debug)]
pub struct Participant {
    pub info: ParticipantInfo,
    outbox: Outbox,
}

impl Participant {
    pub fn new(id: ConnectionId, username: String, outbox: Outbox) -> Self {
        Self {
            info: ParticipantInfo { id, username },
            outbox,
        }
    }
}

/// Members of one room keyed by connection id, kept in join order.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    members: Vec<Participant>,
}

impl ParticipantRegistry {
    /// Register a participant. A second insert for the same connection
    /// replaces the first one in place.
    pub fn insert(&mut self, participant: Participant) {
        match self
            .members
            .iter_mut()
            .find(|p| p.info.id == participant.info.id)
        {
            Some(existing) => *existing = participant,
            None => self.members.push(participant),
        }
    }

    pub fn remove(&mut self, id: &ConnectionId) -> Option<Participant> {
        let index = self.members.iter().position(|p| &p.info.id == id)?;
        Some(self.members.remove(index))
    }

    pub fn username_of(&self, id: &ConnectionId) -> Option<&str> {
        self.members
            .iter()
            .find(|p| &p.info.id == id)
            .map(|p| p.info.username.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ParticipantInfo> {
        self.members.iter().map(|p| p.info.clone()).collect()
    }

    /// Fan an event out to every member, optionally skipping one connection.
    /// Returns how many outboxes accepted it.
    pub fn broadcast(&self, event: ServerEvent, except: Option<&ConnectionId>) -> usize {
        let event = Arc::new(event);
        self.members
            .iter()
            .filter(|p| Some(&p.info.id) != except)
            .filter(|p| deliver(&p.info.id, &p.outbox, Arc::clone(&event)))
            .count()
    }
}
