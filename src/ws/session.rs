use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use crate::models::ServerEvent;

/// Outbound queue of one live connection. Drained by the connection's writer task.
pub type Outbox = mpsc::UnboundedSender<Arc<ServerEvent>>;

/// Receiving half of an [`Outbox`].
pub type Inbox = mpsc::UnboundedReceiver<Arc<ServerEvent>>;

/// Opaque identifier of one live transport connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verified user identity handed over by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
}

/// Binding of one live connection to its identity and to at most one room.
///
/// Owned by the connection's socket task, so transitions never race with
/// each other. The room registry only keeps the connection id and the
/// outbox, never a reference back to the session.
#[derive(Debug)]
pub struct ConnectionSession {
    id: ConnectionId,
    identity: UserIdentity,
    current_room: Option<String>,
    outbox: Outbox,
}

impl ConnectionSession {
    pub fn new(identity: UserIdentity) -> (Self, Inbox) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let session = Self {
            id: ConnectionId::generate(),
            identity,
            current_room: None,
            outbox,
        };
        (session, inbox)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub fn is_bound_to(&self, document_id: &str) -> bool {
        self.current_room() == Some(document_id)
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub(crate) fn bind(&mut self, document_id: &str) {
        self.current_room = Some(document_id.to_string());
    }

    pub(crate) fn unbind(&mut self) -> Option<String> {
        self.current_room.take()
    }

    /// Queue an event for this connection only.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        deliver(&self.id, &self.outbox, Arc::new(event))
    }
}

/// Push an event onto an outbox. A closed outbox means the writer is gone;
/// its owner is cleaned up by its own disconnect path.
pub(crate) fn deliver(id: &ConnectionId, outbox: &Outbox, event: Arc<ServerEvent>) -> bool {
    match outbox.send(event) {
        Ok(()) => true,
        Err(_) => {
            trace!(connection = %id, "Outbox closed, event dropped");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn starts_unbound_and_tracks_single_room() {
        let (mut session, _inbox) = ConnectionSession::new(identity());
        assert_eq!(session.current_room(), None);

        session.bind("doc-1");
        assert!(session.is_bound_to("doc-1"));

        session.bind("doc-2");
        assert!(!session.is_bound_to("doc-1"));
        assert_eq!(session.unbind(), Some("doc-2".to_string()));
        assert_eq!(session.current_room(), None);
    }

    #[test]
    fn connection_ids_are_unique() {
        let (a, _ia) = ConnectionSession::new(identity());
        let (b, _ib) = ConnectionSession::new(identity());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn deliver_reports_closed_outbox() {
        let (session, inbox) = ConnectionSession::new(identity());
        assert!(session.deliver(ServerEvent::UsersCount { count: 1 }));
        drop(inbox);
        assert!(!session.deliver(ServerEvent::UsersCount { count: 2 }));
    }
}
