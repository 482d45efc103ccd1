use tracing::info;

use super::relay::IdentityChannels;
use super::room::RoomStore;
use super::session::{ConnectionSession, Inbox, UserIdentity};

/// Counters exposed by the diagnostics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub rooms: usize,
    pub occupied_rooms: usize,
    pub participants: usize,
    pub connections: usize,
    pub identity_channels: usize,
}

/// Process-wide coordination point for live sessions: the room store and
/// the identity channels. Event routing lives in `router`, the join/leave
/// lifecycle in `presence` and permission signalling in `relay`.
#[derive(Debug)]
pub struct Hub {
    rooms: RoomStore,
    identities: IdentityChannels,
}

impl Hub {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            rooms: RoomStore::new(default_language),
            identities: IdentityChannels::default(),
        }
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn identities(&self) -> &IdentityChannels {
        &self.identities
    }

    /// Open a session for a freshly authenticated connection and enrol it
    /// in its identity channel.
    pub async fn connect(&self, identity: UserIdentity) -> (ConnectionSession, Inbox) {
        let (session, inbox) = ConnectionSession::new(identity);
        self.identities
            .join(&session.identity().user_id, session.id(), session.outbox())
            .await;
        info!(
            "Connection {} opened for user {} ({})",
            session.id(),
            session.identity().user_id,
            session.identity().username
        );
        (session, inbox)
    }

    /// Tear a session down: leave its room, then its identity channel.
    pub async fn disconnect(&self, session: &mut ConnectionSession) {
        self.leave_document(session).await;
        self.identities
            .leave(&session.identity().user_id, session.id())
            .await;
        info!("Connection {} closed", session.id());
    }

    pub async fn stats(&self) -> HubStats {
        let rooms = self.rooms.stats().await;
        HubStats {
            rooms: rooms.rooms,
            occupied_rooms: rooms.occupied_rooms,
            participants: rooms.participants,
            connections: self.identities.connection_count().await,
            identity_channels: self.identities.channel_count().await,
        }
    }
}
