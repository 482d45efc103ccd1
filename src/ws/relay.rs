use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::ServerEvent;
use super::hub::Hub;
use super::session::{deliver, ConnectionId, Outbox};

/// Private per-user audiences, keyed by user id rather than document id.
///
/// Every live connection is a member of exactly one channel, the one of its
/// authenticated identity. Delivery is best effort: a user with no live
/// connection simply misses the event.
#[derive(Debug, Default)]
pub struct IdentityChannels {
    channels: RwLock<HashMap<String, HashMap<ConnectionId, Outbox>>>,
}

impl IdentityChannels {
    pub async fn join(&self, user_id: &str, connection: &ConnectionId, outbox: Outbox) {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_default()
            .insert(connection.clone(), outbox);
    }

    pub async fn leave(&self, user_id: &str, connection: &ConnectionId) {
        let mut channels = self.channels.write().await;
        if let Some(members) = channels.get_mut(user_id) {
            members.remove(connection);
            if members.is_empty() {
                channels.remove(user_id);
            }
        }
    }

    pub async fn is_member(&self, user_id: &str, connection: &ConnectionId) -> bool {
        self.channels
            .read()
            .await
            .get(user_id)
            .is_some_and(|members| members.contains_key(connection))
    }

    /// Send to every connection of one user. Returns how many received it.
    pub async fn send(&self, user_id: &str, event: ServerEvent) -> usize {
        let channels = self.channels.read().await;
        let Some(members) = channels.get(user_id) else {
            return 0;
        };
        let event = Arc::new(event);
        members
            .iter()
            .filter(|(id, outbox)| deliver(id, outbox, Arc::clone(&event)))
            .count()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.channels.read().await.values().map(HashMap::len).sum()
    }
}

impl Hub {
    /// Tell a document owner that someone asks for access.
    pub async fn request_permission(
        &self,
        document_id: &str,
        owner_id: &str,
        requester_id: &str,
        requester_name: &str,
    ) -> usize {
        let event = ServerEvent::PermissionRequest {
            document_id: document_id.to_string(),
            requester_id: requester_id.to_string(),
            requester_name: requester_name.to_string(),
        };
        let delivered = self.identities().send(owner_id, event).await;
        if delivered == 0 {
            warn!(
                "Permission request for {} from {} not delivered: owner {} has no live connection",
                document_id, requester_id, owner_id
            );
        } else {
            info!(
                "Permission request for {} from {} relayed to owner {} ({} connections)",
                document_id, requester_id, owner_id, delivered
            );
        }
        delivered
    }

    /// Tell a requester that access to a document was granted.
    pub async fn grant_permission(&self, document_id: &str, user_id: &str) -> usize {
        let event = ServerEvent::PermissionGranted {
            document_id: document_id.to_string(),
        };
        let delivered = self.identities().send(user_id, event).await;
        if delivered == 0 {
            warn!(
                "Permission grant for {} not delivered: user {} has no live connection",
                document_id, user_id
            );
        } else {
            info!("Permission grant for {} relayed to user {}", document_id, user_id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::session::UserIdentity;

    fn identity(user_id: &str) -> UserIdentity {
        UserIdentity {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn request_reaches_owner_outside_the_room() {
        let hub = Hub::new("javascript");
        let (mut owner, mut owner_rx) = hub.connect(identity("owner")).await;
        let (mut requester, mut requester_rx) = hub.connect(identity("requester")).await;
        // the owner sits in another document entirely
        hub.join_document(&mut owner, "doc-1", Some("olga".to_string())).await;
        hub.join_document(&mut requester, "doc-2", Some("rita".to_string())).await;
        while owner_rx.try_recv().is_ok() {}
        while requester_rx.try_recv().is_ok() {}

        let delivered = hub.request_permission("doc-2", "owner", "requester", "rita").await;
        assert_eq!(delivered, 1);
        assert_eq!(
            *owner_rx.try_recv().unwrap(),
            ServerEvent::PermissionRequest {
                document_id: "doc-2".to_string(),
                requester_id: "requester".to_string(),
                requester_name: "rita".to_string(),
            }
        );
        assert!(requester_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn grant_reaches_every_connection_of_the_user() {
        let hub = Hub::new("javascript");
        let (_a, mut a_rx) = hub.connect(identity("u-1")).await;
        let (_b, mut b_rx) = hub.connect(identity("u-1")).await;
        let (_c, mut c_rx) = hub.connect(identity("u-2")).await;

        assert_eq!(hub.grant_permission("doc-9", "u-1").await, 2);
        let granted = ServerEvent::PermissionGranted { document_id: "doc-9".to_string() };
        assert_eq!(*a_rx.try_recv().unwrap(), granted);
        assert_eq!(*b_rx.try_recv().unwrap(), granted);
        assert!(c_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn signals_to_absent_users_are_dropped() {
        let hub = Hub::new("javascript");
        assert_eq!(hub.grant_permission("doc-1", "nobody").await, 0);
        assert_eq!(hub.request_permission("doc-1", "nobody", "u-1", "x").await, 0);
    }

    #[tokio::test]
    async fn disconnect_leaves_identity_channel() {
        let hub = Hub::new("javascript");
        let (mut session, _rx) = hub.connect(identity("u-1")).await;
        let id = session.id().clone();
        assert!(hub.identities().is_member("u-1", &id).await);

        hub.disconnect(&mut session).await;
        assert!(!hub.identities().is_member("u-1", &id).await);
        assert_eq!(hub.identities().channel_count().await, 0);
    }
}
