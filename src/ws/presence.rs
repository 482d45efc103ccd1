use tracing::info;

use crate::models::ServerEvent;
use super::hub::Hub;
use super::participants::Participant;
use super::session::ConnectionSession;

/// Display name used when a joining client supplies none.
pub const ANONYMOUS: &str = "Anonymous";

/// Strip the trailing `!` marker some clients append to display names.
pub fn normalize_display_name(raw: &str) -> String {
    raw.strip_suffix('!').unwrap_or(raw).to_string()
}

impl Hub {
    /// Bind a connection to a document room.
    ///
    /// Any previous binding is left first, with its own presence update.
    /// The joining connection receives the room snapshot before the room
    /// sees the new participant list and count, all under the room lock, so
    /// no later broadcast for this room can overtake the snapshot.
    pub async fn join_document(
        &self,
        session: &mut ConnectionSession,
        document_id: &str,
        username: Option<String>,
    ) {
        if session.current_room().is_some() {
            self.leave_document(session).await;
        }

        let username = username.unwrap_or_else(|| ANONYMOUS.to_string());
        let room = self.rooms().get_or_create(document_id).await;
        let mut room = room.lock().await;

        room.participants_mut().insert(Participant::new(
            session.id().clone(),
            username.clone(),
            session.outbox(),
        ));

        let (content, language) = room.snapshot();
        session.deliver(ServerEvent::DocumentContent {
            document_id: document_id.to_string(),
            content,
            language,
        });
        room.broadcast_presence();
        session.bind(document_id);

        info!(
            "Connection {} joined document {} as {} ({} participants)",
            session.id(),
            document_id,
            username,
            room.participants().len()
        );
    }

    /// Unbind a connection from its room, if any, and tell the remaining
    /// members. The room itself is kept.
    pub async fn leave_document(&self, session: &mut ConnectionSession) {
        let Some(document_id) = session.unbind() else {
            return;
        };
        let id = session.id().clone();

        let remaining = self
            .rooms()
            .with_room(&document_id, |room| {
                room.participants_mut().remove(&id)?;
                room.participants()
                    .broadcast(ServerEvent::UserDisconnected { user_id: id.clone() }, None);
                room.broadcast_presence();
                Some(room.participants().len())
            })
            .await
            .flatten();

        if let Some(remaining) = remaining {
            info!(
                "Connection {} left document {} ({} participants remaining)",
                id, document_id, remaining
            );
        }
    }
}
