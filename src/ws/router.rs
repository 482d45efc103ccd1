use tracing::{debug, warn};

use crate::models::{ClientEvent, ServerEvent};
use super::hub::Hub;
use super::room::Room;
use super::session::{ConnectionId, ConnectionSession};

// Audience per event kind:
//   text-change, language-change, cursor-position -> room members except sender
//   chat-message, code-execution-result, presence  -> all room members
//   permission signals                             -> one identity channel
impl Hub {
    /// Route one validated inbound event.
    pub async fn dispatch(&self, session: &mut ConnectionSession, event: ClientEvent) {
        debug!(
            connection = %session.id(),
            event = event.name(),
            document = event.document_id().unwrap_or("-"),
            "Dispatching event"
        );

        match event {
            ClientEvent::JoinIdentity { user_id } => self.join_identity(session, &user_id).await,
            ClientEvent::JoinDocument { document_id, username } => {
                self.join_document(session, &document_id, username).await
            }
            ClientEvent::TextChange { document_id, content } => {
                self.with_member_room(session, &document_id, |room, sender| {
                    room.apply_text_change(content.clone());
                    room.participants().broadcast(
                        ServerEvent::TextUpdate {
                            document_id: document_id.clone(),
                            content,
                        },
                        Some(sender),
                    );
                })
                .await;
            }
            ClientEvent::LanguageChange { document_id, language } => {
                self.with_member_room(session, &document_id, |room, sender| {
                    room.apply_language_change(language.clone());
                    room.participants().broadcast(
                        ServerEvent::LanguageChange {
                            document_id: document_id.clone(),
                            language,
                        },
                        Some(sender),
                    );
                })
                .await;
            }
            ClientEvent::CursorPosition { document_id, position, username } => {
                self.with_member_room(session, &document_id, |room, sender| {
                    let username = username
                        .or_else(|| room.participants().username_of(sender).map(str::to_string))
                        .unwrap_or_else(|| super::presence::ANONYMOUS.to_string());
                    room.participants().broadcast(
                        ServerEvent::CursorPosition {
                            user_id: sender.clone(),
                            username,
                            position,
                        },
                        Some(sender),
                    );
                })
                .await;
            }
            ClientEvent::ChatMessage { document_id, username, message } => {
                self.with_member_room(session, &document_id, |room, sender| {
                    let username = username
                        .or_else(|| room.participants().username_of(sender).map(str::to_string))
                        .unwrap_or_else(|| super::presence::ANONYMOUS.to_string());
                    room.participants()
                        .broadcast(ServerEvent::ChatMessage { username, message }, None);
                })
                .await;
            }
            ClientEvent::CodeExecutionResult { document_id, output, executed_by } => {
                self.with_member_room(session, &document_id, |room, _sender| {
                    room.participants().broadcast(
                        ServerEvent::CodeExecutionUpdate { output, executed_by },
                        None,
                    );
                })
                .await;
            }
            ClientEvent::RequestPermissionSignal {
                document_id,
                owner_id,
                requester_id,
                requester_name,
            } => {
                self.request_permission(&document_id, &owner_id, &requester_id, &requester_name)
                    .await;
            }
            ClientEvent::GrantPermissionSignal { document_id, user_id } => {
                self.grant_permission(&document_id, &user_id).await;
            }
        }
    }

    async fn join_identity(&self, session: &ConnectionSession, user_id: &str) {
        if session.identity().user_id != user_id {
            warn!(
                "Connection {} (user {}) tried to join identity channel of {}; dropped",
                session.id(),
                session.identity().user_id,
                user_id
            );
            return;
        }
        if self.identities().is_member(user_id, session.id()).await {
            debug!("Connection {} already in identity channel {}", session.id(), user_id);
            return;
        }
        self.identities()
            .join(user_id, session.id(), session.outbox())
            .await;
    }

    /// Run `f` on the sender's room, provided the sender is bound to
    /// `document_id`. Events for other or unknown rooms are dropped.
    async fn with_member_room<R>(
        &self,
        session: &ConnectionSession,
        document_id: &str,
        f: impl FnOnce(&mut Room, &ConnectionId) -> R,
    ) -> Option<R> {
        if !session.is_bound_to(document_id) {
            debug!(
                "Connection {} is not in document {}; event dropped",
                session.id(),
                document_id
            );
            return None;
        }
        let sender = session.id();
        self.rooms()
            .with_room(document_id, |room| f(room, sender))
            .await
    }
}
