use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ws::participants::ParticipantInfo;
use crate::ws::presence::normalize_display_name;
use crate::ws::session::ConnectionId;

/// Caret location inside the shared editor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub ch: u32,
}

/// Frames a client may send over the real-time channel.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinIdentity {
        user_id: String,
    },
    JoinDocument {
        document_id: String,
        username: Option<String>,
    },
    TextChange {
        document_id: String,
        content: String,
    },
    LanguageChange {
        document_id: String,
        language: String,
    },
    CursorPosition {
        document_id: String,
        position: CursorPosition,
        username: Option<String>,
    },
    ChatMessage {
        document_id: String,
        username: Option<String>,
        message: String,
    },
    CodeExecutionResult {
        document_id: String,
        output: String,
        executed_by: String,
    },
    RequestPermissionSignal {
        document_id: String,
        owner_id: String,
        requester_id: String,
        requester_name: String,
    },
    GrantPermissionSignal {
        document_id: String,
        user_id: String,
    },
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("event `{event}` is missing required field `{field}`")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },
}

impl ClientEvent {
    /// Decode and validate one text frame. Display names are normalized here
    /// and nowhere else.
    pub fn parse(frame: &str) -> Result<Self, EventError> {
        let event: ClientEvent = serde_json::from_str(frame)?;
        event.validate()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinIdentity { .. } => "join-identity",
            ClientEvent::JoinDocument { .. } => "join-document",
            ClientEvent::TextChange { .. } => "text-change",
            ClientEvent::LanguageChange { .. } => "language-change",
            ClientEvent::CursorPosition { .. } => "cursor-position",
            ClientEvent::ChatMessage { .. } => "chat-message",
            ClientEvent::CodeExecutionResult { .. } => "code-execution-result",
            ClientEvent::RequestPermissionSignal { .. } => "request-permission-signal",
            ClientEvent::GrantPermissionSignal { .. } => "grant-permission-signal",
        }
    }

    /// Document the event targets, if any.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            ClientEvent::JoinIdentity { .. } => None,
            ClientEvent::JoinDocument { document_id, .. }
            | ClientEvent::TextChange { document_id, .. }
            | ClientEvent::LanguageChange { document_id, .. }
            | ClientEvent::CursorPosition { document_id, .. }
            | ClientEvent::ChatMessage { document_id, .. }
            | ClientEvent::CodeExecutionResult { document_id, .. }
            | ClientEvent::RequestPermissionSignal { document_id, .. }
            | ClientEvent::GrantPermissionSignal { document_id, .. } => Some(document_id),
        }
    }

    fn validate(self) -> Result<Self, EventError> {
        let name = self.name();
        let require = |field: &'static str, value: &str| {
            if value.trim().is_empty() {
                Err(EventError::MissingField { event: name, field })
            } else {
                Ok(())
            }
        };

        if let Some(document_id) = self.document_id() {
            require("documentId", document_id)?;
        }

        let event = match self {
            ClientEvent::JoinIdentity { user_id } => {
                require("userId", &user_id)?;
                ClientEvent::JoinIdentity { user_id }
            }
            ClientEvent::JoinDocument { document_id, username } => ClientEvent::JoinDocument {
                document_id,
                username: optional_display_name(username),
            },
            ClientEvent::CursorPosition { document_id, position, username } => {
                ClientEvent::CursorPosition {
                    document_id,
                    position,
                    username: optional_display_name(username),
                }
            }
            ClientEvent::ChatMessage { document_id, username, message } => ClientEvent::ChatMessage {
                document_id,
                username: optional_display_name(username),
                message,
            },
            ClientEvent::CodeExecutionResult { document_id, output, executed_by } => {
                ClientEvent::CodeExecutionResult {
                    document_id,
                    output,
                    executed_by: normalize_display_name(&executed_by),
                }
            }
            ClientEvent::RequestPermissionSignal {
                document_id,
                owner_id,
                requester_id,
                requester_name,
            } => {
                require("ownerId", &owner_id)?;
                require("requesterId", &requester_id)?;
                ClientEvent::RequestPermissionSignal {
                    document_id,
                    owner_id,
                    requester_id,
                    requester_name: normalize_display_name(&requester_name),
                }
            }
            ClientEvent::GrantPermissionSignal { document_id, user_id } => {
                require("userId", &user_id)?;
                ClientEvent::GrantPermissionSignal { document_id, user_id }
            }
            other => other,
        };
        Ok(event)
    }
}

fn optional_display_name(raw: Option<String>) -> Option<String> {
    raw.map(|name| normalize_display_name(&name))
        .filter(|name| !name.is_empty())
}

/// Frames the server pushes to clients.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    DocumentContent {
        document_id: String,
        content: String,
        language: String,
    },
    TextUpdate {
        document_id: String,
        content: String,
    },
    LanguageChange {
        document_id: String,
        language: String,
    },
    CursorPosition {
        user_id: ConnectionId,
        username: String,
        position: CursorPosition,
    },
    ChatMessage {
        username: String,
        message: String,
    },
    CodeExecutionUpdate {
        output: String,
        executed_by: String,
    },
    ParticipantsUpdate {
        participants: Vec<ParticipantInfo>,
    },
    UsersCount {
        count: usize,
    },
    UserDisconnected {
        user_id: ConnectionId,
    },
    PermissionRequest {
        document_id: String,
        requester_id: String,
        requester_name: String,
    },
    PermissionGranted {
        document_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_camel_case_frames() {
        let event = ClientEvent::parse(
            r#"{"type":"text-change","documentId":"doc-1","content":"print(1)"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::TextChange {
                document_id: "doc-1".to_string(),
                content: "print(1)".to_string(),
            }
        );

        let event = ClientEvent::parse(
            r#"{"type":"cursor-position","documentId":"doc-1","position":{"line":3,"ch":7}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::CursorPosition {
                document_id: "doc-1".to_string(),
                position: CursorPosition { line: 3, ch: 7 },
                username: None,
            }
        );
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = ClientEvent::parse(r#"{"type":"text-change","documentId":"doc-1"}"#).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));

        let err = ClientEvent::parse(r#"{"type":"no-such-event"}"#).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));

        let err = ClientEvent::parse("not json").unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let err = ClientEvent::parse(r#"{"type":"join-document","documentId":"  "}"#).unwrap_err();
        assert!(matches!(
            err,
            EventError::MissingField { event: "join-document", field: "documentId" }
        ));

        let err = ClientEvent::parse(
            r#"{"type":"grant-permission-signal","documentId":"doc-1","userId":""}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EventError::MissingField { field: "userId", .. }));
    }

    #[test]
    fn display_names_are_normalized_once_at_the_boundary() {
        let event = ClientEvent::parse(
            r#"{"type":"chat-message","documentId":"doc-1","username":"alice!","message":"hi!"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::ChatMessage {
                document_id: "doc-1".to_string(),
                username: Some("alice".to_string()),
                message: "hi!".to_string(),
            }
        );

        let event = ClientEvent::parse(r#"{"type":"join-document","documentId":"doc-1","username":"!"}"#)
            .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinDocument {
                document_id: "doc-1".to_string(),
                username: None,
            }
        );
    }

    #[test]
    fn server_events_serialize_with_wire_names() {
        let value = serde_json::to_value(ServerEvent::CodeExecutionUpdate {
            output: "1\n".to_string(),
            executed_by: "alice".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "code-execution-update", "output": "1\n", "executedBy": "alice"})
        );

        let value = serde_json::to_value(ServerEvent::UsersCount { count: 2 }).unwrap();
        assert_eq!(value, json!({"type": "users-count", "count": 2}));

        let value = serde_json::to_value(ServerEvent::PermissionRequest {
            document_id: "doc-2".to_string(),
            requester_id: "u-r".to_string(),
            requester_name: "rita".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "permission-request",
                "documentId": "doc-2",
                "requesterId": "u-r",
                "requesterName": "rita"
            })
        );
    }
}
