use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::models::ServerEvent;
use super::participants::ParticipantRegistry;

/// Live state of one collaboratively edited document.
#[derive(Debug)]
pub struct Room {
    content: String,
    language: String,
    participants: ParticipantRegistry,
}

impl Room {
    pub fn new(language: &str) -> Self {
        Self {
            content: String::new(),
            language: language.to_string(),
            participants: ParticipantRegistry::default(),
        }
    }

    /// Replace the content wholesale. Last writer wins; there is no merge.
    pub fn apply_text_change(&mut self, content: String) {
        self.content = content;
    }

    pub fn apply_language_change(&mut self, language: String) {
        self.language = language;
    }

    /// Current `(content, language)` pair used to hydrate a joining connection.
    pub fn snapshot(&self) -> (String, String) {
        (self.content.clone(), self.language.clone())
    }

    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    pub fn participants_mut(&mut self) -> &mut ParticipantRegistry {
        &mut self.participants
    }

    /// Send the full participant list, then the member count, to every member.
    pub fn broadcast_presence(&self) {
        let participants = self.participants.snapshot();
        let count = participants.len();
        self.participants
            .broadcast(ServerEvent::ParticipantsUpdate { participants }, None);
        self.participants
            .broadcast(ServerEvent::UsersCount { count }, None);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoomStats {
    pub rooms: usize,
    pub occupied_rooms: usize,
    pub participants: usize,
}

/// Registry of live rooms keyed by document id.
///
/// Rooms are created on first join and retained for the lifetime of the
/// process, including after their last participant leaves. A later join
/// finds the last in-memory content.
///
/// The map lock only guards lookup and insertion. Every read or mutation of
/// a room happens under that room's own mutex, so rooms never contend with
/// each other.
#[derive(Debug)]
pub struct RoomStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    default_language: String,
}

impl RoomStore {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            default_language: default_language.into(),
        }
    }

    pub async fn get(&self, document_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(document_id).cloned()
    }

    /// Existing room, or a fresh empty one with the default language.
    pub async fn get_or_create(&self, document_id: &str) -> Arc<Mutex<Room>> {
        if let Some(room) = self.get(document_id).await {
            return room;
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(document_id.to_string())
            .or_insert_with(|| {
                info!("Creating room for document {}", document_id);
                Arc::new(Mutex::new(Room::new(&self.default_language)))
            })
            .clone()
    }

    /// Run `f` with exclusive access to a room. Unknown rooms are a no-op
    /// and yield `None`.
    pub async fn with_room<R>(&self, document_id: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let room = self.get(document_id).await?;
        let mut room = room.lock().await;
        Some(f(&mut room))
    }

    pub async fn snapshot(&self, document_id: &str) -> Option<(String, String)> {
        self.with_room(document_id, |room| room.snapshot()).await
    }

    pub async fn stats(&self) -> RoomStats {
        let rooms: Vec<Arc<Mutex<Room>>> = self.rooms.read().await.values().cloned().collect();
        let mut stats = RoomStats {
            rooms: rooms.len(),
            ..RoomStats::default()
        };
        for room in rooms {
            let room = room.lock().await;
            let participants = room.participants();
            stats.participants += participants.len();
            if !participants.is_empty() {
                stats.occupied_rooms += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = RoomStore::new("javascript");
        let first = store.get_or_create("doc-1").await;
        first.lock().await.apply_text_change("print(1)".to_string());

        let second = store.get_or_create("doc-1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            store.snapshot("doc-1").await,
            Some(("print(1)".to_string(), "javascript".to_string()))
        );
    }

    #[tokio::test]
    async fn unknown_room_operations_are_no_ops() {
        let store = RoomStore::new("javascript");
        let touched = store
            .with_room("missing", |room| room.apply_text_change("x".to_string()))
            .await;
        assert!(touched.is_none());
        assert!(store.snapshot("missing").await.is_none());
        assert_eq!(store.stats().await.rooms, 0);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = RoomStore::new("javascript");
        store.get_or_create("doc-1").await;
        store
            .with_room("doc-1", |room| room.apply_text_change("a".to_string()))
            .await;
        store
            .with_room("doc-1", |room| {
                room.apply_text_change("b".to_string());
                room.apply_language_change("python".to_string());
            })
            .await;
        assert_eq!(
            store.snapshot("doc-1").await,
            Some(("b".to_string(), "python".to_string()))
        );
    }
}
