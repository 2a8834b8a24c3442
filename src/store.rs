//! The message store: ordered, append-only-by-default conversation history.
//!
//! [`MessageStore`] is the single source of truth for what is displayed
//! and what is sent as model context. It is mutated exclusively through
//! [`append`](MessageStore::append), [`replace`](MessageStore::replace),
//! and [`reset_with`](MessageStore::reset_with); each operation is atomic
//! from the caller's perspective and bumps a revision counter so the UI
//! can cheaply detect changes.
//!
//! `replace` is a silent no-op when the id is not present: a cancellation
//! may legitimately have reset the store before a stale continuation got
//! around to resolving its placeholder.
//!
//! # Examples
//!
//! ```
//! use harium::message::Message;
//! use harium::store::MessageStore;
//!
//! let store = MessageStore::new();
//! store.append(Message::user("Hello"));
//! assert_eq!(store.all().len(), 1);
//! ```

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::events::EngineEvent;
use crate::message::{Message, MessageId};

/// Ordered conversation history with atomic mutation operations.
///
/// Cheaply cloneable; clones share the same underlying history. The lock
/// is never held across an await point, which keeps the store safe under
/// the engine's cooperative single-conversation model.
#[derive(Debug, Clone)]
pub struct MessageStore {
    inner: Arc<RwLock<StoreInner>>,
    events: Option<broadcast::Sender<EngineEvent>>,
}

#[derive(Debug)]
struct StoreInner {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                messages: Vec::new(),
                revision: 0,
            })),
            events: None,
        }
    }

    /// Create a store seeded with a welcome banner.
    pub fn with_banner(banner: Message) -> Self {
        let store = Self::new();
        store.append(banner);
        store
    }

    /// Attach a broadcast sender; every mutation is mirrored as an event.
    pub fn with_events(mut self, tx: broadcast::Sender<EngineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Append a message at the end of the history.
    ///
    /// Ignored if a message with the same id is already present — ids are
    /// unique and an exact duplicate can only be a stale caller.
    pub fn append(&self, message: Message) {
        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            if inner.messages.iter().any(|m| m.id == message.id) {
                return;
            }
            inner.messages.push(message.clone());
            inner.revision += 1;
        }
        self.emit(EngineEvent::MessageAppended(message));
    }

    /// Replace the message with the given id in place, preserving order.
    ///
    /// Silent no-op when the id is not found.
    pub fn replace(&self, id: &str, message: Message) {
        let replaced = {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            match inner.messages.iter_mut().find(|m| m.id == id) {
                Some(slot) => {
                    *slot = message.clone();
                    inner.revision += 1;
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.emit(EngineEvent::MessageReplaced {
                id: id.to_string(),
                message,
            });
        }
    }

    /// Replace the entire history with a single banner message.
    pub fn reset_with(&self, banner: Message) {
        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            inner.messages.clear();
            inner.messages.push(banner.clone());
            inner.revision += 1;
        }
        self.emit(EngineEvent::StoreReset(banner));
    }

    /// Snapshot of the full ordered history.
    pub fn all(&self) -> Vec<Message> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.messages.clone()
    }

    /// Current revision; bumped by every mutation.
    pub fn revision(&self) -> u64 {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.revision
    }

    /// Number of messages in the history.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.messages.len()
    }

    /// Returns true if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a message by id.
    pub fn get(&self, id: &str) -> Option<Message> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.messages.iter().find(|m| m.id == id).cloned()
    }

    /// Returns true if any message is an in-flight placeholder.
    pub fn has_placeholder(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.messages.iter().any(Message::is_placeholder)
    }

    /// Ids of all messages, in store order. Test/diagnostic helper.
    pub fn ids(&self) -> Vec<MessageId> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.messages.iter().map(|m| m.id.clone()).collect()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageStatus;

    #[test]
    fn append_preserves_order() {
        let store = MessageStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        store.append(Message::user("three"));

        let contents: Vec<String> = store.all().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn append_bumps_revision() {
        let store = MessageStore::new();
        assert_eq!(store.revision(), 0);
        store.append(Message::user("hi"));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn append_ignores_duplicate_id() {
        let store = MessageStore::new();
        let msg = Message::user("hi");
        store.append(msg.clone());
        store.append(msg);
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn replace_preserves_position() {
        let store = MessageStore::new();
        store.append(Message::user("question"));
        let placeholder = Message::assistant_pending();
        let id = placeholder.id.clone();
        store.append(placeholder.clone());
        store.append(Message::user("another"));

        store.replace(&id, placeholder.resolved("answer", MessageStatus::Complete));

        let all = store.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].id, id);
        assert_eq!(all[1].content, "answer");
        assert_eq!(all[1].status, MessageStatus::Complete);
    }

    #[test]
    fn replace_missing_id_is_noop() {
        let store = MessageStore::new();
        store.append(Message::user("hi"));
        let rev = store.revision();
        store.replace("msg_0_000000", Message::assistant("ghost"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn reset_with_replaces_everything() {
        let store = MessageStore::new();
        store.append(Message::user("a"));
        store.append(Message::assistant("b"));

        store.reset_with(Message::banner("Context cleared."));

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert!(all[0].synthetic);
        assert_eq!(all[0].content, "Context cleared.");
    }

    #[test]
    fn has_placeholder_tracks_pending() {
        let store = MessageStore::new();
        store.append(Message::user("hi"));
        assert!(!store.has_placeholder());

        let placeholder = Message::assistant_pending();
        let id = placeholder.id.clone();
        store.append(placeholder.clone());
        assert!(store.has_placeholder());

        store.replace(&id, placeholder.resolved("done", MessageStatus::Complete));
        assert!(!store.has_placeholder());
    }

    #[test]
    fn get_finds_by_id() {
        let store = MessageStore::new();
        let msg = Message::user("find me");
        let id = msg.id.clone();
        store.append(msg);
        assert_eq!(store.get(&id).map(|m| m.content), Some("find me".into()));
        assert!(store.get("msg_0_000000").is_none());
    }

    #[tokio::test]
    async fn mutations_emit_events() {
        let (tx, mut rx) = broadcast::channel(16);
        let store = MessageStore::new().with_events(tx);

        let placeholder = Message::assistant_pending();
        let id = placeholder.id.clone();
        store.append(placeholder.clone());
        store.replace(&id, placeholder.resolved("ok", MessageStatus::Complete));
        store.reset_with(Message::banner("cleared"));

        assert!(matches!(rx.recv().await, Ok(EngineEvent::MessageAppended(_))));
        match rx.recv().await {
            Ok(EngineEvent::MessageReplaced { id: replaced, .. }) => assert_eq!(replaced, id),
            other => unreachable!("expected MessageReplaced, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Ok(EngineEvent::StoreReset(_))));
    }

    #[tokio::test]
    async fn replace_noop_emits_nothing() {
        let (tx, mut rx) = broadcast::channel(16);
        let store = MessageStore::new().with_events(tx);
        store.replace("msg_0_000000", Message::assistant("ghost"));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn clones_share_history() {
        let store = MessageStore::new();
        let clone = store.clone();
        store.append(Message::user("shared"));
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MessageStore>();
    }
}
