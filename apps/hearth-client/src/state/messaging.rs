//! # Messaging Store
//!
//! Customer/cook chat for the signed-in user. In memory only.
//!
//! ## Ordering
//! ```text
//! messages(conv)     oldest ──────────────► newest   (by created_at)
//! conversations()    newest last_message ──► oldest, empty threads last
//!
//! receive_message(m) where m.created_at is older than the tail:
//!   [m1 10:00] [m3 10:05]  +  m2 10:02  ──►  [m1] [m2] [m3]
//!   last_message recomputed ──► still m3
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use chrono::Utc;
use hearth_core::validation::validate_message_content;
use hearth_core::{generate_id, Conversation, CoreError, Message};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

#[derive(Debug)]
struct Thread {
    conversation: Conversation,
    /// Sorted by `created_at`, ties in arrival order.
    messages: Vec<Message>,
}

impl Thread {
    fn new(a: &str, b: &str) -> Self {
        Thread {
            conversation: Conversation::between(a, b),
            messages: Vec::new(),
        }
    }

    fn insert(&mut self, message: Message) {
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(at, message);
        self.conversation.refresh_last_message(&self.messages);
    }
}

#[derive(Debug, Default)]
struct Inner {
    current_user: Option<String>,
    threads: HashMap<String, Thread>,
}

#[derive(Debug, Default)]
pub struct MessagingStore {
    inner: RwLock<Inner>,
}

impl MessagingStore {
    pub fn new(current_user: Option<String>) -> Self {
        MessagingStore {
            inner: RwLock::new(Inner {
                current_user,
                threads: HashMap::new(),
            }),
        }
    }

    /// Switches user; conversations of the previous user are dropped.
    pub fn set_current_user(&self, user_id: Option<String>) {
        let mut inner = self.write();
        if inner.current_user != user_id {
            inner.threads.clear();
            inner.current_user = user_id;
        }
    }

    pub fn current_user(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_user
            .clone()
    }

    pub fn send_message(&self, receiver_id: &str, content: &str) -> AppResult<Message> {
        let content = validate_message_content(content)?;

        let mut inner = self.write();
        let sender_id = inner.current_user.clone().ok_or_else(|| {
            warn!("send_message called without a signed-in user");
            AppError::MissingUserId
        })?;

        let conversation_id = Conversation::id_for(&sender_id, receiver_id);
        let message = Message {
            id: generate_id(),
            conversation_id: conversation_id.clone(),
            sender_id: sender_id.clone(),
            receiver_id: receiver_id.to_string(),
            content,
            created_at: Utc::now(),
            read: true,
        };

        inner
            .threads
            .entry(conversation_id)
            .or_insert_with(|| Thread::new(&sender_id, receiver_id))
            .insert(message.clone());

        debug!(to = receiver_id, "Message sent");
        Ok(message)
    }

    /// Stores an incoming message. Returns false for a duplicate id.
    pub fn receive_message(&self, mut message: Message) -> bool {
        let mut inner = self.write();
        let incoming = inner.current_user.as_deref() == Some(message.receiver_id.as_str());

        // The pair decides the thread, whatever id the sender attached
        let conversation_id = Conversation::id_for(&message.sender_id, &message.receiver_id);
        message.conversation_id = conversation_id.clone();

        let thread = inner
            .threads
            .entry(conversation_id)
            .or_insert_with(|| Thread::new(&message.sender_id, &message.receiver_id));

        if thread.messages.iter().any(|m| m.id == message.id) {
            debug!(message_id = %message.id, "Duplicate message ignored");
            return false;
        }

        if incoming && !message.read {
            thread.conversation.unread_count += 1;
        }
        thread.insert(message);
        true
    }

    pub fn mark_conversation_read(&self, conversation_id: &str) -> AppResult<()> {
        let mut inner = self.write();
        let Inner {
            current_user,
            threads,
        } = &mut *inner;

        let thread = threads
            .get_mut(conversation_id)
            .ok_or_else(|| CoreError::ConversationNotFound(conversation_id.to_string()))?;

        for m in thread
            .messages
            .iter_mut()
            .filter(|m| current_user.as_deref() == Some(m.receiver_id.as_str()))
        {
            m.read = true;
        }
        thread.conversation.unread_count = 0;
        thread.conversation.refresh_last_message(&thread.messages);
        Ok(())
    }

    /// Most recently active first.
    pub fn conversations(&self) -> Vec<Conversation> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<Conversation> = inner
            .threads
            .values()
            .map(|t| t.conversation.clone())
            .collect();
        list.sort_by(|a, b| {
            let a_time = a.last_message.as_ref().map(|m| m.created_at);
            let b_time = b.last_message.as_ref().map(|m| m.created_at);
            b_time.cmp(&a_time).then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Oldest first. Unknown ids give an empty list.
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .threads
            .get(conversation_id)
            .map(|t| t.messages.clone())
            .unwrap_or_default()
    }

    pub fn total_unread(&self) -> u32 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .threads
            .values()
            .map(|t| t.conversation.unread_count)
            .sum()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn incoming(id: &str, minute: u32) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: String::new(),
            sender_id: "cook-1".to_string(),
            receiver_id: "cust-9".to_string(),
            content: format!("message {}", id),
            created_at: at(minute),
            read: false,
        }
    }

    #[test]
    fn test_last_message_tracks_latest_after_out_of_order_inserts() {
        let store = MessagingStore::new(Some("cust-9".to_string()));
        store.receive_message(incoming("m1", 0));
        store.receive_message(incoming("m3", 5));
        store.receive_message(incoming("m2", 2));

        let conv_id = Conversation::id_for("cook-1", "cust-9");
        let ids: Vec<String> = store.messages(&conv_id).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);

        let conversation = &store.conversations()[0];
        assert_eq!(conversation.last_message.as_ref().unwrap().id, "m3");
        assert_eq!(conversation.unread_count, 3);
    }

    #[test]
    fn test_unread_counts_only_incoming() {
        let store = MessagingStore::new(Some("cook-1".to_string()));
        // cook-1 is the sender here
        store.receive_message(incoming("m1", 0));
        assert_eq!(store.total_unread(), 0);

        let mut reply = incoming("m2", 1);
        reply.sender_id = "cust-9".to_string();
        reply.receiver_id = "cook-1".to_string();
        store.receive_message(reply.clone());
        assert!(!store.receive_message(reply));
        assert_eq!(store.total_unread(), 1);

        let conv_id = Conversation::id_for("cook-1", "cust-9");
        store.mark_conversation_read(&conv_id).unwrap();
        assert_eq!(store.total_unread(), 0);
        assert!(store
            .messages(&conv_id)
            .iter()
            .filter(|m| m.receiver_id == "cook-1")
            .all(|m| m.read));
        assert!(store.mark_conversation_read("conv_nobody").is_err());
    }

    #[test]
    fn test_send_message() {
        let store = MessagingStore::new(Some("cust-9".to_string()));
        let sent = store.send_message("cook-1", "  Is it spicy?  ").unwrap();

        assert_eq!(sent.content, "Is it spicy?");
        assert_eq!(sent.conversation_id, Conversation::id_for("cook-1", "cust-9"));
        assert_eq!(store.total_unread(), 0);
        assert_eq!(store.messages(&sent.conversation_id).len(), 1);

        assert!(store.send_message("cook-1", "   ").is_err());
        let too_long = "x".repeat(hearth_core::MAX_MESSAGE_LENGTH + 1);
        assert!(store.send_message("cook-1", &too_long).is_err());
    }

    #[test]
    fn test_underscored_ids_get_separate_threads() {
        let store = MessagingStore::new(Some("a".to_string()));
        let mut first = incoming("m1", 0);
        first.sender_id = "b_c".to_string();
        first.receiver_id = "a".to_string();
        store.receive_message(first);

        // Same naive "a_b_c" join, different pair
        let mut second = incoming("m2", 1);
        second.sender_id = "a_b".to_string();
        second.receiver_id = "c".to_string();
        store.receive_message(second);

        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.messages(&Conversation::id_for("a", "b_c")).len(), 1);
        assert_eq!(store.messages(&Conversation::id_for("a_b", "c")).len(), 1);
    }

    #[test]
    fn test_send_without_user() {
        let store = MessagingStore::new(None);
        assert!(matches!(
            store.send_message("cook-1", "hello"),
            Err(AppError::MissingUserId)
        ));
    }

    #[test]
    fn test_conversations_newest_first() {
        let store = MessagingStore::new(Some("cust-9".to_string()));
        store.receive_message(incoming("a", 0));

        let mut other = incoming("b", 30);
        other.sender_id = "cook-2".to_string();
        store.receive_message(other);

        let list = store.conversations();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, Conversation::id_for("cook-2", "cust-9"));
        assert_eq!(list[0].other_participant("cust-9"), Some("cook-2"));
    }

    #[test]
    fn test_switching_user_drops_threads() {
        let store = MessagingStore::new(Some("cust-9".to_string()));
        store.receive_message(incoming("m1", 0));
        store.set_current_user(Some("cust-10".to_string()));
        assert!(store.conversations().is_empty());

        let mut late = incoming("m2", 0);
        late.receiver_id = "cust-10".to_string();
        late.created_at = late.created_at + Duration::minutes(1);
        store.receive_message(late);
        assert_eq!(store.total_unread(), 1);
    }
}
