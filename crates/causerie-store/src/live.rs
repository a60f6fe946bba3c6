//! Live message store: append + ordered subscriptions.
//!
//! External code talks to the log through [`MessageStore`] and receives new
//! messages over typed channels, keeping readers fully decoupled from the
//! persistence layer. One critical section spans the row insert and the
//! subscriber notification, so every subscriber of a conversation observes
//! appends in commit order — the store is the single ordering authority.
//!
//! Subscriptions deliver the live tail only; history is paged separately via
//! [`MessageStore::history`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use causerie_shared::ConversationKey;

use crate::database::{Database, SharedDatabase};
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageDraft};

struct Slot {
    id: u64,
    tx: mpsc::UnboundedSender<Vec<Message>>,
}

#[derive(Default)]
struct Hub {
    next_id: u64,
    subscribers: HashMap<ConversationKey, Vec<Slot>>,
}

impl Hub {
    fn publish(&mut self, conversation: &ConversationKey, message: &Message) {
        let Some(slots) = self.subscribers.get_mut(conversation) else {
            return;
        };

        // Deliver as a one-message batch; drop slots whose receiver is gone.
        slots.retain(|slot| slot.tx.send(vec![message.clone()]).is_ok());
        if slots.is_empty() {
            self.subscribers.remove(conversation);
        }
    }

    fn remove(&mut self, conversation: &ConversationKey, id: u64) {
        if let Some(slots) = self.subscribers.get_mut(conversation) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                self.subscribers.remove(conversation);
            }
        }
    }
}

/// Append-only, per-conversation ordered message log with live subscriptions.
///
/// Cheap to clone; all clones share the same database and subscriber hub.
#[derive(Clone)]
pub struct MessageStore {
    db: SharedDatabase,
    hub: Arc<Mutex<Hub>>,
}

impl MessageStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self {
            db,
            hub: Arc::new(Mutex::new(Hub::default())),
        }
    }

    /// The underlying database handle, for components co-located on the same
    /// store (device registry, delivery ledger).
    pub fn database(&self) -> SharedDatabase {
        self.db.clone()
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Append a message and notify every live subscriber of the conversation.
    ///
    /// The store assigns `id`, `seq` and `created_at`. Subscribers are
    /// notified before the database lock is released, which is what makes the
    /// observed order equal the commit order under concurrent appends.
    ///
    /// The draft is borrowed: on failure the caller still owns it and can
    /// retry without reconstructing anything.
    pub fn append(&self, conversation: &ConversationKey, draft: &MessageDraft) -> Result<Message> {
        let mut db = self.db()?;
        let message = db.append_message(conversation, draft)?;

        let mut hub = self.hub.lock().map_err(|_| StoreError::LockPoisoned)?;
        hub.publish(conversation, &message);
        drop(hub);
        drop(db);

        tracing::debug!(
            conversation = %conversation,
            id = %message.id,
            seq = message.seq,
            kind = %message.kind,
            "appended message"
        );
        Ok(message)
    }

    /// Open a live subscription to a conversation.
    ///
    /// The subscriber sees every append from this point on, in order; history
    /// is not replayed. Any number of concurrent subscriptions per key is
    /// supported.
    pub fn subscribe(&self, conversation: &ConversationKey) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut hub = match self.hub.lock() {
            Ok(hub) => hub,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = hub.next_id;
        hub.next_id += 1;
        hub.subscribers
            .entry(conversation.clone())
            .or_default()
            .push(Slot { id, tx });
        drop(hub);

        tracing::debug!(conversation = %conversation, sub = id, "opened subscription");

        Subscription {
            id,
            conversation: conversation.clone(),
            rx,
            hub: Arc::downgrade(&self.hub),
            cancelled: false,
        }
    }

    /// Page through a conversation's history in ascending order.
    pub fn history(
        &self,
        conversation: &ConversationKey,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        self.db()?.messages_for_conversation(conversation, limit, offset)
    }
}

/// A live view over one conversation's appends.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
    id: u64,
    conversation: ConversationKey,
    rx: mpsc::UnboundedReceiver<Vec<Message>>,
    hub: Weak<Mutex<Hub>>,
    cancelled: bool,
}

impl Subscription {
    pub fn conversation(&self) -> &ConversationKey {
        &self.conversation
    }

    /// Wait for the next ordered batch of appended messages.
    ///
    /// Returns `None` once the subscription is cancelled.
    pub async fn next_batch(&mut self) -> Option<Vec<Message>> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::next_batch`].
    pub fn try_next_batch(&mut self) -> Option<Vec<Message>> {
        if self.cancelled {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop delivery and release the hub slot.
    ///
    /// Idempotent, and a no-op when the store itself is already gone.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.rx.close();

        if let Some(hub) = self.hub.upgrade() {
            let mut hub = match hub.lock() {
                Ok(hub) => hub,
                Err(poisoned) => poisoned.into_inner(),
            };
            hub.remove(&self.conversation, self.id);
            tracing::debug!(conversation = %self.conversation, sub = self.id, "cancelled subscription");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
