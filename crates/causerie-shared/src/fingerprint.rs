//! Deterministic fingerprints for exactly-once notification fan-out.
//!
//! The notification key for a message is derived from the conversation key,
//! the sender and a fingerprint of the message's distinguishing content.
//! Timestamps are deliberately excluded: a retried trigger for the same
//! logical message must collapse to the same key even when the two attempts
//! observed slightly different timestamps.
//!
//! Fields are length-prefixed before hashing so that concatenation cannot be
//! ambiguous, and every hash uses a versioned BLAKE3 derive-key context.

use crate::constants::{KDF_CONTEXT_CONTENT_FINGERPRINT, KDF_CONTEXT_NOTIFICATION_KEY};
use crate::types::{ConversationKey, MessageKind, NotificationKey, ParticipantId};

fn update_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Stable hash of a message's distinguishing content.
///
/// Text messages hash their text; image messages hash the attachment URL and
/// file name. The message kind is mixed in so a text message can never
/// collide with an image message.
pub fn content_fingerprint(
    kind: MessageKind,
    text: &str,
    attachment_url: &str,
    attachment_name: &str,
) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_CONTENT_FINGERPRINT);
    update_field(&mut hasher, kind.as_str());
    match kind {
        MessageKind::Text => update_field(&mut hasher, text),
        MessageKind::Image => {
            update_field(&mut hasher, attachment_url);
            update_field(&mut hasher, attachment_name);
        }
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// Derive the idempotency key for one logical fan-out event.
pub fn notification_key(
    conversation: &ConversationKey,
    sender: &ParticipantId,
    content_fingerprint: &str,
) -> NotificationKey {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_NOTIFICATION_KEY);
    update_field(&mut hasher, conversation.as_str());
    update_field(&mut hasher, sender.as_str());
    update_field(&mut hasher, content_fingerprint);
    NotificationKey(hex::encode(hasher.finalize().as_bytes()))
}
