//! Domain model structs persisted in the local database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use causerie_shared::fingerprint;
use causerie_shared::{ConversationKey, DeviceToken, MessageKind, NotificationKey, ParticipantId};

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Reference to an uploaded binary, as returned by the blob store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Retrievable URL of the uploaded bytes.
    pub url: String,
    /// Original file name, for display.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single stored chat message.  Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message identifier, assigned by the store on append.
    pub id: Uuid,
    /// The conversation this message belongs to.
    pub conversation: ConversationKey,
    /// Sender identity and display name at send time.
    pub sender: ParticipantId,
    pub sender_name: String,
    /// Receiver identity and display name at send time.
    pub receiver: ParticipantId,
    pub receiver_name: String,
    /// Text or image.
    pub kind: MessageKind,
    /// Message text; empty for image messages.
    pub text: String,
    /// Attachment reference; present only for image messages.
    pub attachment: Option<Attachment>,
    /// Store-assigned per-conversation sequence number (ordering authority).
    pub seq: i64,
    /// When the store accepted the message.  Never caller-supplied, so
    /// ordering stays consistent across devices with skewed clocks.
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_image(&self) -> bool {
        self.kind == MessageKind::Image
    }

    /// One-line summary used for delivery records: the text, or the
    /// attachment name for image messages.
    pub fn summary(&self) -> String {
        match self.kind {
            MessageKind::Text => self.text.clone(),
            MessageKind::Image => self
                .attachment
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
        }
    }

    /// Stable hash of the distinguishing content (excludes `created_at`).
    pub fn content_fingerprint(&self) -> String {
        let (url, name) = match &self.attachment {
            Some(a) => (a.url.as_str(), a.name.as_str()),
            None => ("", ""),
        };
        fingerprint::content_fingerprint(self.kind, &self.text, url, name)
    }

    /// Idempotency key for fan-out of this message.
    pub fn notification_key(&self) -> NotificationKey {
        fingerprint::notification_key(&self.conversation, &self.sender, &self.content_fingerprint())
    }
}

// ---------------------------------------------------------------------------
// MessageDraft
// ---------------------------------------------------------------------------

/// An outgoing message before the store has accepted it.
///
/// The store assigns `id`, `seq` and `created_at` on append; everything else
/// comes from the draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: ParticipantId,
    pub sender_name: String,
    pub receiver: ParticipantId,
    pub receiver_name: String,
    pub kind: MessageKind,
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl MessageDraft {
    /// Draft for a plain text message.
    pub fn text(
        sender: ParticipantId,
        sender_name: impl Into<String>,
        receiver: ParticipantId,
        receiver_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            sender_name: sender_name.into(),
            receiver,
            receiver_name: receiver_name.into(),
            kind: MessageKind::Text,
            text: text.into(),
            attachment: None,
        }
    }

    /// Draft for an image message referencing an already-uploaded blob.
    pub fn image(
        sender: ParticipantId,
        sender_name: impl Into<String>,
        receiver: ParticipantId,
        receiver_name: impl Into<String>,
        attachment: Attachment,
    ) -> Self {
        Self {
            sender,
            sender_name: sender_name.into(),
            receiver,
            receiver_name: receiver_name.into(),
            kind: MessageKind::Image,
            text: String::new(),
            attachment: Some(attachment),
        }
    }

    /// Check the kind/content invariant: a text draft must carry non-empty
    /// text, an image draft an attachment reference.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self.kind {
            MessageKind::Text if self.text.trim().is_empty() => {
                Err("text message with empty text")
            }
            MessageKind::Text if self.attachment.is_some() => {
                Err("text message carrying an attachment")
            }
            MessageKind::Image if self.attachment.is_none() => {
                Err("image message without attachment reference")
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceTarget
// ---------------------------------------------------------------------------

/// A registered delivery target: one device token owned by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceTarget {
    pub user: ParticipantId,
    pub token: DeviceToken,
    /// When this token was first registered for this user.
    pub registered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// DeliveryRecord
// ---------------------------------------------------------------------------

/// One fan-out attempt: a "new message" signal addressed to a single device
/// of the recipient.
///
/// At most one record exists per `(notification_key, target)` pair; a second
/// fan-out attempt for the same logical event observes the existing record
/// instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub notification_key: NotificationKey,
    pub recipient: ParticipantId,
    pub recipient_name: String,
    pub sender: ParticipantId,
    pub sender_name: String,
    pub target: DeviceToken,
    pub message_summary: String,
    pub created_at: DateTime<Utc>,
    /// Flipped to true once the recipient's client has observed the record.
    /// Never mutated by the sender.
    pub acknowledged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_for_the_presentation_layer() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation: ConversationKey::between(&"u1".into(), &"u2".into()),
            sender: "u1".into(),
            sender_name: "Uno".to_string(),
            receiver: "u2".into(),
            receiver_name: "Dos".to_string(),
            kind: MessageKind::Image,
            text: String::new(),
            attachment: Some(Attachment {
                url: "file:///tmp/photo.jpg".to_string(),
                name: "photo.jpg".to_string(),
            }),
            seq: 7,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"image\""));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn draft_validation_enforces_one_of_text_or_attachment() {
        let valid = MessageDraft::text("u1".into(), "Uno", "u2".into(), "Dos", "hi");
        assert!(valid.validate().is_ok());

        let empty = MessageDraft::text("u1".into(), "Uno", "u2".into(), "Dos", "   ");
        assert!(empty.validate().is_err());

        let mut image = MessageDraft::image(
            "u1".into(),
            "Uno",
            "u2".into(),
            "Dos",
            Attachment {
                url: "file:///tmp/a.jpg".to_string(),
                name: "a.jpg".to_string(),
            },
        );
        assert!(image.validate().is_ok());

        image.attachment = None;
        assert!(image.validate().is_err());
    }
}
