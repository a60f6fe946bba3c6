//! Message log CRUD.
//!
//! Appends run in a transaction that assigns the per-conversation sequence
//! number together with the row insert, so `seq` has no gaps-from-races and
//! readers can treat it as the single ordering authority.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use causerie_shared::{ConversationKey, MessageKind, ParticipantId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Attachment, Message, MessageDraft};

impl Database {
    /// Append a message to a conversation.
    ///
    /// Assigns `id`, `seq` and `created_at` (store-authoritative) and returns
    /// the stored form.
    pub fn append_message(
        &mut self,
        conversation: &ConversationKey,
        draft: &MessageDraft,
    ) -> Result<Message> {
        let tx = self.conn_mut().transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_key = ?1",
            params![conversation.as_str()],
            |row| row.get(0),
        )?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();

        tx.execute(
            "INSERT INTO messages (id, conversation_key, seq, sender_id, sender_name,
                                   receiver_id, receiver_name, kind, text,
                                   attachment_url, attachment_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                conversation.as_str(),
                seq,
                draft.sender.as_str(),
                draft.sender_name,
                draft.receiver.as_str(),
                draft.receiver_name,
                draft.kind.as_str(),
                draft.text,
                draft.attachment.as_ref().map(|a| a.url.as_str()),
                draft.attachment.as_ref().map(|a| a.name.as_str()),
                created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        Ok(Message {
            id,
            conversation: conversation.clone(),
            sender: draft.sender.clone(),
            sender_name: draft.sender_name.clone(),
            receiver: draft.receiver.clone(),
            receiver_name: draft.receiver_name.clone(),
            kind: draft.kind,
            text: draft.text.clone(),
            attachment: draft.attachment.clone(),
            seq,
            created_at,
        })
    }

    /// Page through a conversation's history in ascending `seq` order.
    pub fn messages_for_conversation(
        &self,
        conversation: &ConversationKey,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, conversation_key, seq, sender_id, sender_name,
                    receiver_id, receiver_name, kind, text,
                    attachment_url, attachment_name, created_at
             FROM messages
             WHERE conversation_key = ?1
             ORDER BY seq ASC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![conversation.as_str(), limit, offset],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn message_by_id(&self, id: Uuid) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, conversation_key, seq, sender_id, sender_name,
                        receiver_id, receiver_name, kind, text,
                        attachment_url, attachment_name, created_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_str: String = row.get(1)?;
    let seq: i64 = row.get(2)?;
    let sender_id: String = row.get(3)?;
    let sender_name: String = row.get(4)?;
    let receiver_id: String = row.get(5)?;
    let receiver_name: String = row.get(6)?;
    let kind_str: String = row.get(7)?;
    let text: String = row.get(8)?;
    let attachment_url: Option<String> = row.get(9)?;
    let attachment_name: Option<String> = row.get(10)?;
    let ts_str: String = row.get(11)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let conversation = ConversationKey::parse(&conversation_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let kind = MessageKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown message kind: {kind_str}").into(),
        )
    })?;

    let attachment = match (attachment_url, attachment_name) {
        (Some(url), Some(name)) => Some(Attachment { url, name }),
        _ => None,
    };

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id,
        conversation,
        sender: ParticipantId(sender_id),
        sender_name,
        receiver: ParticipantId(receiver_id),
        receiver_name,
        kind,
        text,
        attachment,
        seq,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(text: &str) -> MessageDraft {
        MessageDraft::text("u1".into(), "Uno", "u2".into(), "Dos", text)
    }

    fn key() -> ConversationKey {
        ConversationKey::between(&"u1".into(), &"u2".into())
    }

    #[test]
    fn append_assigns_id_seq_and_timestamp() {
        let mut db = Database::open_in_memory().unwrap();
        let before = Utc::now();

        let stored = db.append_message(&key(), &draft("hola")).unwrap();

        assert_eq!(stored.seq, 1);
        assert_eq!(stored.text, "hola");
        assert!(stored.created_at >= before);

        let round_trip = db.message_by_id(stored.id).unwrap();
        assert_eq!(round_trip, stored);
    }

    #[test]
    fn seq_is_per_conversation() {
        let mut db = Database::open_in_memory().unwrap();
        let other = ConversationKey::between(&"u1".into(), &"u3".into());

        let m1 = db.append_message(&key(), &draft("a")).unwrap();
        let m2 = db.append_message(&key(), &draft("b")).unwrap();
        let m3 = db.append_message(&other, &draft("c")).unwrap();

        assert_eq!((m1.seq, m2.seq), (1, 2));
        assert_eq!(m3.seq, 1);
    }

    #[test]
    fn history_pages_ascending() {
        let mut db = Database::open_in_memory().unwrap();
        for text in ["a", "b", "c", "d"] {
            db.append_message(&key(), &draft(text)).unwrap();
        }

        let page = db.messages_for_conversation(&key(), 2, 1).unwrap();
        let texts: Vec<&str> = page.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[test]
    fn image_attachment_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        let image = MessageDraft::image(
            "u1".into(),
            "Uno",
            "u2".into(),
            "Dos",
            Attachment {
                url: "file:///tmp/photo.jpg".into(),
                name: "photo.jpg".into(),
            },
        );

        let stored = db.append_message(&key(), &image).unwrap();
        let loaded = db.message_by_id(stored.id).unwrap();

        assert!(loaded.is_image());
        assert_eq!(loaded.attachment.as_ref().unwrap().name, "photo.jpg");
        assert_eq!(loaded.summary(), "photo.jpg");
    }

    #[test]
    fn missing_message_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.message_by_id(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
