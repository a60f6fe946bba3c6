//! Delivery-record CRUD for the notification fan-out layer.
//!
//! Creation is an atomic create-if-absent keyed on `(notification_key,
//! target)`: concurrent or retried fan-out attempts for the same logical
//! event race on the primary key, not on a read-then-write, so exactly one
//! record per pair survives.

use chrono::{DateTime, Utc};
use rusqlite::params;

use causerie_shared::{DeviceToken, NotificationKey, ParticipantId};

use crate::database::Database;
use crate::error::Result;
use crate::models::DeliveryRecord;

impl Database {
    /// Create the record unless one already exists for its
    /// `(notification_key, target)`.  Returns true when a row was inserted.
    pub fn create_delivery_if_absent(&self, record: &DeliveryRecord) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT INTO deliveries (notification_key, target, recipient_id, recipient_name,
                                     sender_id, sender_name, message_summary, created_at,
                                     acknowledged)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (notification_key, target) DO NOTHING",
            params![
                record.notification_key.as_str(),
                record.target.as_str(),
                record.recipient.as_str(),
                record.recipient_name,
                record.sender.as_str(),
                record.sender_name,
                record.message_summary,
                record.created_at.to_rfc3339(),
                record.acknowledged as i64,
            ],
        )?;
        Ok(affected > 0)
    }

    /// All records under one notification key, in creation order.
    pub fn deliveries_for_key(&self, key: &NotificationKey) -> Result<Vec<DeliveryRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT notification_key, target, recipient_id, recipient_name,
                    sender_id, sender_name, message_summary, created_at, acknowledged
             FROM deliveries
             WHERE notification_key = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![key.as_str()], row_to_delivery)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Mark one record acknowledged.  Returns true only when a pending record
    /// was flipped; acknowledging an absent or already-acknowledged record is
    /// a no-op.
    pub fn acknowledge_delivery(
        &self,
        key: &NotificationKey,
        target: &DeviceToken,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE deliveries SET acknowledged = 1
             WHERE notification_key = ?1 AND target = ?2 AND acknowledged = 0",
            params![key.as_str(), target.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Unacknowledged records addressed to a recipient, in creation order.
    pub fn unacknowledged_for(&self, recipient: &ParticipantId) -> Result<Vec<DeliveryRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT notification_key, target, recipient_id, recipient_name,
                    sender_id, sender_name, message_summary, created_at, acknowledged
             FROM deliveries
             WHERE recipient_id = ?1 AND acknowledged = 0
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![recipient.as_str()], row_to_delivery)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn row_to_delivery(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryRecord> {
    let notification_key: String = row.get(0)?;
    let target: String = row.get(1)?;
    let recipient_id: String = row.get(2)?;
    let recipient_name: String = row.get(3)?;
    let sender_id: String = row.get(4)?;
    let sender_name: String = row.get(5)?;
    let message_summary: String = row.get(6)?;
    let ts_str: String = row.get(7)?;
    let acknowledged: i64 = row.get(8)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(DeliveryRecord {
        notification_key: NotificationKey(notification_key),
        recipient: ParticipantId(recipient_id),
        recipient_name,
        sender: ParticipantId(sender_id),
        sender_name,
        target: DeviceToken(target),
        message_summary,
        created_at,
        acknowledged: acknowledged != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, target: &str) -> DeliveryRecord {
        DeliveryRecord {
            notification_key: NotificationKey(key.to_string()),
            recipient: ParticipantId::from("u2"),
            recipient_name: "Dos".to_string(),
            sender: ParticipantId::from("u1"),
            sender_name: "Uno".to_string(),
            target: DeviceToken::from(target),
            message_summary: "hola".to_string(),
            created_at: Utc::now(),
            acknowledged: false,
        }
    }

    #[test]
    fn create_if_absent_deduplicates() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.create_delivery_if_absent(&record("k1", "tokA")).unwrap());
        assert!(!db.create_delivery_if_absent(&record("k1", "tokA")).unwrap());
        assert!(db.create_delivery_if_absent(&record("k1", "tokB")).unwrap());

        let records = db
            .deliveries_for_key(&NotificationKey("k1".to_string()))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, DeviceToken::from("tokA"));
        assert_eq!(records[1].target, DeviceToken::from("tokB"));
    }

    #[test]
    fn acknowledge_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.create_delivery_if_absent(&record("k1", "tokA")).unwrap();

        let key = NotificationKey("k1".to_string());
        let target = DeviceToken::from("tokA");

        assert!(db.acknowledge_delivery(&key, &target).unwrap());
        assert!(!db.acknowledge_delivery(&key, &target).unwrap());

        // Absent record: no-op, not an error.
        assert!(!db
            .acknowledge_delivery(&NotificationKey("missing".into()), &target)
            .unwrap());
    }

    #[test]
    fn unacknowledged_drains_as_records_are_acked() {
        let db = Database::open_in_memory().unwrap();
        db.create_delivery_if_absent(&record("k1", "tokA")).unwrap();
        db.create_delivery_if_absent(&record("k2", "tokA")).unwrap();

        let recipient = ParticipantId::from("u2");
        assert_eq!(db.unacknowledged_for(&recipient).unwrap().len(), 2);

        db.acknowledge_delivery(&NotificationKey("k1".to_string()), &DeviceToken::from("tokA"))
            .unwrap();

        let pending = db.unacknowledged_for(&recipient).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].notification_key.as_str(), "k2");
    }
}
