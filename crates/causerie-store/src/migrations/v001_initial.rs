//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `messages`, `device_targets` and
//! `deliveries`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Messages
--
-- `seq` is assigned by the store inside the append transaction and is
-- strictly increasing per conversation; it is the ordering authority
-- for every reader, independent of wall clocks.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id               TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_key TEXT NOT NULL,
    seq              INTEGER NOT NULL,
    sender_id        TEXT NOT NULL,
    sender_name      TEXT NOT NULL,
    receiver_id      TEXT NOT NULL,
    receiver_name    TEXT NOT NULL,
    kind             TEXT NOT NULL,              -- 'text' | 'image'
    text             TEXT NOT NULL DEFAULT '',
    attachment_url   TEXT,
    attachment_name  TEXT,
    created_at       TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_conversation_seq
    ON messages(conversation_key, seq);

-- ----------------------------------------------------------------
-- Device targets
--
-- One row per (user, token); the primary key gives the per-user token
-- collection its set semantics.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS device_targets (
    user_id       TEXT NOT NULL,
    token         TEXT NOT NULL,
    registered_at TEXT NOT NULL,

    PRIMARY KEY (user_id, token)
);

-- ----------------------------------------------------------------
-- Deliveries
--
-- At most one record per (notification_key, target); creation goes
-- through INSERT .. ON CONFLICT DO NOTHING so concurrent fan-out
-- attempts for the same logical event cannot duplicate records.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS deliveries (
    notification_key TEXT NOT NULL,
    target           TEXT NOT NULL,
    recipient_id     TEXT NOT NULL,
    recipient_name   TEXT NOT NULL,
    sender_id        TEXT NOT NULL,
    sender_name      TEXT NOT NULL,
    message_summary  TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    acknowledged     INTEGER NOT NULL DEFAULT 0, -- boolean 0/1

    PRIMARY KEY (notification_key, target)
);

CREATE INDEX IF NOT EXISTS idx_deliveries_recipient_pending
    ON deliveries(recipient_id, acknowledged);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
