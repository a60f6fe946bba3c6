//! Device registry: per-user set of delivery targets.
//!
//! A participant signed in on several devices owns several tokens; the
//! `(user_id, token)` primary key keeps the collection a set, so re-adding a
//! known token is a no-op rather than a duplicate.

use chrono::{DateTime, Utc};
use rusqlite::params;

use causerie_shared::{DeviceToken, ParticipantId};

use crate::database::{Database, SharedDatabase};
use crate::error::{Result, StoreError};
use crate::models::DeviceTarget;

impl Database {
    /// Insert a target; returns false if the token was already registered.
    pub fn insert_device_target(
        &self,
        user: &ParticipantId,
        token: &DeviceToken,
        registered_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO device_targets (user_id, token, registered_at)
             VALUES (?1, ?2, ?3)",
            params![user.as_str(), token.as_str(), registered_at.to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    /// Delete a target; returns false if it was not registered.
    pub fn delete_device_target(&self, user: &ParticipantId, token: &DeviceToken) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM device_targets WHERE user_id = ?1 AND token = ?2",
            params![user.as_str(), token.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// All targets registered for a user, in registration order.
    ///
    /// A user that never registered a device yields an empty list.
    pub fn device_targets_for(&self, user: &ParticipantId) -> Result<Vec<DeviceTarget>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, token, registered_at
             FROM device_targets
             WHERE user_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![user.as_str()], |row| {
            let user_id: String = row.get(0)?;
            let token: String = row.get(1)?;
            let ts_str: String = row.get(2)?;
            let registered_at = DateTime::parse_from_rfc3339(&ts_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(DeviceTarget {
                user: ParticipantId(user_id),
                token: DeviceToken(token),
                registered_at,
            })
        })?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }
        Ok(targets)
    }
}

/// Shared handle for registering and reading delivery targets.
#[derive(Clone)]
pub struct DeviceRegistry {
    db: SharedDatabase,
}

impl DeviceRegistry {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    fn db(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register a delivery token for a user.  Idempotent: adding a token that
    /// is already present is a no-op; the return value says whether anything
    /// changed.
    pub fn add_target(&self, user: &ParticipantId, token: &DeviceToken) -> Result<bool> {
        let added = self
            .db()?
            .insert_device_target(user, token, Utc::now())?;
        if added {
            tracing::info!(user = %user, token = %token, "registered device target");
        } else {
            tracing::debug!(user = %user, token = %token, "device target already registered");
        }
        Ok(added)
    }

    /// Remove a delivery token.  Idempotent: removing an absent token is a
    /// no-op.
    pub fn remove_target(&self, user: &ParticipantId, token: &DeviceToken) -> Result<bool> {
        let removed = self.db()?.delete_device_target(user, token)?;
        if removed {
            tracing::info!(user = %user, token = %token, "removed device target");
        }
        Ok(removed)
    }

    /// The user's registered tokens, in registration order.  Empty (not an
    /// error) for users with no reachable devices.
    pub fn targets_for(&self, user: &ParticipantId) -> Result<Vec<DeviceToken>> {
        Ok(self
            .db()?
            .device_targets_for(user)?
            .into_iter()
            .map(|t| t.token)
            .collect())
    }
}
