//! Notification fan-out.
//!
//! Every stored message produces at most one delivery record per registered
//! device of the recipient, no matter how many times the trigger fires. The
//! notification key is derived from the message content (never its
//! timestamp), and record creation races on the store's
//! `(notification_key, target)` primary key rather than on a read-then-write,
//! so concurrent and retried triggers converge on the same records.

use chrono::Utc;
use tracing::{debug, warn};

use causerie_shared::{DeviceToken, NotificationKey, ParticipantId};
use causerie_store::{
    Database, DeliveryRecord, DeviceRegistry, Message, SharedDatabase, StoreError,
};

/// One target that could not be recorded during a fan-out pass.
#[derive(Debug, Clone)]
pub struct TargetFailure {
    pub target: DeviceToken,
    pub reason: String,
}

/// Outcome of one fan-out pass: every record now standing under the
/// notification key (existing and newly created, in creation order), plus the
/// targets that failed individually.
#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub notification_key: NotificationKey,
    pub records: Vec<DeliveryRecord>,
    pub failures: Vec<TargetFailure>,
}

impl FanoutReport {
    /// True when every registered target is covered by a record.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fan-out engine over a shared store.
///
/// Reads the device registry, owns the delivery-record namespace, and never
/// mutates registry or message state.
#[derive(Clone)]
pub struct NotificationFanout {
    db: SharedDatabase,
    registry: DeviceRegistry,
}

impl NotificationFanout {
    pub fn new(db: SharedDatabase, registry: DeviceRegistry) -> Self {
        Self { db, registry }
    }

    fn db(&self) -> Result<std::sync::MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Emit the delivery records for a stored message.
    ///
    /// Must only be called for messages the store has durably accepted: a
    /// crash before this point under-notifies, which is recoverable, while
    /// fan-out for an unstored message would signal a message that does not
    /// exist.
    ///
    /// An empty target set (recipient has no reachable devices) yields an
    /// empty report, not an error. A failure on one target never aborts the
    /// others; it is reported per-target in the result.
    pub fn notify(&self, message: &Message) -> Result<FanoutReport, StoreError> {
        let key = message.notification_key();
        let targets = self.registry.targets_for(&message.receiver)?;

        let db = self.db()?;
        let existing = db.deliveries_for_key(&key)?;

        // Idempotent short-circuit: a previous pass already covered every
        // currently registered target.
        if !targets.is_empty()
            && targets
                .iter()
                .all(|t| existing.iter().any(|r| &r.target == t))
        {
            debug!(
                key = %key.short(),
                records = existing.len(),
                "fan-out already recorded, returning existing records"
            );
            return Ok(FanoutReport {
                notification_key: key,
                records: existing,
                failures: Vec::new(),
            });
        }

        let mut failures = Vec::new();
        for target in &targets {
            let record = DeliveryRecord {
                notification_key: key.clone(),
                recipient: message.receiver.clone(),
                recipient_name: message.receiver_name.clone(),
                sender: message.sender.clone(),
                sender_name: message.sender_name.clone(),
                target: target.clone(),
                message_summary: message.summary(),
                created_at: Utc::now(),
                acknowledged: false,
            };

            match db.create_delivery_if_absent(&record) {
                Ok(true) => {
                    debug!(key = %key.short(), target = %target, "created delivery record")
                }
                Ok(false) => {
                    debug!(key = %key.short(), target = %target, "delivery record already present")
                }
                Err(e) => {
                    warn!(key = %key.short(), target = %target, error = %e, "failed to record delivery");
                    failures.push(TargetFailure {
                        target: target.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let records = db.deliveries_for_key(&key)?;
        debug!(
            key = %key.short(),
            recipient = %message.receiver,
            records = records.len(),
            failed = failures.len(),
            "fan-out pass complete"
        );

        Ok(FanoutReport {
            notification_key: key,
            records,
            failures,
        })
    }

    /// Mark a delivery record observed by the recipient.
    ///
    /// Returns true only when a pending record was flipped; a late or
    /// duplicate acknowledgement (record absent or already acknowledged) is a
    /// no-op.
    pub fn acknowledge(
        &self,
        key: &NotificationKey,
        target: &DeviceToken,
    ) -> Result<bool, StoreError> {
        let flipped = self.db()?.acknowledge_delivery(key, target)?;
        if flipped {
            debug!(key = %key.short(), target = %target, "delivery acknowledged");
        }
        Ok(flipped)
    }

    /// Drop a target the push transport reports as permanently unreachable.
    pub fn prune_target(&self, user: &ParticipantId, token: &DeviceToken) -> Result<bool, StoreError> {
        let removed = self.registry.remove_target(user, token)?;
        if removed {
            warn!(user = %user, token = %token, "pruned unreachable device target");
        }
        Ok(removed)
    }
}
