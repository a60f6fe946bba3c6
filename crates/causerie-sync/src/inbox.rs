//! Recipient-side delivery inbox.
//!
//! Delivery records addressed to this user are listed and, once handed to the
//! presentation layer, acknowledged so they are signalled exactly once.

use tracing::debug;

use causerie_shared::ParticipantId;
use causerie_store::{Database, DeliveryRecord, SharedDatabase, StoreError};

/// View over the unacknowledged delivery records of one recipient.
pub struct NotificationInbox {
    db: SharedDatabase,
    recipient: ParticipantId,
}

impl NotificationInbox {
    pub fn new(db: SharedDatabase, recipient: ParticipantId) -> Self {
        Self { db, recipient }
    }

    pub fn recipient(&self) -> &ParticipantId {
        &self.recipient
    }

    fn db(&self) -> Result<std::sync::MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Unacknowledged records addressed to this recipient, in creation order.
    pub fn pending(&self) -> Result<Vec<DeliveryRecord>, StoreError> {
        self.db()?.unacknowledged_for(&self.recipient)
    }

    /// Drain the pending records, acknowledging each one as observed.
    ///
    /// The returned records still carry `acknowledged = false` — they are the
    /// records as the recipient saw them; the store rows are flipped.  A
    /// second call returns nothing until new deliveries arrive.
    pub fn take_pending(&self) -> Result<Vec<DeliveryRecord>, StoreError> {
        let db = self.db()?;
        let pending = db.unacknowledged_for(&self.recipient)?;
        for record in &pending {
            db.acknowledge_delivery(&record.notification_key, &record.target)?;
        }
        if !pending.is_empty() {
            debug!(
                recipient = %self.recipient,
                count = pending.len(),
                "drained delivery inbox"
            );
        }
        Ok(pending)
    }
}
