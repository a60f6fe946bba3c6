//! Assembly of the store handles and collaborator seams.
//!
//! One [`SyncContext`] is built per process; sessions and inboxes are then
//! opened against it.  All handles are cheap clones over the same shared
//! database.

use std::sync::Arc;

use causerie_blob::{BlobStore, FsBlobStore};
use causerie_shared::ParticipantId;
use causerie_store::{Database, DeviceRegistry, MessageStore, SharedDatabase};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fanout::NotificationFanout;
use crate::identity::IdentityProvider;
use crate::inbox::NotificationInbox;
use crate::session::ConversationSession;

/// The wired-together conversation core.
#[derive(Clone)]
pub struct SyncContext {
    pub store: MessageStore,
    pub registry: DeviceRegistry,
    pub fanout: NotificationFanout,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
}

impl SyncContext {
    /// Open the database and blob directory named by `config` and wire the
    /// components together.
    pub async fn open(config: &SyncConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        }
        .into_shared();

        let blobs: Arc<dyn BlobStore> = Arc::new(
            FsBlobStore::new(config.blob_dir.clone(), config.max_blob_size).await?,
        );

        Ok(Self::assemble(db, identity, blobs))
    }

    /// Wire the components over an already-open database.  Embedders and
    /// tests use this to supply their own database and blob store.
    pub fn assemble(
        db: SharedDatabase,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let store = MessageStore::new(db.clone());
        let registry = DeviceRegistry::new(db.clone());
        let fanout = NotificationFanout::new(db, registry.clone());

        Self {
            store,
            registry,
            fanout,
            identity,
            blobs,
        }
    }

    /// The same context seen by a different signed-in user.  Handles stay
    /// shared; only the identity seam changes.
    pub fn with_identity(&self, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    /// A closed session for a conversation with `peer`.
    pub fn session(&self, peer: ParticipantId, peer_name: impl Into<String>) -> ConversationSession {
        ConversationSession::new(self, peer, peer_name)
    }

    /// The delivery inbox for `recipient`.
    pub fn inbox(&self, recipient: ParticipantId) -> NotificationInbox {
        NotificationInbox::new(self.store.database(), recipient)
    }
}
