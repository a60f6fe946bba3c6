//! Per-conversation session state machine.
//!
//! A session joins one two-party conversation: it derives the canonical
//! conversation key, holds the live subscription, appends outgoing messages
//! and triggers fan-out for each of them — strictly after the append has
//! durably succeeded, so a crash in between under-notifies rather than
//! signalling a message that was never stored.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use causerie_blob::BlobStore;
use causerie_shared::{ConversationKey, ParticipantId};
use causerie_store::{Attachment, Message, MessageDraft, MessageStore, Subscription};

use crate::context::SyncContext;
use crate::error::{Result, SessionError};
use crate::fanout::NotificationFanout;
use crate::identity::{IdentityProvider, UserProfile};

/// Lifecycle of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Live,
}

/// One open conversation between the signed-in user and a peer.
pub struct ConversationSession {
    state: SessionState,
    peer: ParticipantId,
    peer_name: String,
    self_profile: Option<UserProfile>,
    conversation: Option<ConversationKey>,
    subscription: Option<Subscription>,
    store: MessageStore,
    fanout: NotificationFanout,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
}

impl ConversationSession {
    /// Construct a closed session for a peer.  No I/O happens until
    /// [`ConversationSession::open`].
    pub fn new(ctx: &SyncContext, peer: ParticipantId, peer_name: impl Into<String>) -> Self {
        Self {
            state: SessionState::Closed,
            peer,
            peer_name: peer_name.into(),
            self_profile: None,
            conversation: None,
            subscription: None,
            store: ctx.store.clone(),
            fanout: ctx.fanout.clone(),
            identity: ctx.identity.clone(),
            blobs: ctx.blobs.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The conversation key, available once the session has been opened.
    pub fn conversation(&self) -> Option<&ConversationKey> {
        self.conversation.as_ref()
    }

    /// Resolve the signed-in user, derive the conversation key and start the
    /// live subscription.
    ///
    /// On success the session is `Live`.  If the identity provider has no
    /// signed-in user the session falls back to `Closed` and the caller can
    /// retry after re-authenticating.
    pub fn open(&mut self) -> Result<()> {
        if self.state != SessionState::Closed {
            return Err(SessionError::AlreadyOpen);
        }
        self.state = SessionState::Opening;

        let profile = match self.identity.current_user() {
            Some(profile) => profile,
            None => {
                self.state = SessionState::Closed;
                return Err(SessionError::IdentityUnavailable);
            }
        };

        let conversation = ConversationKey::between(&profile.id, &self.peer);
        let subscription = self.store.subscribe(&conversation);

        info!(
            conversation = %conversation,
            user = %profile.id,
            peer = %self.peer,
            "conversation session live"
        );

        self.self_profile = Some(profile);
        self.conversation = Some(conversation);
        self.subscription = Some(subscription);
        self.state = SessionState::Live;
        Ok(())
    }

    fn live_parts(&self) -> Result<(UserProfile, ConversationKey)> {
        match (self.state, &self.self_profile, &self.conversation) {
            (SessionState::Live, Some(profile), Some(conversation)) => {
                Ok((profile.clone(), conversation.clone()))
            }
            _ => Err(SessionError::SessionNotLive { state: self.state }),
        }
    }

    /// Append a draft to the conversation and fan out the delivery signal.
    ///
    /// Returns the stored message.  The draft is borrowed, so a failed send
    /// leaves it with the caller for a retry.  Fan-out problems never un-send
    /// the message; they are logged (and recorded per-target by the fan-out
    /// layer) while the append stands.
    pub fn send(&mut self, draft: &MessageDraft) -> Result<Message> {
        let (_, conversation) = self.live_parts()?;
        draft.validate().map_err(SessionError::InvalidDraft)?;

        let message = self.store.append(&conversation, draft)?;

        // Fan-out only after the append has durably succeeded.
        match self.fanout.notify(&message) {
            Ok(report) => {
                if !report.is_complete() {
                    warn!(
                        conversation = %conversation,
                        failed = report.failures.len(),
                        "fan-out incomplete for some targets"
                    );
                }
                debug!(
                    conversation = %conversation,
                    records = report.records.len(),
                    "message sent"
                );
            }
            Err(e) => {
                // The message is stored; a retried send of the same content
                // converges on the same notification key later.
                warn!(conversation = %conversation, error = %e, "fan-out failed after append");
            }
        }

        Ok(message)
    }

    /// Convenience for a plain text message to the session's peer.
    pub fn send_text(&mut self, text: &str) -> Result<Message> {
        let (profile, _) = self.live_parts()?;
        let draft = MessageDraft::text(
            profile.id,
            profile.display_name,
            self.peer.clone(),
            self.peer_name.clone(),
            text,
        );
        self.send(&draft)
    }

    /// Upload image bytes through the blob store, then send an image message
    /// referencing the uploaded URL.
    pub async fn send_image(&mut self, bytes: &[u8], file_name: &str) -> Result<Message> {
        let (profile, conversation) = self.live_parts()?;

        let path = format!("attachments/{}/{}_{}", conversation, Uuid::new_v4(), file_name);
        let url = self.blobs.upload(bytes, &path).await?;
        debug!(conversation = %conversation, url = %url, "attachment uploaded");

        let draft = MessageDraft::image(
            profile.id,
            profile.display_name,
            self.peer.clone(),
            self.peer_name.clone(),
            Attachment {
                url,
                name: file_name.to_string(),
            },
        );
        self.send(&draft)
    }

    /// Wait for the next ordered batch of messages in this conversation.
    ///
    /// Yields `None` once the session is closed; in-flight appends are not
    /// delivered after close.
    pub async fn next_batch(&mut self) -> Option<Vec<Message>> {
        if self.state != SessionState::Live {
            return None;
        }
        self.subscription.as_mut()?.next_batch().await
    }

    /// Non-blocking variant of [`ConversationSession::next_batch`].
    pub fn try_next_batch(&mut self) -> Option<Vec<Message>> {
        if self.state != SessionState::Live {
            return None;
        }
        self.subscription.as_mut()?.try_next_batch()
    }

    /// Cancel the subscription and close the session.  Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if let Some(conversation) = &self.conversation {
            info!(conversation = %conversation, "conversation session closed");
        }
        self.state = SessionState::Closed;
    }
}
