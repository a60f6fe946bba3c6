use thiserror::Error;

use causerie_blob::BlobError;
use causerie_store::StoreError;

use crate::session::SessionState;

/// Errors surfaced by sessions and the fan-out layer.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The backing store could not be reached.  Transient: retry with
    /// backoff.  The caller still owns its draft and loses nothing.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The draft violates the kind/content invariant.  Caller bug; do not
    /// retry unchanged.
    #[error("Invalid draft: {0}")]
    InvalidDraft(&'static str),

    /// The operation requires a live session.  Caller-sequencing bug.
    #[error("Session not live (state: {state:?})")]
    SessionNotLive { state: SessionState },

    /// `open` was called on a session that is not closed.
    #[error("Session already open")]
    AlreadyOpen,

    /// The identity provider has no signed-in user.  Recoverable by
    /// re-authenticating through the provider.
    #[error("Identity provider returned no signed-in user")]
    IdentityUnavailable,

    /// The blob store rejected or failed an operation.
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;
