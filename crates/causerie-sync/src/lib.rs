//! # causerie-sync
//!
//! Orchestration layer of the conversation core: the per-conversation
//! [`ConversationSession`] state machine, exactly-once notification fan-out,
//! and the seams to the external collaborators (identity provider, blob
//! store, device token source).
//!
//! A [`SyncContext`] wires the store-layer handles and collaborators together
//! once; sessions are then opened per peer.

pub mod config;
pub mod context;
pub mod device;
pub mod fanout;
pub mod identity;
pub mod inbox;
pub mod session;

mod error;

pub use config::SyncConfig;
pub use context::SyncContext;
pub use device::{register_current_device, DeviceTokenSource, FixedTokenSource};
pub use error::SessionError;
pub use fanout::{FanoutReport, NotificationFanout, TargetFailure};
pub use identity::{FixedIdentity, IdentityProvider, UserProfile};
pub use inbox::NotificationInbox;
pub use session::{ConversationSession, SessionState};
