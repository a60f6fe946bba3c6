//! # causerie-shared
//!
//! Identity and keying primitives shared by every causerie crate: participant
//! and device-token newtypes, canonical conversation keys, and the BLAKE3
//! fingerprints that make notification fan-out idempotent.

pub mod constants;
pub mod conversation;
pub mod fingerprint;
pub mod types;

mod error;

pub use error::KeyError;
pub use types::{ConversationKey, DeviceToken, MessageKind, NotificationKey, ParticipantId};
