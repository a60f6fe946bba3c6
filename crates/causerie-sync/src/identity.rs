//! Identity provider seam.
//!
//! Authentication lives outside this core; the session only needs a stable
//! id and display name for the signed-in user. Sign-in and sign-out are the
//! provider's own lifecycle and are deliberately not part of this trait.

use causerie_shared::ParticipantId;

/// The signed-in user as reported by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: ParticipantId,
    pub display_name: String,
}

/// External source of the current user identity.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, or `None` when nobody is.
    fn current_user(&self) -> Option<UserProfile>;
}

/// Identity provider with a fixed answer.  Useful for tests and for embedders
/// whose authentication happens before the core is constructed.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    profile: Option<UserProfile>,
}

impl FixedIdentity {
    pub fn signed_in(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            profile: Some(UserProfile {
                id: ParticipantId::new(id),
                display_name: display_name.into(),
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self { profile: None }
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user(&self) -> Option<UserProfile> {
        self.profile.clone()
    }
}
