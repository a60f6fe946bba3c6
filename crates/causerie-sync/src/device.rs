//! Device registration seam.
//!
//! The push transport (outside this core) knows this device's current
//! delivery token; registering it with the device registry is what makes the
//! device reachable by fan-out. Registration is idempotent, so it is safe to
//! run on every startup and on every token rotation.

use causerie_shared::{DeviceToken, ParticipantId};
use causerie_store::{DeviceRegistry, StoreError};

/// External source of this device's current delivery token.
pub trait DeviceTokenSource: Send + Sync {
    /// The current token, or `None` when the push transport has not issued
    /// one (yet).
    fn current_token(&self) -> Option<DeviceToken>;
}

/// Token source with a fixed answer, for tests and embedders that obtain the
/// token out-of-band.
#[derive(Debug, Clone)]
pub struct FixedTokenSource {
    token: Option<DeviceToken>,
}

impl FixedTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(DeviceToken::new(token)),
        }
    }

    pub fn unavailable() -> Self {
        Self { token: None }
    }
}

impl DeviceTokenSource for FixedTokenSource {
    fn current_token(&self) -> Option<DeviceToken> {
        self.token.clone()
    }
}

/// Register this device's current token for `user`.
///
/// Returns true when the token was newly registered, false when it was
/// already known or the source has no token to offer.
pub fn register_current_device(
    registry: &DeviceRegistry,
    source: &dyn DeviceTokenSource,
    user: &ParticipantId,
) -> Result<bool, StoreError> {
    match source.current_token() {
        Some(token) => registry.add_target(user, &token),
        None => {
            tracing::debug!(user = %user, "no delivery token available, skipping registration");
            Ok(false)
        }
    }
}
