/// Separator between the two ordered participant ids in a conversation key.
pub const CONVERSATION_KEY_SEPARATOR: &str = "__";

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_CONTENT_FINGERPRINT: &str = "causerie-content-fingerprint-v1";
pub const KDF_CONTEXT_NOTIFICATION_KEY: &str = "causerie-notification-key-v1";
