//! Canonical conversation naming.
//!
//! The key for a two-party conversation is derived once, deterministically,
//! from the pair of participant ids: the ids are ordered lexicographically and
//! joined with a fixed separator, so both parties derive the same key no
//! matter who opens the conversation first.

use crate::constants::CONVERSATION_KEY_SEPARATOR;
use crate::error::KeyError;
use crate::types::{ConversationKey, ParticipantId};

impl ConversationKey {
    /// Derive the canonical key for the conversation between `a` and `b`.
    ///
    /// Order-independent: `between(a, b) == between(b, a)`. Both ids are
    /// assumed non-empty (caller contract).
    pub fn between(a: &ParticipantId, b: &ParticipantId) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() {
            (a, b)
        } else {
            (b, a)
        };
        Self(format!(
            "{}{}{}",
            lo.as_str(),
            CONVERSATION_KEY_SEPARATOR,
            hi.as_str()
        ))
    }

    /// Validate and wrap a key previously produced by [`ConversationKey::between`].
    pub fn parse(value: &str) -> Result<Self, KeyError> {
        let (lo, hi) = value
            .split_once(CONVERSATION_KEY_SEPARATOR)
            .ok_or_else(|| KeyError::MissingSeparator {
                sep: CONVERSATION_KEY_SEPARATOR,
                value: value.to_string(),
            })?;
        if lo.is_empty() || hi.is_empty() {
            return Err(KeyError::EmptyParticipant(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// The two participants named by this key, in lexicographic order.
    pub fn participants(&self) -> (ParticipantId, ParticipantId) {
        // Constructed through between()/parse(), so the separator is present.
        let (lo, hi) = self
            .0
            .split_once(CONVERSATION_KEY_SEPARATOR)
            .expect("conversation key always contains separator");
        (ParticipantId::from(lo), ParticipantId::from(hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_is_order_independent() {
        let u1 = ParticipantId::from("u1");
        let u2 = ParticipantId::from("u2");

        let forward = ConversationKey::between(&u1, &u2);
        let backward = ConversationKey::between(&u2, &u1);

        assert_eq!(forward, backward);
        assert_eq!(forward.as_str(), "u1__u2");
    }

    #[test]
    fn test_between_orders_lexicographically() {
        let key = ConversationKey::between(&"zeta".into(), &"alpha".into());
        assert_eq!(key.as_str(), "alpha__zeta");
    }

    #[test]
    fn test_participants_round_trip() {
        let a = ParticipantId::from("carol");
        let b = ParticipantId::from("bob");
        let key = ConversationKey::between(&a, &b);

        let (lo, hi) = key.participants();
        assert_eq!(lo, b);
        assert_eq!(hi, a);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ConversationKey::parse("no-separator-here").is_err());
        assert!(ConversationKey::parse("__u2").is_err());
        assert!(ConversationKey::parse("u1__u2").is_ok());
    }
}
