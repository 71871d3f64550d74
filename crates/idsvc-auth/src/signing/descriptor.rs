//! Signing credential descriptors.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::token::jwt::{Jwk, SigningAlgorithm, SigningKeyPair};

/// Expiry used for keys configured without an end of validity.
pub const NEVER_EXPIRES: OffsetDateTime = time::macros::datetime!(9999-12-31 0:00 UTC);

/// A signing key together with its validity window `[not_before, expires)`.
#[derive(Debug, Clone)]
pub struct SigningCredentialsDescriptor {
    key: Arc<SigningKeyPair>,
    not_before: OffsetDateTime,
    expires: OffsetDateTime,
}

impl SigningCredentialsDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(key: Arc<SigningKeyPair>, not_before: OffsetDateTime, expires: OffsetDateTime) -> Self {
        Self {
            key,
            not_before,
            expires,
        }
    }

    /// Creates a descriptor valid at any time.
    #[must_use]
    pub fn unbounded(key: Arc<SigningKeyPair>) -> Self {
        Self::new(key, OffsetDateTime::UNIX_EPOCH, NEVER_EXPIRES)
    }

    /// Key ID.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.key.kid
    }

    /// Signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm
    }

    /// The key pair.
    #[must_use]
    pub fn key_pair(&self) -> &SigningKeyPair {
        &self.key
    }

    /// Start of validity.
    #[must_use]
    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    /// End of validity (exclusive).
    #[must_use]
    pub fn expires(&self) -> OffsetDateTime {
        self.expires
    }

    /// Returns `true` if `now` lies in `[not_before, expires)`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.not_before <= now && now < self.expires
    }

    /// Returns `true` if the window ended at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires
    }

    /// Public key metadata for the JWKS.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        self.key.to_jwk()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_window_is_half_open() {
        let key = Arc::new(SigningKeyPair::generate_ec("k1").unwrap());
        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let end = start + Duration::days(1);
        let descriptor = SigningCredentialsDescriptor::new(key, start, end);

        assert!(!descriptor.is_valid_at(start - Duration::seconds(1)));
        assert!(descriptor.is_valid_at(start));
        assert!(descriptor.is_valid_at(end - Duration::seconds(1)));
        assert!(!descriptor.is_valid_at(end));
        assert!(descriptor.is_expired_at(end));
        assert!(!descriptor.is_expired_at(start));
        assert_eq!(descriptor.kid(), "k1");
        assert_eq!(descriptor.to_jwk().kid, "k1");
    }
}
