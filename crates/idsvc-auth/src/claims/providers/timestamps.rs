use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::clock::Clock;
use crate::config::TokenOptions;
use crate::error::AuthError;
use crate::types::claims::claim_types;

/// Adds `nbf`, `iat` and `exp` as Unix epoch seconds.
#[derive(Clone)]
pub struct TimestampsClaimsProvider {
    options: TokenOptions,
    clock: Arc<dyn Clock>,
}

impl TimestampsClaimsProvider {
    #[must_use]
    pub fn new(options: TokenOptions, clock: Arc<dyn Clock>) -> Self {
        Self { options, clock }
    }
}

impl std::fmt::Debug for TimestampsClaimsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampsClaimsProvider")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TokenClaimsProvider for TimestampsClaimsProvider {
    fn order(&self) -> i32 {
        orders::TIMESTAMPS
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        let mapping = self.options.mapping(context.kind());
        let now = self.clock.now();

        let not_before = offset(now, mapping.not_valid_before)?;
        let expires = offset(now, mapping.not_valid_after)?;

        context.add_claim(
            claim_types::NOT_BEFORE,
            not_before.unix_timestamp().to_string(),
        );
        context.add_claim(claim_types::ISSUED_AT, now.unix_timestamp().to_string());
        context.add_claim(claim_types::EXPIRES, expires.unix_timestamp().to_string());
        Ok(())
    }
}

fn offset(now: OffsetDateTime, by: std::time::Duration) -> AuthResult<OffsetDateTime> {
    time::Duration::try_from(by)
        .ok()
        .and_then(|by| now.checked_add(by))
        .ok_or_else(|| {
            AuthError::configuration(format!("token lifetime {}s is out of range", by.as_secs()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::context::RequestGrants;
    use crate::claims::providers::test_support::{context, values};
    use crate::clock::FixedClock;
    use crate::token::TokenKind;

    #[test]
    fn test_lifetimes_per_kind() {
        let clock = Arc::new(FixedClock::at_unix(1_700_000_000));
        let provider = TimestampsClaimsProvider::new(TokenOptions::default(), clock);

        let cases = [
            (TokenKind::AuthorizationCode, "1700000300"),
            (TokenKind::AccessToken, "1700007200"),
            (TokenKind::IdToken, "1700007200"),
            (TokenKind::RefreshToken, "1702592000"),
        ];

        for (kind, expires) in cases {
            let mut ctx = context(kind, RequestGrants::default());
            provider.on_generating_claims(&mut ctx).unwrap();

            assert_eq!(values(&ctx, claim_types::NOT_BEFORE), vec!["1700000000"]);
            assert_eq!(values(&ctx, claim_types::ISSUED_AT), vec!["1700000000"]);
            assert_eq!(values(&ctx, claim_types::EXPIRES), vec![expires], "{kind}");
        }
    }

    #[test]
    fn test_not_valid_before_offset() {
        let mut options = TokenOptions::default();
        options.access_token.not_valid_before = std::time::Duration::from_secs(30);
        let provider =
            TimestampsClaimsProvider::new(options, Arc::new(FixedClock::at_unix(1_000)));

        let mut ctx = context(TokenKind::AccessToken, RequestGrants::default());
        provider.on_generating_claims(&mut ctx).unwrap();
        assert_eq!(values(&ctx, claim_types::NOT_BEFORE), vec!["1030"]);
    }

    #[test]
    fn test_out_of_range_lifetime_is_configuration_error() {
        let mut options = TokenOptions::default();
        options.refresh_token.not_valid_after = std::time::Duration::from_secs(631_152_000_000);
        let provider =
            TimestampsClaimsProvider::new(options, Arc::new(FixedClock::at_unix(1_700_000_000)));

        let mut ctx = context(TokenKind::RefreshToken, RequestGrants::default());
        let err = provider.on_generating_claims(&mut ctx).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
        assert!(values(&ctx, claim_types::EXPIRES).is_empty());
    }
}
