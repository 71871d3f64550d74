//! Shared signing path of the JWT issuers.

use std::sync::Arc;

use serde_json::Value;
use serde_json::map::Entry;

use crate::AuthResult;
use crate::claims::{TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::issuers::build_token;
use crate::signing::SigningCredentialsPolicy;
use crate::token::{JwtPayload, JwtSigner, Token};
use crate::types::claims::claim_types;

/// Registered claims written from the token's typed accessors.
const STRUCTURED_CLAIMS: [&str; 6] = [
    claim_types::TOKEN_ID,
    claim_types::ISSUER,
    claim_types::AUDIENCE,
    claim_types::ISSUED_AT,
    claim_types::EXPIRES,
    claim_types::NOT_BEFORE,
];

#[derive(Clone)]
pub(crate) struct JwtTokenSigner {
    claims: TokenClaimsManager,
    policy: SigningCredentialsPolicy,
    signer: JwtSigner,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JwtTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenSigner")
            .field("issuer", &self.signer.issuer())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl JwtTokenSigner {
    pub(crate) fn new(
        claims: TokenClaimsManager,
        policy: SigningCredentialsPolicy,
        signer: JwtSigner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            claims,
            policy,
            signer,
            clock,
        }
    }

    pub(crate) fn policy(&self) -> &SigningCredentialsPolicy {
        &self.policy
    }

    pub(crate) fn signer(&self) -> &JwtSigner {
        &self.signer
    }

    pub(crate) fn now(&self) -> time::OffsetDateTime {
        self.clock.now()
    }

    /// Generates the claims of `context` and signs them with the current key.
    ///
    /// `literal` names claims that are copied verbatim after the structured
    /// fields instead of going through the generic claim grouping.
    pub(crate) async fn sign(
        &self,
        context: &mut TokenGeneratingContext,
        literal: &[&str],
    ) -> AuthResult<String> {
        let credentials = self.policy.current_credentials(self.clock.now()).await?;
        context.set_algorithm(credentials.algorithm());

        let token = build_token(&self.claims, context)?;
        let payload = payload(&token, literal);
        let jwt = self.signer.sign(credentials.key_pair(), &payload)?;

        tracing::debug!(
            kid = credentials.kid(),
            kind = %token.kind(),
            client_id = context
                .application()
                .find_first(crate::types::claims::principal_claim_types::CLIENT_ID)
                .unwrap_or_default(),
            "Issued token"
        );
        Ok(jwt)
    }
}

/// Builds the JWT payload of a finished token.
///
/// Repeated claim types become arrays; single ones stay strings.
pub(crate) fn payload(token: &Token, literal: &[&str]) -> JwtPayload {
    let mut payload = JwtPayload::new();

    for claim in token.claims() {
        let claim_type = claim.claim_type.as_str();
        if STRUCTURED_CLAIMS.contains(&claim_type) || literal.contains(&claim_type) {
            continue;
        }

        let value = Value::String(claim.value.clone());
        match payload.entry(claim_type) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::Array(values) => values.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }

    if let Some(issuer) = token.issuer() {
        payload.insert(claim_types::ISSUER.to_string(), issuer.into());
    }
    if let Some(audience) = token.audience() {
        payload.insert(claim_types::AUDIENCE.to_string(), audience.into());
    }
    payload.insert(claim_types::TOKEN_ID.to_string(), token.token_id().into());
    payload.insert(
        claim_types::NOT_BEFORE.to_string(),
        token.not_before().unix_timestamp().into(),
    );
    payload.insert(
        claim_types::EXPIRES.to_string(),
        token.expires().unix_timestamp().into(),
    );
    payload.insert(
        claim_types::ISSUED_AT.to_string(),
        token.issued_at().unix_timestamp().into(),
    );

    for claim_type in literal {
        if let Some(value) = token.find_first(claim_type) {
            payload.insert((*claim_type).to_string(), value.into());
        }
    }

    payload
}
