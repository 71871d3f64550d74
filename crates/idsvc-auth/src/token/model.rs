//! Token data types.
//!
//! A [`Token`] is a [`TokenKind`] tag plus an ordered bag of claims. Every kind
//! carries `jti`, `iat`, `exp` and `nbf` exactly once; the remaining structure
//! is described by a per-kind [`ClaimRules`] table and checked once, when the
//! token is constructed. A `Token` value therefore always satisfies the rules
//! of its kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::claims::{Claim, claim_types};

// ============================================================================
// Token Kind
// ============================================================================

/// The kinds of tokens the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived opaque code redeemed at the token endpoint.
    AuthorizationCode,
    /// Signed bearer token presented to resources.
    AccessToken,
    /// Signed OpenID Connect identity assertion.
    IdToken,
    /// Long-lived opaque token redeemed for new tokens.
    RefreshToken,
}

impl TokenKind {
    /// All token kinds.
    pub const ALL: [TokenKind; 4] = [
        TokenKind::AuthorizationCode,
        TokenKind::AccessToken,
        TokenKind::IdToken,
        TokenKind::RefreshToken,
    ];

    /// Returns the kind name as used in `granted_token` claims and responses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::AccessToken => "access_token",
            Self::IdToken => "id_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Returns `true` for kinds serialized as signed JWTs.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::AccessToken | Self::IdToken)
    }

    /// Returns the claim rules of this kind.
    #[must_use]
    pub fn rules(&self) -> &'static ClaimRules {
        match self {
            Self::AuthorizationCode => &AUTHORIZATION_CODE_RULES,
            Self::AccessToken => &ACCESS_TOKEN_RULES,
            Self::IdToken => &ID_TOKEN_RULES,
            Self::RefreshToken => &REFRESH_TOKEN_RULES,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TokenError::UnknownTokenKind {
                value: s.to_string(),
            })
    }
}

// ============================================================================
// Claim Rules
// ============================================================================

/// Claims that every token kind carries exactly once.
pub const COMMON_CLAIMS: [&str; 4] = [
    claim_types::TOKEN_ID,
    claim_types::ISSUED_AT,
    claim_types::EXPIRES,
    claim_types::NOT_BEFORE,
];

/// Cardinality constraints of one token kind, on top of [`COMMON_CLAIMS`].
#[derive(Debug)]
pub struct ClaimRules {
    /// Claim types that must appear exactly once.
    pub exactly_one: &'static [&'static str],
    /// Claim types that may appear at most once.
    pub at_most_one: &'static [&'static str],
    /// Claim types that must appear at least once.
    pub at_least_one: &'static [&'static str],
}

static AUTHORIZATION_CODE_RULES: ClaimRules = ClaimRules {
    exactly_one: &[
        claim_types::USER_ID,
        claim_types::CLIENT_ID,
        claim_types::SCOPE,
    ],
    at_most_one: &[
        claim_types::REDIRECT_URI,
        claim_types::RESOURCE,
        claim_types::CODE_CHALLENGE,
        claim_types::CODE_CHALLENGE_METHOD,
        claim_types::NONCE,
    ],
    at_least_one: &[claim_types::GRANTED_TOKEN],
};

static ACCESS_TOKEN_RULES: ClaimRules = ClaimRules {
    exactly_one: &[
        claim_types::ISSUER,
        claim_types::SUBJECT,
        claim_types::AUDIENCE,
        claim_types::SCOPE,
        claim_types::AUTHORIZED_PARTY,
    ],
    at_most_one: &[claim_types::NONCE],
    at_least_one: &[],
};

static ID_TOKEN_RULES: ClaimRules = ClaimRules {
    exactly_one: &[
        claim_types::ISSUER,
        claim_types::SUBJECT,
        claim_types::AUDIENCE,
    ],
    at_most_one: &[
        claim_types::NONCE,
        claim_types::CODE_HASH,
        claim_types::ACCESS_TOKEN_HASH,
    ],
    at_least_one: &[],
};

static REFRESH_TOKEN_RULES: ClaimRules = ClaimRules {
    exactly_one: &[
        claim_types::USER_ID,
        claim_types::CLIENT_ID,
        claim_types::SCOPE,
    ],
    at_most_one: &[
        claim_types::RESOURCE,
        claim_types::ISSUER,
        claim_types::NONCE,
    ],
    at_least_one: &[claim_types::GRANTED_TOKEN],
};

// ============================================================================
// Errors
// ============================================================================

/// A claim set violates the structure of its token kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// A required claim is absent.
    #[error("{kind} is missing the '{claim}' claim")]
    MissingClaim {
        /// Kind being constructed.
        kind: TokenKind,
        /// Missing claim type.
        claim: &'static str,
    },

    /// A claim that may appear only once appears several times.
    #[error("{kind} contains the '{claim}' claim {count} times")]
    DuplicatedClaim {
        /// Kind being constructed.
        kind: TokenKind,
        /// Duplicated claim type.
        claim: &'static str,
        /// Number of occurrences.
        count: usize,
    },

    /// A timestamp claim is not an integer number of epoch seconds.
    #[error("The '{claim}' claim value '{value}' is not a valid timestamp")]
    InvalidTimestamp {
        /// Timestamp claim type.
        claim: &'static str,
        /// Offending value.
        value: String,
    },

    /// A value does not name a token kind.
    #[error("'{value}' is not a token kind")]
    UnknownTokenKind {
        /// Offending value.
        value: String,
    },
}

// ============================================================================
// Token
// ============================================================================

/// An immutable, validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TokenRepr", into = "TokenRepr")]
pub struct Token {
    kind: TokenKind,
    claims: Vec<Claim>,
}

/// Serialized form: the kind tag and the claims as `[type, value]` pairs.
#[derive(Serialize, Deserialize)]
struct TokenRepr {
    kind: TokenKind,
    claims: Vec<(String, String)>,
}

impl From<Token> for TokenRepr {
    fn from(token: Token) -> Self {
        Self {
            kind: token.kind,
            claims: token
                .claims
                .into_iter()
                .map(|c| (c.claim_type, c.value))
                .collect(),
        }
    }
}

impl TryFrom<TokenRepr> for Token {
    type Error = TokenError;

    fn try_from(repr: TokenRepr) -> Result<Self, Self::Error> {
        let claims = repr
            .claims
            .into_iter()
            .map(|(claim_type, value)| Claim::new(claim_type, value))
            .collect();
        Token::new(repr.kind, claims)
    }
}

impl Token {
    /// Builds a token from a finished claim set.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the claims do not satisfy the rules of `kind`.
    pub fn new(kind: TokenKind, claims: Vec<Claim>) -> Result<Self, TokenError> {
        let count = |claim_type: &str| claims.iter().filter(|c| c.claim_type == claim_type).count();
        let rules = kind.rules();

        for claim in COMMON_CLAIMS.iter().chain(rules.exactly_one).copied() {
            match count(claim) {
                0 => return Err(TokenError::MissingClaim { kind, claim }),
                1 => {}
                n => {
                    return Err(TokenError::DuplicatedClaim {
                        kind,
                        claim,
                        count: n,
                    });
                }
            }
        }

        for claim in rules.at_most_one.iter().copied() {
            let n = count(claim);
            if n > 1 {
                return Err(TokenError::DuplicatedClaim {
                    kind,
                    claim,
                    count: n,
                });
            }
        }

        for claim in rules.at_least_one.iter().copied() {
            if count(claim) == 0 {
                return Err(TokenError::MissingClaim { kind, claim });
            }
        }

        let token = Self { kind, claims };
        for claim in [
            claim_types::ISSUED_AT,
            claim_types::EXPIRES,
            claim_types::NOT_BEFORE,
        ] {
            token.timestamp(claim)?;
        }
        for value in token.find_all(claim_types::GRANTED_TOKEN) {
            value.parse::<TokenKind>()?;
        }

        Ok(token)
    }

    /// Returns the kind of the token.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Returns the claims in insertion order.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Consumes the token and returns its claims.
    #[must_use]
    pub fn into_claims(self) -> Vec<Claim> {
        self.claims
    }

    /// Returns the first value of a claim type.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Returns every value of a claim type.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    fn required(&self, claim_type: &str) -> &str {
        // Presence is checked in `new` for every kind that exposes the accessor.
        self.find_first(claim_type).unwrap_or_default()
    }

    fn timestamp(&self, claim: &'static str) -> Result<OffsetDateTime, TokenError> {
        let value = self.required(claim);
        value
            .parse::<i64>()
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .ok_or_else(|| TokenError::InvalidTimestamp {
                claim,
                value: value.to_string(),
            })
    }

    fn timestamp_or_epoch(&self, claim: &'static str) -> OffsetDateTime {
        self.timestamp(claim).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Unique token identifier (`jti`).
    #[must_use]
    pub fn token_id(&self) -> &str {
        self.required(claim_types::TOKEN_ID)
    }

    /// Issue time (`iat`).
    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        self.timestamp_or_epoch(claim_types::ISSUED_AT)
    }

    /// Expiration time (`exp`).
    #[must_use]
    pub fn expires(&self) -> OffsetDateTime {
        self.timestamp_or_epoch(claim_types::EXPIRES)
    }

    /// Start of validity (`nbf`).
    #[must_use]
    pub fn not_before(&self) -> OffsetDateTime {
        self.timestamp_or_epoch(claim_types::NOT_BEFORE)
    }

    /// Returns `true` if `now` is at or past the expiration time.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires()
    }

    /// Returns `true` if `now` is before the start of validity.
    #[must_use]
    pub fn is_not_yet_valid(&self, now: OffsetDateTime) -> bool {
        now < self.not_before()
    }

    /// Issuer (`iss`), if present.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.find_first(claim_types::ISSUER)
    }

    /// Subject (`sub`), if present.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.find_first(claim_types::SUBJECT)
    }

    /// Audience (`aud`), if present.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.find_first(claim_types::AUDIENCE)
    }

    /// User identifier (`user_id`), if present.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.find_first(claim_types::USER_ID)
    }

    /// Client identifier (`client_id`), if present.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.find_first(claim_types::CLIENT_ID)
    }

    /// Resource owner (`resource`), if present.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.find_first(claim_types::RESOURCE)
    }

    /// Redirect URI (`redirect_uri`), if present.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.find_first(claim_types::REDIRECT_URI)
    }

    /// Nonce (`nonce`), if present.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.find_first(claim_types::NONCE)
    }

    /// Individual scopes of the space-separated `scope` claim.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.find_first(claim_types::SCOPE)
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Token kinds this token entitles its bearer to redeem.
    #[must_use]
    pub fn granted_tokens(&self) -> Vec<TokenKind> {
        self.find_all(claim_types::GRANTED_TOKEN)
            .filter_map(|v| v.parse().ok())
            .collect()
    }

    /// Returns `true` if the token grants the given kind.
    #[must_use]
    pub fn grants(&self, kind: TokenKind) -> bool {
        self.find_all(claim_types::GRANTED_TOKEN)
            .any(|v| v == kind.as_str())
    }
}
