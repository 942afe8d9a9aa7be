//! Signed session and refresh tokens
//!
//! Both credentials are HS256 JWTs carrying the account id as `sub` and a
//! `typ` claim so a refresh token can never be presented as a session token
//! (and vice versa). Expiry is checked against an explicit `now` rather than
//! the system clock.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountId, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    Refresh,
}

/// JWT claims carried by every SCAN token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id
    pub sub: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Unique token id, so two tokens minted in the same second differ
    pub jti: String,
    pub typ: TokenKind,
}

impl TokenClaims {
    pub fn account_id(&self) -> Result<AccountId> {
        self.sub
            .parse()
            .map_err(|_| Error::InvalidToken(format!("bad subject {:?}", self.sub)))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs and verifies tokens with a shared secret
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a token for `subject` valid for `ttl` from `issued_at`
    pub fn sign(
        &self,
        subject: AccountId,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and kind only; expiry is left to the caller
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::InvalidToken(e.to_string()))?;

        if claims.typ != kind {
            return Err(Error::InvalidToken(format!(
                "expected {kind:?} token, got {:?}",
                claims.typ
            )));
        }
        Ok(claims)
    }

    /// Check signature, kind and expiry, returning the claims
    pub fn verify(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<TokenClaims> {
        let claims = self.decode(token, kind)?;
        if claims.is_expired(now) {
            return Err(Error::TokenExpired);
        }
        Ok(claims)
    }
}
