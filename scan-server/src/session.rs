//! Session lifecycle
//!
//! Each account holds at most one live session token. Issuing a new one
//! replaces the stored token, which invalidates every earlier token for that
//! account. Refresh tokens are stateless and only carry the account id.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use scan_core::{AccountId, Clock, TokenCodec, TokenKind};
use serde::Serialize;

use crate::error::ScanError;
use crate::store::{Account, AccountStore};

/// Token lifetimes
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_ttl: Duration,
    pub idle_timeout: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::minutes(15),
            idle_timeout: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub session_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionManager<S> {
    store: Arc<S>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl<S: AccountStore> SessionManager<S> {
    pub fn new(store: Arc<S>, codec: TokenCodec, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self {
            store,
            codec,
            clock,
            config,
        }
    }

    /// Mint a fresh session and refresh token, replacing any earlier session
    pub fn issue_session(&self, id: AccountId) -> Result<SessionTokens, ScanError> {
        let now = self.clock.now();
        let expires_at = now + self.config.session_ttl;

        let session_token = self
            .codec
            .sign(id, TokenKind::Session, now, self.config.session_ttl)?;
        let refresh_token = self
            .codec
            .sign(id, TokenKind::Refresh, now, self.config.refresh_ttl)?;

        self.store.set_session(id, &session_token, expires_at, now)?;
        tracing::debug!(account_id = %id, %expires_at, "Session issued");

        Ok(SessionTokens {
            session_token,
            refresh_token,
            expires_at,
        })
    }

    /// Resolve a session token to its account, recording activity
    pub fn validate_session(&self, token: &str) -> Result<AccountId, ScanError> {
        self.authenticate(token).map(|account| account.id)
    }

    /// Like [`Self::validate_session`] but returns the whole account
    pub fn authenticate(&self, token: &str) -> Result<Account, ScanError> {
        let now = self.clock.now();

        let claims = self
            .codec
            .decode(token, TokenKind::Session)
            .map_err(|_| ScanError::Unauthenticated("Invalid token"))?;
        let id = claims
            .account_id()
            .map_err(|_| ScanError::Unauthenticated("Invalid token"))?;
        let account = self
            .store
            .get_account(id)?
            .ok_or(ScanError::Unauthenticated("Invalid token"))?;

        if let Err(reason) = self.check_session(&account, token, claims.is_expired(now), now) {
            tracing::debug!(account_id = %id, reason, "Rejecting session");
            self.store.clear_session(id)?;
            return Err(ScanError::Unauthenticated(reason));
        }

        self.store.touch_session(id, now)?;
        Ok(account)
    }

    fn check_session(
        &self,
        account: &Account,
        token: &str,
        token_expired: bool,
        now: DateTime<Utc>,
    ) -> Result<(), &'static str> {
        if account.banned {
            return Err("Account suspended");
        }
        if account.session.token.as_deref() != Some(token) {
            return Err("Invalid session");
        }
        let expired = token_expired || account.session.expires_at.map_or(true, |at| now > at);
        if expired {
            return Err("Session expired");
        }
        let idle = account
            .session
            .last_activity_at
            .map_or(true, |last| now - last > self.config.idle_timeout);
        if idle {
            return Err("Session expired due to inactivity");
        }
        Ok(())
    }

    /// Exchange a refresh token for a new session
    pub fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ScanError> {
        let now = self.clock.now();

        let id = self
            .codec
            .verify(refresh_token, TokenKind::Refresh, now)
            .and_then(|claims| claims.account_id())
            .map_err(|_| ScanError::InvalidRefreshToken)?;
        let account = self
            .store
            .get_account(id)?
            .ok_or(ScanError::InvalidRefreshToken)?;

        if account.banned {
            self.store.clear_session(id)?;
            return Err(ScanError::AccountBanned);
        }

        self.issue_session(id)
    }

    /// Drop the account's session; safe to call repeatedly
    pub fn clear_session(&self, id: AccountId) -> Result<(), ScanError> {
        self.store.clear_session(id)
    }
}
