//! Account workflows: signup, email verification, login, password reset, profile

use std::sync::Arc;

use chrono::Duration;
use scan_core::{is_known_region, AccountId, Clock, Role};
use serde::Serialize;

use crate::crypto::{generate_token, hash_password_with_cost, hash_token, verify_password};
use crate::email::{EmailSender, Notifier};
use crate::error::ScanError;
use crate::session::{SessionManager, SessionTokens};
use crate::store::{Account, AccountStore, AccountView, NewAccount, Profile, ProfileUpdate};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 80;

const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

/// Everything a new user submits
#[derive(Debug, Clone, Default)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub name: String,
    pub contact_number: String,
    pub role: String,
    pub skills: Vec<String>,
    pub home_location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verified {
    pub account: AccountView,
    /// Volunteers still need an admin before they can log in and help
    pub pending_approval: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedIn {
    pub user: AccountView,
    #[serde(flatten)]
    pub tokens: SessionTokens,
}

fn check_password_length(password: &str) -> Result<(), ScanError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ScanError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ScanError::PasswordTooLong);
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, ScanError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ScanError::ValidationError(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn check_region(location: &str) -> Result<(), ScanError> {
    if !is_known_region(location) {
        return Err(ScanError::ValidationError(format!("Unknown location: {location}")));
    }
    Ok(())
}

pub struct AccountService<S, E> {
    store: Arc<S>,
    sessions: Arc<SessionManager<S>>,
    notifier: Arc<Notifier<E>>,
    clock: Arc<dyn Clock>,
    bcrypt_cost: u32,
}

impl<S: AccountStore, E: EmailSender> AccountService<S, E> {
    pub fn new(
        store: Arc<S>,
        sessions: Arc<SessionManager<S>>,
        notifier: Arc<Notifier<E>>,
        clock: Arc<dyn Clock>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            sessions,
            notifier,
            clock,
            bcrypt_cost,
        }
    }

    fn hash(&self, password: &str) -> Result<String, ScanError> {
        hash_password_with_cost(password, self.bcrypt_cost)
            .map_err(|e| ScanError::Internal(format!("bcrypt: {e}")))
    }

    /// Create an unverified account and mail its verification link
    pub fn signup(&self, signup: Signup) -> Result<AccountView, ScanError> {
        let email = required(&signup.email, "email")?;
        let name = required(&signup.name, "name")?;
        let contact_number = required(&signup.contact_number, "contact number")?;
        let role = match Role::parse(signup.role.trim()) {
            Some(role @ (Role::Citizen | Role::Volunteer)) => role,
            _ => return Err(ScanError::ValidationError("Role must be Citizen or Volunteer".into())),
        };
        check_password_length(&signup.password)?;

        let (skills, home_location) = match role {
            Role::Volunteer => {
                let location = signup
                    .home_location
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty());
                if let Some(location) = &location {
                    check_region(location)?;
                }
                (signup.skills, location)
            }
            _ => (Vec::new(), None),
        };

        let now = self.clock.now();
        let raw_token = generate_token();
        let account = self.store.create_account(NewAccount {
            email,
            password_hash: self.hash(&signup.password)?,
            role,
            profile: Profile {
                name,
                contact_number,
                skills,
                home_location,
            },
            verification_token_hash: hash_token(&raw_token),
            verification_expires_at: now + Duration::hours(VERIFICATION_TTL_HOURS),
            created_at: now,
        })?;

        tracing::info!(account_id = %account.id, role = %account.role, "Account created");
        self.notifier
            .verification(&account.email, &account.profile.name, &raw_token);

        Ok(AccountView::from(&account))
    }

    /// Consume a verification token
    pub fn verify_email(&self, raw_token: &str) -> Result<Verified, ScanError> {
        let now = self.clock.now();
        let account = self
            .store
            .find_by_verification_token(&hash_token(raw_token.trim()))?
            .ok_or(ScanError::InvalidVerificationToken)?;

        let expired = account
            .verification
            .token_expires_at
            .map_or(true, |at| now > at);
        if expired {
            return Err(ScanError::InvalidVerificationToken);
        }

        self.store.mark_verified(account.id)?;
        tracing::info!(account_id = %account.id, "Email verified");

        let account = self
            .store
            .get_account(account.id)?
            .ok_or(ScanError::AccountNotFound)?;
        Ok(Verified {
            pending_approval: account.role == Role::Volunteer && !account.is_approved,
            account: AccountView::from(&account),
        })
    }

    /// Check credentials and open a session
    pub fn login(&self, email: &str, password: &str) -> Result<LoggedIn, ScanError> {
        let account = self
            .store
            .get_account_by_email(email.trim())?
            .ok_or(ScanError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash)
            .map_err(|e| ScanError::Internal(format!("bcrypt: {e}")))?;
        if !valid {
            return Err(ScanError::InvalidCredentials);
        }
        if account.banned {
            return Err(ScanError::AccountBanned);
        }
        if !account.verification.is_verified {
            return Err(ScanError::EmailNotVerified);
        }

        let tokens = self.sessions.issue_session(account.id)?;
        tracing::info!(account_id = %account.id, "Logged in");
        Ok(LoggedIn {
            user: AccountView::from(&account),
            tokens,
        })
    }

    pub fn logout(&self, id: AccountId) -> Result<(), ScanError> {
        self.sessions.clear_session(id)?;
        tracing::info!(account_id = %id, "Logged out");
        Ok(())
    }

    /// Mail a reset link; unknown addresses are accepted silently
    pub fn forgot_password(&self, email: &str) -> Result<(), ScanError> {
        let email = required(email, "email")?;
        let Some(account) = self.store.get_account_by_email(&email)? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let raw_token = generate_token();
        let expires_at = self.clock.now() + Duration::hours(RESET_TTL_HOURS);
        self.store
            .set_reset(account.id, &hash_token(&raw_token), expires_at)?;
        self.notifier
            .password_reset(&account.email, &account.profile.name, &raw_token);
        Ok(())
    }

    /// Set a new password from a reset link
    pub fn reset_password(&self, raw_token: &str, password: &str) -> Result<(), ScanError> {
        check_password_length(password)?;
        let now = self.clock.now();
        let account = self
            .store
            .find_by_reset_token(&hash_token(raw_token.trim()))?
            .ok_or(ScanError::InvalidVerificationToken)?;

        if account.reset.expires_at.map_or(true, |at| now > at) {
            return Err(ScanError::InvalidVerificationToken);
        }

        self.store.update_password(account.id, &self.hash(password)?)?;
        tracing::info!(account_id = %account.id, "Password reset");
        Ok(())
    }

    /// Edit name and contact; volunteers may also edit skills and home location
    pub fn update_profile(&self, account: &Account, update: ProfileUpdate) -> Result<AccountView, ScanError> {
        let mut update = ProfileUpdate {
            name: update.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            contact_number: update
                .contact_number
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            skills: update.skills,
            home_location: update
                .home_location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        };

        if account.role == Role::Volunteer {
            if let Some(location) = &update.home_location {
                check_region(location)?;
            }
        } else {
            update.skills = None;
            update.home_location = None;
        }

        let updated = self.store.update_profile(account.id, update)?;
        Ok(AccountView::from(&updated))
    }
}
