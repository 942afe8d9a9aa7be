//! Data models for account storage

use chrono::{DateTime, Utc};
use scan_core::{AccountId, HelpRequest, Role};
use serde::Serialize;

/// Email verification state
#[derive(Debug, Clone, Default)]
pub struct Verification {
    pub is_verified: bool,
    /// SHA-256 of the token mailed at signup
    pub pending_token_hash: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// The single live session of an account
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Outstanding password reset
#[derive(Debug, Clone, Default)]
pub struct ResetCredential {
    pub token_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub contact_number: String,
    /// Volunteers only
    pub skills: Vec<String>,
    /// Volunteers only
    pub home_location: Option<String>,
}

/// A stored account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verification: Verification,
    pub is_approved: bool,
    pub banned: bool,
    pub session: SessionState,
    pub help_request: HelpRequest,
    /// Bumped by every write of `help_request`
    pub help_version: u64,
    pub reset: ResetCredential,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Approved volunteers are the only ones who may accept or complete work
    pub fn is_active_volunteer(&self) -> bool {
        self.role == Role::Volunteer && self.is_approved && !self.banned
    }
}

/// Result of listing accounts
///
/// Rows that exist but cannot be decoded are counted in `unreadable` rather
/// than failing the whole listing.
#[derive(Debug, Clone, Default)]
pub struct AccountListing {
    pub accounts: Vec<Account>,
    pub unreadable: usize,
}

/// Input to [`super::AccountStore::create_account`]
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile: Profile,
    pub verification_token_hash: String,
    pub verification_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Partial profile edit; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub skills: Option<Vec<String>>,
    pub home_location: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, profile: &mut Profile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(contact) = self.contact_number {
            profile.contact_number = contact;
        }
        if let Some(skills) = self.skills {
            profile.skills = skills;
        }
        if let Some(location) = self.home_location {
            profile.home_location = Some(location);
        }
    }
}

/// What callers get to see of an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_approved: bool,
    pub banned: bool,
    #[serde(flatten)]
    pub profile: Profile,
    pub help_request: HelpRequest,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            is_verified: account.verification.is_verified,
            is_approved: account.is_approved,
            banned: account.banned,
            profile: account.profile.clone(),
            help_request: account.help_request.clone(),
            created_at: account.created_at,
        }
    }
}

impl AccountView {
    /// Drop the completion code, for views not shown to the owning citizen
    pub fn redacted(mut self) -> Self {
        self.help_request = self.help_request.without_code();
        self
    }
}
