//! Storage abstractions for accounts

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryAccountStore;
pub use models::*;
pub use sqlite::SqliteAccountStore;

use chrono::{DateTime, Utc};
use scan_core::{AccountId, HelpRequest, RequestStatus, Role};

use crate::error::ScanError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ScanError>;

/// Trait for account storage
///
/// Emails are matched exactly as given. Writes are last-write-wins except
/// [`AccountStore::replace_help_request`], which only applies when the help
/// request has not been written since it was read.
pub trait AccountStore: Send + Sync {
    /// Create an unverified account; fails with `EmailAlreadyExists` on duplicates
    fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// Get an account by ID
    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Get an account by email address
    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Remove an account, returning it if it existed
    fn delete_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// All accounts with the given role, oldest first
    fn list_by_role(&self, role: Role) -> StoreResult<Vec<Account>>;

    /// Citizens whose help request is in one of the given states, oldest first
    fn list_with_help_status(&self, statuses: &[RequestStatus]) -> StoreResult<AccountListing>;

    /// Banned accounts, oldest first
    fn list_banned(&self) -> StoreResult<Vec<Account>>;

    /// Replace the session, invalidating any earlier token
    fn set_session(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Record activity on the current session
    fn touch_session(&self, id: AccountId, now: DateTime<Utc>) -> StoreResult<()>;

    /// Drop the session; a missing account is not an error
    fn clear_session(&self, id: AccountId) -> StoreResult<()>;

    /// Find the account holding a pending verification token hash
    fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>>;

    /// Mark verified and clear the pending token
    fn mark_verified(&self, id: AccountId) -> StoreResult<()>;

    /// Store a password reset token hash
    fn set_reset(&self, id: AccountId, token_hash: &str, expires_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Find the account holding a reset token hash
    fn find_by_reset_token(&self, token_hash: &str) -> StoreResult<Option<Account>>;

    /// Set a new password hash and clear any reset token
    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()>;

    fn set_approved(&self, id: AccountId, approved: bool) -> StoreResult<()>;

    fn set_banned(&self, id: AccountId, banned: bool) -> StoreResult<()>;

    fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> StoreResult<Account>;

    /// Compare-and-set on the help request
    ///
    /// Writes `new` only if the stored `help_version` still equals
    /// `expected_version`, then bumps the version. Returns whether the write
    /// happened. `AccountNotFound` if the account is gone.
    fn replace_help_request(
        &self,
        id: AccountId,
        expected_version: u64,
        new: &HelpRequest,
    ) -> StoreResult<bool>;
}
