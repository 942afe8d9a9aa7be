//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use scan_core::{AccountId, HelpRequest, RequestStatus, Role};

use super::{
    Account, AccountListing, AccountStore, NewAccount, ProfileUpdate, ResetCredential, SessionState, StoreResult,
    Verification,
};
use crate::error::ScanError;

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

/// In-memory account store
///
/// A single lock guards both maps so the email index can never drift from
/// the accounts it points at.
pub struct InMemoryAccountStore {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against an existing account
    fn modify<T>(&self, id: AccountId, f: impl FnOnce(&mut Account) -> T) -> StoreResult<T> {
        let mut inner = self.write();
        let account = inner.accounts.get_mut(&id).ok_or(ScanError::AccountNotFound)?;
        Ok(f(account))
    }

    fn collect(&self, keep: impl Fn(&Account) -> bool) -> Vec<Account> {
        let inner = self.read();
        let mut accounts: Vec<Account> = inner.accounts.values().filter(|a| keep(a)).cloned().collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        accounts
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut inner = self.write();
        if inner.by_email.contains_key(&new.email) {
            return Err(ScanError::EmailAlreadyExists);
        }

        let id = AccountId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let account = Account {
            id,
            email: new.email.clone(),
            password_hash: new.password_hash,
            is_approved: new.role != Role::Volunteer,
            role: new.role,
            verification: Verification {
                is_verified: false,
                pending_token_hash: Some(new.verification_token_hash),
                token_expires_at: Some(new.verification_expires_at),
            },
            banned: false,
            session: SessionState::default(),
            help_request: HelpRequest::Idle,
            help_version: 0,
            reset: ResetCredential::default(),
            profile: new.profile,
            created_at: new.created_at,
        };

        inner.by_email.insert(new.email, id);
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.read().accounts.get(&id).cloned())
    }

    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let inner = self.read();
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let mut inner = self.write();
        let removed = inner.accounts.remove(&id);
        if let Some(account) = &removed {
            inner.by_email.remove(&account.email);
        }
        Ok(removed)
    }

    fn list_by_role(&self, role: Role) -> StoreResult<Vec<Account>> {
        Ok(self.collect(|a| a.role == role))
    }

    fn list_with_help_status(&self, statuses: &[RequestStatus]) -> StoreResult<AccountListing> {
        let accounts = self.collect(|a| {
            a.role == Role::Citizen && statuses.contains(&a.help_request.status())
        });
        Ok(AccountListing {
            accounts,
            unreadable: 0,
        })
    }

    fn list_banned(&self) -> StoreResult<Vec<Account>> {
        Ok(self.collect(|a| a.banned))
    }

    fn set_session(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.modify(id, |a| {
            a.session = SessionState {
                token: Some(token.to_string()),
                expires_at: Some(expires_at),
                last_activity_at: Some(now),
            };
        })
    }

    fn touch_session(&self, id: AccountId, now: DateTime<Utc>) -> StoreResult<()> {
        self.modify(id, |a| a.session.last_activity_at = Some(now))
    }

    fn clear_session(&self, id: AccountId) -> StoreResult<()> {
        if let Some(account) = self.write().accounts.get_mut(&id) {
            account.session = SessionState::default();
        }
        Ok(())
    }

    fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        let inner = self.read();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.verification.pending_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    fn mark_verified(&self, id: AccountId) -> StoreResult<()> {
        self.modify(id, |a| {
            a.verification = Verification {
                is_verified: true,
                pending_token_hash: None,
                token_expires_at: None,
            };
        })
    }

    fn set_reset(&self, id: AccountId, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.modify(id, |a| {
            a.reset = ResetCredential {
                token_hash: Some(token_hash.to_string()),
                expires_at: Some(expires_at),
            };
        })
    }

    fn find_by_reset_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        let inner = self.read();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.reset.token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        self.modify(id, |a| {
            a.password_hash = password_hash.to_string();
            a.reset = ResetCredential::default();
        })
    }

    fn set_approved(&self, id: AccountId, approved: bool) -> StoreResult<()> {
        self.modify(id, |a| a.is_approved = approved)
    }

    fn set_banned(&self, id: AccountId, banned: bool) -> StoreResult<()> {
        self.modify(id, |a| a.banned = banned)
    }

    fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> StoreResult<Account> {
        self.modify(id, |a| {
            update.apply(&mut a.profile);
            a.clone()
        })
    }

    fn replace_help_request(
        &self,
        id: AccountId,
        expected_version: u64,
        new: &HelpRequest,
    ) -> StoreResult<bool> {
        self.modify(id, |a| {
            if a.help_version != expected_version {
                return false;
            }
            a.help_request = new.clone();
            a.help_version += 1;
            true
        })
    }
}
