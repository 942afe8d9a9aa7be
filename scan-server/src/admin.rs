//! Administrator operations
//!
//! Every operation takes the already-authenticated caller and refuses
//! anyone who is not an admin.

use std::sync::Arc;

use scan_core::{AccountId, HelpRequest, Role};

use crate::email::{EmailSender, Notifier};
use crate::error::ScanError;
use crate::help::{HelpDesk, HelpListing};
use crate::session::SessionManager;
use crate::store::{Account, AccountStore, AccountView};
use crate::sweeper::{ExpirySweeper, SweepReport};

pub struct AdminService<S, E> {
    store: Arc<S>,
    sessions: Arc<SessionManager<S>>,
    help: Arc<HelpDesk<S, E>>,
    sweeper: Arc<ExpirySweeper<S, E>>,
    notifier: Arc<Notifier<E>>,
}

fn require_admin(caller: &Account) -> Result<(), ScanError> {
    if caller.role != Role::Admin {
        return Err(ScanError::Forbidden("Admin access required"));
    }
    Ok(())
}

fn views(accounts: &[Account]) -> Vec<AccountView> {
    accounts
        .iter()
        .map(|a| AccountView::from(a).redacted())
        .collect()
}

impl<S, E> AdminService<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    pub fn new(
        store: Arc<S>,
        sessions: Arc<SessionManager<S>>,
        help: Arc<HelpDesk<S, E>>,
        sweeper: Arc<ExpirySweeper<S, E>>,
        notifier: Arc<Notifier<E>>,
    ) -> Self {
        Self {
            store,
            sessions,
            help,
            sweeper,
            notifier,
        }
    }

    fn volunteer(&self, id: AccountId) -> Result<Account, ScanError> {
        self.store
            .get_account(id)?
            .filter(|a| a.role == Role::Volunteer)
            .ok_or(ScanError::AccountNotFound)
    }

    fn other_account(&self, caller: &Account, id: AccountId) -> Result<Account, ScanError> {
        if caller.id == id {
            return Err(ScanError::Forbidden("Admins cannot do this to their own account"));
        }
        self.store.get_account(id)?.ok_or(ScanError::AccountNotFound)
    }

    /// Volunteers waiting for approval
    pub fn pending_volunteers(&self, caller: &Account) -> Result<Vec<AccountView>, ScanError> {
        require_admin(caller)?;
        let pending: Vec<Account> = self
            .store
            .list_by_role(Role::Volunteer)?
            .into_iter()
            .filter(|a| !a.is_approved && !a.banned)
            .collect();
        Ok(views(&pending))
    }

    pub fn approve_volunteer(&self, caller: &Account, id: AccountId) -> Result<AccountView, ScanError> {
        require_admin(caller)?;
        let volunteer = self.volunteer(id)?;
        self.store.set_approved(id, true)?;
        tracing::info!(admin_id = %caller.id, volunteer_id = %id, "Volunteer approved");
        self.notifier
            .volunteer_approved(&volunteer.email, &volunteer.profile.name);

        let volunteer = self.volunteer(id)?;
        Ok(AccountView::from(&volunteer))
    }

    /// Reject a volunteer application, deleting the account
    pub fn reject_volunteer(&self, caller: &Account, id: AccountId) -> Result<(), ScanError> {
        require_admin(caller)?;
        let volunteer = self.volunteer(id)?;
        self.sessions.clear_session(id)?;
        self.store.delete_account(id)?;
        tracing::info!(admin_id = %caller.id, volunteer_id = %id, "Volunteer rejected");
        self.notifier
            .volunteer_rejected(&volunteer.email, &volunteer.profile.name);
        Ok(())
    }

    /// Verified, unbanned users of one role
    pub fn list_users(&self, caller: &Account, role: &str) -> Result<Vec<AccountView>, ScanError> {
        require_admin(caller)?;
        let role = match Role::parse(role) {
            Some(role @ (Role::Citizen | Role::Volunteer)) => role,
            _ => {
                return Err(ScanError::ValidationError(
                    "Role must be Volunteer or Citizen".into(),
                ))
            }
        };
        let users: Vec<Account> = self
            .store
            .list_by_role(role)?
            .into_iter()
            .filter(|a| a.verification.is_verified && !a.banned)
            .collect();
        Ok(views(&users))
    }

    pub fn delete_user(&self, caller: &Account, id: AccountId) -> Result<(), ScanError> {
        require_admin(caller)?;
        let account = self.other_account(caller, id)?;
        self.sessions.clear_session(id)?;
        self.store.delete_account(id)?;
        tracing::info!(admin_id = %caller.id, account_id = %id, "Account deleted");
        self.notifier
            .account_terminated(&account.email, &account.profile.name);
        Ok(())
    }

    pub fn ban_user(&self, caller: &Account, id: AccountId) -> Result<(), ScanError> {
        require_admin(caller)?;
        let account = self.other_account(caller, id)?;
        self.store.set_banned(id, true)?;
        self.sessions.clear_session(id)?;
        tracing::info!(admin_id = %caller.id, account_id = %id, "Account banned");
        self.notifier
            .account_suspended(&account.email, &account.profile.name);
        Ok(())
    }

    pub fn unban_user(&self, caller: &Account, id: AccountId) -> Result<(), ScanError> {
        require_admin(caller)?;
        let account = self.store.get_account(id)?.ok_or(ScanError::AccountNotFound)?;
        self.store.set_banned(id, false)?;
        tracing::info!(admin_id = %caller.id, account_id = %id, "Account restored");
        self.notifier
            .account_restored(&account.email, &account.profile.name);
        Ok(())
    }

    /// Banned users, optionally narrowed by role ("All" means any) and a
    /// case-insensitive name fragment
    pub fn list_banned(
        &self,
        caller: &Account,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<AccountView>, ScanError> {
        require_admin(caller)?;
        let role = match category.map(str::trim).filter(|c| !c.is_empty() && *c != "All") {
            None => None,
            Some(c) => Some(
                Role::parse(c)
                    .ok_or_else(|| ScanError::ValidationError(format!("Unknown category: {c}")))?,
            ),
        };
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let banned: Vec<Account> = self
            .store
            .list_banned()?
            .into_iter()
            .filter(|a| role.map_or(true, |r| a.role == r))
            .filter(|a| {
                needle
                    .as_deref()
                    .map_or(true, |n| a.profile.name.to_lowercase().contains(n))
            })
            .collect();
        Ok(views(&banned))
    }

    pub fn list_helps(&self, caller: &Account) -> Result<Vec<HelpListing>, ScanError> {
        require_admin(caller)?;
        self.help.list_all()
    }

    pub fn complete_help(&self, caller: &Account, citizen_id: AccountId) -> Result<HelpRequest, ScanError> {
        require_admin(caller)?;
        let done = self.help.complete_as_admin(citizen_id)?;
        tracing::info!(admin_id = %caller.id, citizen_id = %citizen_id, "Help request completed by admin");
        Ok(done.without_code())
    }

    pub fn cancel_help(&self, caller: &Account, citizen_id: AccountId) -> Result<(), ScanError> {
        require_admin(caller)?;
        self.help.force_cancel(citizen_id)?;
        tracing::info!(admin_id = %caller.id, citizen_id = %citizen_id, "Help request cancelled by admin");
        Ok(())
    }

    /// Run an expiry pass now instead of waiting for the next tick
    pub fn run_sweep(&self, caller: &Account) -> Result<SweepReport, ScanError> {
        require_admin(caller)?;
        Ok(self.sweeper.run_once())
    }
}
