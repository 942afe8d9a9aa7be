//! Help desk: persists help request transitions and runs the assignment protocol
//!
//! Every write goes through a compare-and-set on the account's help version,
//! so two volunteers accepting the same request cannot both win: the loser
//! re-reads the request, finds it assigned and gets `AlreadyAssigned`.

use std::sync::Arc;

use chrono::Duration;
use scan_core::{
    AccountId, Clock, CompletionProof, HelpDetails, HelpRequest, RequestStatus, Role,
    VolunteerContact,
};
use serde::Serialize;

use crate::crypto::generate_completion_code;
use crate::email::{EmailSender, Notifier};
use crate::error::ScanError;
use crate::store::{Account, AccountStore};

/// Retries when the request is written between read and write
const MAX_ATTEMPTS: usize = 3;

/// A citizen's request as shown to volunteers and admins
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpListing {
    pub citizen_id: AccountId,
    pub citizen_email: String,
    pub citizen_name: String,
    pub citizen_contact: String,
    pub request: HelpRequest,
}

impl HelpListing {
    fn redacted(account: &Account) -> Self {
        Self {
            citizen_id: account.id,
            citizen_email: account.email.clone(),
            citizen_name: account.profile.name.clone(),
            citizen_contact: account.profile.contact_number.clone(),
            request: account.help_request.clone().without_code(),
        }
    }
}

pub struct HelpDesk<S, E> {
    store: Arc<S>,
    notifier: Arc<Notifier<E>>,
    clock: Arc<dyn Clock>,
    min_lead: Duration,
}

fn require_citizen(account: &Account) -> Result<(), ScanError> {
    if account.role != Role::Citizen {
        return Err(ScanError::Forbidden("Only citizens can request help"));
    }
    Ok(())
}

fn require_volunteer(account: &Account) -> Result<(), ScanError> {
    if account.role != Role::Volunteer {
        return Err(ScanError::Forbidden("Only volunteers can do this"));
    }
    if !account.is_approved {
        return Err(ScanError::Forbidden("Volunteer account is pending approval"));
    }
    Ok(())
}

impl<S: AccountStore, E: EmailSender> HelpDesk<S, E> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<Notifier<E>>,
        clock: Arc<dyn Clock>,
        min_lead: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            min_lead,
        }
    }

    /// Apply `f` to the stored request and write the result if nothing moved meanwhile
    fn transition<F>(&self, id: AccountId, mut f: F) -> Result<(Account, HelpRequest), ScanError>
    where
        F: FnMut(&HelpRequest) -> Result<HelpRequest, ScanError>,
    {
        for _ in 0..MAX_ATTEMPTS {
            let account = self
                .store
                .get_account(id)?
                .ok_or(ScanError::RequestNotFound)?;
            if account.role != Role::Citizen {
                return Err(ScanError::RequestNotFound);
            }

            let next = f(&account.help_request)?;
            if self
                .store
                .replace_help_request(id, account.help_version, &next)?
            {
                tracing::info!(
                    account_id = %id,
                    from = account.help_request.status().as_str(),
                    to = next.status().as_str(),
                    "Help request transition"
                );
                return Ok((account, next));
            }
            tracing::debug!(account_id = %id, "Help request changed concurrently, retrying");
        }
        Err(ScanError::Internal(format!(
            "help request for account {id} kept changing"
        )))
    }

    fn citizen_by_email(&self, email: &str) -> Result<Account, ScanError> {
        self.store
            .get_account_by_email(email)?
            .filter(|a| a.role == Role::Citizen)
            .ok_or(ScanError::RequestNotFound)
    }

    /// Citizen opens a request
    pub fn request(&self, citizen: &Account, details: HelpDetails) -> Result<HelpRequest, ScanError> {
        require_citizen(citizen)?;
        let now = self.clock.now();
        let (_, next) = self.transition(citizen.id, |current| {
            Ok(current.open(details.clone(), now, self.min_lead)?)
        })?;
        Ok(next)
    }

    /// Citizen withdraws their request
    pub fn cancel(&self, citizen: &Account) -> Result<(), ScanError> {
        require_citizen(citizen)?;
        let now = self.clock.now();
        self.transition(citizen.id, |current| Ok(current.cancel(now)?))?;
        Ok(())
    }

    /// Volunteer claims an open request
    ///
    /// The returned request has its completion code stripped; only the
    /// citizen receives it, by email.
    pub fn accept(&self, volunteer: &Account, citizen_email: &str) -> Result<HelpRequest, ScanError> {
        require_volunteer(volunteer)?;
        let citizen = self.citizen_by_email(citizen_email)?;
        let now = self.clock.now();
        let code = generate_completion_code();
        let contact = VolunteerContact {
            id: volunteer.id,
            name: volunteer.profile.name.clone(),
            contact: volunteer.profile.contact_number.clone(),
        };

        let (citizen, next) = self.transition(citizen.id, |current| {
            Ok(current.accept(contact.clone(), code.clone(), now)?)
        })?;

        if let (Some(details), Some(assignment)) = (next.details(), next.assignment()) {
            self.notifier
                .request_accepted(&citizen.email, &citizen.profile.name, details, assignment);
        }
        tracing::info!(citizen_id = %citizen.id, volunteer_id = %volunteer.id, "Help request accepted");
        Ok(next.without_code())
    }

    /// Volunteer closes a request with the citizen's completion code
    pub fn complete(
        &self,
        volunteer: &Account,
        citizen_email: &str,
        code: &str,
    ) -> Result<HelpRequest, ScanError> {
        require_volunteer(volunteer)?;
        let citizen = self.citizen_by_email(citizen_email)?;
        let now = self.clock.now();

        let (citizen, next) = self.transition(citizen.id, |current| {
            if current.status() == RequestStatus::Assigned && !current.is_assigned_to(volunteer.id) {
                return Err(ScanError::Forbidden(
                    "Only the assigned volunteer can complete this request",
                ));
            }
            Ok(current.complete(CompletionProof::Code(code), now)?)
        })?;

        self.notify_completed(&citizen, &next);
        Ok(next.without_code())
    }

    /// Admin closes an assigned request without a code
    pub fn complete_as_admin(&self, citizen_id: AccountId) -> Result<HelpRequest, ScanError> {
        let now = self.clock.now();
        let (citizen, next) = self.transition(citizen_id, |current| {
            Ok(current.complete(CompletionProof::Admin, now)?)
        })?;
        self.notify_completed(&citizen, &next);
        Ok(next)
    }

    /// Admin resets any non-idle request, ignoring the cancel cutoff
    pub fn force_cancel(&self, citizen_id: AccountId) -> Result<(), ScanError> {
        self.transition(citizen_id, |current| Ok(current.force_cancel()?))?;
        Ok(())
    }

    fn notify_completed(&self, citizen: &Account, next: &HelpRequest) {
        if let (Some(details), Some(assignment)) = (next.details(), next.assignment()) {
            self.notifier
                .request_completed(&citizen.email, &citizen.profile.name, details, assignment);
        }
    }

    /// Open requests still in the future, plus whatever this volunteer has assigned
    pub fn list_open_or_mine(&self, volunteer: &Account) -> Result<Vec<HelpListing>, ScanError> {
        require_volunteer(volunteer)?;
        let now = self.clock.now();
        let listing = self
            .store
            .list_with_help_status(&[RequestStatus::Open, RequestStatus::Assigned])?;

        Ok(listing
            .accounts
            .iter()
            .filter(|a| a.help_request.is_available(now) || a.help_request.is_assigned_to(volunteer.id))
            .map(HelpListing::redacted)
            .collect())
    }

    /// Every request that is not idle, for the admin dashboard
    pub fn list_all(&self) -> Result<Vec<HelpListing>, ScanError> {
        let listing = self.store.list_with_help_status(&[
            RequestStatus::Open,
            RequestStatus::Assigned,
            RequestStatus::Completed,
        ])?;
        Ok(listing.accounts.iter().map(HelpListing::redacted).collect())
    }
}
