//! Background expiry of unassigned help requests
//!
//! An open request whose requested moment has passed without a volunteer is
//! reset to idle and the citizen is told. One bad record never stops the
//! rest of the pass.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scan_core::{Clock, HelpRequest, RequestStatus};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::email::{EmailSender, Notifier};
use crate::store::AccountStore;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Open requests looked at
    pub examined: usize,
    /// Requests reset to idle
    pub expired: usize,
    /// Requests left alone because they could not be read or written
    pub skipped: usize,
}

pub struct ExpirySweeper<S, E> {
    store: Arc<S>,
    notifier: Arc<Notifier<E>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: Notify,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S, E> ExpirySweeper<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<Notifier<E>>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            interval,
            shutdown: Notify::new(),
            handle: Mutex::new(None),
        }
    }

    /// Expire every open request whose time has passed. Never fails.
    pub fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let listing = match self.store.list_with_help_status(&[RequestStatus::Open]) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "Expiry sweep could not list open requests");
                return report;
            }
        };
        report.examined += listing.unreadable;
        report.skipped += listing.unreadable;

        for account in listing.accounts {
            report.examined += 1;

            match account.help_request.is_expired(now) {
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        account_id = %account.id,
                        error = %e,
                        "Skipping help request with unreadable schedule"
                    );
                    report.skipped += 1;
                }
                Ok(true) => {
                    match self
                        .store
                        .replace_help_request(account.id, account.help_version, &HelpRequest::Idle)
                    {
                        Ok(true) => {
                            report.expired += 1;
                            tracing::info!(account_id = %account.id, "Help request expired");
                            if let Some(details) = account.help_request.details() {
                                self.notifier.request_expired(
                                    &account.email,
                                    &account.profile.name,
                                    details,
                                );
                            }
                        }
                        Ok(false) => {
                            tracing::debug!(
                                account_id = %account.id,
                                "Help request changed during sweep, leaving it"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                account_id = %account.id,
                                error = %e,
                                "Failed to expire help request"
                            );
                            report.skipped += 1;
                        }
                    }
                }
            }
        }

        report
    }

    /// Spawn the periodic sweep on the current tokio runtime
    ///
    /// The first pass runs immediately. Calling `start` on a running sweeper
    /// does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let sweeper = Arc::clone(self);
        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = sweeper.interval.as_secs(), "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pass = Arc::clone(&sweeper);
                        match tokio::task::spawn_blocking(move || pass.run_once()).await {
                            Ok(report) if report.examined > 0 => {
                                tracing::debug!(?report, "Expiry sweep finished");
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "Expiry sweep panicked"),
                        }
                    }
                    _ = sweeper.shutdown.notified() => break,
                }
            }

            tracing::info!("Expiry sweeper stopped");
        }));
    }

    /// Stop the periodic sweep and wait for the current pass to finish
    pub async fn stop(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // notify_one keeps a permit if the loop is busy sweeping
            self.shutdown.notify_one();
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Expiry sweeper task failed");
            }
        }
    }
}
