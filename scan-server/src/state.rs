//! Shared application state

use std::sync::Arc;

use scan_core::{Clock, TokenCodec};

use crate::accounts::AccountService;
use crate::admin::AdminService;
use crate::config::Config;
use crate::email::{EmailSender, Notifier};
use crate::help::HelpDesk;
use crate::session::SessionManager;
use crate::store::AccountStore;
use crate::sweeper::ExpirySweeper;

/// Everything a handler can reach, wired over one store and one mailer
pub struct AppState<S, E> {
    pub config: Config,
    pub store: Arc<S>,
    pub sessions: Arc<SessionManager<S>>,
    pub accounts: AccountService<S, E>,
    pub help: Arc<HelpDesk<S, E>>,
    pub admin: AdminService<S, E>,
    pub sweeper: Arc<ExpirySweeper<S, E>>,
}

impl<S, E> AppState<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    pub fn new(config: Config, store: S, email_sender: E, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(store);
        let notifier = Arc::new(Notifier::new(email_sender, config.client_url.clone()));

        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            TokenCodec::new(config.jwt_secret.as_bytes()),
            clock.clone(),
            config.session.clone(),
        ));
        let help = Arc::new(HelpDesk::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            config.min_request_lead,
        ));
        let sweeper = Arc::new(ExpirySweeper::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            config.sweep_interval,
        ));
        let accounts = AccountService::new(
            store.clone(),
            sessions.clone(),
            notifier.clone(),
            clock,
            config.bcrypt_cost,
        );
        let admin = AdminService::new(
            store.clone(),
            sessions.clone(),
            help.clone(),
            sweeper.clone(),
            notifier,
        );

        Self {
            config,
            store,
            sessions,
            accounts,
            help,
            admin,
            sweeper,
        }
    }
}
