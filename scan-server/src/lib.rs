//! SCAN help desk server
//!
//! Citizens post help requests, approved volunteers accept and complete
//! them with a handoff code, and admins moderate accounts. A background
//! sweeper expires open requests nobody picked up in time.

pub mod accounts;
pub mod admin;
pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod help;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod sweeper;

pub use accounts::AccountService;
pub use admin::AdminService;
pub use config::Config;
pub use email::{ConsoleEmailSender, EmailSender, Notifier, SmtpConfig, SmtpEmailSender};
pub use error::{ErrorKind, ScanError};
pub use help::{HelpDesk, HelpListing};
pub use session::{SessionConfig, SessionManager, SessionTokens};
pub use state::AppState;
pub use store::{AccountStore, InMemoryAccountStore, SqliteAccountStore};
pub use sweeper::{ExpirySweeper, SweepReport};
