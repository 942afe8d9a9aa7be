//! SCAN Core Library
//!
//! Domain rules for matching citizens who need help with volunteers:
//! - A citizen holds at most one help request, moved through an explicit
//!   state machine (idle, open, assigned, completed)
//! - Requested times are wall-clock values in IST regardless of server locale
//! - Session and refresh credentials are HS256-signed tokens

pub mod account;
pub mod clock;
pub mod error;
pub mod help;
pub mod region;
pub mod schedule;
pub mod token;

pub use account::{AccountId, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use help::{Assignment, CompletionProof, HelpDetails, HelpRequest, RequestStatus, VolunteerContact};
pub use region::{is_known_region, REGIONS};
pub use schedule::Schedule;
pub use token::{TokenClaims, TokenCodec, TokenKind};

/// Result type for scan-core operations
pub type Result<T> = std::result::Result<T, Error>;
