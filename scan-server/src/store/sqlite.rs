//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use scan_core::{AccountId, Assignment, HelpDetails, HelpRequest, RequestStatus, Role};

use super::{
    Account, AccountListing, AccountStore, NewAccount, Profile, ProfileUpdate, ResetCredential, SessionState,
    StoreResult, Verification,
};
use crate::error::ScanError;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, role, is_verified, \
    verification_token_hash, verification_expires_at, is_approved, banned, \
    session_token, session_expires_at, last_activity_at, reset_token_hash, reset_expires_at, \
    name, contact_number, skills, home_location, help_status, help_title, help_description, \
    help_note, help_location, help_date, help_time, volunteer_id, volunteer_name, \
    volunteer_contact, completion_code, accepted_at, completed_at, created_at, help_version";

/// SQLite-backed account store
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
}

impl SqliteAccountStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ScanError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// A private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, ScanError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ScanError> {
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ScanError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }
            if current_version < 2 {
                Self::migrate_v2(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ScanError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ScanError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                verification_token_hash TEXT,
                verification_expires_at TEXT,
                is_approved INTEGER NOT NULL DEFAULT 0,
                banned INTEGER NOT NULL DEFAULT 0,
                session_token TEXT,
                session_expires_at TEXT,
                last_activity_at TEXT,
                reset_token_hash TEXT,
                reset_expires_at TEXT,
                name TEXT NOT NULL,
                contact_number TEXT NOT NULL,
                skills TEXT NOT NULL DEFAULT '[]',
                home_location TEXT,

                -- Embedded help request
                help_status TEXT NOT NULL DEFAULT 'idle',
                help_title TEXT,
                help_description TEXT,
                help_note TEXT,
                help_location TEXT,
                help_date TEXT,
                help_time TEXT,
                volunteer_id INTEGER,
                volunteer_name TEXT,
                volunteer_contact TEXT,
                completion_code TEXT,
                accepted_at TEXT,
                completed_at TEXT,

                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_accounts_help
                ON accounts(role, help_status, help_location);
            CREATE INDEX IF NOT EXISTS idx_accounts_verification
                ON accounts(verification_token_hash);
            CREATE INDEX IF NOT EXISTS idx_accounts_reset
                ON accounts(reset_token_hash);
            "#,
        )?;

        Ok(())
    }

    /// Migration to version 2: help request write counter
    fn migrate_v2(conn: &Connection) -> Result<(), ScanError> {
        conn.execute_batch(
            "ALTER TABLE accounts ADD COLUMN help_version INTEGER NOT NULL DEFAULT 0;",
        )?;
        Ok(())
    }

    /// Decode rows one at a time; a row that cannot be decoded is logged and counted
    fn query_accounts(
        conn: &Connection,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<AccountListing> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {filter} ORDER BY created_at, id");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params)?;

        let mut listing = AccountListing::default();
        while let Some(row) = rows.next()? {
            match row_to_account(row) {
                Ok(account) => listing.accounts.push(account),
                Err(e) => {
                    let id = row.get::<_, i64>(0).ok();
                    tracing::warn!(account_id = ?id, error = %e, "Skipping unreadable account row");
                    listing.unreadable += 1;
                }
            }
        }
        Ok(listing)
    }

    fn query_account(
        conn: &Connection,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {filter}");
        Ok(conn.query_row(&sql, params, row_to_account).optional()?)
    }

    /// Run an UPDATE that must touch exactly one account
    fn update_one(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<()> {
        let rows_affected = self.conn().execute(sql, params)?;
        if rows_affected == 0 {
            return Err(ScanError::AccountNotFound);
        }
        Ok(())
    }
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("timestamp {value:?}: {e}")))
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| parse_ts(idx, s))
        .transpose()
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let role: String = row.get(3)?;
    let role = Role::parse(&role).ok_or_else(|| conversion_error(3, format!("role {role:?}")))?;

    let skills: String = row.get(16)?;
    let skills: Vec<String> =
        serde_json::from_str(&skills).map_err(|e| conversion_error(16, e.to_string()))?;

    Ok(Account {
        id: AccountId(row.get::<_, i64>(0)? as u64),
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role,
        verification: Verification {
            is_verified: row.get(4)?,
            pending_token_hash: row.get(5)?,
            token_expires_at: get_ts(row, 6)?,
        },
        is_approved: row.get(7)?,
        banned: row.get(8)?,
        session: SessionState {
            token: row.get(9)?,
            expires_at: get_ts(row, 10)?,
            last_activity_at: get_ts(row, 11)?,
        },
        reset: ResetCredential {
            token_hash: row.get(12)?,
            expires_at: get_ts(row, 13)?,
        },
        profile: Profile {
            name: row.get(14)?,
            contact_number: row.get(15)?,
            skills,
            home_location: row.get(17)?,
        },
        help_request: row_to_help_request(row)?,
        created_at: parse_ts(31, row.get(31)?)?,
        help_version: row.get::<_, i64>(32)? as u64,
    })
}

fn row_to_help_request(row: &Row<'_>) -> rusqlite::Result<HelpRequest> {
    let status: String = row.get(18)?;
    let status = RequestStatus::parse(&status)
        .ok_or_else(|| conversion_error(18, format!("help status {status:?}")))?;
    if status == RequestStatus::Idle {
        return Ok(HelpRequest::Idle);
    }

    let details = HelpDetails {
        title: row.get::<_, Option<String>>(19)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(20)?.unwrap_or_default(),
        note: row.get(21)?,
        location: row.get::<_, Option<String>>(22)?.unwrap_or_default(),
        requested_date: row.get::<_, Option<String>>(23)?.unwrap_or_default(),
        requested_time: row.get::<_, Option<String>>(24)?.unwrap_or_default(),
    };
    if status == RequestStatus::Open {
        return Ok(HelpRequest::Open { details });
    }

    let volunteer_id: Option<i64> = row.get(25)?;
    let accepted_at = get_ts(row, 29)?;
    let (Some(volunteer_id), Some(accepted_at)) = (volunteer_id, accepted_at) else {
        return Err(conversion_error(25, format!("{} request without volunteer", status.as_str())));
    };
    let assignment = Assignment {
        volunteer_id: AccountId(volunteer_id as u64),
        volunteer_name: row.get::<_, Option<String>>(26)?.unwrap_or_default(),
        volunteer_contact: row.get::<_, Option<String>>(27)?.unwrap_or_default(),
        completion_code: row.get::<_, Option<String>>(28)?.unwrap_or_default(),
        accepted_at,
        completed_at: get_ts(row, 30)?,
    };

    Ok(match status {
        RequestStatus::Assigned => HelpRequest::Assigned { details, assignment },
        _ => HelpRequest::Completed { details, assignment },
    })
}

impl AccountStore for SqliteAccountStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let conn = self.conn();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
            params![new.email],
            |row| row.get(0),
        )?;
        if exists {
            return Err(ScanError::EmailAlreadyExists);
        }

        let skills = serde_json::to_string(&new.profile.skills)
            .map_err(|e| ScanError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO accounts (email, password_hash, role, verification_token_hash,
                verification_expires_at, is_approved, name, contact_number, skills,
                home_location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                new.email,
                new.password_hash,
                new.role.as_str(),
                new.verification_token_hash,
                new.verification_expires_at.to_rfc3339(),
                new.role != Role::Volunteer,
                new.profile.name,
                new.profile.contact_number,
                skills,
                new.profile.home_location,
                new.created_at.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::query_account(&conn, "WHERE id = ?1", params![id])?
            .ok_or_else(|| ScanError::Internal("inserted account vanished".into()))
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Self::query_account(&self.conn(), "WHERE id = ?1", params![id.0 as i64])
    }

    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Self::query_account(&self.conn(), "WHERE email = ?1", params![email])
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn();
        let account = Self::query_account(&conn, "WHERE id = ?1", params![id.0 as i64])?;
        if account.is_some() {
            conn.execute("DELETE FROM accounts WHERE id = ?1", params![id.0 as i64])?;
        }
        Ok(account)
    }

    fn list_by_role(&self, role: Role) -> StoreResult<Vec<Account>> {
        Ok(Self::query_accounts(&self.conn(), "WHERE role = ?1", params![role.as_str()])?.accounts)
    }

    fn list_with_help_status(&self, statuses: &[RequestStatus]) -> StoreResult<AccountListing> {
        if statuses.is_empty() {
            return Ok(AccountListing::default());
        }
        let placeholders = (2..statuses.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let filter = format!("WHERE role = ?1 AND help_status IN ({placeholders})");
        let values = std::iter::once(Role::Citizen.as_str()).chain(statuses.iter().map(|s| s.as_str()));
        Self::query_accounts(&self.conn(), &filter, params_from_iter(values))
    }

    fn list_banned(&self) -> StoreResult<Vec<Account>> {
        Ok(Self::query_accounts(&self.conn(), "WHERE banned = 1", [])?.accounts)
    }

    fn set_session(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET session_token = ?2, session_expires_at = ?3, last_activity_at = ?4
             WHERE id = ?1",
            params![id.0 as i64, token, expires_at.to_rfc3339(), now.to_rfc3339()],
        )
    }

    fn touch_session(&self, id: AccountId, now: DateTime<Utc>) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET last_activity_at = ?2 WHERE id = ?1",
            params![id.0 as i64, now.to_rfc3339()],
        )
    }

    fn clear_session(&self, id: AccountId) -> StoreResult<()> {
        self.conn().execute(
            "UPDATE accounts SET session_token = NULL, session_expires_at = NULL,
                last_activity_at = NULL
             WHERE id = ?1",
            params![id.0 as i64],
        )?;
        Ok(())
    }

    fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        Self::query_account(
            &self.conn(),
            "WHERE verification_token_hash = ?1",
            params![token_hash],
        )
    }

    fn mark_verified(&self, id: AccountId) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET is_verified = 1, verification_token_hash = NULL,
                verification_expires_at = NULL
             WHERE id = ?1",
            params![id.0 as i64],
        )
    }

    fn set_reset(&self, id: AccountId, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET reset_token_hash = ?2, reset_expires_at = ?3 WHERE id = ?1",
            params![id.0 as i64, token_hash, expires_at.to_rfc3339()],
        )
    }

    fn find_by_reset_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        Self::query_account(&self.conn(), "WHERE reset_token_hash = ?1", params![token_hash])
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET password_hash = ?2, reset_token_hash = NULL, reset_expires_at = NULL
             WHERE id = ?1",
            params![id.0 as i64, password_hash],
        )
    }

    fn set_approved(&self, id: AccountId, approved: bool) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET is_approved = ?2 WHERE id = ?1",
            params![id.0 as i64, approved],
        )
    }

    fn set_banned(&self, id: AccountId, banned: bool) -> StoreResult<()> {
        self.update_one(
            "UPDATE accounts SET banned = ?2 WHERE id = ?1",
            params![id.0 as i64, banned],
        )
    }

    fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> StoreResult<Account> {
        let conn = self.conn();
        let mut account = Self::query_account(&conn, "WHERE id = ?1", params![id.0 as i64])?
            .ok_or(ScanError::AccountNotFound)?;
        update.apply(&mut account.profile);

        let skills = serde_json::to_string(&account.profile.skills)
            .map_err(|e| ScanError::Internal(e.to_string()))?;
        conn.execute(
            "UPDATE accounts SET name = ?2, contact_number = ?3, skills = ?4, home_location = ?5
             WHERE id = ?1",
            params![
                id.0 as i64,
                account.profile.name,
                account.profile.contact_number,
                skills,
                account.profile.home_location,
            ],
        )?;
        Ok(account)
    }

    fn replace_help_request(
        &self,
        id: AccountId,
        expected_version: u64,
        new: &HelpRequest,
    ) -> StoreResult<bool> {
        let details = new.details();
        let assignment = new.assignment();
        let conn = self.conn();

        let rows_affected = conn.execute(
            "UPDATE accounts SET help_status = ?3, help_title = ?4, help_description = ?5,
                help_note = ?6, help_location = ?7, help_date = ?8, help_time = ?9,
                volunteer_id = ?10, volunteer_name = ?11, volunteer_contact = ?12,
                completion_code = ?13, accepted_at = ?14, completed_at = ?15,
                help_version = help_version + 1
             WHERE id = ?1 AND help_version = ?2",
            params![
                id.0 as i64,
                expected_version as i64,
                new.status().as_str(),
                details.map(|d| d.title.as_str()),
                details.map(|d| d.description.as_str()),
                details.and_then(|d| d.note.as_deref()),
                details.map(|d| d.location.as_str()),
                details.map(|d| d.requested_date.as_str()),
                details.map(|d| d.requested_time.as_str()),
                assignment.map(|a| a.volunteer_id.0 as i64),
                assignment.map(|a| a.volunteer_name.as_str()),
                assignment.map(|a| a.volunteer_contact.as_str()),
                assignment.map(|a| a.completion_code.as_str()),
                assignment.map(|a| a.accepted_at.to_rfc3339()),
                assignment.and_then(|a| a.completed_at).map(|t| t.to_rfc3339()),
            ],
        )?;

        if rows_affected > 0 {
            return Ok(true);
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?1)",
            params![id.0 as i64],
            |row| row.get(0),
        )?;
        if exists {
            Ok(false)
        } else {
            Err(ScanError::AccountNotFound)
        }
    }
}
