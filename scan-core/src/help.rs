//! Help request state machine
//!
//! Every citizen account embeds exactly one [`HelpRequest`]. It moves
//! through four states:
//!
//! ```text
//!            request             accept               complete
//!   Idle ───────────────▶ Open ─────────▶ Assigned ─────────────▶ Completed
//!    ▲                     │                 │                       │
//!    └──── cancel/expire ──┘                 │                       │
//!    └──── cancel (before cutoff) ───────────┘                       │
//!    └──── request / cancel / admin cancel ──────────────────────────┘
//! ```
//!
//! Transitions are pure: each returns the next state and leaves `self`
//! untouched, so a rejected transition can never leave a partial write
//! behind. Persisting the result is the store's job.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::region::is_known_region;
use crate::schedule::Schedule;
use crate::{AccountId, Error, Result};

/// Discriminant of [`HelpRequest`], used for conditional writes and queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Idle,
    Open,
    Assigned,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Open => "open",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(RequestStatus::Idle),
            "open" => Some(RequestStatus::Open),
            "assigned" => Some(RequestStatus::Assigned),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }
}

/// What the citizen asked for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpDetails {
    /// Category tag such as "Driving" or "Medical"
    #[serde(default)]
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// One of [`crate::REGIONS`]
    pub location: String,
    /// `YYYY-MM-DD`, IST
    pub requested_date: String,
    /// `HH:MM`, IST
    pub requested_time: String,
}

impl HelpDetails {
    /// Parse the requested date and time
    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::parse(&self.requested_date, &self.requested_time)
    }

    /// Check required fields and the location, returning the parsed schedule
    pub fn validate(&self) -> Result<Schedule> {
        if self.description.trim().is_empty() {
            return Err(Error::MissingField("description"));
        }
        if self.location.trim().is_empty() {
            return Err(Error::MissingField("location"));
        }
        if self.requested_date.trim().is_empty() {
            return Err(Error::MissingField("requested_date"));
        }
        if self.requested_time.trim().is_empty() {
            return Err(Error::MissingField("requested_time"));
        }
        if !is_known_region(self.location.trim()) {
            return Err(Error::UnknownLocation(self.location.clone()));
        }
        self.schedule()
    }

    fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            note: self
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            location: self.location.trim().to_string(),
            requested_date: self.requested_date.trim().to_string(),
            requested_time: self.requested_time.trim().to_string(),
        }
    }
}

/// The volunteer claiming a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerContact {
    pub id: AccountId,
    pub name: String,
    pub contact: String,
}

/// Who took a request and the code that closes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub volunteer_id: AccountId,
    pub volunteer_name: String,
    pub volunteer_contact: String,
    /// Six-digit code the citizen hands to the volunteer once helped
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub completion_code: String,
    pub accepted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// How a completion is justified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionProof<'a> {
    /// The code the citizen handed to the volunteer
    Code(&'a str),
    /// An administrator closing the request without a code
    Admin,
}

/// A citizen's single help request slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HelpRequest {
    #[default]
    Idle,
    Open {
        details: HelpDetails,
    },
    Assigned {
        details: HelpDetails,
        assignment: Assignment,
    },
    Completed {
        details: HelpDetails,
        assignment: Assignment,
    },
}

impl HelpRequest {
    pub fn status(&self) -> RequestStatus {
        match self {
            HelpRequest::Idle => RequestStatus::Idle,
            HelpRequest::Open { .. } => RequestStatus::Open,
            HelpRequest::Assigned { .. } => RequestStatus::Assigned,
            HelpRequest::Completed { .. } => RequestStatus::Completed,
        }
    }

    pub fn details(&self) -> Option<&HelpDetails> {
        match self {
            HelpRequest::Idle => None,
            HelpRequest::Open { details }
            | HelpRequest::Assigned { details, .. }
            | HelpRequest::Completed { details, .. } => Some(details),
        }
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            HelpRequest::Assigned { assignment, .. } | HelpRequest::Completed { assignment, .. } => {
                Some(assignment)
            }
            _ => None,
        }
    }

    /// Open or assigned, i.e. still waiting for help to happen
    pub fn is_active(&self) -> bool {
        matches!(self, HelpRequest::Open { .. } | HelpRequest::Assigned { .. })
    }

    pub fn is_assigned_to(&self, volunteer_id: AccountId) -> bool {
        matches!(self, HelpRequest::Assigned { assignment, .. } if assignment.volunteer_id == volunteer_id)
    }

    /// Idle or Completed → Open
    ///
    /// `min_lead` is the minimum notice between `now` and the requested
    /// moment; zero disables the check.
    pub fn open(&self, details: HelpDetails, now: DateTime<Utc>, min_lead: Duration) -> Result<HelpRequest> {
        let details = details.normalized();
        let schedule = details.validate()?;

        if min_lead > Duration::zero() && schedule.lead_time(now) < min_lead {
            return Err(Error::TooSoon {
                minutes: min_lead.num_minutes(),
            });
        }

        match self {
            HelpRequest::Idle | HelpRequest::Completed { .. } => Ok(HelpRequest::Open { details }),
            HelpRequest::Open { .. } | HelpRequest::Assigned { .. } => Err(Error::RequestActive),
        }
    }

    /// Citizen cancellation → Idle
    ///
    /// Unassigned and completed requests can always be dropped. Once a
    /// volunteer is assigned the citizen may only cancel up to two hours
    /// before the requested time; a schedule that cannot be parsed does not
    /// block cancellation.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<HelpRequest> {
        match self {
            HelpRequest::Idle => Err(Error::NoActiveRequest),
            HelpRequest::Open { .. } | HelpRequest::Completed { .. } => Ok(HelpRequest::Idle),
            HelpRequest::Assigned { details, .. } => match details.schedule() {
                Ok(schedule) if !schedule.allows_cancel(now) => Err(Error::CancelWindowClosed),
                _ => Ok(HelpRequest::Idle),
            },
        }
    }

    /// Open → Assigned
    pub fn accept(
        &self,
        volunteer: VolunteerContact,
        completion_code: String,
        now: DateTime<Utc>,
    ) -> Result<HelpRequest> {
        match self {
            HelpRequest::Idle => Err(Error::NoActiveRequest),
            HelpRequest::Assigned { .. } | HelpRequest::Completed { .. } => Err(Error::AlreadyAssigned),
            HelpRequest::Open { details } => Ok(HelpRequest::Assigned {
                details: details.clone(),
                assignment: Assignment {
                    volunteer_id: volunteer.id,
                    volunteer_name: volunteer.name,
                    volunteer_contact: volunteer.contact,
                    completion_code,
                    accepted_at: now,
                    completed_at: None,
                },
            }),
        }
    }

    /// Assigned → Completed
    pub fn complete(&self, proof: CompletionProof<'_>, now: DateTime<Utc>) -> Result<HelpRequest> {
        match self {
            HelpRequest::Idle | HelpRequest::Completed { .. } => Err(Error::NoActiveRequest),
            HelpRequest::Open { .. } => Err(Error::NoVolunteerAssigned),
            HelpRequest::Assigned { details, assignment } => {
                if let CompletionProof::Code(code) = proof {
                    if code.trim() != assignment.completion_code {
                        return Err(Error::InvalidCode);
                    }
                }
                let mut assignment = assignment.clone();
                assignment.completed_at = Some(now);
                Ok(HelpRequest::Completed {
                    details: details.clone(),
                    assignment,
                })
            }
        }
    }

    /// Administrative cancellation → Idle, ignoring the cancel cutoff
    pub fn force_cancel(&self) -> Result<HelpRequest> {
        match self {
            HelpRequest::Idle => Err(Error::NoActiveRequest),
            _ => Ok(HelpRequest::Idle),
        }
    }

    /// True when an open request's requested moment has passed
    ///
    /// Only unassigned requests expire. Errors when the schedule of an open
    /// request cannot be parsed, so callers can skip rather than guess.
    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool> {
        match self {
            HelpRequest::Open { details } => Ok(details.schedule()?.has_passed(now)),
            _ => Ok(false),
        }
    }

    /// Open and still in the future, i.e. worth showing to volunteers
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        match self {
            HelpRequest::Open { details } => details
                .schedule()
                .map(|s| !s.has_passed(now))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Strip the completion code, for views shown to anyone but the citizen
    pub fn without_code(mut self) -> Self {
        if let HelpRequest::Assigned { assignment, .. } | HelpRequest::Completed { assignment, .. } =
            &mut self
        {
            assignment.completion_code.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn details() -> HelpDetails {
        HelpDetails {
            title: "Driving".into(),
            description: "airport".into(),
            note: None,
            location: "Kollam".into(),
            requested_date: "2025-01-01".into(),
            requested_time: "10:00".into(),
        }
    }

    fn volunteer() -> VolunteerContact {
        VolunteerContact {
            id: AccountId(7),
            name: "Vee".into(),
            contact: "555-1111".into(),
        }
    }

    // 2024-12-31 10:00 IST
    fn day_before() -> DateTime<Utc> {
        utc("2024-12-31T04:30:00Z")
    }

    fn assigned() -> HelpRequest {
        HelpRequest::Idle
            .open(details(), day_before(), Duration::zero())
            .unwrap()
            .accept(volunteer(), "123456".into(), day_before())
            .unwrap()
    }

    #[test]
    fn test_open_from_idle() {
        let request = HelpRequest::Idle
            .open(details(), day_before(), Duration::hours(3))
            .unwrap();
        assert_eq!(request.status(), RequestStatus::Open);
        assert_eq!(request.details(), Some(&details()));
        assert!(request.assignment().is_none());
    }

    #[test]
    fn test_open_requires_fields() {
        let mut d = details();
        d.description = "  ".into();
        let err = HelpRequest::Idle.open(d, day_before(), Duration::zero()).unwrap_err();
        assert!(matches!(err, Error::MissingField("description")));

        let mut d = details();
        d.requested_time = String::new();
        let err = HelpRequest::Idle.open(d, day_before(), Duration::zero()).unwrap_err();
        assert!(matches!(err, Error::MissingField("requested_time")));
    }

    #[test]
    fn test_open_rejects_unknown_location() {
        let mut d = details();
        d.location = "Atlantis".into();
        let err = HelpRequest::Idle.open(d, day_before(), Duration::zero()).unwrap_err();
        assert!(matches!(err, Error::UnknownLocation(_)));
    }

    #[test]
    fn test_open_enforces_lead_time() {
        // 08:00 IST, two hours before the requested time
        let now = utc("2025-01-01T02:30:00Z");
        let err = HelpRequest::Idle
            .open(details(), now, Duration::hours(3))
            .unwrap_err();
        assert!(matches!(err, Error::TooSoon { minutes: 180 }));

        // Zero disables the check entirely, even for past times
        let late = utc("2025-02-01T00:00:00Z");
        assert!(HelpRequest::Idle.open(details(), late, Duration::zero()).is_ok());
    }

    #[test]
    fn test_open_while_active_is_rejected() {
        let open = HelpRequest::Open { details: details() };
        assert!(matches!(
            open.open(details(), day_before(), Duration::zero()),
            Err(Error::RequestActive)
        ));
        assert!(matches!(
            assigned().open(details(), day_before(), Duration::zero()),
            Err(Error::RequestActive)
        ));
    }

    #[test]
    fn test_open_replaces_completed() {
        let completed = assigned().complete(CompletionProof::Admin, day_before()).unwrap();
        let reopened = completed.open(details(), day_before(), Duration::zero()).unwrap();
        assert_eq!(reopened, HelpRequest::Open { details: details() });
    }

    #[test]
    fn test_cancel_unassigned_always_allowed() {
        let open = HelpRequest::Open { details: details() };
        // Even after the requested time
        assert_eq!(open.cancel(utc("2025-06-01T00:00:00Z")).unwrap(), HelpRequest::Idle);
    }

    #[test]
    fn test_cancel_assigned_respects_cutoff() {
        let request = assigned();
        // 07:59 IST, more than two hours ahead
        assert!(request.cancel(utc("2025-01-01T02:29:00Z")).is_ok());
        // 08:30 IST, within two hours
        assert!(matches!(
            request.cancel(utc("2025-01-01T03:00:00Z")),
            Err(Error::CancelWindowClosed)
        ));
    }

    #[test]
    fn test_cancel_assigned_with_bad_schedule_fails_open() {
        let request = HelpRequest::Assigned {
            details: HelpDetails {
                requested_date: "someday".into(),
                ..details()
            },
            assignment: assigned().assignment().unwrap().clone(),
        };
        assert!(request.cancel(utc("2030-01-01T00:00:00Z")).is_ok());
    }

    #[test]
    fn test_cancel_idle_is_rejected() {
        assert!(matches!(HelpRequest::Idle.cancel(day_before()), Err(Error::NoActiveRequest)));
    }

    #[test]
    fn test_accept_only_from_open() {
        let request = assigned();
        let assignment = request.assignment().unwrap();
        assert_eq!(assignment.volunteer_name, "Vee");
        assert_eq!(assignment.completion_code, "123456");
        assert_eq!(assignment.accepted_at, day_before());

        assert!(matches!(
            request.accept(volunteer(), "000000".into(), day_before()),
            Err(Error::AlreadyAssigned)
        ));
        assert!(matches!(
            HelpRequest::Idle.accept(volunteer(), "000000".into(), day_before()),
            Err(Error::NoActiveRequest)
        ));
    }

    #[test]
    fn test_complete_checks_code() {
        let request = assigned();
        assert!(matches!(
            request.complete(CompletionProof::Code("654321"), day_before()),
            Err(Error::InvalidCode)
        ));

        let done = request
            .complete(CompletionProof::Code("123456"), day_before())
            .unwrap();
        assert_eq!(done.status(), RequestStatus::Completed);
        assert_eq!(done.assignment().unwrap().completed_at, Some(day_before()));
        assert_eq!(done.details(), request.details());
    }

    #[test]
    fn test_complete_admin_bypasses_code() {
        let done = assigned().complete(CompletionProof::Admin, day_before()).unwrap();
        assert_eq!(done.status(), RequestStatus::Completed);
    }

    #[test]
    fn test_complete_requires_assignment() {
        let open = HelpRequest::Open { details: details() };
        assert!(matches!(
            open.complete(CompletionProof::Admin, day_before()),
            Err(Error::NoVolunteerAssigned)
        ));
        assert!(matches!(
            HelpRequest::Idle.complete(CompletionProof::Admin, day_before()),
            Err(Error::NoActiveRequest)
        ));
        let done = assigned().complete(CompletionProof::Admin, day_before()).unwrap();
        assert!(matches!(
            done.complete(CompletionProof::Admin, day_before()),
            Err(Error::NoActiveRequest)
        ));
    }

    #[test]
    fn test_expiry_only_for_open() {
        let after = utc("2025-01-01T05:00:00Z");
        assert!(HelpRequest::Open { details: details() }.is_expired(after).unwrap());
        assert!(!HelpRequest::Open { details: details() }.is_expired(day_before()).unwrap());
        assert!(!assigned().is_expired(after).unwrap());

        let broken = HelpRequest::Open {
            details: HelpDetails {
                requested_time: "noon".into(),
                ..details()
            },
        };
        assert!(broken.is_expired(after).is_err());
        assert!(!broken.is_available(day_before()));
    }

    #[test]
    fn test_without_code() {
        let redacted = assigned().without_code();
        assert!(redacted.assignment().unwrap().completion_code.is_empty());
        let json = serde_json::to_value(&redacted).unwrap();
        assert!(json["assignment"].get("completion_code").is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(HelpRequest::Open { details: details() }).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["details"]["location"], "Kollam");

        let json = serde_json::to_value(HelpRequest::Idle).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "idle" }));
    }
}
