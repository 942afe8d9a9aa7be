//! Help request lifecycle through the public scan-core API

use chrono::{DateTime, Duration, Utc};
use scan_core::{
    AccountId, CompletionProof, Error, HelpDetails, HelpRequest, RequestStatus, Schedule,
    TokenCodec, TokenKind, VolunteerContact,
};

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn driving() -> HelpDetails {
    HelpDetails {
        title: "Driving".into(),
        description: "airport".into(),
        note: Some("  ".into()),
        location: "Kollam".into(),
        requested_date: "2025-01-01".into(),
        requested_time: "10:00".into(),
    }
}

fn vee() -> VolunteerContact {
    VolunteerContact {
        id: AccountId(7),
        name: "Vee".into(),
        contact: "555-1111".into(),
    }
}

#[test]
fn test_full_cycle_and_reopen() {
    let now = utc("2024-12-31T04:30:00Z");

    let open = HelpRequest::Idle
        .open(driving(), now, Duration::hours(3))
        .unwrap();
    assert_eq!(open.status(), RequestStatus::Open);
    assert!(open.assignment().is_none());
    // Blank notes are dropped
    assert_eq!(open.details().unwrap().note, None);

    let assigned = open.accept(vee(), "482913".into(), now).unwrap();
    assert!(assigned.is_assigned_to(AccountId(7)));
    assert!(matches!(
        assigned.accept(vee(), "111111".into(), now),
        Err(Error::AlreadyAssigned)
    ));

    assert!(matches!(
        assigned.complete(CompletionProof::Code("482914"), now),
        Err(Error::InvalidCode)
    ));
    let done = assigned
        .complete(CompletionProof::Code(" 482913 "), now)
        .unwrap();
    assert_eq!(done.status(), RequestStatus::Completed);
    assert_eq!(done.assignment().unwrap().completed_at, Some(now));

    // A completed citizen can ask again
    let again = done.open(driving(), now, Duration::hours(3)).unwrap();
    assert_eq!(again.status(), RequestStatus::Open);
}

#[test]
fn test_persisted_shape() {
    let now = utc("2024-12-31T04:30:00Z");
    let assigned = HelpRequest::Idle
        .open(driving(), now, Duration::zero())
        .unwrap()
        .accept(vee(), "482913".into(), now)
        .unwrap();

    let json = serde_json::to_value(&assigned).unwrap();
    assert_eq!(json["status"], "assigned");
    assert_eq!(json["assignment"]["completion_code"], "482913");

    let redacted = serde_json::to_value(assigned.clone().without_code()).unwrap();
    assert!(redacted["assignment"].get("completion_code").is_none());

    let back: HelpRequest = serde_json::from_value(json).unwrap();
    assert_eq!(back, assigned);
}

#[test]
fn test_schedule_is_ist() {
    let schedule = Schedule::parse("2025-01-01", "10:00").unwrap();
    assert_eq!(schedule.starts_at(), utc("2025-01-01T04:30:00Z"));
    assert_eq!(schedule.cancel_cutoff(), utc("2025-01-01T02:30:00Z"));
    assert!(Schedule::parse("01/01/2025", "10:00").is_err());
}

#[test]
fn test_expiry_only_for_open() {
    let before = utc("2024-12-31T04:30:00Z");
    let after = utc("2025-01-01T05:00:00Z");
    let open = HelpRequest::Idle
        .open(driving(), before, Duration::hours(3))
        .unwrap();

    assert!(!open.is_expired(before).unwrap());
    assert!(open.is_expired(after).unwrap());
    assert!(!open.is_available(after));

    let assigned = open.accept(vee(), "482913".into(), before).unwrap();
    assert!(!assigned.is_expired(after).unwrap());

    let broken = HelpRequest::Open {
        details: HelpDetails {
            requested_date: "someday".into(),
            ..driving()
        },
    };
    assert!(broken.is_expired(after).is_err());
}

#[test]
fn test_token_round_trip() {
    let codec = TokenCodec::new(b"secret");
    let now = utc("2024-12-31T04:30:00Z");
    let token = codec
        .sign(AccountId(3), TokenKind::Session, now, Duration::minutes(15))
        .unwrap();

    let claims = codec.verify(&token, TokenKind::Session, now).unwrap();
    assert_eq!(claims.account_id().unwrap(), AccountId(3));
    assert!(codec.verify(&token, TokenKind::Refresh, now).is_err());
    assert!(matches!(
        codec.verify(&token, TokenKind::Session, now + Duration::minutes(15)),
        Err(Error::TokenExpired)
    ));
    assert!(TokenCodec::new(b"other")
        .verify(&token, TokenKind::Session, now)
        .is_err());
}
