//! Domain types for the out-pass lifecycle.
//!
//! Status and reason are closed enums shared by validation, persistence
//! mapping, and the transition logic, so illegal states never leave this
//! module as bare strings.

use chrono::{DateTime, Days, FixedOffset, NaiveTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an out-pass request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutPassId(i32);

impl OutPassId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for OutPassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for OutPassId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<OutPassId> for i32 {
    fn from(id: OutPassId) -> Self {
        id.0
    }
}

/// Lifecycle state of an out-pass request.
///
/// Legal paths: `Pending -> Approved -> InUse -> Processed` and
/// `Pending -> Rejected`. Transitions never skip or reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutPassStatus {
    Pending,
    Approved,
    Rejected,
    InUse,
    Processed,
}

impl OutPassStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InUse => "in_use",
            Self::Processed => "processed",
        }
    }

    /// Whether the record can still change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Processed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::InUse)
                | (Self::InUse, Self::Processed)
        )
    }
}

impl fmt::Display for OutPassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutPassStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "in_use" => Ok(Self::InUse),
            "processed" => Ok(Self::Processed),
            other => Err(format!("unknown out-pass status: {other}")),
        }
    }
}

/// Declared reason for leaving the hostel.
///
/// Drives the validity window: short-trip reasons expire the same day,
/// extended-stay reasons get extra calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutPassReason {
    Outing,
    Medical,
    Home,
    Market,
    Other,
}

impl OutPassReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outing => "outing",
            Self::Medical => "medical",
            Self::Home => "home",
            Self::Market => "market",
            Self::Other => "other",
        }
    }

    /// Extended-stay reasons earn extra validity days beyond the declared
    /// return date.
    #[must_use]
    pub const fn is_extended_stay(self) -> bool {
        matches!(self, Self::Home | Self::Medical)
    }
}

impl fmt::Display for OutPassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutPassReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outing" => Ok(Self::Outing),
            "medical" => Ok(Self::Medical),
            "home" => Ok(Self::Home),
            "market" => Ok(Self::Market),
            "other" => Ok(Self::Other),
            other => Err(format!(
                "unknown reason: {other} (expected outing, medical, home, market or other)"
            )),
        }
    }
}

/// Warden decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassDecision {
    Approve,
    Reject,
}

impl PassDecision {
    /// The status a pending request moves to under this decision.
    #[must_use]
    pub const fn resulting_status(self) -> OutPassStatus {
        match self {
            Self::Approve => OutPassStatus::Approved,
            Self::Reject => OutPassStatus::Rejected,
        }
    }
}

/// A scan recorded by gate security against an out-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateEvent {
    /// Hosteler leaves the hostel. Requires an approved pass.
    Exit,
    /// Hosteler returns. Requires a pass currently in use.
    Entry,
}

impl GateEvent {
    /// The status a pass must hold for this event to be recordable.
    #[must_use]
    pub const fn required_status(self) -> OutPassStatus {
        match self {
            Self::Exit => OutPassStatus::Approved,
            Self::Entry => OutPassStatus::InUse,
        }
    }

    /// The status a pass moves to once the event is recorded.
    #[must_use]
    pub const fn resulting_status(self) -> OutPassStatus {
        match self {
            Self::Exit => OutPassStatus::InUse,
            Self::Entry => OutPassStatus::Processed,
        }
    }
}

/// Sentinel room value that never triggers a room-of-record update.
pub const UNKNOWN_ROOM: &str = "UNKNOWN";

/// Computes the validity deadline for a pass.
///
/// The deadline lands on 23:59:59.999 of the expected return date, in the
/// offset the caller declared on `expected_in_time`. Extended-stay reasons
/// (home, medical) push the date out by `extended_days` first; every other
/// reason expires the same day.
#[must_use]
pub fn compute_valid_till(
    reason: OutPassReason,
    expected_in_time: DateTime<FixedOffset>,
    extended_days: u64,
) -> Option<DateTime<FixedOffset>> {
    let date = expected_in_time.date_naive();
    let date = if reason.is_extended_stay() {
        date.checked_add_days(Days::new(extended_days))?
    } else {
        date
    };

    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
    date.and_time(end_of_day)
        .and_local_timezone(*expected_in_time.offset())
        .single()
}

/// RFC 3339 with millisecond precision, the storage format for timestamps.
#[must_use]
pub fn to_storage_timestamp(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn short_trip_reasons_clamp_to_same_day() {
        for reason in [OutPassReason::Outing, OutPassReason::Market] {
            let till = compute_valid_till(reason, ts("2024-03-01T10:30:00Z"), 4).unwrap();
            assert_eq!(to_storage_timestamp(till), "2024-03-01T23:59:59.999Z");
        }
    }

    #[test]
    fn clamp_ignores_time_of_day() {
        let early = compute_valid_till(OutPassReason::Outing, ts("2024-03-01T00:00:01Z"), 4);
        let late = compute_valid_till(OutPassReason::Outing, ts("2024-03-01T23:58:00Z"), 4);
        assert_eq!(early, late);
    }

    #[test]
    fn extended_stay_reasons_add_days() {
        for reason in [OutPassReason::Home, OutPassReason::Medical] {
            let till = compute_valid_till(reason, ts("2024-03-01T10:00:00Z"), 4).unwrap();
            assert_eq!(to_storage_timestamp(till), "2024-03-05T23:59:59.999Z");
        }
    }

    #[test]
    fn valid_till_keeps_declared_offset() {
        let till =
            compute_valid_till(OutPassReason::Home, ts("2024-03-01T10:00:00+05:30"), 4).unwrap();
        assert_eq!(to_storage_timestamp(till), "2024-03-05T23:59:59.999+05:30");
    }

    #[test]
    fn other_reason_expires_same_day() {
        let till = compute_valid_till(OutPassReason::Other, ts("2024-06-10T08:00:00Z"), 4).unwrap();
        assert_eq!(to_storage_timestamp(till), "2024-06-10T23:59:59.999Z");
    }

    #[test]
    fn extended_days_crossing_month_boundary() {
        let till = compute_valid_till(OutPassReason::Home, ts("2024-02-27T09:00:00Z"), 4).unwrap();
        // 2024 is a leap year
        assert_eq!(to_storage_timestamp(till), "2024-03-02T23:59:59.999Z");
    }

    #[test]
    fn status_transition_table() {
        use OutPassStatus::*;

        let legal = [
            (Pending, Approved),
            (Pending, Rejected),
            (Approved, InUse),
            (InUse, Processed),
        ];
        for (from, to) in legal {
            assert!(from.can_transition_to(to), "{from} -> {to} should be legal");
        }

        let all = [Pending, Approved, Rejected, InUse, Processed];
        for from in all {
            for to in all {
                if !legal.contains(&(from, to)) {
                    assert!(
                        !from.can_transition_to(to),
                        "{from} -> {to} should be illegal"
                    );
                }
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(OutPassStatus::Rejected.is_terminal());
        assert!(OutPassStatus::Processed.is_terminal());
        assert!(!OutPassStatus::Pending.is_terminal());
        assert!(!OutPassStatus::Approved.is_terminal());
        assert!(!OutPassStatus::InUse.is_terminal());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OutPassStatus::Pending,
            OutPassStatus::Approved,
            OutPassStatus::Rejected,
            OutPassStatus::InUse,
            OutPassStatus::Processed,
        ] {
            assert_eq!(status.as_str().parse::<OutPassStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<OutPassStatus>().is_err());
    }

    #[test]
    fn reason_round_trips_through_strings() {
        for reason in [
            OutPassReason::Outing,
            OutPassReason::Medical,
            OutPassReason::Home,
            OutPassReason::Market,
            OutPassReason::Other,
        ] {
            assert_eq!(reason.as_str().parse::<OutPassReason>(), Ok(reason));
        }
        assert!("vacation".parse::<OutPassReason>().is_err());
    }

    #[test]
    fn gate_event_status_mapping() {
        assert_eq!(GateEvent::Exit.required_status(), OutPassStatus::Approved);
        assert_eq!(GateEvent::Exit.resulting_status(), OutPassStatus::InUse);
        assert_eq!(GateEvent::Entry.required_status(), OutPassStatus::InUse);
        assert_eq!(
            GateEvent::Entry.resulting_status(),
            OutPassStatus::Processed
        );
    }
}
