use serde::{Deserialize, Serialize};

use crate::domain::{OutPassReason, OutPassStatus};
use crate::entities::outpasses;

/// An out-pass record with its string columns lifted into the closed enums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutPass {
    pub id: i32,
    pub hosteler_id: i32,
    pub hostel_id: i32,
    pub room_number: String,
    pub address: String,
    pub reason: OutPassReason,
    pub expected_out_time: String,
    pub expected_in_time: String,
    pub actual_out_time: Option<String>,
    pub actual_in_time: Option<String>,
    pub status: OutPassStatus,
    pub valid_till: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<outpasses::Model> for OutPass {
    type Error = String;

    fn try_from(m: outpasses::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            hosteler_id: m.hosteler_id,
            hostel_id: m.hostel_id,
            room_number: m.room_number,
            address: m.address,
            reason: m.reason.parse()?,
            expected_out_time: m.expected_out_time,
            expected_in_time: m.expected_in_time,
            actual_out_time: m.actual_out_time,
            actual_in_time: m.actual_in_time,
            status: m.status.parse()?,
            valid_till: m.valid_till,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Read-model join: an out-pass plus its student and hostel references.
#[derive(Debug, Clone, Serialize)]
pub struct OutPassWithRefs {
    pub pass: OutPass,
    pub student: super::Hosteler,
    pub hostel: super::Hostel,
}

/// Sort direction for hostel listings, applied to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Paging and search filters for the warden's hostel listing.
#[derive(Debug, Clone, Default)]
pub struct HostelPageFilter {
    /// Case-insensitive substring match on hosteler name or roll number.
    pub query: Option<String>,
    pub offset: u64,
    pub limit: u64,
    pub sort: SortDirection,
}

/// Validated input for inserting a new out-pass.
///
/// Produced only by the service layer after payload validation and validity
/// computation; handlers never build one directly.
#[derive(Debug, Clone)]
pub struct NewOutPass {
    pub hosteler_id: i32,
    pub hostel_id: i32,
    pub room_number: String,
    pub address: String,
    pub reason: OutPassReason,
    pub expected_out_time: String,
    pub expected_in_time: String,
    pub valid_till: String,
}
