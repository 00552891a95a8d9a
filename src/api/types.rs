use serde::{Deserialize, Serialize};

use crate::domain::{OutPassReason, OutPassStatus};
use crate::models::{Hostel, Hosteler, OutPass, OutPassWithRefs, SortDirection};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error discriminator, present on failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: None,
        }
    }

    pub fn error_with_kind(message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutPassDto {
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

impl From<OutPass> for OutPassDto {
    fn from(pass: OutPass) -> Self {
        Self {
            id: pass.id,
            hosteler_id: pass.hosteler_id,
            hostel_id: pass.hostel_id,
            room_number: pass.room_number,
            address: pass.address,
            reason: pass.reason,
            expected_out_time: pass.expected_out_time,
            expected_in_time: pass.expected_in_time,
            actual_out_time: pass.actual_out_time,
            actual_in_time: pass.actual_in_time,
            status: pass.status,
            valid_till: pass.valid_till,
            created_at: pass.created_at,
            updated_at: pass.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentRefDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub roll_number: String,
}

impl From<Hosteler> for StudentRefDto {
    fn from(h: Hosteler) -> Self {
        Self {
            id: h.id,
            name: h.name,
            email: h.email,
            roll_number: h.roll_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HostelRefDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub gender: String,
}

impl From<Hostel> for HostelRefDto {
    fn from(h: Hostel) -> Self {
        Self {
            id: h.id,
            name: h.name,
            slug: h.slug,
            gender: h.gender,
        }
    }
}

/// Out-pass with the student and hostel projections the listing view embeds.
#[derive(Debug, Serialize)]
pub struct OutPassDetailDto {
    #[serde(flatten)]
    pub pass: OutPassDto,
    pub student: StudentRefDto,
    pub hostel: HostelRefDto,
}

impl From<OutPassWithRefs> for OutPassDetailDto {
    fn from(row: OutPassWithRefs) -> Self {
        Self {
            pass: OutPassDto::from(row.pass),
            student: StudentRefDto::from(row.student),
            hostel: HostelRefDto::from(row.hostel),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HostelerDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub hostel_id: i32,
    pub room_number: String,
    pub banned: bool,
    pub banned_till: Option<String>,
}

impl From<Hosteler> for HostelerDto {
    fn from(h: Hosteler) -> Self {
        Self {
            id: h.id,
            name: h.name,
            email: h.email,
            roll_number: h.roll_number,
            hostel_id: h.hostel_id,
            room_number: h.room_number,
            banned: h.banned,
            banned_till: h.banned_till,
        }
    }
}

/// Query parameters for the warden's hostel listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HostelListQuery {
    pub query: Option<String>,
    pub offset: u64,
    pub limit: u64,
    pub sort: Option<SortDirection>,
}
