use serde::{Deserialize, Serialize};

use crate::entities::{hostelers, hostels};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostel {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub gender: String,
    pub created_at: String,
}

impl From<hostels::Model> for Hostel {
    fn from(m: hostels::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            gender: m.gender,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hosteler {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub hostel_id: i32,
    pub room_number: String,
    pub banned: bool,
    pub banned_till: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<hostelers::Model> for Hosteler {
    fn from(m: hostelers::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            roll_number: m.roll_number,
            hostel_id: m.hostel_id,
            room_number: m.room_number,
            banned: m.banned,
            banned_till: m.banned_till,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
