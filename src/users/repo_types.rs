use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Membership tier. Stored as lowercase text in the users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Default for MembershipLevel {
    fn default() -> Self {
        Self::Bronze
    }
}

impl MembershipLevel {
    /// Parse the client-facing spelling ("Bronze", "Silver", ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Bronze" => Some(Self::Bronze),
            "Silver" => Some(Self::Silver),
            "Gold" => Some(Self::Gold),
            "Platinum" => Some(Self::Platinum),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                         // unique, stable for the record's lifetime
    pub email: String,                    // unique, case-sensitive as stored
    #[serde(skip_serializing)]
    pub password_hash: String,            // Argon2 hash, not exposed in JSON
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub membership_level: MembershipLevel,
    pub points: i64,
    pub created_at: OffsetDateTime,       // fixed at creation
}

/// Sparse profile update: only fields carrying Some are written.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub membership_level: Option<MembershipLevel>,
    pub points: Option<i64>,
}
