//! Current-user identity model
//!
//! The identity is always derived from the bearer token via `GET /auth/me`
//! and is never trusted or persisted locally. If the lookup fails the token
//! is discarded, so a `UserIdentity` in memory always belongs to a token
//! the backend has verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolved identity of the currently authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Phone number, when the account was created via OTP
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Email address, if set
    #[serde(default)]
    pub email: Option<String>,
    /// Role used for gating admin/owner views
    pub role: Role,
    /// Account creation timestamp, when the backend includes it
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
}

impl UserIdentity {
    /// Check if this user may access the admin back-office.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if this user may manage listings (owners and admins).
    pub fn is_owner(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Admin)
    }
}

/// User role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Renter browsing the catalog
    Client,
    /// Vehicle owner with listings
    Owner,
    /// Back-office administrator
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Client => "client",
            Role::Owner => "owner",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}
