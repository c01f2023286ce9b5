use serde::{Deserialize, Serialize};
use std::fmt;

/// Role claim carried in the session token and on user accounts.
///
/// Serialized as the uppercase strings the token payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

/// Top-level organizational grouping of branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSaveRequest {
    pub name: String,
    pub description: String,
}

/// Parent region reference denormalized onto a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRef {
    pub id: i64,
    pub name: String,
}

/// A unit under a region that has its own monthly targets and collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub region: RegionRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSaveRequest {
    pub name: String,
    pub description: String,
    pub region_id: i64,
}

/// Goal amount set for a branch for a given year/month.
///
/// At most one target exists per (branch_id, year, month); the backend
/// enforces this with a unique index and a Conflict error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub branch_id: i64,
    pub year: i32,
    pub month: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSaveRequest {
    pub branch_id: i64,
    pub year: i32,
    pub month: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUpdateRequest {
    pub amount: f64,
}

/// Actual amount recorded for a branch for a given year/month, together
/// with the backing target and the derived due/percentage figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub branch_id: i64,
    pub branch_name: String,
    pub region_name: String,
    pub year: i32,
    pub month: u32,
    pub target: f64,
    pub amount: f64,
    /// target - amount, recomputed on every write.
    pub due: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSaveRequest {
    pub branch_id: i64,
    pub year: i32,
    pub month: u32,
    pub amount: f64,
}

/// Update payload; the caller recomputes `due` from the current target on
/// every update rather than reusing a value from an earlier load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionUpdateRequest {
    pub target: f64,
    pub due: f64,
    pub amount: f64,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

/// Response of the check-existing endpoints used by the bulk loader to
/// distinguish "zero existing records" from "N existing records".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExistingCheck {
    pub exists: bool,
    pub count: i64,
}

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Human-readable name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert!(role.is_admin());
    }

    #[test]
    fn month_name_bounds() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "Unknown");
        assert_eq!(month_name(13), "Unknown");
    }
}
