use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, Status, User};

/// Row of the admin user listing.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: Status,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            status: u.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Role,
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub message: &'static str,
    #[serde(rename = "rowCount")]
    pub row_count: u64,
}
