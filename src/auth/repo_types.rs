use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status")]
pub enum Status {
    Active,
    Inactive,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,               // argon2 PHC string
    pub role: Role,
    pub status: Status,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<i64>, // epoch millis, set together with the token
    pub monthly_salary: Decimal,
    pub expected_savings: Decimal,
    pub salary_deposit_day: i32,
    pub created_at: OffsetDateTime,
}

/// Insert payload for a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub verification_token: Option<String>,
}

/// Self-service profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub monthly_salary: Decimal,
    pub expected_savings: Decimal,
    pub salary_deposit_day: i32,
}
