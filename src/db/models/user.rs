//! User accounts and authentication DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    JobSeeker,
    Recruiter,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::JobSeeker, UserRole::Recruiter, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::JobSeeker => "JOB_SEEKER",
            UserRole::Recruiter => "RECRUITER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "JOB_SEEKER" => Ok(UserRole::JobSeeker),
            "RECRUITER" => Ok(UserRole::Recruiter),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// User as returned by the API (never exposes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            skills: user.skills,
            experience: user.experience,
            bio: user.bio,
            resume_url: user.resume_url,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
}

/// Profile fields an administrator may change; `None` leaves a field as is
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in UserRole::ALL {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!("job-seeker".parse::<UserRole>().unwrap(), UserRole::JobSeeker);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serde_matches_display() {
        let json = serde_json::to_string(&UserRole::JobSeeker).unwrap();
        assert_eq!(json, "\"JOB_SEEKER\"");
    }
}
