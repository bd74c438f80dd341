//! Input validation for auth and profile requests.
//!
//! Job drafts are validated by the job store itself; this module covers
//! the account payloads that never reach a store in invalid form.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{LoginRequest, ProfileUpdate, RegisterRequest};

lazy_static! {
    /// Pragmatic email shape check: local@domain.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();

    static ref URL_REGEX: Regex = Regex::new(r"^https?://\S+$").unwrap();
}

const MIN_PASSWORD_LEN: usize = 6;
const MAX_FIELD_LEN: usize = 255;

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_FIELD_LEN {
        return Err("Email is too long (max 255 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Email should be valid".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

fn validate_full_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Full name is required".to_string());
    }
    if name.len() > MAX_FIELD_LEN {
        return Err("Full name is too long (max 255 characters)".to_string());
    }
    Ok(())
}

fn validate_resume_url(url: &Option<String>) -> Result<(), String> {
    match url.as_deref().map(str::trim) {
        None | Some("") => Ok(()),
        Some(url) if URL_REGEX.is_match(url) => Ok(()),
        Some(_) => Err("Resume URL must be an http(s) URL".to_string()),
    }
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    if let Err(e) = validate_full_name(&request.full_name) {
        errors.add("full_name", e);
    }
    if let Err(e) = validate_resume_url(&request.resume_url) {
        errors.add("resume_url", e);
    }
    errors.finish()
}

pub fn validate_login(request: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if request.email.trim().is_empty() {
        errors.add("email", "Email is required");
    }
    if request.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &update.full_name {
        if let Err(e) = validate_full_name(name) {
            errors.add("full_name", e);
        }
    }
    if let Err(e) = validate_resume_url(&update.resume_url) {
        errors.add("resume_url", e);
    }
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRole;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Ama Mensah".to_string(),
            role: UserRole::JobSeeker,
            phone: None,
            skills: None,
            experience: None,
            bio: None,
            resume_url: None,
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ama@example.com").is_ok());
        assert!(validate_email("ama.mensah+jobs@mail.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ama").is_err());
        assert!(validate_email("ama@localhost").is_err());
        assert!(validate_email("ama@@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_registration_collects_all_fields() {
        let mut bad = request("nope", "123");
        bad.full_name = " ".into();
        bad.resume_url = Some("ftp://cv".into());

        let err = validate_registration(&bad).unwrap_err();
        assert!(err.message().contains("4 fields"));

        assert!(validate_registration(&request("ama@example.com", "secret1")).is_ok());
    }

    #[test]
    fn test_login_requires_both_fields() {
        let err = validate_login(&LoginRequest {
            email: "".into(),
            password: "x".into(),
        })
        .unwrap_err();
        assert_eq!(err.message(), "Email is required");
    }

    #[test]
    fn test_profile_update_blank_name() {
        let update = ProfileUpdate {
            full_name: Some("   ".into()),
            ..Default::default()
        };
        assert!(validate_profile_update(&update).is_err());
        assert!(validate_profile_update(&ProfileUpdate::default()).is_ok());
    }
}
