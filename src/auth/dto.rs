use crate::auth::identity::Role;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::users::dto::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "The name field is required"))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The password confirmation does not match"))]
    pub password_confirmation: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_payload() -> RegisterRequest {
        RegisterRequest {
            name: "Budi".into(),
            email: "budi@example.com".into(),
            password: "password123".into(),
            password_confirmation: "password123".into(),
            role: Role::Customer,
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(register_payload().validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_confirmation() {
        let mut payload = register_payload();
        payload.password_confirmation = "something-else".into();
        let errs = payload.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password_confirmation"));
    }

    #[test]
    fn rejects_short_password_and_bad_email() {
        let mut payload = register_payload();
        payload.email = "not-an-email".into();
        payload.password = "short".into();
        payload.password_confirmation = "short".into();
        let errs = payload.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
