//! Form validation.
//!
//! Runs before any request is built. A form that fails validation never
//! reaches the server; each failure is reported against the field that
//! caused it so a front end can show it inline.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::models::{Credentials, UserFormData};

/// Minimum password length for every form.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
});

/// Form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
        }
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// All field errors of one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: &str) {
        self.errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message reported for `field`.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field.as_str(), e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_email(email: &str, invalid_message: &str, errors: &mut ValidationErrors) {
    if email.trim().is_empty() {
        errors.push(Field::Email, "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.push(Field::Email, invalid_message);
    }
}

/// Returns true when the password passed the basic checks.
fn check_password(password: &str, errors: &mut ValidationErrors) -> bool {
    if password.is_empty() {
        errors.push(Field::Password, "Password is required");
        false
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(Field::Password, "Password must be at least 6 characters");
        false
    } else {
        true
    }
}

/// Login form: valid email and a password of at least six characters.
pub fn validate_login(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(
        &credentials.email,
        "Please enter a valid email address",
        &mut errors,
    );
    check_password(&credentials.password, &mut errors);
    errors.into_result()
}

/// Registration form.
///
/// On top of the login rules the password must mix lowercase, uppercase and
/// digits, and the confirmation must repeat it exactly.
pub fn validate_registration(
    credentials: &Credentials,
    confirm_password: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(
        &credentials.email,
        "Please enter a valid email address",
        &mut errors,
    );

    let password = &credentials.password;
    if check_password(password, &mut errors) {
        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            errors.push(
                Field::Password,
                "Password must contain at least one uppercase letter, one lowercase letter, and one number",
            );
        }
    }

    if confirm_password.is_empty() {
        errors.push(Field::ConfirmPassword, "Please confirm your password");
    } else if confirm_password != password {
        errors.push(Field::ConfirmPassword, "Passwords do not match");
    }

    errors.into_result()
}

/// Add/edit user form.
pub fn validate_user_form(form: &UserFormData) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(&form.email, "Invalid email address", &mut errors);
    check_password(&form.password, &mut errors);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials::new(email, password)
    }

    #[test]
    fn test_login_accepts_valid_input() {
        assert!(validate_login(&creds("a@b.com", "secret1")).is_ok());
        assert!(validate_login(&creds("First.Last+tag@Example.ORG", "123456")).is_ok());
    }

    #[test]
    fn test_login_reports_every_field() {
        let errors = validate_login(&creds("", "")).unwrap_err();
        assert_eq!(errors.get(Field::Email), Some("Email is required"));
        assert_eq!(errors.get(Field::Password), Some("Password is required"));
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_email_pattern() {
        let errors = validate_login(&creds("not-an-email", "secret1")).unwrap_err();
        assert_eq!(errors.get(Field::Email), Some("Please enter a valid email address"));

        let errors = validate_login(&creds("a@b.c", "secret1")).unwrap_err();
        assert!(errors.get(Field::Email).is_some());
    }

    #[test]
    fn test_short_password() {
        let errors = validate_login(&creds("a@b.com", "abc")).unwrap_err();
        assert_eq!(
            errors.get(Field::Password),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn test_registration_password_strength() {
        let errors = validate_registration(&creds("a@b.com", "secret1"), "secret1").unwrap_err();
        assert!(errors
            .get(Field::Password)
            .unwrap()
            .starts_with("Password must contain"));

        assert!(validate_registration(&creds("a@b.com", "Secret1"), "Secret1").is_ok());
    }

    #[test]
    fn test_registration_confirmation() {
        let errors = validate_registration(&creds("a@b.com", "Secret1"), "Secret2").unwrap_err();
        assert_eq!(errors.get(Field::ConfirmPassword), Some("Passwords do not match"));
        assert!(errors.get(Field::Password).is_none());

        let errors = validate_registration(&creds("a@b.com", "Secret1"), "").unwrap_err();
        assert_eq!(
            errors.get(Field::ConfirmPassword),
            Some("Please confirm your password")
        );
    }

    #[test]
    fn test_user_form() {
        let form = UserFormData::new("x@y.com", "new1");
        let errors = validate_user_form(&form).unwrap_err();
        assert!(errors.get(Field::Email).is_none());
        assert!(errors.get(Field::Password).is_some());

        let form = UserFormData::new("bad", "longenough");
        let errors = validate_user_form(&form).unwrap_err();
        assert_eq!(errors.get(Field::Email), Some("Invalid email address"));
        assert_eq!(errors.to_string(), "email: Invalid email address");
    }
}
