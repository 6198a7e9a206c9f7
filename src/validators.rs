//! Client-side schema checks run before any auth request leaves the process.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

static BACKUP_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{8,20}$").expect("static regex"));

const MAX_EMAIL_LEN: usize = 254;
const MAX_PASSWORD_LEN: usize = 128;
const MIN_NEW_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailEmpty,
    #[error("Email is too long (max 254 characters)")]
    EmailTooLong,
    #[error("Please enter a valid email address")]
    EmailInvalidFormat,
    #[error("Password is required")]
    PasswordEmpty,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password is too long (max 128 characters)")]
    PasswordTooLong,
    #[error("Username is required")]
    UsernameEmpty,
    #[error("Enter the 6-digit code from your authenticator app")]
    CodeInvalid,
    #[error("Backup codes are 8 to 20 letters, digits or dashes")]
    BackupCodeInvalid,
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::EmailTooLong);
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(())
}

/// Login only requires a password to be present; strength is the backend's call.
pub fn validate_login_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Registration enforces the minimum length as well.
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    validate_login_password(password)?;
    if password.chars().count() < MIN_NEW_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    Ok(())
}

/// TOTP codes are exactly six digits; backup codes follow their own format.
pub fn validate_mfa_code(code: &str, use_backup_code: bool) -> Result<(), ValidationError> {
    let code = code.trim();
    if use_backup_code {
        if BACKUP_CODE_REGEX.is_match(code) {
            return Ok(());
        }
        return Err(ValidationError::BackupCodeInvalid);
    }
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::CodeInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user+tag@sub.example.com").is_ok());
        assert!(validate_email("  padded@example.com ").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        assert_eq!(validate_email(""), Err(ValidationError::EmailEmpty));
        assert_eq!(
            validate_email("not-an-email"),
            Err(ValidationError::EmailInvalidFormat)
        );
        assert_eq!(
            validate_email("missing@tld"),
            Err(ValidationError::EmailInvalidFormat)
        );
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(validate_email(&long), Err(ValidationError::EmailTooLong));
    }

    #[test]
    fn login_password_only_needs_presence() {
        assert!(validate_login_password("x").is_ok());
        assert_eq!(
            validate_login_password(""),
            Err(ValidationError::PasswordEmpty)
        );
    }

    #[test]
    fn new_password_needs_length() {
        assert_eq!(
            validate_new_password("short"),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(validate_new_password("long enough").is_ok());
        assert_eq!(
            validate_new_password(&"p".repeat(129)),
            Err(ValidationError::PasswordTooLong)
        );
    }

    #[test]
    fn totp_code_is_six_digits() {
        assert!(validate_mfa_code("123456", false).is_ok());
        assert!(validate_mfa_code(" 123456 ", false).is_ok());
        assert_eq!(
            validate_mfa_code("12345", false),
            Err(ValidationError::CodeInvalid)
        );
        assert_eq!(
            validate_mfa_code("12a456", false),
            Err(ValidationError::CodeInvalid)
        );
    }

    #[test]
    fn backup_code_has_its_own_format() {
        assert!(validate_mfa_code("ABCD-1234", true).is_ok());
        assert_eq!(
            validate_mfa_code("123456", true),
            Err(ValidationError::BackupCodeInvalid)
        );
    }
}
