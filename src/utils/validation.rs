//! Validation Utilities
//!
//! Input validation functions for account data and API requests.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Minimum accepted password length
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum accepted password length
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates email address format using a comprehensive regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    email.len() <= 255 && regex.is_match(email)
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a nickname: 3-50 characters of letters, digits, underscores and hyphens
pub fn validate_nickname(nickname: &str) -> bool {
    static NICKNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NICKNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_-]{3,50}$").expect("Failed to compile nickname regex")
    });

    regex.is_match(nickname)
}

/// Validates that a name contains only allowed characters and length
pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();

    if trimmed.is_empty() || trimmed.len() > 100 {
        return false;
    }

    // Allow letters, spaces, hyphens, and apostrophes
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z\s\-']+$").expect("Failed to compile name regex"));

    regex.is_match(trimmed)
}

/// Validates URL format for profile pictures and social links
pub fn validate_url(url: &str) -> bool {
    if url.is_empty() {
        return true; // Empty URLs are allowed for optional fields
    }

    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("Failed to compile URL regex")
    });

    regex.is_match(url) && url.len() <= 512
}

/// Validates a free-text biography
pub fn validate_bio(bio: &str) -> bool {
    bio.chars().count() <= 500 && !bio.chars().any(|c| c.is_control() && c != '\n')
}

/// Checks password length and character classes
///
/// A strong password has 8-128 characters and at least one uppercase letter,
/// one lowercase letter, one digit and one non-alphanumeric character.
pub fn check_password_strength(password: &str) -> Result<(), &'static str> {
    let length = password.chars().count();
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length) {
        return Err(messages::PASSWORD_LENGTH);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(messages::PASSWORD_UPPERCASE);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(messages::PASSWORD_LOWERCASE);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(messages::PASSWORD_DIGIT);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Err(messages::PASSWORD_SPECIAL);
    }
    Ok(())
}

/// Custom validator for email fields using the validator crate
///
/// Surrounding whitespace is ignored; it is stripped on normalization.
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email.trim()) {
        Ok(())
    } else {
        Err(rejected("invalid_email", messages::INVALID_EMAIL))
    }
}

fn rejected(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Custom validator for nickname fields
pub fn nickname_validator(nickname: &str) -> Result<(), ValidationError> {
    if validate_nickname(nickname) {
        Ok(())
    } else {
        Err(rejected("invalid_nickname", messages::INVALID_NICKNAME))
    }
}

/// Nickname at registration; blank means "generate one"
pub fn optional_nickname_validator(nickname: &str) -> Result<(), ValidationError> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Ok(());
    }
    nickname_validator(nickname)
}

/// Custom validator for first and last names
pub fn name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(rejected("invalid_name", messages::INVALID_NAME))
    }
}

/// Custom validator for profile links
pub fn url_validator(url: &str) -> Result<(), ValidationError> {
    if validate_url(url) {
        Ok(())
    } else {
        Err(rejected("invalid_url", messages::INVALID_URL))
    }
}

pub fn bio_validator(bio: &str) -> Result<(), ValidationError> {
    if validate_bio(bio) {
        Ok(())
    } else {
        Err(rejected("invalid_bio", messages::INVALID_BIO))
    }
}

/// Custom validator for password fields using the validator crate
pub fn password_strength_validator(password: &str) -> Result<(), ValidationError> {
    check_password_strength(password).map_err(|msg| rejected("weak_password", msg))
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_NICKNAME: &str =
        "Nickname must be 3-50 characters of letters, digits, underscores or hyphens";
    pub const INVALID_NAME: &str =
        "Name must contain only letters, spaces, hyphens, and apostrophes";
    pub const INVALID_URL: &str = "Please enter a valid URL starting with http:// or https://";
    pub const INVALID_BIO: &str = "Bio must be at most 500 characters of printable text";
    pub const PASSWORD_LENGTH: &str = "Password must be between 8 and 128 characters";
    pub const PASSWORD_UPPERCASE: &str = "Password must contain at least one uppercase letter";
    pub const PASSWORD_LOWERCASE: &str = "Password must contain at least one lowercase letter";
    pub const PASSWORD_DIGIT: &str = "Password must contain at least one digit";
    pub const PASSWORD_SPECIAL: &str = "Password must contain at least one special character";
}
