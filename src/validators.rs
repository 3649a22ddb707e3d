/// Input validators
///
/// Every validator trims its input, checks it, and hands back the cleaned
/// value or a [`ValidationError`] naming the offending field. Handlers
/// collect the failures into a `FieldErrors` so a single 400 reports every
/// bad field at once.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 100;
const NICKNAME_MAX: usize = 50;
const CHAT_NAME_MAX: usize = 100;
const MESSAGE_MAX: usize = 900;

/// Inclusive character-count bounds for a field
#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: usize,
    pub max: usize,
}

impl Length {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Email bounds at sign-up
pub const SIGNUP_EMAIL: Length = Length::new(8, 100);
/// Email bounds on account update
pub const UPDATE_EMAIL: Length = Length::new(10, 150);
pub const SIGNUP_PROFILE_TEXT: usize = 500;
pub const UPDATE_PROFILE_TEXT: usize = 1000;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).unwrap();

    static ref SPECIAL_CHARACTER: Regex = Regex::new(r"[^a-zA-Z0-9\s]").unwrap();
}

fn check_length(field: &str, value: &str, bounds: Length) -> Result<(), ValidationError> {
    let count = value.chars().count();
    if count == 0 && bounds.min > 0 {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if count < bounds.min {
        return Err(ValidationError::TooShort(field.to_string(), bounds.min));
    }
    if count > bounds.max {
        return Err(ValidationError::TooLong(field.to_string(), bounds.max));
    }
    Ok(())
}

fn reject_whitespace(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InnerWhitespace(field.to_string()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();
    check_length("username", trimmed, Length::new(1, USERNAME_MAX))?;
    reject_whitespace("username", trimmed)?;
    Ok(trimmed.to_string())
}

/// Sign-up and login rule: length and no whitespace.
pub fn validate_password(password: &str) -> Result<String, ValidationError> {
    let trimmed = password.trim();
    check_length("password", trimmed, Length::new(PASSWORD_MIN, PASSWORD_MAX))?;
    reject_whitespace("password", trimmed)?;
    Ok(trimmed.to_string())
}

/// Account-update rule: additionally requires a digit and a special character.
pub fn validate_new_password(password: &str) -> Result<String, ValidationError> {
    let cleaned = validate_password(password)?;

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::MissingDigit("password".to_string()));
    }
    if !SPECIAL_CHARACTER.is_match(&cleaned) {
        return Err(ValidationError::MissingSpecialCharacter("password".to_string()));
    }
    Ok(cleaned)
}

/// `password-confirm` must be present and equal `password`.
pub fn validate_password_confirmation(
    password: &str,
    confirmation: Option<&str>,
) -> Result<(), ValidationError> {
    let field = "password-confirm";
    let confirmation = confirmation
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ValidationError::Required(field.to_string()))?;

    if confirmation != password.trim() {
        return Err(ValidationError::Mismatch(field.to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str, bounds: Length) -> Result<String, ValidationError> {
    let trimmed = email.trim();
    check_length("email", trimmed, bounds)?;

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn validate_nickname(nickname: &str) -> Result<String, ValidationError> {
    let trimmed = nickname.trim();
    check_length("nickname", trimmed, Length::new(1, NICKNAME_MAX))?;
    Ok(trimmed.to_string())
}

/// Free text; may be empty. `field` differs between sign-up and update forms.
pub fn validate_profile_text(field: &str, text: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    check_length(field, trimmed, Length::new(0, max))?;
    Ok(trimmed.to_string())
}

pub fn validate_chat_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    check_length("chat-name", trimmed, Length::new(1, CHAT_NAME_MAX))?;
    Ok(trimmed.to_string())
}

pub fn validate_message_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    check_length("text", trimmed, Length::new(1, MESSAGE_MAX))?;
    Ok(trimmed.to_string())
}

/// Split a comma separated `user-list`, dropping blanks.
pub fn parse_user_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert_eq!(validate_username("  boggs ").unwrap(), "boggs");
        assert!(validate_username(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_invalid_username() {
        assert!(matches!(
            validate_username("   "),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(matches!(
            validate_username("two words"),
            Err(ValidationError::InnerWhitespace(_))
        ));
        assert!(matches!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::TooLong(_, 50))
        ));
    }

    #[test]
    fn test_password_length_limits() {
        assert!(validate_password("password").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(ValidationError::TooShort(_, 8))
        ));
        assert!(validate_password(&"a".repeat(101)).is_err());
        assert!(matches!(
            validate_password("pass word"),
            Err(ValidationError::InnerWhitespace(_))
        ));
    }

    #[test]
    fn test_new_password_strength() {
        assert!(validate_new_password("n3w-password").is_ok());
        assert!(matches!(
            validate_new_password("no-digits-here"),
            Err(ValidationError::MissingDigit(_))
        ));
        assert!(matches!(
            validate_new_password("n0special"),
            Err(ValidationError::MissingSpecialCharacter(_))
        ));
    }

    #[test]
    fn test_password_confirmation() {
        assert!(validate_password_confirmation("n3w-password", Some("n3w-password")).is_ok());
        assert!(matches!(
            validate_password_confirmation("n3w-password", Some("other")),
            Err(ValidationError::Mismatch(_))
        ));
        assert!(matches!(
            validate_password_confirmation("n3w-password", None),
            Err(ValidationError::Required(_))
        ));
    }

    #[test]
    fn test_valid_email() {
        assert!(validate_email("user@example.com", SIGNUP_EMAIL).is_ok());
        assert!(validate_email("test.email@domain.co.uk", SIGNUP_EMAIL).is_ok());
        assert!(validate_email("user+tag@example.com", SIGNUP_EMAIL).is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(validate_email("invalid-address", SIGNUP_EMAIL).is_err());
        assert!(validate_email("user@example", SIGNUP_EMAIL).is_err());
        assert!(validate_email("@example.com", SIGNUP_EMAIL).is_err());
        assert!(validate_email("user@@example.com", SIGNUP_EMAIL).is_err());
    }

    #[test]
    fn test_email_bounds_differ_between_forms() {
        // 9 characters
        assert!(validate_email("a@b.co.uk", SIGNUP_EMAIL).is_ok());
        assert!(matches!(
            validate_email("a@b.co.uk", UPDATE_EMAIL),
            Err(ValidationError::TooShort(_, 10))
        ));
    }

    #[test]
    fn test_profile_text_may_be_empty() {
        assert_eq!(validate_profile_text("profile_text", "  ", SIGNUP_PROFILE_TEXT).unwrap(), "");
        assert!(validate_profile_text("profile_text", &"a".repeat(501), SIGNUP_PROFILE_TEXT).is_err());
        assert!(validate_profile_text("profile-text", &"a".repeat(1000), UPDATE_PROFILE_TEXT).is_ok());
    }

    #[test]
    fn test_message_text() {
        assert_eq!(validate_message_text("  hello  ").unwrap(), "hello");
        assert!(matches!(
            validate_message_text("   "),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(validate_message_text(&"a".repeat(900)).is_ok());
        assert!(matches!(
            validate_message_text(&"a".repeat(901)),
            Err(ValidationError::TooLong(_, 900))
        ));
    }

    #[test]
    fn test_parse_user_list() {
        assert_eq!(parse_user_list("boggs, tim,,"), vec!["boggs", "tim"]);
        assert!(parse_user_list("").is_empty());
    }
}
