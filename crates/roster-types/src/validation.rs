use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::NewUser;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;
pub const EMAIL_MAX_CHARS: usize = 30;
pub const AGE_MAX: i64 = 120;

/// Caller-side field checks. The record store accepts anything; these run
/// before a record is handed to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must be between 2 and 20 characters (got {0})")]
    NameLength(usize),
    #[error("email must be at most 30 characters (got {0})")]
    EmailTooLong(usize),
    #[error("invalid email format: {0}")]
    EmailFormat(String),
    #[error("age must be between 0 and 120 (got {0})")]
    AgeOutOfRange(i64),
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::NameLength(len));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let len = email.chars().count();
    if len > EMAIL_MAX_CHARS {
        return Err(ValidationError::EmailTooLong(len));
    }
    if !email_regex().is_match(email) {
        return Err(ValidationError::EmailFormat(email.to_string()));
    }
    Ok(())
}

pub fn validate_age(age: i64) -> Result<u32, ValidationError> {
    if !(0..=AGE_MAX).contains(&age) {
        return Err(ValidationError::AgeOutOfRange(age));
    }
    Ok(age as u32)
}

impl NewUser {
    /// Builds a user from raw form input, collecting every field error
    /// rather than stopping at the first one.
    pub fn validated(
        name: &str,
        email: &str,
        age: i64,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = validate_name(name) {
            errors.push(e);
        }
        if let Err(e) = validate_email(email) {
            errors.push(e);
        }
        let age = match validate_age(age) {
            Ok(age) => age,
            Err(e) => {
                errors.push(e);
                0
            }
        };

        if errors.is_empty() {
            Ok(NewUser::new(name, email, age))
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert_eq!(validate_name("A"), Err(ValidationError::NameLength(1)));
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("Ñandú").is_ok());
        assert!(validate_name(&"x".repeat(20)).is_ok());
        assert_eq!(
            validate_name(&"x".repeat(21)),
            Err(ValidationError::NameLength(21))
        );
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("ana@mail.com").is_ok());
        assert!(validate_email("ana@mail").is_err());
        assert!(validate_email("ana mail@x.com").is_err());
        assert!(validate_email("@mail.com").is_err());
        assert_eq!(
            validate_email(&format!("{}@mail.com", "a".repeat(25))),
            Err(ValidationError::EmailTooLong(34))
        );
    }

    #[test]
    fn test_age_range() {
        assert_eq!(validate_age(0), Ok(0));
        assert_eq!(validate_age(120), Ok(120));
        assert_eq!(validate_age(-1), Err(ValidationError::AgeOutOfRange(-1)));
        assert_eq!(validate_age(121), Err(ValidationError::AgeOutOfRange(121)));
    }

    #[test]
    fn test_validated_collects_all_errors() {
        let errors = NewUser::validated("A", "nope", 200).unwrap_err();
        assert_eq!(errors.len(), 3);

        let user = NewUser::validated("Ana", "ana@mail.com", 25).unwrap();
        assert_eq!(user, NewUser::new("Ana", "ana@mail.com", 25));
    }
}
