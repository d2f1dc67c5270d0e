use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;
use validator::{ValidationErrors, ValidationErrorsKind};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

pub const MIN_AGE: u32 = 13;
pub const MAX_AGE: u32 = 100;

fn email_regex() -> Result<&'static Regex, regex::Error> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = EMAIL.get() {
        return Ok(re);
    }
    let re = Regex::new(EMAIL_PATTERN)?;
    Ok(EMAIL.get_or_init(|| re))
}

/// Email validation
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.len() > 255 {
        return Err("Email cannot be longer than 255 characters".to_string());
    }

    let re = email_regex().map_err(|e| e.to_string())?;
    if !re.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_full_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err("Full name must be 2-100 characters".to_string());
    }
    Ok(())
}

/// Whole years between `date_of_birth` and `today`
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn validate_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> Result<u32, String> {
    match age_on(date_of_birth, today) {
        Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => Ok(age),
        _ => Err(format!("Age must be between {MIN_AGE}-{MAX_AGE} years")),
    }
}

/// Flatten `validator` errors, nested structs included, into sorted messages.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.sort();
    messages.dedup();
    messages
}

fn collect_messages(errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    out.push(message);
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(inner, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(range(min = 30.0, max = 300.0, message = "Weight must be between 30-300 kg"))]
        weight_kg: f64,
        #[validate(range(min = 1, max = 10, message = "Mood must be between 1-10"))]
        mood: Option<u8>,
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("athlete@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("user@domain.c").is_err());
    }

    #[test]
    fn test_full_name_validation() {
        assert!(validate_full_name("Al").is_ok());
        assert!(validate_full_name("A").is_err());
        assert!(validate_full_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2020, 6, 14).unwrap()), Some(19));
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()), Some(20));
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_date_of_birth_range() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            validate_date_of_birth(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(), today),
            Ok(34)
        );
        assert!(validate_date_of_birth(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(), today).is_err());
        assert!(validate_date_of_birth(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(), today).is_err());
    }

    #[test]
    fn test_validation_messages_are_collected() {
        let sample = Sample {
            weight_kg: 20.0,
            mood: Some(11),
        };
        let errors = sample.validate().unwrap_err();
        let messages = validation_messages(&errors);

        assert_eq!(
            messages,
            vec![
                "Mood must be between 1-10".to_string(),
                "Weight must be between 30-300 kg".to_string(),
            ]
        );
    }
}
