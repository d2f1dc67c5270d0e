use bcrypt::{hash, verify, DEFAULT_COST};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password does not meet the requirements")]
    Weak(Vec<PolicyViolation>),
    #[error("bcrypt failure: {0}")]
    Bcrypt(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Password must be at least {0} characters long")]
    TooShort(usize),
    #[error("Password must be no more than {0} characters long")]
    TooLong(usize),
    #[error("Password must contain at least one uppercase letter")]
    NoUppercase,
    #[error("Password must contain at least one lowercase letter")]
    NoLowercase,
    #[error("Password must contain at least one number")]
    NoNumber,
    #[error("Password must contain at least one special character")]
    NoSpecialChar,
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_mixed_case: bool,
    pub require_number: bool,
    pub require_special_char: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_mixed_case: true,
            require_number: true,
            require_special_char: true,
        }
    }
}

impl PasswordPolicy {
    /// Every rule the password breaks, in a stable order.
    pub fn violations(&self, password: &str) -> Vec<PolicyViolation> {
        let length = password.chars().count();
        let has = |pred: fn(char) -> bool| password.chars().any(pred);

        let checks = [
            (length < self.min_length, PolicyViolation::TooShort(self.min_length)),
            (length > self.max_length, PolicyViolation::TooLong(self.max_length)),
            (self.require_mixed_case && !has(char::is_uppercase), PolicyViolation::NoUppercase),
            (self.require_mixed_case && !has(char::is_lowercase), PolicyViolation::NoLowercase),
            (self.require_number && !has(|c| c.is_ascii_digit()), PolicyViolation::NoNumber),
            (
                self.require_special_char && !has(|c| !c.is_alphanumeric()),
                PolicyViolation::NoSpecialChar,
            ),
        ];

        checks
            .into_iter()
            .filter_map(|(failed, violation)| failed.then_some(violation))
            .collect()
    }

    pub fn check(&self, password: &str) -> Result<(), PasswordError> {
        let violations = self.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PasswordError::Weak(violations))
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash(password, DEFAULT_COST).map_err(|e| PasswordError::Bcrypt(e.to_string()))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, PasswordError> {
    verify(password, hashed).map_err(|e| PasswordError::Bcrypt(e.to_string()))
}
