//! Credential hashing and account input policy.
//!
//! # Responsibility
//! - Hash and verify passwords as Argon2id PHC strings.
//! - Validate handles, emails, passwords and display names before any write.
//!
//! # Invariants
//! - Plaintext passwords never leave this module in any form but a PHC hash.
//! - A malformed stored hash is an error, never a successful verification.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_HANDLE_CHARS: usize = 32;
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,32}$").expect("valid handle regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex"));

/// Hashing backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError(String);

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential error: {}", self.0)
    }
}

impl Error for CredentialError {}

/// Rejected account input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    EmptyHandle,
    InvalidHandle(String),
    EmptyEmail,
    InvalidEmail(String),
    PasswordTooShort { min_len: usize },
    PasswordMismatch,
    PasswordUnchanged,
    DisplayNameTooLong { max_chars: usize },
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyHandle => write!(f, "handle is required"),
            Self::InvalidHandle(handle) => write!(
                f,
                "handle `{handle}` must be 1-{MAX_HANDLE_CHARS} letters, digits or underscores"
            ),
            Self::EmptyEmail => write!(f, "email is required"),
            Self::InvalidEmail(email) => write!(f, "email `{email}` is not a valid address"),
            Self::PasswordTooShort { min_len } => {
                write!(f, "password must be at least {min_len} characters")
            }
            Self::PasswordMismatch => write!(f, "password and confirmation do not match"),
            Self::PasswordUnchanged => write!(f, "new password must differ from the current one"),
            Self::DisplayNameTooLong { max_chars } => {
                write!(f, "display name must be at most {max_chars} characters")
            }
        }
    }
}

impl Error for InputError {}

/// Hashes a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| CredentialError(format!("failed to hash password: {err}")))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| CredentialError(format!("invalid stored password hash: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn validate_handle(handle: &str) -> Result<(), InputError> {
    if handle.is_empty() {
        return Err(InputError::EmptyHandle);
    }
    if !HANDLE_RE.is_match(handle) {
        return Err(InputError::InvalidHandle(handle.to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), InputError> {
    if email.trim().is_empty() {
        return Err(InputError::EmptyEmail);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(InputError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Enforces minimum length and confirmation equality.
pub fn validate_new_password(
    password: &str,
    confirmation: &str,
    min_len: usize,
) -> Result<(), InputError> {
    if password.chars().count() < min_len {
        return Err(InputError::PasswordTooShort { min_len });
    }
    if password != confirmation {
        return Err(InputError::PasswordMismatch);
    }
    Ok(())
}

/// Trims and length-checks a display name.
pub fn normalize_display_name(name: &str) -> Result<String, InputError> {
    let trimmed = name.trim();
    if trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(InputError::DisplayNameTooLong {
            max_chars: MAX_DISPLAY_NAME_CHARS,
        });
    }
    Ok(trimmed.to_string())
}
