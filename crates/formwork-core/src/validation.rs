//! # Validation Module
//!
//! Credential rules checked by the registration form before it submits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dispatch (crate::dispatch)                                   │
//! │  ├── Payload shape (string, bool, record)                              │
//! │  └── Invalid dispatches are dropped, state unchanged                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Submit (THIS MODULE)                                         │
//! │  ├── Username rules                                                    │
//! │  └── Password rules                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Fetch worker                                                 │
//! │  └── Response body decoded against the URL schema table                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use formwork_core::validation::{validate_password, validate_username};
//!
//! assert!(validate_username("alice.smith").is_ok());
//! assert!(validate_password("Sup3r$ecret").is_ok());
//! assert!(validate_password("weak").is_err());
//! ```

use crate::error::ValidationError;
use crate::{MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Special characters accepted by the password rule.
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

const USERNAME_SEPARATORS: [char; 3] = ['.', '_', '-'];

// =============================================================================
// Username
// =============================================================================

/// Validates a username, returning the first rule it breaks.
///
/// ## Rules
/// - At least 3 characters
/// - No whitespace
/// - Only letters, digits, `.`, `_`, `-`
/// - Starts with a letter, ends with a letter or digit
/// - No two separators in a row
pub fn validate_username(username: &str) -> ValidationResult<()> {
    first_error(username_errors(username))
}

/// Returns every username rule `username` breaks, in rule order.
pub fn username_errors(username: &str) -> Vec<ValidationError> {
    let field = "username";

    if username.is_empty() {
        return vec![required(field)];
    }

    let mut errors = Vec::new();

    if username.chars().count() < MIN_USERNAME_LENGTH {
        errors.push(ValidationError::TooShort {
            field: field.to_string(),
            min: MIN_USERNAME_LENGTH,
        });
    }

    if username.chars().any(char::is_whitespace) {
        errors.push(invalid(field, "must not contain spaces"));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || USERNAME_SEPARATORS.contains(&c) || c.is_whitespace())
    {
        errors.push(invalid(
            field,
            "must contain only letters, numbers, periods, underscores, and hyphens",
        ));
    }

    if !username.starts_with(|c: char| c.is_ascii_alphabetic()) {
        errors.push(invalid(field, "must start with a letter"));
    }

    if !username.ends_with(|c: char| c.is_ascii_alphanumeric()) {
        errors.push(invalid(field, "must end with a letter or number"));
    }

    let chars: Vec<char> = username.chars().collect();
    if chars
        .windows(2)
        .any(|pair| {
            USERNAME_SEPARATORS.contains(&pair[0]) && USERNAME_SEPARATORS.contains(&pair[1])
        })
    {
        errors.push(invalid(
            field,
            "must not contain consecutive periods, underscores, or hyphens",
        ));
    }

    errors
}

// =============================================================================
// Password
// =============================================================================

/// Validates a password, returning the first rule it breaks.
///
/// ## Rules
/// - At least 8 characters
/// - No whitespace
/// - At least one uppercase letter, lowercase letter, digit, and special
///   character from [`PASSWORD_SPECIAL_CHARS`]
pub fn validate_password(password: &str) -> ValidationResult<()> {
    first_error(password_errors(password))
}

/// Returns every password rule `password` breaks, in rule order.
pub fn password_errors(password: &str) -> Vec<ValidationError> {
    let field = "password";

    if password.is_empty() {
        return vec![required(field)];
    }

    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(ValidationError::TooShort {
            field: field.to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password.chars().any(char::is_whitespace) {
        errors.push(invalid(field, "must not contain spaces"));
    }

    let classes: [(&str, fn(char) -> bool); 4] = [
        ("uppercase letter", |c| c.is_ascii_uppercase()),
        ("lowercase letter", |c| c.is_ascii_lowercase()),
        ("number", |c| c.is_ascii_digit()),
        ("special character", |c| PASSWORD_SPECIAL_CHARS.contains(c)),
    ];

    for (requirement, matches) in classes {
        if !password.chars().any(matches) {
            errors.push(ValidationError::MissingCharacter {
                field: field.to_string(),
                requirement: requirement.to_string(),
            });
        }
    }

    errors
}

// =============================================================================
// Helpers
// =============================================================================

fn first_error(errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
