//! Input validation for user emails and queries.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for a natural-language query.
pub const MAX_QUERY_LENGTH: usize = 2000;

/// Normalize an email address for use as the `users` key.
///
/// Addresses are trimmed and lowercased so that a reply sent from
/// `Alice@Example.com` credits the account registered as `alice@example.com`.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address (basic RFC 5322 format check).
///
/// This is a basic validation that checks:
/// - Contains exactly one @
/// - Has at least one character before @
/// - Has at least one dot after @
/// - Is not too long
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail(
            "must contain an @ symbol".to_string(),
        ));
    };

    if domain.contains('@') {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    if !domain.contains('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must contain at least one dot".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail(
            "domain cannot start or end with a dot".to_string(),
        ));
    }

    if domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domain cannot contain consecutive dots".to_string(),
        ));
    }

    Ok(())
}

/// Validate a query before it is sent to the classifier.
pub fn validate_query(query: &str) -> Result<(), ValidationError> {
    let query = query.trim();

    if query.is_empty() {
        return Err(ValidationError::Empty("query".to_string()));
    }

    let len = query.chars().count();
    if len > MAX_QUERY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LENGTH,
            actual: len,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.co.uk").is_ok());
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email(" test@example.com ").is_ok()); // trimmed
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(matches!(validate_email(""), Err(ValidationError::Empty(_))));

        assert!(matches!(
            validate_email("test.example.com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@example@com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("@example.com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@localhost"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@example..com"),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&email),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("who can help with fundraising?").is_ok());
        assert!(matches!(validate_query("   "), Err(ValidationError::Empty(_))));

        let long_query = "q".repeat(MAX_QUERY_LENGTH + 1);
        assert!(matches!(
            validate_query(&long_query),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidEmail("test message".to_string());
        assert_eq!(err.to_string(), "Invalid email: test message");

        let err = ValidationError::TooLong {
            field: "query".to_string(),
            max: 2000,
            actual: 2400,
        };
        assert_eq!(err.to_string(), "query is too long (2400 chars, max 2000)");
    }
}
