//! Input validation helpers
//!
//! Centralized text length constants and validation functions.

use shared::error::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: painting titles, artist names, region names, etc.
pub const MAX_NAME_LEN: usize = 200;

/// Descriptions and shipping addresses
pub const MAX_TEXT_LEN: usize = 2000;

/// Short identifiers: phone numbers, sizes, mediums
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// URLs / image paths
pub const MAX_URL_LEN: usize = 2048;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Minimal email shape check: non-empty local part and domain around one '@'.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(AppError::validation("Invalid email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::validation("Invalid email")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Sunset", "title", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("", "title", MAX_NAME_LEN).is_err());
        assert!(validate_required_text("   ", "title", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(201), "title", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(&None, "note", 10).is_ok());
        assert!(validate_optional_text(&Some("short".into()), "note", 10).is_ok());
        assert!(validate_optional_text(&Some("way too long".into()), "note", 10).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("  buyer@example.com  ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("buyer@nodot").is_err());
    }
}
