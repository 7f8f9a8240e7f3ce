//! # Validation Module
//!
//! Input validation for coupon administration and request parameters.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Controllers (outside this repo)                              │
//! │  ├── Deserialization, auth, basic shape                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services (bazaar-db)                                         │
//! │  ├── THIS MODULE: field rules (code format, ranges, expiry)            │
//! │  └── Cart / coupon rules (crate::cart, crate::coupon)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (tenant_id, code)                                          │
//! │  ├── CHECK stock >= 0, used_count <= usage_limit                       │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_coupon_code, validate_percentage_bps};
//!
//! assert!(validate_coupon_code("SAVE20").is_ok());
//! assert!(validate_percentage_bps(2000).is_ok());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::Percent;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortest accepted coupon code.
pub const MIN_COUPON_CODE_LEN: usize = 3;

/// Longest accepted coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - 3 to 32 characters
/// - Letters, digits, hyphens and underscores only
///
/// Case is not checked here; codes are upper-cased before storage.
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("save20").is_ok());
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("NO SPACES").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() < MIN_COUPON_CODE_LEN {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: MIN_COUPON_CODE_LEN,
        });
    }

    if code.chars().count() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("minimum_order", 50000).is_ok());
/// assert!(validate_amount_cents("minimum_order", 0).is_ok());
/// assert!(validate_amount_cents("minimum_order", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage coupon value: strictly above 0%, at most 100%.
pub fn validate_percentage_bps(bps: u32) -> ValidationResult<()> {
    if bps == 0 || bps > Percent::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 1,
            max: Percent::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a flat-off coupon value (> 0).
pub fn validate_flat_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "flat_amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional usage limit (positive when set).
pub fn validate_usage_limit(limit: Option<i64>) -> ValidationResult<()> {
    match limit {
        Some(n) if n <= 0 => Err(ValidationError::MustBePositive {
            field: "usage_limit".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Time Validators
// =============================================================================

/// Validates that a new coupon's expiry lies in the future.
pub fn validate_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult<()> {
    if expires_at <= now {
        return Err(ValidationError::InvalidFormat {
            field: "expires_at".to_string(),
            reason: "must be in the future".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE20").is_ok());
        assert!(validate_coupon_code("diwali_2026").is_ok());
        assert!(validate_coupon_code("NEW-USER").is_ok());

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("   ").is_err());
        assert!(validate_coupon_code("AB").is_err());
        assert!(validate_coupon_code("HAS SPACE").is_err());
        assert!(validate_coupon_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_percentage_bps() {
        assert!(validate_percentage_bps(1).is_ok());
        assert!(validate_percentage_bps(10000).is_ok());
        assert!(validate_percentage_bps(0).is_err());
        assert!(validate_percentage_bps(10001).is_err());
    }

    #[test]
    fn test_validate_flat_and_limits() {
        assert!(validate_flat_amount_cents(1).is_ok());
        assert!(validate_flat_amount_cents(0).is_err());
        assert!(validate_usage_limit(None).is_ok());
        assert!(validate_usage_limit(Some(5)).is_ok());
        assert!(validate_usage_limit(Some(0)).is_err());
        assert!(validate_amount_cents("minimum_order", -1).is_err());
    }

    #[test]
    fn test_validate_expiry() {
        let now = Utc::now();
        assert!(validate_expiry(now + Duration::days(1), now).is_ok());
        assert!(validate_expiry(now, now).is_err());
        assert!(validate_expiry(now - Duration::days(1), now).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
