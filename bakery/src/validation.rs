//! Payload checks that run before a request reaches the database.
//!
//! Create and update payloads implement [`Validatable`]; the generic handlers call
//! it before any database work and turn the collected [`ValidationErrors`] into a
//! 400 response listing every failed rule.
//!
//! ```rust,ignore
//! impl Validatable for ProductCreate {
//!     fn validate(&self) -> Result<(), ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         errors.check(validators::validate_required("name", "اسم المنتج", &self.name));
//!         errors.check(validators::validate_non_negative("price_eur", "السعر", self.price_eur));
//!         errors.result()
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;

/// Validation error with field name and Arabic message
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Every field problem found in one payload
#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the error of a failed check, ignore a passing one
    pub fn check(&mut self, outcome: Result<(), ValidationError>) {
        if let Err(error) = outcome {
            self.errors.push(error);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Trait for payloads that can be validated before reaching the database
pub trait Validatable {
    /// # Errors
    ///
    /// Returns every rule the payload violates.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Helper validators. `field` is the JSON key, `label` the Arabic name shown to users.
pub mod validators {
    use super::ValidationError;
    use rust_decimal::Decimal;
    use std::fmt;

    /// # Errors
    /// Fails when the value is empty or whitespace only.
    pub fn validate_required(field: &str, label: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, format!("{label} مطلوب")));
        }
        Ok(())
    }

    /// Length is counted in characters so Arabic text is measured correctly.
    ///
    /// # Errors
    /// Fails when the trimmed value is shorter than `min` or longer than `max`.
    pub fn validate_length(
        field: &str,
        label: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.trim().chars().count();

        if let Some(min_len) = min
            && len < min_len
        {
            return Err(ValidationError::new(
                field,
                format!("{label} يجب أن يتكون من {min_len} أحرف على الأقل"),
            ));
        }

        if let Some(max_len) = max
            && len > max_len
        {
            return Err(ValidationError::new(
                field,
                format!("{label} يجب ألا يتجاوز {max_len} حرفاً"),
            ));
        }

        Ok(())
    }

    /// # Errors
    /// Fails when the value lies outside `[min, max]`.
    pub fn validate_range<T: PartialOrd + fmt::Display>(
        field: &str,
        label: &str,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), ValidationError> {
        if let Some(min_val) = min
            && value < min_val
        {
            return Err(ValidationError::new(
                field,
                format!("{label} يجب أن يكون {min_val} على الأقل"),
            ));
        }

        if let Some(max_val) = max
            && value > max_val
        {
            return Err(ValidationError::new(
                field,
                format!("{label} يجب ألا يتجاوز {max_val}"),
            ));
        }

        Ok(())
    }

    /// # Errors
    /// Fails for negative amounts.
    pub fn validate_non_negative(field: &str, label: &str, value: Decimal) -> Result<(), ValidationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::new(field, format!("{label} يجب ألا يكون سالباً")));
        }
        Ok(())
    }

    /// 7 to 20 digits, optional leading `+`, spaces and dashes ignored.
    ///
    /// # Errors
    /// Fails for anything else.
    pub fn validate_phone(field: &str, value: &str) -> Result<(), ValidationError> {
        let compact: String = value.chars().filter(|c| *c != ' ' && *c != '-').collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);
        let valid = (7..=20).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
        if !valid {
            return Err(ValidationError::new(field, "رقم الهاتف غير صالح"));
        }
        Ok(())
    }

    /// # Errors
    /// Fails when the address has no `@`/`.` or exceeds 255 characters.
    pub fn validate_email(field: &str, value: &str) -> Result<(), ValidationError> {
        if !value.contains('@') || !value.contains('.') || value.len() > 255 {
            return Err(ValidationError::new(field, "البريد الإلكتروني غير صالح"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_validation_errors_collection() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.check(validate_required("name", "الاسم", ""));
        errors.check(validate_required("phone", "الهاتف", "0991234567"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].message, "الاسم مطلوب");
        assert!(errors.result().is_err());
    }

    #[test]
    fn test_validate_length_counts_characters() {
        // four Arabic letters are eight bytes
        assert!(validate_length("name", "الاسم", "خبزة", Some(4), Some(4)).is_ok());
        assert!(validate_length("name", "الاسم", "ab", Some(3), None).is_err());
        assert!(validate_length("name", "الاسم", "abcdef", None, Some(5)).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("year", "سنة الصنع", 1900, Some(1950), None).is_err());
        assert!(validate_range("year", "سنة الصنع", 2020, Some(1950), Some(2030)).is_ok());
        let err = validate_range("latitude", "خط العرض", 120.0, Some(-90.0), Some(90.0)).unwrap_err();
        assert_eq!(err.message, "خط العرض يجب ألا يتجاوز 90");
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("price_eur", "السعر", Decimal::new(-1, 2)).is_err());
        assert!(validate_non_negative("price_eur", "السعر", Decimal::ZERO).is_ok());
        assert!(validate_non_negative("price_eur", "السعر", Decimal::new(250, 2)).is_ok());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("phone", "+963 991-234-567").is_ok());
        assert!(validate_phone("phone", "0991234567").is_ok());
        assert!(validate_phone("phone", "12ab").is_err());
        assert!(validate_phone("phone", "123").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("email", "invalid").is_err());
        assert!(validate_email("email", "driver@bakery.sy").is_ok());
    }
}
