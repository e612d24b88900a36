//! Validated field newtypes

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

const MAX_NAME_LEN: usize = 100;
const MAX_CODE_LEN: usize = 32;

/// Italian fiscal code shape: 6 letters, 2 digits, letter, 2 digits,
/// letter, 3 digits, letter (checksum digit is not verified here).
static TAX_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{6}[0-9]{2}[A-Z][0-9]{2}[A-Z][0-9]{3}[A-Z]$").expect("invalid tax code regex")
});

/// A person's first or last name: non-empty, trimmed, bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_NAME_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Inventory/fleet code: non-empty, bounded, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCode(String);

impl ItemCode {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "code" });
        }
        if trimmed.len() > MAX_CODE_LEN {
            return Err(ValidationError::TooLong {
                field: "code",
                max: MAX_CODE_LEN,
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace()) {
            return Err(ValidationError::InvalidFormat {
                field: "code",
                reason: "must not contain whitespace",
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated Italian fiscal code (uppercased on input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxCode(String);

impl TaxCode {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let upper = s.trim().to_uppercase();
        if upper.is_empty() {
            return Err(ValidationError::Empty { field: "tax code" });
        }
        if !TAX_CODE_RE.is_match(&upper) {
            return Err(ValidationError::InvalidFormat {
                field: "tax code",
                reason: "must match the 16-character fiscal code format",
            });
        }
        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_name_trims_and_bounds() {
        let name = PersonName::new("first name", "  Anna ").unwrap();
        assert_eq!(name.as_str(), "Anna");

        assert!(matches!(
            PersonName::new("first name", "   "),
            Err(ValidationError::Empty { .. })
        ));
        assert!(matches!(
            PersonName::new("first name", &"x".repeat(101)),
            Err(ValidationError::TooLong { max: 100, .. })
        ));
    }

    #[test]
    fn item_code_rejects_whitespace() {
        assert!(ItemCode::new("DPI-001").is_ok());
        assert!(matches!(
            ItemCode::new("DPI 001"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn tax_code_accepts_canonical_form() {
        let code = TaxCode::new("rssmra85t10a562s").unwrap();
        assert_eq!(code.as_str(), "RSSMRA85T10A562S");
    }

    #[test]
    fn tax_code_rejects_wrong_shape() {
        assert!(TaxCode::new("RSSMRA85T10").is_err());
        assert!(TaxCode::new("1234567890123456").is_err());
    }
}
