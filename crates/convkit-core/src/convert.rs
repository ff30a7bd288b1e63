//! Unit conversion engine.
//!
//! Linear categories convert with `value * from.factor / to.factor`;
//! Temperature goes through its affine transforms via Celsius. Converting a
//! unit to itself returns the input unchanged.

use thiserror::Error;

use crate::units::{find_unit, Category, Unit};

/// Errors raised by the conversion engine.
///
/// `UnknownCategory`, `UnknownUnit` and `CategoryMismatch` are lookup
/// failures; `InvalidValue`, `NotANumber` and `Overflow` are value failures.
/// Both kinds are meant to be shown to the user, not treated as fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("unknown category '{0}' (expected one of: Length, Mass, Temperature, Time)")]
    UnknownCategory(String),

    #[error("unknown unit '{unit}' in category {category}")]
    UnknownUnit { unit: String, category: Category },

    #[error("cannot convert {from} ({from_category}) to {to} ({to_category})")]
    CategoryMismatch {
        from: &'static str,
        from_category: Category,
        to: &'static str,
        to_category: Category,
    },

    #[error("value must be a finite number, got {0}")]
    InvalidValue(f64),

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{value} {from} is out of range when converted to {to}")]
    Overflow {
        value: f64,
        from: &'static str,
        to: &'static str,
    },
}

impl ConvertError {
    /// True for unknown category/unit errors.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ConvertError::UnknownCategory(_)
                | ConvertError::UnknownUnit { .. }
                | ConvertError::CategoryMismatch { .. }
        )
    }
}

/// Parse user-supplied text into a finite magnitude.
pub fn parse_value(text: &str) -> Result<f64, ConvertError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ConvertError::NotANumber(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(ConvertError::InvalidValue(value));
    }
    Ok(value)
}

/// Convert `value` between two units named within `category`.
///
/// # Errors
///
/// Lookup errors for an unknown category or unit, and
/// [`ConvertError::InvalidValue`] for `NaN` or infinite input.
///
/// # Example
///
/// ```rust
/// use convkit_core::convert::convert;
///
/// assert_eq!(convert(1000.0, "Meter", "Kilometer", "Length").unwrap(), 1.0);
/// assert_eq!(convert(0.0, "Celsius", "Fahrenheit", "Temperature").unwrap(), 32.0);
/// assert!(convert(1.0, "Smoot", "Meter", "Length").unwrap_err().is_lookup());
/// ```
pub fn convert(value: f64, from: &str, to: &str, category: &str) -> Result<f64, ConvertError> {
    let category =
        Category::parse(category).ok_or_else(|| ConvertError::UnknownCategory(category.to_string()))?;
    let from_unit = lookup(category, from)?;
    let to_unit = lookup(category, to)?;
    convert_between(value, from_unit, to_unit)
}

/// Convert between two already-resolved units of the same category.
pub fn convert_between(value: f64, from: &Unit, to: &Unit) -> Result<f64, ConvertError> {
    if !value.is_finite() {
        return Err(ConvertError::InvalidValue(value));
    }
    if from.category != to.category {
        return Err(ConvertError::CategoryMismatch {
            from: from.name,
            from_category: from.category,
            to: to.name,
            to_category: to.category,
        });
    }
    if from == to {
        return Ok(value);
    }

    let result = to.from_base(from.to_base(value));
    if !result.is_finite() {
        return Err(ConvertError::Overflow {
            value,
            from: from.name,
            to: to.name,
        });
    }
    Ok(result)
}

fn lookup(category: Category, key: &str) -> Result<&'static Unit, ConvertError> {
    find_unit(category, key).ok_or_else(|| ConvertError::UnknownUnit {
        unit: key.trim().to_string(),
        category,
    })
}

/// Format a converted value the way results are displayed to users.
pub fn format_result(value: f64) -> String {
    format!("{:.4}", value)
}
