//! Unit categories and their compiled-in unit tables.
//!
//! Every category routes conversions through a single base unit:
//!
//! | Category | Base unit |
//! |----------|-----------|
//! | Length | Meter |
//! | Mass | Kilogram |
//! | Temperature | Celsius |
//! | Time | Second |
//!
//! Linear units carry a scalar factor ("how many base units make one of
//! this unit"). Temperature units are affine and carry an explicit pair of
//! transforms instead.

use serde::Serialize;
use std::fmt;

/// A measurement category. The set is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Length,
    Mass,
    Temperature,
    Time,
}

impl Category {
    /// All categories in display order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Length,
            Category::Mass,
            Category::Temperature,
            Category::Time,
        ]
    }

    /// Parse a category name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Category::all()
            .iter()
            .copied()
            .find(|c| c.name().to_lowercase() == lower)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Length => "Length",
            Category::Mass => "Mass",
            Category::Temperature => "Temperature",
            Category::Time => "Time",
        }
    }

    /// The unit table for this category. The base unit is always first.
    pub fn units(&self) -> &'static [Unit] {
        match self {
            Category::Length => LENGTH_UNITS,
            Category::Mass => MASS_UNITS,
            Category::Temperature => TEMPERATURE_UNITS,
            Category::Time => TIME_UNITS,
        }
    }

    pub fn base_unit(&self) -> &'static Unit {
        &self.units()[0]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a unit relates to its category's base unit.
#[derive(Debug, Clone, Copy)]
pub enum Scale {
    /// `base = value * factor`.
    Linear(f64),
    /// Affine transform pair; `from_base(to_base(x)) == x`.
    Affine {
        to_base: fn(f64) -> f64,
        from_base: fn(f64) -> f64,
    },
}

/// A unit within one category.
#[derive(Debug, Clone, Copy)]
pub struct Unit {
    pub name: &'static str,
    pub symbol: &'static str,
    pub category: Category,
    pub scale: Scale,
}

impl Unit {
    /// Convert a value in this unit to the category's base unit.
    pub fn to_base(&self, value: f64) -> f64 {
        match self.scale {
            Scale::Linear(factor) => value * factor,
            Scale::Affine { to_base, .. } => to_base(value),
        }
    }

    /// Convert a value in the category's base unit to this unit.
    pub fn from_base(&self, value: f64) -> f64 {
        match self.scale {
            Scale::Linear(factor) => value / factor,
            Scale::Affine { from_base, .. } => from_base(value),
        }
    }

    /// Case-insensitive match against the unit's name or symbol.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.name.eq_ignore_ascii_case(key) || self.symbol.eq_ignore_ascii_case(key)
    }
}

// Scale holds fn pointers, so equality is by identity within the tables.
impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.name == other.name
    }
}

impl Eq for Unit {}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

/// Look up a unit by name or symbol within a category.
pub fn find_unit(category: Category, key: &str) -> Option<&'static Unit> {
    category.units().iter().find(|u| u.matches(key))
}

/// Find every category that has a unit matching `key`.
///
/// Symbols are unique across the built-in tables, so this yields at most one
/// category today; callers still treat more than one hit as ambiguous.
pub fn categories_for_unit(key: &str) -> Vec<Category> {
    Category::all()
        .iter()
        .copied()
        .filter(|c| find_unit(*c, key).is_some())
        .collect()
}

const fn linear(
    name: &'static str,
    symbol: &'static str,
    category: Category,
    factor: f64,
) -> Unit {
    Unit {
        name,
        symbol,
        category,
        scale: Scale::Linear(factor),
    }
}

const LENGTH_UNITS: &[Unit] = &[
    linear("Meter", "m", Category::Length, 1.0),
    linear("Kilometer", "km", Category::Length, 1000.0),
    linear("Centimeter", "cm", Category::Length, 0.01),
    linear("Millimeter", "mm", Category::Length, 0.001),
    linear("Mile", "mi", Category::Length, 1609.34),
    linear("Yard", "yd", Category::Length, 0.9144),
    linear("Foot", "ft", Category::Length, 0.3048),
    linear("Inch", "in", Category::Length, 0.0254),
];

const MASS_UNITS: &[Unit] = &[
    linear("Kilogram", "kg", Category::Mass, 1.0),
    linear("Gram", "g", Category::Mass, 0.001),
    linear("Milligram", "mg", Category::Mass, 0.000001),
    linear("Pound", "lb", Category::Mass, 0.453592),
    linear("Ounce", "oz", Category::Mass, 0.0283495),
];

const TIME_UNITS: &[Unit] = &[
    linear("Second", "s", Category::Time, 1.0),
    linear("Minute", "min", Category::Time, 60.0),
    linear("Hour", "h", Category::Time, 3600.0),
    linear("Day", "d", Category::Time, 86400.0),
];

fn identity(x: f64) -> f64 {
    x
}

fn fahrenheit_to_celsius(x: f64) -> f64 {
    (x - 32.0) * 5.0 / 9.0
}

fn celsius_to_fahrenheit(x: f64) -> f64 {
    x * 9.0 / 5.0 + 32.0
}

fn kelvin_to_celsius(x: f64) -> f64 {
    x - 273.15
}

fn celsius_to_kelvin(x: f64) -> f64 {
    x + 273.15
}

const TEMPERATURE_UNITS: &[Unit] = &[
    Unit {
        name: "Celsius",
        symbol: "C",
        category: Category::Temperature,
        scale: Scale::Affine {
            to_base: identity,
            from_base: identity,
        },
    },
    Unit {
        name: "Fahrenheit",
        symbol: "F",
        category: Category::Temperature,
        scale: Scale::Affine {
            to_base: fahrenheit_to_celsius,
            from_base: celsius_to_fahrenheit,
        },
    },
    Unit {
        name: "Kelvin",
        symbol: "K",
        category: Category::Temperature,
        scale: Scale::Affine {
            to_base: kelvin_to_celsius,
            from_base: celsius_to_kelvin,
        },
    },
];
