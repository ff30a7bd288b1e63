//! `convkit convert` and `convkit units`.
//!
//! Thin presentation layer over `convkit_core::convert`: resolves the
//! category (given, or inferred from the source unit), runs the conversion
//! and prints the result with four decimals.

use anyhow::{bail, Result};
use serde::Serialize;

use convkit_core::convert::{convert, format_result, parse_value};
use convkit_core::units::{categories_for_unit, Category};

/// A completed conversion, as printed by `--json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub category: Category,
    pub value: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
}

/// Resolve the category and convert.
///
/// Without an explicit category, the source unit must belong to exactly one.
pub fn convert_text(
    value: &str,
    from: &str,
    to: &str,
    category: Option<&str>,
) -> Result<Conversion> {
    let value = parse_value(value)?;

    let category = match category {
        Some(name) => Category::parse(name)
            .ok_or_else(|| convkit_core::convert::ConvertError::UnknownCategory(name.to_string()))?,
        None => infer_category(from)?,
    };

    let result = convert(value, from, to, category.name())?;
    let from_name = canonical_name(category, from);
    let to_name = canonical_name(category, to);

    tracing::debug!(%category, value, from = %from_name, to = %to_name, result, "converted");
    Ok(Conversion {
        category,
        value,
        from: from_name,
        to: to_name,
        result,
    })
}

fn infer_category(unit: &str) -> Result<Category> {
    match categories_for_unit(unit).as_slice() {
        [one] => Ok(*one),
        [] => bail!("unknown unit '{}' (not found in any category)", unit.trim()),
        many => bail!(
            "unit '{}' is ambiguous between {}; pass --category",
            unit.trim(),
            many.iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn canonical_name(category: Category, key: &str) -> String {
    convkit_core::units::find_unit(category, key)
        .map(|u| u.name.to_string())
        .unwrap_or_else(|| key.trim().to_string())
}

/// CLI entry point for `convkit convert`.
pub fn run_convert(
    value: &str,
    from: &str,
    to: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let conversion = convert_text(value, from, to, category)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversion)?);
    } else {
        println!(
            "{} {} = {} {}",
            conversion.value,
            conversion.from,
            format_result(conversion.result),
            conversion.to
        );
    }
    Ok(())
}

/// CLI entry point for `convkit units`.
pub fn run_units(category: Option<&str>, json: bool) -> Result<()> {
    let categories: Vec<Category> = match category {
        Some(name) => vec![Category::parse(name)
            .ok_or_else(|| convkit_core::convert::ConvertError::UnknownCategory(name.to_string()))?],
        None => Category::all().to_vec(),
    };

    if json {
        let listing: Vec<serde_json::Value> = categories
            .iter()
            .map(|c| {
                serde_json::json!({
                    "category": c.name(),
                    "base_unit": c.base_unit().name,
                    "units": c.units().iter().map(|u| serde_json::json!({
                        "name": u.name,
                        "symbol": u.symbol,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for c in categories {
        println!("{} (base: {})", c.name(), c.base_unit().name);
        for u in c.units() {
            println!("    {:<12} {}", u.name, u.symbol);
        }
    }
    Ok(())
}
