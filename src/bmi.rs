//! `convkit bmi`: body-mass index with an optional curve over height.

use anyhow::{bail, Result};
use serde::Serialize;

use convkit_core::bmi::{bmi, bmi_curve, BmiClass};

/// Height range of the printed curve, in meters.
const CURVE_MIN_HEIGHT_M: f64 = 1.40;
const CURVE_MAX_HEIGHT_M: f64 = 2.10;
const CURVE_STEPS: usize = 15;

#[derive(Debug, Clone, Serialize)]
pub struct BmiReport {
    pub weight_kg: f64,
    pub height_m: f64,
    pub bmi: f64,
    pub class: BmiClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<Vec<CurvePoint>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurvePoint {
    pub height_m: f64,
    pub bmi: f64,
}

/// Resolve the height argument pair into meters.
pub fn height_in_meters(height_m: Option<f64>, height_cm: Option<f64>) -> Result<f64> {
    match (height_m, height_cm) {
        (Some(m), None) => Ok(m),
        (None, Some(cm)) => Ok(cm / 100.0),
        (Some(_), Some(_)) => bail!("pass either --height-m or --height-cm, not both"),
        (None, None) => bail!("a height is required (--height-m or --height-cm)"),
    }
}

pub fn report(weight_kg: f64, height_m: f64, with_curve: bool) -> Result<BmiReport> {
    let value = bmi(weight_kg, height_m)?;
    let curve = if with_curve {
        let points = bmi_curve(weight_kg, CURVE_MIN_HEIGHT_M, CURVE_MAX_HEIGHT_M, CURVE_STEPS)?
            .into_iter()
            .map(|(height_m, bmi)| CurvePoint { height_m, bmi })
            .collect();
        Some(points)
    } else {
        None
    };

    Ok(BmiReport {
        weight_kg,
        height_m,
        bmi: value,
        class: BmiClass::from_bmi(value),
        curve,
    })
}

/// CLI entry point for `convkit bmi`.
pub fn run_bmi(
    weight_kg: f64,
    height_m: Option<f64>,
    height_cm: Option<f64>,
    curve: bool,
    json: bool,
) -> Result<()> {
    let height = height_in_meters(height_m, height_cm)?;
    let report = report(weight_kg, height, curve)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("BMI: {:.1} ({})", report.bmi, report.class.label());
    if let Some(points) = &report.curve {
        println!();
        println!("  height (m)   BMI at {:.1} kg", report.weight_kg);
        for p in points {
            println!("  {:>10.2}   {:>6.1}  {}", p.height_m, p.bmi, bar(p.bmi));
        }
    }
    Ok(())
}

/// Text bar, one `#` per BMI point.
fn bar(bmi: f64) -> String {
    "#".repeat(bmi.round().clamp(0.0, 80.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_units() {
        assert_eq!(height_in_meters(Some(1.8), None).unwrap(), 1.8);
        assert_eq!(height_in_meters(None, Some(180.0)).unwrap(), 1.8);
        assert!(height_in_meters(None, None).is_err());
        assert!(height_in_meters(Some(1.8), Some(180.0)).is_err());
    }

    #[test]
    fn test_report_with_curve() {
        let r = report(70.0, 1.75, true).unwrap();
        assert_eq!(r.class, BmiClass::Normal);
        let curve = r.curve.unwrap();
        assert_eq!(curve.len(), CURVE_STEPS);
        assert_eq!(curve[0].height_m, CURVE_MIN_HEIGHT_M);
        assert_eq!(curve[CURVE_STEPS - 1].height_m, CURVE_MAX_HEIGHT_M);
    }

    #[test]
    fn test_report_rejects_bad_weight() {
        assert!(report(-5.0, 1.75, false).is_err());
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(3.4), "###");
        assert_eq!(bar(-1.0), "");
    }
}
