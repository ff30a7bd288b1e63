//! Body-mass index formula, classification and the series behind the BMI curve.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BmiError {
    #[error("weight must be a positive number of kilograms, got {0}")]
    InvalidWeight(f64),

    #[error("height must be a positive number of meters, got {0}")]
    InvalidHeight(f64),

    #[error("curve needs min height < max height and at least 2 steps")]
    InvalidRange,
}

/// WHO adult weight classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiClass {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiClass {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiClass::Underweight
        } else if bmi < 25.0 {
            BmiClass::Normal
        } else if bmi < 30.0 {
            BmiClass::Overweight
        } else {
            BmiClass::Obese
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BmiClass::Underweight => "Underweight",
            BmiClass::Normal => "Normal weight",
            BmiClass::Overweight => "Overweight",
            BmiClass::Obese => "Obese",
        }
    }
}

/// `weight_kg / height_m²`.
pub fn bmi(weight_kg: f64, height_m: f64) -> Result<f64, BmiError> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(BmiError::InvalidWeight(weight_kg));
    }
    if !height_m.is_finite() || height_m <= 0.0 {
        return Err(BmiError::InvalidHeight(height_m));
    }
    Ok(weight_kg / (height_m * height_m))
}

/// BMI for a fixed weight across evenly spaced heights, both ends included.
///
/// Returns `(height_m, bmi)` pairs in ascending height order.
pub fn bmi_curve(
    weight_kg: f64,
    min_height_m: f64,
    max_height_m: f64,
    steps: usize,
) -> Result<Vec<(f64, f64)>, BmiError> {
    if steps < 2 || !(min_height_m < max_height_m) {
        return Err(BmiError::InvalidRange);
    }
    let step = (max_height_m - min_height_m) / (steps - 1) as f64;
    (0..steps)
        .map(|i| {
            // Pin the last point so float drift never overshoots the range.
            let h = if i == steps - 1 {
                max_height_m
            } else {
                min_height_m + step * i as f64
            };
            bmi(weight_kg, h).map(|b| (h, b))
        })
        .collect()
}
