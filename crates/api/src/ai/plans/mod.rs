//! On-demand plans: a single workout session and a day of meals.
//!
//! Unlike the questionnaire analysis, these run per request with options
//! the user picks on the spot. The model's reply is read leniently, the
//! same way the per-domain processors read theirs.

pub mod diet;
pub mod workout;

use serde::Serialize;

use super::processors::fields::{Object, section, text};

pub use diet::{DietFocus, MealPlan, MealPlanRequest};
pub use workout::{WorkoutFocus, WorkoutPlan, WorkoutPlanRequest};

/// A plan option outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be between {min} and {max}, got {value}")]
pub struct PlanRequestError {
    pub field: &'static str,
    pub min: u32,
    pub max: u32,
    pub value: u32,
}

fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), PlanRequestError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PlanRequestError {
            field,
            min,
            max,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub title: String,
    pub message: String,
}

fn insight(raw: &Object, title: &str, message: &str) -> Insight {
    let obj = section(Some(raw), "insight");
    Insight {
        title: text(obj, "title", title),
        message: text(obj, "message", message),
    }
}

/// First whitespace-separated number in an answer such as `"70 kg"`.
fn leading_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.split_whitespace().next()?.parse().ok(),
        _ => None,
    }
}
