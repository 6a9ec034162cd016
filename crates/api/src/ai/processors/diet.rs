//! Nutrition plan generation.

use serde::Serialize;
use serde_json::{Value, json};

use super::fields::{Object, raw, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a registered dietitian. Use the user's answers and meal photos to build a \
           realistic daily nutrition plan.",
    schema: r#"
{
  "attributes": {
    "diet_type": "Balanced|High-Protein|Vegetarian|Vegan|Keto",
    "goal": "Fat Loss|Muscle Gain|Maintenance",
    "activity_level": "Sedentary|Moderate|Active",
    "hydration": "string, e.g. 1-2L"
  },
  "nutrition_summary": {
    "calories": 2000,
    "protein": "string, e.g. 100g",
    "carbs": "string, e.g. 200g",
    "portion_size": "string, e.g. 300g"
  },
  "daily_routine": {
    "morning": ["string"],
    "evening": ["string"]
  },
  "progress_tracking": {
    "calorie_balance": "string, e.g. 0 / 2000",
    "diet_consistency": "percentage",
    "recovery_checklist": ["string"]
  },
  "motivational_message": "string"
}"#,
    required: &[
        "attributes",
        "nutrition_summary",
        "daily_routine",
        "progress_tracking",
    ],
    with_images: true,
};

const MAX_MEALS: usize = 5;
const MAX_CHECKLIST: usize = 5;
const DEFAULT_MESSAGE: &str = "Small daily improvements lead to great results!";

#[derive(Debug, Serialize)]
struct Attributes {
    diet_type: String,
    goal: String,
    activity_level: String,
    hydration: String,
}

#[derive(Debug, Serialize)]
struct Nutrition {
    /// Usually a number, but passed through as the model wrote it.
    calories: Value,
    protein: String,
    carbs: String,
    portion_size: String,
}

#[derive(Debug, Serialize)]
struct Routine {
    morning: Vec<String>,
    evening: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Progress {
    calorie_balance: String,
    diet_consistency: String,
    recovery_checklist: Vec<String>,
}

pub(super) fn reshape(data: &Object) -> AiOutput {
    let root = Some(data);
    let attributes = section(root, "attributes");
    let nutrition = section(root, "nutrition_summary");
    let routine = section(root, "daily_routine");
    let progress = section(root, "progress_tracking");

    let attributes = Attributes {
        diet_type: text(attributes, "diet_type", "Balanced"),
        goal: text(attributes, "goal", "Maintenance"),
        activity_level: text(attributes, "activity_level", "Moderate"),
        hydration: text(attributes, "hydration", "1-2L"),
    };
    let nutrition = Nutrition {
        calories: raw(nutrition, "calories", json!(2000)),
        protein: text(nutrition, "protein", "100g"),
        carbs: text(nutrition, "carbs", "200g"),
        portion_size: text(nutrition, "portion_size", "300g"),
    };
    let routine = Routine {
        morning: string_list(routine, "morning", MAX_MEALS),
        evening: string_list(routine, "evening", MAX_MEALS),
    };
    let progress = Progress {
        calorie_balance: text(progress, "calorie_balance", "0 / 2000"),
        diet_consistency: text(progress, "diet_consistency", "0%"),
        recovery_checklist: string_list(progress, "recovery_checklist", MAX_CHECKLIST),
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_nutrition: to_field(&nutrition),
        ai_routine: to_field(&routine),
        ai_progress: to_field(&progress),
        ai_message: to_field(&text(root, "motivational_message", DEFAULT_MESSAGE)),
        ..AiOutput::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_defaults_and_passthrough() {
        let output = reshape(&Object::new());
        let nutrition = output.ai_nutrition.unwrap();
        assert_eq!(nutrition["calories"], 2000);
        assert_eq!(nutrition["protein"], "100g");

        let data = json!({"nutrition_summary": {"calories": "1800-2000"}});
        let output = reshape(data.as_object().unwrap());
        assert_eq!(output.ai_nutrition.unwrap()["calories"], "1800-2000");
    }

    #[test]
    fn test_routine_lists_are_capped() {
        let data = json!({"daily_routine": {"morning": ["1", "2", "3", "4", "5", "6"]}});
        let output = reshape(data.as_object().unwrap());
        let routine = output.ai_routine.unwrap();
        assert_eq!(routine["morning"].as_array().unwrap().len(), MAX_MEALS);
        assert_eq!(routine["evening"], json!([]));
    }
}
