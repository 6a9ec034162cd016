//! Posture and height plan generation.

use serde::Serialize;

use super::fields::{Object, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a posture and mobility coach. Use the user's answers and posture photos to \
           estimate growth potential and build a daily stretching and posture plan. Be honest \
           that adult height gains come from posture.",
    schema: r#"
{
  "attributes": {
    "current_height": "string, e.g. 170 cm",
    "goal_height": "string, e.g. 175 cm",
    "growth_potential": "Low|Moderate|High",
    "posture_status": "Poor|Average|Good",
    "bmi_status": "Underweight|Normal|Overweight"
  },
  "routine": {
    "morning": ["string"],
    "evening": ["string"]
  },
  "progress_tracking": {
    "completion_percent": "percentage",
    "posture_gain_cm": "string, e.g. 0.5 cm",
    "consistency": "percentage"
  },
  "motivational_message": "string"
}"#,
    required: &["attributes", "routine", "progress_tracking"],
    with_images: true,
};

const MAX_EXERCISES: usize = 5;
const DEFAULT_MESSAGE: &str = "Good posture can improve your height appearance!";

#[derive(Debug, Serialize)]
struct Attributes {
    current_height: String,
    goal_height: String,
    growth_potential: String,
    posture_status: String,
    bmi_status: String,
}

#[derive(Debug, Serialize)]
struct Routine {
    morning: Vec<String>,
    evening: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Progress {
    completion_percent: String,
    posture_gain_cm: String,
    consistency: String,
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let routine = section(root, "routine");
    let progress = section(root, "progress_tracking");

    let attributes = Attributes {
        current_height: text(attributes, "current_height", "170 cm"),
        goal_height: text(attributes, "goal_height", "175 cm"),
        growth_potential: text(attributes, "growth_potential", "Moderate"),
        posture_status: text(attributes, "posture_status", "Average"),
        bmi_status: text(attributes, "bmi_status", "Normal"),
    };
    let routine = Routine {
        morning: string_list(routine, "morning", MAX_EXERCISES),
        evening: string_list(routine, "evening", MAX_EXERCISES),
    };
    let progress = Progress {
        completion_percent: text(progress, "completion_percent", "0%"),
        posture_gain_cm: text(progress, "posture_gain_cm", "0 cm"),
        consistency: text(progress, "consistency", "0%"),
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_routine: to_field(&routine),
        ai_progress: to_field(&progress),
        ai_message: to_field(&text(root, "motivational_message", DEFAULT_MESSAGE)),
        ..AiOutput::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_numeric_heights_become_strings() {
        let raw = json!({"attributes": {"current_height": 168, "posture_status": "Good"}});
        let output = reshape(raw.as_object().unwrap());
        let attributes = output.ai_attributes.unwrap();
        assert_eq!(attributes["current_height"], "168");
        assert_eq!(attributes["goal_height"], "175 cm");
        assert_eq!(attributes["posture_status"], "Good");
    }
}
