//! Training plan generation.

use serde::Serialize;
use serde_json::json;

use super::fields::{Object, objects, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a certified fitness coach. Use the user's answers to build a safe, \
           personalised home workout plan.",
    schema: r#"
{
  "attributes": {
    "activity_level": "Sedentary|Moderate|Active",
    "hydration": "string, e.g. 1-2L",
    "goal": "Fat Loss|Muscle Gain|General Fitness|Maintenance",
    "diet_type": "Balanced|High-Protein|Vegetarian",
    "focus_tags": ["Flexibility|Build Muscle|Fat Loss|Strength"]
  },
  "routine": {
    "morning": [{"name": "string", "duration": "5 min", "instructions": "string"}],
    "evening": [{"name": "string", "duration": "5 min", "instructions": "string"}]
  },
  "progress_tracking": {
    "weekly_calories": "string, e.g. 1800 kcal",
    "consistency": "percentage",
    "strength_gain": "percentage",
    "recovery_checklist": ["string"]
  },
  "motivational_message": "string"
}"#,
    required: &["attributes", "routine", "progress_tracking"],
    with_images: false,
};

const MAX_FOCUS_TAGS: usize = 4;
const MAX_EXERCISES: usize = 5;
const MAX_CHECKLIST: usize = 5;
const DEFAULT_MESSAGE: &str = "Consistency is key to achieving your fitness goals!";

#[derive(Debug, Serialize)]
struct Attributes {
    activity_level: String,
    hydration: String,
    goal: String,
    diet_type: String,
    focus_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WorkoutStep {
    name: String,
    duration: String,
    instructions: String,
}

#[derive(Debug, Serialize)]
struct Routine {
    morning: Vec<WorkoutStep>,
    evening: Vec<WorkoutStep>,
}

#[derive(Debug, Serialize)]
struct Progress {
    weekly_calories: String,
    consistency: String,
    strength_gain: String,
    recovery_checklist: Vec<String>,
}

fn workout_steps(obj: Option<&Object>, key: &str) -> Vec<WorkoutStep> {
    objects(obj, key, MAX_EXERCISES)
        .into_iter()
        .map(|item| WorkoutStep {
            name: text(Some(item), "name", "Exercise"),
            duration: text(Some(item), "duration", "5 min"),
            instructions: text(Some(item), "instructions", ""),
        })
        .collect()
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let routine = section(root, "routine");
    let progress = section(root, "progress_tracking");

    let attributes = Attributes {
        activity_level: text(attributes, "activity_level", "Moderate"),
        hydration: text(attributes, "hydration", "1-2L"),
        goal: text(attributes, "goal", "Maintenance"),
        diet_type: text(attributes, "diet_type", "Balanced"),
        focus_tags: string_list(attributes, "focus_tags", MAX_FOCUS_TAGS),
    };
    let routine = Routine {
        morning: workout_steps(routine, "morning"),
        evening: workout_steps(routine, "evening"),
    };
    let progress = Progress {
        weekly_calories: text(progress, "weekly_calories", "0 kcal"),
        consistency: text(progress, "consistency", "0%"),
        strength_gain: text(progress, "strength_gain", "0%"),
        recovery_checklist: string_list(progress, "recovery_checklist", MAX_CHECKLIST),
    };
    let summary = json!({
        "total_exercises": routine.morning.len() + routine.evening.len(),
        "morning": routine.morning.len(),
        "evening": routine.evening.len(),
    });

    AiOutput {
        ai_today_focus: to_field(&attributes.focus_tags),
        ai_attributes: to_field(&attributes),
        ai_routine: to_field(&routine),
        ai_progress: to_field(&progress),
        ai_workout_summary: Some(summary),
        ai_message: to_field(&text(root, "motivational_message", DEFAULT_MESSAGE)),
        ..AiOutput::default()
    }
}
