//! Recovery plan generation for compulsive porn use.

use serde::Serialize;

use super::fields::{Object, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a supportive behavioural-change coach. Use the user's answers to build a \
           non-judgemental recovery plan. Do not shame the user and do not give medical advice.",
    schema: r#"
{
  "attributes": {
    "frequency": "Rarely|Occasionally|Frequently|Daily",
    "triggers": ["string"],
    "urge_timing": ["string"],
    "coping_mechanisms": "string",
    "commitment_level": "string"
  },
  "recovery_path": {
    "current_streak": "string, e.g. 0 days",
    "next_goal": "string, e.g. 3 days",
    "longest_streak": "string",
    "daily_tasks": ["string"],
    "mental_exercises": ["string"],
    "physical_exercises": ["string"]
  },
  "progress_tracking": {
    "consistency": "percentage",
    "recovery_score": "percentage",
    "checklist": ["string"]
  },
  "motivational_message": "string"
}"#,
    required: &["attributes", "recovery_path", "progress_tracking"],
    with_images: false,
};

const MAX_ITEMS: usize = 5;
const DEFAULT_MESSAGE: &str = "One day at a time. You've got this!";

#[derive(Debug, Serialize)]
struct Attributes {
    frequency: String,
    triggers: Vec<String>,
    urge_timing: Vec<String>,
    coping_mechanisms: String,
    commitment_level: String,
}

#[derive(Debug, Serialize)]
struct RecoveryPath {
    current_streak: String,
    next_goal: String,
    longest_streak: String,
    daily_tasks: Vec<String>,
    mental_exercises: Vec<String>,
    physical_exercises: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Progress {
    consistency: String,
    recovery_score: String,
    checklist: Vec<String>,
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let recovery = section(root, "recovery_path");
    let progress = section(root, "progress_tracking");

    let attributes = Attributes {
        frequency: text(attributes, "frequency", "Occasionally"),
        triggers: string_list(attributes, "triggers", MAX_ITEMS),
        urge_timing: string_list(attributes, "urge_timing", MAX_ITEMS),
        coping_mechanisms: text(attributes, "coping_mechanisms", "Few activities"),
        commitment_level: text(attributes, "commitment_level", "Somewhat committed"),
    };
    let recovery = RecoveryPath {
        current_streak: text(recovery, "current_streak", "0 days"),
        next_goal: text(recovery, "next_goal", "3 days"),
        longest_streak: text(recovery, "longest_streak", "0 days"),
        daily_tasks: string_list(recovery, "daily_tasks", MAX_ITEMS),
        mental_exercises: string_list(recovery, "mental_exercises", MAX_ITEMS),
        physical_exercises: string_list(recovery, "physical_exercises", MAX_ITEMS),
    };
    let progress = Progress {
        consistency: text(progress, "consistency", "0%"),
        recovery_score: text(progress, "recovery_score", "0%"),
        checklist: string_list(progress, "checklist", MAX_ITEMS),
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_recovery: to_field(&recovery),
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
    fn test_recovery_defaults() {
        let output = reshape(&Object::new());
        let recovery = output.ai_recovery.unwrap();
        assert_eq!(recovery["next_goal"], "3 days");
        assert_eq!(recovery["daily_tasks"], json!([]));
        assert!(output.ai_routine.is_none());
    }

    #[test]
    fn test_triggers_are_capped() {
        let raw = json!({"attributes": {"triggers": ["a", "b", "c", "d", "e", "f"]}});
        let output = reshape(raw.as_object().unwrap());
        let attributes = output.ai_attributes.unwrap();
        assert_eq!(attributes["triggers"].as_array().unwrap().len(), MAX_ITEMS);
    }
}
