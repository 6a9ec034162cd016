//! Facial feature scoring and face exercise plans.

use serde::Serialize;

use super::fields::{Exercise, Object, exercises, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a facial aesthetics coach. Use the user's answers and face photos to score \
           facial features and build a short daily face exercise plan.",
    schema: r#"
{
  "attributes": {
    "symmetry": "Mostly|Slightly uneven|Uneven",
    "jawline": "Soft|Medium|Defined",
    "cheekbones": "Flat|Medium|High",
    "habits": "Poor|Medium|Good",
    "feature_goal": "string",
    "exercise_time": "string, e.g. 10-15 min"
  },
  "feature_scores": {
    "jawline": "percentage",
    "cheekbones": "percentage",
    "symmetry": "percentage",
    "overall": "percentage",
    "face_shape": "Oval|Round|Square|Heart|Diamond|Oblong"
  },
  "daily_exercises": [{"name": "string", "duration": "5 min", "steps": ["string"]}],
  "progress_tracking": {
    "consistency": "percentage",
    "feature_improvement": {"jawline": "percentage", "cheekbones": "percentage", "symmetry": "percentage"},
    "checklist": ["string"]
  },
  "motivational_message": "string"
}"#,
    required: &[
        "attributes",
        "feature_scores",
        "daily_exercises",
        "progress_tracking",
    ],
    with_images: true,
};

const MAX_EXERCISES: usize = 5;
const MAX_CHECKLIST: usize = 5;
const DEFAULT_SCORE: &str = "75%";
const DEFAULT_MESSAGE: &str = "Keep practicing daily for best results!";

#[derive(Debug, Serialize)]
struct Attributes {
    symmetry: String,
    jawline: String,
    cheekbones: String,
    habits: String,
    feature_goal: String,
    exercise_time: String,
}

#[derive(Debug, Serialize)]
struct FeatureScores {
    jawline: String,
    cheekbones: String,
    symmetry: String,
    overall: String,
    face_shape: String,
}

#[derive(Debug, Serialize)]
struct FeatureImprovement {
    jawline: String,
    cheekbones: String,
    symmetry: String,
}

#[derive(Debug, Serialize)]
struct Progress {
    consistency: String,
    feature_improvement: FeatureImprovement,
    checklist: Vec<String>,
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let scores = section(root, "feature_scores");
    let progress = section(root, "progress_tracking");
    let improvement = section(progress, "feature_improvement");

    let attributes = Attributes {
        symmetry: text(attributes, "symmetry", "Mostly"),
        jawline: text(attributes, "jawline", "Medium"),
        cheekbones: text(attributes, "cheekbones", "Medium"),
        habits: text(attributes, "habits", "Medium"),
        feature_goal: text(attributes, "feature_goal", "Overall improvement"),
        exercise_time: text(attributes, "exercise_time", "10-15 min"),
    };
    let scores = FeatureScores {
        jawline: text(scores, "jawline", DEFAULT_SCORE),
        cheekbones: text(scores, "cheekbones", DEFAULT_SCORE),
        symmetry: text(scores, "symmetry", DEFAULT_SCORE),
        overall: text(scores, "overall", DEFAULT_SCORE),
        face_shape: text(scores, "face_shape", "Oval"),
    };
    let daily: Vec<Exercise> = exercises(root, "daily_exercises", MAX_EXERCISES);
    let progress = Progress {
        consistency: text(progress, "consistency", "0%"),
        feature_improvement: FeatureImprovement {
            jawline: text(improvement, "jawline", DEFAULT_SCORE),
            cheekbones: text(improvement, "cheekbones", DEFAULT_SCORE),
            symmetry: text(improvement, "symmetry", DEFAULT_SCORE),
        },
        checklist: string_list(progress, "checklist", MAX_CHECKLIST),
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_features: to_field(&scores),
        ai_exercises: to_field(&daily),
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
    fn test_exercises_and_scores() {
        let raw = json!({
            "feature_scores": {"jawline": "68%"},
            "daily_exercises": [
                {"name": "Chin lifts", "steps": ["Tilt head back", "Push lower jaw forward"]},
                "skip me"
            ]
        });
        let output = reshape(raw.as_object().unwrap());

        let features = output.ai_features.unwrap();
        assert_eq!(features["jawline"], "68%");
        assert_eq!(features["overall"], DEFAULT_SCORE);

        let exercises = output.ai_exercises.unwrap();
        assert_eq!(
            exercises,
            json!([{
                "name": "Chin lifts",
                "duration": "5 min",
                "steps": ["Tilt head back", "Push lower jaw forward"]
            }])
        );
    }

    #[test]
    fn test_progress_defaults() {
        let output = reshape(&Object::new());
        let progress = output.ai_progress.unwrap();
        assert_eq!(progress["feature_improvement"]["symmetry"], DEFAULT_SCORE);
        assert_eq!(progress["consistency"], "0%");
    }
}
