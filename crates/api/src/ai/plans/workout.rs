//! A single workout session built around a chosen focus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use looks_lab_core::Domain;

use crate::ai::processors::fields::{Object, number, objects, text};
use crate::ai::{GeminiClient, GeminiError};
use crate::models::onboarding::AnsweredQuestion;

use super::{Insight, PlanRequestError, check_range, insight};

const EXERCISE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutFocus {
    Flexibility,
    BuildMuscle,
    Fatloss,
    Strength,
}

impl WorkoutFocus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flexibility => "flexibility",
            Self::BuildMuscle => "build_muscle",
            Self::Fatloss => "fatloss",
            Self::Strength => "strength",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Flexibility => "Flexibility",
            Self::BuildMuscle => "Build Muscle",
            Self::Fatloss => "Fatloss",
            Self::Strength => "Strength",
        }
    }
}

fn default_level() -> String {
    "moderate".to_string()
}

const fn default_duration() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutPlanRequest {
    pub focus: WorkoutFocus,
    #[serde(default = "default_level")]
    pub intensity: String,
    #[serde(default = "default_level")]
    pub activity_level: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
}

impl WorkoutPlanRequest {
    /// # Errors
    ///
    /// Returns the out-of-range option.
    pub fn validate(&self) -> Result<(), PlanRequestError> {
        check_range("duration_minutes", self.duration_minutes, 10, 120)
    }
}

/// What the coach knows about the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutProfile {
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub fitness_level: String,
    pub workout_frequency: String,
    pub equipment: String,
    pub goals: String,
}

impl WorkoutProfile {
    /// Fill the profile from onboarding answers by keywords in the question
    /// text. Later answers win.
    #[must_use]
    pub fn from_answers(
        age: Option<i32>,
        gender: Option<String>,
        answers: &[AnsweredQuestion],
    ) -> Self {
        let mut profile = Self {
            age,
            gender,
            fitness_level: "beginner".to_string(),
            workout_frequency: "3 times per week".to_string(),
            equipment: "None".to_string(),
            goals: "General fitness".to_string(),
        };

        for answer in answers {
            let question = answer.question.to_lowercase();
            let slot = if question.contains("fitness level") || question.contains("experience") {
                &mut profile.fitness_level
            } else if question.contains("workout") && question.contains("frequency") {
                &mut profile.workout_frequency
            } else if question.contains("equipment") {
                &mut profile.equipment
            } else if question.contains("goal") {
                &mut profile.goals
            } else {
                continue;
            };
            *slot = match &answer.answer {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }

        profile
    }
}

fn or_unspecified<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "Not specified".to_string(), ToString::to_string)
}

#[must_use]
pub fn build_prompt(request: &WorkoutPlanRequest, profile: &WorkoutProfile) -> String {
    let focus = request.focus;
    let intensity = &request.intensity;
    let duration = request.duration_minutes;
    format!(
        r#"You are a professional fitness coach creating a personalised workout plan.

USER PROFILE:
- Age: {age}
- Gender: {gender}
- Fitness Level: {level}
- Workout Frequency: {frequency}
- Equipment Available: {equipment}
- Goals: {goals}
- Daily Activity: {activity}

WORKOUT REQUIREMENTS:
- Focus Area: {title}
- Intensity: {intensity}
- Target Duration: {duration} minutes
- Exercise Count: {EXERCISE_COUNT} exercises

Return STRICT JSON ONLY, with no markdown and no commentary, matching this schema:
{{
  "focus": "{focus}",
  "title": "short catchy title",
  "description": "one-line motivational description",
  "duration_minutes": {duration},
  "exercise_count": {EXERCISE_COUNT},
  "intensity": "{intensity}",
  "insight": {{"title": "string", "message": "string"}},
  "exercises": [
    {{
      "name": "string",
      "duration_seconds": "integer, or null if rep-based",
      "sets": "integer, or null if time-based",
      "reps": "integer, or null if time-based",
      "rest_seconds": 30,
      "instructions": "one or two sentences",
      "benefits": "string",
      "difficulty": "beginner|intermediate|advanced"
    }}
  ]
}}

Start with a warm-up, progress from easier to harder, finish with a cool-down,
and mix time-based with rep-based exercises that suit the focus area.
"#,
        age = or_unspecified(profile.age.as_ref()),
        gender = or_unspecified(profile.gender.as_ref()),
        level = profile.fitness_level,
        frequency = profile.workout_frequency,
        equipment = profile.equipment,
        goals = profile.goals,
        activity = request.activity_level,
        title = focus.title(),
        focus = focus.as_str(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedExercise {
    pub name: String,
    pub duration_seconds: Option<u32>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub rest_seconds: u32,
    pub instructions: String,
    pub benefits: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutPlan {
    pub focus: WorkoutFocus,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub exercise_count: usize,
    pub intensity: String,
    pub insight: Insight,
    pub exercises: Vec<PlannedExercise>,
    pub generated_at: DateTime<Utc>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(obj: &Object, key: &str) -> Option<u32> {
    let value = number(Some(obj), key, -1.0);
    (value >= 0.0).then(|| value.round() as u32)
}

/// Read the model's reply. The requested options win over whatever the
/// model echoes back.
#[must_use]
pub fn reshape(
    raw: &Object,
    request: &WorkoutPlanRequest,
    generated_at: DateTime<Utc>,
) -> WorkoutPlan {
    let raw_opt = Some(raw);
    let exercises: Vec<PlannedExercise> = objects(raw_opt, "exercises", EXERCISE_COUNT)
        .into_iter()
        .map(|item| {
            let item_opt = Some(item);
            PlannedExercise {
                name: text(item_opt, "name", "Exercise"),
                duration_seconds: count(item, "duration_seconds"),
                sets: count(item, "sets"),
                reps: count(item, "reps"),
                rest_seconds: count(item, "rest_seconds").unwrap_or(30),
                instructions: text(item_opt, "instructions", ""),
                benefits: text(item_opt, "benefits", ""),
                difficulty: text(item_opt, "difficulty", "beginner"),
            }
        })
        .collect();

    WorkoutPlan {
        focus: request.focus,
        title: text(raw_opt, "title", &format!("{} Focus Workout", request.focus.title())),
        description: text(raw_opt, "description", "Move a little better every day."),
        duration_minutes: request.duration_minutes,
        exercise_count: exercises.len(),
        intensity: request.intensity.clone(),
        insight: insight(
            raw,
            "Consistency Insight",
            "Short sessions done often beat long ones done rarely.",
        ),
        exercises,
        generated_at,
    }
}

/// Generate a workout plan for `request`.
///
/// # Errors
///
/// Returns the client's error if the model call fails or the reply isn't
/// a JSON object.
pub async fn generate(
    client: &GeminiClient,
    request: &WorkoutPlanRequest,
    profile: &WorkoutProfile,
) -> Result<WorkoutPlan, GeminiError> {
    let prompt = build_prompt(request, profile);
    let raw = client.generate_json(&prompt, Domain::Workout).await?;
    let plan = reshape(&raw, request, Utc::now());
    tracing::info!(
        focus = request.focus.as_str(),
        exercises = plan.exercise_count,
        "Generated workout plan"
    );
    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use looks_lab_core::{OnboardingStep, QuestionId};

    use super::*;

    fn answer(question: &str, value: Value) -> AnsweredQuestion {
        AnsweredQuestion {
            question_id: QuestionId::new(1),
            question: question.to_string(),
            step: OnboardingStep::DailyLifestyle,
            answer: value,
            answered_at: None,
        }
    }

    fn request(json: Value) -> WorkoutPlanRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_defaults_and_range() {
        let req = request(json!({"focus": "build_muscle"}));
        assert_eq!(req.focus, WorkoutFocus::BuildMuscle);
        assert_eq!(req.intensity, "moderate");
        assert_eq!(req.duration_minutes, 30);
        assert!(req.validate().is_ok());

        let req = request(json!({"focus": "strength", "duration_minutes": 5}));
        assert_eq!(req.validate().unwrap_err().field, "duration_minutes");
        assert!(serde_json::from_value::<WorkoutPlanRequest>(json!({"focus": "yoga"})).is_err());
    }

    #[test]
    fn test_profile_reads_keywords() {
        let answers = vec![
            answer("What is your fitness level?", json!("Intermediate")),
            answer("Workout frequency per week?", json!("5 times")),
            answer("What equipment do you have?", json!("Dumbbells")),
            answer("How many hours do you sleep?", json!(7)),
        ];
        let profile = WorkoutProfile::from_answers(Some(28), None, &answers);
        assert_eq!(profile.fitness_level, "Intermediate");
        assert_eq!(profile.workout_frequency, "5 times");
        assert_eq!(profile.equipment, "Dumbbells");
        assert_eq!(profile.goals, "General fitness");
        assert_eq!(profile.age, Some(28));
    }

    #[test]
    fn test_prompt_names_focus_and_profile() {
        let req = request(json!({"focus": "build_muscle", "intensity": "high"}));
        let profile = WorkoutProfile::from_answers(None, Some("female".to_string()), &[]);
        let prompt = build_prompt(&req, &profile);
        assert!(prompt.contains("Focus Area: Build Muscle"));
        assert!(prompt.contains("\"focus\": \"build_muscle\""));
        assert!(prompt.contains("Age: Not specified"));
        assert!(prompt.contains("Gender: female"));
        assert!(prompt.contains("Return STRICT JSON ONLY"));
    }

    #[test]
    fn test_reshape_keeps_request_and_caps_exercises() {
        let req = request(json!({"focus": "fatloss", "duration_minutes": 45}));
        let exercise = json!({
            "name": "Burpees",
            "sets": 3,
            "reps": "12",
            "duration_seconds": null,
        });
        let raw = json!({
            "focus": "strength",
            "duration_minutes": 10,
            "exercises": vec![exercise; 8],
        });
        let plan = reshape(raw.as_object().unwrap(), &req, Utc::now());

        assert_eq!(plan.focus, WorkoutFocus::Fatloss);
        assert_eq!(plan.duration_minutes, 45);
        assert_eq!(plan.exercise_count, EXERCISE_COUNT);
        assert_eq!(plan.exercises[0].reps, Some(12));
        assert_eq!(plan.exercises[0].duration_seconds, None);
        assert_eq!(plan.exercises[0].rest_seconds, 30);
        assert_eq!(plan.title, "Fatloss Focus Workout");
        assert_eq!(plan.insight.title, "Consistency Insight");
    }
}
