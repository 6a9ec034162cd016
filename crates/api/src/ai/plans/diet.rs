//! A day of meals sized to a calorie target.
//!
//! When the user gives no target it comes from the Mifflin-St Jeor
//! estimate of resting energy, scaled by activity and shifted by focus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use looks_lab_core::Domain;

use crate::ai::processors::fields::{Object, number, objects, section, string_list, text};
use crate::ai::{GeminiClient, GeminiError};
use crate::models::onboarding::AnsweredQuestion;

use super::{Insight, PlanRequestError, check_range, insight, leading_number};

const CM_PER_FOOT: f64 = 30.48;
const MAX_INGREDIENTS: usize = 12;
const MAX_INSTRUCTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietFocus {
    BuildMuscle,
    Maintenance,
    CleanEnergetic,
    Fatloss,
}

impl DietFocus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildMuscle => "build_muscle",
            Self::Maintenance => "maintenance",
            Self::CleanEnergetic => "clean_energetic",
            Self::Fatloss => "fatloss",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BuildMuscle => "Build Muscle",
            Self::Maintenance => "Maintenance",
            Self::CleanEnergetic => "Clean Energetic",
            Self::Fatloss => "Fatloss",
        }
    }

    /// Daily calories added to (or taken from) maintenance.
    const fn adjustment(self) -> f64 {
        match self {
            Self::BuildMuscle => 300.0,
            Self::Fatloss => -500.0,
            Self::Maintenance | Self::CleanEnergetic => 0.0,
        }
    }

    /// Protein, carb and fat shares of the day's calories, in percent.
    const fn macro_split(self) -> (u32, u32, u32) {
        match self {
            Self::BuildMuscle => (30, 45, 25),
            Self::Fatloss => (35, 35, 30),
            Self::CleanEnergetic => (25, 50, 25),
            Self::Maintenance => (30, 40, 30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    const fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
            Self::VeryActive => "very_active",
        }
    }

    /// Read an answer such as "Moderately active (3-4 days)".
    fn from_answer(answer: &str) -> Option<Self> {
        let answer = answer.to_lowercase();
        [
            ("sedentary", Self::Sedentary),
            ("lightly active", Self::Light),
            ("moderately active", Self::Moderate),
            ("very active", Self::Active),
            ("extremely active", Self::VeryActive),
        ]
        .into_iter()
        .find_map(|(phrase, level)| answer.contains(phrase).then_some(level))
    }
}

const fn default_meal_count() -> u32 {
    3
}

const fn default_snack_count() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealPlanRequest {
    pub focus: DietFocus,
    #[serde(default)]
    pub calorie_target: Option<u32>,
    #[serde(default = "default_meal_count")]
    pub meal_count: u32,
    #[serde(default = "default_snack_count")]
    pub snack_count: u32,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub cuisine_preference: Option<String>,
}

impl MealPlanRequest {
    /// # Errors
    ///
    /// Returns the first out-of-range option.
    pub fn validate(&self) -> Result<(), PlanRequestError> {
        if let Some(target) = self.calorie_target {
            check_range("calorie_target", target, 1200, 4000)?;
        }
        check_range("meal_count", self.meal_count, 2, 6)?;
        check_range("snack_count", self.snack_count, 0, 4)
    }

    fn restrictions(&self) -> String {
        let restrictions: Vec<String> = self
            .dietary_preferences
            .iter()
            .cloned()
            .chain(self.allergies.iter().map(|a| format!("No {a}")))
            .collect();
        if restrictions.is_empty() {
            "None".to_string()
        } else {
            restrictions.join(", ")
        }
    }
}

/// Body measurements and habits behind the calorie estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct DietProfile {
    pub age: i32,
    pub gender: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity_level: ActivityLevel,
}

impl Default for DietProfile {
    fn default() -> Self {
        Self {
            age: 30,
            gender: "male".to_string(),
            weight_kg: 70.0,
            height_cm: 170.0,
            activity_level: ActivityLevel::Moderate,
        }
    }
}

/// Height in centimetres from answers like `"5.2 ft"` or `"170 cm"`.
fn height_cm(value: &Value) -> Option<f64> {
    let unit = value.as_str()?.to_lowercase();
    let amount = leading_number(value)?;
    if unit.contains("ft") {
        Some(amount * CM_PER_FOOT)
    } else if unit.contains("cm") {
        Some(amount)
    } else {
        None
    }
}

impl DietProfile {
    /// Build the profile from the account and onboarding answers, keeping
    /// defaults for anything missing or unreadable.
    #[must_use]
    pub fn from_answers(
        age: Option<i32>,
        gender: Option<&str>,
        weight: Option<&Value>,
        height: Option<&Value>,
        answers: &[AnsweredQuestion],
    ) -> Self {
        let mut profile = Self::default();
        if let Some(age) = age {
            profile.age = age;
        }
        if let Some(gender) = gender {
            profile.gender = gender.to_string();
        }
        if let Some(kg) = weight.and_then(leading_number) {
            profile.weight_kg = kg;
        }
        if let Some(cm) = height.and_then(height_cm) {
            profile.height_cm = cm;
        }

        for answer in answers {
            let question = answer.question.to_lowercase();
            if !(question.contains("activity") || question.contains("exercise")) {
                continue;
            }
            let answer = match &answer.answer {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if let Some(level) = ActivityLevel::from_answer(&answer) {
                profile.activity_level = level;
            }
        }

        profile
    }
}

/// Daily calories for `focus`, using the Mifflin-St Jeor resting estimate.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn calorie_target(profile: &DietProfile, focus: DietFocus) -> i64 {
    let sex_offset = if profile.gender.eq_ignore_ascii_case("male") {
        5.0
    } else {
        -161.0
    };
    let bmr = 10.0 * profile.weight_kg + 6.25 * profile.height_cm
        - 5.0 * f64::from(profile.age)
        + sex_offset;
    let tdee = bmr * profile.activity_level.multiplier();
    (tdee + focus.adjustment()) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroTargets {
    pub protein_pct: u32,
    pub carbs_pct: u32,
    pub fats_pct: u32,
    pub protein_g: i64,
    pub carbs_g: i64,
    pub fats_g: i64,
}

#[must_use]
pub fn macro_targets(focus: DietFocus, calories: i64) -> MacroTargets {
    let (protein_pct, carbs_pct, fats_pct) = focus.macro_split();
    let grams = |pct: u32, kcal_per_gram: i64| calories * i64::from(pct) / 100 / kcal_per_gram;
    MacroTargets {
        protein_pct,
        carbs_pct,
        fats_pct,
        protein_g: grams(protein_pct, 4),
        carbs_g: grams(carbs_pct, 4),
        fats_g: grams(fats_pct, 9),
    }
}

#[must_use]
pub fn build_prompt(request: &MealPlanRequest, profile: &DietProfile, calories: i64) -> String {
    let focus = request.focus;
    let macros = macro_targets(focus, calories);
    format!(
        r#"You are a professional nutritionist creating a personalised meal plan.

USER PROFILE:
- Age: {age}
- Gender: {gender}
- Weight: {weight} kg
- Height: {height:.0} cm
- Activity Level: {activity}
- Dietary Preferences: {restrictions}
- Cuisine Preference: {cuisine}

MEAL PLAN REQUIREMENTS:
- Focus: {title}
- Target Calories: {calories} kcal/day
- Number of Meals: {meals}
- Number of Snacks: {snacks}

MACRONUTRIENT TARGETS:
- Protein: {ppct}% ({pg}g)
- Carbs: {cpct}% ({cg}g)
- Fats: {fpct}% ({fg}g)

Return STRICT JSON ONLY, with no markdown and no commentary, matching this schema:
{{
  "title": "{title} Meal Plan",
  "description": "short motivational description",
  "insight": {{"title": "Nutrition Insight", "message": "string"}},
  "meals": [
    {{
      "type": "breakfast|lunch|dinner",
      "name": "string",
      "prep_time_minutes": 15,
      "calories": 500,
      "macros": {{"protein": 30, "carbs": 50, "fats": 15}},
      "ingredients": ["ingredient with quantity"],
      "instructions": ["step"],
      "benefits": "why this meal suits the focus"
    }}
  ],
  "snacks": [
    {{
      "name": "string",
      "prep_time_minutes": 5,
      "calories": 200,
      "macros": {{"protein": 10, "carbs": 20, "fats": 8}},
      "ingredients": ["string"],
      "instructions": ["string"]
    }}
  ]
}}

Keep prep times realistic (10-30 minutes for meals, 2-10 for snacks), respect
every dietary preference and allergy, and keep the day close to the targets.
"#,
        age = profile.age,
        gender = profile.gender,
        weight = profile.weight_kg,
        height = profile.height_cm,
        activity = profile.activity_level.as_str(),
        restrictions = request.restrictions(),
        cuisine = request.cuisine_preference.as_deref().unwrap_or("Any"),
        title = focus.title(),
        meals = request.meal_count,
        snacks = request.snack_count,
        ppct = macros.protein_pct,
        pg = macros.protein_g,
        cpct = macros.carbs_pct,
        cg = macros.carbs_g,
        fpct = macros.fats_pct,
        fg = macros.fats_g,
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Macros {
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// A meal or snack. Snacks carry no type or benefits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dish {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub name: String,
    pub prep_time_minutes: f64,
    pub calories: f64,
    pub macros: Macros,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieSummary {
    pub intake: i64,
    pub activity: ActivityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealPlan {
    pub focus: DietFocus,
    pub title: String,
    pub description: String,
    pub calories: CalorieSummary,
    pub insight: Insight,
    pub meal_count: usize,
    pub snack_count: usize,
    pub total_prep_time_minutes: f64,
    pub meals: Vec<Dish>,
    pub snacks: Vec<Dish>,
    pub daily_totals: DailyTotals,
    pub generated_at: DateTime<Utc>,
}

fn dishes(raw: &Object, key: &str, max: usize, is_meal: bool) -> Vec<Dish> {
    objects(Some(raw), key, max)
        .into_iter()
        .map(|item| {
            let item = Some(item);
            let macros = section(item, "macros");
            Dish {
                kind: is_meal.then(|| text(item, "type", "meal")),
                name: text(item, "name", if is_meal { "Meal" } else { "Snack" }),
                prep_time_minutes: number(item, "prep_time_minutes", 0.0),
                calories: number(item, "calories", 0.0),
                macros: Macros {
                    protein: number(macros, "protein", 0.0),
                    carbs: number(macros, "carbs", 0.0),
                    fats: number(macros, "fats", 0.0),
                },
                ingredients: string_list(item, "ingredients", MAX_INGREDIENTS),
                instructions: string_list(item, "instructions", MAX_INSTRUCTIONS),
                benefits: is_meal.then(|| text(item, "benefits", "")),
            }
        })
        .collect()
}

/// Read the model's reply, capping meals and snacks at the requested
/// counts. Prep time and daily totals are summed from the dishes kept.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reshape(
    raw: &Object,
    request: &MealPlanRequest,
    profile: &DietProfile,
    calories: i64,
    generated_at: DateTime<Utc>,
) -> MealPlan {
    let meals = dishes(raw, "meals", request.meal_count as usize, true);
    let snacks = dishes(raw, "snacks", request.snack_count as usize, false);

    let all = || meals.iter().chain(&snacks);
    let daily_totals = if meals.is_empty() && snacks.is_empty() {
        DailyTotals {
            calories: calories as f64,
            protein: 0.0,
            carbs: 0.0,
            fats: 0.0,
        }
    } else {
        DailyTotals {
            calories: all().map(|d| d.calories).sum(),
            protein: all().map(|d| d.macros.protein).sum(),
            carbs: all().map(|d| d.macros.carbs).sum(),
            fats: all().map(|d| d.macros.fats).sum(),
        }
    };

    MealPlan {
        focus: request.focus,
        title: text(Some(raw), "title", &format!("{} Meal Plan", request.focus.title())),
        description: text(Some(raw), "description", "Eat well, feel better."),
        calories: CalorieSummary {
            intake: calories,
            activity: profile.activity_level,
        },
        insight: insight(
            raw,
            "Nutrition Insight",
            "Steady, balanced meals keep your energy even through the day.",
        ),
        meal_count: meals.len(),
        snack_count: snacks.len(),
        total_prep_time_minutes: all().map(|d| d.prep_time_minutes).sum(),
        daily_totals,
        meals,
        snacks,
        generated_at,
    }
}

/// Generate a meal plan for `request`. A missing calorie target is
/// estimated from `profile`.
///
/// # Errors
///
/// Returns the client's error if the model call fails or the reply isn't
/// a JSON object.
pub async fn generate(
    client: &GeminiClient,
    request: &MealPlanRequest,
    profile: &DietProfile,
) -> Result<MealPlan, GeminiError> {
    let calories = request
        .calorie_target
        .map_or_else(|| calorie_target(profile, request.focus), i64::from);
    let prompt = build_prompt(request, profile, calories);
    let raw = client.generate_json(&prompt, Domain::Diet).await?;
    let plan = reshape(&raw, request, profile, calories, Utc::now());
    tracing::info!(
        focus = request.focus.as_str(),
        calories,
        meals = plan.meal_count,
        snacks = plan.snack_count,
        "Generated meal plan"
    );
    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

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

    fn request(json: Value) -> MealPlanRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_calorie_target_by_focus() {
        let profile = DietProfile::default();
        assert_eq!(calorie_target(&profile, DietFocus::Maintenance), 2507);
        assert_eq!(calorie_target(&profile, DietFocus::CleanEnergetic), 2507);
        assert_eq!(calorie_target(&profile, DietFocus::BuildMuscle), 2807);
        assert_eq!(calorie_target(&profile, DietFocus::Fatloss), 2007);
    }

    #[test]
    fn test_calorie_target_for_sedentary_woman() {
        let profile = DietProfile {
            gender: "Female".to_string(),
            activity_level: ActivityLevel::Sedentary,
            ..DietProfile::default()
        };
        assert_eq!(calorie_target(&profile, DietFocus::Maintenance), 1741);
    }

    #[test]
    fn test_macro_targets() {
        let macros = macro_targets(DietFocus::Maintenance, 2000);
        assert_eq!((macros.protein_g, macros.carbs_g, macros.fats_g), (150, 200, 66));

        let macros = macro_targets(DietFocus::Fatloss, 1800);
        assert_eq!((macros.protein_pct, macros.carbs_pct, macros.fats_pct), (35, 35, 30));
        assert_eq!((macros.protein_g, macros.carbs_g, macros.fats_g), (157, 157, 60));
    }

    #[test]
    fn test_profile_reads_measurements_and_activity() {
        let answers = vec![
            answer("How would you rate your daily activity?", json!("Very active")),
            answer("What is your goal?", json!("Sedentary lifestyle change")),
        ];
        let profile = DietProfile::from_answers(
            Some(25),
            Some("female"),
            Some(&json!("62 kg")),
            Some(&json!("5.5 ft")),
            &answers,
        );
        assert_eq!(profile.age, 25);
        assert_eq!(profile.gender, "female");
        assert!((profile.weight_kg - 62.0).abs() < f64::EPSILON);
        assert!((profile.height_cm - 167.64).abs() < 1e-9);
        assert_eq!(profile.activity_level, ActivityLevel::Active);
    }

    #[test]
    fn test_profile_keeps_defaults_for_unreadable_values() {
        let profile = DietProfile::from_answers(
            None,
            None,
            Some(&json!("heavy")),
            Some(&json!("170")),
            &[],
        );
        assert_eq!(profile, DietProfile::default());
    }

    #[test]
    fn test_request_validation() {
        let req = request(json!({"focus": "maintenance"}));
        assert_eq!((req.meal_count, req.snack_count), (3, 2));
        assert!(req.validate().is_ok());

        let req = request(json!({"focus": "fatloss", "calorie_target": 900}));
        assert_eq!(req.validate().unwrap_err().field, "calorie_target");

        let req = request(json!({"focus": "fatloss", "snack_count": 5}));
        assert_eq!(req.validate().unwrap_err().field, "snack_count");
    }

    #[test]
    fn test_prompt_lists_restrictions() {
        let req = request(json!({
            "focus": "clean_energetic",
            "dietary_preferences": ["vegetarian"],
            "allergies": ["peanuts"],
        }));
        let prompt = build_prompt(&req, &DietProfile::default(), 2200);
        assert!(prompt.contains("Dietary Preferences: vegetarian, No peanuts"));
        assert!(prompt.contains("Cuisine Preference: Any"));
        assert!(prompt.contains("Target Calories: 2200 kcal/day"));
        assert!(prompt.contains("Clean Energetic Meal Plan"));
    }

    #[test]
    fn test_reshape_sums_kept_dishes() {
        let req = request(json!({"focus": "build_muscle", "meal_count": 2, "snack_count": 1}));
        let meal = json!({
            "type": "lunch",
            "name": "Chicken bowl",
            "prep_time_minutes": 20,
            "calories": 600,
            "macros": {"protein": 45, "carbs": 60, "fats": 15},
        });
        let snack = json!({
            "name": "Yoghurt",
            "prep_time_minutes": 2,
            "calories": 150,
            "type": "x",
        });
        let raw = json!({
            "meals": [meal.clone(), meal.clone(), meal],
            "snacks": [snack.clone(), snack],
        });

        let profile = DietProfile::default();
        let plan = reshape(raw.as_object().unwrap(), &req, &profile, 2807, Utc::now());
        assert_eq!((plan.meal_count, plan.snack_count), (2, 1));
        assert!((plan.total_prep_time_minutes - 42.0).abs() < f64::EPSILON);
        assert!((plan.daily_totals.calories - 1350.0).abs() < f64::EPSILON);
        assert!((plan.daily_totals.protein - 90.0).abs() < f64::EPSILON);
        assert_eq!(plan.snacks[0].kind, None);
        assert_eq!(plan.meals[0].kind.as_deref(), Some("lunch"));
        assert_eq!(plan.calories.intake, 2807);
        assert_eq!(plan.title, "Build Muscle Meal Plan");
    }

    #[test]
    fn test_empty_reply_reports_target() {
        let req = request(json!({"focus": "maintenance"}));
        let plan = reshape(&Object::new(), &req, &DietProfile::default(), 2507, Utc::now());
        assert!(plan.meals.is_empty());
        assert!((plan.daily_totals.calories - 2507.0).abs() < f64::EPSILON);
        assert_eq!(plan.insight.title, "Nutrition Insight");
    }
}
