//! Style analysis. Everything beyond the body attributes is returned as a
//! single style report.

use serde::Serialize;

use super::fields::{Object, labeled, number, section, string_list, text, to_field};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are a personal stylist. Use the user's answers and photos to describe their \
           body type, colouring and style, and plan outfits for the week and the seasons.",
    schema: r##"
{
  "attributes": {
    "body_type": {"label": "Rectangle|Triangle|Inverted Triangle|Oval|Trapezoid|Average", "confidence": 0-100},
    "undertone": {"label": "Warm|Cool|Neutral", "confidence": 0-100},
    "style_goal": {"label": "string", "confidence": 0-100}
  },
  "style_profile": {
    "style": {"label": "Classic|Casual|Streetwear|Minimal|Sporty", "confidence": 0-100},
    "fit_preference": {"label": "Slim|Regular|Relaxed", "confidence": 0-100},
    "trend_preference": {"label": "Never|Sometimes|Often", "confidence": 0-100},
    "accessories": {"label": "Rarely|Occasionally|Always", "confidence": 0-100}
  },
  "recommendations": {
    "best_fits": ["string"],
    "avoid_styles": ["string"],
    "color_palette": ["#RRGGBB or colour name"]
  },
  "weekly_plan": {"Monday": "theme", "Tuesday": "theme", "Wednesday": "theme", "Thursday": "theme", "Friday": "theme", "Saturday": "theme", "Sunday": "theme"},
  "seasonal_style": {
    "Summer": {"outfits": ["string"], "fabrics": ["string"], "footwear": ["string"]},
    "Monsoon": {"outfits": ["string"], "fabrics": ["string"], "footwear": ["string"]},
    "Winter": {"outfits": ["string"], "fabrics": ["string"], "footwear": ["string"]}
  },
  "motivational_message": "string"
}"##,
    required: &[
        "attributes",
        "style_profile",
        "recommendations",
        "weekly_plan",
        "seasonal_style",
    ],
    with_images: true,
};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const SEASONS: [&str; 3] = ["Summer", "Monsoon", "Winter"];
const MAX_ITEMS: usize = 5;
const MAX_COLORS: usize = 6;
const DEFAULT_THEME: &str = "Casual";
const DEFAULT_MESSAGE: &str = "Dress for the version of yourself you're becoming.";

/// Fashion attributes flatten label and confidence into sibling keys.
#[derive(Debug, Serialize)]
struct Attributes {
    body_type: String,
    body_type_confidence: f64,
    undertone: String,
    undertone_confidence: f64,
    style_goal: String,
    style_goal_confidence: f64,
}

#[derive(Debug, Serialize)]
struct StyleProfile {
    style: String,
    style_confidence: f64,
    fit_preference: String,
    fit_confidence: f64,
    trend_preference: String,
    trend_confidence: f64,
    accessories: String,
    accessories_confidence: f64,
}

#[derive(Debug, Serialize)]
struct Recommendations {
    best_fits: Vec<String>,
    avoid_styles: Vec<String>,
    color_palette: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DayPlan {
    day: &'static str,
    theme: String,
}

#[derive(Debug, Serialize)]
struct SeasonPlan {
    season: &'static str,
    outfits: Vec<String>,
    fabrics: Vec<String>,
    footwear: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StyleReport {
    style_profile: StyleProfile,
    recommendations: Recommendations,
    weekly_plan: Vec<DayPlan>,
    seasonal_style: Vec<SeasonPlan>,
}

/// Read `key` as either `{label, confidence}` or a bare label with a
/// sibling `{key}_confidence`.
fn pair(obj: Option<&Object>, key: &str, confidence_key: &str, default: &str) -> (String, f64) {
    let reading = labeled(obj, key, default);
    let confidence = if reading.confidence > 0.0 {
        reading.confidence
    } else {
        number(obj, confidence_key, 0.0)
    };
    (reading.label, confidence)
}

fn style_report(root: Option<&Object>) -> StyleReport {
    let profile = section(root, "style_profile");
    let recommendations = section(root, "recommendations");
    let weekly = section(root, "weekly_plan");
    let seasonal = section(root, "seasonal_style");

    let (style, style_confidence) = pair(profile, "style", "style_confidence", "Classic");
    let (fit_preference, fit_confidence) =
        pair(profile, "fit_preference", "fit_confidence", "Regular");
    let (trend_preference, trend_confidence) =
        pair(profile, "trend_preference", "trend_confidence", "Sometimes");
    let (accessories, accessories_confidence) =
        pair(profile, "accessories", "accessories_confidence", "Occasionally");

    StyleReport {
        style_profile: StyleProfile {
            style,
            style_confidence,
            fit_preference,
            fit_confidence,
            trend_preference,
            trend_confidence,
            accessories,
            accessories_confidence,
        },
        recommendations: Recommendations {
            best_fits: string_list(recommendations, "best_fits", MAX_ITEMS),
            avoid_styles: string_list(recommendations, "avoid_styles", MAX_ITEMS),
            color_palette: string_list(recommendations, "color_palette", MAX_COLORS),
        },
        weekly_plan: WEEKDAYS
            .iter()
            .map(|&day| DayPlan {
                day,
                theme: text(weekly, day, DEFAULT_THEME),
            })
            .collect(),
        seasonal_style: SEASONS
            .iter()
            .map(|&season| {
                let plan = section(seasonal, season);
                SeasonPlan {
                    season,
                    outfits: string_list(plan, "outfits", MAX_ITEMS),
                    fabrics: string_list(plan, "fabrics", MAX_ITEMS),
                    footwear: string_list(plan, "footwear", MAX_ITEMS),
                }
            })
            .collect(),
    }
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");

    let (body_type, body_type_confidence) =
        pair(attributes, "body_type", "body_type_confidence", "Average");
    let (undertone, undertone_confidence) =
        pair(attributes, "undertone", "undertone_confidence", "Neutral");
    let (style_goal, style_goal_confidence) =
        pair(attributes, "style_goal", "style_goal_confidence", "Confidence");

    let attributes = Attributes {
        body_type,
        body_type_confidence,
        undertone,
        undertone_confidence,
        style_goal,
        style_goal_confidence,
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_style: to_field(&style_report(root)),
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
    fn test_weekly_plan_has_every_day() {
        let raw = json!({"weekly_plan": {"Monday": "Smart casual", "Friday": "Date night"}});
        let output = reshape(raw.as_object().unwrap());
        let style = output.ai_style.unwrap();
        let plan = style["weekly_plan"].as_array().unwrap();

        assert_eq!(plan.len(), 7);
        assert_eq!(plan[0], json!({"day": "Monday", "theme": "Smart casual"}));
        assert_eq!(plan[1]["theme"], DEFAULT_THEME);
        assert_eq!(plan[4]["theme"], "Date night");
    }

    #[test]
    fn test_attributes_accept_both_confidence_shapes() {
        let raw = json!({"attributes": {
            "body_type": {"label": "Rectangle", "confidence": 70},
            "undertone": "Warm",
            "undertone_confidence": 55
        }});
        let output = reshape(raw.as_object().unwrap());
        let attributes = output.ai_attributes.unwrap();

        assert_eq!(attributes["body_type"], "Rectangle");
        assert_eq!(attributes["body_type_confidence"], 70.0);
        assert_eq!(attributes["undertone"], "Warm");
        assert_eq!(attributes["undertone_confidence"], 55.0);
        assert_eq!(attributes["style_goal"], "Confidence");
    }

    #[test]
    fn test_schema_is_complete() {
        assert!(TEMPLATE.schema.contains("\"#RRGGBB or colour name\""));
        assert!(TEMPLATE.schema.trim_end().ends_with('}'));
        for key in TEMPLATE.required {
            assert!(TEMPLATE.schema.contains(&format!("\"{key}\"")), "{key}");
        }
    }

    #[test]
    fn test_palette_allows_six_colours() {
        let raw = json!({"recommendations": {"color_palette": ["a", "b", "c", "d", "e", "f", "g"]}});
        let output = reshape(raw.as_object().unwrap());
        let style = output.ai_style.unwrap();
        assert_eq!(
            style["recommendations"]["color_palette"].as_array().unwrap().len(),
            MAX_COLORS
        );
        assert_eq!(style["seasonal_style"].as_array().unwrap().len(), 3);
    }
}
