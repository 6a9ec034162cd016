//! Skin analysis: type, health and concern readings plus a care plan.

use serde::Serialize;
use serde_json::Value;

use super::fields::{
    Labeled, Object, Product, RoutineStep, labeled, products, routine_steps, section,
    string_list, text, to_field,
};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are an expert skincare assistant. Use the user's answers and face images to \
           produce a concise, safe skincare plan. Never diagnose medical conditions.",
    schema: r#"
{
  "attributes": {
    "skin_type": {"label": "Dry|Oily|Combination|Normal|Sensitive", "confidence": 0-100},
    "sensitivity": {"label": "Low|Moderate|High", "confidence": 0-100},
    "elasticity": {"label": "Low|Moderate|High", "confidence": 0-100},
    "oil_balance": {"label": "Low|Balanced|High", "confidence": 0-100},
    "hydration": {"label": "Weak|Moderate|Strong", "confidence": 0-100},
    "pore_visibility": {"label": "Low|Moderate|High", "confidence": 0-100}
  },
  "health": {
    "skin_health": {"label": "Healthy|Compromised|Damaged", "confidence": 0-100},
    "texture": {"label": "Smooth|Uneven|Rough", "confidence": 0-100},
    "skin_barrier": {"label": "Weak|Moderate|Strong", "confidence": 0-100},
    "smoothness": {"label": "Smooth|Rough|Very Rough", "confidence": 0-100},
    "brightness": {"label": "Bright|Dull|Very Dull", "confidence": 0-100}
  },
  "concerns": {
    "acne_breakouts": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "pigmentation": {"label": "None|Low|Moderate|High", "confidence": 0-100},
    "darkness_spot": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "wrinkles": {"label": "None|Mild|Noticeable|Severe", "confidence": 0-100},
    "uneven_tone": {"label": "None|Mild|Visible|Severe", "confidence": 0-100}
  },
  "routine": {
    "today": [{"title": "string", "description": "string"}],
    "night": [{"title": "string", "description": "string"}]
  },
  "remedies": [{"name": "string", "steps": ["string"]}],
  "safety_tips": ["string"],
  "products": [{
    "name": "string",
    "tags": ["string"],
    "time_of_day": "AM|PM|AM/PM",
    "overview": "string",
    "how_to_use": ["string"],
    "when_to_use": "string",
    "dont_use_with": ["string"],
    "confidence": 0-100
  }],
  "motivational_message": "string"
}"#,
    required: &[
        "attributes",
        "health",
        "concerns",
        "routine",
        "remedies",
        "products",
    ],
    with_images: true,
};

const MAX_ROUTINE_STEPS: usize = 5;
const MAX_REMEDIES: usize = 5;
const MAX_PRODUCTS: usize = 3;
const DEFAULT_MESSAGE: &str = "Consistency is key. Your skin will thank you with a healthy glow!";

#[derive(Debug, Serialize)]
struct Attributes {
    skin_type: Labeled,
    sensitivity: Labeled,
    elasticity: Labeled,
    oil_balance: Labeled,
    hydration: Labeled,
    pore_visibility: Labeled,
}

#[derive(Debug, Serialize)]
struct Health {
    skin_health: Labeled,
    texture: Labeled,
    skin_barrier: Labeled,
    smoothness: Labeled,
    brightness: Labeled,
}

#[derive(Debug, Serialize)]
struct Concerns {
    acne_breakouts: Labeled,
    pigmentation: Labeled,
    darkness_spot: Labeled,
    wrinkles: Labeled,
    uneven_tone: Labeled,
}

#[derive(Debug, Serialize)]
struct Routine {
    today: Vec<RoutineStep>,
    night: Vec<RoutineStep>,
}

#[derive(Debug, Serialize)]
struct Remedy {
    index: usize,
    name: String,
    steps: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Remedies {
    remedies: Vec<Remedy>,
    safety_tips: Vec<String>,
}

fn remedies(raw: &Object) -> Remedies {
    let remedies = raw
        .get("remedies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(MAX_REMEDIES)
                .filter_map(|item| match item {
                    Value::Object(obj) => Some((
                        text(Some(obj), "name", ""),
                        string_list(Some(obj), "steps", usize::MAX),
                    )),
                    Value::String(name) => Some((name.clone(), Vec::new())),
                    _ => None,
                })
                .enumerate()
                .map(|(i, (name, steps))| Remedy {
                    index: i + 1,
                    name,
                    steps,
                })
                .collect()
        })
        .unwrap_or_default();

    Remedies {
        remedies,
        safety_tips: string_list(Some(raw), "safety_tips", usize::MAX),
    }
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let health = section(root, "health");
    let concerns = section(root, "concerns");
    let routine = section(root, "routine");

    let attributes = Attributes {
        skin_type: labeled(attributes, "skin_type", "Normal"),
        sensitivity: labeled(attributes, "sensitivity", "Low"),
        elasticity: labeled(attributes, "elasticity", "Moderate"),
        oil_balance: labeled(attributes, "oil_balance", "Balanced"),
        hydration: labeled(attributes, "hydration", "Moderate"),
        pore_visibility: labeled(attributes, "pore_visibility", "Low"),
    };
    let health = Health {
        skin_health: labeled(health, "skin_health", "Healthy"),
        texture: labeled(health, "texture", "Smooth"),
        skin_barrier: labeled(health, "skin_barrier", "Strong"),
        smoothness: labeled(health, "smoothness", "Smooth"),
        brightness: labeled(health, "brightness", "Bright"),
    };
    let concerns = Concerns {
        acne_breakouts: labeled(concerns, "acne_breakouts", "None"),
        pigmentation: labeled(concerns, "pigmentation", "None"),
        darkness_spot: labeled(concerns, "darkness_spot", "None"),
        wrinkles: labeled(concerns, "wrinkles", "None"),
        uneven_tone: labeled(concerns, "uneven_tone", "None"),
    };
    let routine = Routine {
        today: routine_steps(routine, "today", MAX_ROUTINE_STEPS),
        night: routine_steps(routine, "night", MAX_ROUTINE_STEPS),
    };
    let products: Vec<Product> = products(root, "products", MAX_PRODUCTS);

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_health: to_field(&health),
        ai_concerns: to_field(&concerns),
        ai_routine: to_field(&routine),
        ai_remedies: to_field(&remedies(raw)),
        ai_products: to_field(&products),
        ai_message: Some(Value::String(text(root, "motivational_message", DEFAULT_MESSAGE))),
        ..AiOutput::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reshape_fills_defaults() {
        let output = reshape(&Object::new());
        let attributes = output.ai_attributes.unwrap();
        assert_eq!(attributes["skin_type"]["label"], "Normal");
        assert_eq!(attributes["oil_balance"]["label"], "Balanced");
        assert_eq!(output.ai_concerns.unwrap()["wrinkles"]["label"], "None");
        assert_eq!(output.ai_message.unwrap(), json!(DEFAULT_MESSAGE));
        assert_eq!(output.ai_routine.unwrap(), json!({"today": [], "night": []}));
        assert!(output.ai_features.is_none());
    }

    #[test]
    fn test_reshape_reads_model_output() {
        let raw = json!({
            "attributes": {"skin_type": {"label": "Oily", "confidence": 87}},
            "routine": {"today": [
                {"title": "Cleanse", "description": "Gentle foaming cleanser"},
                "not an object"
            ]},
            "remedies": [{"name": "Green tea toner", "steps": ["Brew", "Cool", "Apply"]}, "Aloe"],
            "safety_tips": ["Patch test first"],
            "products": [{"name": "Niacinamide serum"}, {}, {}, {}]
        });
        let output = reshape(raw.as_object().unwrap());

        let attributes = output.ai_attributes.unwrap();
        assert_eq!(attributes["skin_type"], json!({"label": "Oily", "confidence": 87.0}));

        let routine = output.ai_routine.unwrap();
        assert_eq!(routine["today"].as_array().unwrap().len(), 1);

        let remedies = output.ai_remedies.unwrap();
        assert_eq!(remedies["remedies"][1], json!({"index": 2, "name": "Aloe", "steps": []}));
        assert_eq!(remedies["safety_tips"], json!(["Patch test first"]));

        assert_eq!(output.ai_products.unwrap().as_array().unwrap().len(), MAX_PRODUCTS);
    }
}
