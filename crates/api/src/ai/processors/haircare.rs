//! Hair and scalp analysis.

use serde::Serialize;
use serde_json::Value;

use super::fields::{
    Labeled, Object, RoutineStep, labeled, products, routine_steps, section, string_list, text,
    to_field,
};
use super::{AiOutput, Template};

pub(super) const TEMPLATE: Template = Template {
    role: "You are an expert trichologist assistant. Use the user's answers and scalp images \
           to assess hair health and produce a practical care plan.",
    schema: r#"
{
  "attributes": {
    "density": {"label": "Low|Medium|High", "confidence": 0-100},
    "hair_type": {"label": "Straight|Wavy|Curly|Coily", "confidence": 0-100},
    "volume": {"label": "Thin|Normal|Thick", "confidence": 0-100},
    "texture": {"label": "Fine|Medium|Coarse", "confidence": 0-100}
  },
  "health": {
    "scalp_health": {"label": "Healthy|Dry|Oily|Irritated", "confidence": 0-100},
    "breakage": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "frizz_dryness": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "dandruff": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100}
  },
  "concerns": {
    "hairloss": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "hairline_recession": {"label": "None|Mild|Moderate|Severe", "confidence": 0-100},
    "stage": {"label": "No concerns|Early|Progressing|Advanced", "confidence": 0-100}
  },
  "routine": {
    "today": [{"title": "string", "description": "string"}],
    "night": [{"title": "string", "description": "string"}]
  },
  "remedies": ["string"],
  "products": [{
    "name": "string",
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
const DEFAULT_MESSAGE: &str = "Healthy hair starts at the scalp. Stick with your routine!";

#[derive(Debug, Serialize)]
struct Attributes {
    density: Labeled,
    hair_type: Labeled,
    volume: Labeled,
    texture: Labeled,
}

#[derive(Debug, Serialize)]
struct Health {
    scalp_health: Labeled,
    breakage: Labeled,
    frizz_dryness: Labeled,
    dandruff: Labeled,
}

#[derive(Debug, Serialize)]
struct Concerns {
    hairloss: Labeled,
    hairline_recession: Labeled,
    stage: Labeled,
}

#[derive(Debug, Serialize)]
struct Routine {
    today: Vec<RoutineStep>,
    night: Vec<RoutineStep>,
}

pub(super) fn reshape(raw: &Object) -> AiOutput {
    let root = Some(raw);
    let attributes = section(root, "attributes");
    let health = section(root, "health");
    let concerns = section(root, "concerns");
    let routine = section(root, "routine");

    let attributes = Attributes {
        density: labeled(attributes, "density", "Medium"),
        hair_type: labeled(attributes, "hair_type", "Straight"),
        volume: labeled(attributes, "volume", "Normal"),
        texture: labeled(attributes, "texture", "Medium"),
    };
    let health = Health {
        scalp_health: labeled(health, "scalp_health", "Healthy"),
        breakage: labeled(health, "breakage", "None"),
        frizz_dryness: labeled(health, "frizz_dryness", "None"),
        dandruff: labeled(health, "dandruff", "None"),
    };
    let concerns = Concerns {
        hairloss: labeled(concerns, "hairloss", "None"),
        hairline_recession: labeled(concerns, "hairline_recession", "None"),
        stage: labeled(concerns, "stage", "No concerns"),
    };
    let routine = Routine {
        today: routine_steps(routine, "today", MAX_ROUTINE_STEPS),
        night: routine_steps(routine, "night", MAX_ROUTINE_STEPS),
    };

    AiOutput {
        ai_attributes: to_field(&attributes),
        ai_health: to_field(&health),
        ai_concerns: to_field(&concerns),
        ai_routine: to_field(&routine),
        ai_remedies: to_field(&string_list(root, "remedies", MAX_REMEDIES)),
        ai_products: to_field(&products(root, "products", MAX_PRODUCTS)),
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
    fn test_reshape_defaults() {
        let output = reshape(&Object::new());
        assert_eq!(
            output.ai_concerns.unwrap()["stage"],
            json!({"label": "No concerns", "confidence": 0.0})
        );
        assert_eq!(output.ai_remedies.unwrap(), json!([]));
    }

    #[test]
    fn test_remedies_are_capped() {
        let raw = json!({"remedies": ["a", "b", "c", "d", "e", "f", "g"]});
        let output = reshape(raw.as_object().unwrap());
        assert_eq!(output.ai_remedies.unwrap().as_array().unwrap().len(), MAX_REMEDIES);
    }
}
