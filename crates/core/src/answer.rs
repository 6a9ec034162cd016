//! Answer validation.
//!
//! Answers arrive as arbitrary JSON. They are checked against the stored
//! question (its [`QuestionType`], option list and constraints object), never
//! against a type the client claims. Constraints recognised:
//!
//! | key          | applies to | meaning                        |
//! |--------------|------------|--------------------------------|
//! | `min`        | numeric    | inclusive lower bound          |
//! | `max`        | numeric    | inclusive upper bound          |
//! | `max_length` | text       | maximum number of characters   |
//!
//! Unknown constraint keys are ignored so question authors can attach UI
//! hints (`unit`, `placeholder`) without breaking validation.

use serde_json::Value;

use crate::QuestionType;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnswerError {
    #[error("Answer cannot be empty")]
    Empty,
    #[error("Answer must be a number")]
    NotANumber,
    #[error("Answer must be at least {min}")]
    BelowMinimum { min: f64 },
    #[error("Answer must be at most {max}")]
    AboveMaximum { max: f64 },
    #[error("Answer must be text")]
    NotText,
    #[error("Answer must be at most {max} characters")]
    TooLong { max: u64 },
    #[error("Answer must be a list of options")]
    NotAList,
    #[error("'{value}' is not a valid option")]
    InvalidOption { value: String },
}

/// Validate `answer` for a question of type `kind`.
///
/// An absent or empty `options` list disables option membership checks.
///
/// # Errors
///
/// Returns the first [`AnswerError`] the answer violates.
pub fn validate_answer(
    kind: QuestionType,
    options: Option<&[String]>,
    constraints: Option<&Value>,
    answer: &Value,
) -> Result<(), AnswerError> {
    if is_blank(answer) {
        return Err(AnswerError::Empty);
    }

    let options = options.filter(|o| !o.is_empty());
    match kind {
        QuestionType::Numeric => validate_numeric(constraints, answer),
        QuestionType::Text => validate_text(constraints, answer),
        QuestionType::Choice => {
            let Value::String(choice) = answer else {
                return Err(AnswerError::NotText);
            };
            check_option(options, choice)
        }
        QuestionType::MultiChoice => {
            let Value::Array(items) = answer else {
                return Err(AnswerError::NotAList);
            };
            for item in items {
                let Value::String(choice) = item else {
                    return Err(AnswerError::InvalidOption {
                        value: item.to_string(),
                    });
                };
                check_option(options, choice)?;
            }
            Ok(())
        }
    }
}

/// Read a numeric answer, accepting numbers sent as strings (`"170"`).
#[must_use]
pub fn numeric_value(answer: &Value) -> Option<f64> {
    match answer {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn is_blank(answer: &Value) -> bool {
    match answer {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn validate_numeric(constraints: Option<&Value>, answer: &Value) -> Result<(), AnswerError> {
    let value = numeric_value(answer).ok_or(AnswerError::NotANumber)?;

    if let Some(min) = constraint_f64(constraints, "min")
        && value < min
    {
        return Err(AnswerError::BelowMinimum { min });
    }
    if let Some(max) = constraint_f64(constraints, "max")
        && value > max
    {
        return Err(AnswerError::AboveMaximum { max });
    }
    Ok(())
}

fn validate_text(constraints: Option<&Value>, answer: &Value) -> Result<(), AnswerError> {
    let Value::String(text) = answer else {
        return Err(AnswerError::NotText);
    };

    if let Some(max) = constraints
        .and_then(|c| c.get("max_length"))
        .and_then(Value::as_u64)
        && text.chars().count() as u64 > max
    {
        return Err(AnswerError::TooLong { max });
    }
    Ok(())
}

fn check_option(options: Option<&[String]>, choice: &str) -> Result<(), AnswerError> {
    match options {
        Some(options) if !options.iter().any(|o| o == choice) => Err(AnswerError::InvalidOption {
            value: choice.to_owned(),
        }),
        _ => Ok(()),
    }
}

fn constraint_f64(constraints: Option<&Value>, key: &str) -> Option<f64> {
    constraints?.get(key).and_then(numeric_value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_blank_answers_rejected_for_every_type() {
        for kind in QuestionType::ALL {
            for blank in [json!(null), json!(""), json!("   "), json!([])] {
                assert_eq!(
                    validate_answer(*kind, None, None, &blank),
                    Err(AnswerError::Empty),
                    "{kind} accepted {blank}"
                );
            }
        }
    }

    #[test]
    fn test_numeric_bounds() {
        let constraints = json!({"min": 100, "max": 250, "unit": "cm"});
        let check = |v: Value| validate_answer(QuestionType::Numeric, None, Some(&constraints), &v);

        assert!(check(json!(170)).is_ok());
        assert!(check(json!("172.5")).is_ok());
        assert!(check(json!(100)).is_ok());
        assert_eq!(check(json!(99)), Err(AnswerError::BelowMinimum { min: 100.0 }));
        assert_eq!(check(json!(251)), Err(AnswerError::AboveMaximum { max: 250.0 }));
        assert_eq!(check(json!("tall")), Err(AnswerError::NotANumber));
        assert_eq!(check(json!(["170"])), Err(AnswerError::NotANumber));
    }

    #[test]
    fn test_choice_must_be_listed() {
        let options = opts(&["Oily", "Dry", "Combination"]);
        assert!(validate_answer(QuestionType::Choice, Some(options.as_slice()), None, &json!("Dry")).is_ok());
        assert_eq!(
            validate_answer(QuestionType::Choice, Some(options.as_slice()), None, &json!("Normal")),
            Err(AnswerError::InvalidOption {
                value: "Normal".into()
            })
        );
        assert_eq!(
            validate_answer(QuestionType::Choice, Some(options.as_slice()), None, &json!(3)),
            Err(AnswerError::NotText)
        );
    }

    #[test]
    fn test_choice_without_options_accepts_any_text() {
        assert!(validate_answer(QuestionType::Choice, Some(&[][..]), None, &json!("anything")).is_ok());
    }

    #[test]
    fn test_multi_choice_checks_every_member() {
        let options = opts(&["Acne", "Wrinkles", "Dark spots"]);
        let check = |v: Value| validate_answer(QuestionType::MultiChoice, Some(options.as_slice()), None, &v);

        assert!(check(json!(["Acne", "Dark spots"])).is_ok());
        assert_eq!(check(json!("Acne")), Err(AnswerError::NotAList));
        assert_eq!(
            check(json!(["Acne", "Freckles"])),
            Err(AnswerError::InvalidOption {
                value: "Freckles".into()
            })
        );
    }

    #[test]
    fn test_text_length_limit() {
        let constraints = json!({"max_length": 5});
        assert!(validate_answer(QuestionType::Text, None, Some(&constraints), &json!("hello")).is_ok());
        assert_eq!(
            validate_answer(QuestionType::Text, None, Some(&constraints), &json!("hello!")),
            Err(AnswerError::TooLong { max: 5 })
        );
        assert_eq!(
            validate_answer(QuestionType::Text, None, None, &json!(12)),
            Err(AnswerError::NotText)
        );
    }
}
