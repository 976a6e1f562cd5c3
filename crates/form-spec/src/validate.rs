use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::answers::{Answers, ValidationError, ValidationResult, is_blank};
use crate::spec::form::FormSpec;
use crate::spec::id::scalar_key;
use crate::spec::question::{QuestionSpec, QuestionType};
use crate::visibility::resolve_effective_visibility;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// Checks answers of the questions a respondent can currently see.
///
/// Hidden questions are never required and never checked, so stale answers
/// to questions that became hidden do not fail validation.
pub fn validate(spec: &FormSpec, answers: &Answers) -> ValidationResult {
    let visibility = resolve_effective_visibility(spec, answers);

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for question in &spec.questions {
        if question.kind.is_section() {
            continue;
        }
        if !visibility.get(question.id.as_str()).copied().unwrap_or(false) {
            continue;
        }

        match answers.get(&question.id).filter(|value| !is_blank(value)) {
            None => {
                if question.required {
                    missing_required.push(question.id.to_string());
                }
            }
            Some(value) => {
                if let Some(error) = validate_value(question, value) {
                    errors.push(error);
                }
            }
        }
    }

    let all_ids: BTreeSet<&str> = spec
        .questions
        .iter()
        .map(|question| question.id.as_str())
        .collect();
    let unknown_fields: Vec<String> = answers
        .keys()
        .filter(|key| !all_ids.contains(key.as_str()))
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn validate_value(question: &QuestionSpec, value: &Value) -> Option<ValidationError> {
    match question.kind {
        QuestionType::MultipleChoice => validate_choice(question, value),
        QuestionType::Number => match value {
            Value::Number(_) => None,
            Value::String(text) if text.trim().parse::<f64>().is_ok() => None,
            Value::String(_) => Some(base_error(question, "not a number", "invalid_number")),
            _ => Some(base_error(question, "type mismatch", "type_mismatch")),
        },
        QuestionType::Date => match value {
            Value::String(text) if DATE.is_match(text) => None,
            Value::String(_) => Some(base_error(
                question,
                "date must be formatted as YYYY-MM-DD",
                "invalid_date",
            )),
            _ => Some(base_error(question, "type mismatch", "type_mismatch")),
        },
        QuestionType::Text => match value {
            Value::String(_) | Value::Number(_) => None,
            _ => Some(base_error(question, "type mismatch", "type_mismatch")),
        },
        QuestionType::Section => None,
    }
}

fn validate_choice(question: &QuestionSpec, value: &Value) -> Option<ValidationError> {
    let selected: Vec<&Value> = match value {
        Value::Array(items) => {
            if items.len() > 1 && !question.allow_multiple_answers {
                return Some(base_error(
                    question,
                    "only one option may be selected",
                    "multiple_not_allowed",
                ));
            }
            items.iter().collect()
        }
        Value::Object(_) => {
            return Some(base_error(question, "type mismatch", "type_mismatch"));
        }
        scalar => vec![scalar],
    };

    for item in selected {
        if matches!(item, Value::Array(_) | Value::Object(_)) {
            return Some(base_error(question, "type mismatch", "type_mismatch"));
        }
        let Some(key) = scalar_key(item) else {
            continue;
        };
        if !question.options.iter().any(|option| option.id.as_str() == key) {
            return Some(base_error(
                question,
                &format!("'{key}' is not an option of this question"),
                "unknown_option",
            ));
        }
    }
    None
}

fn base_error(question: &QuestionSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        question_id: Some(question.id.to_string()),
        path: Some(format!("/{}", question.id)),
        message: message.into(),
        code: Some(code.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> FormSpec {
        FormSpec::from_json_str(
            &json!({
                "id": "v",
                "title": "Validation",
                "questions": [
                    { "id": 1, "text": "Colour", "type": "multiple_choice",
                      "options": [{ "id": 1, "text": "Red" }, { "id": 2, "text": "Blue" }] },
                    { "id": 2, "text": "Why blue", "type": "text" },
                    { "id": 3, "text": "Born", "type": "date", "required": false },
                    { "id": 4, "text": "Age", "type": "number", "required": false }
                ],
                "rules": [
                    { "id": 1, "targetQuestionId": 2, "triggerQuestionId": 1,
                      "triggerOptionId": 2, "action": "SHOW" }
                ]
            })
            .to_string(),
        )
        .expect("form")
    }

    fn codes(result: &ValidationResult) -> Vec<&str> {
        result
            .errors
            .iter()
            .filter_map(|error| error.code.as_deref())
            .collect()
    }

    #[test]
    fn hidden_required_questions_are_not_missing() {
        let result = validate(&form(), &Answers::from_value(&json!({ "1": 1 })));
        assert!(result.valid, "{result:?}");
    }

    #[test]
    fn revealed_required_questions_become_missing() {
        let result = validate(&form(), &Answers::from_value(&json!({ "1": 2 })));
        assert!(!result.valid);
        assert_eq!(result.missing_required, vec!["2"]);
    }

    #[test]
    fn values_are_checked_by_kind() {
        let answers = Answers::from_value(&json!({
            "1": [1, 2],
            "3": "12/01/2020",
            "4": "old",
        }));
        let result = validate(&form(), &answers);
        assert_eq!(
            codes(&result),
            vec!["multiple_not_allowed", "invalid_date", "invalid_number"]
        );
    }

    #[test]
    fn unknown_options_and_fields_are_reported() {
        let answers = Answers::from_value(&json!({ "1": 9, "extra": true }));
        let result = validate(&form(), &answers);
        assert_eq!(codes(&result), vec!["unknown_option"]);
        assert_eq!(result.unknown_fields, vec!["extra"]);
    }

    #[test]
    fn numeric_strings_and_iso_dates_pass() {
        let answers = Answers::from_value(&json!({ "1": "1", "3": "2020-01-12", "4": "4.5" }));
        assert!(validate(&form(), &answers).valid);
    }
}
