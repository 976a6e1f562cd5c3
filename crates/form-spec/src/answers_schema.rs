use serde_json::{Map, Value, json};

use crate::spec::{
    form::FormSpec,
    question::{QuestionSpec, QuestionType},
};
use crate::visibility::VisibilityMap;

const NUMERIC_PATTERN: &str = r"^-?\d+(\.\d+)?$";

/// JSON schema describing the answers of the visible leaf questions.
pub fn generate(spec: &FormSpec, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for question in &spec.questions {
        if question.kind.is_section() {
            continue;
        }
        if !visibility.get(question.id.as_str()).copied().unwrap_or(true) {
            continue;
        }
        properties.insert(question.id.to_string(), question_schema(question));
        if question.required {
            required.push(Value::String(question.id.to_string()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": spec.title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Option ids in both string and integer spelling when they parse as one.
fn option_enum(question: &QuestionSpec) -> Vec<Value> {
    let mut values = Vec::new();
    for option in question.ordered_options() {
        values.push(Value::String(option.id.to_string()));
        if let Ok(number) = option.id.as_str().parse::<i64>() {
            values.push(Value::from(number));
        }
    }
    values
}

fn question_schema(question: &QuestionSpec) -> Value {
    let mut schema = match question.kind {
        QuestionType::MultipleChoice if question.allow_multiple_answers => json!({
            "type": "array",
            "items": { "enum": option_enum(question) },
            "uniqueItems": true,
        }),
        QuestionType::MultipleChoice => json!({ "enum": option_enum(question) }),
        QuestionType::Number => json!({
            "type": ["number", "string"],
            "pattern": NUMERIC_PATTERN,
        }),
        QuestionType::Date => json!({ "type": "string", "format": "date" }),
        QuestionType::Text | QuestionType::Section => json!({ "type": "string" }),
    };

    if let Some(object) = schema.as_object_mut() {
        object.insert("title".into(), Value::String(question.text.clone()));
        if let Some(description) = &question.description {
            object.insert("description".into(), Value::String(description.clone()));
        }
    }
    schema
}
