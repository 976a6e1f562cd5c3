use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::id::{ItemId, scalar_key};

/// Respondent answers keyed by question id.
///
/// Values are kept as raw JSON: scalars for single answers and arrays for
/// multi-select questions. Nothing here rejects an odd shape; consumers coerce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(Map<String, Value>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient conversion: anything but a JSON object is an empty answer set.
    pub fn from_value(value: &Value) -> Self {
        Self(value.as_object().cloned().unwrap_or_default())
    }

    pub fn get(&self, question_id: &ItemId) -> Option<&Value> {
        self.0.get(question_id.as_str())
    }

    pub fn insert(&mut self, question_id: &ItemId, value: Value) {
        self.0.insert(question_id.to_string(), value);
    }

    pub fn remove(&mut self, question_id: &ItemId) -> Option<Value> {
        self.0.remove(question_id.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the question has a non-empty answer.
    pub fn is_answered(&self, question_id: &ItemId) -> bool {
        self.get(question_id).is_some_and(|value| !is_blank(value))
    }

    /// Whether the answer to `question_id` selects `option_id`.
    ///
    /// Scalars compare by string form; lists match when any element does.
    /// Missing, null and empty answers never match.
    pub fn selects(&self, question_id: &ItemId, option_id: &ItemId) -> bool {
        let Some(answer) = self.get(question_id) else {
            return false;
        };
        if is_blank(answer) {
            return false;
        }
        let wanted = option_id.as_str();
        match answer {
            Value::Array(items) => items
                .iter()
                .filter_map(scalar_key)
                .any(|item| item == wanted),
            other => scalar_key(other).is_some_and(|item| item == wanted),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Answers {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Answers {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

/// Null, empty strings and empty lists count as "no answer".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Single problem found while validating answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Outcome of [`crate::validate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<String>,
    pub unknown_fields: Vec<String>,
}
