use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::spec::id::ItemId;
use crate::spec::question::{OptionSpec, QuestionSpec};
use crate::spec::rule::LogicRule;

/// Immutable snapshot of one form as handed over by the authoring store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    pub id: ItemId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "Questions")]
    pub questions: Vec<QuestionSpec>,
    #[serde(default, alias = "LogicRules", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<LogicRule>,
}

impl FormSpec {
    pub fn from_json_str(json: &str) -> Result<Self, FormError> {
        serde_json::from_str(json).map_err(FormError::Parse)
    }

    pub fn from_cbor_slice(bytes: &[u8]) -> Result<Self, FormError> {
        serde_cbor::from_slice(bytes).map_err(FormError::Cbor)
    }

    pub fn to_cbor_vec(&self) -> Result<Vec<u8>, FormError> {
        serde_cbor::to_vec(self).map_err(FormError::Cbor)
    }

    /// Looks up a question by id, reporting unknown ids as not found.
    pub fn question(&self, id: &ItemId) -> Result<&QuestionSpec, FormError> {
        self.questions
            .iter()
            .find(|question| &question.id == id)
            .ok_or_else(|| FormError::NotFound {
                kind: "question",
                id: id.to_string(),
            })
    }

    /// Every option of every question, in question order.
    pub fn all_options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.questions
            .iter()
            .flat_map(|question| question.options.iter())
    }
}
