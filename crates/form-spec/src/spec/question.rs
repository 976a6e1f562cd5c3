use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::id::ItemId;

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Date,
    Number,
    /// Grouping node; never answered itself.
    Section,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Text => "text",
            QuestionType::Date => "date",
            QuestionType::Number => "number",
            QuestionType::Section => "section",
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, QuestionType::Section)
    }
}

/// Selectable answer of a multiple choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    pub id: ItemId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub order_index: i64,
}

/// A node of the question tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub id: ItemId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub allow_multiple_answers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, alias = "Options", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

fn default_required() -> bool {
    true
}

impl QuestionSpec {
    /// Options sorted by their order index.
    pub fn ordered_options(&self) -> Vec<&OptionSpec> {
        let mut options: Vec<&OptionSpec> = self.options.iter().collect();
        options.sort_by_key(|option| option.order_index);
        options
    }

    /// Whether this question accepts a list of selected options.
    pub fn is_multi_select(&self) -> bool {
        matches!(self.kind, QuestionType::MultipleChoice) && self.allow_multiple_answers
    }
}
