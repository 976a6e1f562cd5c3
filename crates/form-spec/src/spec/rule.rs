use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::spec::id::ItemId;

/// What a matching rule does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    #[default]
    Show,
    Hide,
    /// Anything else the store holds, including `null`. Such rules are skipped.
    Unknown,
}

impl<'de> Deserialize<'de> for RuleAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(label) if label == "SHOW" => RuleAction::Show,
            Value::String(label) if label == "HIDE" => RuleAction::Hide,
            _ => RuleAction::Unknown,
        })
    }
}

/// Conditional visibility rule between two questions of one form.
///
/// The store keeps the three references nullable. A rule missing any of them
/// never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogicRule {
    pub id: ItemId,
    #[serde(default)]
    pub target_question_id: Option<ItemId>,
    #[serde(default)]
    pub trigger_question_id: Option<ItemId>,
    #[serde(default)]
    pub trigger_option_id: Option<ItemId>,
    #[serde(default)]
    pub action: RuleAction,
}

impl LogicRule {
    pub fn targets(&self, question: &ItemId) -> bool {
        self.target_question_id.as_ref() == Some(question)
    }

    /// Trigger question and option, when both are set.
    pub fn trigger(&self) -> Option<(&ItemId, &ItemId)> {
        Some((
            self.trigger_question_id.as_ref()?,
            self.trigger_option_id.as_ref()?,
        ))
    }
}
