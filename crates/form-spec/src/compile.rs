use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::answers::{Answers, is_blank};
use crate::options::OptionResolver;
use crate::spec::{
    form::FormSpec,
    id::scalar_key,
    question::{QuestionSpec, QuestionType},
};
use crate::tree::FormTree;
use crate::visibility::RuleIndex;

/// Style-agnostic unit of output handed to a document writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Header of a visible section at `depth` (0 for top-level sections).
    SectionHeader { text: String, depth: usize },
    /// Leaf question nested inside a section.
    LabelValueRow {
        label: String,
        value_text: String,
        depth: usize,
    },
    /// Leaf question at the root level, outside any section.
    StandaloneQuestion {
        label: String,
        value_text: String,
        answered: bool,
    },
}

impl Block {
    pub fn depth(&self) -> usize {
        match self {
            Block::SectionHeader { depth, .. } | Block::LabelValueRow { depth, .. } => *depth,
            Block::StandaloneQuestion { .. } => 0,
        }
    }
}

/// Compiled answers of one respondent, ready for a writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub blocks: Vec<Block>,
}

/// Walks the tree depth-first and emits one block per visible question.
///
/// Hidden questions are skipped together with everything below them. A visible
/// section always emits its header, even when none of its children survive.
pub fn compile(
    tree: &FormTree<'_>,
    rules: &RuleIndex<'_>,
    answers: &Answers,
    options: &OptionResolver,
) -> Vec<Block> {
    tree.walk(|question| rules.is_visible(question, answers))
        .into_iter()
        .map(|node| {
            let question = node.question;
            match question.kind {
                QuestionType::Section => Block::SectionHeader {
                    text: question.text.clone(),
                    depth: node.depth,
                },
                QuestionType::MultipleChoice
                | QuestionType::Text
                | QuestionType::Date
                | QuestionType::Number => {
                    let value_text = display_value(question, answers.get(&question.id), options);
                    if node.depth == 0 {
                        Block::StandaloneQuestion {
                            label: question.text.clone(),
                            answered: !value_text.is_empty(),
                            value_text,
                        }
                    } else {
                        Block::LabelValueRow {
                            label: question.text.clone(),
                            value_text,
                            depth: node.depth,
                        }
                    }
                }
            }
        })
        .collect()
}

/// Builds the per-snapshot indexes and compiles a full document.
pub fn compile_document(spec: &FormSpec, answers: &Answers) -> CompiledDocument {
    let tree = FormTree::build(&spec.questions);
    let rules = RuleIndex::new(&spec.rules);
    let options = OptionResolver::for_form(spec);
    let blocks = compile(&tree, &rules, answers, &options);
    debug!(
        form = %spec.id,
        questions = spec.questions.len(),
        rules = spec.rules.len(),
        answers = answers.len(),
        blocks = blocks.len(),
        "compiled document"
    );
    CompiledDocument {
        title: spec.title.clone(),
        description: spec.description.clone(),
        blocks,
    }
}

/// Display text for an answer; empty when there is no answer.
///
/// Multiple choice answers resolve through the option labels, lists joined
/// with ", ". Other kinds print the raw value.
pub fn display_value(
    question: &QuestionSpec,
    answer: Option<&Value>,
    options: &OptionResolver,
) -> String {
    let Some(answer) = answer.filter(|value| !is_blank(value)) else {
        return String::new();
    };
    match question.kind {
        QuestionType::MultipleChoice => match answer {
            Value::Array(items) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| options.label_for_value(item))
                .collect::<Vec<_>>()
                .join(", "),
            scalar => options.label_for_value(scalar),
        },
        QuestionType::Text | QuestionType::Date | QuestionType::Number => match answer {
            Value::Array(items) => items
                .iter()
                .filter_map(scalar_key)
                .collect::<Vec<_>>()
                .join(", "),
            scalar => scalar_key(scalar).unwrap_or_default(),
        },
        QuestionType::Section => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multi_select_labels_join_in_answer_order() {
        let question: QuestionSpec = serde_json::from_value(json!({
            "id": 9,
            "text": "Colours",
            "type": "multiple_choice",
            "allowMultipleAnswers": true,
            "options": [
                { "id": 1, "text": "Red", "orderIndex": 0 },
                { "id": 3, "text": "Blue", "orderIndex": 1 }
            ]
        }))
        .expect("question");
        let options = OptionResolver::new(&question.options);
        assert_eq!(
            display_value(&question, Some(&json!([1, 3])), &options),
            "Red, Blue"
        );
        assert_eq!(
            display_value(&question, Some(&json!([3, 7])), &options),
            "Blue, 7"
        );
        assert_eq!(display_value(&question, Some(&json!("1")), &options), "Red");
        assert_eq!(display_value(&question, Some(&json!([])), &options), "");
    }

    #[test]
    fn scalar_kinds_print_raw_values() {
        let question: QuestionSpec =
            serde_json::from_value(json!({ "id": "n", "text": "Age", "type": "number" }))
                .expect("question");
        let options = OptionResolver::default();
        assert_eq!(display_value(&question, Some(&json!(42)), &options), "42");
        assert_eq!(display_value(&question, Some(&json!("4.5")), &options), "4.5");
        assert_eq!(display_value(&question, None, &options), "");
        assert_eq!(display_value(&question, Some(&json!("")), &options), "");
    }

    #[test]
    fn text_answers_are_not_resolved_as_options() {
        let question: QuestionSpec =
            serde_json::from_value(json!({ "id": "t", "text": "Note", "type": "text" }))
                .expect("question");
        let options: Vec<crate::spec::question::OptionSpec> =
            serde_json::from_value(json!([{ "id": 1, "text": "Red" }])).expect("options");
        let resolver = OptionResolver::new(&options);
        assert_eq!(display_value(&question, Some(&json!("1")), &resolver), "1");
    }
}
