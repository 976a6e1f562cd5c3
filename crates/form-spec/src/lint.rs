use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec::{
    form::FormSpec,
    question::{QuestionSpec, QuestionType},
    rule::RuleAction,
};
use crate::tree::FormTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintCode {
    DuplicateQuestionId,
    MissingParent,
    ParentNotSection,
    UnreachableQuestion,
    OptionsOnNonChoice,
    RuleUnknownTarget,
    RuleUnknownTrigger,
    RuleUnknownOption,
    RuleOptionMismatch,
    RuleSelfReference,
    RuleIncomplete,
    RuleUnknownAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub code: LintCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl LintIssue {
    fn question(code: LintCode, question: &QuestionSpec, message: String) -> Self {
        Self {
            code,
            message,
            question_id: Some(question.id.to_string()),
            rule_id: None,
        }
    }
}

/// Authoring diagnostics. Findings never change evaluation: a rule pointing
/// at nothing simply never matches.
pub fn lint(spec: &FormSpec) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    lint_questions(spec, &mut issues);
    lint_rules(spec, &mut issues);
    for issue in &issues {
        debug!(code = ?issue.code, "{}", issue.message);
    }
    issues
}

fn lint_questions(spec: &FormSpec, issues: &mut Vec<LintIssue>) {
    let mut by_id: HashMap<&str, &QuestionSpec> = HashMap::new();
    for question in &spec.questions {
        if by_id.insert(question.id.as_str(), question).is_some() {
            issues.push(LintIssue::question(
                LintCode::DuplicateQuestionId,
                question,
                format!("question id '{}' is used more than once", question.id),
            ));
        }
    }

    let tree = FormTree::build(&spec.questions);
    let reachable: HashSet<&str> = tree
        .reachable()
        .iter()
        .map(|node| node.question.id.as_str())
        .collect();

    for question in &spec.questions {
        if let Some(parent_id) = &question.parent_id {
            match by_id.get(parent_id.as_str()) {
                None => issues.push(LintIssue::question(
                    LintCode::MissingParent,
                    question,
                    format!(
                        "question '{}' points at missing parent '{}'",
                        question.id, parent_id
                    ),
                )),
                Some(parent) if !parent.kind.is_section() => issues.push(LintIssue::question(
                    LintCode::ParentNotSection,
                    question,
                    format!(
                        "question '{}' is nested under '{}', which is not a section",
                        question.id, parent_id
                    ),
                )),
                Some(_) if !reachable.contains(question.id.as_str()) => {
                    issues.push(LintIssue::question(
                        LintCode::UnreachableQuestion,
                        question,
                        format!(
                            "question '{}' cannot be reached from the top level",
                            question.id
                        ),
                    ))
                }
                Some(_) => {}
            }
        }

        if !question.options.is_empty() && !matches!(question.kind, QuestionType::MultipleChoice)
        {
            issues.push(LintIssue::question(
                LintCode::OptionsOnNonChoice,
                question,
                format!(
                    "question '{}' of type {} carries options that are never shown",
                    question.id,
                    question.kind.as_str()
                ),
            ));
        }
    }
}

fn lint_rules(spec: &FormSpec, issues: &mut Vec<LintIssue>) {
    let questions: HashSet<&str> = spec
        .questions
        .iter()
        .map(|question| question.id.as_str())
        .collect();
    let option_owner: HashMap<&str, &str> = spec
        .questions
        .iter()
        .flat_map(|question| {
            question
                .options
                .iter()
                .map(move |option| (option.id.as_str(), question.id.as_str()))
        })
        .collect();

    for rule in &spec.rules {
        let mut push = |code: LintCode, message: String| {
            issues.push(LintIssue {
                code,
                message,
                question_id: rule.target_question_id.as_ref().map(ToString::to_string),
                rule_id: Some(rule.id.to_string()),
            })
        };

        if rule.action == RuleAction::Unknown {
            push(
                LintCode::RuleUnknownAction,
                format!(
                    "rule '{}' is neither SHOW nor HIDE and is ignored",
                    rule.id
                ),
            );
        }

        let (Some(target), Some(trigger), Some(option)) = (
            &rule.target_question_id,
            &rule.trigger_question_id,
            &rule.trigger_option_id,
        ) else {
            push(
                LintCode::RuleIncomplete,
                format!(
                    "rule '{}' is missing its target, trigger or option and never matches",
                    rule.id
                ),
            );
            continue;
        };

        if !questions.contains(target.as_str()) {
            push(
                LintCode::RuleUnknownTarget,
                format!("rule '{}' targets unknown question '{}'", rule.id, target),
            );
        }
        if !questions.contains(trigger.as_str()) {
            push(
                LintCode::RuleUnknownTrigger,
                format!(
                    "rule '{}' is triggered by unknown question '{}'",
                    rule.id, trigger
                ),
            );
        }
        if trigger == target {
            push(
                LintCode::RuleSelfReference,
                format!(
                    "rule '{}' makes question '{}' depend on itself and is ignored",
                    rule.id, target
                ),
            );
        }
        match option_owner.get(option.as_str()) {
            None => push(
                LintCode::RuleUnknownOption,
                format!("rule '{}' waits for unknown option '{}'", rule.id, option),
            ),
            Some(owner) if *owner != trigger.as_str() => push(
                LintCode::RuleOptionMismatch,
                format!(
                    "rule '{}' waits for option '{}' of question '{}', not of its trigger '{}'",
                    rule.id, option, owner, trigger
                ),
            ),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(spec: &FormSpec) -> Vec<LintCode> {
        lint(spec).into_iter().map(|issue| issue.code).collect()
    }

    #[test]
    fn clean_form_has_no_issues() {
        let spec = FormSpec::from_json_str(
            &json!({
                "id": 1, "title": "Clean",
                "questions": [
                    { "id": 1, "text": "Pick", "type": "multiple_choice",
                      "options": [{ "id": 5, "text": "Yes" }] },
                    { "id": 2, "text": "Group", "type": "section" },
                    { "id": 3, "text": "Why", "type": "text", "parentId": 2 }
                ],
                "rules": [
                    { "id": 1, "targetQuestionId": 2, "triggerQuestionId": 1, "triggerOptionId": 5 }
                ]
            })
            .to_string(),
        )
        .expect("form");
        assert!(lint(&spec).is_empty());
    }

    #[test]
    fn structural_problems_are_reported() {
        let spec = FormSpec::from_json_str(
            &json!({
                "id": 1, "title": "Broken",
                "questions": [
                    { "id": 1, "text": "Leaf", "type": "text",
                      "options": [{ "id": 9, "text": "never" }] },
                    { "id": 2, "text": "Under leaf", "type": "text", "parentId": 1 },
                    { "id": 3, "text": "Orphan", "type": "text", "parentId": 99 },
                    { "id": 4, "text": "Loop A", "type": "section", "parentId": 5 },
                    { "id": 5, "text": "Loop B", "type": "section", "parentId": 4 },
                    { "id": 1, "text": "Again", "type": "text" }
                ]
            })
            .to_string(),
        )
        .expect("form");
        let found = codes(&spec);
        assert!(found.contains(&LintCode::DuplicateQuestionId));
        assert!(found.contains(&LintCode::OptionsOnNonChoice));
        assert!(found.contains(&LintCode::ParentNotSection));
        assert!(found.contains(&LintCode::MissingParent));
        assert_eq!(
            found
                .iter()
                .filter(|code| **code == LintCode::UnreachableQuestion)
                .count(),
            2
        );
    }

    #[test]
    fn dangling_rules_are_reported() {
        let spec = FormSpec::from_json_str(
            &json!({
                "id": 1, "title": "Rules",
                "questions": [
                    { "id": 1, "text": "A", "type": "multiple_choice",
                      "options": [{ "id": 10, "text": "x" }] },
                    { "id": 2, "text": "B", "type": "multiple_choice",
                      "options": [{ "id": 20, "text": "y" }] }
                ],
                "rules": [
                    { "id": 1, "targetQuestionId": 77, "triggerQuestionId": 88, "triggerOptionId": 99 },
                    { "id": 2, "targetQuestionId": 2, "triggerQuestionId": 2, "triggerOptionId": 20 },
                    { "id": 3, "targetQuestionId": 2, "triggerQuestionId": 1, "triggerOptionId": 20 }
                ]
            })
            .to_string(),
        )
        .expect("form");
        assert_eq!(
            codes(&spec),
            vec![
                LintCode::RuleUnknownTarget,
                LintCode::RuleUnknownTrigger,
                LintCode::RuleUnknownOption,
                LintCode::RuleSelfReference,
                LintCode::RuleOptionMismatch,
            ]
        );
    }

    #[test]
    fn incomplete_and_unknown_action_rules_are_reported() {
        let spec = FormSpec::from_json_str(
            &json!({
                "id": 1, "title": "Nullable",
                "questions": [
                    { "id": 1, "text": "A", "type": "multiple_choice",
                      "options": [{ "id": 10, "text": "x" }] },
                    { "id": 2, "text": "B", "type": "text" }
                ],
                "rules": [
                    { "id": 1, "targetQuestionId": 2, "triggerQuestionId": 1,
                      "triggerOptionId": null, "action": "HIDE" },
                    { "id": 2, "targetQuestionId": 2, "triggerQuestionId": 1,
                      "triggerOptionId": 10, "action": null }
                ]
            })
            .to_string(),
        )
        .expect("form");
        assert_eq!(
            codes(&spec),
            vec![LintCode::RuleIncomplete, LintCode::RuleUnknownAction]
        );
    }
}
