use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::answers::Answers;
use crate::spec::{
    form::FormSpec,
    id::ItemId,
    question::QuestionSpec,
    rule::{LogicRule, RuleAction},
};
use crate::tree::FormTree;

pub type VisibilityMap = BTreeMap<String, bool>;

/// Whether `question` is visible under `rules` for the given answers.
///
/// This is the single evaluator shared by the live preview and the document
/// compiler.
pub fn is_visible(question: &QuestionSpec, rules: &[LogicRule], answers: &Answers) -> bool {
    evaluate(
        &question.id,
        rules
            .iter()
            .filter(|rule| rule.targets(&question.id)),
        answers,
    )
}

/// Core policy. Without rules a question is visible. Any SHOW rule makes it
/// hidden unless one SHOW rule matches. A matching HIDE rule always wins.
/// Rules with an unknown action are skipped; rules missing a trigger never
/// match.
fn evaluate<'r>(
    target: &ItemId,
    rules: impl IntoIterator<Item = &'r LogicRule>,
    answers: &Answers,
) -> bool {
    let mut has_show = false;
    let mut show_matched = false;
    let mut hide_matched = false;

    for rule in rules {
        // a question never controls itself
        if rule.trigger_question_id.as_ref() == Some(target) {
            continue;
        }
        let matched = rule
            .trigger()
            .is_some_and(|(question, option)| answers.selects(question, option));
        match rule.action {
            RuleAction::Show => {
                has_show = true;
                show_matched |= matched;
            }
            RuleAction::Hide => hide_matched |= matched,
            RuleAction::Unknown => {}
        }
    }

    let visible = if hide_matched {
        false
    } else if has_show {
        show_matched
    } else {
        true
    };
    trace!(question = %target, has_show, show_matched, hide_matched, visible, "visibility");
    visible
}

/// Rules of one form grouped by target question.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex<'a> {
    by_target: HashMap<&'a str, Vec<&'a LogicRule>>,
}

impl<'a> RuleIndex<'a> {
    pub fn new(rules: &'a [LogicRule]) -> Self {
        let mut by_target: HashMap<&'a str, Vec<&'a LogicRule>> = HashMap::new();
        for rule in rules {
            if let Some(target) = &rule.target_question_id {
                by_target.entry(target.as_str()).or_default().push(rule);
            }
        }
        Self { by_target }
    }

    pub fn rules_for(&self, target: &ItemId) -> &[&'a LogicRule] {
        self.by_target
            .get(target.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_visible(&self, question: &QuestionSpec, answers: &Answers) -> bool {
        evaluate(
            &question.id,
            self.rules_for(&question.id).iter().copied(),
            answers,
        )
    }
}

/// Own visibility of every question, ignoring ancestors.
pub fn resolve_visibility(spec: &FormSpec, answers: &Answers) -> VisibilityMap {
    let index = RuleIndex::new(&spec.rules);
    spec.questions
        .iter()
        .map(|question| {
            (
                question.id.to_string(),
                index.is_visible(question, answers),
            )
        })
        .collect()
}

/// Visibility as rendered: a question shows only when it and every ancestor
/// section are visible. Questions unreachable from the root are hidden.
pub fn resolve_effective_visibility(spec: &FormSpec, answers: &Answers) -> VisibilityMap {
    let index = RuleIndex::new(&spec.rules);
    let tree = FormTree::build(&spec.questions);

    let mut map: VisibilityMap = spec
        .questions
        .iter()
        .map(|question| (question.id.to_string(), false))
        .collect();
    for node in tree.walk(|question| index.is_visible(question, answers)) {
        map.insert(node.question.id.to_string(), true);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(id: &str, target: &str, trigger: &str, option: &str, action: RuleAction) -> LogicRule {
        LogicRule {
            id: id.into(),
            target_question_id: Some(target.into()),
            trigger_question_id: Some(trigger.into()),
            trigger_option_id: Some(option.into()),
            action,
        }
    }

    fn question(id: &str) -> QuestionSpec {
        serde_json::from_value(json!({ "id": id, "text": id, "type": "text" })).expect("question")
    }

    #[test]
    fn unruled_questions_are_always_visible() {
        let rules = vec![rule("r1", "other", "q1", "1", RuleAction::Show)];
        let answers = Answers::from_value(&json!({ "q1": "2" }));
        assert!(is_visible(&question("q2"), &rules, &answers));
        assert!(is_visible(&question("q2"), &[], &Answers::new()));
    }

    #[test]
    fn show_rule_hides_by_default() {
        let rules = vec![rule("r1", "q2", "q1", "2", RuleAction::Show)];
        let target = question("q2");
        assert!(!is_visible(&target, &rules, &Answers::new()));
        assert!(!is_visible(
            &target,
            &rules,
            &Answers::from_value(&json!({ "q1": 1 }))
        ));
        assert!(is_visible(
            &target,
            &rules,
            &Answers::from_value(&json!({ "q1": 2 }))
        ));
        assert!(is_visible(
            &target,
            &rules,
            &Answers::from_value(&json!({ "q1": [1, "2"] }))
        ));
    }

    #[test]
    fn any_show_rule_is_enough() {
        let rules = vec![
            rule("r1", "q3", "q1", "a", RuleAction::Show),
            rule("r2", "q3", "q2", "b", RuleAction::Show),
        ];
        let answers = Answers::from_value(&json!({ "q2": "b" }));
        assert!(is_visible(&question("q3"), &rules, &answers));
    }

    #[test]
    fn hide_rule_only_hides_when_matched() {
        let rules = vec![rule("r1", "q2", "q1", "2", RuleAction::Hide)];
        let target = question("q2");
        assert!(is_visible(&target, &rules, &Answers::new()));
        assert!(!is_visible(
            &target,
            &rules,
            &Answers::from_value(&json!({ "q1": "2" }))
        ));
    }

    #[test]
    fn hide_overrides_matching_show() {
        let rules = vec![
            rule("r1", "q2", "q1", "2", RuleAction::Show),
            rule("r2", "q2", "q1", "2", RuleAction::Hide),
        ];
        let answers = Answers::from_value(&json!({ "q1": 2 }));
        assert!(!is_visible(&question("q2"), &rules, &answers));
    }

    #[test]
    fn self_referencing_rules_are_ignored() {
        let rules = vec![rule("r1", "q1", "q1", "x", RuleAction::Show)];
        assert!(is_visible(&question("q1"), &rules, &Answers::new()));
    }

    #[test]
    fn incomplete_and_unknown_rules_never_match() {
        let mut missing_option = rule("r1", "q2", "q1", "2", RuleAction::Hide);
        missing_option.trigger_option_id = None;
        let unknown_action = rule("r2", "q2", "q1", "2", RuleAction::Unknown);
        let rules = vec![missing_option, unknown_action];
        let answers = Answers::from_value(&json!({ "q1": "2" }));
        assert!(is_visible(&question("q2"), &rules, &answers));

        let mut untargeted = rule("r3", "q2", "q1", "2", RuleAction::Show);
        untargeted.target_question_id = None;
        let rules = vec![untargeted];
        assert!(RuleIndex::new(&rules).is_visible(&question("q2"), &Answers::new()));
    }

    #[test]
    fn integral_float_answers_match_integer_options() {
        let rules = vec![rule("r1", "q2", "q1", "2", RuleAction::Show)];
        let answers = Answers::from_value(&json!({ "q1": 2.0 }));
        assert!(is_visible(&question("q2"), &rules, &answers));
    }

    #[test]
    fn index_and_linear_evaluation_agree() {
        let rules = vec![
            rule("r1", "q2", "q1", "2", RuleAction::Show),
            rule("r2", "q2", "q1", "3", RuleAction::Hide),
            rule("r3", "q3", "q1", "3", RuleAction::Show),
        ];
        let index = RuleIndex::new(&rules);
        for answer in [json!({}), json!({ "q1": 2 }), json!({ "q1": [2, 3] })] {
            let answers = Answers::from_value(&answer);
            for id in ["q1", "q2", "q3"] {
                let target = question(id);
                assert_eq!(
                    index.is_visible(&target, &answers),
                    is_visible(&target, &rules, &answers)
                );
            }
        }
    }
}
