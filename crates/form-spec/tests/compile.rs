use serde_json::{Value, json};

use form_spec::{
    Answers, Block, FormSpec, FormTree, OptionResolver, RuleIndex, compile, compile_document,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "intake_form" => include_str!("fixtures/intake_form.json"),
        "intake_answers" => include_str!("fixtures/intake_answers.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn intake() -> FormSpec {
    FormSpec::from_json_str(fixture("intake_form")).expect("deserialize")
}

fn answers(value: Value) -> Answers {
    Answers::from_value(&value)
}

fn section(text: &str, depth: usize) -> Block {
    Block::SectionHeader {
        text: text.into(),
        depth,
    }
}

fn row(label: &str, value_text: &str, depth: usize) -> Block {
    Block::LabelValueRow {
        label: label.into(),
        value_text: value_text.into(),
        depth,
    }
}

fn standalone(label: &str, value_text: &str) -> Block {
    Block::StandaloneQuestion {
        label: label.into(),
        value_text: value_text.into(),
        answered: !value_text.is_empty(),
    }
}

#[test]
fn section_with_unanswered_leaf_emits_header_then_empty_row() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "c",
        "title": "Scenario C",
        "questions": [
            { "id": "s", "text": "Household", "type": "section" },
            { "id": "q3", "text": "Who lives with you?", "type": "text", "parentId": "s" }
        ]
    }))
    .expect("deserialize");

    let document = compile_document(&spec, &Answers::new());
    assert_eq!(
        document.blocks,
        vec![section("Household", 0), row("Who lives with you?", "", 1)]
    );
}

#[test]
fn multi_select_answers_resolve_to_joined_labels() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "d",
        "title": "Scenario D",
        "questions": [
            {
                "id": "q",
                "text": "Colours",
                "type": "multiple_choice",
                "allowMultipleAnswers": true,
                "options": [
                    { "id": 1, "text": "Red", "orderIndex": 0 },
                    { "id": 3, "text": "Blue", "orderIndex": 1 }
                ]
            }
        ]
    }))
    .expect("deserialize");

    let document = compile_document(&spec, &answers(json!({ "q": [1, 3] })));
    assert_eq!(document.blocks, vec![standalone("Colours", "Red, Blue")]);
}

#[test]
fn unanswered_form_hides_show_targets() {
    let document = compile_document(&intake(), &Answers::new());
    assert_eq!(document.title, "Intake interview");
    assert_eq!(
        document.blocks,
        vec![
            section("Client", 0),
            row("Full name", "", 1),
            row("Referral type", "", 1),
            standalone("Goals", ""),
            standalone("Remarks", ""),
        ]
    );
}

#[test]
fn answered_form_reveals_nested_section_and_resolves_labels() {
    let answers = answers(serde_json::from_str(fixture("intake_answers")).expect("answers"));
    let document = compile_document(&intake(), &answers);
    assert_eq!(
        document.blocks,
        vec![
            section("Client", 0),
            row("Full name", "Ada Lovelace", 1),
            row("Referral type", "Specialist", 1),
            section("Specialist details", 1),
            row("Specialism", "Neurology", 2),
            row("Referral date", "", 2),
            standalone("Goals", "Mobility, Work"),
            standalone("Hours worked per week", "16"),
            standalone("Remarks", ""),
        ]
    );
}

#[test]
fn hide_rule_removes_root_question() {
    let document = compile_document(&intake(), &answers(json!({ "3": "31" })));
    assert!(!document.blocks.iter().any(|block| matches!(
        block,
        Block::StandaloneQuestion { label, .. } if label == "Remarks"
    )));
}

#[test]
fn visible_section_keeps_header_when_all_children_are_hidden() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "e",
        "title": "Empty section",
        "questions": [
            { "id": 1, "text": "Trigger", "type": "multiple_choice",
              "options": [{ "id": 10, "text": "Yes" }] },
            { "id": 2, "text": "Group", "type": "section", "orderIndex": 1 },
            { "id": 3, "text": "Only when yes", "type": "text", "parentId": 2 }
        ],
        "rules": [
            { "id": 1, "targetQuestionId": 3, "triggerQuestionId": 1, "triggerOptionId": 10 }
        ]
    }))
    .expect("deserialize");

    let document = compile_document(&spec, &Answers::new());
    assert_eq!(
        document.blocks,
        vec![standalone("Trigger", ""), section("Group", 0)]
    );
}

#[test]
fn compiling_twice_yields_identical_blocks() {
    let spec = intake();
    let answers = answers(serde_json::from_str(fixture("intake_answers")).expect("answers"));
    let tree = FormTree::build(&spec.questions);
    let rules = RuleIndex::new(&spec.rules);
    let options = OptionResolver::for_form(&spec);

    let first = compile(&tree, &rules, &answers, &options);
    let second = compile(&tree, &rules, &answers, &options);
    assert_eq!(first, second);
    assert_eq!(first, compile_document(&spec, &answers).blocks);
}

#[test]
fn inert_rules_never_break_compilation() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "inert",
        "title": "Inert",
        "questions": [
            { "id": 1, "text": "Name", "type": "text" }
        ],
        "rules": [
            { "id": 1, "targetQuestionId": 404, "triggerQuestionId": 1, "triggerOptionId": 5 },
            { "id": 2, "targetQuestionId": 1, "triggerQuestionId": 405, "triggerOptionId": 6,
              "action": "HIDE" }
        ]
    }))
    .expect("deserialize");

    let document = compile_document(&spec, &answers(json!({ "1": { "odd": "shape" } })));
    assert_eq!(
        document.blocks,
        vec![standalone("Name", r#"{"odd":"shape"}"#)]
    );
}

#[test]
fn rules_with_null_references_are_inert() {
    let spec = FormSpec::from_json_str(
        &json!({
            "id": 3,
            "title": "Nullable",
            "questions": [
                { "id": 1, "text": "Pick", "type": "multiple_choice", "orderIndex": 0,
                  "options": [{ "id": 1, "text": "A" }, { "id": 2, "text": "B" }] },
                { "id": 2, "text": "Name", "type": "text", "orderIndex": 1 },
                { "id": 3, "text": "Extra", "type": "text", "orderIndex": 2 }
            ],
            "rules": [
                { "id": 1, "targetQuestionId": 2, "triggerQuestionId": 1,
                  "triggerOptionId": null, "action": "HIDE" },
                { "id": 2, "targetQuestionId": null, "triggerQuestionId": 1,
                  "triggerOptionId": 2, "action": "HIDE" },
                { "id": 3, "targetQuestionId": 2, "triggerQuestionId": 1,
                  "triggerOptionId": 2, "action": null },
                { "id": 4, "targetQuestionId": 3, "triggerQuestionId": 1,
                  "triggerOptionId": 2, "action": "SHOW" }
            ]
        })
        .to_string(),
    )
    .expect("nullable rules parse");

    let document = compile_document(
        &spec,
        &answers(json!({ "1": 2.0, "2": "Ada", "3": "More" })),
    );
    assert_eq!(
        document.blocks,
        vec![
            standalone("Pick", "B"),
            standalone("Name", "Ada"),
            standalone("Extra", "More"),
        ]
    );
}

#[test]
fn independent_compiles_run_in_parallel() {
    use rayon::prelude::*;

    let spec = intake();
    let sets: Vec<Answers> = vec![
        Answers::new(),
        answers(json!({ "3": 32 })),
        answers(json!({ "3": 31, "7": [73] })),
        answers(serde_json::from_str(fixture("intake_answers")).expect("answers")),
    ];

    let parallel: Vec<_> = sets
        .par_iter()
        .map(|answers| compile_document(&spec, answers))
        .collect();
    let sequential: Vec<_> = sets
        .iter()
        .map(|answers| compile_document(&spec, answers))
        .collect();
    assert_eq!(parallel, sequential);
}
