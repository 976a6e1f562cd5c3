use serde_json::{Value, json};

use form_spec::{
    Answers, Emphasis, FooterImage, FormSpec, RenderStatus, StyleSheet, build_render_payload,
    compile_document, render_json_ui, render_markdown, render_text,
};

fn intake() -> FormSpec {
    FormSpec::from_json_str(include_str!("fixtures/intake_form.json")).expect("deserialize")
}

fn intake_answers() -> Answers {
    let value: Value =
        serde_json::from_str(include_str!("fixtures/intake_answers.json")).expect("answers");
    Answers::from_value(&value)
}

#[test]
fn markdown_lays_out_sections_as_tables_and_root_questions_as_paragraphs() {
    let document = compile_document(&intake(), &intake_answers());
    let markdown = render_markdown(&document, &StyleSheet::default(), None).expect("markdown");

    assert!(markdown.starts_with("# Intake interview\n\n"));
    assert!(markdown.contains("Occupational therapy intake, first appointment.\n"));
    assert!(markdown.contains("| **Client** | |\n|---|---|\n| Full name | Ada Lovelace |\n"));
    assert!(markdown.contains("| Referral type | Specialist |\n| **Specialist details** | |\n"));
    assert!(markdown.contains("| &emsp;Specialism | Neurology |\n"));
    assert!(markdown.contains("### Goals\n\n**Mobility, Work**\n"));
    assert!(markdown.contains("### Hours worked per week\n\n**16**\n"));

    let remarks = markdown.find("### Remarks").expect("remarks heading");
    assert!(markdown[remarks..].contains("\\_\\_\\_\\_"));
    assert!(!markdown.contains("<img"));
}

#[test]
fn emphasis_everywhere_bolds_row_labels() {
    let document = compile_document(&intake(), &intake_answers());
    let style = StyleSheet {
        emphasis: Emphasis::Everywhere,
        ..StyleSheet::default()
    };
    let markdown = render_markdown(&document, &style, None).expect("markdown");
    assert!(markdown.contains("| **Full name** | Ada Lovelace |"));
}

#[test]
fn footer_image_is_appended_last() {
    let document = compile_document(&intake(), &Answers::new());
    let footer = FooterImage {
        path: "assets/logo.png".into(),
        width: 120,
        height: 40,
    };
    let markdown =
        render_markdown(&document, &StyleSheet::default(), Some(&footer)).expect("markdown");
    assert!(
        markdown
            .trim_end()
            .ends_with(r#"<img src="assets/logo.png" width="120" height="40" alt="footer">"#)
    );
}

#[test]
fn preview_of_empty_answers_points_at_first_required_question() {
    let payload = build_render_payload(&intake(), &Answers::new());
    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.next_question_id.as_deref(), Some("2"));
    assert_eq!(payload.progress.answered, 0);
    assert_eq!(payload.progress.total, 4);

    let specialist = payload.question("5").expect("listed even when hidden");
    assert!(!specialist.visible);
    assert_eq!(specialist.depth, 2);
}

#[test]
fn preview_completes_once_visible_required_questions_are_answered() {
    let payload = build_render_payload(&intake(), &intake_answers());
    assert_eq!(payload.status, RenderStatus::Complete);
    assert_eq!(payload.next_question_id, None);
    assert_eq!(payload.progress.answered, 5);
    assert_eq!(payload.progress.total, 7);
    assert_eq!(
        payload.question("7").map(|question| question.display_value.as_str()),
        Some("Mobility, Work")
    );
}

#[test]
fn json_ui_carries_options_and_answer_schema() {
    let payload = build_render_payload(&intake(), &Answers::from_value(&json!({ "3": "32" })));
    let ui = render_json_ui(&payload);

    assert_eq!(ui["form_id"], "12");
    assert_eq!(ui["status"], "need_input");
    assert_eq!(ui["next_question_id"], "2");

    let questions = ui["questions"].as_array().expect("questions");
    let referral = questions
        .iter()
        .find(|question| question["id"] == "3")
        .expect("referral");
    assert_eq!(referral["display_value"], "Specialist");
    assert_eq!(referral["options"][1], json!({ "id": "32", "text": "Specialist" }));

    let properties = ui["schema"]["properties"].as_object().expect("properties");
    assert!(properties.contains_key("5"));
    assert!(!properties.contains_key("8"));
    assert!(!properties.contains_key("1"));
}

#[test]
fn text_preview_lists_visible_questions_with_indentation() {
    let payload = build_render_payload(&intake(), &Answers::from_value(&json!({ "2": "Ada" })));
    let text = render_text(&payload);

    assert!(text.starts_with("Form: Intake interview (12)\nStatus: need_input (1/4)"));
    assert!(text.contains("Next question: 3\n  Text: Referral type"));
    assert!(text.contains(" # Client"));
    assert!(text.contains("   - 2 (Full name) [required] = Ada"));
    assert!(!text.contains("Specialism"));
}
