use serde_json::{Map, Value, json};

use crate::{
    answers::Answers,
    answers_schema,
    compile::display_value,
    options::OptionResolver,
    spec::{form::FormSpec, question::QuestionType},
    tree::FormTree,
    visibility::resolve_effective_visibility,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required question is still unanswered.
    NeedInput,
    /// All visible required questions are answered.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }

    /// Unknown labels read as `NeedInput`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "complete" => RenderStatus::Complete,
            _ => RenderStatus::NeedInput,
        }
    }
}

/// Progress counters over visible leaf questions.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct RenderOption {
    pub id: String,
    pub text: String,
}

/// Describes a single question for the live preview.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: QuestionType,
    pub depth: usize,
    pub required: bool,
    pub multiple: bool,
    pub visible: bool,
    pub current_value: Option<Value>,
    pub display_value: String,
    pub options: Vec<RenderOption>,
}

impl RenderQuestion {
    pub fn is_leaf(&self) -> bool {
        !self.kind.is_section()
    }

    pub fn is_answered(&self) -> bool {
        !self.display_value.is_empty()
    }
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub help: Option<String>,
    pub status: RenderStatus,
    pub next_question_id: Option<String>,
    pub progress: RenderProgress,
    pub questions: Vec<RenderQuestion>,
    pub schema: Value,
}

impl RenderPayload {
    pub fn visible_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| question.visible)
            .count()
    }

    pub fn question(&self, id: &str) -> Option<&RenderQuestion> {
        self.questions.iter().find(|question| question.id == id)
    }
}

/// Build the preview payload for the current answers.
///
/// Questions are listed in tree order. Visibility is the rendered one: a
/// question inside a hidden section is not visible either.
pub fn build_render_payload(spec: &FormSpec, answers: &Answers) -> RenderPayload {
    let visibility = resolve_effective_visibility(spec, answers);
    let tree = FormTree::build(&spec.questions);
    let resolver = OptionResolver::for_form(spec);

    let questions = tree
        .reachable()
        .into_iter()
        .map(|node| {
            let question = node.question;
            RenderQuestion {
                id: question.id.to_string(),
                text: question.text.clone(),
                description: question.description.clone(),
                placeholder: question.placeholder.clone(),
                kind: question.kind,
                depth: node.depth,
                required: question.required,
                multiple: question.is_multi_select(),
                visible: visibility
                    .get(question.id.as_str())
                    .copied()
                    .unwrap_or(false),
                current_value: answers.get(&question.id).cloned(),
                display_value: display_value(question, answers.get(&question.id), &resolver),
                options: question
                    .ordered_options()
                    .into_iter()
                    .map(|option| RenderOption {
                        id: option.id.to_string(),
                        text: option.text.clone(),
                    })
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    let visible_leaves = || {
        questions
            .iter()
            .filter(|question| question.visible && question.is_leaf())
    };
    let total = visible_leaves().count();
    let answered = visible_leaves()
        .filter(|question| question.is_answered())
        .count();
    let next_question_id = visible_leaves()
        .find(|question| question.required && !question.is_answered())
        .map(|question| question.id.clone());

    let status = if next_question_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        form_id: spec.id.to_string(),
        form_title: spec.title.clone(),
        help: spec.description.clone(),
        status,
        next_question_id,
        progress: RenderProgress { answered, total },
        schema: answers_schema::generate(spec, &visibility),
        questions,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let questions = payload
        .questions
        .iter()
        .map(|question| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(question.id.clone()));
            map.insert("text".into(), Value::String(question.text.clone()));
            map.insert(
                "description".into(),
                question
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(question.kind.as_str().into()));
            map.insert("depth".into(), Value::from(question.depth));
            map.insert("required".into(), Value::Bool(question.required));
            map.insert("visible".into(), Value::Bool(question.visible));
            if let Some(placeholder) = &question.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if question.kind == QuestionType::MultipleChoice {
                map.insert("multiple".into(), Value::Bool(question.multiple));
                map.insert(
                    "options".into(),
                    Value::Array(
                        question
                            .options
                            .iter()
                            .map(|option| json!({ "id": option.id, "text": option.text }))
                            .collect(),
                    ),
                );
            }
            if let Some(current_value) = &question.current_value {
                map.insert("current_value".into(), current_value.clone());
                map.insert(
                    "display_value".into(),
                    Value::String(question.display_value.clone()),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "status": payload.status.as_str(),
        "next_question_id": payload.next_question_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "questions": questions,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    if let Some(next_question) = &payload.next_question_id {
        lines.push(format!("Next question: {}", next_question));
        if let Some(question) = payload.question(next_question) {
            lines.push(format!("  Text: {}", question.text));
            if let Some(description) = &question.description {
                lines.push(format!("  Description: {}", description));
            }
        }
    } else {
        lines.push("All visible required questions are answered.".to_string());
    }

    lines.push("Visible questions:".to_string());
    for question in payload.questions.iter().filter(|question| question.visible) {
        let indent = "  ".repeat(question.depth);
        if question.kind.is_section() {
            lines.push(format!("{} # {}", indent, question.text));
            continue;
        }
        let mut entry = format!("{} - {} ({})", indent, question.id, question.text);
        if question.required {
            entry.push_str(" [required]");
        }
        if question.is_answered() {
            entry.push_str(&format!(" = {}", question.display_value));
        }
        lines.push(entry);
    }

    lines.join("\n")
}
