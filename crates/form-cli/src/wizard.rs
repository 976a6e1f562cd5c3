use std::collections::HashSet;
use std::path::Path;

use form_spec::RenderStatus;
use serde_json::Value;

/// Controls which bits of state the fill session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: status, visible questions and option lists.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints the live preview around each prompt.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &WizardPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_title);
        if let Some(help) = &payload.help {
            println!("{}", help);
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &WizardPayload) {
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
            self.print_visible_questions(payload);
        }
    }

    fn print_visible_questions(&self, payload: &WizardPayload) {
        println!("Visible questions:");
        for question in payload.questions.iter().filter(|question| question.visible) {
            let indent = "  ".repeat(question.depth);
            if question.kind == QuestionKind::Section {
                println!("{} # {}", indent, question.text);
                continue;
            }
            let mut entry = format!("{} - {} ({})", indent, question.id, question.text);
            if let Some(display) = &question.display_value {
                entry.push_str(&format!(" = {}", display));
            }
            println!("{}", entry);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = if prompt.total > 0 {
            format!("{}/{} {}", prompt.index, prompt.total, prompt.text)
        } else {
            format!("{} {}", prompt.index, prompt.text)
        };
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        for (position, option) in prompt.options.iter().enumerate() {
            if self.verbosity.is_verbose() {
                println!("  {}. {} [{}]", position + 1, option.text, option.id);
            } else {
                println!("  {}. {}", position + 1, option.text);
            }
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_completion(&self, document: &Path, answers: &Value) {
        println!("Done. Document written to {}", document.display());
        if self.show_answers_json {
            match serde_json::to_string_pretty(answers) {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
            }
        }
    }
}

/// Preview payload read back from the component output.
pub struct WizardPayload {
    pub form_title: String,
    pub help: Option<String>,
    pub status: RenderStatus,
    pub progress: FillProgress,
    pub questions: Vec<WizardQuestion>,
}

impl WizardPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let form_title = json
            .get("form_title")
            .and_then(Value::as_str)
            .ok_or_else(|| "preview payload missing form_title".to_string())?
            .to_string();
        let help = json
            .get("help")
            .and_then(Value::as_str)
            .map(|value| value.to_string());
        let status = RenderStatus::from_label(
            json.get("status")
                .and_then(Value::as_str)
                .unwrap_or("need_input"),
        );
        let progress = json
            .get("progress")
            .and_then(Value::as_object)
            .ok_or_else(|| "preview payload missing progress".to_string())?;
        let answered = progress
            .get("answered")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let total = progress.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
        let questions = json
            .get("questions")
            .and_then(Value::as_array)
            .ok_or_else(|| "preview payload missing questions".to_string())?
            .iter()
            .map(WizardQuestion::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            form_title,
            help,
            status,
            progress: FillProgress { answered, total },
            questions,
        })
    }

    /// First visible, unanswered leaf in tree order that was not skipped.
    pub fn next_prompt(&self, skipped: &HashSet<String>) -> Option<&WizardQuestion> {
        self.questions.iter().find(|question| {
            question.visible
                && question.kind != QuestionKind::Section
                && question.display_value.is_none()
                && !skipped.contains(&question.id)
        })
    }
}

pub struct FillProgress {
    pub answered: usize,
    pub total: usize,
}

#[derive(Clone)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

/// Minimal view of a question used for prompting.
pub struct WizardQuestion {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: QuestionKind,
    pub depth: usize,
    pub required: bool,
    pub multiple: bool,
    pub visible: bool,
    pub options: Vec<ChoiceOption>,
    pub display_value: Option<String>,
}

impl WizardQuestion {
    fn from_json(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| "question missing id".to_string())?
            .to_string();
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("question '{}' missing text", id))?
            .to_string();
        let optional_text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(|value| value.to_string())
        };
        let options = value
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| {
                        Some(ChoiceOption {
                            id: option.get("id")?.as_str()?.to_string(),
                            text: option.get("text")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            description: optional_text("description"),
            placeholder: optional_text("placeholder"),
            display_value: optional_text("display_value").filter(|display| !display.is_empty()),
            kind: QuestionKind::from_label(
                value.get("type").and_then(Value::as_str).unwrap_or("text"),
            ),
            depth: value.get("depth").and_then(Value::as_u64).unwrap_or(0) as usize,
            required: value
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            multiple: value
                .get("multiple")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            visible: value
                .get("visible")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            options,
            id,
            text,
        })
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub options: Vec<ChoiceOption>,
}

impl PromptContext {
    pub fn new(question: &WizardQuestion, progress: &FillProgress) -> Self {
        Self {
            index: (progress.answered + 1).max(1),
            total: progress.total,
            text: question.text.clone(),
            description: question.description.clone(),
            required: question.required,
            hint: question.kind.hint(question.multiple, question.placeholder.as_deref()),
            options: question.options.clone(),
        }
    }
}

/// Question kinds as labelled in the preview payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    Section,
    MultipleChoice,
    Text,
    Date,
    Number,
}

impl QuestionKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "section" => QuestionKind::Section,
            "multiple_choice" => QuestionKind::MultipleChoice,
            "date" => QuestionKind::Date,
            "number" => QuestionKind::Number,
            _ => QuestionKind::Text,
        }
    }

    fn hint(&self, multiple: bool, placeholder: Option<&str>) -> Option<String> {
        match self {
            QuestionKind::MultipleChoice if multiple => {
                Some("(numbers or ids, comma separated)".to_string())
            }
            QuestionKind::MultipleChoice => Some("(number or id)".to_string()),
            QuestionKind::Date => Some("(YYYY-MM-DD)".to_string()),
            QuestionKind::Number => Some("(number)".to_string()),
            QuestionKind::Text => placeholder.map(|text| format!("({})", text)),
            QuestionKind::Section => None,
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
