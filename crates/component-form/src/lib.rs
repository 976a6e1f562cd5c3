use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{
    Answers, ExportConfig, FormError, FormSpec, ItemId, RenderPayload, TemplateEngine,
    answers_schema, build_render_payload, compile_document, is_visible, lint,
    render_json_ui as form_render_json_ui, render_markdown as form_render_markdown,
    render_text as form_render_text, resolve_effective_visibility, resolve_visibility, validate,
};

const DEFAULT_SPEC: &str = include_str!("../../form-spec/tests/fixtures/intake_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse {0}: {1}")]
    AnswersParse(&'static str, #[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
    #[serde(default)]
    export: Option<ExportConfig>,
}

fn parse_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_form_spec(config: &ComponentConfig) -> Result<FormSpec, ComponentError> {
    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);
    Ok(FormSpec::from_json_str(spec_json)?)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(&parse_config(config_json)?)?;
    if spec.id.as_str() != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        debug!(form = form_id, questions = spec.questions.len(), "form loaded");
        Ok(spec)
    }
}

/// Answer payloads are lenient: unparsable input is an empty answer set.
fn parse_answers(answers_json: &str) -> Answers {
    let value = serde_json::from_str(answers_json).unwrap_or_else(|_| Value::Object(Map::new()));
    Answers::from_value(&value)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| to_json(&spec)))
}

pub fn visibility(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let answers = parse_answers(answers_json);
        to_json(&resolve_visibility(&spec, &answers))
    }))
}

/// Own visibility of one question. Unknown ids are reported as errors.
pub fn question_visible(
    form_id: &str,
    config_json: &str,
    question_id: &str,
    answers_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let answers = parse_answers(answers_json);
        let question = spec.question(&ItemId::from(question_id))?;
        Ok(json!({
            "question_id": question.id,
            "visible": is_visible(question, &spec.rules, &answers),
        }))
    }))
}

pub fn get_answer_schema(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let answers = parse_answers(answers_json);
        let visibility = resolve_effective_visibility(&spec, &answers);
        answers_schema(&spec, &visibility)
    }))
}

pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let value: Value = serde_json::from_str(answers_json)
            .map_err(|err| ComponentError::AnswersParse("answers", err))?;
        to_json(&validate(&spec, &Answers::from_value(&value)))
    }))
}

pub fn lint_form(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| to_json(&lint(&spec))))
}

fn render_payload(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let spec = ensure_form(form_id, config_json)?;
    Ok(build_render_payload(&spec, &parse_answers(answers_json)))
}

pub fn next(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        render_payload(form_id, config_json, answers_json).map(|payload| {
            json!({
                "status": payload.status.as_str(),
                "next_question_id": payload.next_question_id,
                "progress": {
                    "answered": payload.progress.answered,
                    "total": payload.progress.total,
                },
            })
        }),
    )
}

pub fn render_text(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| form_render_text(&payload)),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| form_render_json_ui(&payload)),
    )
}

pub fn compile(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        to_json(&compile_document(&spec, &parse_answers(answers_json)))
    }))
}

/// Markdown document for the answers, styled by the config's `export` block.
pub fn render_markdown(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(parse_config(config_json).and_then(|config| {
        let spec = ensure_form(form_id, config_json)?;
        let export = config.export.unwrap_or_default();
        let document = compile_document(&spec, &parse_answers(answers_json));
        Ok(form_render_markdown(
            &document,
            &export.style,
            export.footer_image.as_ref(),
        )?)
    }))
}

pub fn output_filename(form_id: &str, config_json: &str) -> String {
    respond(parse_config(config_json).and_then(|config| {
        let spec = ensure_form(form_id, config_json)?;
        let export = config.export.unwrap_or_default();
        let filename = TemplateEngine::new().output_filename(&export.filename_template, &spec)?;
        Ok(json!({ "filename": filename }))
    }))
}

/// Records one answer and reports where the respondent stands afterwards.
pub fn submit_patch(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    question_id: &str,
    value_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let question_id = ItemId::from(question_id);
        spec.question(&question_id)?;
        let value: Value = serde_json::from_str(value_json)
            .map_err(|err| ComponentError::AnswersParse("answer value", err))?;
        let mut answers = parse_answers(answers_json);
        answers.insert(&question_id, value);

        let validation = validate(&spec, &answers);
        let payload = build_render_payload(&spec, &answers);
        let status = if validation.errors.is_empty() {
            payload.status.as_str()
        } else {
            "error"
        };
        Ok(json!({
            "status": status,
            "next_question_id": payload.next_question_id,
            "progress": {
                "answered": payload.progress.answered,
                "total": payload.progress.total,
            },
            "answers": answers.to_value(),
            "validation": to_json(&validation)?,
        }))
    }))
}
