mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use component_form::{question_visible, render_json_ui, render_text, submit_patch, visibility};
use form_spec::{
    Answers, CompiledDocument, ExportConfig, FooterImage, FormSpec, StyleSheet, TemplateEngine,
    ValidationResult, answers_schema, compile_document, config_schema, form_schema, lint,
    render_markdown, resolve_effective_visibility, validate,
};
use globset::{Glob, GlobMatcher};
use rayon::prelude::*;
use serde_json::{Number, Value, json};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wizard::{
    AnswerParseError, PromptContext, QuestionKind, Verbosity, WizardPayload, WizardPresenter,
    WizardQuestion,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "FORMDOC_OUTPUT_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional form preview and answer document export",
    long_about = "Evaluates SHOW/HIDE rules of a form snapshot against respondent answers, previews the visible questions and writes the answers document"
)]
struct Cli {
    /// Log debug output to stderr and show extra detail while filling in.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Export configuration JSON (style, footer image, filename template).
    #[arg(long, global = true, value_name = "CONFIG", env = "FORMDOC_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }

    /// Swaps a known document extension on a rendered name, appends otherwise.
    fn file_name(self, rendered: &str) -> String {
        let stem = [".md", ".json"]
            .iter()
            .find_map(|known| rendered.strip_suffix(known))
            .unwrap_or(rendered);
        format!("{}.{}", stem, self.extension())
    }

    /// Batch outputs are named after the answers file they came from.
    fn batch_file_name(self, stem: &str) -> String {
        match self {
            OutputFormat::Markdown => format!("{stem}.md"),
            OutputFormat::Json => format!("{stem}.compiled.json"),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    /// Schema of the form snapshot format.
    Form,
    /// Schema of the export configuration.
    Config,
    /// Schema of the answers to a form's visible questions.
    Answers,
}

#[derive(Subcommand)]
enum Command {
    /// Print which questions are visible for the given answers.
    Visible {
        /// Form snapshot (JSON, or CBOR with a .cbor extension).
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// JSON object of answers keyed by question id.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Only report this question.
        #[arg(long, value_name = "ID")]
        question: Option<String>,
    },
    /// Show the live preview: status, next question and visible questions.
    Preview {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Compile one set of answers into a document.
    Compile {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Output directory (defaults to FORMDOC_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        /// Print the document instead of writing a file.
        #[arg(long)]
        stdout: bool,
        /// Overwrite an existing document.
        #[arg(long)]
        force: bool,
    },
    /// Compile every answers file in a directory in parallel.
    Batch {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Directory holding the answers files.
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,
        /// Glob matched against answers file names.
        #[arg(long, default_value = "*.json")]
        pattern: String,
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        force: bool,
    },
    /// Validate answers against the questions currently visible.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Answer a form question by question, then write the document.
    Fill {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Answers to start from.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Also print the final answers as JSON.
        #[arg(long)]
        answers_json: bool,
        #[arg(long)]
        force: bool,
    },
    /// Print a JSON schema.
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
        /// Form snapshot, required for the answers schema.
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        /// Answers deciding which questions are visible.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
    },
    /// Report authoring problems such as rules pointing at unknown questions.
    Lint {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();
    match cli.command {
        Command::Visible {
            form,
            answers,
            question,
        } => run_visible(&form, answers.as_deref(), question.as_deref()),
        Command::Preview {
            form,
            answers,
            format,
        } => run_preview(&form, answers.as_deref(), format),
        Command::Compile {
            form,
            answers,
            out,
            format,
            stdout,
            force,
        } => run_compile(config, &form, &answers, out, format, stdout, force),
        Command::Batch {
            form,
            dir,
            pattern,
            out,
            format,
            force,
        } => run_batch(config, &form, &dir, &pattern, out, format, force),
        Command::Validate { form, answers } => run_validate(&form, &answers),
        Command::Fill {
            form,
            answers,
            out,
            answers_json,
            force,
        } => run_fill(
            config,
            &form,
            answers.as_deref(),
            out,
            cli.verbose,
            answers_json,
            force,
        ),
        Command::Schema {
            kind,
            form,
            answers,
        } => run_schema(kind, form.as_deref(), answers.as_deref()),
        Command::Lint { form } => run_lint(&form),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose {
        "formdoc=debug,form_spec=debug,component_form=debug"
    } else {
        "formdoc=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let is_cbor = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("cbor"));
    let spec = if is_cbor {
        FormSpec::from_cbor_slice(&fs::read(path)?)?
    } else {
        FormSpec::from_json_str(&fs::read_to_string(path)?)?
    };
    debug!(
        path = %path.display(),
        form = %spec.id,
        questions = spec.questions.len(),
        rules = spec.rules.len(),
        "loaded form snapshot"
    );
    Ok(spec)
}

fn load_answers(path: Option<&Path>) -> CliResult<Answers> {
    let Some(path) = path else {
        return Ok(Answers::new());
    };
    let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    if !value.is_object() {
        warn!(path = %path.display(), "answers file is not a JSON object; treating it as empty");
    }
    Ok(Answers::from_value(&value))
}

fn load_config(path: Option<&Path>) -> CliResult<ExportConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading export config");
            Ok(ExportConfig::from_json_str(&fs::read_to_string(path)?)?)
        }
        None => Ok(ExportConfig::default()),
    }
}

/// Config payload handing the snapshot to the component functions.
fn component_config(spec: &FormSpec) -> CliResult<String> {
    Ok(json!({ "form_spec_json": serde_json::to_string(spec)? }).to_string())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// Text responses are plain text unless the component reported an error.
fn component_text(response: String) -> CliResult<String> {
    if let Ok(value) = serde_json::from_str::<Value>(&response)
        && let Some(error) = value.get("error").and_then(Value::as_str)
    {
        return Err(error.into());
    }
    Ok(response)
}

fn run_visible(form: &Path, answers: Option<&Path>, question: Option<&str>) -> CliResult<()> {
    let spec = load_form(form)?;
    let answers_json = load_answers(answers)?.to_value().to_string();
    let form_id = spec.id.to_string();
    let config_json = component_config(&spec)?;
    let response = match question {
        Some(question_id) => question_visible(&form_id, &config_json, question_id, &answers_json),
        None => visibility(&form_id, &config_json, &answers_json),
    };
    let value = parse_component_result(&response)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_preview(form: &Path, answers: Option<&Path>, mode: RenderMode) -> CliResult<()> {
    let spec = load_form(form)?;
    let answers_json = load_answers(answers)?.to_value().to_string();
    let form_id = spec.id.to_string();
    let config_json = component_config(&spec)?;
    match mode {
        RenderMode::Text => {
            println!(
                "{}",
                component_text(render_text(&form_id, &config_json, &answers_json))?
            );
        }
        RenderMode::Json => {
            let ui = parse_component_result(&render_json_ui(&form_id, &config_json, &answers_json))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_compile(
    config_path: Option<&Path>,
    form: &Path,
    answers: &Path,
    out: Option<PathBuf>,
    format: OutputFormat,
    stdout: bool,
    force: bool,
) -> CliResult<()> {
    let spec = load_form(form)?;
    let answers = load_answers(Some(answers))?;
    let config = load_config(config_path)?;
    let document = compile_document(&spec, &answers);
    let contents = render_output(&document, &config.style, usable_footer(&config), format)?;

    if stdout {
        print!("{}", contents);
        return Ok(());
    }

    let root = resolve_output_root(out)?;
    let file_name = TemplateEngine::new().output_filename(&config.filename_template, &spec)?;
    let file_name = format.file_name(&file_name);
    let target = write_output(&root, Path::new(&file_name), &contents, force)?;
    println!("Wrote {}", target.display());
    Ok(())
}

fn run_batch(
    config_path: Option<&Path>,
    form: &Path,
    dir: &Path,
    pattern: &str,
    out: Option<PathBuf>,
    format: OutputFormat,
    force: bool,
) -> CliResult<()> {
    let spec = load_form(form)?;
    let config = load_config(config_path)?;
    let matcher = Glob::new(pattern)?.compile_matcher();
    let inputs = collect_answer_files(dir, &matcher, form)?;
    if inputs.is_empty() {
        return Err(format!(
            "no answers files in '{}' match '{}'",
            dir.display(),
            pattern
        )
        .into());
    }

    let root = resolve_output_root(out)?;
    let footer = usable_footer(&config);
    info!(files = inputs.len(), form = %spec.id, "compiling batch");

    let results: Vec<(PathBuf, Result<PathBuf, String>)> = inputs
        .par_iter()
        .map(|input| {
            let result = compile_answers_file(&spec, &config.style, footer, input, &root, format, force)
                .map_err(|error| error.to_string());
            (input.clone(), result)
        })
        .collect();

    let mut failures = 0;
    for (input, result) in &results {
        match result {
            Ok(target) => println!("{} -> {}", input.display(), target.display()),
            Err(error) => {
                failures += 1;
                eprintln!("{}: {}", input.display(), error);
            }
        }
    }

    if failures == 0 {
        Ok(())
    } else {
        Err(format!("{} of {} answers files failed", failures, results.len()).into())
    }
}

fn collect_answer_files(dir: &Path, matcher: &GlobMatcher, form: &Path) -> CliResult<Vec<PathBuf>> {
    let form = form.canonicalize().unwrap_or_else(|_| form.to_path_buf());
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        if path.canonicalize().is_ok_and(|canonical| canonical == form) {
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();
    Ok(inputs)
}

fn compile_answers_file(
    spec: &FormSpec,
    style: &StyleSheet,
    footer: Option<&FooterImage>,
    input: &Path,
    root: &Path,
    format: OutputFormat,
    force: bool,
) -> CliResult<PathBuf> {
    let answers = load_answers(Some(input))?;
    let document = compile_document(spec, &answers);
    let contents = render_output(&document, style, footer, format)?;
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or("answers file name is not valid UTF-8")?;
    write_output(root, Path::new(&format.batch_file_name(stem)), &contents, force)
}

fn render_output(
    document: &CompiledDocument,
    style: &StyleSheet,
    footer: Option<&FooterImage>,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(document, style, footer)?),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(document)?)),
    }
}

/// The configured footer image, unless the file is missing.
fn usable_footer(config: &ExportConfig) -> Option<&FooterImage> {
    let image = config.footer_image.as_ref()?;
    if image.path.is_file() {
        Some(image)
    } else {
        warn!(
            path = %image.path.display(),
            "footer image not found; writing the document without it"
        );
        None
    }
}

fn write_output(root: &Path, file_name: &Path, contents: &str, force: bool) -> CliResult<PathBuf> {
    fs::create_dir_all(root)?;
    let target = root.join(file_name);
    if target.exists() && !force {
        return Err(format!(
            "'{}' already exists; pass --force to overwrite",
            target.display()
        )
        .into());
    }
    fs::write(&target, contents)?;
    debug!(path = %target.display(), bytes = contents.len(), "document written");
    Ok(target)
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

fn run_validate(form: &Path, answers: &Path) -> CliResult<()> {
    let spec = load_form(form)?;
    let answers = load_answers(Some(answers))?;

    let result = validate(&spec, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn run_lint(form: &Path) -> CliResult<()> {
    let spec = load_form(form)?;
    let issues = lint(&spec);
    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    for issue in &issues {
        let code = serde_json::to_value(issue.code)?;
        println!("{}: {}", code.as_str().unwrap_or("issue"), issue.message);
    }
    Err(format!("{} lint issue(s) found", issues.len()).into())
}

fn run_schema(kind: SchemaKind, form: Option<&Path>, answers: Option<&Path>) -> CliResult<()> {
    let schema = match kind {
        SchemaKind::Form => form_schema(),
        SchemaKind::Config => config_schema(),
        SchemaKind::Answers => {
            let form = form.ok_or("--form is required for the answers schema")?;
            let spec = load_form(form)?;
            let answers = load_answers(answers)?;
            answers_schema(&spec, &resolve_effective_visibility(&spec, &answers))
        }
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_fill(
    config_path: Option<&Path>,
    form: &Path,
    answers_path: Option<&Path>,
    out: Option<PathBuf>,
    verbose: bool,
    answers_json: bool,
    force: bool,
) -> CliResult<()> {
    let spec = load_form(form)?;
    let config = load_config(config_path)?;
    let form_id = spec.id.to_string();
    let config_json = component_config(&spec)?;
    let mut answers = load_answers(answers_path)?.to_value();
    let mut skipped = HashSet::new();
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), answers_json);

    loop {
        let answers_str = answers.to_string();
        let ui = parse_component_result(&render_json_ui(&form_id, &config_json, &answers_str))?;
        let payload =
            WizardPayload::from_json(&ui).map_err(|err| format!("preview error: {}", err))?;
        presenter.show_header(&payload);

        let Some(question) = payload.next_prompt(&skipped) else {
            break;
        };
        presenter.show_status(&payload);
        let prompt = PromptContext::new(question, &payload.progress);
        let Some(answer) = prompt_question(&prompt, question, &presenter)? else {
            debug!("input closed; writing the document with the answers so far");
            break;
        };
        if answer.is_null() {
            skipped.insert(question.id.clone());
            continue;
        }

        let submit = parse_component_result(&submit_patch(
            &form_id,
            &config_json,
            &answers_str,
            &question.id,
            &serde_json::to_string(&answer)?,
        ))?;
        if print_question_errors(&submit["validation"], &question.id) > 0 {
            continue;
        }
        answers = submit["answers"].clone();
    }

    let document = compile_document(&spec, &Answers::from_value(&answers));
    let contents = render_output(
        &document,
        &config.style,
        usable_footer(&config),
        OutputFormat::Markdown,
    )?;
    let root = resolve_output_root(out)?;
    let file_name = TemplateEngine::new().output_filename(&config.filename_template, &spec)?;
    let file_name = OutputFormat::Markdown.file_name(&file_name);
    let target = write_output(&root, Path::new(&file_name), &contents, force)?;
    presenter.show_completion(&target, &answers);
    Ok(())
}

/// Reads one reply; `None` once stdin is closed.
fn prompt_question(
    prompt: &PromptContext,
    question: &WizardQuestion,
    presenter: &WizardPresenter,
) -> CliResult<Option<Value>> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }

        match parse_answer(question, &input) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Prints validation errors that concern `question_id` and returns how many.
fn print_question_errors(validation: &Value, question_id: &str) -> usize {
    let errors = validation
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter(|error| error["question_id"].as_str() == Some(question_id))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    for error in &errors {
        eprintln!(
            "Invalid answer: {}",
            error["message"].as_str().unwrap_or("rejected")
        );
    }
    errors.len()
}

/// Blank replies skip optional questions and become `null`.
fn parse_answer(question: &WizardQuestion, raw: &str) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return if question.required {
            Err(AnswerParseError::new("an answer is required", None))
        } else {
            Ok(Value::Null)
        };
    }

    match question.kind {
        QuestionKind::MultipleChoice => parse_choice(question, raw),
        QuestionKind::Number => parse_number(raw),
        QuestionKind::Text | QuestionKind::Date | QuestionKind::Section => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn parse_choice(question: &WizardQuestion, raw: &str) -> Result<Value, AnswerParseError> {
    let tokens: Vec<&str> = if question.multiple {
        raw.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    } else {
        vec![raw]
    };
    if tokens.is_empty() {
        return Err(AnswerParseError::new(
            "select at least one option",
            Some(describe_choices(question)),
        ));
    }

    let mut selected: Vec<String> = Vec::new();
    for token in tokens {
        let id = resolve_choice(question, token).ok_or_else(|| {
            AnswerParseError::new(
                format!("'{}' is not one of the options", token),
                Some(describe_choices(question)),
            )
        })?;
        if !selected.contains(&id) {
            selected.push(id);
        }
    }

    if question.multiple {
        Ok(Value::Array(selected.into_iter().map(Value::String).collect()))
    } else {
        Ok(Value::String(selected.remove(0)))
    }
}

/// Option ids win over 1-based positions.
fn resolve_choice(question: &WizardQuestion, token: &str) -> Option<String> {
    if let Some(option) = question.options.iter().find(|option| option.id == token) {
        return Some(option.id.clone());
    }
    let position = token.parse::<usize>().ok()?;
    question
        .options
        .get(position.checked_sub(1)?)
        .map(|option| option.id.clone())
}

fn describe_choices(question: &WizardQuestion) -> String {
    question
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| format!("{}={} ({})", index + 1, option.text, option.id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(integer.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("'{}' is not a number", raw),
                Some("a number such as 12 or 4.5".into()),
            )
        })
}
