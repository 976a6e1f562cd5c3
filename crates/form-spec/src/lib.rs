#![allow(missing_docs)]

pub mod answers;
pub mod answers_schema;
pub mod compile;
pub mod config;
pub mod error;
pub mod lint;
pub mod options;
pub mod render;
pub mod spec;
pub mod style;
pub mod template;
pub mod tree;
pub mod validate;
pub mod visibility;
pub mod writer;

pub use answers::{Answers, ValidationError, ValidationResult};
pub use answers_schema::generate as answers_schema;
pub use compile::{Block, CompiledDocument, compile, compile_document, display_value};
pub use config::{ExportConfig, FooterImage};
pub use error::FormError;
pub use lint::{LintCode, LintIssue, lint};
pub use options::OptionResolver;
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use spec::{
    FormSpec, ItemId, LogicRule, OptionSpec, QuestionSpec, QuestionType, RuleAction,
};
pub use style::{Emphasis, StyleSheet, TextStyle};
pub use template::{TemplateEngine, register_default_helpers};
pub use tree::{FormTree, TreeNode};
pub use validate::validate;
pub use visibility::{
    RuleIndex, VisibilityMap, is_visible, resolve_effective_visibility, resolve_visibility,
};
pub use writer::{
    DocumentWriter, MarkdownWriter, ParagraphRole, TextRun, render_markdown, write_document,
};

/// JSON schema of the form snapshot format.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or_default()
}

/// JSON schema of the export configuration.
pub fn config_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(ExportConfig)).unwrap_or_default()
}
