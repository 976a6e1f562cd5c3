use std::sync::LazyLock;

use handlebars::{Handlebars, handlebars_helper, no_escape};
use regex::Regex;
use serde_json::{Value, json};

use crate::error::FormError;
use crate::spec::form::FormSpec;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

handlebars_helper!(underscore: |text: str| WHITESPACE.replace_all(text, "_").into_owned());
handlebars_helper!(lower: |text: str| text.to_lowercase());

/// Registers the helpers available to every formdoc template.
pub fn register_default_helpers(registry: &mut Handlebars<'_>) {
    registry.register_helper("underscore", Box::new(underscore));
    registry.register_helper("lower", Box::new(lower));
}

/// Handlebars wrapper for output names and other short text templates.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        register_default_helpers(&mut registry);
        Self { registry }
    }

    pub fn render(&self, template: &str, data: &Value) -> Result<String, FormError> {
        Ok(self.registry.render_template(template, data)?)
    }

    /// File name for a form's document. Path separators are replaced so the
    /// result always names a single file.
    pub fn output_filename(&self, template: &str, spec: &FormSpec) -> Result<String, FormError> {
        let data = json!({
            "form": {
                "id": spec.id,
                "title": spec.title,
                "description": spec.description,
            }
        });
        let rendered = self.render(template, &data)?;
        Ok(rendered
            .chars()
            .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
            .collect())
    }
}
