use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::style::StyleSheet;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "{{underscore form.title}}.md";

/// Image placed in the document footer. Dimensions are in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FooterImage {
    pub path: PathBuf,
    #[serde(default = "default_footer_width")]
    pub width: u32,
    #[serde(default = "default_footer_height")]
    pub height: u32,
}

fn default_footer_width() -> u32 {
    100
}

fn default_footer_height() -> u32 {
    50
}

/// Settings for turning compiled documents into files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExportConfig {
    pub style: StyleSheet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_image: Option<FooterImage>,
    pub filename_template: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            style: StyleSheet::default(),
            footer_image: None,
            filename_template: DEFAULT_FILENAME_TEMPLATE.into(),
        }
    }
}

impl ExportConfig {
    /// Blank input yields the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, FormError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(FormError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Emphasis;

    #[test]
    fn blank_config_is_default() {
        assert_eq!(ExportConfig::from_json_str("  ").unwrap(), ExportConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = ExportConfig::from_json_str(
            r#"{ "style": { "emphasis": "everywhere" }, "footer_image": { "path": "logo.png" } }"#,
        )
        .expect("config");
        assert_eq!(config.style.emphasis, Emphasis::Everywhere);
        assert_eq!(config.style.title_size, 36);
        let footer = config.footer_image.expect("footer");
        assert_eq!((footer.width, footer.height), (100, 50));
        assert_eq!(config.filename_template, DEFAULT_FILENAME_TEMPLATE);
    }
}
