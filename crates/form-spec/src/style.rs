use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which runs besides headers are set in bold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    /// Section headers and standalone labels only.
    #[default]
    HeadersOnly,
    /// Row labels are bold as well.
    Everywhere,
}

/// Visual attributes of one text run. Sizes are in half-points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextStyle {
    pub size: u32,
    pub bold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TextStyle {
    fn plain(size: u32) -> Self {
        Self {
            size,
            bold: false,
            color: None,
        }
    }

    fn bold(size: u32) -> Self {
        Self {
            size,
            bold: true,
            color: None,
        }
    }
}

/// Presentation table used when a compiled document is written.
///
/// Size tables are indexed by block depth; depths past the end use the last
/// entry, so outer levels are the most prominent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StyleSheet {
    pub font_family: String,
    pub emphasis: Emphasis,
    pub title_size: u32,
    pub section_sizes: Vec<u32>,
    pub row_sizes: Vec<u32>,
    pub standalone_label_size: u32,
    pub answer_size: u32,
    pub top_section_shading: String,
    pub nested_section_shading: String,
    /// Indent per level below the first, in twentieths of a point.
    pub indent_step: u32,
    pub placeholder: String,
    pub placeholder_color: String,
    pub answer_color: String,
}

const FALLBACK_SIZE: u32 = 22;

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            font_family: "Avenir Next LT Pro".into(),
            emphasis: Emphasis::HeadersOnly,
            title_size: 36,
            section_sizes: vec![36, 26, 24, 22],
            row_sizes: vec![24, 24, 22, 20],
            standalone_label_size: 28,
            answer_size: 24,
            top_section_shading: "D0D0D0".into(),
            nested_section_shading: "F0F0F0".into(),
            indent_step: 200,
            placeholder: "_".repeat(50),
            placeholder_color: "CCCCCC".into(),
            answer_color: "000000".into(),
        }
    }
}

fn size_at(table: &[u32], depth: usize) -> u32 {
    table
        .get(depth)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(FALLBACK_SIZE)
}

impl StyleSheet {
    pub fn title(&self) -> TextStyle {
        TextStyle::bold(self.title_size)
    }

    pub fn description(&self) -> TextStyle {
        TextStyle::plain(self.answer_size)
    }

    pub fn section_header(&self, depth: usize) -> TextStyle {
        TextStyle::bold(size_at(&self.section_sizes, depth))
    }

    pub fn section_shading(&self, depth: usize) -> &str {
        if depth == 0 {
            &self.top_section_shading
        } else {
            &self.nested_section_shading
        }
    }

    pub fn row_label(&self, depth: usize) -> TextStyle {
        let size = size_at(&self.row_sizes, depth);
        match self.emphasis {
            Emphasis::HeadersOnly => TextStyle::plain(size),
            Emphasis::Everywhere => TextStyle::bold(size),
        }
    }

    pub fn row_value(&self, depth: usize) -> TextStyle {
        TextStyle::plain(size_at(&self.row_sizes, depth))
    }

    /// Left indent for a block at `depth`; the first two levels sit flush.
    pub fn indent(&self, depth: usize) -> u32 {
        let levels = u32::try_from(depth.saturating_sub(1)).unwrap_or(u32::MAX);
        levels.saturating_mul(self.indent_step)
    }

    pub fn standalone_label(&self) -> TextStyle {
        TextStyle::bold(self.standalone_label_size)
    }

    /// Answer run of a root-level question: bold black when answered, grey
    /// placeholder otherwise.
    pub fn standalone_answer(&self, answered: bool) -> TextStyle {
        if answered {
            TextStyle {
                size: self.answer_size,
                bold: true,
                color: Some(self.answer_color.clone()),
            }
        } else {
            TextStyle {
                size: self.answer_size,
                bold: false,
                color: Some(self.placeholder_color.clone()),
            }
        }
    }
}
