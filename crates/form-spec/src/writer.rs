use std::fmt::Write as _;

use crate::compile::{Block, CompiledDocument};
use crate::config::FooterImage;
use crate::error::FormError;
use crate::style::{StyleSheet, TextStyle};

/// Styled text handed to a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub font: String,
    pub style: TextStyle,
}

/// Purpose of a free-standing paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphRole {
    Title,
    Description,
    QuestionLabel,
    Answer,
    Spacer,
}

/// Sink for a styled document. Implementations own the output format.
pub trait DocumentWriter {
    fn paragraph(&mut self, role: ParagraphRole, run: &TextRun) -> Result<(), FormError>;
    fn begin_table(&mut self) -> Result<(), FormError>;
    /// Full-width shaded row. `indent` is in twentieths of a point.
    fn section_header(
        &mut self,
        run: &TextRun,
        shading: &str,
        indent: u32,
    ) -> Result<(), FormError>;
    fn table_row(&mut self, label: &TextRun, value: &TextRun, indent: u32)
    -> Result<(), FormError>;
    fn end_table(&mut self) -> Result<(), FormError>;
    fn footer_image(&mut self, image: &FooterImage) -> Result<(), FormError>;
}

/// Feeds a compiled document through `writer`.
///
/// Every top-level section opens its own table, closed by a spacer paragraph.
/// Root-level questions become a label paragraph and an answer paragraph, the
/// answer falling back to the placeholder when empty.
pub fn write_document<W>(
    document: &CompiledDocument,
    style: &StyleSheet,
    footer: Option<&FooterImage>,
    writer: &mut W,
) -> Result<(), FormError>
where
    W: DocumentWriter + ?Sized,
{
    let run = |text: &str, text_style: TextStyle| TextRun {
        text: text.to_string(),
        font: style.font_family.clone(),
        style: text_style,
    };
    let spacer = run("", style.description());

    writer.paragraph(ParagraphRole::Title, &run(&document.title, style.title()))?;
    if let Some(description) = &document.description {
        writer.paragraph(
            ParagraphRole::Description,
            &run(description, style.description()),
        )?;
    }

    let mut in_table = false;
    for block in &document.blocks {
        match block {
            Block::SectionHeader { text, depth } => {
                if *depth == 0 && in_table {
                    writer.end_table()?;
                    writer.paragraph(ParagraphRole::Spacer, &spacer)?;
                    in_table = false;
                }
                if !in_table {
                    writer.begin_table()?;
                    in_table = true;
                }
                writer.section_header(
                    &run(text, style.section_header(*depth)),
                    style.section_shading(*depth),
                    style.indent(*depth),
                )?;
            }
            Block::LabelValueRow {
                label,
                value_text,
                depth,
            } => {
                if !in_table {
                    writer.begin_table()?;
                    in_table = true;
                }
                writer.table_row(
                    &run(label, style.row_label(*depth)),
                    &run(value_text, style.row_value(*depth)),
                    style.indent(*depth),
                )?;
            }
            Block::StandaloneQuestion {
                label,
                value_text,
                answered,
            } => {
                if in_table {
                    writer.end_table()?;
                    writer.paragraph(ParagraphRole::Spacer, &spacer)?;
                    in_table = false;
                }
                writer.paragraph(
                    ParagraphRole::QuestionLabel,
                    &run(label, style.standalone_label()),
                )?;
                let text = if *answered {
                    value_text.as_str()
                } else {
                    style.placeholder.as_str()
                };
                writer.paragraph(
                    ParagraphRole::Answer,
                    &run(text, style.standalone_answer(*answered)),
                )?;
            }
        }
    }
    if in_table {
        writer.end_table()?;
        writer.paragraph(ParagraphRole::Spacer, &spacer)?;
    }

    if let Some(image) = footer {
        writer.footer_image(image)?;
    }
    Ok(())
}

/// Writes a document as GitHub-flavoured Markdown.
#[derive(Debug, Default)]
pub struct MarkdownWriter {
    out: String,
    table_open: bool,
    table_has_header: bool,
}

const MARKDOWN_INDENT_UNIT: u32 = 200;

impl MarkdownWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn emphasised(run: &TextRun) -> String {
        let text = escape_markdown(&run.text);
        if run.style.bold && !text.is_empty() {
            format!("**{text}**")
        } else {
            text
        }
    }

    fn indented(run: &TextRun, indent: u32) -> String {
        let levels = indent.div_ceil(MARKDOWN_INDENT_UNIT) as usize;
        format!("{}{}", "&emsp;".repeat(levels), Self::emphasised(run))
    }
}

impl DocumentWriter for MarkdownWriter {
    fn paragraph(&mut self, role: ParagraphRole, run: &TextRun) -> Result<(), FormError> {
        match role {
            ParagraphRole::Title => writeln!(self.out, "# {}\n", escape_markdown(&run.text))?,
            ParagraphRole::QuestionLabel => {
                writeln!(self.out, "### {}\n", escape_markdown(&run.text))?
            }
            ParagraphRole::Description | ParagraphRole::Answer => {
                writeln!(self.out, "{}\n", Self::emphasised(run))?
            }
            ParagraphRole::Spacer => {}
        }
        Ok(())
    }

    fn begin_table(&mut self) -> Result<(), FormError> {
        self.table_open = true;
        self.table_has_header = false;
        Ok(())
    }

    fn section_header(
        &mut self,
        run: &TextRun,
        _shading: &str,
        indent: u32,
    ) -> Result<(), FormError> {
        let cell = Self::indented(run, indent);
        if self.table_open && !self.table_has_header {
            writeln!(self.out, "| {cell} | |")?;
            writeln!(self.out, "|---|---|")?;
            self.table_has_header = true;
        } else {
            writeln!(self.out, "| {cell} | |")?;
        }
        Ok(())
    }

    fn table_row(
        &mut self,
        label: &TextRun,
        value: &TextRun,
        indent: u32,
    ) -> Result<(), FormError> {
        if self.table_open && !self.table_has_header {
            writeln!(self.out, "| | |")?;
            writeln!(self.out, "|---|---|")?;
            self.table_has_header = true;
        }
        writeln!(
            self.out,
            "| {} | {} |",
            Self::indented(label, indent),
            Self::emphasised(value)
        )?;
        Ok(())
    }

    fn end_table(&mut self) -> Result<(), FormError> {
        self.table_open = false;
        self.out.push('\n');
        Ok(())
    }

    fn footer_image(&mut self, image: &FooterImage) -> Result<(), FormError> {
        writeln!(
            self.out,
            "---\n\n<img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"footer\">",
            image.path.display(),
            image.width,
            image.height
        )?;
        Ok(())
    }
}

/// Renders a compiled document to Markdown with the given style.
pub fn render_markdown(
    document: &CompiledDocument,
    style: &StyleSheet,
    footer: Option<&FooterImage>,
) -> Result<String, FormError> {
    let mut writer = MarkdownWriter::new();
    write_document(document, style, footer, &mut writer)?;
    Ok(writer.finish())
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '`' | '*' | '_' | '|' | '#' | '[' | ']' | '<' | '>' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}
