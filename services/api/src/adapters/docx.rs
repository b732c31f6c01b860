//! services/api/src/adapters/docx.rs
//!
//! Renders generated text into a Word document. Implements the
//! `DocumentExportService` port using `docx-rs`.

use coursegen_core::markup::{parse_blocks, Block, Span};
use coursegen_core::ports::{DocumentExportService, PortError, PortResult};
use docx_rs::{Docx, Paragraph, Run, RunFonts, Style, StyleType};
use std::io::Cursor;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Half-points, per level 1..=4.
const HEADING_SIZES: [usize; 4] = [32, 28, 26, 24];
const BODY_SIZE: usize = 24;
const CODE_SIZE: usize = 20;
/// Twips per bullet level.
const BULLET_INDENT: i32 = 360;

#[derive(Clone, Debug, Default)]
pub struct DocxExporter;

impl DocxExporter {
    pub fn new() -> Self {
        Self
    }

    fn styled_document() -> Docx {
        let mut docx = Docx::new()
            .add_style(
                Style::new("Title", StyleType::Paragraph)
                    .name("Title")
                    .size(40)
                    .bold(),
            )
            .add_style(
                Style::new("Quote", StyleType::Paragraph)
                    .name("Quote")
                    .size(BODY_SIZE)
                    .italic(),
            );
        for (i, size) in HEADING_SIZES.iter().enumerate() {
            let level = i + 1;
            docx = docx.add_style(
                Style::new(format!("Heading{}", level), StyleType::Paragraph)
                    .name(format!("Heading {}", level))
                    .size(*size)
                    .bold(),
            );
        }
        docx
    }

    fn span_run(span: &Span) -> Run {
        let mut run = Run::new().add_text(span.text.as_str()).size(BODY_SIZE);
        if span.bold {
            run = run.bold();
        }
        if span.italic {
            run = run.italic();
        }
        run
    }

    fn spans_paragraph(spans: &[Span]) -> Paragraph {
        spans
            .iter()
            .fold(Paragraph::new(), |p, span| p.add_run(Self::span_run(span)))
    }

    fn block_paragraphs(block: &Block) -> Vec<Paragraph> {
        match block {
            Block::Heading { level, text } => vec![Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()))
                .style(&format!("Heading{}", level))],
            Block::Bullet { level, spans } => {
                let bullet = Paragraph::new().add_run(Run::new().add_text("• ").size(BODY_SIZE));
                let paragraph = spans
                    .iter()
                    .fold(bullet, |p, span| p.add_run(Self::span_run(span)));
                vec![paragraph.indent(Some(BULLET_INDENT * i32::from(*level)), None, None, None)]
            }
            Block::Quote(spans) => vec![Self::spans_paragraph(spans).style("Quote")],
            Block::Code(lines) => lines
                .iter()
                .map(|line| {
                    Paragraph::new().add_run(
                        Run::new()
                            .add_text(line.as_str())
                            .fonts(RunFonts::new().ascii("Courier New"))
                            .size(CODE_SIZE),
                    )
                })
                .collect(),
            Block::Paragraph(spans) => vec![Self::spans_paragraph(spans)],
        }
    }
}

impl DocumentExportService for DocxExporter {
    fn export(&self, title: &str, body: &str) -> PortResult<Vec<u8>> {
        let mut docx = Self::styled_document().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title))
                .style("Title"),
        );
        for block in parse_blocks(body) {
            for paragraph in Self::block_paragraphs(&block) {
                docx = docx.add_paragraph(paragraph);
            }
        }

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| PortError::Unexpected(format!("Failed to serialize DOCX: {}", e)))?;
        Ok(buffer.into_inner())
    }

    fn content_type(&self) -> &'static str {
        DOCX_CONTENT_TYPE
    }

    fn extension(&self) -> &'static str {
        "docx"
    }
}
