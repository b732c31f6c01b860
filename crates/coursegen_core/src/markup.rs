//! crates/coursegen_core/src/markup.rs
//!
//! A small reader for the Markdown subset the generation service emits.
//! Exporters render the resulting blocks into their own formats.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading level is clamped to 1..=4.
    Heading { level: u8, text: String },
    /// Bullet nesting starts at 1.
    Bullet { level: u8, spans: Vec<Span> },
    Quote(Vec<Span>),
    Code(Vec<String>),
    Paragraph(Vec<Span>),
}

fn inline_regex() -> &'static Regex {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    INLINE.get_or_init(|| {
        Regex::new(r"\*\*(?P<bold>[^*]+)\*\*|\*(?P<italic>[^*]+)\*")
            .expect("inline markup pattern is valid")
    })
}

/// Splits a line into plain, bold and italic runs.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in inline_regex().captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Span::plain(&line[last..whole.start()]));
        }
        if let Some(bold) = caps.name("bold") {
            spans.push(Span {
                text: bold.as_str().to_string(),
                bold: true,
                italic: false,
            });
        } else if let Some(italic) = caps.name("italic") {
            spans.push(Span {
                text: italic.as_str().to_string(),
                bold: false,
                italic: true,
            });
        }
        last = whole.end();
    }

    if last < line.len() {
        spans.push(Span::plain(&line[last..]));
    }
    spans
}

/// Parses text into blocks, one block per non-empty line except inside code fences.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut code: Option<Vec<String>> = None;

    for raw in text.lines() {
        let trimmed = raw.trim();

        if trimmed.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines)),
                None => code = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(raw.to_string());
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') {
            let hashes = trimmed.chars().take_while(|c| *c == '#').count();
            let text = trimmed[hashes..].trim();
            if !text.is_empty() {
                blocks.push(Block::Heading {
                    level: hashes.clamp(1, 4) as u8,
                    text: text.to_string(),
                });
                continue;
            }
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let indent = raw.len() - raw.trim_start().len();
            let level = (indent / 2 + 1).min(u8::MAX as usize) as u8;
            blocks.push(Block::Bullet {
                level,
                spans: parse_inline(item.trim()),
            });
            continue;
        }

        if let Some(quote) = trimmed.strip_prefix('>') {
            blocks.push(Block::Quote(parse_inline(quote.trim())));
            continue;
        }

        blocks.push(Block::Paragraph(parse_inline(trimmed)));
    }

    // An unterminated fence still keeps its content.
    if let Some(lines) = code {
        blocks.push(Block::Code(lines));
    }
    blocks
}
