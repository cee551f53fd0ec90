//! Reply formatting
//!
//! A completion reply is reshaped for display: file references the model
//! echoed back are re-wrapped in fenced code blocks, the first sentence
//! becomes a lead line and the remaining sentences become bullets.

use crate::config::ChatConfig;
use crate::github::FileContent;
use crate::utils::text::{fence, language_tag, strip_emphasis};

const FENCE: &str = "```";
const BULLET: &str = "• ";

/// Prose or fenced code within a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Prose(&'a str),
    Fence(&'a str),
}

/// Split text into prose and fenced-code segments.
///
/// An unterminated fence runs to the end of the text.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(FENCE) {
        if start > 0 {
            out.push(Segment::Prose(&rest[..start]));
        }
        let after_open = start + FENCE.len();
        let end = rest[after_open..]
            .find(FENCE)
            .map(|close| after_open + close + FENCE.len())
            .unwrap_or(rest.len());
        out.push(Segment::Fence(&rest[start..end]));
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        out.push(Segment::Prose(rest));
    }
    out
}

/// Wrap `Content of <path>:\n<content>` in a code fence for every request file
pub fn rewrap_file_references(text: &str, files: &[FileContent]) -> String {
    let mut formatted = text.to_string();
    for file in files.iter().filter(|f| !f.content.is_empty()) {
        let header = format!("Content of {}:", file.path);
        let raw = format!("{}\n{}", header, file.content);
        if formatted.contains(&raw) {
            let wrapped = format!("{}\n{}", header, fence(language_tag(&file.path), &file.content));
            formatted = formatted.replace(&raw, &wrapped);
        }
    }
    formatted
}

/// Split into trimmed sentences, breaking after a terminator followed by
/// whitespace. Fenced code never splits.
pub fn split_sentences(text: &str, terminators: &[char]) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for segment in segments(text) {
        match segment {
            Segment::Fence(code) => current.push_str(code),
            Segment::Prose(prose) => {
                let mut chars = prose.chars().peekable();
                while let Some(c) = chars.next() {
                    current.push(c);
                    let at_boundary = terminators.contains(&c)
                        && chars.peek().map_or(false, |next| next.is_whitespace());
                    if at_boundary {
                        while chars.peek().map_or(false, |next| next.is_whitespace()) {
                            chars.next();
                        }
                        flush_sentence(&mut sentences, &mut current);
                    }
                }
            }
        }
    }

    flush_sentence(&mut sentences, &mut current);
    sentences
}

fn flush_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

/// Strip emphasis in prose only, leaving code fences byte-identical
fn strip_emphasis_outside_fences(text: &str) -> String {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Prose(prose) => strip_emphasis(prose),
            Segment::Fence(code) => code.to_string(),
        })
        .collect()
}

/// Formats completion replies into a lead line and bullets
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    terminators: Vec<char>,
    min_bullet_len: usize,
}

impl ResponseFormatter {
    pub fn new(terminators: Vec<char>, min_bullet_len: usize) -> Self {
        Self {
            terminators,
            min_bullet_len,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.sentence_terminators.clone(), config.min_bullet_len)
    }

    /// Format `raw` for display, fencing echoed contents of `files`
    pub fn format(&self, raw: &str, files: &[FileContent]) -> String {
        let rewrapped = rewrap_file_references(raw, files);
        let mut sentences = split_sentences(&rewrapped, &self.terminators).into_iter();

        let Some(lead) = sentences.next() else {
            return String::new();
        };

        let bullets: Vec<String> = sentences
            .filter(|sentence| sentence.chars().count() > self.min_bullet_len)
            .map(|sentence| format!("{}{}", BULLET, strip_emphasis_outside_fences(&sentence)))
            .collect();

        if bullets.is_empty() {
            lead
        } else {
            format!("{}\n\n{}", lead, bullets.join("\n"))
        }
    }
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}
