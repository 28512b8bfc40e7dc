//! Splitting documents into retrievable chunks.
//!
//! Sizes are counted in characters, so multi-byte text is never cut inside a
//! code point.

use std::iter;

/// A strategy for splitting document text into retrievable pieces.
pub trait Chunker: Send + Sync {
    /// Split `text` into trimmed, non-empty chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Paragraphs first, then sentences, then words.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Size limits shared by both chunkers.
#[derive(Debug, Clone, Copy)]
struct Window {
    size: usize,
    overlap: usize,
}

impl Window {
    fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        Self { size, overlap: overlap.min(size - 1) }
    }

    /// Greedily pack separator-delimited pieces up to `size`, descending to
    /// finer separators for pieces that are still too long.
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.size {
            return vec![text.to_string()];
        }
        let Some((separator, finer)) = separators.split_first() else {
            return self.hard_split(text);
        };

        let mut out = Vec::new();
        let mut buffer = String::new();
        let mut buffered = 0;
        for piece in text.split_inclusive(separator) {
            let len = char_len(piece);
            if buffered + len > self.size && !buffer.is_empty() {
                out.extend(self.split(&buffer, finer));
                buffer.clear();
                buffered = 0;
            }
            buffer.push_str(piece);
            buffered += len;
        }
        if !buffer.is_empty() {
            out.extend(self.split(&buffer, finer));
        }
        out
    }

    /// Fixed windows of `size` characters, consecutive windows sharing `overlap`.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(iter::once(text.len())).collect();
        let chars = bounds.len() - 1;
        let step = self.size - self.overlap;

        let mut out = Vec::new();
        let mut start = 0;
        while start < chars {
            let end = (start + self.size).min(chars);
            out.push(text[bounds[start]..bounds[end]].to_string());
            if end == chars {
                break;
            }
            start += step;
        }
        out
    }
}

fn tidy(chunks: Vec<String>) -> impl Iterator<Item = String> {
    chunks.into_iter().map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Splits plain text on paragraph, sentence and word boundaries, falling back
/// to fixed-size windows with `chunk_overlap` for unbroken runs.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    window: Window,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { window: Window::new(chunk_size, chunk_overlap) }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        tidy(self.window.split(text, &SEPARATORS)).collect()
    }
}

/// Splits markdown into header sections.
///
/// Each section is prefixed with its header path (`Guide > Setup`) and split
/// further like [`RecursiveChunker`] when it exceeds `chunk_size`. Sections
/// with no body are dropped, and `#` lines inside fenced code are body text.
#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    window: Window,
}

impl MarkdownChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { window: Window::new(chunk_size, chunk_overlap) }
    }
}

/// `(level, title)` for an ATX heading line.
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim_start();
    let level = line.bytes().take_while(|b| *b == b'#').count();
    let rest = &line[level..];
    let spaced = rest.chars().next().is_none_or(char::is_whitespace);
    ((1..=6).contains(&level) && spaced).then_some((level, rest.trim()))
}

/// `(header path, body)` pairs for every section with a non-blank body.
fn sections(text: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut trail: Vec<&str> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut fenced = false;

    let mut close = |trail: &[&str], body: &mut Vec<&str>| {
        let text = body.join("\n");
        if !text.trim().is_empty() {
            out.push((trail.join(" > "), text.trim().to_string()));
        }
        body.clear();
    };

    for line in text.lines() {
        let marker = line.trim_start();
        if marker.starts_with("```") || marker.starts_with("~~~") {
            fenced = !fenced;
        }
        match heading(line).filter(|_| !fenced) {
            Some((level, title)) => {
                close(&trail, &mut body);
                trail.truncate(level - 1);
                trail.push(title);
            }
            None => body.push(line),
        }
    }
    close(&trail, &mut body);
    out
}

impl Chunker for MarkdownChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for (path, body) in sections(text) {
            let section = if path.is_empty() { body } else { format!("{path}\n{body}") };
            chunks.extend(tidy(self.window.split(&section, &SEPARATORS)));
        }
        chunks
    }
}
