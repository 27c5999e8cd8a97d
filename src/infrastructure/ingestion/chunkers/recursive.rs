//! Recursive chunking strategy with overlap

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::DomainError;
use crate::domain::ingestion::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};

/// Chunking strategy that splits text hierarchically, then merges the pieces
/// into windows of at most `chunk_size` characters
///
/// Splitting order: headers -> paragraphs -> sentences -> words -> characters.
/// Consecutive chunks share up to `chunk_overlap` characters of trailing pieces.
#[derive(Debug, Clone, Default)]
pub struct RecursiveChunker;

/// Smallest unit the merger works with, never longer than `chunk_size`
#[derive(Debug)]
struct Piece {
    text: String,
    /// Joiner placed before this piece when it follows another one
    separator: &'static str,
    chars: usize,
}

impl Piece {
    fn new(text: impl Into<String>, separator: &'static str) -> Self {
        let text = text.into();
        let chars = text.chars().count();
        Self {
            text,
            separator,
            chars,
        }
    }
}

impl RecursiveChunker {
    pub fn new() -> Self {
        Self
    }

    fn split_by_headers(text: &str) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut start = 0;
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            if line.starts_with('#') && offset > start {
                parts.push(&text[start..offset]);
                start = offset;
            }
            offset += line.len();
        }
        parts.push(&text[start..]);

        parts
    }

    fn split_by_paragraphs(text: &str) -> Vec<&str> {
        text.split("\n\n").collect()
    }

    fn split_by_sentences(text: &str) -> Vec<&str> {
        text.unicode_sentences().collect()
    }

    fn split_by_words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    fn split_level(text: &str, level: usize) -> Option<(Vec<&str>, &'static str)> {
        match level {
            0 => Some((Self::split_by_headers(text), "\n\n")),
            1 => Some((Self::split_by_paragraphs(text), "\n\n")),
            2 => Some((Self::split_by_sentences(text), " ")),
            3 => Some((Self::split_by_words(text), " ")),
            _ => None,
        }
    }

    fn atomize(
        text: &str,
        chunk_size: usize,
        level: usize,
        separator: &'static str,
        out: &mut Vec<Piece>,
    ) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if text.chars().count() <= chunk_size {
            out.push(Piece::new(text, separator));
            return;
        }

        match Self::split_level(text, level) {
            Some((parts, part_separator)) if parts.len() > 1 => {
                let mut first = true;
                for part in parts.into_iter().filter(|p| !p.trim().is_empty()) {
                    let sep = if first { separator } else { part_separator };
                    Self::atomize(part, chunk_size, level + 1, sep, out);
                    first = false;
                }
            }
            Some(_) => Self::atomize(text, chunk_size, level + 1, separator, out),
            None => Self::split_by_chars(text, chunk_size, separator, out),
        }
    }

    fn split_by_chars(
        text: &str,
        chunk_size: usize,
        separator: &'static str,
        out: &mut Vec<Piece>,
    ) {
        let chars: Vec<char> = text.chars().collect();

        for (i, window) in chars.chunks(chunk_size).enumerate() {
            let sep = if i == 0 { separator } else { "" };
            out.push(Piece::new(window.iter().collect::<String>(), sep));
        }
    }

    fn joined_len(window: &VecDeque<&Piece>) -> usize {
        window
            .iter()
            .enumerate()
            .map(|(i, p)| if i == 0 { p.chars } else { p.chars + p.separator.len() })
            .sum()
    }

    fn join(window: &VecDeque<&Piece>) -> String {
        let mut text = String::new();
        for (i, piece) in window.iter().enumerate() {
            if i > 0 {
                text.push_str(piece.separator);
            }
            text.push_str(&piece.text);
        }
        text
    }

    fn merge(pieces: &[Piece], config: &ChunkingConfig) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&Piece> = VecDeque::new();

        for piece in pieces {
            let needed = piece.chars + piece.separator.len();

            if !window.is_empty() && Self::joined_len(&window) + needed > config.chunk_size {
                chunks.push(Self::join(&window));

                while !window.is_empty() {
                    let len = Self::joined_len(&window);
                    if len <= config.chunk_overlap && len + needed <= config.chunk_size {
                        break;
                    }
                    window.pop_front();
                }
            }

            window.push_back(piece);
        }

        if !window.is_empty() {
            chunks.push(Self::join(&window));
        }

        chunks
    }

    /// Character offset of each chunk in the source, when it appears verbatim
    fn locate(content: &str, chunks: &[String]) -> Vec<Option<usize>> {
        let mut cursor = 0;

        chunks
            .iter()
            .map(|chunk| {
                let found = content.get(cursor..).and_then(|rest| rest.find(chunk.as_str()));
                found.map(|pos| {
                    let byte = cursor + pos;
                    cursor = byte + content[byte..].chars().next().map_or(1, char::len_utf8);
                    content[..byte].chars().count()
                })
            })
            .collect()
    }
}

impl ChunkingStrategy for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        let content = content.trim();
        if content.is_empty() {
            return Ok(vec![]);
        }

        let mut pieces = Vec::new();
        Self::atomize(content, config.chunk_size, 0, "", &mut pieces);

        let merged = Self::merge(&pieces, config);
        let mut texts: Vec<String> = merged
            .iter()
            .filter(|text| text.chars().count() >= config.min_chunk_size)
            .cloned()
            .collect();

        if texts.is_empty() {
            texts = merged.into_iter().take(1).collect();
        }

        let offsets = Self::locate(content, &texts);
        let total = texts.len();

        Ok(texts
            .into_iter()
            .zip(offsets)
            .enumerate()
            .map(|(i, (text, start))| Chunk::new(text, ChunkMetadata::new(i, total, start)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}
