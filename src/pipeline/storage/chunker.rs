use super::types::{Chunker, TextChunk};

/// Fixed-size chunker without overlap.
///
/// Each chunk holds at most `chunk_size` chars. When a window would cut a
/// word, the cut moves back to the last whitespace in the window's second
/// half; otherwise it falls at exactly `chunk_size`.
pub struct FixedSizeChunker {
    chunk_size: usize,
}

impl FixedSizeChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = cut_point(&chars, start, self.chunk_size);
            let content: String = chars[start..end].iter().collect();
            let trimmed = content.trim();

            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    content: trimmed.to_string(),
                    chunk_index: chunks.len(),
                    char_offset: start,
                });
            }
            start = end;
        }

        chunks
    }
}

fn cut_point(chars: &[char], start: usize, size: usize) -> usize {
    let hard_end = (start + size).min(chars.len());
    if hard_end == chars.len() || chars[hard_end].is_whitespace() {
        return hard_end;
    }

    let floor = start + size / 2;
    (floor..hard_end)
        .rev()
        .find(|&i| chars[i].is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(hard_end)
}
