//! Fenced code block scanner
//!
//! Recognizes blocks of the form ```` ```lang\n...``` ````: an optional word
//! tag directly after the opening fence, a mandatory newline, then content up
//! to the *first* following fence. A fence that never closes is skipped and
//! scanning resumes one byte later, so malformed input costs at most one
//! forward search per backtick.

use std::ops::Range;

const FENCE: &str = "```";
const DEFAULT_LANGUAGE: &str = "text";

/// A fenced block extracted from a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lowercased tag, `text` when the fence had none
    pub language: String,
    /// Block body with surrounding whitespace trimmed
    pub code: String,
    /// Byte range of the whole fenced block in the source text
    pub source_span: Range<usize>,
}

impl CodeBlock {
    /// The exact source text this block was parsed from
    #[cfg(test)]
    pub fn source<'a>(&self, raw: &'a str) -> &'a str {
        raw.get(self.source_span.clone()).unwrap_or_default()
    }
}

/// All fenced blocks in `raw`, left to right, non-overlapping
pub fn extract_code_blocks(raw: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(offset) = raw.get(pos..).and_then(|tail| tail.find(FENCE)) {
        let start = pos + offset;
        if let Some(block) = match_fence_at(raw, start) {
            pos = block.source_span.end;
            blocks.push(block);
        } else {
            // '`' is one byte, so start + 1 stays on a char boundary
            pos = start + 1;
        }
    }

    blocks
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn match_fence_at(raw: &str, start: usize) -> Option<CodeBlock> {
    let after_fence = raw.get(start + FENCE.len()..)?;
    let tag_len: usize = after_fence
        .chars()
        .take_while(|&c| is_tag_char(c))
        .map(char::len_utf8)
        .sum();
    let (tag, after_tag) = after_fence.split_at(tag_len);

    let body = after_tag.strip_prefix('\n')?;
    let (code, _) = body.split_once(FENCE)?;
    let body_start = start + FENCE.len() + tag_len + 1;
    let body_end = body_start + code.len();

    let language = if tag.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        tag.to_lowercase()
    };

    Some(CodeBlock {
        language,
        code: code.trim().to_string(),
        source_span: start..body_end + FENCE.len(),
    })
}
