//! Reply rendering: markdown to Telegram HTML
//!
//! Fenced code blocks are located in the raw reply first. Prose between them
//! gets the inline substitutions; each fenced span is replaced by a labelled
//! `<pre>` block with its body HTML-escaped. The two passes never touch the
//! same bytes, so nothing is escaped or substituted twice.

mod fence;
mod inline;

#[cfg(test)]
mod proptests;

pub use fence::{extract_code_blocks, CodeBlock};

/// Rendered reply plus the code blocks it contained, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub markup: String,
    pub code_blocks: Vec<CodeBlock>,
}

/// Render a raw completion reply
pub fn render(raw: &str) -> RenderedReply {
    let code_blocks = extract_code_blocks(raw);

    let mut markup = String::with_capacity(raw.len() + code_blocks.len() * 64);
    let mut cursor = 0;
    for block in &code_blocks {
        let prose = raw
            .get(cursor..block.source_span.start)
            .unwrap_or_default();
        markup.push_str(&inline::apply(prose));
        markup.push_str(&format_code_block(block));
        cursor = block.source_span.end;
    }
    markup.push_str(&inline::apply(raw.get(cursor..).unwrap_or_default()));

    RenderedReply {
        markup,
        code_blocks,
    }
}

/// Escape the characters Telegram's HTML dialect reserves
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn format_code_block(block: &CodeBlock) -> String {
    format!(
        "<b>📝 Code ({}):</b>\n<pre>{}</pre>",
        block.language,
        escape_html(&block.code)
    )
}
