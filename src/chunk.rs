//! Splitting rendered text into transport-sized messages

/// Longest message the relay sends in one piece
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Split `text` into parts of at most `max_length` characters.
///
/// Each cut lands on the last newline before the limit, else the last space,
/// else exactly at the limit. Whitespace at the start of the remainder is
/// dropped, and a text that needs splitting never yields a blank part. Cuts may fall inside a `<pre>` region; the transport's plain-text
/// fallback covers the markup that breaks.
pub fn split_message(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    if text.chars().count() <= max_length {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max_length) else {
            parts.push(rest.to_string());
            break;
        };

        let (window, _) = rest.split_at(limit);
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(limit);

        let (head, tail) = rest.split_at(cut);
        // Whitespace-only parts are rejected by the transport
        if !head.trim().is_empty() {
            parts.push(head.to_string());
        }
        // A cut at 0 means rest starts with whitespace, which this trims
        rest = tail.trim_start();
    }

    parts
}

#[cfg(test)]
mod proptests;
