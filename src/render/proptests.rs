//! Property-based tests for the renderer

use super::*;
use proptest::prelude::*;

/// Text that cannot contain markdown tokens
fn arb_plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Zа-я0-9 .,!?<>&\n-]{0,200}"
}

/// A fenced block with a tag and a body free of backticks
fn arb_fenced_block() -> impl Strategy<Value = (String, String, String)> {
    ("[a-z]{0,8}", "[a-zA-Z0-9 =();<>&\n]{0,60}").prop_map(|(tag, body)| {
        let fenced = format!("```{tag}\n{body}```");
        (tag, body, fenced)
    })
}

proptest! {
    #[test]
    fn render_is_deterministic(raw in ".{0,300}") {
        prop_assert_eq!(render(&raw), render(&raw));
    }

    #[test]
    fn plain_text_is_identity(text in arb_plain_text()) {
        let rendered = render(&text);
        prop_assert_eq!(rendered.markup, text);
        prop_assert!(rendered.code_blocks.is_empty());
    }

    #[test]
    fn arbitrary_input_never_panics_and_spans_are_ordered(raw in "[`*a-z\n ]{0,200}") {
        let rendered = render(&raw);
        let mut last_end = 0;
        for block in &rendered.code_blocks {
            prop_assert!(block.source_span.start >= last_end);
            prop_assert!(block.source_span.end <= raw.len());
            let source = block.source(&raw);
            prop_assert!(source.starts_with("```"));
            prop_assert!(source.ends_with("```"));
            last_end = block.source_span.end;
        }
    }

    #[test]
    fn generated_blocks_are_found_in_order(
        blocks in prop::collection::vec(arb_fenced_block(), 1..5),
        separator in "[a-z ]{1,10}",
    ) {
        let mut raw = String::new();
        for (_, _, fenced) in &blocks {
            raw.push_str(&separator);
            raw.push('\n');
            raw.push_str(fenced);
            raw.push('\n');
        }

        let rendered = render(&raw);
        prop_assert_eq!(rendered.code_blocks.len(), blocks.len());
        for (found, (tag, body, _)) in rendered.code_blocks.iter().zip(&blocks) {
            let expected_language = if tag.is_empty() { "text" } else { tag.as_str() };
            prop_assert_eq!(&found.language, expected_language);
            prop_assert_eq!(&found.code, body.trim());
        }
    }
}
