//! Property-based tests for message splitting

use super::*;
use proptest::prelude::*;

/// Walk `text` part by part, allowing only whitespace between parts
fn reassembles(text: &str, parts: &[String]) -> bool {
    let mut rest = text;
    for part in parts {
        let Some(idx) = rest.find(part.as_str()) else {
            return false;
        };
        let (gap, from_part) = rest.split_at(idx);
        if !gap.chars().all(char::is_whitespace) {
            return false;
        }
        rest = from_part.split_at(part.len()).1;
    }
    rest.chars().all(char::is_whitespace)
}

proptest! {
    #[test]
    fn parts_never_exceed_limit(text in "[a-zё \n]{0,500}", max in 1usize..60) {
        for part in split_message(&text, max) {
            prop_assert!(part.chars().count() <= max);
        }
    }

    #[test]
    fn parts_reassemble_original(text in "[a-zA-Z0-9 \n]{0,500}", max in 1usize..60) {
        let parts = split_message(&text, max);
        prop_assert!(reassembles(&text, &parts), "parts {:?} do not rebuild {:?}", parts, text);
    }

    #[test]
    fn short_text_is_untouched(text in "[a-z \n]{0,40}") {
        prop_assert_eq!(split_message(&text, 40), vec![text]);
    }

    #[test]
    fn no_blank_parts_when_split(text in "[a-z \n]{41,300}", max in 1usize..40) {
        let parts = split_message(&text, max);
        prop_assert!(parts.iter().all(|p| !p.trim().is_empty()), "blank part in {:?}", parts);
    }
}
