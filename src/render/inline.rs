//! Inline markdown substitutions
//!
//! Three passes in a fixed order, each over the previous pass's output:
//! bold (`**x**`), italic (`*x*`), inline code (`` `x` ``). Bold must run
//! before italic or `**x**` would come out as nested emphasis.

/// What may appear between an opening and closing delimiter
#[derive(Debug, Clone, Copy)]
enum Content {
    /// Anything except a newline, possibly empty
    SingleLine,
    /// At least one character; newlines allowed
    NonEmpty,
}

struct Rule {
    delimiter: &'static str,
    open: &'static str,
    close: &'static str,
    content: Content,
}

const BOLD: Rule = Rule {
    delimiter: "**",
    open: "<b>",
    close: "</b>",
    content: Content::SingleLine,
};

const ITALIC: Rule = Rule {
    delimiter: "*",
    open: "<i>",
    close: "</i>",
    content: Content::SingleLine,
};

const CODE: Rule = Rule {
    delimiter: "`",
    open: "<code>",
    close: "</code>",
    content: Content::NonEmpty,
};

/// Apply bold, italic and inline-code substitutions to prose
pub fn apply(text: &str) -> String {
    let bold = substitute(text, &BOLD);
    let italic = substitute(&bold, &ITALIC);
    substitute(&italic, &CODE)
}

/// Replace every delimited span, leftmost first, shortest closing match.
/// A delimiter with no acceptable closing partner is kept literally and the
/// scan moves on by one byte.
fn substitute(text: &str, rule: &Rule) -> String {
    let delimiter = rule.delimiter;
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((before, after)) = rest.split_once(delimiter) {
        // Content can never contain the delimiter itself, so the first
        // occurrence is the only candidate for a closing partner.
        let closing = after
            .split_once(delimiter)
            .filter(|(content, _)| match rule.content {
                Content::SingleLine => !content.contains('\n'),
                Content::NonEmpty => !content.is_empty(),
            });

        if let Some((content, tail)) = closing {
            out.push_str(before);
            out.push_str(rule.open);
            out.push_str(content);
            out.push_str(rule.close);
            rest = tail;
        } else {
            // Delimiters are ASCII: one byte forward is a char boundary
            let (kept, remainder) = rest.split_at(before.len() + 1);
            out.push_str(kept);
            rest = remainder;
        }
    }

    out.push_str(rest);
    out
}
