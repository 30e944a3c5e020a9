//! In-memory index of the code blocks from each user's latest reply
//!
//! Entries live for the process lifetime only. A reply that contains code
//! replaces the user's list wholesale; a reply without code leaves the
//! previous list in place, so older download buttons keep working until the
//! next reply with code arrives.

use crate::render::CodeBlock;
use crate::store::UserId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeIndexError {
    #[error("No code block {index} for user {user_id}")]
    NotFound { user_id: UserId, index: usize },
}

/// Per-user list of downloadable code blocks
#[derive(Debug, Default)]
pub struct CodeIndex {
    entries: RwLock<HashMap<UserId, Vec<CodeBlock>>>,
}

impl CodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored blocks for `user_id`. Last write wins.
    pub fn store(&self, user_id: UserId, blocks: Vec<CodeBlock>) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(user_id, blocks);
    }

    /// Block `index` (0-based) of the user's latest stored reply
    pub fn get(&self, user_id: UserId, index: usize) -> Result<CodeBlock, CodeIndexError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&user_id)
            .and_then(|blocks| blocks.get(index))
            .cloned()
            .ok_or(CodeIndexError::NotFound { user_id, index })
    }
}

/// File extension for a code block language; `txt` when unmapped
pub fn extension_for(language: &str) -> &'static str {
    match language {
        "python" => "py",
        "javascript" => "js",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "csharp" => "cs",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "bash" => "sh",
        "php" => "php",
        "ruby" => "rb",
        "go" => "go",
        "rust" => "rs",
        "typescript" => "ts",
        _ => "txt",
    }
}

/// Download file name for block `index` (0-based): `code_{index+1}.{ext}`
pub fn filename_for(block: &CodeBlock, index: usize) -> String {
    format!("code_{}.{}", index + 1, extension_for(&block.language))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    fn block(language: &str, code: &str) -> CodeBlock {
        CodeBlock {
            language: language.to_string(),
            code: code.to_string(),
            source_span: 0..0,
        }
    }

    #[test]
    fn test_rendered_python_block_downloads_as_code_1_py() {
        let index = CodeIndex::new();
        let rendered = render("Here:\n```python\nprint(1)\n```\nDone");
        index.store(7, rendered.code_blocks);

        let found = index.get(7, 0).unwrap();
        assert_eq!(found.code, "print(1)");
        assert_eq!(filename_for(&found, 0), "code_1.py");
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let index = CodeIndex::new();
        index.store(1, vec![block("rust", "a"), block("go", "b")]);
        index.store(1, vec![block("sql", "c")]);

        assert_eq!(index.get(1, 0).unwrap().code, "c");
        assert_eq!(
            index.get(1, 1),
            Err(CodeIndexError::NotFound {
                user_id: 1,
                index: 1
            })
        );
    }

    #[test]
    fn test_users_are_isolated() {
        let index = CodeIndex::new();
        index.store(1, vec![block("rust", "mine")]);

        assert!(index.get(2, 0).is_err());
        assert_eq!(index.get(1, 0).unwrap().code, "mine");
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let index = CodeIndex::new();
        assert_eq!(
            index.get(42, 0),
            Err(CodeIndexError::NotFound {
                user_id: 42,
                index: 0
            })
        );
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for("python"), "py");
        assert_eq!(extension_for("javascript"), "js");
        assert_eq!(extension_for("csharp"), "cs");
        assert_eq!(extension_for("bash"), "sh");
        assert_eq!(extension_for("rust"), "rs");
        assert_eq!(extension_for("typescript"), "ts");
        assert_eq!(extension_for("text"), "txt");
        assert_eq!(extension_for("brainfuck"), "txt");
        assert_eq!(extension_for(""), "txt");
    }

    #[test]
    fn test_filename_is_one_based_and_never_empty() {
        for (i, lang) in ["python", "c", "unknown", ""].iter().enumerate() {
            let name = filename_for(&block(lang, "x"), i);
            assert!(name.starts_with(&format!("code_{}.", i + 1)));
            assert!(!name.ends_with('.'));
        }
        assert_eq!(filename_for(&block("go", ""), 9), "code_10.go");
    }
}
