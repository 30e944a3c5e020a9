//! User-facing texts and keyboards of the bot surface
//!
//! All texts are sent with HTML parse mode.

use crate::llm::{all_models, display_name};
use crate::render::escape_html;
use crate::store::{HistoryEntry, Role};
use crate::transport::{InlineButton, InlineKeyboard};

/// Turns shown by `/history`
pub const HISTORY_PREVIEW_TURNS: usize = 10;
/// Characters of each turn shown by `/history`
const HISTORY_PREVIEW_CHARS: usize = 80;

pub const HISTORY_CLEARED: &str = "🗑️ <b>History cleared!</b>";
pub const HISTORY_EMPTY: &str = "📭 <b>History is empty</b>";
pub const CODE_NOT_FOUND: &str = "❌ Code not found";
pub const FILE_SENT: &str = "✅ File sent!";
pub const FILE_FAILED: &str = "❌ Error creating the file";
pub const STORAGE_FAILED: &str = "❌ Storage error. Please try again.";

fn web_label(enabled: bool) -> &'static str {
    if enabled {
        "🌐 On"
    } else {
        "🔌 Off"
    }
}

pub fn start(model: &str, web_search: bool) -> String {
    format!(
        "🤖 <b>Hi! I am an AI assistant with memory.</b>\n\n\
         📊 Model: {}\n\
         🌐 Web search: {}\n\n\
         <b>Commands:</b>\n\
         🔄 /model - choose a model\n\
         🌐 /web - toggle web search\n\
         🗑️ /clear - clear history\n\
         📚 /history - show history\n\
         ❓ /help - help\n\n\
         <b>What I can do:</b>\n\
         💬 Answer questions\n\
         🌐 Search the web\n\
         📸 Analyze images\n\
         📄 Read code files\n\
         💾 Remember the conversation\n\n\
         <i>Write to me, send a photo or a file!</i>",
        display_name(model),
        web_label(web_search)
    )
}

pub fn web_toggled(enabled: bool) -> String {
    let (status, detail) = if enabled {
        (
            "🌐 <b>On</b>",
            "I can now look up current information on the web!",
        )
    } else {
        ("🔌 <b>Off</b>", "Answering from my own knowledge only.")
    };
    format!("🌐 <b>Web search</b>\n\nStatus: {status}\n\n<i>{detail}</i>")
}

pub fn model_picker(model: &str) -> String {
    format!(
        "🎯 <b>Model selection</b>\n\nCurrent: {}\n\nChoose a new model:",
        display_name(model)
    )
}

pub fn model_changed(model: &str) -> String {
    format!(
        "✅ <b>Model changed!</b>\n\nSelected: {}",
        display_name(model)
    )
}

/// One button per catalogue entry, data `model_<id>`
pub fn models_keyboard() -> InlineKeyboard {
    InlineKeyboard::column(
        all_models()
            .iter()
            .map(|m| InlineButton::new(m.label, format!("model_{}", m.id))),
    )
}

pub fn history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return HISTORY_EMPTY.to_string();
    }

    let mut text = format!("📚 <b>Last {HISTORY_PREVIEW_TURNS} messages:</b>\n\n");
    for entry in entries {
        let role = match entry.role {
            Role::User => "👤 You",
            Role::Assistant => "🤖 AI",
        };
        text.push_str(&format!(
            "<b>{role}:</b>\n{}\n\n",
            escape_html(&preview(&entry.content))
        ));
    }
    text
}

fn preview(content: &str) -> String {
    if content.chars().count() > HISTORY_PREVIEW_CHARS {
        let head: String = content.chars().take(HISTORY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

pub fn help(web_search: bool) -> String {
    let status = if web_search { "🌐 On" } else { "🔌 Off" };
    format!(
        "❓ <b>Help</b>\n\n\
         I am an AI assistant with memory and web access.\n\n\
         <b>Features:</b>\n\
         • 🌐 Web search ({status})\n\
         • 🤖 Several AI models to choose from\n\
         • 💾 Memory of previous messages\n\
         • 💻 Formatted code\n\
         • 📥 Code downloads as files\n\
         • 📸 Image analysis\n\
         • 📄 Reading code files\n\n\
         <b>Commands:</b>\n\
         /model - choose an AI model\n\
         /web - toggle web search\n\
         /clear - clear history\n\
         /history - view history\n\
         /help - this help\n\n\
         <b>How to use:</b>\n\
         💬 Text - just ask a question\n\
         📸 Photo - send an image\n\
         📄 File - attach code (up to 20 MB)\n\n\
         <i>I understand context and remember the conversation!</i>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: Role, content: &str) -> HistoryEntry {
        HistoryEntry {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_start_shows_model_label_and_status() {
        let text = start("gpt-4o", false);
        assert!(text.contains("📊 Model: 🟢 GPT-4o"));
        assert!(text.contains("🌐 Web search: 🔌 Off"));
    }

    #[test]
    fn test_unknown_model_shown_by_id() {
        assert!(model_picker("old-model").contains("Current: old-model"));
    }

    #[test]
    fn test_models_keyboard() {
        let keyboard = models_keyboard();
        let data: Vec<_> = keyboard.buttons().map(|b| b.callback_data.as_str()).collect();
        assert_eq!(
            data,
            vec![
                "model_gemini-3-pro",
                "model_gpt-4o",
                "model_claude-3.5-sonnet",
                "model_gpt-4-turbo",
                "model_gemini-2-flash"
            ]
        );
    }

    #[test]
    fn test_history_truncates_and_escapes() {
        let long = "y".repeat(100);
        let text = history(&[entry(Role::User, &long), entry(Role::Assistant, "a < b")]);

        assert!(text.contains(&format!("{}...", "y".repeat(80))));
        assert!(!text.contains(&"y".repeat(81)));
        assert!(text.contains("<b>🤖 AI:</b>\na &lt; b"));
    }

    #[test]
    fn test_history_exactly_80_chars_is_not_truncated() {
        let exact = "z".repeat(80);
        let text = history(&[entry(Role::User, &exact)]);
        assert!(text.contains(&format!("{exact}\n")));
        assert!(!text.contains("..."));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(history(&[]), HISTORY_EMPTY);
    }

    #[test]
    fn test_web_toggled() {
        assert!(web_toggled(true).contains("🌐 <b>On</b>"));
        assert!(web_toggled(false).contains("🔌 <b>Off</b>"));
    }

    #[test]
    fn test_help_mentions_status() {
        assert!(help(true).contains("Web search (🌐 On)"));
    }
}
