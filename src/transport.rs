//! Messaging surface vocabulary shared by the runtime and the bot adapter

use serde::Serialize;
use thiserror::Error;

pub type ChatId = i64;
pub type MessageId = i64;

/// Markup dialect of an outgoing text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Plain,
}

impl ParseMode {
    /// Value for the Bot API `parse_mode` field; plain text sends none
    pub fn as_api_str(self) -> Option<&'static str> {
        match self {
            ParseMode::Html => Some("HTML"),
            ParseMode::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Rows of buttons, serialized as a Bot API `InlineKeyboardMarkup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// A keyboard with one button
    pub fn single(button: InlineButton) -> Self {
        Self {
            inline_keyboard: vec![vec![button]],
        }
    }

    /// One button per row
    pub fn column(buttons: impl IntoIterator<Item = InlineButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    #[cfg(test)]
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.inline_keyboard.iter().flatten()
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} rejected: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
    #[error("{method} returned an unexpected body: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;
