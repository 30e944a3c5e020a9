//! Update dispatch: commands, inline-button callbacks and conversation input

pub mod replies;

use crate::llm::find_model;
use crate::runtime::{
    CodeFileError, ConversationRuntime, DocumentUpload, LlmClient, ProfileStore, Transport,
};
use crate::store::{StoreError, UserId};
use crate::telegram::types::{CallbackQuery, Message, Update};
use crate::transport::{ChatId, ParseMode, TransportError};
use std::sync::Arc;
use thiserror::Error;

/// Name used for documents that arrive without one
const UNNAMED_DOCUMENT: &str = "document";

/// Slash commands the bot answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Model,
    Web,
    Clear,
    History,
    Help,
}

impl Command {
    /// Parse `/name`, `/name@botname` or `/name args`. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "model" => Some(Command::Model),
            "web" => Some(Command::Web),
            "clear" => Some(Command::Clear),
            "history" => Some(Command::History),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Inline-button payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SelectModel(String),
    /// 0-based block index; `None` when the payload index is unparseable
    Download(Option<usize>),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix("model_") {
            return Some(CallbackAction::SelectModel(id.to_string()));
        }
        data.strip_prefix("download_")
            .map(|n| CallbackAction::Download(n.parse().ok()))
    }
}

#[derive(Error, Debug)]
enum DispatchError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Routes incoming updates to the conversation runtime
pub struct Dispatcher<S, L, T>
where
    S: ProfileStore + 'static,
    L: LlmClient + 'static,
    T: Transport + 'static,
{
    runtime: Arc<ConversationRuntime<S, L, T>>,
}

impl<S, L, T> Dispatcher<S, L, T>
where
    S: ProfileStore + 'static,
    L: LlmClient + 'static,
    T: Transport + 'static,
{
    pub fn new(runtime: Arc<ConversationRuntime<S, L, T>>) -> Self {
        Self { runtime }
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(message).await;
        } else if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await;
        } else {
            tracing::debug!(update_id = update.update_id, "Ignoring update kind");
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(user_id) = message.from.as_ref().map(|u| u.id) else {
            tracing::debug!(message_id = message.message_id, "Message without sender");
            return;
        };
        let chat_id = message.chat.id;

        if let Some(text) = message.text.as_deref() {
            if text.starts_with('/') {
                match Command::parse(text) {
                    Some(command) => self.run_command(chat_id, user_id, command).await,
                    None => tracing::debug!(user_id, "Ignoring unknown command"),
                }
                return;
            }
            let exchange = self.runtime.handle_text(chat_id, user_id, text).await;
            tracing::debug!(user_id, phase = %exchange.phase(), "Text exchange finished");
            return;
        }

        let caption = message.caption.as_deref();
        if let Some(photo) = message.largest_photo() {
            let exchange = self
                .runtime
                .handle_photo(chat_id, user_id, &photo.file_id, caption)
                .await;
            tracing::debug!(user_id, phase = %exchange.phase(), "Photo exchange finished");
        } else if let Some(document) = &message.document {
            let upload = DocumentUpload {
                file_id: document.file_id.clone(),
                file_name: document
                    .file_name
                    .clone()
                    .unwrap_or_else(|| UNNAMED_DOCUMENT.to_string()),
                size: document.file_size.unwrap_or(0),
            };
            let exchange = self
                .runtime
                .handle_document(chat_id, user_id, &upload, caption)
                .await;
            tracing::debug!(user_id, phase = %exchange.phase(), "Document exchange finished");
        } else {
            tracing::debug!(user_id, "Ignoring message without text, photo or document");
        }
    }

    async fn run_command(&self, chat_id: ChatId, user_id: UserId, command: Command) {
        tracing::info!(user_id, ?command, "Command");
        if let Err(e) = self.reply_to_command(chat_id, user_id, command).await {
            tracing::error!(user_id, ?command, error = %e, "Command failed");
            if matches!(e, DispatchError::Store(_)) {
                if let Err(e) = self
                    .runtime
                    .transport()
                    .send_text(chat_id, replies::STORAGE_FAILED, ParseMode::Plain, None)
                    .await
                {
                    tracing::warn!(user_id, error = %e, "Failed to send storage notice");
                }
            }
        }
    }

    async fn reply_to_command(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        command: Command,
    ) -> Result<(), DispatchError> {
        let store = self.runtime.store();
        let transport = self.runtime.transport();

        let (text, keyboard) = match command {
            Command::Start => {
                let profile = store.get_profile(user_id).await?;
                (
                    replies::start(&profile.model, profile.web_search_enabled),
                    None,
                )
            }
            Command::Model => {
                let profile = store.get_profile(user_id).await?;
                (
                    replies::model_picker(&profile.model),
                    Some(replies::models_keyboard()),
                )
            }
            Command::Web => {
                let enabled = store.toggle_web_search(user_id).await?;
                (replies::web_toggled(enabled), None)
            }
            Command::Clear => {
                store.clear_history(user_id).await?;
                (replies::HISTORY_CLEARED.to_string(), None)
            }
            Command::History => {
                let entries = store
                    .recent_history(user_id, replies::HISTORY_PREVIEW_TURNS)
                    .await?;
                (replies::history(&entries), None)
            }
            Command::Help => {
                let profile = store.get_profile(user_id).await?;
                (replies::help(profile.web_search_enabled), None)
            }
        };

        transport
            .send_text(chat_id, &text, ParseMode::Html, keyboard.as_ref())
            .await?;
        Ok(())
    }

    async fn handle_callback(&self, callback: CallbackQuery) {
        let user_id = callback.from.id;
        let action = callback.data.as_deref().and_then(CallbackAction::parse);

        let (answer, show_alert) = match action {
            Some(CallbackAction::SelectModel(model_id)) => {
                self.select_model(&callback, &model_id).await;
                (None, false)
            }
            Some(CallbackAction::Download(index)) => {
                let chat_id = callback.message.as_ref().map_or(user_id, |m| m.chat.id);
                self.download(chat_id, user_id, index).await
            }
            None => {
                tracing::debug!(user_id, data = ?callback.data, "Unknown callback");
                (None, false)
            }
        };

        if let Err(e) = self
            .runtime
            .transport()
            .answer_callback(&callback.id, answer, show_alert)
            .await
        {
            tracing::warn!(user_id, error = %e, "Failed to answer callback");
        }
    }

    async fn select_model(&self, callback: &CallbackQuery, model_id: &str) {
        let user_id = callback.from.id;
        let Some(model) = find_model(model_id) else {
            tracing::warn!(user_id, model_id, "Unknown model selected");
            return;
        };

        if let Err(e) = self.runtime.store().set_model(user_id, model.id).await {
            tracing::error!(user_id, error = %e, "Failed to save model");
            return;
        }
        tracing::info!(user_id, model = model.id, "Model changed");

        if let Some(message) = &callback.message {
            if let Err(e) = self
                .runtime
                .transport()
                .edit_text(
                    message.chat.id,
                    message.message_id,
                    &replies::model_changed(model.id),
                    ParseMode::Html,
                )
                .await
            {
                tracing::warn!(user_id, error = %e, "Failed to confirm model change");
            }
        }
    }

    async fn download(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        index: Option<usize>,
    ) -> (Option<&'static str>, bool) {
        let Some(index) = index else {
            return (Some(replies::CODE_NOT_FOUND), true);
        };

        match self.runtime.send_code_file(chat_id, user_id, index).await {
            Ok(_) => (Some(replies::FILE_SENT), false),
            Err(CodeFileError::NotFound(_)) => (Some(replies::CODE_NOT_FOUND), true),
            Err(CodeFileError::Upload(e)) => {
                tracing::error!(user_id, index, error = %e, "Code file upload failed");
                (Some(replies::FILE_FAILED), true)
            }
        }
    }
}
