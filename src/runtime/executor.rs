//! Conversation runtime executor

use super::error::{CodeFileError, ExchangeError};
use super::locks::UserLocks;
use super::traits::{LlmClient, ProfileStore, Transport};

use crate::attachment::{self, AttachmentError};
use crate::chunk::{split_message, MAX_MESSAGE_LENGTH};
use crate::code_index::{filename_for, CodeIndex};
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, MessageRole};
use crate::render::{render, CodeBlock};
use crate::state_machine::{Exchange, ExchangeEvent};
use crate::store::{Turn, UserId, DEFAULT_HISTORY_LIMIT};
use crate::transport::{ChatId, InlineButton, InlineKeyboard, MessageId, ParseMode};
use std::time::Duration;

const THINKING_PLACEHOLDER: &str = "💭 <i>Thinking...</i>";
const IMAGE_PLACEHOLDER: &str = "🖼️ <i>Analyzing image...</i>";
const DOCUMENT_PLACEHOLDER: &str = "📄 <i>Reading file...</i>";
const DOWNLOAD_BUTTON: &str = "📥 Download file";

/// Tunables for exchange processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Turns of history sent as context
    pub history_limit: usize,
    /// Chunker limit, in characters
    pub max_message_length: usize,
    /// Document size cap, in bytes
    pub max_attachment_bytes: u64,
    /// Upper bound on one completion call
    pub completion_timeout: Duration,
    /// Pause between consecutive reply parts
    pub part_delay: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_message_length: MAX_MESSAGE_LENGTH,
            max_attachment_bytes: attachment::DEFAULT_MAX_ATTACHMENT_BYTES,
            completion_timeout: Duration::from_secs(120),
            part_delay: Duration::from_millis(500),
        }
    }
}

/// A document as announced by the transport, before download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_id: String,
    pub file_name: String,
    pub size: u64,
}

/// The new user turn of an exchange
#[derive(Debug, Clone)]
enum UserInput {
    Text(String),
    Image { prompt: String, jpeg: Vec<u8> },
}

impl UserInput {
    fn to_message(&self) -> ChatMessage {
        match self {
            UserInput::Text(text) => ChatMessage::text(MessageRole::User, text.clone()),
            UserInput::Image { prompt, jpeg } => ChatMessage::with_image(prompt.clone(), jpeg),
        }
    }

    /// What history keeps of this turn
    fn persisted_text(&self) -> String {
        match self {
            UserInput::Text(text) => text.clone(),
            UserInput::Image { prompt, .. } => attachment::image_turn_text(prompt),
        }
    }
}

/// Generic runtime that can work with any store, completion client and transport
pub struct ConversationRuntime<S, L, T>
where
    S: ProfileStore + 'static,
    L: LlmClient + 'static,
    T: Transport + 'static,
{
    store: S,
    llm_client: L,
    transport: T,
    settings: RuntimeSettings,
    code_index: CodeIndex,
    user_locks: UserLocks,
}

impl<S, L, T> ConversationRuntime<S, L, T>
where
    S: ProfileStore + 'static,
    L: LlmClient + 'static,
    T: Transport + 'static,
{
    pub fn new(store: S, llm_client: L, transport: T, settings: RuntimeSettings) -> Self {
        Self {
            store,
            llm_client,
            transport,
            settings,
            code_index: CodeIndex::new(),
            user_locks: UserLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one exchange for a plain text message
    pub async fn handle_text(&self, chat_id: ChatId, user_id: UserId, text: &str) -> Exchange {
        let mut exchange = Exchange::new(user_id);
        let mut placeholder = self.show_placeholder(chat_id, THINKING_PLACEHOLDER).await;

        let input = UserInput::Text(text.to_string());
        let result = self
            .run_exchange(&mut exchange, chat_id, &mut placeholder, input)
            .await;
        self.finish(&mut exchange, chat_id, placeholder, result).await;
        exchange
    }

    /// Run one exchange for a photo, already reduced to its largest variant
    pub async fn handle_photo(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Exchange {
        let mut exchange = Exchange::new(user_id);
        let mut placeholder = self.show_placeholder(chat_id, IMAGE_PLACEHOLDER).await;

        let result = match self.transport.download_file(file_id).await {
            Ok(jpeg) => {
                tracing::debug!(user_id, bytes = jpeg.len(), "Photo downloaded");
                let input = UserInput::Image {
                    prompt: attachment::photo_prompt(caption).to_string(),
                    jpeg,
                };
                self.run_exchange(&mut exchange, chat_id, &mut placeholder, input)
                    .await
            }
            Err(e) => Err(ExchangeError::TransportDownload(e)),
        };
        self.finish(&mut exchange, chat_id, placeholder, result).await;
        exchange
    }

    /// Run one exchange for a document. Oversized documents are refused
    /// before anything is downloaded or shown.
    pub async fn handle_document(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        document: &DocumentUpload,
        caption: Option<&str>,
    ) -> Exchange {
        let mut exchange = Exchange::new(user_id);

        if let Err(AttachmentError::TooLarge { size, limit }) =
            attachment::check_size(document.size, self.settings.max_attachment_bytes)
        {
            let result = Err(ExchangeError::AttachmentTooLarge { size, limit });
            self.finish(&mut exchange, chat_id, None, result).await;
            return exchange;
        }

        let mut placeholder = self.show_placeholder(chat_id, DOCUMENT_PLACEHOLDER).await;
        let result = match self.read_document(document, caption).await {
            Ok(prompt) => {
                self.run_exchange(&mut exchange, chat_id, &mut placeholder, UserInput::Text(prompt))
                    .await
            }
            Err(e) => Err(e),
        };
        self.finish(&mut exchange, chat_id, placeholder, result).await;
        exchange
    }

    /// Upload block `index` of the user's latest code-bearing reply
    pub async fn send_code_file(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        index: usize,
    ) -> Result<String, CodeFileError> {
        let block = self.code_index.get(user_id, index)?;
        let file_name = filename_for(&block, index);
        let caption = format!("📄 Code #{} ({})", index + 1, block.language);

        self.transport
            .send_document(chat_id, &file_name, block.code.into_bytes(), Some(&caption))
            .await?;

        tracing::info!(user_id, index, file_name = %file_name, "Code file sent");
        Ok(file_name)
    }

    // ==================== Exchange steps ====================

    async fn read_document(
        &self,
        document: &DocumentUpload,
        caption: Option<&str>,
    ) -> Result<String, ExchangeError> {
        let bytes = self
            .transport
            .download_file(&document.file_id)
            .await
            .map_err(ExchangeError::TransportDownload)?;

        let content = attachment::decode_text(&bytes).map_err(|_| ExchangeError::Decode)?;
        tracing::debug!(
            file_name = %document.file_name,
            bytes = bytes.len(),
            "Document decoded"
        );
        Ok(attachment::document_prompt(
            caption,
            &document.file_name,
            &content,
        ))
    }

    /// Context through persistence, under the user's lock. History is only
    /// written in the last step, so any earlier error leaves it untouched.
    async fn run_exchange(
        &self,
        exchange: &mut Exchange,
        chat_id: ChatId,
        placeholder: &mut Option<MessageId>,
        input: UserInput,
    ) -> Result<(), ExchangeError> {
        let user_id = exchange.user_id;
        let _guard = self.user_locks.acquire(user_id).await;

        let request = self.build_request(user_id, &input).await?;
        advance(exchange, ExchangeEvent::ContextLoaded);

        advance(exchange, ExchangeEvent::RequestSent);
        if let Err(e) = self.transport.send_typing(chat_id).await {
            tracing::debug!(error = %e, "Typing indicator failed");
        }
        let response = self.request_completion(&request).await?;
        advance(exchange, ExchangeEvent::ReplyArrived);

        let rendered = render(&response.text);
        if !rendered.code_blocks.is_empty() {
            self.code_index.store(user_id, rendered.code_blocks.clone());
        }
        advance(exchange, ExchangeEvent::ReplyRendered);

        let parts = split_message(&rendered.markup, self.settings.max_message_length);
        advance(exchange, ExchangeEvent::ReplyChunked);

        if let Some(message_id) = placeholder.take() {
            if let Err(e) = self.transport.delete_message(chat_id, message_id).await {
                tracing::warn!(error = %e, "Failed to delete placeholder");
            }
        }
        self.deliver(chat_id, &parts, &rendered.code_blocks).await;
        advance(exchange, ExchangeEvent::PartsDelivered);

        let turns = vec![
            Turn::user(input.persisted_text()),
            Turn::assistant(response.text),
        ];
        self.store.append_exchange(user_id, turns).await?;
        advance(exchange, ExchangeEvent::TurnsPersisted);

        tracing::info!(
            user_id,
            parts = parts.len(),
            code_blocks = rendered.code_blocks.len(),
            "Exchange persisted"
        );
        Ok(())
    }

    async fn build_request(
        &self,
        user_id: UserId,
        input: &UserInput,
    ) -> Result<CompletionRequest, ExchangeError> {
        let profile = self.store.get_profile(user_id).await?;
        let history = self
            .store
            .recent_history(user_id, self.settings.history_limit)
            .await?;

        let mut messages: Vec<ChatMessage> = history.into_iter().map(ChatMessage::from).collect();
        messages.push(input.to_message());

        Ok(CompletionRequest {
            model: profile.model,
            messages,
            web_search: profile.web_search_enabled,
        })
    }

    async fn request_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ExchangeError> {
        let timeout = self.settings.completion_timeout;
        match tokio::time::timeout(timeout, self.llm_client.complete(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ExchangeError::CompletionApi(e)),
            Err(_) => Err(ExchangeError::CompletionTimeout(timeout)),
        }
    }

    /// Send every part, then one download control per code block
    async fn deliver(&self, chat_id: ChatId, parts: &[String], code_blocks: &[CodeBlock]) {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 && !self.settings.part_delay.is_zero() {
                tokio::time::sleep(self.settings.part_delay).await;
            }
            self.send_with_fallback(chat_id, part, None).await;
        }

        for (i, block) in code_blocks.iter().enumerate() {
            let text = format!(
                "📥 <b>Code #{} ({})</b>\n<i>Press the button to download the file</i>",
                i + 1,
                block.language
            );
            let keyboard =
                InlineKeyboard::single(InlineButton::new(DOWNLOAD_BUTTON, format!("download_{i}")));
            self.send_with_fallback(chat_id, &text, Some(&keyboard)).await;
        }
    }

    /// HTML first; if the transport rejects the markup, the same text as plain
    async fn send_with_fallback(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Option<MessageId> {
        match self
            .transport
            .send_text(chat_id, text, ParseMode::Html, keyboard)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "HTML send failed, retrying as plain text");
                match self
                    .transport
                    .send_text(chat_id, text, ParseMode::Plain, keyboard)
                    .await
                {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to deliver message part");
                        None
                    }
                }
            }
        }
    }

    async fn show_placeholder(&self, chat_id: ChatId, text: &str) -> Option<MessageId> {
        match self
            .transport
            .send_text(chat_id, text, ParseMode::Html, None)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send placeholder");
                None
            }
        }
    }

    /// Record the outcome and, on failure, tell the user
    async fn finish(
        &self,
        exchange: &mut Exchange,
        chat_id: ChatId,
        placeholder: Option<MessageId>,
        result: Result<(), ExchangeError>,
    ) {
        let Err(error) = result else {
            return;
        };

        advance(exchange, ExchangeEvent::Failed(error.kind()));
        tracing::warn!(
            user_id = exchange.user_id,
            kind = ?error.kind(),
            trail = ?exchange.trail(),
            error = %error,
            "Exchange failed"
        );

        let notice = error.user_notice();
        if let Some(message_id) = placeholder {
            match self
                .transport
                .edit_text(chat_id, message_id, &notice, ParseMode::Plain)
                .await
            {
                Ok(()) => return,
                Err(e) => tracing::warn!(error = %e, "Failed to edit placeholder"),
            }
        }
        if let Err(e) = self
            .transport
            .send_text(chat_id, &notice, ParseMode::Plain, None)
            .await
        {
            tracing::error!(error = %e, "Failed to send failure notice");
        }
    }
}

/// Apply an event the executor's own control flow guarantees is valid
fn advance(exchange: &mut Exchange, event: ExchangeEvent) {
    if let Err(e) = exchange.apply(event) {
        tracing::error!(user_id = exchange.user_id, error = %e, "Exchange transition rejected");
    }
}
