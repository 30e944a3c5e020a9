//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{CompletionRequest, CompletionResponse, LlmError, LlmService};
use crate::store::{
    HistoryEntry, JsonProfileStore, StoreError, StoreResult, Turn, UserId, UserProfile,
};
use crate::transport::{ChatId, InlineKeyboard, MessageId, ParseMode, TransportResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-user profile persistence
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Existing profile, or a freshly persisted default one
    async fn get_profile(&self, user_id: UserId) -> StoreResult<UserProfile>;

    /// Last `limit` turns, oldest first
    async fn recent_history(&self, user_id: UserId, limit: usize)
        -> StoreResult<Vec<HistoryEntry>>;

    async fn set_model(&self, user_id: UserId, model: &str) -> StoreResult<()>;

    /// Flip web search and return the new value
    async fn toggle_web_search(&self, user_id: UserId) -> StoreResult<bool>;

    /// Append all `turns` in one write
    async fn append_exchange(&self, user_id: UserId, turns: Vec<Turn>) -> StoreResult<()>;

    async fn clear_history(&self, user_id: UserId) -> StoreResult<()>;
}

/// Client for making completion requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Outbound side of the messaging surface
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: Option<&InlineKeyboard>,
    ) -> TransportResult<MessageId>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: ParseMode,
    ) -> TransportResult<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> TransportResult<()>;

    /// Show a typing indicator
    async fn send_typing(&self, chat_id: ChatId) -> TransportResult<()>;

    /// Upload an in-memory buffer as a named file
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> TransportResult<()>;

    async fn download_file(&self, file_id: &str) -> TransportResult<Vec<u8>>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> TransportResult<()>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<UserProfile> {
        (**self).get_profile(user_id).await
    }

    async fn recent_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<HistoryEntry>> {
        (**self).recent_history(user_id, limit).await
    }

    async fn set_model(&self, user_id: UserId, model: &str) -> StoreResult<()> {
        (**self).set_model(user_id, model).await
    }

    async fn toggle_web_search(&self, user_id: UserId) -> StoreResult<bool> {
        (**self).toggle_web_search(user_id).await
    }

    async fn append_exchange(&self, user_id: UserId, turns: Vec<Turn>) -> StoreResult<()> {
        (**self).append_exchange(user_id, turns).await
    }

    async fn clear_history(&self, user_id: UserId) -> StoreResult<()> {
        (**self).clear_history(user_id).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        (**self).complete(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: Option<&InlineKeyboard>,
    ) -> TransportResult<MessageId> {
        (**self).send_text(chat_id, text, mode, keyboard).await
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: ParseMode,
    ) -> TransportResult<()> {
        (**self).edit_text(chat_id, message_id, text, mode).await
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> TransportResult<()> {
        (**self).delete_message(chat_id, message_id).await
    }

    async fn send_typing(&self, chat_id: ChatId) -> TransportResult<()> {
        (**self).send_typing(chat_id).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> TransportResult<()> {
        (**self).send_document(chat_id, file_name, bytes, caption).await
    }

    async fn download_file(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        (**self).download_file(file_id).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> TransportResult<()> {
        (**self).answer_callback(callback_id, text, show_alert).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Run a synchronous store call on the blocking pool
async fn blocking<R, F>(store: &JsonProfileStore, f: F) -> StoreResult<R>
where
    F: FnOnce(&JsonProfileStore) -> StoreResult<R> + Send + 'static,
    R: Send + 'static,
{
    let store = store.clone();
    let path = store.path().to_path_buf();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| StoreError::Io {
            path,
            source: std::io::Error::other(e),
        })?
}

#[async_trait]
impl ProfileStore for JsonProfileStore {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<UserProfile> {
        blocking(self, move |s| s.get_profile(user_id)).await
    }

    async fn recent_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<HistoryEntry>> {
        blocking(self, move |s| s.recent_history(user_id, limit)).await
    }

    async fn set_model(&self, user_id: UserId, model: &str) -> StoreResult<()> {
        let model = model.to_string();
        blocking(self, move |s| s.set_model(user_id, &model)).await
    }

    async fn toggle_web_search(&self, user_id: UserId) -> StoreResult<bool> {
        blocking(self, move |s| s.toggle_web_search(user_id)).await
    }

    async fn append_exchange(&self, user_id: UserId, turns: Vec<Turn>) -> StoreResult<()> {
        blocking(self, move |s| s.append_exchange(user_id, turns)).await
    }

    async fn clear_history(&self, user_id: UserId) -> StoreResult<()> {
        blocking(self, move |s| s.clear_history(user_id)).await
    }
}

/// Adapter to use an `LlmService` stack as `LlmClient`
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.service.complete(request).await
    }
}
