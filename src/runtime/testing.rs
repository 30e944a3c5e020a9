//! Mock implementations for testing
//!
//! These mocks enable exchange and bot tests without real I/O.

use super::traits::*;
use crate::llm::{CompletionRequest, CompletionResponse, LlmError};
use crate::store::{
    HistoryEntry, JsonProfileStore, StoreError, StoreResult, Turn, UserId, UserProfile,
};
use crate::transport::{
    ChatId, InlineKeyboard, MessageId, ParseMode, TransportError, TransportResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock completion client that returns queued responses
#[derive(Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.queue_response(CompletionResponse::text(text));
    }

    pub fn queue_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<CompletionResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }
}

// ============================================================================
// Delayed Mock LLM Client (for timeout and ordering tests)
// ============================================================================

/// Mock completion client that sleeps before answering
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
}

impl DelayedMockLlmClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(),
            delay,
        }
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.inner.queue_reply(text);
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }
}

// ============================================================================
// Recording Transport
// ============================================================================

/// One outbound transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    SendText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        mode: ParseMode,
        keyboard: Option<InlineKeyboard>,
    },
    EditText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        mode: ParseMode,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Typing {
        chat_id: ChatId,
    },
    Document {
        chat_id: ChatId,
        file_name: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
    AnswerCallback {
        callback_id: String,
        text: Option<String>,
        show_alert: bool,
    },
}

/// Transport that records every call and serves downloads from a map
pub struct RecordingTransport {
    calls: Mutex<Vec<OutboundCall>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    next_message_id: AtomicI64,
    reject_html: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(1),
            reject_html: AtomicBool::new(false),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `file_id` downloadable
    pub fn add_file(&self, file_id: impl Into<String>, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(file_id.into(), bytes);
    }

    /// Fail every HTML send the way the Bot API does on broken markup
    pub fn reject_html(&self) {
        self.reject_html.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts sent with `mode`, in order
    pub fn sent_texts(&self, mode: ParseMode) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCall::SendText { text, mode: m, .. } if m == mode => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Keyboards attached to sent messages, in order
    pub fn keyboards(&self) -> Vec<InlineKeyboard> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCall::SendText { keyboard, .. } => keyboard,
                _ => None,
            })
            .collect()
    }

    /// New texts of edited messages
    pub fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCall::EditText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Uploaded files as `(name, bytes, caption)`
    pub fn documents(&self) -> Vec<(String, Vec<u8>, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCall::Document {
                    file_name,
                    bytes,
                    caption,
                    ..
                } => Some((file_name, bytes, caption)),
                _ => None,
            })
            .collect()
    }

    /// Callback answers as `(text, show_alert)`
    pub fn callback_answers(&self) -> Vec<(Option<String>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCall::AnswerCallback {
                    text, show_alert, ..
                } => Some((text, show_alert)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: OutboundCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: Option<&InlineKeyboard>,
    ) -> TransportResult<MessageId> {
        if mode == ParseMode::Html && self.reject_html.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                method: "sendMessage",
                description: "Bad Request: can't parse entities".to_string(),
            });
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.record(OutboundCall::SendText {
            chat_id,
            message_id,
            text: text.to_string(),
            mode,
            keyboard: keyboard.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: ParseMode,
    ) -> TransportResult<()> {
        self.record(OutboundCall::EditText {
            chat_id,
            message_id,
            text: text.to_string(),
            mode,
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> TransportResult<()> {
        self.record(OutboundCall::Delete {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn send_typing(&self, chat_id: ChatId) -> TransportResult<()> {
        self.record(OutboundCall::Typing { chat_id });
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> TransportResult<()> {
        self.record(OutboundCall::Document {
            chat_id,
            file_name: file_name.to_string(),
            bytes,
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| TransportError::Api {
                method: "getFile",
                description: "Bad Request: invalid file_id".to_string(),
            })
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> TransportResult<()> {
        self.record(OutboundCall::AnswerCallback {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }
}

// ============================================================================
// Flaky Store
// ============================================================================

/// Real store whose exchange appends can be made to fail
pub struct FlakyStore {
    inner: JsonProfileStore,
    fail_appends: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: JsonProfileStore) -> Self {
        Self {
            inner,
            fail_appends: AtomicBool::new(false),
        }
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &JsonProfileStore {
        &self.inner
    }
}

#[async_trait]
impl ProfileStore for FlakyStore {
    async fn get_profile(&self, user_id: UserId) -> StoreResult<UserProfile> {
        ProfileStore::get_profile(&self.inner, user_id).await
    }

    async fn recent_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<HistoryEntry>> {
        ProfileStore::recent_history(&self.inner, user_id, limit).await
    }

    async fn set_model(&self, user_id: UserId, model: &str) -> StoreResult<()> {
        ProfileStore::set_model(&self.inner, user_id, model).await
    }

    async fn toggle_web_search(&self, user_id: UserId) -> StoreResult<bool> {
        ProfileStore::toggle_web_search(&self.inner, user_id).await
    }

    async fn append_exchange(&self, user_id: UserId, turns: Vec<Turn>) -> StoreResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: self.inner.path().to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        ProfileStore::append_exchange(&self.inner, user_id, turns).await
    }

    async fn clear_history(&self, user_id: UserId) -> StoreResult<()> {
        ProfileStore::clear_history(&self.inner, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, MessageRole};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage::text(MessageRole::User, "hi")],
            web_search: true,
        }
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let mock = MockLlmClient::new();
        mock.queue_reply("Hello");

        let response = mock.complete(&request()).await.unwrap();
        assert_eq!(response.text, "Hello");

        // Second call should fail (no more responses)
        assert!(mock.complete(&request()).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_recording_transport_downloads() {
        let transport = RecordingTransport::new();
        transport.add_file("f1", vec![1, 2, 3]);

        assert_eq!(transport.download_file("f1").await.unwrap(), vec![1, 2, 3]);
        assert!(transport.download_file("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_recording_transport_rejects_html_on_demand() {
        let transport = RecordingTransport::new();
        transport.reject_html();

        assert!(transport
            .send_text(1, "<b>x</b>", ParseMode::Html, None)
            .await
            .is_err());
        let id = transport
            .send_text(1, "<b>x</b>", ParseMode::Plain, None)
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(transport.sent_texts(ParseMode::Plain), vec!["<b>x</b>"]);
    }
}
