//! Telegram Bot API transport
//!
//! Plain HTTPS calls to `{api_base}/bot{token}/{method}`; files come from
//! `{api_base}/file/bot{token}/{file_path}`. URLs carry the token, so they
//! are stripped from every error before it can reach a log line.

pub mod types;

use crate::runtime::Transport;
use crate::transport::{
    ChatId, InlineKeyboard, MessageId, ParseMode, TransportError, TransportResult,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use types::{ApiResponse, File, SentMessage, Update, User};

/// Headroom on top of the long-poll timeout before the HTTP client gives up
const POLL_GRACE: Duration = Duration::from_secs(15);

pub struct TelegramTransport {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramTransport {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        poll_timeout: Duration,
    ) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(poll_timeout + POLL_GRACE)
            .build()
            .map_err(http_error)?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.token)
    }

    /// Verify the token and return the bot's own account
    pub async fn get_me(&self) -> TransportResult<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> TransportResult<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"]
            }),
        )
        .await
    }

    async fn call<P, R>(&self, method: &'static str, payload: &P) -> TransportResult<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await
            .map_err(http_error)?;
        Self::read_result(method, response).await
    }

    /// The Bot API answers errors with a JSON envelope too, so the body is
    /// parsed regardless of HTTP status
    async fn read_result<R: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> TransportResult<R> {
        let body = response.text().await.map_err(http_error)?;
        let envelope: ApiResponse<R> = serde_json::from_str(&body)
            .map_err(|source| TransportError::Decode { method, source })?;
        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope<R>(method: &'static str, envelope: ApiResponse<R>) -> TransportResult<R> {
    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse { description, .. } => Err(TransportError::Api {
            method,
            description: description.unwrap_or_else(|| "no description".to_string()),
        }),
    }
}

fn http_error(e: reqwest::Error) -> TransportError {
    TransportError::Http(e.without_url())
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: Option<&InlineKeyboard>,
    ) -> TransportResult<MessageId> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(parse_mode) = mode.as_api_str() {
            payload["parse_mode"] = json!(parse_mode);
        }
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = json!(keyboard);
        }

        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        Ok(sent.message_id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: ParseMode,
    ) -> TransportResult<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(parse_mode) = mode.as_api_str() {
            payload["parse_mode"] = json!(parse_mode);
        }

        // Result is the edited message or `true`; neither is needed
        let _: Value = self.call("editMessageText", &payload).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> TransportResult<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({"chat_id": chat_id, "message_id": message_id}),
            )
            .await?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: ChatId) -> TransportResult<()> {
        let _: bool = self
            .call(
                "sendChatAction",
                &json!({"chat_id": chat_id, "action": "typing"}),
            )
            .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> TransportResult<()> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(http_error)?;
        let _: SentMessage = Self::read_result("sendDocument", response).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> TransportResult<Vec<u8>> {
        let file: File = self.call("getFile", &json!({"file_id": file_id})).await?;
        let file_path = file.file_path.ok_or_else(|| TransportError::Api {
            method: "getFile",
            description: "missing file_path in response".to_string(),
        })?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                method: "downloadFile",
                description: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(http_error)?;
        Ok(bytes.to_vec())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> TransportResult<()> {
        let mut payload = json!({
            "callback_query_id": callback_id,
            "show_alert": show_alert,
        });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }

        let _: bool = self.call("answerCallbackQuery", &payload).await?;
        Ok(())
    }
}
