//! Raw Telegram Bot API calls

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use super::backoff::is_recoverable;
use super::polling::PollError;
use super::types::*;
use crate::channels::ProgressFn;
use crate::{Error, Result};

impl super::TelegramChannel {
    fn method_url(&self, method: &str) -> String {
        format!("{}{}/{method}", self.api_base, self.token)
    }

    /// POST a Bot API method and unwrap the `result` field
    async fn call<Req, T>(&self, method: &str, request: &Req) -> Result<T>
    where
        Req: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&format!("Telegram {method}"), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&format!("Telegram {method} response read"), e))?;

        let parsed: TelegramResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::Channel(format!("Telegram {method} parse error ({status}): {e}"))
        })?;

        match parsed.result {
            Some(result) if parsed.ok => Ok(result),
            _ => Err(Error::Channel(format!(
                "Telegram {method} error: {status} - {}",
                parsed.description.unwrap_or_default()
            ))),
        }
    }

    /// Fetch the bot identity behind the token
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the token is rejected
    pub(crate) async fn get_me(&self) -> Result<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Look up a chat by id or username
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the chat is unknown
    pub(crate) async fn get_chat(&self, target: ChatTarget) -> Result<Chat> {
        self.call("getChat", &GetChatRequest { chat_id: target }).await
    }

    /// Send a plain-text message, optionally as a reply
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            reply_to_message_id: reply_to,
            allow_sending_without_reply: reply_to.map(|_| true),
        };

        let _: serde_json::Value = self.call("sendMessage", &request).await?;

        tracing::debug!(chat_id, "Telegram message sent");
        Ok(())
    }

    /// Delete webhook so `getUpdates` is allowed
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", &serde_json::json!({})).await?;
        tracing::debug!("Telegram webhook deleted");
        Ok(())
    }

    /// Long-poll for updates after `offset`
    pub(crate) async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> std::result::Result<Vec<Update>, PollError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: vec!["message".to_string()],
        };

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&request)
            .send()
            .await
            .map_err(|e| PollError::Transient {
                error: transport_error("Telegram getUpdates", e),
                retry_after: None,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PollError::Transient {
            error: transport_error("Telegram getUpdates read", e),
            retry_after: None,
        })?;

        let parsed = serde_json::from_str::<TelegramResponse<Vec<Update>>>(&body);

        if status.is_success()
            && let Ok(TelegramResponse {
                ok: true,
                result: Some(updates),
                ..
            }) = parsed
        {
            return Ok(updates);
        }

        let (description, retry_after) = match parsed {
            Ok(resp) => (
                resp.description.unwrap_or_default(),
                resp.parameters
                    .and_then(|p| p.retry_after)
                    .map(Duration::from_secs),
            ),
            Err(e) => (format!("unreadable response: {e}"), None),
        };
        let error = Error::Channel(format!("Telegram getUpdates error: {status} - {description}"));

        if status.is_success() || is_recoverable(status.as_u16()) {
            Err(PollError::Transient { error, retry_after })
        } else {
            Err(PollError::Fatal(error))
        }
    }

    /// Resolve a `file_id` to a downloadable file path
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the file is too large to be
    /// served by the Bot API
    pub(crate) async fn get_file(&self, file_id: &str) -> Result<TelegramFile> {
        let request = GetFileRequest {
            file_id: file_id.to_string(),
        };
        self.call("getFile", &request).await
    }

    /// Stream a file from the file endpoint into `destination`
    ///
    /// `size_hint` is reported as the total when the server sends no
    /// content length. The destination is truncated before writing.
    ///
    /// # Errors
    ///
    /// Returns error if the request, a chunk read, or a disk write fails
    pub(crate) async fn stream_file(
        &self,
        file_path: &str,
        destination: &Path,
        size_hint: u64,
        progress: &ProgressFn,
    ) -> Result<()> {
        let url = format!("{}{}/{file_path}", self.file_base, self.token);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("Telegram file download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Channel(format!(
                "Telegram file download error: {status}"
            )));
        }

        let total = response
            .content_length()
            .filter(|len| *len > 0)
            .unwrap_or(size_hint);

        let mut file = tokio::fs::File::create(destination).await?;
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error("Telegram file download read", e))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            progress(received, total);
        }

        file.flush().await?;

        tracing::debug!(
            path = %destination.display(),
            bytes = received,
            "Telegram file stored"
        );
        Ok(())
    }
}

/// Wrap a transport error without its URL, which embeds the bot token
fn transport_error(context: &str, e: reqwest::Error) -> Error {
    Error::Channel(format!("{context} error: {}", e.without_url()))
}
