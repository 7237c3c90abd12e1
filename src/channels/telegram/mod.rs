//! Telegram channel adapter
//!
//! Uses `getUpdates` long polling for receiving messages and the Bot API for
//! replies and file downloads

mod api;
mod backoff;
mod polling;
mod types;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Attachment, Channel, GroupHandle, MessageEvent, ProgressFn, Transfer};
use crate::{Error, Result};

use types::{API_BASE, ChatTarget, FILE_BASE};

/// Server-side long-poll timeout for `getUpdates`
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    api_base: String,
    file_base: String,
    client: Client,
    /// Bot id the token must belong to, checked on connect
    expected_bot_id: Option<i64>,
    poll_timeout: Duration,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter from a full bot token
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: API_BASE.to_string(),
            file_base: FILE_BASE.to_string(),
            client: Client::new(),
            expected_bot_id: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            connected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    /// Create an adapter from the bot id and its secret
    ///
    /// A Bot API token is `<bot id>:<secret>`; `connect` verifies that the
    /// token really belongs to `api_id`.
    #[must_use]
    pub fn from_credentials(api_id: i64, api_hash: &str) -> Self {
        let mut channel = Self::new(format!("{api_id}:{api_hash}"));
        channel.expected_bot_id = Some(api_id);
        channel
    }

    /// Point the adapter at a different Bot API server
    ///
    /// Used for self-hosted Bot API servers and for tests.
    #[must_use]
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        file_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.file_base = file_base.into();
        self
    }

    /// Override the `getUpdates` long-poll timeout
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<()> {
        let me = self.get_me().await?;

        if let Some(expected) = self.expected_bot_id
            && expected != me.id
        {
            return Err(Error::Config(format!(
                "bot token belongs to {}, not API_ID {expected}",
                me.id
            )));
        }

        if !me.is_bot {
            tracing::warn!(id = me.id, "Telegram token does not belong to a bot account");
        }

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(
            id = me.id,
            username = me.username.as_deref().unwrap_or_default(),
            "Telegram channel connected"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.cancel.cancel();
        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("Telegram channel disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn resolve_group(&self, target: &str) -> Result<GroupHandle> {
        let chat_target = ChatTarget::parse(target)
            .ok_or_else(|| Error::Config(format!("invalid group reference: {target:?}")))?;

        let chat = self.get_chat(chat_target).await?;

        tracing::debug!(
            id = chat.id,
            kind = %chat.chat_type,
            username = chat.username.as_deref().unwrap_or_default(),
            "Telegram group resolved"
        );

        Ok(GroupHandle {
            id: chat.id,
            title: chat.title,
        })
    }

    async fn subscribe(&self, group: &GroupHandle) -> Result<mpsc::Receiver<MessageEvent>> {
        if !self.is_connected() {
            return Err(Error::Channel("Telegram channel is not connected".to_string()));
        }

        // getUpdates is refused while a webhook is set
        if let Err(e) = self.delete_webhook().await {
            tracing::warn!(error = %e, "failed to delete Telegram webhook before polling");
        }

        Ok(self.start_polling(group.id))
    }

    async fn reply(&self, event: &MessageEvent, text: &str) -> Result<()> {
        self.send_message(event.chat_id, text, Some(event.message_id))
            .await
    }
}

#[async_trait]
impl Transfer for TelegramChannel {
    async fn download(
        &self,
        attachment: &Attachment,
        destination: &Path,
        progress: &ProgressFn,
    ) -> Result<()> {
        let file = self.get_file(&attachment.file_id).await?;

        let file_path = file.file_path.ok_or_else(|| {
            Error::Channel("Telegram getFile returned no file_path".to_string())
        })?;

        let size_hint = file.file_size.unwrap_or(attachment.size);
        self.stream_file(&file_path, destination, size_hint, progress)
            .await
    }
}
