//! Event dispatch
//!
//! Classifies each new message and routes file-bearing ones to the
//! [`Downloader`]. Events are handled one at a time in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;
use crate::channels::{Channel, MessageEvent};
use crate::download::sanitize::sanitize_filename;
use crate::download::{DownloadOutcome, Downloader};

/// Reply sent when a message carries no media at all
pub const NO_MEDIA_REPLY: &str = "No media found in the message.";

/// Reply sent when media is present but is not a file
pub const NO_FILE_REPLY: &str = "No file found in the message.";

/// How an event was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Message had no media
    NoMedia,
    /// Media without a downloadable document
    NoFile,
    /// Attachment handed to the downloader
    Downloaded(DownloadOutcome),
}

/// Routes incoming message events
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    downloader: Downloader,
}

impl Dispatcher {
    /// Create a dispatcher replying through `channel`
    #[must_use]
    pub fn new(channel: Arc<dyn Channel>, downloader: Downloader) -> Self {
        Self {
            channel,
            downloader,
        }
    }

    /// Handle a single event
    ///
    /// # Errors
    ///
    /// Returns error if a classification reply cannot be sent; the
    /// classification is logged before the reply. Download failures are
    /// reported by the downloader and never surface here.
    pub async fn handle_event(&self, event: &MessageEvent) -> Result<Dispatch> {
        let Some(media) = &event.media else {
            tracing::info!("{NO_MEDIA_REPLY}");
            match &event.text {
                Some(text) => tracing::info!("Text message received: {text}"),
                None => tracing::info!("Non-media message received."),
            }
            self.channel.reply(event, NO_MEDIA_REPLY).await?;
            return Ok(Dispatch::NoMedia);
        };

        let Some(attachment) = &media.document else {
            tracing::info!("{NO_FILE_REPLY}");
            self.channel.reply(event, NO_FILE_REPLY).await?;
            return Ok(Dispatch::NoFile);
        };

        if let Some(name) = attachment.filename() {
            tracing::info!("File Name is {}", sanitize_filename(name));
        }

        let outcome = self.downloader.start_download(event, attachment).await;
        Ok(Dispatch::Downloaded(outcome))
    }

    /// Handle events until the stream closes
    ///
    /// Each event is fully handled before the next is received. Per-event
    /// errors are logged and do not stop the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<MessageEvent>) {
        while let Some(event) = events.recv().await {
            tracing::debug!(
                chat_id = event.chat_id,
                message_id = event.message_id,
                "handling message"
            );

            if let Err(e) = self.handle_event(&event).await {
                tracing::warn!(
                    error = %e,
                    message_id = event.message_id,
                    "failed to handle message"
                );
            }
        }

        tracing::info!(channel = self.channel.name(), "event stream closed");
    }
}
