//! Messaging channel adapters
//!
//! A channel delivers new-message events for one group and lets the grabber
//! reply to them. Attachment bytes are fetched through the separate
//! [`Transfer`] capability so the download path can be tested without a chat
//! backend.

mod telegram;

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use telegram::TelegramChannel;

use crate::Result;

/// Progress callback invoked with `(bytes_so_far, total_bytes)`
pub type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

/// Opaque handle to a resolved group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    /// Platform chat identifier
    pub id: i64,

    /// Group title, if the platform reports one
    pub title: Option<String>,
}

/// Metadata attribute attached to a remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentAttribute {
    /// Original filename supplied by the sender
    Filename(String),
    /// MIME type
    MimeType(String),
    /// Audio track or voice note
    Audio {
        duration: u32,
        title: Option<String>,
        performer: Option<String>,
        voice: bool,
    },
    /// Video clip or round video note
    Video {
        duration: u32,
        width: u32,
        height: u32,
        round: bool,
    },
    /// GIF-style animation
    Animated,
    /// Sticker
    Sticker { emoji: Option<String> },
}

/// Descriptor of a remote file carried by a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Platform file identifier used to fetch the bytes
    pub file_id: String,

    /// Declared size in bytes (0 when the platform does not report one)
    pub size: u64,

    /// Metadata attributes
    pub attributes: Vec<AttachmentAttribute>,
}

impl Attachment {
    /// First filename attribute, if any
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attr| match attr {
            AttachmentAttribute::Filename(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Media carried by a message
///
/// Photos, locations, polls and the like are media without a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Downloadable document, if the media is file-backed
    pub document: Option<Attachment>,
}

/// A new message observed in the subscribed group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Chat the message was posted in
    pub chat_id: i64,

    /// Message identifier (used to reply)
    pub message_id: i64,

    /// Attached media, if any
    pub media: Option<Media>,

    /// Message text or media caption
    pub text: Option<String>,
}

/// Trait for chat backends
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Connect and authenticate
    async fn connect(&mut self) -> Result<()>;

    /// Stop event delivery; the subscription stream closes afterwards
    async fn disconnect(&self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Resolve a group name or identifier to a handle
    async fn resolve_group(&self, target: &str) -> Result<GroupHandle>;

    /// Start delivering new-message events for `group`
    ///
    /// The receiver yields events in arrival order and returns `None` once the
    /// connection is gone.
    async fn subscribe(&self, group: &GroupHandle) -> Result<mpsc::Receiver<MessageEvent>>;

    /// Reply to the message that produced `event`
    async fn reply(&self, event: &MessageEvent, text: &str) -> Result<()>;
}

/// Trait for fetching attachment bytes to local storage
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Stream `attachment` to `destination`, reporting progress as bytes arrive
    ///
    /// An existing file at `destination` is truncated.
    async fn download(
        &self,
        attachment: &Attachment,
        destination: &Path,
        progress: &ProgressFn,
    ) -> Result<()>;
}
