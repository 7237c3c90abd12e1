//! Telegram Grabber - saves file attachments posted to a Telegram group
//!
//! Listens to one group, replies to every new message, and downloads any
//! attached document into a local directory with retries and a progress bar.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Telegram Bot API               │
//! │   getUpdates  │  sendMessage  │  getFile     │
//! └───────┬───────────────▲──────────────┬───────┘
//!         │ events        │ replies      │ bytes
//! ┌───────▼───────────────┴──────────────▼───────┐
//! │                   Grabber                    │
//! │  Dispatcher  →  Downloader (retry, progress) │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                 downloads/telegram/
//! ```

pub mod channels;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod logging;

pub use channels::{
    Attachment, AttachmentAttribute, Channel, GroupHandle, Media, MessageEvent, ProgressFn,
    TelegramChannel, Transfer,
};
pub use config::Config;
pub use daemon::Daemon;
pub use dispatch::{Dispatch, Dispatcher};
pub use download::{DownloadOutcome, DownloadSettings, Downloader, OwnershipFix};
pub use error::{Error, Result};
