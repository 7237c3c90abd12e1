//! Attachment downloads
//!
//! [`Downloader`] turns "this message has a file" into a file on disk and a
//! reply in the chat. Failures never escape it: they are logged and reported
//! back to the sender.

pub mod progress;
pub mod retry;
pub mod sanitize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Result;
use crate::channels::{Attachment, Channel, MessageEvent, ProgressFn, Transfer};

use progress::ProgressReporter;
use retry::{RetryPolicy, any_error, with_retry};
use sanitize::sanitize_filename;

/// Name used when an attachment carries no usable filename
pub const PLACEHOLDER_FILENAME: &str = "unknown_file";

/// Default download root, relative to the working directory
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads/telegram";

/// Default `uid:gid` applied by the ownership fix
pub const DEFAULT_OWNER: &str = "1000:1000";

/// Recursive `chown` of the download root
///
/// Needed when the process runs as root inside a container while the
/// download directory is bind-mounted for an unprivileged host user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFix {
    /// Owner argument passed to `chown`, e.g. `1000:1000`
    pub owner: String,

    /// Program invoked as `<program> -R <owner> <root>`
    pub program: PathBuf,
}

impl Default for OwnershipFix {
    fn default() -> Self {
        Self::new(DEFAULT_OWNER)
    }
}

impl OwnershipFix {
    /// Ownership fix running the system `chown`
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            program: PathBuf::from("chown"),
        }
    }

    /// Run a different program in place of `chown`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `chown -R <owner> <root>`, ignoring the outcome
    pub async fn apply(&self, root: &Path) {
        let status = tokio::process::Command::new(&self.program)
            .arg("-R")
            .arg(&self.owner)
            .arg(root)
            .status()
            .await;
        tracing::trace!(?status, root = %root.display(), "ownership fix ran");
    }
}

/// Download behaviour shared by every event
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Directory all files are written to
    pub root: PathBuf,

    /// Retry budget per download
    pub retry: RetryPolicy,

    /// Ownership fix run after every download attempt
    pub ownership_fix: Option<OwnershipFix>,

    /// Draw a terminal progress bar
    pub show_progress: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            retry: RetryPolicy::default(),
            ownership_fix: None,
            show_progress: true,
        }
    }
}

/// Result of handling one attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written to the path
    Saved(PathBuf),
    /// Download gave up; the error was reported to the chat
    Failed {
        /// Destination that was attempted
        path: PathBuf,
        /// Error text sent in the reply
        error: String,
    },
}

/// Downloads attachments and reports the result to the originating chat
pub struct Downloader {
    channel: Arc<dyn Channel>,
    transfer: Arc<dyn Transfer>,
    settings: DownloadSettings,
}

impl Downloader {
    /// Create a downloader replying through `channel` and fetching through `transfer`
    #[must_use]
    pub fn new(
        channel: Arc<dyn Channel>,
        transfer: Arc<dyn Transfer>,
        settings: DownloadSettings,
    ) -> Self {
        Self {
            channel,
            transfer,
            settings,
        }
    }

    /// Download settings in use
    #[must_use]
    pub const fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Local path an attachment will be written to
    ///
    /// Uses the first filename attribute, sanitized. Falls back to
    /// [`PLACEHOLDER_FILENAME`] when there is none, or when the sanitized name
    /// would not name a file inside the root (`""`, `.`, `..`).
    #[must_use]
    pub fn destination_for(&self, attachment: &Attachment) -> PathBuf {
        let name = match attachment.filename().map(sanitize_filename) {
            Some(name) if !matches!(name.as_str(), "" | "." | "..") => name,
            _ => sanitize_filename(PLACEHOLDER_FILENAME),
        };
        self.settings.root.join(name)
    }

    /// Download `attachment` and reply to `event` with the outcome
    ///
    /// Errors are swallowed here: they are logged, sent back to the chat and
    /// returned as [`DownloadOutcome::Failed`].
    pub async fn start_download(
        &self,
        event: &MessageEvent,
        attachment: &Attachment,
    ) -> DownloadOutcome {
        let path = self.destination_for(attachment);
        tracing::info!("Started Downloading: {}", path.display());

        let outcome = match self.fetch(attachment, &path).await {
            Ok(()) => {
                let text = format!("File downloaded and saved to {}", path.display());
                self.reply(event, &text).await;
                tracing::info!(size = attachment.size, "{text}");
                DownloadOutcome::Saved(path)
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!("Failed to download {}: {error}", path.display());
                self.reply(
                    event,
                    &format!("Failed to download {}: {error}", path.display()),
                )
                .await;
                DownloadOutcome::Failed { path, error }
            }
        };

        // Runs after every attempt, whatever the outcome
        if let Some(fix) = &self.settings.ownership_fix {
            fix.apply(&self.settings.root).await;
        }

        outcome
    }

    /// Retried transfer with a progress bar scoped to this call
    async fn fetch(&self, attachment: &Attachment, path: &Path) -> Result<()> {
        let label = path.display().to_string();
        let reporter = if self.settings.show_progress {
            ProgressReporter::new(&label, attachment.size)
        } else {
            ProgressReporter::hidden(attachment.size)
        };

        let callback = reporter.callback();
        let progress: &ProgressFn = &callback;
        let transfer = self.transfer.as_ref();

        with_retry(&self.settings.retry, any_error, |attempt| async move {
            tracing::debug!(attempt, path = %path.display(), "download attempt");
            transfer.download(attachment, path, progress).await
        })
        .await
    }

    async fn reply(&self, event: &MessageEvent, text: &str) {
        if let Err(e) = self.channel.reply(event, text).await {
            tracing::warn!(
                error = %e,
                channel = self.channel.name(),
                chat_id = event.chat_id,
                message_id = event.message_id,
                "failed to send reply"
            );
        }
    }
}
