//! Shared test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use telegram_grabber::download::retry::RetryPolicy;
use telegram_grabber::{
    Attachment, AttachmentAttribute, Channel, DownloadSettings, Error, GroupHandle, Media,
    MessageEvent, ProgressFn, Transfer,
};
use tokio::sync::{Mutex, mpsc};

pub const GROUP_ID: i64 = -1_001_234_567;

/// A reply recorded by [`MockChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub chat_id: i64,
    pub reply_to: i64,
    pub text: String,
}

/// Mock channel that records replies and hands out a prepared event stream
pub struct MockChannel {
    connected: AtomicBool,
    fail_replies: AtomicBool,
    replies: Arc<Mutex<Vec<SentReply>>>,
    events: Mutex<Option<mpsc::Receiver<MessageEvent>>>,
    resolved: Arc<Mutex<Vec<String>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            fail_replies: AtomicBool::new(false),
            replies: Arc::new(Mutex::new(Vec::new())),
            events: Mutex::new(None),
            resolved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Channel whose subscription yields whatever is sent on the returned sender
    pub fn with_events() -> (Self, mpsc::Sender<MessageEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let channel = Self::new();
        *channel.events.try_lock().unwrap() = Some(rx);
        (channel, tx)
    }

    /// Make every subsequent reply fail
    pub fn fail_replies(&self) {
        self.fail_replies.store(true, Ordering::SeqCst);
    }

    pub fn replies_handle(&self) -> Arc<Mutex<Vec<SentReply>>> {
        self.replies.clone()
    }

    pub fn resolved_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.resolved.clone()
    }

    pub async fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().await.clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self) -> telegram_grabber::Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> telegram_grabber::Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn resolve_group(&self, target: &str) -> telegram_grabber::Result<GroupHandle> {
        self.resolved.lock().await.push(target.to_string());
        Ok(GroupHandle {
            id: GROUP_ID,
            title: Some("Drops".to_string()),
        })
    }

    async fn subscribe(
        &self,
        _group: &GroupHandle,
    ) -> telegram_grabber::Result<mpsc::Receiver<MessageEvent>> {
        if !self.is_connected() {
            return Err(Error::Channel("not connected".to_string()));
        }
        self.events
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Channel("already subscribed".to_string()))
    }

    async fn reply(&self, event: &MessageEvent, text: &str) -> telegram_grabber::Result<()> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(Error::Channel("chat write forbidden".to_string()));
        }
        self.replies.lock().await.push(SentReply {
            chat_id: event.chat_id,
            reply_to: event.message_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Mock transfer that fails a scripted number of times, then writes the file
pub struct MockTransfer {
    failures: u32,
    size: u64,
    steps: Vec<u64>,
    attempts: AtomicU32,
    progress: std::sync::Mutex<Vec<(u64, u64)>>,
    destinations: std::sync::Mutex<Vec<PathBuf>>,
}

impl MockTransfer {
    /// Succeeds on the first attempt, reporting `steps` as cumulative byte counts
    pub fn succeeding(size: u64, steps: Vec<u64>) -> Self {
        Self::failing_then_succeeding(0, size, steps)
    }

    /// Fails `failures` times before succeeding
    pub fn failing_then_succeeding(failures: u32, size: u64, steps: Vec<u64>) -> Self {
        Self {
            failures,
            size,
            steps,
            attempts: AtomicU32::new(0),
            progress: std::sync::Mutex::new(Vec::new()),
            destinations: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Never succeeds
    pub fn always_failing() -> Self {
        Self::failing_then_succeeding(u32::MAX, 0, Vec::new())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn progress_calls(&self) -> Vec<(u64, u64)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transfer for MockTransfer {
    async fn download(
        &self,
        _attachment: &Attachment,
        destination: &Path,
        progress: &ProgressFn,
    ) -> telegram_grabber::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());

        if attempt <= self.failures {
            return Err(Error::Channel(format!(
                "connection reset by peer (attempt {attempt})"
            )));
        }

        for step in &self.steps {
            progress(*step, self.size);
            self.progress.lock().unwrap().push((*step, self.size));
        }

        let len = usize::try_from(self.size).unwrap();
        tokio::fs::write(destination, vec![0u8; len]).await?;
        Ok(())
    }
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture every event logged on the current thread until the guard drops
///
/// Pair with a current-thread runtime (plain `#[tokio::test]`) so the
/// futures under test are polled on this thread.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

/// Executable that appends its arguments to `<dir>/chown.log`, one call per line
///
/// Returns the script path and the log path.
#[cfg(unix)]
pub fn recording_chown(dir: &Path) -> (PathBuf, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("chown.log");
    let script = dir.join("fake-chown");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho \"$@\" >> '{}'\n", log.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}

/// Lines recorded by [`recording_chown`], empty when it never ran
pub fn recorded_calls(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Download settings rooted at `<base>/downloads/telegram` with no progress bar
pub fn settings_in(base: &Path) -> DownloadSettings {
    let root = base.join("downloads").join("telegram");
    std::fs::create_dir_all(&root).unwrap();
    DownloadSettings {
        root,
        retry: RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        },
        ownership_fix: None,
        show_progress: false,
    }
}

/// Text-only message
pub fn text_event(message_id: i64, text: &str) -> MessageEvent {
    MessageEvent {
        chat_id: GROUP_ID,
        message_id,
        media: None,
        text: Some(text.to_string()),
    }
}

/// Message with media that has no document (e.g. a photo)
pub fn photo_event(message_id: i64) -> MessageEvent {
    MessageEvent {
        chat_id: GROUP_ID,
        message_id,
        media: Some(Media { document: None }),
        text: None,
    }
}

/// Message carrying a document with an optional filename
pub fn document_event(message_id: i64, filename: Option<&str>, size: u64) -> MessageEvent {
    let mut attributes = vec![AttachmentAttribute::MimeType(
        "application/octet-stream".to_string(),
    )];
    if let Some(name) = filename {
        attributes.push(AttachmentAttribute::Filename(name.to_string()));
    }

    MessageEvent {
        chat_id: GROUP_ID,
        message_id,
        media: Some(Media {
            document: Some(Attachment {
                file_id: format!("file-{message_id}"),
                size,
                attributes,
            }),
        }),
        text: None,
    }
}
