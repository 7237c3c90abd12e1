//! Daemon lifecycle tests

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use telegram_grabber::{
    Attachment, Channel, Config, Daemon, GroupHandle, MessageEvent, ProgressFn, Transfer,
};
use tokio::sync::mpsc;

mod common;
use common::{MockChannel, MockTransfer, document_event, settings_in, text_event};

/// Channel and transfer in one, as the Telegram adapter is
struct MockBackend {
    channel: MockChannel,
    transfer: MockTransfer,
}

#[async_trait]
impl Channel for MockBackend {
    fn name(&self) -> &'static str {
        self.channel.name()
    }

    async fn connect(&mut self) -> telegram_grabber::Result<()> {
        self.channel.connect().await
    }

    async fn disconnect(&self) -> telegram_grabber::Result<()> {
        self.channel.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    async fn resolve_group(&self, target: &str) -> telegram_grabber::Result<GroupHandle> {
        self.channel.resolve_group(target).await
    }

    async fn subscribe(
        &self,
        group: &GroupHandle,
    ) -> telegram_grabber::Result<mpsc::Receiver<MessageEvent>> {
        self.channel.subscribe(group).await
    }

    async fn reply(&self, event: &MessageEvent, text: &str) -> telegram_grabber::Result<()> {
        self.channel.reply(event, text).await
    }
}

#[async_trait]
impl Transfer for MockBackend {
    async fn download(
        &self,
        attachment: &Attachment,
        destination: &Path,
        progress: &ProgressFn,
    ) -> telegram_grabber::Result<()> {
        self.transfer.download(attachment, destination, progress).await
    }
}

fn config(base: &Path) -> Config {
    let mut download = settings_in(base);
    download.root = base.join("fresh").join("downloads");

    Config {
        api_id: 42,
        api_hash: SecretString::from("secret".to_string()),
        phone_number: "+15550100".to_string(),
        target_group: "@drops".to_string(),
        download,
    }
}

#[tokio::test]
async fn runs_until_event_stream_closes() {
    let dir = tempfile::tempdir().unwrap();
    let (channel, tx) = MockChannel::with_events();
    let replies = channel.replies_handle();
    let resolved = channel.resolved_handle();
    let backend = MockBackend {
        channel,
        transfer: MockTransfer::succeeding(5, vec![5]),
    };

    let daemon = Daemon::new(config(dir.path()), backend);
    let handle = tokio::spawn(daemon.run_until(std::future::pending()));

    tx.send(text_event(1, "hello")).await.unwrap();
    tx.send(document_event(2, Some("notes.txt"), 5)).await.unwrap();
    drop(tx);

    handle.await.unwrap().unwrap();

    assert_eq!(*resolved.lock().await, vec!["@drops".to_string()]);

    let root = dir.path().join("fresh").join("downloads");
    assert!(root.is_dir());
    assert_eq!(std::fs::metadata(root.join("notes.txt")).unwrap().len(), 5);

    let replies = replies.lock().await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].text, "No media found in the message.");
    assert!(replies[1].text.starts_with("File downloaded and saved to "));
}

#[tokio::test]
async fn stops_on_shutdown_signal() {
    let dir = tempfile::tempdir().unwrap();
    let (channel, tx) = MockChannel::with_events();
    let backend = MockBackend {
        channel,
        transfer: MockTransfer::succeeding(0, Vec::new()),
    };

    Daemon::new(config(dir.path()), backend)
        .run_until(async {})
        .await
        .unwrap();

    // Event stream is released once the daemon returns
    assert!(tx.is_closed());
}

#[tokio::test]
async fn subscription_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend {
        channel: MockChannel::new(),
        transfer: MockTransfer::succeeding(0, Vec::new()),
    };

    let result = Daemon::new(config(dir.path()), backend)
        .run_until(std::future::pending())
        .await;
    assert!(result.is_err());
}
