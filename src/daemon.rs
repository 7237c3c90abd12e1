//! Daemon - the listening service
//!
//! Connects the channel, resolves the target group and feeds new messages to
//! the dispatcher until the stream ends or a shutdown signal arrives

use std::future::Future;
use std::sync::Arc;

use crate::channels::{Channel, Transfer};
use crate::dispatch::Dispatcher;
use crate::download::Downloader;
use crate::{Config, Result};

/// The grabber daemon
pub struct Daemon<C> {
    config: Config,
    channel: C,
}

impl<C> Daemon<C>
where
    C: Channel + Transfer + 'static,
{
    /// Create a daemon over a not-yet-connected channel
    #[must_use]
    pub const fn new(config: Config, channel: C) -> Self {
        Self { config, channel }
    }

    /// Run until the event stream closes or Ctrl-C is received
    ///
    /// # Errors
    ///
    /// Returns error if startup fails (download root, connect, group
    /// resolution, subscription)
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until the event stream closes or `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns error if startup fails (download root, connect, group
    /// resolution, subscription)
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            mut channel,
        } = self;

        tokio::fs::create_dir_all(&config.download.root).await?;
        tracing::debug!(path = %config.download.root.display(), "download root ready");

        tracing::info!(
            channel = channel.name(),
            account = %config.phone_number,
            "connecting"
        );
        channel.connect().await?;

        let group = channel.resolve_group(&config.target_group).await?;
        tracing::info!("Group ID: {}", group.id);
        if let Some(title) = &group.title {
            tracing::debug!(title = %title, "watching group");
        }

        let channel = Arc::new(channel);
        let events = channel.subscribe(&group).await?;

        let replies: Arc<dyn Channel> = channel.clone();
        let transfer: Arc<dyn Transfer> = channel.clone();
        let downloader = Downloader::new(replies.clone(), transfer, config.download);
        let dispatcher = Dispatcher::new(replies, downloader);

        tracing::info!("Client is running...");

        tokio::select! {
            () = dispatcher.run(events) => {
                tracing::info!("connection closed");
            }
            () = shutdown => {
                tracing::info!("shutdown signal received");
            }
        }

        if let Err(e) = channel.disconnect().await {
            tracing::warn!(error = %e, "disconnect failed");
        }

        Ok(())
    }
}
