//! Telegram polling mode — getUpdates loop and event conversion

use std::time::Duration;

use tokio::sync::mpsc;

use super::backoff::PollBackoff;
use super::types::{Message, Update};
use crate::Error;
use crate::channels::{Attachment, AttachmentAttribute, Media, MessageEvent};

/// Capacity of the event queue between the poller and the dispatcher
const EVENT_QUEUE_CAPACITY: usize = 100;

/// Why a `getUpdates` call failed
#[derive(Debug)]
pub(crate) enum PollError {
    /// Worth retrying after a delay
    Transient {
        error: Error,
        retry_after: Option<Duration>,
    },
    /// The bot can no longer poll (revoked token, conflicting consumer)
    Fatal(Error),
}

impl super::TelegramChannel {
    /// Spawn a background task that long-polls `getUpdates`
    ///
    /// Only messages posted in `group_id` are forwarded. The returned receiver
    /// closes when polling stops.
    pub(crate) fn start_polling(&self, group_id: i64) -> mpsc::Receiver<MessageEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let channel = self.clone();

        tokio::spawn(async move {
            polling_loop(channel, group_id, tx).await;
        });

        rx
    }
}

/// Run the polling loop (background task)
async fn polling_loop(
    channel: super::TelegramChannel,
    group_id: i64,
    tx: mpsc::Sender<MessageEvent>,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = PollBackoff::default();

    tracing::info!(group_id, "Telegram polling started");

    loop {
        let result = tokio::select! {
            () = channel.cancel.cancelled() => break,
            result = channel.get_updates(offset) => result,
        };

        match result {
            Ok(updates) => {
                backoff.reset();
                for update in updates {
                    // Advance offset past this update
                    offset = Some(update.update_id + 1);

                    let Some(event) = update_to_event(update, group_id) else {
                        continue;
                    };

                    if tx.send(event).await.is_err() {
                        tracing::debug!("event receiver dropped, stopping Telegram polling");
                        return;
                    }
                }
            }
            Err(PollError::Transient { error, retry_after }) => {
                let delay = backoff.next_delay(retry_after);
                tracing::warn!(
                    error = %error,
                    failures = backoff.failures(),
                    delay_ms = delay.as_millis(),
                    "Telegram getUpdates failed, retrying"
                );

                tokio::select! {
                    () = channel.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(PollError::Fatal(error)) => {
                tracing::error!(error = %error, "Telegram polling stopped");
                break;
            }
        }
    }

    tracing::info!(group_id, "Telegram polling finished");
}

/// Convert an update into an event if it is a message from `group_id`
pub(crate) fn update_to_event(update: Update, group_id: i64) -> Option<MessageEvent> {
    let msg = update.message?;
    if msg.chat.id != group_id {
        tracing::trace!(chat_id = msg.chat.id, "ignoring message from other chat");
        return None;
    }
    Some(message_to_event(msg))
}

/// Convert a Bot API message into a `MessageEvent`
pub(crate) fn message_to_event(msg: Message) -> MessageEvent {
    let document = extract_document(&msg);

    let has_other_media = msg.photo.is_some()
        || msg.location.is_some()
        || msg.venue.is_some()
        || msg.contact.is_some()
        || msg.poll.is_some()
        || msg.dice.is_some()
        || msg.game.is_some();

    let media = if document.is_some() || has_other_media {
        Some(Media { document })
    } else {
        None
    };

    MessageEvent {
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        media,
        text: msg.text.or(msg.caption),
    }
}

/// Build the attachment descriptor for file-backed media
///
/// Animations also carry a `document` field, so they are checked first to
/// keep their animation attributes.
fn extract_document(msg: &Message) -> Option<Attachment> {
    let mut attributes = Vec::new();

    let (file_id, size) = if let Some(anim) = &msg.animation {
        push_common(&mut attributes, anim.file_name.as_ref(), anim.mime_type.as_ref());
        attributes.push(AttachmentAttribute::Video {
            duration: anim.duration,
            width: anim.width,
            height: anim.height,
            round: false,
        });
        attributes.push(AttachmentAttribute::Animated);
        (&anim.file_id, anim.file_size)
    } else if let Some(doc) = &msg.document {
        push_common(&mut attributes, doc.file_name.as_ref(), doc.mime_type.as_ref());
        (&doc.file_id, doc.file_size)
    } else if let Some(video) = &msg.video {
        push_common(&mut attributes, video.file_name.as_ref(), video.mime_type.as_ref());
        attributes.push(AttachmentAttribute::Video {
            duration: video.duration,
            width: video.width,
            height: video.height,
            round: false,
        });
        (&video.file_id, video.file_size)
    } else if let Some(audio) = &msg.audio {
        push_common(&mut attributes, audio.file_name.as_ref(), audio.mime_type.as_ref());
        attributes.push(AttachmentAttribute::Audio {
            duration: audio.duration,
            title: audio.title.clone(),
            performer: audio.performer.clone(),
            voice: false,
        });
        (&audio.file_id, audio.file_size)
    } else if let Some(voice) = &msg.voice {
        push_common(&mut attributes, None, voice.mime_type.as_ref());
        attributes.push(AttachmentAttribute::Audio {
            duration: voice.duration,
            title: None,
            performer: None,
            voice: true,
        });
        (&voice.file_id, voice.file_size)
    } else if let Some(note) = &msg.video_note {
        attributes.push(AttachmentAttribute::Video {
            duration: note.duration,
            width: note.length,
            height: note.length,
            round: true,
        });
        (&note.file_id, note.file_size)
    } else if let Some(sticker) = &msg.sticker {
        attributes.push(AttachmentAttribute::Sticker {
            emoji: sticker.emoji.clone(),
        });
        (&sticker.file_id, sticker.file_size)
    } else {
        return None;
    };

    Some(Attachment {
        file_id: file_id.clone(),
        size: size.unwrap_or(0),
        attributes,
    })
}

fn push_common(
    attributes: &mut Vec<AttachmentAttribute>,
    file_name: Option<&String>,
    mime_type: Option<&String>,
) {
    if let Some(name) = file_name {
        attributes.push(AttachmentAttribute::Filename(name.clone()));
    }
    if let Some(mime) = mime_type {
        attributes.push(AttachmentAttribute::MimeType(mime.clone()));
    }
}
