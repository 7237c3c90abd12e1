//! Telegram Bot API request/response types

use serde::{Deserialize, Serialize};

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org/bot";

/// Telegram file download base URL
pub(crate) const FILE_BASE: &str = "https://api.telegram.org/file/bot";

/// Chat addressed either by numeric id or by `@username`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    /// Parse a configured group reference
    ///
    /// Accepts numeric ids (`-1001234567890`), `@username`, a bare username,
    /// or a `t.me` link.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(id) = trimmed.parse::<i64>() {
            return Some(Self::Id(id));
        }

        let name = ["https://t.me/", "http://t.me/", "t.me/", "@"]
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if name.is_empty() {
            return None;
        }

        Some(Self::Username(format!("@{name}")))
    }
}

/// Telegram getChat request
#[derive(Serialize)]
pub(crate) struct GetChatRequest {
    pub chat_id: ChatTarget,
}

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_sending_without_reply: Option<bool>,
}

/// Telegram getUpdates request
#[derive(Serialize)]
pub(crate) struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<String>,
}

/// Telegram getFile request
#[derive(Serialize)]
pub(crate) struct GetFileRequest {
    pub file_id: String,
}

/// Telegram API response wrapper
#[derive(Debug, Deserialize)]
pub(crate) struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra error details attached to a failed call
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// Bot identity returned by getMe
#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

/// Chat info
#[derive(Debug, Deserialize)]
pub(crate) struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// File metadata from a getFile response
#[derive(Debug, Deserialize)]
pub(crate) struct TelegramFile {
    #[allow(dead_code)]
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

/// A single update from getUpdates
#[derive(Debug, Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// Incoming message
///
/// Only the fields the grabber inspects are modelled. Non-file media is kept
/// as raw JSON since only its presence matters.
#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub document: Option<Document>,
    pub video: Option<Video>,
    pub animation: Option<Animation>,
    pub audio: Option<Audio>,
    pub voice: Option<Voice>,
    pub video_note: Option<VideoNote>,
    pub sticker: Option<Sticker>,
    pub photo: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
    pub venue: Option<serde_json::Value>,
    pub contact: Option<serde_json::Value>,
    pub poll: Option<serde_json::Value>,
    pub dice: Option<serde_json::Value>,
    pub game: Option<serde_json::Value>,
}

/// General file
#[derive(Debug, Deserialize)]
pub(crate) struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Video file
#[derive(Debug, Deserialize)]
pub(crate) struct Video {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub duration: u32,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Animation (GIF or silent H.264 clip)
#[derive(Debug, Deserialize)]
pub(crate) struct Animation {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub duration: u32,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Audio track
#[derive(Debug, Deserialize)]
pub(crate) struct Audio {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    pub performer: Option<String>,
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Voice note
#[derive(Debug, Deserialize)]
pub(crate) struct Voice {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Round video message
#[derive(Debug, Deserialize)]
pub(crate) struct VideoNote {
    pub file_id: String,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub duration: u32,
    pub file_size: Option<u64>,
}

/// Sticker
#[derive(Debug, Deserialize)]
pub(crate) struct Sticker {
    pub file_id: String,
    pub emoji: Option<String>,
    pub file_size: Option<u64>,
}
