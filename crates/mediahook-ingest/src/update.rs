// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram `Update` parsing.
//!
//! Only the fields the pipeline needs are modelled; everything else in the
//! payload is ignored.

use serde::Deserialize;

use mediahook_core::{MediaHookError, MediaRef, MediaType};

/// Media references found in one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUpdate {
    pub update_id: i64,
    pub media: Vec<MediaRef>,
}

#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    edited_message: Option<RawMessage>,
    #[serde(default)]
    channel_post: Option<RawMessage>,
    #[serde(default)]
    edited_channel_post: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    message_id: i64,
    chat: RawChat,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    photo: Option<Vec<RawPhotoSize>>,
    #[serde(default)]
    video: Option<RawFile>,
    #[serde(default)]
    document: Option<RawFile>,
}

#[derive(Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Deserialize)]
struct RawPhotoSize {
    file_id: String,
    file_unique_id: String,
    #[serde(default)]
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct RawFile {
    file_id: String,
    file_unique_id: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
}

/// Validates an inbound update and extracts its media references.
///
/// Updates without a message, and messages without media, yield an empty
/// list. Photos contribute only their largest size.
pub fn parse_update(raw: &serde_json::Value) -> Result<ParsedUpdate, MediaHookError> {
    if !raw.is_object() {
        return Err(MediaHookError::MalformedUpdate {
            reason: "update must be a JSON object".to_string(),
        });
    }
    let update = RawUpdate::deserialize(raw).map_err(|e| MediaHookError::MalformedUpdate {
        reason: e.to_string(),
    })?;

    let message = update
        .message
        .or(update.edited_message)
        .or(update.channel_post)
        .or(update.edited_channel_post);

    let media = match message {
        Some(message) => extract_media(update.update_id, message),
        None => Vec::new(),
    };

    Ok(ParsedUpdate {
        update_id: update.update_id,
        media,
    })
}

fn extract_media(update_id: i64, message: RawMessage) -> Vec<MediaRef> {
    let base = |file_ref: String, file_unique_ref: String, media_type: MediaType| MediaRef {
        chat_id: message.chat.id,
        message_id: message.message_id,
        update_id: Some(update_id),
        file_ref,
        file_unique_ref,
        media_type,
        caption: message.caption.clone(),
        file_name: None,
        mime_type: None,
        reported_size: None,
    };

    let mut media = Vec::new();

    // Telegram lists photo sizes smallest first.
    if let Some(largest) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        media.push(MediaRef {
            reported_size: largest.file_size,
            ..base(
                largest.file_id.clone(),
                largest.file_unique_id.clone(),
                MediaType::Photo,
            )
        });
    }

    for (file, media_type) in [
        (message.video.as_ref(), MediaType::Video),
        (message.document.as_ref(), MediaType::Document),
    ] {
        if let Some(file) = file {
            media.push(MediaRef {
                file_name: file.file_name.clone(),
                mime_type: file.mime_type.clone(),
                reported_size: file.file_size,
                ..base(file.file_id.clone(), file.file_unique_id.clone(), media_type)
            });
        }
    }

    media
}
