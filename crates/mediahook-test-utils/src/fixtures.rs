// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram `Update` payloads for tests.

use serde_json::{Value, json};

/// A private-chat photo message with two sizes; the larger is `file_ref`.
pub fn photo_update(update_id: i64, chat_id: i64, message_id: i64, unique: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "date": 1_767_225_600,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "Test"},
            "caption": "from the test suite",
            "photo": [
                {"file_id": format!("{unique}-thumb"), "file_unique_id": format!("{unique}-t"), "width": 90, "height": 90},
                {"file_id": format!("file-{unique}"), "file_unique_id": unique, "width": 1280, "height": 960}
            ]
        }
    })
}

/// A document message with a file name and MIME type.
pub fn document_update(
    update_id: i64,
    chat_id: i64,
    message_id: i64,
    unique: &str,
    file_name: &str,
    mime_type: &str,
) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "date": 1_767_225_600,
            "chat": {"id": chat_id, "type": "private"},
            "document": {
                "file_id": format!("file-{unique}"),
                "file_unique_id": unique,
                "file_name": file_name,
                "mime_type": mime_type
            }
        }
    })
}

/// A plain text message.
pub fn text_update(update_id: i64, chat_id: i64, message_id: i64) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "date": 1_767_225_600,
            "chat": {"id": chat_id, "type": "private"},
            "text": "hello"
        }
    })
}

/// An update whose message is missing `chat`.
pub fn malformed_update(update_id: i64) -> Value {
    json!({
        "update_id": update_id,
        "message": {"message_id": 1, "photo": []}
    })
}

/// The `file_ref` the fixtures above give to media with unique id `unique`.
pub fn file_ref_for(unique: &str) -> String {
    format!("file-{unique}")
}
