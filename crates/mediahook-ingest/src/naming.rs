// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local file names for downloaded media.

use std::path::Path;

use chrono::{DateTime, Utc};

use mediahook_core::MediaType;
use mediahook_storage::hash8;

const MAX_EXTENSION_LEN: usize = 10;

/// `{YYYYmmdd_HHMMSS}_{hash8(file_unique_ref)}.{ext}`
pub fn media_file_name(now: DateTime<Utc>, file_unique_ref: &str, ext: &str) -> String {
    format!(
        "{}_{}.{ext}",
        now.format("%Y%m%d_%H%M%S"),
        hash8(file_unique_ref)
    )
}

/// `name` with `_{n}` inserted before the extension.
pub fn with_collision_suffix(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
        None => format!("{name}_{n}"),
    }
}

/// Picks the extension: original file name, then MIME type, then media type.
pub fn extension_for(
    file_name: Option<&str>,
    mime_type: Option<&str>,
    media_type: MediaType,
) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .and_then(clean_extension)
        .or_else(|| mime_type.and_then(extension_for_mime).map(str::to_string))
        .unwrap_or_else(|| media_type.default_extension().to_string())
}

fn clean_extension(ext: &str) -> Option<String> {
    let ok = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    let ext = match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "text/plain" => "txt",
        "text/csv" => "csv",
        _ => return None,
    };
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let name = media_file_name(now, "abc", "jpg");
        assert_eq!(name, "20260314_092653_ba7816bf.jpg");
    }

    #[test]
    fn collision_suffix_goes_before_extension() {
        assert_eq!(
            with_collision_suffix("20260314_092653_ba7816bf.jpg", 2),
            "20260314_092653_ba7816bf_2.jpg"
        );
        assert_eq!(with_collision_suffix("plain", 1), "plain_1");
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(
            extension_for(Some("Scan.PDF"), Some("image/png"), MediaType::Document),
            "pdf"
        );
    }

    #[test]
    fn extension_falls_back_to_mime_then_type() {
        assert_eq!(
            extension_for(Some("README"), Some("video/quicktime"), MediaType::Video),
            "mov"
        );
        assert_eq!(
            extension_for(None, Some("application/x-unknown"), MediaType::Document),
            "bin"
        );
        assert_eq!(extension_for(None, None, MediaType::Photo), "jpg");
    }

    #[test]
    fn suspicious_extensions_are_ignored() {
        assert_eq!(
            extension_for(Some("evil.p/h p"), None, MediaType::Document),
            "bin"
        );
        assert_eq!(
            extension_for(Some("archive.verylongextension"), None, MediaType::Document),
            "bin"
        );
    }
}
