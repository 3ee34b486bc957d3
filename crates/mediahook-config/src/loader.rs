// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mediahook.toml` > `~/.config/mediahook/mediahook.toml`
//! > `/etc/mediahook/mediahook.toml` with environment variable overrides via the
//! `MEDIAHOOK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MediaHookConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/mediahook/mediahook.toml";
pub(crate) const LOCAL_CONFIG: &str = "mediahook.toml";

/// Top-level sections, used to map `MEDIAHOOK_<SECTION>_<KEY>` to `section.key`.
const SECTIONS: &[&str] = &[
    "telegram", "workspace", "download", "server", "worker", "cleanup", "log",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mediahook/mediahook.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mediahook/mediahook.toml` (system-wide)
/// 3. `~/.config/mediahook/mediahook.toml` (user XDG config)
/// 4. `./mediahook.toml` (local directory)
/// 5. `TELEGRAM_BOT_TOKEN` / `OPENCLAW_WORKSPACE` legacy variables
/// 6. `MEDIAHOOK_*` environment variables
pub fn load_config() -> Result<MediaHookConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MediaHookConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MediaHookConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MediaHookConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MediaHookConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MediaHookConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// `MEDIAHOOK_*` variables, mapped section-first with `Env::map()`.
///
/// `Env::split("_")` would turn `MEDIAHOOK_DOWNLOAD_MAX_FILE_SIZE_MB` into
/// `download.max.file.size.mb`; only the first underscore after a known
/// section name is a separator.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("MEDIAHOOK_").map(|key| map_env_key(key.as_str()).into())
}

/// Unprefixed variables from earlier deployments of the hook.
fn legacy_env_provider() -> Env {
    Env::raw()
        .only(&["TELEGRAM_BOT_TOKEN", "OPENCLAW_WORKSPACE"])
        .map(|key| {
            if key.as_str().eq_ignore_ascii_case("telegram_bot_token") {
                "telegram.bot_token".into()
            } else {
                "workspace.root".into()
            }
        })
}

pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
