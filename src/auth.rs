//! Credential files and user preferences.
//!
//! Two token files live in the config directory: `developer_token.json`
//! (JWT with an expiry, generated out of band) and `music_user_token.json`
//! (user token, assumed not to self-expire). This server only reads them;
//! generating and authorizing tokens is a separate workflow.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MusicError;

pub const DEV_TOKEN_FILE: &str = "developer_token.json";
pub const USER_TOKEN_FILE: &str = "music_user_token.json";
const CONFIG_FILE: &str = "config.json";

/// Developer tokens inside this window of their expiry are refused, so a
/// token never dies mid-session.
const EXPIRY_BUFFER_SECS: f64 = 86_400.0;

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("applemusic-mcp")
}

#[derive(Debug, Deserialize)]
struct DeveloperTokenFile {
    token: String,
    #[serde(default)]
    expires: f64,
}

#[derive(Debug, Deserialize)]
struct UserTokenFile {
    music_user_token: String,
}

fn now_unix() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

fn read_dev_token_file(config_dir: &Path) -> Result<DeveloperTokenFile, MusicError> {
    let path = config_dir.join(DEV_TOKEN_FILE);
    let raw = std::fs::read_to_string(&path).map_err(|_| {
        MusicError::CredentialMissing(
            "Developer token not found. Run: applemusic-mcp generate-token".to_string(),
        )
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        MusicError::CredentialMissing(format!("Developer token file is not valid JSON: {e}"))
    })
}

/// Read the developer token, refusing one expired or expiring within a day.
pub fn developer_token(config_dir: &Path) -> Result<String, MusicError> {
    let file = read_dev_token_file(config_dir)?;
    if file.expires < now_unix() + EXPIRY_BUFFER_SECS {
        return Err(MusicError::CredentialExpired(
            "Developer token expired or expiring soon. Run: applemusic-mcp generate-token"
                .to_string(),
        ));
    }
    Ok(file.token)
}

pub fn user_token(config_dir: &Path) -> Result<String, MusicError> {
    let path = config_dir.join(USER_TOKEN_FILE);
    let raw = std::fs::read_to_string(&path).map_err(|_| {
        MusicError::CredentialMissing(
            "Music user token not found. Run: applemusic-mcp authorize".to_string(),
        )
    })?;
    let file: UserTokenFile = serde_json::from_str(&raw).map_err(|e| {
        MusicError::CredentialMissing(format!("Music user token file is not valid JSON: {e}"))
    })?;
    Ok(file.music_user_token)
}

/// Days until the developer token expires, truncated toward zero. `None`
/// when the file is absent or unreadable.
fn days_until_expiry(config_dir: &Path) -> Option<i64> {
    let file = read_dev_token_file(config_dir).ok()?;
    Some(((file.expires - now_unix()) / 86_400.0) as i64)
}

/// Warning string surfaced at the top of text responses when the developer
/// token expires within 30 days. `None` when the token is absent or healthy.
pub fn token_expiration_warning(config_dir: &Path) -> Option<String> {
    let days_left = days_until_expiry(config_dir)?;
    if days_left < 30 {
        Some(format!(
            "⚠️ Developer token expires in {days_left} days. Run: applemusic-mcp generate-token"
        ))
    } else {
        None
    }
}

/// Status line for the developer token, for `check_auth_status`.
pub fn developer_token_status(config_dir: &Path) -> String {
    if !config_dir.join(DEV_TOKEN_FILE).exists() {
        return "Developer Token: MISSING - Run: applemusic-mcp generate-token".to_string();
    }
    match days_until_expiry(config_dir) {
        Some(days) if days < 0 => {
            "Developer Token: EXPIRED - Run: applemusic-mcp generate-token".to_string()
        }
        Some(days) if days < 30 => format!(
            "Developer Token: ⚠️ EXPIRES IN {days} DAYS - Run: applemusic-mcp generate-token"
        ),
        Some(days) => format!("Developer Token: OK ({days} days remaining)"),
        None => "Developer Token: ERROR reading file".to_string(),
    }
}

/// Status line for the user token, for `check_auth_status`.
pub fn user_token_status(config_dir: &Path) -> String {
    if config_dir.join(USER_TOKEN_FILE).exists() {
        "Music User Token: OK".to_string()
    } else {
        "Music User Token: MISSING - Run: applemusic-mcp authorize".to_string()
    }
}

pub fn both_tokens_present(config_dir: &Path) -> bool {
    config_dir.join(DEV_TOKEN_FILE).exists() && config_dir.join(USER_TOKEN_FILE).exists()
}

/// Optional behavior switches read from `config.json`'s `preferences` object.
/// Missing file or keys default to off.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Annotate bridge-sourced tracks with the explicit flag from the
    /// metadata cache, when a prior catalog fetch recorded one.
    pub fetch_explicit: bool,
    /// When a play request misses the library, open the catalog entry in the
    /// desktop player instead of just reporting the miss.
    pub reveal_on_library_miss: bool,
    /// Prefer clean versions when matching catalog tracks.
    pub clean_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    preferences: Preferences,
}

pub fn load_preferences(config_dir: &Path) -> Preferences {
    let raw = match std::fs::read_to_string(config_dir.join(CONFIG_FILE)) {
        Ok(raw) => raw,
        Err(_) => return Preferences::default(),
    };
    match serde_json::from_str::<ConfigFile>(&raw) {
        Ok(config) => config.preferences,
        Err(e) => {
            eprintln!("[applemusic] ignoring malformed config.json: {e}");
            Preferences::default()
        }
    }
}
