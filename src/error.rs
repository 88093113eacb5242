//! Error taxonomy shared across the remote API client, the AppleScript
//! bridge, and tool handlers.
//!
//! Tool handlers never surface these as protocol-level errors. Every failure
//! becomes a successful tool result whose text starts with `"Error: "`, so
//! the model on the other end can read the reason and adjust.

#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    /// A credential file is missing. Message includes the command to run.
    #[error("{0}")]
    CredentialMissing(String),
    /// Developer token expired or inside the 1-day renewal buffer.
    #[error("{0}")]
    CredentialExpired(String),
    /// Apple Music API request failed (transport or non-success status).
    #[error("{0}")]
    RemoteRequestFailed(String),
    /// osascript is absent or cannot be spawned on this host.
    #[error("{0}")]
    BridgeUnavailable(String),
    /// The AppleScript process outlived its allowance (30s in production).
    #[error("AppleScript timed out after {0} seconds")]
    BridgeTimedOut(u64),
    /// The script ran but reported a failure (stderr or an ERROR: line).
    #[error("{0}")]
    BridgeScriptError(String),
    /// A named playlist, track, or device does not exist. Carries the
    /// script's own miss message.
    #[error("{0}")]
    NotFound(String),
    /// Caller-supplied parameter failed validation before any side effect.
    #[error("{0}")]
    InvalidArgument(String),
    /// Playlist exists but was not created through the API, so the remote
    /// endpoint refuses edits.
    #[error(
        "Cannot edit this playlist. Only playlists created by this app can be modified."
    )]
    PermissionDenied,
}

impl MusicError {
    /// Render for a tool result. The `Error: ` marker is the contract with
    /// callers that string-match on failure.
    pub fn user_text(&self) -> String {
        format!("Error: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_carries_marker() {
        let err = MusicError::NotFound("Track not found in library: Kodama".into());
        assert_eq!(err.user_text(), "Error: Track not found in library: Kodama");

        let err = MusicError::BridgeScriptError("execution error: -1728".into());
        assert_eq!(err.user_text(), "Error: execution error: -1728");
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(
            MusicError::BridgeTimedOut(30).to_string(),
            "AppleScript timed out after 30 seconds"
        );
        assert!(
            MusicError::PermissionDenied
                .to_string()
                .starts_with("Cannot edit this playlist.")
        );
    }
}
