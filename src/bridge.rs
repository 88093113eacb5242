//! AppleScript execution bridge.
//!
//! Runs one script body per call through `osascript` and maps the outcome to
//! a closed set of results. Script bodies embed user-supplied strings (track
//! and playlist names), so every embedded string must pass through
//! [`escape`] first. Scripts that detect their own failure print a line
//! starting with `ERROR:`, which the parser turns into a structured error.

use std::io::Read;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::MusicError;

/// Hard ceiling on any single script run.
pub const SCRIPT_TIMEOUT_SECS: u64 = 30;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Escape a user-supplied string for embedding in a double-quoted
/// AppleScript literal. Backslashes must be escaped before quotes;
/// the reverse order would re-escape the backslashes just added and
/// let a crafted name break out of the literal.
pub fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Run an external command with a timeout, returning trimmed stdout on a
/// zero exit. Non-zero exit maps to the interpreter's stderr text.
pub async fn run_command(
    bin: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<String, MusicError> {
    let mut command = Command::new(bin);
    command.args(args);
    command.kill_on_drop(true);

    let output = timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| MusicError::BridgeTimedOut(timeout_secs))?
        .map_err(|e| MusicError::BridgeUnavailable(format!("Failed to run {bin}: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            "(no stderr output)".to_string()
        } else {
            stderr
        };
        Err(MusicError::BridgeScriptError(stderr))
    }
}

/// Run one AppleScript body through `osascript -e`.
pub async fn run_script(body: &str) -> Result<String, MusicError> {
    run_command("osascript", &["-e".to_string(), body.to_string()], SCRIPT_TIMEOUT_SECS).await
}

/// One-time availability probe: the bridge needs macOS and a working
/// `osascript`. Result is cached in server state, not re-checked per call.
pub fn probe_osascript() -> Result<(), String> {
    if !cfg!(target_os = "macos") {
        return Err("AppleScript requires macOS".to_string());
    }

    let mut child = match std::process::Command::new("osascript")
        .args(["-e", "return 1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return Err(format!("osascript not available: {e}")),
    };

    let Some(mut stdout_pipe) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err("osascript produced no stdout handle".to_string());
    };
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() > PROBE_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };
    let _ = stdout_handle.join();

    match status {
        Some(status) if status.success() => Ok(()),
        Some(status) => Err(format!("osascript probe failed with {status}")),
        None => Err("osascript probe timed out".to_string()),
    }
}

/// Parsed script output. Tabular results use `|||` as the field delimiter
/// and one line per row; everything else is a plain message.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// Free-form text: confirmations, key:value blocks, or empty output.
    Message(String),
    /// A single delimited row.
    Record(Vec<String>),
    /// Multiple delimited rows.
    List(Vec<Vec<String>>),
}

impl ScriptOutcome {
    /// Parse raw script stdout. A leading `ERROR:` marks a script-reported
    /// failure and becomes an `Err` so callers never string-sniff for it.
    /// Lookup misses follow the scripts' `... not found` message convention
    /// and map to [`MusicError::NotFound`].
    pub fn parse(raw: &str) -> Result<Self, MusicError> {
        let trimmed = raw.trim();
        if let Some(reason) = trimmed.strip_prefix("ERROR:") {
            let reason = reason.trim().to_string();
            if reason.to_lowercase().contains("not found") {
                return Err(MusicError::NotFound(reason));
            }
            return Err(MusicError::BridgeScriptError(reason));
        }
        if !trimmed.contains("|||") {
            return Ok(Self::Message(trimmed.to_string()));
        }
        let lines: Vec<&str> = trimmed.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() == 1 {
            return Ok(Self::Record(split_fields(lines[0])));
        }
        Ok(Self::List(lines.into_iter().map(split_fields).collect()))
    }

    /// View any outcome as rows. An empty message is zero rows; a non-empty
    /// message is one single-field row.
    pub fn rows(self) -> Vec<Vec<String>> {
        match self {
            Self::Message(m) if m.is_empty() => Vec::new(),
            Self::Message(m) => vec![vec![m]],
            Self::Record(fields) => vec![fields],
            Self::List(rows) => rows,
        }
    }

    /// Collapse back to the raw payload text.
    pub fn into_message(self) -> String {
        match self {
            Self::Message(m) => m,
            Self::Record(fields) => fields.join("|||"),
            Self::List(rows) => rows
                .into_iter()
                .map(|r| r.join("|||"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split("|||").map(str::to_string).collect()
}

/// Run a script and parse its output in one step.
pub async fn run_parsed(body: &str) -> Result<ScriptOutcome, MusicError> {
    let raw = run_script(body).await?;
    ScriptOutcome::parse(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_backslashes_before_quotes() {
        assert_eq!(escape(r"Playlist\Test"), r"Playlist\\Test");
        assert_eq!(escape(r#"It's "quoted""#), r#"It's \"quoted\""#);
        // A pre-escaped quote must not collapse back into a bare quote.
        assert_eq!(escape(r#"\""#), r#"\\\""#);
    }

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape("Daft Punk - Around the World"), "Daft Punk - Around the World");
    }

    #[test]
    fn parse_error_line_lookup_miss() {
        for raw in [
            "ERROR:Playlist not found\n",
            "ERROR:Track not found: Flim\n",
            "ERROR:Device not found: Den HomePod\n",
        ] {
            let err = ScriptOutcome::parse(raw).unwrap_err();
            assert!(matches!(err, MusicError::NotFound(_)), "got: {err:?}");
        }
    }

    #[test]
    fn parse_error_line_generic_failure() {
        let err = ScriptOutcome::parse("ERROR:Cannot save changes\n").unwrap_err();
        match err {
            MusicError::BridgeScriptError(reason) => assert_eq!(reason, "Cannot save changes"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_plain_message() {
        let outcome = ScriptOutcome::parse("Now playing: Around the World\n").unwrap();
        assert_eq!(outcome, ScriptOutcome::Message("Now playing: Around the World".into()));
    }

    #[test]
    fn parse_empty_output() {
        let outcome = ScriptOutcome::parse("  \n").unwrap();
        assert_eq!(outcome, ScriptOutcome::Message(String::new()));
        assert!(outcome.rows().is_empty());
    }

    #[test]
    fn parse_single_record() {
        let outcome = ScriptOutcome::parse("120|||4|||playing|||true|||off|||55\n").unwrap();
        assert_eq!(
            outcome,
            ScriptOutcome::Record(vec![
                "120".into(),
                "4".into(),
                "playing".into(),
                "true".into(),
                "off".into(),
                "55".into(),
            ])
        );
    }

    #[test]
    fn parse_multi_row_list() {
        let raw = "One More Time|||Daft Punk|||Discovery\nAerodynamic|||Daft Punk|||Discovery\n";
        let outcome = ScriptOutcome::parse(raw).unwrap();
        let rows = outcome.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "One More Time");
        assert_eq!(rows[1][2], "Discovery");
    }

    #[test]
    fn parse_preserves_empty_fields() {
        let outcome = ScriptOutcome::parse("Name|||Artist||||||1999|||ID\n").unwrap();
        assert_eq!(
            outcome,
            ScriptOutcome::Record(vec![
                "Name".into(),
                "Artist".into(),
                "".into(),
                "1999".into(),
                "ID".into(),
            ])
        );
    }

    #[test]
    fn multiline_without_delimiter_stays_message() {
        let raw = "Living Room\nKitchen HomePod";
        let outcome = ScriptOutcome::parse(raw).unwrap();
        assert_eq!(outcome, ScriptOutcome::Message(raw.into()));
    }

    #[test]
    fn into_message_round_trips() {
        for raw in ["plain text", "a|||b|||c", "a|||b\nc|||d"] {
            let outcome = ScriptOutcome::parse(raw).unwrap();
            assert_eq!(outcome.into_message(), raw);
        }
    }

    #[tokio::test]
    async fn run_command_missing_binary() {
        let err = run_command("definitely-not-a-binary-xyz", &[], 5).await.unwrap_err();
        assert!(matches!(err, MusicError::BridgeUnavailable(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn run_command_captures_stdout() {
        let out = run_command("echo", &["hello".to_string()], 5).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn run_command_nonzero_exit_maps_stderr() {
        let err = run_command(
            "sh",
            &["-c".to_string(), "echo bad input >&2; exit 3".to_string()],
            5,
        )
        .await
        .unwrap_err();
        match err {
            MusicError::BridgeScriptError(msg) => assert_eq!(msg, "bad input"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_command_nonzero_exit_without_stderr() {
        let err = run_command("sh", &["-c".to_string(), "exit 1".to_string()], 5)
            .await
            .unwrap_err();
        match err {
            MusicError::BridgeScriptError(msg) => assert_eq!(msg, "(no stderr output)"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_command_times_out() {
        let err = run_command("sleep", &["5".to_string()], 1).await.unwrap_err();
        assert!(matches!(err, MusicError::BridgeTimedOut(1)), "got: {err:?}");
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn probe_refuses_non_macos() {
        assert_eq!(probe_osascript().unwrap_err(), "AppleScript requires macOS");
    }
}
