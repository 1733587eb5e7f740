// SPDX-License-Identifier: MIT OR Apache-2.0
//! Working-directory filename protocol (spec §6) and the atomic
//! temp-then-rename write every control/response file goes through (spec
//! §5, §9 "Atomic response visibility").

use pr_error::{ErrorCode, RunnerError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^request-(?P<pid>\S+)\.json$").expect("valid regex"))
}

fn cancel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^cancel-(?P<pid>\S+)$").expect("valid regex"))
}

/// Extract the pid from a `request-<pid>.json` filename, or `None` if it
/// doesn't match the request pattern.
#[must_use]
pub fn parse_request_filename(name: &str) -> Option<String> {
    request_re()
        .captures(name)
        .map(|c| c.name("pid").unwrap().as_str().to_string())
}

/// Extract the pid from a `cancel-<pid>` filename, or `None` if it doesn't
/// match the cancel pattern.
#[must_use]
pub fn parse_cancel_filename(name: &str) -> Option<String> {
    cancel_re()
        .captures(name)
        .map(|c| c.name("pid").unwrap().as_str().to_string())
}

/// The filename a response for `pid` at `epoch` is written under, per spec
/// §6: `response-<pid>-<epoch:05d>.json`.
#[must_use]
pub fn response_filename(pid: &str, epoch: u32) -> String {
    format!("response-{pid}-{epoch:05}.json")
}

/// Write `contents` to `name` inside `dir` via a temp file in the same
/// directory followed by an atomic rename, so a reader never observes a
/// partially written file.
pub async fn atomic_write(dir: &Path, name: &str, contents: &[u8]) -> Result<(), RunnerError> {
    let final_path = dir.join(name);
    let tmp_path = dir.join(format!(".{name}.tmp-{}", uuid_like()));

    tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
        RunnerError::new(ErrorCode::Internal, format!("writing temp file for {name}: {e}"))
            .with_source(e)
    })?;
    tokio::fs::rename(&tmp_path, &final_path).await.map_err(|e| {
        RunnerError::new(ErrorCode::Internal, format!("renaming temp file into {name}: {e}"))
            .with_source(e)
    })
}

/// Cheap process-unique-enough suffix for temp filenames, avoiding a
/// dependency on a random UUID for what is purely a collision-avoidance
/// detail of the local same-directory rename.
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let pid = std::process::id();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{pid}-{seq}")
}

/// Delete a control file if present, ignoring a missing file.
pub async fn remove_if_exists(path: &Path) -> Result<(), RunnerError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunnerError::new(
            ErrorCode::Internal,
            format!("removing {}: {e}", path.display()),
        )
        .with_source(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_request_filename() {
        assert_eq!(parse_request_filename("request-a.json").as_deref(), Some("a"));
        assert_eq!(parse_request_filename("request-abc-123.json").as_deref(), Some("abc-123"));
        assert_eq!(parse_request_filename("response-a-00000.json"), None);
    }

    #[test]
    fn parses_cancel_filename() {
        assert_eq!(parse_cancel_filename("cancel-a").as_deref(), Some("a"));
        assert_eq!(parse_cancel_filename("request-a.json"), None);
    }

    #[test]
    fn response_filename_pads_epoch() {
        assert_eq!(response_filename("a", 0), "response-a-00000.json");
        assert_eq!(response_filename("a", 12), "response-a-00012.json");
    }

    #[tokio::test]
    async fn atomic_write_produces_final_file_and_no_temp_leftover() {
        let dir = tempdir().unwrap();
        atomic_write(dir.path(), "response-a-00000.json", b"{}").await.unwrap();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["response-a-00000.json".to_string()]);
    }

    #[tokio::test]
    async fn remove_if_exists_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stop");
        remove_if_exists(&path).await.unwrap();
        tokio::fs::write(&path, b"").await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }
}
