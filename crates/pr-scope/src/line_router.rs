// SPDX-License-Identifier: MIT OR Apache-2.0
//! Explicit stdio capture: tags each line with the active pid instead of
//! monkey-patching process-wide write hooks.

use crate::scope::ScopeRegistry;
use std::collections::BTreeMap;

/// Writes larger than this are truncated inline rather than buffered.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Marker appended to a line truncated for exceeding [`MAX_LINE_BYTES`].
pub const TRUNCATED_MARKER: &str = " ... truncated";

/// Line-buffering router: accepts raw byte chunks tagged by pid, holds
/// back any partial trailing line, and emits complete `[pid=…]`-tagged
/// lines to the sink.
///
/// A pid of `None` tags lines `[pid=logger]` (no prediction active).
#[derive(Default)]
pub struct LineRouter {
    partial: BTreeMap<String, String>,
}

impl LineRouter {
    /// Construct an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes written under `pid` (`None` for the logger
    /// pid). Returns the fully tagged lines ready to forward to the
    /// underlying stream; any trailing partial line is retained for the
    /// next call.
    pub fn write(&mut self, pid: Option<&str>, chunk: &str) -> Vec<String> {
        let key = pid.unwrap_or("logger").to_string();
        let mut out = Vec::new();

        if chunk.len() > MAX_LINE_BYTES {
            tracing::warn!(pid = %key, len = chunk.len(), "oversize log write truncated");
            let boundary = floor_char_boundary(chunk, MAX_LINE_BYTES);
            let mut truncated = chunk[..boundary].to_string();
            truncated.push_str(TRUNCATED_MARKER);
            out.push(tag(&key, &truncated));
            return out;
        }

        let buffer = self.partial.entry(key.clone()).or_default();
        buffer.push_str(chunk);

        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            let line = line.trim_end_matches('\n');
            out.push(tag(&key, line));
        }
        out
    }

    /// Flush the pending partial line for `pid` (if any) as a final line,
    /// then discard its buffer. Called on prediction completion.
    pub fn flush(&mut self, pid: &str) -> Option<String> {
        let remaining = self.partial.remove(pid)?;
        if remaining.is_empty() {
            return None;
        }
        Some(tag(pid, &remaining))
    }
}

fn tag(pid: &str, line: &str) -> String {
    format!("[pid={pid}] {line}")
}

/// The largest byte index `<= index` that falls on a UTF-8 char boundary
/// of `s`. `chunk` comes from `String::from_utf8_lossy`, so it can contain
/// multi-byte codepoints anywhere; slicing at a fixed byte offset without
/// this would panic if that offset lands mid-codepoint.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Convenience wrapper combining a [`LineRouter`] with the active-pid
/// lookup from a [`ScopeRegistry`], so callers don't have to thread the
/// current pid through manually.
pub fn write_tagged(router: &mut LineRouter, registry: &ScopeRegistry, chunk: &str) -> Vec<String> {
    router.write(registry.current_pid().as_deref(), chunk)
}
