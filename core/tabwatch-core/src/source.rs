//! The ingestion seam: where sessions and their output come from.
//!
//! Implementations talk to a terminal multiplexer or emulator. Per-session
//! calls never fail outward; a session that cannot be read yields an empty
//! tail and the registry keeps its last known record.

use crate::error::Result;
use crate::types::{SessionIdentity, SessionListing};

pub const DEFAULT_TRACKED_KEYWORDS: &[&str] = &["claude", "claude-code", "npx claude"];

pub trait SessionSource: Send + Sync {
    /// Every visible session. An `Err` means the listing as a whole could not
    /// be trusted, so nothing may be concluded about absent sessions.
    fn list_sessions(&self) -> Result<Vec<SessionListing>>;

    /// Up to `max_lines` of recent output; empty on any failure.
    fn read_tail(&self, identity: &SessionIdentity, max_lines: usize) -> String;

    /// Brings the session to the foreground.
    fn activate(&self, identity: &SessionIdentity) -> bool;

    /// Types `text` into the session and submits it.
    fn send_text(&self, identity: &SessionIdentity, text: &str) -> bool;
}

/// Case-insensitive keyword match used by adapters to fill `is_tracked`.
pub fn is_tracked_label<S: AsRef<str>>(label: &str, keywords: &[S]) -> bool {
    let lowered = label.to_lowercase();
    keywords.iter().any(|keyword| {
        let keyword = keyword.as_ref().trim().to_lowercase();
        !keyword.is_empty() && lowered.contains(&keyword)
    })
}
