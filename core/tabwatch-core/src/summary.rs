//! Summary generation for session cards and announcements.
//!
//! An external [`Summarizer`] is optional. When it is missing, or a call
//! fails, the engine falls back to a local summary built from the state, the
//! sticky progress marker, error and question hints, and the last few lines
//! of agent output.

use tracing::{debug, warn};

use crate::error::Result;
use crate::patterns::{RE_ERROR_KEYWORD, RE_QUESTION};
use crate::shaping::{is_separator, shape_for_summary};
use crate::types::{ActivityState, Progress, SessionIdentity};

pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 200;
pub const DEFAULT_SUMMARY_INPUT_CHARS: usize = 10_000;
const FALLBACK_LINE_COUNT: usize = 3;
const ERROR_SCAN_LINES: usize = 10;
const QUESTION_SCAN_LINES: usize = 5;
const ELLIPSIS: &str = "...";

/// External summarization collaborator.
///
/// Implementations may be slow or flaky; any error makes the engine use the
/// local summary for that call only.
pub trait Summarizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn summarize(&self, text: &str, max_length: usize) -> Result<String>;
}

pub struct SummaryEngine {
    summarizer: Option<Box<dyn Summarizer>>,
    max_length: usize,
    max_input_chars: usize,
}

impl SummaryEngine {
    pub fn new(
        summarizer: Option<Box<dyn Summarizer>>,
        max_length: usize,
        max_input_chars: usize,
    ) -> Self {
        Self {
            summarizer,
            max_length,
            max_input_chars,
        }
    }

    /// Engine that only ever uses the local summary.
    pub fn heuristic_only(max_length: usize) -> Self {
        Self::new(None, max_length, DEFAULT_SUMMARY_INPUT_CHARS)
    }

    pub fn has_external(&self) -> bool {
        self.summarizer.is_some()
    }

    pub fn summarize(
        &self,
        identity: &SessionIdentity,
        state: ActivityState,
        progress: Option<Progress>,
        raw_tail: &str,
    ) -> String {
        let shaped = shape_for_summary(raw_tail, self.max_input_chars);

        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(&shaped, self.max_length) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(
                        session = %identity,
                        summarizer = summarizer.name(),
                        "Summary generated"
                    );
                    return truncate_summary(text.trim(), self.max_length);
                }
                Ok(_) => {
                    warn!(
                        session = %identity,
                        summarizer = summarizer.name(),
                        "Summarizer returned empty text; using local summary"
                    );
                }
                Err(err) => {
                    warn!(
                        session = %identity,
                        summarizer = summarizer.name(),
                        error = %err,
                        "Summarizer failed; using local summary"
                    );
                }
            }
        }

        heuristic_summary(state, progress, &shaped, self.max_length)
    }
}

/// Agent output lines, newest first, without prompts, echoed commands or
/// input-box rules.
fn output_lines_newest_first(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('$') && !line.starts_with('>'))
        .filter(|line| !is_separator(line))
}

/// True when the recent output mentions a failure.
///
/// This only colors the summary; it never changes the session's state.
pub fn detect_error(text: &str) -> bool {
    output_lines_newest_first(text)
        .take(ERROR_SCAN_LINES)
        .any(|line| RE_ERROR_KEYWORD.is_match(line))
}

/// True when the output ends by asking the user something.
pub fn detect_question(text: &str) -> bool {
    let mut lines = output_lines_newest_first(text).take(QUESTION_SCAN_LINES);
    match lines.next() {
        Some(last) if last.ends_with('?') || RE_QUESTION.is_match(last) => true,
        Some(_) => lines.any(|line| RE_QUESTION.is_match(line)),
        None => false,
    }
}

/// Local summary: state, hints, progress, then the latest output lines.
pub fn heuristic_summary(
    state: ActivityState,
    progress: Option<Progress>,
    text: &str,
    max_length: usize,
) -> String {
    let mut parts = vec![format!("Status: {state}")];
    if detect_error(text) {
        parts.push("Error detected".to_string());
    }
    if let Some(progress) = progress {
        parts.push(format!("Progress: {progress}"));
    }
    if state != ActivityState::Waiting && detect_question(text) {
        parts.push("Waiting for input".to_string());
    }

    let mut recent: Vec<&str> = output_lines_newest_first(text)
        .take(FALLBACK_LINE_COUNT)
        .collect();
    recent.reverse();
    if !recent.is_empty() {
        parts.push(recent.join(" "));
    }

    truncate_summary(&parts.join(" | "), max_length)
}

/// Caps `text` at `max_length` characters, marking the cut with `...`.
pub fn truncate_summary(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedSummarizer {
        reply: std::result::Result<String, String>,
        calls: Arc<AtomicUsize>,
    }

    impl Summarizer for FixedSummarizer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn summarize(&self, _text: &str, _max_length: usize) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(MonitorError::SummarizerFailed)
        }
    }

    fn identity() -> SessionIdentity {
        SessionIdentity::new("work:0", 0)
    }

    #[test]
    fn heuristic_includes_state_progress_and_recent_lines() {
        let text = "$ cargo test\nold line\n⏺ Ran 12 tests\n\n> user note\nAll green.\n";
        let summary = heuristic_summary(
            ActivityState::Idle,
            Some(Progress {
                completed: 2,
                total: 5,
            }),
            text,
            200,
        );
        assert_eq!(
            summary,
            "Status: idle | Progress: 2/5 completed | old line ⏺ Ran 12 tests All green."
        );
    }

    #[test]
    fn heuristic_without_output_reports_state_only() {
        assert_eq!(
            heuristic_summary(ActivityState::Waiting, None, "", 200),
            "Status: waiting"
        );
    }

    #[test]
    fn heuristic_flags_errors_that_scrolled_past_the_last_lines() {
        let text = "Error: Failed to compile TypeScript\n\
                    Cannot find module '@types/node'\n\
                    ⏺ Let me look at tsconfig.json\n\
                    ⏺ Read(tsconfig.json)\n\
                    ⏺ The types entry is missing.\n";
        let summary = heuristic_summary(ActivityState::Idle, None, text, 200);
        assert_eq!(
            summary,
            "Status: idle | Error detected | ⏺ Let me look at tsconfig.json ⏺ Read(tsconfig.json) ⏺ The types entry is missing."
        );
    }

    #[test]
    fn heuristic_flags_open_questions_outside_waiting() {
        let text = "⏺ Two options for the cache layer.\nShould I keep the old API as a shim?\n";
        let idle = heuristic_summary(ActivityState::Idle, None, text, 200);
        assert!(idle.starts_with("Status: idle | Waiting for input | "));

        let waiting = heuristic_summary(ActivityState::Waiting, None, text, 200);
        assert!(!waiting.contains("Waiting for input"));
    }

    #[test]
    fn hints_ignore_prompt_lines_and_old_scrollback() {
        let mut text = String::from("error: linker failed\n");
        for n in 0..12 {
            text.push_str(&format!("⏺ step {n} ok\n"));
        }
        text.push_str("> why did it fail?\n");
        assert!(!detect_error(&text));
        assert!(!detect_question(&text));
        assert!(detect_question("Apply the patch [Y/n]\n"));
        assert!(detect_error("ビルドに失敗しました"));
    }

    #[test]
    fn truncate_summary_respects_char_budget() {
        assert_eq!(truncate_summary("short", 10), "short");
        assert_eq!(truncate_summary("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate_summary("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn engine_uses_external_summary_when_available() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = SummaryEngine::new(
            Some(Box::new(FixedSummarizer {
                reply: Ok("  Refactor finished, waiting for review.  ".to_string()),
                calls: Arc::clone(&calls),
            })),
            200,
            DEFAULT_SUMMARY_INPUT_CHARS,
        );
        let summary = engine.summarize(&identity(), ActivityState::Idle, None, "⏺ done");
        assert_eq!(summary, "Refactor finished, waiting for review.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_falls_back_when_summarizer_fails() {
        let engine = SummaryEngine::new(
            Some(Box::new(FixedSummarizer {
                reply: Err("rate limited".to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            })),
            200,
            DEFAULT_SUMMARY_INPUT_CHARS,
        );
        let summary = engine.summarize(&identity(), ActivityState::Idle, None, "⏺ Build passed");
        assert_eq!(summary, "Status: idle | ⏺ Build passed");
    }

    #[test]
    fn engine_falls_back_on_empty_reply() {
        let engine = SummaryEngine::new(
            Some(Box::new(FixedSummarizer {
                reply: Ok("   ".to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            })),
            200,
            DEFAULT_SUMMARY_INPUT_CHARS,
        );
        let summary = engine.summarize(&identity(), ActivityState::Waiting, None, "Pick one");
        assert_eq!(summary, "Status: waiting | Pick one");
    }

    #[test]
    fn heuristic_engine_ignores_live_input_and_previous_instruction() {
        let rule = "────────────────────";
        let tail = format!("> add tests\n\n⏺ Added 4 tests.\n{rule}\n> draft\n{rule}\n");
        let engine = SummaryEngine::heuristic_only(200);
        assert!(!engine.has_external());
        assert_eq!(
            engine.summarize(&identity(), ActivityState::Idle, None, &tail),
            "Status: idle | ⏺ Added 4 tests."
        );
    }
}
