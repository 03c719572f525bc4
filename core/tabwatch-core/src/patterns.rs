//! Compiled regex patterns for reading agent terminal output.
//!
//! These patterns are compiled once on first use and reused by the shaping,
//! classification and summary code. Update them when the agent's TUI changes
//! how it draws prompts, option lists or task progress.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Layout Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// A boundary line of the input box: only `─` characters, at least ten of them.
pub static RE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*─{10,}\s*$").unwrap());

/// A numbered option line (`1. Yes`, `❯ 2) No`, `│ 3. Cancel`), capturing the number.
pub static RE_OPTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s│┃|❯›>]*(\d{1,2})[.)]\s+\S").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Progress Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*/\s*(\d+)\s*(?:completed|done|tasks?)\b").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Summary Hint Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// Words that mark a failure in recent output, English or Japanese.
pub static RE_ERROR_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:error|failed|exception|cannot|unable to)|エラー|失敗|例外|できません")
        .unwrap()
});

/// A line asking for a decision: a yes/no hint, a choice request, or a
/// trailing `[options]` / `[default]:` prompt.
pub static RE_QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:yes/no|y/n)\b|選択してください|選んでください|選択肢|どちらにしますか|\[[^\]]*\]\s*:?\s*$")
        .unwrap()
});
