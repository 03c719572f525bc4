//! Activity classification from a captured tail.
//!
//! Only the last few lines above the input box are considered. A numbered
//! option list beats everything; a busy footer means Active; otherwise the
//! session goes Idle, but an Active session has to look quiet for
//! `idle_confirm_polls` consecutive polls first. The busy footer regularly
//! scrolls just out of the captured window between polls while the agent is
//! still working, and a single quiet poll is not enough to say otherwise.

use std::collections::BTreeSet;

use crate::patterns::{RE_OPTION_MARKER, RE_PROGRESS};
use crate::shaping::{is_separator, last_lines, strip_input_region};
use crate::types::{ActivityState, Progress};

/// Footer fragments the agent shows only while a turn or tool is running.
/// Matched case-insensitively.
pub const BUSY_INDICATORS: &[&str] = &[
    "esc to interrupt",
    "ctrl+c to interrupt",
    "ctrl+b to run in background",
];

pub const CLASSIFY_WINDOW_LINES: usize = 10;
pub const DEFAULT_IDLE_CONFIRM_POLLS: u32 = 2;

/// State carried over from the previous poll of the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorClassification {
    pub state: ActivityState,
    pub idle_confirm_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: ActivityState,
    pub idle_confirm_count: u32,
    pub option_count: usize,
    /// Progress marker found in this tail, if any. Callers keep the previous
    /// value when this is `None`.
    pub progress_seen: Option<Progress>,
}

impl Classification {
    /// True while an Active session is inside its quiet-poll grace window.
    pub fn idle_pending(&self) -> bool {
        self.state == ActivityState::Active && self.idle_confirm_count > 0
    }
}

pub fn classify(
    raw_tail: &str,
    prior: Option<PriorClassification>,
    idle_confirm_polls: u32,
) -> Classification {
    let window = last_lines(strip_input_region(raw_tail), CLASSIFY_WINDOW_LINES);
    let option_numbers = option_numbers_after_last_separator(&window);
    let option_count = option_numbers.len();
    let progress_seen = extract_progress(raw_tail);

    let (state, idle_confirm_count) = if option_numbers.contains(&1) && option_numbers.contains(&2)
    {
        (ActivityState::Waiting, 0)
    } else if has_busy_indicator(&window) {
        (ActivityState::Active, 0)
    } else {
        match prior {
            Some(prior) if prior.state == ActivityState::Active => {
                let quiet_polls = prior.idle_confirm_count.saturating_add(1);
                if quiet_polls >= idle_confirm_polls.max(1) {
                    (ActivityState::Idle, 0)
                } else {
                    (ActivityState::Active, quiet_polls)
                }
            }
            _ => (ActivityState::Idle, 0),
        }
    };

    Classification {
        state,
        idle_confirm_count,
        option_count,
        progress_seen,
    }
}

fn option_numbers_after_last_separator(window: &[&str]) -> BTreeSet<u32> {
    let start = window
        .iter()
        .rposition(|line| is_separator(line))
        .map(|index| index + 1)
        .unwrap_or(0);

    window[start..]
        .iter()
        .filter_map(|line| RE_OPTION_MARKER.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .collect()
}

fn has_busy_indicator(window: &[&str]) -> bool {
    window.iter().any(|line| {
        let lowered = line.to_lowercase();
        BUSY_INDICATORS
            .iter()
            .any(|indicator| lowered.contains(indicator))
    })
}

/// Last `<completed>/<total> completed` marker anywhere in the tail.
pub fn extract_progress(raw_tail: &str) -> Option<Progress> {
    let caps = RE_PROGRESS.captures_iter(raw_tail).last()?;
    let completed = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some(Progress { completed, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: &str = "────────────────────";

    fn busy_tail() -> String {
        format!(
            "⏺ Reading src/main.rs\n✻ Thinking… (esc to interrupt)\n{RULE}\n> \n{RULE}\n"
        )
    }

    fn quiet_tail() -> String {
        format!("⏺ Reading src/main.rs\n⏺ Updated 3 files.\n{RULE}\n> \n{RULE}\n")
    }

    fn prior(state: ActivityState, idle_confirm_count: u32) -> Option<PriorClassification> {
        Some(PriorClassification {
            state,
            idle_confirm_count,
        })
    }

    #[test]
    fn busy_indicator_yields_active() {
        let result = classify(&busy_tail(), None, DEFAULT_IDLE_CONFIRM_POLLS);
        assert_eq!(result.state, ActivityState::Active);
        assert_eq!(result.idle_confirm_count, 0);
    }

    #[test]
    fn busy_indicator_match_ignores_case() {
        let result = classify("Running tests (ESC to interrupt)", None, 2);
        assert_eq!(result.state, ActivityState::Active);
    }

    #[test]
    fn first_quiet_classification_is_idle_immediately() {
        let result = classify(&quiet_tail(), None, DEFAULT_IDLE_CONFIRM_POLLS);
        assert_eq!(result.state, ActivityState::Idle);
        assert_eq!(result.idle_confirm_count, 0);
    }

    #[test]
    fn active_needs_two_quiet_polls_to_go_idle() {
        let first = classify(
            &quiet_tail(),
            prior(ActivityState::Active, 0),
            DEFAULT_IDLE_CONFIRM_POLLS,
        );
        assert_eq!(first.state, ActivityState::Active);
        assert_eq!(first.idle_confirm_count, 1);
        assert!(first.idle_pending());

        let second = classify(
            &quiet_tail(),
            prior(first.state, first.idle_confirm_count),
            DEFAULT_IDLE_CONFIRM_POLLS,
        );
        assert_eq!(second.state, ActivityState::Idle);
        assert_eq!(second.idle_confirm_count, 0);
        assert!(!second.idle_pending());
    }

    #[test]
    fn busy_indicator_resets_pending_idle_count() {
        let result = classify(
            &busy_tail(),
            prior(ActivityState::Active, 1),
            DEFAULT_IDLE_CONFIRM_POLLS,
        );
        assert_eq!(result.state, ActivityState::Active);
        assert_eq!(result.idle_confirm_count, 0);
    }

    #[test]
    fn idle_confirm_polls_of_one_downgrades_immediately() {
        let result = classify(&quiet_tail(), prior(ActivityState::Active, 0), 1);
        assert_eq!(result.state, ActivityState::Idle);
    }

    #[test]
    fn waiting_takes_precedence_over_busy_indicator() {
        let tail = format!(
            "⏺ Bash(rm -rf build)\n{RULE}\n Do you want to proceed?\n ❯ 1. Yes\n   2. No, and tell Claude what to do differently\n (esc to interrupt)\n"
        );
        let result = classify(&tail, prior(ActivityState::Active, 0), 2);
        assert_eq!(result.state, ActivityState::Waiting);
        assert_eq!(result.idle_confirm_count, 0);
        assert_eq!(result.option_count, 2);
    }

    #[test]
    fn options_before_last_separator_do_not_count() {
        let tail = format!("Choose:\n1. Alpha\n2. Beta\n{RULE}\nDone, picked alpha.\n");
        let result = classify(&tail, None, 2);
        assert_eq!(result.state, ActivityState::Idle);
        assert_eq!(result.option_count, 0);
    }

    #[test]
    fn single_option_marker_is_not_waiting() {
        let result = classify("Steps:\n1. Build the crate\n", None, 2);
        assert_eq!(result.state, ActivityState::Idle);
        assert_eq!(result.option_count, 1);
    }

    #[test]
    fn text_inside_live_input_box_is_ignored() {
        let tail = format!(
            "⏺ All done.\n{RULE}\n> 1. try this (esc to interrupt)\n  2. then that\n{RULE}\n"
        );
        let result = classify(&tail, None, 2);
        assert_eq!(result.state, ActivityState::Idle);
    }

    #[test]
    fn busy_indicator_outside_window_is_ignored() {
        let mut tail = String::from("✻ Working (esc to interrupt)\n");
        for index in 0..CLASSIFY_WINDOW_LINES {
            tail.push_str(&format!("line {index}\n"));
        }
        let result = classify(&tail, None, 2);
        assert_eq!(result.state, ActivityState::Idle);
    }

    #[test]
    fn progress_is_scanned_over_full_tail_and_last_match_wins() {
        let mut tail = String::from("Todos: 1/4 completed\n");
        for index in 0..30 {
            tail.push_str(&format!("noise {index}\n"));
        }
        tail.push_str("Todos: 3/4 completed\n");
        let result = classify(&tail, None, 2);
        assert_eq!(
            result.progress_seen,
            Some(Progress {
                completed: 3,
                total: 4
            })
        );
    }

    #[test]
    fn missing_progress_reports_none() {
        assert_eq!(extract_progress("nothing here"), None);
    }
}
