//! Decides when a poll is worth a (re)summary and an announcement.
//!
//! Conservative rules: only the bounded end of the tail is
//! compared, only arrivals into Idle or Waiting count, and a trigger whose
//! signature matches the one behind the current summary is dropped.

use crate::classifier::Classification;
use crate::shaping::last_chars;
use crate::types::ActivityState;

pub const DEFAULT_COMPARE_WINDOW_CHARS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Keep the sticky summary.
    Keep,
    /// First sighting of a session with output: summarize, stay quiet.
    SummarizeSilently,
    /// Settled into Idle or Waiting: summarize and announce.
    SummarizeAndNotify,
}

impl TriggerDecision {
    pub fn summarizes(&self) -> bool {
        !matches!(self, TriggerDecision::Keep)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TriggerInput<'a> {
    /// `None` when no output of this session has been seen before.
    pub previous_state: Option<ActivityState>,
    pub classification: &'a Classification,
    pub raw_tail: &'a str,
    pub previous_tail: &'a str,
    pub last_signature: &'a str,
    pub compare_window: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub tail_changed: bool,
    pub decision: TriggerDecision,
    /// Whether `previous_output_tail` should move up to the current tail.
    pub advance_baseline: bool,
    pub signature: String,
}

pub fn tail_changed(current: &str, previous: &str, window: usize) -> bool {
    last_chars(current, window) != last_chars(previous, window)
}

pub fn trigger_signature(state: ActivityState, option_count: usize) -> String {
    format!("{state}:{option_count}")
}

pub fn evaluate(input: TriggerInput<'_>) -> TriggerOutcome {
    let classification = input.classification;
    let signature = trigger_signature(classification.state, classification.option_count);
    let changed = tail_changed(input.raw_tail, input.previous_tail, input.compare_window);

    // Blank output is no output: nothing to summarize and nothing to compare
    // the next real tail against.
    if !changed || input.raw_tail.trim().is_empty() {
        return TriggerOutcome {
            tail_changed: changed,
            decision: TriggerDecision::Keep,
            advance_baseline: false,
            signature,
        };
    }

    // A quiet poll inside the idle grace window is not evidence yet; keep
    // comparing against the last settled tail until it is confirmed.
    let advance_baseline = !classification.idle_pending();

    let decision = match input.previous_state {
        None => TriggerDecision::SummarizeSilently,
        Some(previous)
            if previous != classification.state
                && classification.state.is_attention_state()
                && signature != input.last_signature =>
        {
            TriggerDecision::SummarizeAndNotify
        }
        Some(_) => TriggerDecision::Keep,
    };

    TriggerOutcome {
        tail_changed: true,
        decision,
        advance_baseline,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(state: ActivityState, idle_confirm_count: u32) -> Classification {
        Classification {
            state,
            idle_confirm_count,
            option_count: 0,
            progress_seen: None,
        }
    }

    fn input<'a>(
        previous_state: Option<ActivityState>,
        classification: &'a Classification,
        raw_tail: &'a str,
        previous_tail: &'a str,
        last_signature: &'a str,
    ) -> TriggerInput<'a> {
        TriggerInput {
            previous_state,
            classification,
            raw_tail,
            previous_tail,
            last_signature,
            compare_window: DEFAULT_COMPARE_WINDOW_CHARS,
        }
    }

    #[test]
    fn changes_beyond_compare_window_are_ignored() {
        let window = "x".repeat(DEFAULT_COMPARE_WINDOW_CHARS);
        let previous = format!("old scrollback{window}");
        let current = format!("completely different scrollback{window}");
        assert!(!tail_changed(&current, &previous, DEFAULT_COMPARE_WINDOW_CHARS));
        assert!(tail_changed(&format!("{window}y"), &previous, DEFAULT_COMPARE_WINDOW_CHARS));
    }

    #[test]
    fn unchanged_tail_keeps_summary() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(Some(ActivityState::Active), &c, "same", "same", ""));
        assert!(!outcome.tail_changed);
        assert_eq!(outcome.decision, TriggerDecision::Keep);
        assert!(!outcome.advance_baseline);
    }

    #[test]
    fn first_sighting_summarizes_silently() {
        let c = classification(ActivityState::Active, 0);
        let outcome = evaluate(input(None, &c, "⏺ working", "", ""));
        assert_eq!(outcome.decision, TriggerDecision::SummarizeSilently);
        assert!(outcome.advance_baseline);
    }

    #[test]
    fn first_sighting_without_output_does_nothing() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(None, &c, "", "", ""));
        assert_eq!(outcome.decision, TriggerDecision::Keep);
    }

    #[test]
    fn whitespace_only_tail_is_not_output() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(None, &c, "   \n\n", "", ""));
        assert_eq!(outcome.decision, TriggerDecision::Keep);
        assert!(!outcome.advance_baseline);
    }

    #[test]
    fn transition_into_idle_notifies() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(Some(ActivityState::Active), &c, "b", "a", ""));
        assert_eq!(outcome.decision, TriggerDecision::SummarizeAndNotify);
        assert_eq!(outcome.signature, "idle:0");
    }

    #[test]
    fn transition_into_active_never_triggers() {
        let c = classification(ActivityState::Active, 0);
        let outcome = evaluate(input(Some(ActivityState::Idle), &c, "b", "a", ""));
        assert_eq!(outcome.decision, TriggerDecision::Keep);
        assert!(outcome.advance_baseline);
    }

    #[test]
    fn staying_in_same_state_does_not_trigger() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(Some(ActivityState::Idle), &c, "b", "a", ""));
        assert_eq!(outcome.decision, TriggerDecision::Keep);
        assert!(outcome.advance_baseline);
    }

    #[test]
    fn matching_signature_suppresses_duplicate_trigger() {
        let c = classification(ActivityState::Idle, 0);
        let outcome = evaluate(input(Some(ActivityState::Error), &c, "b", "a", "idle:0"));
        assert_eq!(outcome.decision, TriggerDecision::Keep);
    }

    #[test]
    fn pending_idle_holds_the_baseline() {
        let c = classification(ActivityState::Active, 1);
        let outcome = evaluate(input(Some(ActivityState::Active), &c, "b", "a", ""));
        assert!(outcome.tail_changed);
        assert!(!outcome.advance_baseline);
        assert_eq!(outcome.decision, TriggerDecision::Keep);
    }
}
