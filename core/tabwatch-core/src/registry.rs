//! The session registry: one record per tracked identity, merged with every
//! poll and ordered by a user-controllable display order.
//!
//! The registry is owned by the polling worker. Everything it hands out is a
//! clone; the consumer side never writes into it directly.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::classifier::{classify, PriorClassification, DEFAULT_IDLE_CONFIRM_POLLS};
use crate::shaping::last_chars;
use crate::summary::SummaryEngine;
use crate::trigger::{evaluate, TriggerDecision, TriggerInput, DEFAULT_COMPARE_WINDOW_CHARS};
use crate::types::{
    ActivityState, Direction, Notification, RawSession, SessionIdentity, SessionRecord,
};

pub const DEFAULT_TAIL_MAX_CHARS: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryPolicy {
    pub idle_confirm_polls: u32,
    pub compare_window_chars: usize,
    pub tail_max_chars: usize,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            idle_confirm_polls: DEFAULT_IDLE_CONFIRM_POLLS,
            compare_window_chars: DEFAULT_COMPARE_WINDOW_CHARS,
            tail_max_chars: DEFAULT_TAIL_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Surviving records ordered by display order.
    pub records: Vec<SessionRecord>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug)]
pub struct Registry {
    records: HashMap<SessionIdentity, SessionRecord>,
    next_order: u32,
    policy: RegistryPolicy,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryPolicy::default())
    }
}

impl Registry {
    pub fn new(policy: RegistryPolicy) -> Self {
        Self {
            records: HashMap::new(),
            next_order: 1,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, identity: &SessionIdentity) -> Option<SessionRecord> {
        self.records.get(identity).cloned()
    }

    /// All records sorted by display order, ties broken by identity.
    pub fn ordered(&self) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> = self.records.values().cloned().collect();
        records.sort_by(|left, right| {
            left.display_order
                .cmp(&right.display_order)
                .then_with(|| left.identity.cmp(&right.identity))
        });
        records
    }

    /// Merges one poll's tracked sessions into the registry.
    ///
    /// Identities missing from `polled` are dropped; absence from a
    /// successful listing is authoritative.
    pub fn merge(
        &mut self,
        polled: Vec<RawSession>,
        summaries: &SummaryEngine,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let mut merged = HashMap::with_capacity(polled.len());
        let mut seen = HashSet::with_capacity(polled.len());
        let mut notifications = Vec::new();

        for raw in polled {
            if !seen.insert(raw.identity.clone()) {
                warn!(session = %raw.identity, "Duplicate identity in poll; keeping first");
                continue;
            }

            let existing = self.records.remove(&raw.identity);
            let record = match existing {
                Some(existing) if raw.raw_tail.trim().is_empty() => {
                    debug!(session = %raw.identity, "No content this poll; keeping stale record");
                    SessionRecord {
                        label: raw.label,
                        ..existing
                    }
                }
                existing => {
                    self.update_record(raw, existing, summaries, now, &mut notifications)
                }
            };
            merged.insert(record.identity.clone(), record);
        }

        for (identity, record) in self.records.drain() {
            info!(
                session = %identity,
                label = %record.label,
                display_order = record.display_order,
                "Session removed"
            );
        }
        self.records = merged;

        MergeOutcome {
            records: self.ordered(),
            notifications,
        }
    }

    fn update_record(
        &mut self,
        raw: RawSession,
        existing: Option<SessionRecord>,
        summaries: &SummaryEngine,
        now: DateTime<Utc>,
        notifications: &mut Vec<Notification>,
    ) -> SessionRecord {
        let raw_tail = last_chars(&raw.raw_tail, self.policy.tail_max_chars).to_string();
        let prior = existing.as_ref().map(|record| PriorClassification {
            state: record.state,
            idle_confirm_count: record.idle_confirm_count,
        });
        let classification = classify(&raw_tail, prior, self.policy.idle_confirm_polls);

        let (display_order, previous_tail, summary, last_signature, sticky_progress, trigger_state) =
            match existing {
                Some(record) => {
                    // Until some output has been captured there is nothing the
                    // user could have heard about, so treat it as a first sighting.
                    let trigger_state =
                        (!record.previous_output_tail.trim().is_empty()).then_some(record.state);
                    (
                        record.display_order,
                        record.previous_output_tail,
                        record.summary,
                        record.last_trigger_signature,
                        record.progress,
                        trigger_state,
                    )
                }
                None => {
                    let order = self.next_order;
                    self.next_order = self.next_order.saturating_add(1);
                    info!(
                        session = %raw.identity,
                        label = %raw.label,
                        display_order = order,
                        state = %classification.state,
                        "Session added"
                    );
                    (order, String::new(), String::new(), String::new(), None, None)
                }
            };

        let progress = classification.progress_seen.or(sticky_progress);
        let outcome = evaluate(TriggerInput {
            previous_state: trigger_state,
            classification: &classification,
            raw_tail: &raw_tail,
            previous_tail: &previous_tail,
            last_signature: &last_signature,
            compare_window: self.policy.compare_window_chars,
        });

        let (summary, mut last_trigger_signature) = if outcome.decision.summarizes() {
            let text =
                summaries.summarize(&raw.identity, classification.state, progress, &raw_tail);
            (text, outcome.signature.clone())
        } else {
            (summary, last_signature)
        };

        if outcome.decision == TriggerDecision::SummarizeAndNotify {
            if let Some(from) = trigger_state {
                info!(
                    session = %raw.identity,
                    from = %from,
                    to = %classification.state,
                    "State transition announced"
                );
                notifications.push(Notification {
                    identity: raw.identity.clone(),
                    label: raw.label.clone(),
                    from,
                    to: classification.state,
                    summary: summary.clone(),
                });
            }
        }

        // Real activity re-arms the trigger so the next settle is announced
        // even when it looks like the previous one.
        if classification.state == ActivityState::Active {
            last_trigger_signature.clear();
        }

        let previous_output_tail = if outcome.advance_baseline {
            raw_tail.clone()
        } else {
            previous_tail
        };

        SessionRecord {
            identity: raw.identity,
            label: raw.label,
            is_tracked: true,
            raw_output_tail: raw_tail,
            previous_output_tail,
            state: classification.state,
            idle_confirm_count: classification.idle_confirm_count,
            option_count: classification.option_count,
            progress,
            summary,
            last_trigger_signature,
            display_order,
            last_updated: now,
        }
    }

    /// Moves a session one step up or down and renumbers every record
    /// `1..=N`. Unknown identities and moves past either end leave the order
    /// untouched (but still renumber densely).
    pub fn reorder(&mut self, identity: &SessionIdentity, direction: Direction) -> Vec<SessionRecord> {
        let mut order: Vec<SessionIdentity> = self
            .ordered()
            .into_iter()
            .map(|record| record.identity)
            .collect();

        if let Some(rank) = order.iter().position(|candidate| candidate == identity) {
            match swap_adjacent(&mut order, rank, direction) {
                Some(target) => {
                    debug!(session = %identity, ?direction, from = rank, to = target, "Session reordered");
                }
                None => debug!(session = %identity, ?direction, "Reorder at boundary ignored"),
            }
        } else {
            warn!(session = %identity, "Reorder requested for unknown session");
        }

        for (rank, key) in order.iter().enumerate() {
            if let Some(record) = self.records.get_mut(key) {
                record.display_order = rank as u32 + 1;
            }
        }
        let dense_next = order.len() as u32 + 1;
        self.next_order = self.next_order.max(dense_next);

        self.ordered()
    }
}

/// Swaps `items[rank]` with its neighbour in `direction` and returns the
/// neighbour's former rank, or `None` at either end.
pub fn swap_adjacent<T>(items: &mut [T], rank: usize, direction: Direction) -> Option<usize> {
    let target = match direction {
        Direction::Up => rank.checked_sub(1)?,
        Direction::Down => rank + 1,
    };
    if rank >= items.len() || target >= items.len() {
        return None;
    }
    items.swap(rank, target);
    Some(target)
}
