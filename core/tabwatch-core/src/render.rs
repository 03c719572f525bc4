//! Consumer side of the exchange: turns queued snapshots into render calls.
//!
//! The adapter keeps its own copy of what is on screen, keyed by identity, so
//! a renderer can tell rows to reuse from rows to create or destroy. It never
//! touches the registry; reorders go back to the worker as commands.
//!
//! Snapshots the worker captured before it saw our latest reorder are not
//! rendered, so a local move is never undone by a stale frame. Snapshots that
//! would not change anything on screen are not rendered either.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dispatch::{SnapshotReceiver, WorkerCommand};
use crate::registry::swap_adjacent;
use crate::source::SessionSource;
use crate::types::{Direction, Notification, SessionIdentity, SessionRecord, Snapshot};

/// How the displayed set changed between two applied snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderDiff {
    pub created: Vec<SessionIdentity>,
    pub reused: Vec<SessionIdentity>,
    pub removed: Vec<SessionIdentity>,
}

pub trait Renderer {
    /// `records` is the full list in display order.
    fn on_ordered_snapshot(&mut self, records: &[SessionRecord], diff: &RenderDiff);

    fn announce(&mut self, notification: &Notification);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub drained: usize,
    pub applied: bool,
    pub announced: usize,
}

pub struct RenderAdapter<R: Renderer> {
    renderer: R,
    snapshots: SnapshotReceiver,
    commands: Sender<WorkerCommand>,
    source: Arc<dyn SessionSource>,
    displayed: Vec<SessionRecord>,
    items: HashMap<SessionIdentity, SessionRecord>,
    suspended: bool,
    last_sequence: u64,
    reorders_sent: u64,
    reorders_confirmed: u64,
}

impl<R: Renderer> RenderAdapter<R> {
    pub fn new(
        renderer: R,
        snapshots: SnapshotReceiver,
        commands: Sender<WorkerCommand>,
        source: Arc<dyn SessionSource>,
    ) -> Self {
        Self {
            renderer,
            snapshots,
            commands,
            source,
            displayed: Vec::new(),
            items: HashMap::new(),
            suspended: false,
            last_sequence: 0,
            reorders_sent: 0,
            reorders_confirmed: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Records as last handed to the renderer.
    pub fn displayed(&self) -> &[SessionRecord] {
        &self.displayed
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// True while a reorder sent to the worker is not yet in a snapshot.
    pub fn has_pending_reorder(&self) -> bool {
        self.reorders_confirmed < self.reorders_sent
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// True once the worker has exited and its queue is empty.
    pub fn is_worker_gone(&self) -> bool {
        self.snapshots.is_disconnected()
    }

    /// Pauses or resumes applying snapshots, e.g. around a drag gesture.
    /// Resuming asks the worker for a fresh cycle.
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended == suspended {
            return;
        }
        self.suspended = suspended;
        debug!(suspended, "Render updates toggled");
        if !suspended {
            self.send(WorkerCommand::ForceRefresh);
        }
    }

    /// Drains the queue. Every notification is announced; only the newest
    /// snapshot is rendered, and nothing is rendered while suspended or
    /// while a reorder is still in flight.
    pub fn tick(&mut self) -> TickReport {
        let drained = self.snapshots.drain();
        let mut report = TickReport {
            drained: drained.len(),
            ..TickReport::default()
        };

        let mut latest: Option<Snapshot> = None;
        for snapshot in drained {
            for notification in &snapshot.notifications {
                self.renderer.announce(notification);
                report.announced += 1;
            }
            latest = Some(snapshot);
        }

        if let Some(snapshot) = latest {
            self.last_sequence = snapshot.sequence;
            self.reorders_confirmed = snapshot.reorders_applied;
            if self.has_pending_reorder() {
                debug!(
                    sequence = snapshot.sequence,
                    "Snapshot predates a local reorder; not rendered"
                );
            } else if !self.suspended {
                self.apply(snapshot.records);
                report.applied = true;
            }
        }
        report
    }

    fn apply(&mut self, records: Vec<SessionRecord>) {
        let mut diff = RenderDiff::default();
        let mut next_items = HashMap::with_capacity(records.len());
        for record in &records {
            if self.items.remove(&record.identity).is_some() {
                diff.reused.push(record.identity.clone());
            } else {
                diff.created.push(record.identity.clone());
            }
            next_items.insert(record.identity.clone(), record.clone());
        }
        let mut removed: Vec<SessionIdentity> = self.items.drain().map(|(id, _)| id).collect();
        removed.sort();
        diff.removed = removed;

        self.items = next_items;
        let unchanged = diff.created.is_empty()
            && diff.removed.is_empty()
            && records.len() == self.displayed.len()
            && records
                .iter()
                .zip(&self.displayed)
                .all(|(next, shown)| looks_the_same(next, shown));
        if !unchanged {
            self.renderer.on_ordered_snapshot(&records, &diff);
        }
        self.displayed = records;
    }

    /// Moves a row locally right away and asks the worker to persist it.
    pub fn request_reorder(&mut self, identity: &SessionIdentity, direction: Direction) -> bool {
        let Some(rank) = self
            .displayed
            .iter()
            .position(|record| &record.identity == identity)
        else {
            warn!(session = %identity, "Reorder requested for a session not on screen");
            return false;
        };

        if swap_adjacent(&mut self.displayed, rank, direction).is_some() {
            for (rank, record) in self.displayed.iter_mut().enumerate() {
                record.display_order = rank as u32 + 1;
                self.items.insert(record.identity.clone(), record.clone());
            }
            if !self.suspended {
                let diff = RenderDiff {
                    reused: self.displayed.iter().map(|r| r.identity.clone()).collect(),
                    ..RenderDiff::default()
                };
                self.renderer.on_ordered_snapshot(&self.displayed, &diff);
            }
        }

        let sent = self.send(WorkerCommand::Reorder {
            identity: identity.clone(),
            direction,
        });
        if sent {
            self.reorders_sent += 1;
        }
        sent
    }

    pub fn select(&self, identity: &SessionIdentity) -> bool {
        let activated = self.source.activate(identity);
        if !activated {
            warn!(session = %identity, "Failed to activate session");
        }
        activated
    }

    /// Answers a numbered prompt by typing the option number.
    pub fn choose_option(&self, identity: &SessionIdentity, option: u32) -> bool {
        if option == 0 {
            warn!(session = %identity, "Option numbers start at 1");
            return false;
        }
        info!(session = %identity, option, "Choosing option");
        self.source.send_text(identity, &option.to_string())
    }

    pub fn shutdown(&self) {
        self.send(WorkerCommand::Shutdown);
    }

    fn send(&self, command: WorkerCommand) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(err) => {
                debug!(command = ?err.0, "Worker is gone; command dropped");
                false
            }
        }
    }
}

/// Compares the fields a renderer shows; timestamps alone don't count.
fn looks_the_same(next: &SessionRecord, shown: &SessionRecord) -> bool {
    next.identity == shown.identity
        && next.label == shown.label
        && next.state == shown.state
        && next.summary == shown.summary
        && next.progress == shown.progress
        && next.option_count == shown.option_count
        && next.display_order == shown.display_order
}
