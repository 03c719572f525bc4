//! The polling worker: list, read, merge, publish, wait.
//!
//! The worker owns the [`Registry`]. It runs a cycle on a fixed interval, or
//! right away when a command arrives, and hands the consumer a [`Snapshot`]
//! per successful cycle.

use chrono::Utc;
use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::dispatch::{SnapshotSender, WorkerCommand};
use crate::error::Result;
use crate::registry::Registry;
use crate::source::SessionSource;
use crate::summary::SummaryEngine;
use crate::types::{RawSession, Snapshot};

pub const POLLER_THREAD_NAME: &str = "tabwatch-poller";

pub struct Poller {
    registry: Registry,
    source: Arc<dyn SessionSource>,
    summaries: SummaryEngine,
    tail_lines: usize,
    interval: Duration,
    sequence: u64,
    reorders_applied: u64,
}

impl Poller {
    pub fn new(
        source: Arc<dyn SessionSource>,
        summaries: SummaryEngine,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry: Registry::new(config.registry_policy()),
            source,
            summaries,
            tail_lines: config.poll.tail_lines,
            interval: config.poll_interval(),
            sequence: 0,
            reorders_applied: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Applies one command. Returns `false` when the worker should stop.
    pub fn apply_command(&mut self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::Reorder {
                identity,
                direction,
            } => {
                self.registry.reorder(&identity, direction);
                self.reorders_applied += 1;
                true
            }
            WorkerCommand::ForceRefresh => {
                debug!("Forced refresh requested");
                true
            }
            WorkerCommand::Shutdown => false,
        }
    }

    /// One ingestion pass. A failed listing leaves the registry untouched.
    pub fn poll_once(&mut self) -> Result<Snapshot> {
        let listings = self.source.list_sessions()?;
        let polled: Vec<RawSession> = listings
            .into_iter()
            .filter(|listing| listing.is_tracked)
            .map(|listing| {
                let raw_tail = self.source.read_tail(&listing.identity, self.tail_lines);
                RawSession {
                    identity: listing.identity,
                    label: listing.label,
                    raw_tail,
                }
            })
            .collect();

        let captured_at = Utc::now();
        let outcome = self.registry.merge(polled, &self.summaries, captured_at);
        self.sequence += 1;
        debug!(
            sequence = self.sequence,
            sessions = outcome.records.len(),
            notifications = outcome.notifications.len(),
            "Poll cycle complete"
        );

        Ok(Snapshot {
            sequence: self.sequence,
            captured_at,
            reorders_applied: self.reorders_applied,
            records: outcome.records,
            notifications: outcome.notifications,
        })
    }

    /// Drains commands, runs a cycle and publishes it. Returns `false` once
    /// either side of the exchange has shut down.
    pub fn run_cycle(&mut self, commands: &Receiver<WorkerCommand>, snapshots: &SnapshotSender) -> bool {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !self.apply_command(command) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        match self.poll_once() {
            Ok(snapshot) => {
                if !snapshots.send(snapshot) {
                    info!("Snapshot consumer closed");
                    return false;
                }
            }
            Err(err) => {
                warn!(error = %err, "Poll cycle failed; keeping previous state");
            }
        }
        true
    }

    /// Runs cycles until shut down. Commands cut the wait short.
    pub fn run(mut self, commands: Receiver<WorkerCommand>, snapshots: SnapshotSender) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            tail_lines = self.tail_lines,
            external_summarizer = self.summaries.has_external(),
            "Poller started"
        );

        loop {
            let started = Instant::now();
            if !self.run_cycle(&commands, &snapshots) {
                break;
            }

            let wait = self.interval.saturating_sub(started.elapsed());
            match commands.recv_timeout(wait) {
                Ok(command) => {
                    if !self.apply_command(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(cycles = self.sequence, "Poller stopped");
    }

    pub fn spawn(
        self,
        commands: Receiver<WorkerCommand>,
        snapshots: SnapshotSender,
    ) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(POLLER_THREAD_NAME.to_string())
            .spawn(move || self.run(commands, snapshots))
    }
}
