//! The two one-way queues between the polling worker and the consumer.
//!
//! Snapshots flow worker → consumer; commands flow consumer → worker. Neither
//! side ever blocks on the other: the consumer drains whatever is queued on
//! its own tick, and the worker only looks at commands between cycles.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use crate::types::{Direction, SessionIdentity, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Move a session one step; applied before the next cycle, which runs
    /// immediately.
    Reorder {
        identity: SessionIdentity,
        direction: Direction,
    },
    /// Run a cycle now instead of waiting for the timer.
    ForceRefresh,
    Shutdown,
}

pub fn command_channel() -> (Sender<WorkerCommand>, Receiver<WorkerCommand>) {
    channel()
}

pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    let (tx, rx) = channel();
    (
        SnapshotSender { tx },
        SnapshotReceiver {
            rx,
            disconnected: false,
        },
    )
}

#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: Sender<Snapshot>,
}

impl SnapshotSender {
    /// Returns `false` once the consumer has gone away.
    pub fn send(&self, snapshot: Snapshot) -> bool {
        self.tx.send(snapshot).is_ok()
    }
}

#[derive(Debug)]
pub struct SnapshotReceiver {
    rx: Receiver<Snapshot>,
    disconnected: bool,
}

impl SnapshotReceiver {
    /// Everything queued right now, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        snapshots
    }

    /// True after a drain found the worker side closed.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}
