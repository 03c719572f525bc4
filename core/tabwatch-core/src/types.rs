//! Core types shared by the poller, the registry and every renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable key of one externally observed session: the container (a tmux
/// `session:window`, a terminal window id) plus the slot inside it.
///
/// Ordering is `(container_id, slot_index)`, which is also the tie-breaker for
/// records that share a display order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub container_id: String,
    pub slot_index: u32,
}

impl SessionIdentity {
    pub fn new(container_id: impl Into<String>, slot_index: u32) -> Self {
        Self {
            container_id: container_id.into(),
            slot_index,
        }
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container_id, self.slot_index)
    }
}

impl FromStr for SessionIdentity {
    type Err = MonitorError;

    /// Parses `container.slot`, splitting on the last `.` so container ids
    /// may contain dots themselves.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (container, slot) = value
            .trim()
            .rsplit_once('.')
            .ok_or_else(|| MonitorError::InvalidTarget(value.to_string()))?;
        if container.is_empty() {
            return Err(MonitorError::InvalidTarget(value.to_string()));
        }
        let slot_index = slot
            .parse::<u32>()
            .map_err(|_| MonitorError::InvalidTarget(value.to_string()))?;
        Ok(Self::new(container, slot_index))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Activity State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityState {
    Active,
    Waiting,
    Idle,
    /// Reserved for the ingestion layer; the classifier never produces it.
    Error,
}

impl ActivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Active => "active",
            ActivityState::Waiting => "waiting",
            ActivityState::Idle => "idle",
            ActivityState::Error => "error",
        }
    }

    /// States whose arrival is worth a summary and an announcement.
    pub fn is_attention_state(&self) -> bool {
        matches!(self, ActivityState::Idle | ActivityState::Waiting)
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last task-list progress marker seen in a session (`3/5 completed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} completed", self.completed, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Poll Inputs
// ═══════════════════════════════════════════════════════════════════════════════

/// One entry of a session listing, before any content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListing {
    pub identity: SessionIdentity,
    pub label: String,
    pub is_tracked: bool,
}

/// A tracked session as captured by one poll: listing fields plus its tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSession {
    pub identity: SessionIdentity,
    pub label: String,
    pub raw_tail: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry Records
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry-owned state for one session. Callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub identity: SessionIdentity,
    pub label: String,
    pub is_tracked: bool,
    #[serde(skip_serializing, default)]
    pub raw_output_tail: String,
    #[serde(skip_serializing, default)]
    pub previous_output_tail: String,
    pub state: ActivityState,
    pub idle_confirm_count: u32,
    pub option_count: usize,
    pub progress: Option<Progress>,
    pub summary: String,
    pub last_trigger_signature: String,
    pub display_order: u32,
    pub last_updated: DateTime<Utc>,
}

impl SessionRecord {
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.label, self.identity)
    }
}

/// Emitted when a session settles into a state the user should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub identity: SessionIdentity,
    pub label: String,
    pub from: ActivityState,
    pub to: ActivityState,
    pub summary: String,
}

/// Everything one poll cycle hands to the consumer side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    /// Reorder commands the worker had applied when this was captured.
    pub reorders_applied: u64,
    pub records: Vec<SessionRecord>,
    pub notifications: Vec<Notification>,
}
