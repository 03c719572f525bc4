//! # tabwatch-core
//!
//! Session monitoring engine for terminal tabs running an interactive coding
//! agent: polls sessions, classifies what each one is doing, decides when a
//! change deserves a summary, and keeps a stable, reorderable list for a
//! display layer.
//!
//! ## Design Principles
//!
//! - **Synchronous**: Plain threads and `std::sync::mpsc`; no async runtime.
//! - **Single owner**: The polling worker owns the registry. Everyone else gets clones.
//! - **Graceful degradation**: A session that cannot be read keeps its last record;
//!   a failed summarizer falls back to a local summary.
//! - **Conservative triggers**: Summaries and announcements only fire when the
//!   bounded end of the output changed and the session settled.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabwatch_core::*;
//!
//! let config = load_config(None)?;
//! let source: Arc<dyn SessionSource> = Arc::new(my_source);
//! let (commands_tx, commands_rx) = command_channel();
//! let (snapshots_tx, snapshots_rx) = snapshot_channel();
//!
//! let poller = Poller::new(Arc::clone(&source), SummaryEngine::heuristic_only(200), &config);
//! let worker = poller.spawn(commands_rx, snapshots_tx)?;
//!
//! let mut adapter = RenderAdapter::new(my_renderer, snapshots_rx, commands_tx, source);
//! loop {
//!     adapter.tick();
//!     std::thread::sleep(config.tick_interval());
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod patterns;
pub mod registry;
pub mod render;
pub mod shaping;
pub mod source;
pub mod summary;
pub mod trigger;
pub mod types;

pub use classifier::{classify, Classification, PriorClassification};
pub use config::{default_config_path, default_log_dir, load_config, MonitorConfig};
pub use dispatch::{command_channel, snapshot_channel, SnapshotReceiver, SnapshotSender, WorkerCommand};
pub use error::{MonitorError, Result};
pub use orchestrator::{Poller, POLLER_THREAD_NAME};
pub use registry::{MergeOutcome, Registry, RegistryPolicy};
pub use render::{RenderAdapter, RenderDiff, Renderer, TickReport};
pub use source::{is_tracked_label, SessionSource, DEFAULT_TRACKED_KEYWORDS};
pub use summary::{heuristic_summary, Summarizer, SummaryEngine};
pub use trigger::{TriggerDecision, TriggerOutcome};
pub use types::*;
