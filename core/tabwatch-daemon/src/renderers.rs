//! Stdout renderers: a plain status table and a JSON-lines event stream.

use chrono::Local;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

use tabwatch_core::{
    ActivityState, Notification, RenderDiff, Renderer, SessionIdentity, SessionRecord,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Terminal
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_block(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{line}"))
            .and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "Failed to write to terminal");
        }
    }
}

fn state_marker(state: ActivityState) -> &'static str {
    match state {
        ActivityState::Active => "●",
        ActivityState::Waiting => "?",
        ActivityState::Idle => "○",
        ActivityState::Error => "!",
    }
}

pub fn format_row(record: &SessionRecord) -> String {
    let mut row = format!(
        "{:>2}. {} {:<7} {:<24} {}",
        record.display_order,
        state_marker(record.state),
        record.state.as_str(),
        record.display_name(),
        record.last_updated.with_timezone(&Local).format("%H:%M:%S"),
    );
    if let Some(progress) = record.progress {
        row.push_str(&format!("  [{progress}]"));
    }
    if !record.summary.is_empty() {
        row.push_str("\n      ");
        row.push_str(&record.summary);
    }
    row
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn on_ordered_snapshot(&mut self, records: &[SessionRecord], diff: &RenderDiff) {
        let mut lines = vec![format!(
            "── {} session(s) · +{} -{} ──",
            records.len(),
            diff.created.len(),
            diff.removed.len()
        )];
        if records.is_empty() {
            lines.push("   no agent sessions found".to_string());
        }
        lines.extend(records.iter().map(format_row));
        self.write_block(&lines);
    }

    fn announce(&mut self, notification: &Notification) {
        let line = format!(
            "» {} is {} (was {}): {}",
            notification.label, notification.to, notification.from, notification.summary
        );
        self.write_block(&[line]);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSON Lines
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Snapshot {
        sessions: &'a [SessionRecord],
        created: &'a [SessionIdentity],
        removed: &'a [SessionIdentity],
    },
    Notification(&'a Notification),
}

pub struct JsonLinesRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: &JsonEvent<'_>) {
        let result = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "Failed to write JSON event");
        }
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn on_ordered_snapshot(&mut self, records: &[SessionRecord], diff: &RenderDiff) {
        self.emit(&JsonEvent::Snapshot {
            sessions: records,
            created: &diff.created,
            removed: &diff.removed,
        });
    }

    fn announce(&mut self, notification: &Notification) {
        self.emit(&JsonEvent::Notification(notification));
    }
}
