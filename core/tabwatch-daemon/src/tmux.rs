//! tmux-backed session source. Each pane is one session: the container is
//! `session:window` and the slot is the pane index, so an identity prints as
//! a valid tmux target (`work:1.0`).

use std::time::Duration;

use tabwatch_core::{
    is_tracked_label, MonitorError, Result, SessionIdentity, SessionListing, SessionSource,
};
use tracing::{debug, warn};

use crate::command::run_with_timeout;

const TMUX: &str = "tmux";
const PANE_FORMAT: &str =
    "#{session_name}:#{window_index}\t#{pane_index}\t#{pane_current_command}\t#{window_name}\t#{pane_title}";

pub struct TmuxSource {
    keywords: Vec<String>,
    timeout: Duration,
}

impl TmuxSource {
    pub fn new(keywords: Vec<String>, timeout: Duration) -> Self {
        Self { keywords, timeout }
    }

    fn tmux<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        run_with_timeout(TMUX, &args, None, self.timeout)
    }
}

impl SessionSource for TmuxSource {
    fn list_sessions(&self) -> Result<Vec<SessionListing>> {
        match self.tmux(["list-panes", "-a", "-F", PANE_FORMAT]) {
            Ok(output) => Ok(parse_pane_listing(&output, &self.keywords)),
            Err(MonitorError::CommandFailed { details, .. }) if is_no_server(&details) => {
                debug!("tmux server not running; no sessions");
                Ok(Vec::new())
            }
            Err(err) => Err(MonitorError::ListingFailed(err.to_string())),
        }
    }

    fn read_tail(&self, identity: &SessionIdentity, max_lines: usize) -> String {
        let target = identity.to_string();
        let start = format!("-{max_lines}");
        match self.tmux(["capture-pane", "-p", "-J", "-t", target.as_str(), "-S", start.as_str()]) {
            Ok(output) => trim_trailing_blank_lines(&output).to_string(),
            Err(err) => {
                warn!(session = %identity, error = %err, "Failed to capture pane");
                String::new()
            }
        }
    }

    fn activate(&self, identity: &SessionIdentity) -> bool {
        let window = identity.container_id.clone();
        let pane = identity.to_string();
        let result = self
            .tmux(["select-window", "-t", window.as_str()])
            .and_then(|_| self.tmux(["select-pane", "-t", pane.as_str()]));
        match result {
            Ok(_) => true,
            Err(err) => {
                warn!(session = %identity, error = %err, "Failed to activate pane");
                false
            }
        }
    }

    fn send_text(&self, identity: &SessionIdentity, text: &str) -> bool {
        let target = identity.to_string();
        let result = self
            .tmux(["send-keys", "-t", target.as_str(), "-l", text])
            .and_then(|_| self.tmux(["send-keys", "-t", target.as_str(), "Enter"]));
        match result {
            Ok(_) => true,
            Err(err) => {
                warn!(session = %identity, error = %err, "Failed to send keys");
                false
            }
        }
    }
}

fn is_no_server(details: &str) -> bool {
    details.contains("no server running") || details.contains("error connecting to")
}

/// Parses `list-panes -F PANE_FORMAT` output. Malformed lines are skipped.
pub fn parse_pane_listing<S: AsRef<str>>(output: &str, keywords: &[S]) -> Vec<SessionListing> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.splitn(5, '\t');
            let container = fields.next()?.trim();
            let pane_index = fields.next()?.trim().parse::<u32>().ok();
            let command = fields.next().unwrap_or("").trim();
            let window_name = fields.next().unwrap_or("").trim();
            let title = fields.next().unwrap_or("").trim();

            let Some(pane_index) = pane_index.filter(|_| !container.is_empty()) else {
                debug!(line, "Skipping malformed pane line");
                return None;
            };

            let label = if title.is_empty() { window_name } else { title };
            let probe = format!("{command} {window_name} {title}");
            Some(SessionListing {
                identity: SessionIdentity::new(container, pane_index),
                label: label.to_string(),
                is_tracked: is_tracked_label(&probe, keywords),
            })
        })
        .collect()
}

/// `capture-pane` pads the unused part of the screen with blank lines.
fn trim_trailing_blank_lines(output: &str) -> &str {
    let mut end = output.len();
    for line in output.split_inclusive('\n').rev() {
        if !line.trim().is_empty() {
            break;
        }
        end -= line.len();
    }
    &output[..end]
}
