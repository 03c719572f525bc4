//! tabwatch: watches coding-agent sessions running in tmux panes.
//!
//! ## Subcommands
//!
//! - `watch`: Poll continuously and print status changes (default)
//! - `once`: Run a single poll cycle and print the result
//! - `activate`: Focus a pane by target (`session:window.pane`)
//! - `send`: Type text into a pane and press Enter
//! - `choose`: Answer a numbered prompt in a pane

mod command;
mod command_summarizer;
mod logging;
mod renderers;
mod tmux;

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tabwatch_core::{
    command_channel, default_log_dir, load_config, snapshot_channel, MonitorConfig, MonitorError,
    Poller, RenderAdapter, RenderDiff, Renderer, SessionIdentity, SessionSource, Summarizer,
    SummaryEngine,
};
use tracing::{info, warn};

use command_summarizer::CommandSummarizer;
use renderers::{JsonLinesRenderer, TerminalRenderer};
use tmux::TmuxSource;

#[derive(Parser)]
#[command(name = "tabwatch")]
#[command(about = "Watch coding-agent sessions and report when they need you")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.tabwatch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the poll interval
    #[arg(long, global = true, value_name = "MS")]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and print updates
    Watch {
        /// Emit JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run one poll cycle and print it
    Once {
        #[arg(long)]
        json: bool,
    },

    /// Bring a session's pane to the front
    Activate {
        /// tmux target, e.g. work:1.0
        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Send text to a session and press Enter
    Send {
        #[arg(value_name = "TARGET")]
        target: String,

        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Answer a numbered prompt, e.g. `choose work:1.0 2`
    Choose {
        #[arg(value_name = "TARGET")]
        target: String,

        #[arg(value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        option: u32,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Failed to start poller thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Poller thread panicked")]
    WorkerPanicked,

    #[error("tmux could not {action} {target}")]
    Tmux { action: &'static str, target: String },
}

fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init(default_log_dir().ok().as_deref());

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "tabwatch failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config)?;
    if let Some(interval_ms) = cli.interval_ms {
        config.poll.interval_ms = interval_ms;
        config = config.sanitized();
    }

    let source: Arc<dyn SessionSource> = Arc::new(TmuxSource::new(
        config.sessions.tracked_keywords.clone(),
        config.collaborator_timeout(),
    ));

    match cli.command.unwrap_or(Commands::Watch { json: false }) {
        Commands::Watch { json: true } => {
            watch(JsonLinesRenderer::new(io::stdout()), source, &config)
        }
        Commands::Watch { json: false } => {
            watch(TerminalRenderer::new(io::stdout()), source, &config)
        }
        Commands::Once { json: true } => once(JsonLinesRenderer::new(io::stdout()), source, &config),
        Commands::Once { json: false } => once(TerminalRenderer::new(io::stdout()), source, &config),
        Commands::Activate { target } => {
            let identity: SessionIdentity = target.parse()?;
            if source.activate(&identity) {
                Ok(())
            } else {
                Err(CliError::Tmux {
                    action: "activate",
                    target,
                })
            }
        }
        Commands::Send { target, text } => {
            let identity: SessionIdentity = target.parse()?;
            if source.send_text(&identity, &text) {
                Ok(())
            } else {
                Err(CliError::Tmux {
                    action: "send text to",
                    target,
                })
            }
        }
        Commands::Choose { target, option } => {
            let identity: SessionIdentity = target.parse()?;
            info!(session = %identity, option, "Choosing option");
            if source.send_text(&identity, &option.to_string()) {
                Ok(())
            } else {
                Err(CliError::Tmux {
                    action: "answer the prompt in",
                    target,
                })
            }
        }
    }
}

fn summary_engine(config: &MonitorConfig) -> SummaryEngine {
    let summarizer = config
        .summary
        .command
        .as_deref()
        .and_then(|command| CommandSummarizer::from_command(command, config.collaborator_timeout()))
        .map(|summarizer| Box::new(summarizer) as Box<dyn Summarizer>);
    SummaryEngine::new(
        summarizer,
        config.summary.max_length,
        config.summary.input_chars,
    )
}

fn once<R: Renderer>(
    mut renderer: R,
    source: Arc<dyn SessionSource>,
    config: &MonitorConfig,
) -> Result<(), CliError> {
    let mut poller = Poller::new(source, summary_engine(config), config);
    let snapshot = poller.poll_once()?;
    let diff = RenderDiff {
        created: snapshot.records.iter().map(|r| r.identity.clone()).collect(),
        ..RenderDiff::default()
    };
    renderer.on_ordered_snapshot(&snapshot.records, &diff);
    Ok(())
}

fn watch<R: Renderer>(
    renderer: R,
    source: Arc<dyn SessionSource>,
    config: &MonitorConfig,
) -> Result<(), CliError> {
    let (commands_tx, commands_rx) = command_channel();
    let (snapshots_tx, snapshots_rx) = snapshot_channel();

    let poller = Poller::new(Arc::clone(&source), summary_engine(config), config);
    let worker = poller
        .spawn(commands_rx, snapshots_tx)
        .map_err(CliError::Spawn)?;
    let mut adapter = RenderAdapter::new(renderer, snapshots_rx, commands_tx, source);

    info!(
        tick_ms = config.poll.tick_ms,
        interval_ms = config.poll.interval_ms,
        "Watching sessions"
    );
    while !adapter.is_worker_gone() {
        adapter.tick();
        thread::sleep(config.tick_interval());
    }

    warn!("Poller exited; stopping");
    worker.join().map_err(|_| CliError::WorkerPanicked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_takes_a_target_and_option_number() {
        let cli = Cli::try_parse_from(["tabwatch", "choose", "work:1.0", "2"]).expect("parse");
        match cli.command {
            Some(Commands::Choose { target, option }) => {
                assert_eq!(target, "work:1.0");
                assert_eq!(option, 2);
            }
            _ => panic!("expected choose"),
        }
    }

    #[test]
    fn choose_rejects_option_zero() {
        assert!(Cli::try_parse_from(["tabwatch", "choose", "work:1.0", "0"]).is_err());
    }

    #[test]
    fn watch_is_the_default_command() {
        let cli = Cli::try_parse_from(["tabwatch", "--interval-ms", "500"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.interval_ms, Some(500));
    }
}
