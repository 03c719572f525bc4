//! Bounded external command execution shared by the tmux adapter and the
//! command summarizer.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tabwatch_core::{MonitorError, Result};

const WAIT_STEP: Duration = Duration::from_millis(10);

/// Runs `program` with `args`, optionally feeding `input` on stdin, and
/// returns stdout. The child is killed once `timeout` elapses.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    input: Option<&str>,
    timeout: Duration,
) -> Result<String> {
    let label = command_label(program, args);
    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| MonitorError::CommandFailed {
            command: label.clone(),
            details: err.to_string(),
        })?;

    let writer = match (input, child.stdin.take()) {
        (Some(text), Some(mut stdin)) => {
            let text = text.to_string();
            Some(thread::spawn(move || {
                // Closing stdin on drop signals end of input.
                let _ = stdin.write_all(text.as_bytes());
            }))
        }
        _ => None,
    };
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MonitorError::CommandTimedOut {
                    command: label,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(None) => thread::sleep(WAIT_STEP),
            Err(err) => {
                let _ = child.kill();
                return Err(MonitorError::CommandFailed {
                    command: label,
                    details: err.to_string(),
                });
            }
        }
    };

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let stdout = join_reader(stdout);
    let stderr = join_reader(stderr);

    if !status.success() {
        return Err(MonitorError::CommandFailed {
            command: label,
            details: format!("{status}: {}", stderr.trim()),
        });
    }
    Ok(stdout)
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn command_label(program: &str, args: &[String]) -> String {
    match args.first() {
        Some(first) => format!("{program} {first}"),
        None => program.to_string(),
    }
}
