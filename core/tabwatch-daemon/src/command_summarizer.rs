//! Summarizer that shells out to a configured command, such as an agent CLI
//! in print mode. The shaped tail goes to stdin and the summary comes back on
//! stdout. `{max_length}` in any argument is replaced with the length limit.

use std::time::Duration;

use tabwatch_core::{MonitorError, Result, Summarizer};

use crate::command::run_with_timeout;

const MAX_LENGTH_PLACEHOLDER: &str = "{max_length}";

#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSummarizer {
    /// `None` when `command` is empty.
    pub fn from_command(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

impl Summarizer for CommandSummarizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn summarize(&self, text: &str, max_length: usize) -> Result<String> {
        let limit = max_length.to_string();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(MAX_LENGTH_PLACEHOLDER, &limit))
            .collect();

        let output = run_with_timeout(&self.program, &args, Some(text), self.timeout)
            .map_err(|err| MonitorError::SummarizerFailed(err.to_string()))?;
        let summary = output.trim();
        if summary.is_empty() {
            return Err(MonitorError::EmptySummary);
        }
        Ok(summary.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn summarizer(script: &str) -> CommandSummarizer {
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        CommandSummarizer::from_command(&command, Duration::from_secs(5)).expect("summarizer")
    }

    #[test]
    fn empty_command_yields_no_summarizer() {
        assert!(CommandSummarizer::from_command(&[], Duration::from_secs(1)).is_none());
    }

    #[test]
    fn output_is_trimmed_and_placeholder_expanded() {
        let summary = summarizer("head -c 5; echo ' (max {max_length})'")
            .summarize("Tests passed and more", 120)
            .expect("summary");
        assert_eq!(summary, "Tests (max 120)");
    }

    #[test]
    fn blank_output_is_an_error() {
        let err = summarizer("cat >/dev/null; echo '   '")
            .summarize("anything", 200)
            .expect_err("empty");
        assert!(matches!(err, MonitorError::EmptySummary));
    }

    #[test]
    fn command_failure_maps_to_summarizer_error() {
        let err = summarizer("exit 2").summarize("anything", 200).expect_err("failure");
        assert!(matches!(err, MonitorError::SummarizerFailed(_)));
    }
}
