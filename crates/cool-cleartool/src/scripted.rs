//! A [`CommandRunner`] that answers from a script instead of a process.
//!
//! Responses are keyed by the command line with arguments joined by single
//! spaces. Unscripted commands fail the way cleartool does for an unknown
//! object, so tests only have to script the calls they care about. Every
//! call is recorded in order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::commands::{CommandError, CommandOutput, CommandRunner, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    TimeOut,
}

/// Canned-response command runner.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `command` with the given stdout lines and exit code 0.
    ///
    /// Replaces any earlier response for the same command.
    pub fn respond<I, S>(&self, command: &str, lines: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(command, Scripted::Output(CommandOutput::from_lines(lines)))
    }

    /// Answers `command` with the given stderr and exit code 1.
    pub fn fail(&self, command: &str, stderr: &str) -> &Self {
        self.set(
            command,
            Scripted::Output(CommandOutput {
                stdout_lines: Vec::new(),
                stderr: stderr.to_owned(),
                exit_code: Some(1),
            }),
        )
    }

    /// Makes `command` time out.
    pub fn time_out(&self, command: &str) -> &Self {
        self.set(command, Scripted::TimeOut)
    }

    /// Every command invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times `command` was invoked.
    pub fn call_count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == command).count()
    }

    /// Forgets recorded calls, keeping the script.
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn set(&self, command: &str, response: Scripted) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(command.to_owned(), response);
        }
        self
    }
}

impl CommandRunner for ScriptedRunner {
    fn invoke(&self, args: &[&str], _cwd: Option<&Path>) -> Result<CommandOutput> {
        let command = args.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(&command).cloned());

        match response {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::TimeOut) => Err(CommandError::TimedOut {
                command,
                timeout: Duration::ZERO,
            }),
            None => Ok(CommandOutput {
                stdout_lines: Vec::new(),
                stderr: format!("cleartool: Error: Unable to determine object for \"{command}\"."),
                exit_code: Some(1),
            }),
        }
    }
}
