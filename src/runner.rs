//! Runs one external command in one directory and turns the result into an
//! [`Outcome`].

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crate::ansi;
use crate::status::Outcome;
use crate::terminal::LineHandle;

/// Errors that prevent a command from producing an exit status.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The program could not be found
    #[error("command not found: {0}")]
    NotFound(String),

    /// The work directory does not exist
    #[error("no such directory: {}", .0.display())]
    MissingDir(PathBuf),

    /// Failed to spawn the process
    #[error("failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    /// Failed while waiting for the process
    #[error("failed waiting for {program}: {source}")]
    WaitFailed {
        program: String,
        source: std::io::Error,
    },
}

/// A program plus arguments, run once per directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Output text meaning "nothing to do"; turns success into
    /// [`Outcome::Ignorable`]
    pub unchanged_marker: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            unchanged_marker: None,
        }
    }

    pub fn with_unchanged_marker(mut self, marker: Option<String>) -> Self {
        self.unchanged_marker = marker;
        self
    }

    /// Run in `dir`. Each non-empty output line is shown on `detail` if given.
    ///
    /// A non-zero exit is reported as [`Outcome::Fail`], not as an error.
    pub fn run(&self, dir: &Path, detail: Option<&LineHandle>) -> Result<Outcome, RunError> {
        // spawn reports a missing current_dir as NotFound too
        if !dir.is_dir() {
            return Err(RunError::MissingDir(dir.to_path_buf()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RunError::NotFound(self.program.clone())
                } else {
                    RunError::SpawnFailed {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        // Drain stderr on its own thread so a full pipe can't stall the child
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                BufReader::new(stderr)
                    .lines()
                    .map_while(Result::ok)
                    .collect::<Vec<String>>()
            })
        });

        let mut stdout_lines = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                show_detail(detail, &line);
                stdout_lines.push(line);
            }
        }

        let status = child.wait().map_err(|e| RunError::WaitFailed {
            program: self.program.clone(),
            source: e,
        })?;
        let stderr_lines = stderr_thread
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if let Some(line) = stderr_lines.iter().rev().find(|l| !l.trim().is_empty()) {
            show_detail(detail, line);
        }

        Ok(self.classify(status, &stdout_lines, &stderr_lines))
    }

    fn classify(&self, status: ExitStatus, stdout: &[String], stderr: &[String]) -> Outcome {
        if !status.success() {
            return match status.code() {
                Some(code) => Outcome::fail(format!("exited with code {}", code)),
                None => Outcome::fail("terminated by signal"),
            };
        }

        let unchanged = self.unchanged_marker.as_deref().is_some_and(|marker| {
            stdout
                .iter()
                .chain(stderr.iter())
                .any(|line| line.contains(marker))
        });
        if unchanged {
            Outcome::ignorable()
        } else {
            Outcome::success()
        }
    }
}

fn show_detail(detail: Option<&LineHandle>, line: &str) {
    let Some(detail) = detail else {
        return;
    };
    let text = ansi::strip(line);
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if let Err(e) = detail.print(format!("  {}", text)) {
        log::debug!("could not show command output: {}", e);
    }
}

/// Display name for a work directory: its last path component.
pub fn display_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
