//! Per-unit status lines: pending spinner text and final outcome text.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::terminal::{LineHandle, RenderError};

const GREEN: &str = "\x1b[0;32m";
const RED: &str = "\x1b[0;31m";
const RESET: &str = "\x1b[0m";

/// Result of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Completed, with an optional note
    Success(Option<String>),
    /// Failed, with an optional reason
    Fail(Option<String>),
    /// Nothing needed doing
    Ignorable,
}

impl Outcome {
    pub fn success() -> Self {
        Outcome::Success(None)
    }

    pub fn success_with(reason: impl Into<String>) -> Self {
        Outcome::Success(Some(reason.into()))
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Outcome::Fail(Some(reason.into()))
    }

    pub fn ignorable() -> Self {
        Outcome::Ignorable
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    /// `": reason"` when a reason is present, else empty.
    pub fn reason_suffix(&self) -> String {
        match self {
            Outcome::Success(Some(reason)) | Outcome::Fail(Some(reason)) => {
                format!(": {}", reason)
            }
            _ => String::new(),
        }
    }
}

/// Wording for one kind of work, e.g. `Pull` / `Pulling`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Noun form used in outcome lines ("Pull")
    pub title: String,
    /// Progressive form used while running ("Pulling")
    pub progressive: String,
}

impl Activity {
    pub fn new(title: impl Into<String>, progressive: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            progressive: progressive.into(),
        }
    }

    /// Spinner line shown while the unit runs.
    pub fn pending_line(&self, glyph: char, name: &str) -> String {
        format!("{} {}: {}...", glyph, self.progressive, name)
    }

    /// Final line for `outcome`.
    pub fn outcome_line(&self, name: &str, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Success(_) => format!(
                "{}{}✓{} {}: {}{}",
                RESET,
                GREEN,
                RESET,
                self.title,
                name,
                outcome.reason_suffix()
            ),
            Outcome::Fail(_) => format!(
                "{}✗{} {} failed: {}{}",
                RED,
                RESET,
                self.title,
                name,
                outcome.reason_suffix()
            ),
            Outcome::Ignorable => {
                format!("Nothing to {}: {}", self.title.to_lowercase(), name)
            }
        }
    }
}

#[derive(Debug, Default)]
struct UnitState {
    outcome: Option<Outcome>,
}

/// One unit of work bound to a display line.
///
/// Spinner frames and the final outcome are printed under the same lock, so
/// once [`finish`](Self::finish) has printed, no later spinner frame can
/// replace it.
#[derive(Debug)]
pub struct StatusUnit {
    name: String,
    activity: Activity,
    line: LineHandle,
    state: Mutex<UnitState>,
}

impl StatusUnit {
    pub fn new(name: impl Into<String>, activity: Activity, line: LineHandle) -> Self {
        Self {
            name: name.into(),
            activity,
            line,
            state: Mutex::new(UnitState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit's root display line.
    pub fn line(&self) -> &LineHandle {
        &self.line
    }

    pub fn is_finished(&self) -> bool {
        self.state().outcome.is_some()
    }

    /// Outcome recorded by [`finish`](Self::finish), if any.
    pub fn outcome(&self) -> Option<Outcome> {
        self.state().outcome.clone()
    }

    /// Show a spinner frame unless the unit has already finished.
    pub fn tick(&self, glyph: char) -> Result<(), RenderError> {
        let state = self.state();
        if state.outcome.is_some() {
            return Ok(());
        }
        self.line.print(self.activity.pending_line(glyph, &self.name))
    }

    /// Mark the unit finished and show its outcome line.
    pub fn finish(&self, outcome: Outcome) -> Result<(), RenderError> {
        let mut state = self.state();
        let line = self.activity.outcome_line(&self.name, &outcome);
        state.outcome = Some(outcome);
        self.line.print(line)
    }

    fn state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
