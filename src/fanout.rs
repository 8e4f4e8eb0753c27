//! Runs one command across many directories with a live status block.
//!
//! This is the end-to-end wiring of the crate: one display row per
//! directory, one scheduled task per row, and the spinner on the calling
//! thread until every row has an outcome.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::animator::{Animator, DEFAULT_TICK};
use crate::runner::{display_name, CommandSpec};
use crate::scheduler::{Scheduler, SchedulerError, DEFAULT_MAX_PARALLEL};
use crate::status::{Activity, Outcome, StatusUnit};
use crate::terminal::{EngineOptions, RenderEngine, RenderError};

/// Errors from a fan-out run.
#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Knobs for [`fan_out`].
#[derive(Debug, Clone)]
pub struct FanOutSettings {
    pub parallel: usize,
    pub activity: Activity,
    pub label: Option<String>,
    pub disable_input: bool,
    pub tick: Duration,
    /// Show each command's latest output line beneath its row
    pub show_output: bool,
    /// Paint the live display; off for non-terminal output
    pub display: bool,
    /// Terminal width override
    pub width: Option<usize>,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_MAX_PARALLEL,
            activity: Activity::new("Run", "Running"),
            label: None,
            disable_input: false,
            tick: DEFAULT_TICK,
            show_output: false,
            display: true,
            width: None,
        }
    }
}

/// Outcome for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirOutcome {
    pub name: String,
    pub dir: PathBuf,
    pub outcome: Outcome,
}

/// Finishes the unit as failed if the task unwinds before reporting.
struct FinishGuard(Arc<StatusUnit>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            let _ = self.0.finish(Outcome::fail("task panicked"));
        }
    }
}

/// Run `spec` in every directory of `dirs`, painting progress to `output`.
///
/// Returns one outcome per directory, in input order.
///
/// # Errors
/// Fails if the display could not be driven or the scheduler reported a
/// panicked task. Command failures are outcomes, not errors.
pub fn fan_out<W>(
    dirs: Vec<PathBuf>,
    spec: CommandSpec,
    settings: FanOutSettings,
    output: W,
) -> Result<Vec<DirOutcome>, FanOutError>
where
    W: Write + Send + 'static,
{
    let mut engine = RenderEngine::new(
        dirs.len(),
        output,
        EngineOptions {
            disable_input: settings.disable_input,
            label: settings.label.clone(),
            width: settings.width,
        },
    );
    engine.set_enabled(settings.display);

    let units: Vec<Arc<StatusUnit>> = dirs
        .iter()
        .enumerate()
        .map(|(row, dir)| {
            Arc::new(StatusUnit::new(
                display_name(dir),
                settings.activity.clone(),
                engine.printer(row),
            ))
        })
        .collect();

    let scheduler = Scheduler::new(settings.parallel);
    let spec = Arc::new(spec);
    for (unit, dir) in units.iter().zip(dirs.iter().cloned()) {
        let guard = FinishGuard(Arc::clone(unit));
        let spec = Arc::clone(&spec);
        let detail = settings.show_output.then(|| unit.line().subprinter());

        scheduler.submit(move || {
            let guard = guard;
            let outcome = spec
                .run(&dir, detail.as_ref())
                .unwrap_or_else(|e| Outcome::fail(e.to_string()));
            if outcome.is_fail() {
                log::warn!("{} failed in {}", spec.program, dir.display());
            }
            if let Err(e) = guard.0.finish(outcome) {
                log::warn!("could not show outcome for {}: {}", dir.display(), e);
            }
        })?;
    }

    let animated = Animator::new(settings.tick).run(&units);
    let joined = scheduler.join();
    engine.join()?;
    animated?;
    joined?;

    Ok(units
        .iter()
        .zip(dirs)
        .map(|(unit, dir)| DirOutcome {
            name: unit.name().to_string(),
            dir,
            outcome: unit.outcome().unwrap_or_else(|| Outcome::fail("no result")),
        })
        .collect())
}
