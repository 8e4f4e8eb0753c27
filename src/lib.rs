//! parallax library crate.
//!
//! A live multi-line terminal status display fed by concurrent workers, the
//! bounded scheduler that runs those workers, and a spinner loop tying the
//! two together.

pub mod animator;
pub mod ansi;
pub mod cli;
pub mod config;
pub mod fanout;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod terminal;

pub use animator::{Animated, Animator};
pub use scheduler::{Scheduler, SchedulerError};
pub use status::{Activity, Outcome, StatusUnit};
pub use terminal::{EngineOptions, LineHandle, RenderEngine, RenderError};
