//! Terminal display module - line tree, repaint accounting, render engine,
//! and input mode control.

mod engine;
mod error;
mod input_mode;
mod line;
pub mod repaint;

// Re-export public types from submodules
pub use engine::{terminal_width, EngineOptions, RenderEngine};
pub use error::RenderError;
pub use input_mode::{restore_input_mode, InputModeGuard};
pub use line::LineHandle;
pub use repaint::Repaint;
