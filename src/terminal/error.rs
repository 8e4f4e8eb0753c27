//! Render engine error types

/// Errors raised by line handles and the render engine.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A line was printed before its tree was attached to a render engine
    #[error("line handle is not attached to a render engine")]
    Detached,

    /// Requested row index is outside the engine's rows
    #[error("row {index} is out of range (engine has {rows} rows)")]
    RowOutOfRange { index: usize, rows: usize },

    /// Writing to the output stream failed
    #[error("failed to write to terminal: {0}")]
    Io(#[from] std::io::Error),

    /// The render thread panicked
    #[error("render thread panicked")]
    ThreadPanicked,
}
