//! Multi-line render engine.
//!
//! The engine owns one root line per row and a single consumer thread. Line
//! handles on any thread format their row and post it to an unbounded
//! channel; the consumer thread is the only writer to the output stream and
//! repaints the whole block for every update it receives.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::error::RenderError;
use super::input_mode::{install_panic_hook, InputModeGuard};
use super::line::{LineHandle, LineTree, RowSink};
use super::repaint::{with_label, Repaint};

/// Construction options for [`RenderEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Put stdin in no-echo, unbuffered mode while the engine runs
    pub disable_input: bool,
    /// Tag prefixed in blue brackets to every row
    pub label: Option<String>,
    /// Terminal width override; sampled from the terminal when `None`
    pub width: Option<usize>,
}

enum Message {
    Row { row: usize, text: String },
    Shutdown,
}

struct Shared {
    sender: Sender<Message>,
    enabled: Arc<AtomicBool>,
    terminated: AtomicBool,
}

impl RowSink for Shared {
    fn submit(&self, row: usize, text: String) {
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }
        if self.terminated.load(Ordering::SeqCst) {
            log::trace!("dropping update for row {} after terminate", row);
            return;
        }
        // The receiver only goes away once the consumer has exited
        let _ = self.sender.send(Message::Row { row, text });
    }
}

/// Renders N independently updated rows as one block on a terminal stream.
pub struct RenderEngine {
    rows: usize,
    width: usize,
    tree: Arc<LineTree>,
    shared: Arc<Shared>,
    consumer: Option<JoinHandle<io::Result<()>>>,
    input_guard: Option<InputModeGuard>,
}

impl RenderEngine {
    /// Create an engine with `rows` rows writing to `output`, and start its
    /// render thread.
    ///
    /// Failing to read the terminal width or to lock input is not an error:
    /// width falls back to 0 (no wrap accounting) and input stays as it was.
    pub fn new<W>(rows: usize, output: W, options: EngineOptions) -> Self
    where
        W: Write + Send + 'static,
    {
        let width = options.width.unwrap_or_else(terminal_width);
        install_panic_hook();

        let input_guard = if options.disable_input {
            match InputModeGuard::enter() {
                Ok(guard) => Some(guard),
                Err(e) => {
                    log::debug!("could not disable terminal input: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let (sender, receiver) = mpsc::channel();
        let enabled = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(Shared {
            sender,
            enabled: Arc::clone(&enabled),
            terminated: AtomicBool::new(false),
        });

        let sink: Arc<dyn RowSink> = shared.clone();
        let tree = LineTree::with_roots(rows, Some(sink));

        let repaint = Repaint::new(rows, width);
        let label = options.label;
        let consumer = thread::Builder::new()
            .name("parallax-render".into())
            .spawn(move || consume(receiver, output, repaint, label, enabled))
            .ok();
        if consumer.is_none() {
            log::error!("failed to spawn render thread; display disabled");
            shared.enabled.store(false, Ordering::SeqCst);
        }

        Self {
            rows,
            width,
            tree,
            shared,
            consumer,
            input_guard,
        }
    }

    /// Engine writing to stdout with the given options.
    pub fn stdout(rows: usize, options: EngineOptions) -> Self {
        Self::new(rows, io::stdout(), options)
    }

    /// Root line handle for `index`.
    ///
    /// # Panics
    /// Panics if `index` is not below the engine's row count.
    pub fn printer(&self, index: usize) -> LineHandle {
        assert!(
            index < self.rows,
            "row {} is out of range (engine has {} rows)",
            index,
            self.rows
        );
        LineHandle::new(Arc::clone(&self.tree), index)
    }

    /// Root line handle for `index`, or an error if it is out of range.
    pub fn try_printer(&self, index: usize) -> Result<LineHandle, RenderError> {
        if index >= self.rows {
            return Err(RenderError::RowOutOfRange {
                index,
                rows: self.rows,
            });
        }
        Ok(LineHandle::new(Arc::clone(&self.tree), index))
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Terminal width used for wrap accounting (0 = disabled).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Turn repainting on or off. Prints made while disabled are accepted
    /// and discarded.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether prints are currently painted.
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Stop accepting updates. Already queued updates are still painted.
    ///
    /// Does not wait for the render thread; see [`join`](Self::join).
    pub fn terminate(&self) {
        if !self.shared.terminated.swap(true, Ordering::SeqCst) {
            let _ = self.shared.sender.send(Message::Shutdown);
        }
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::SeqCst)
    }

    /// Terminate, wait for the render thread to drain and exit, and restore
    /// terminal input.
    ///
    /// # Errors
    /// Returns the first write error the render thread hit, or
    /// [`RenderError::ThreadPanicked`].
    pub fn join(&mut self) -> Result<(), RenderError> {
        self.terminate();
        let result = match self.consumer.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(RenderError::Io(e)),
                Err(_) => Err(RenderError::ThreadPanicked),
            },
            None => Ok(()),
        };
        if let Some(mut guard) = self.input_guard.take() {
            let _ = guard.exit();
        }
        result
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            log::warn!("render engine shut down with error: {}", e);
        }
    }
}

fn consume<W: Write>(
    receiver: Receiver<Message>,
    mut output: W,
    mut repaint: Repaint,
    label: Option<String>,
    enabled: Arc<AtomicBool>,
) -> io::Result<()> {
    let mut failure: Option<io::Error> = None;

    while let Ok(message) = receiver.recv() {
        let (row, text) = match message {
            Message::Row { row, text } => (row, text),
            Message::Shutdown => break,
        };
        let text = with_label(label.as_deref(), &text);

        if failure.is_some() || !enabled.load(Ordering::SeqCst) {
            repaint.set_row(row, text);
            continue;
        }
        if let Err(e) = repaint.update(row, text, &mut output) {
            log::error!("terminal write failed, display stopped: {}", e);
            failure = Some(e);
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Column count of the controlling terminal, or 0 if it can't be read.
pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((columns, _)) => columns as usize,
        Err(e) => {
            log::debug!("terminal width unavailable: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn options(width: usize) -> EngineOptions {
        EngineOptions {
            width: Some(width),
            ..EngineOptions::default()
        }
    }

    #[test]
    fn test_printer_returns_root_handles() {
        let engine = RenderEngine::new(3, Capture::default(), options(80));
        assert_eq!(engine.printer(0).row(), Some(0));
        assert_eq!(engine.printer(2).row(), Some(2));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_printer_out_of_range_panics() {
        let engine = RenderEngine::new(2, Capture::default(), options(80));
        let _ = engine.printer(2);
    }

    #[test]
    fn test_try_printer_out_of_range() {
        let engine = RenderEngine::new(2, Capture::default(), options(80));
        assert!(matches!(
            engine.try_printer(5),
            Err(RenderError::RowOutOfRange { index: 5, rows: 2 })
        ));
    }

    #[test]
    fn test_join_drains_queue() {
        let capture = Capture::default();
        let mut engine = RenderEngine::new(1, capture.clone(), options(80));
        let line = engine.printer(0);
        for i in 0..50 {
            line.print(format!("step {}", i)).unwrap();
        }
        engine.join().unwrap();
        assert!(capture.contents().ends_with("step 49\n"));
    }

    #[test]
    fn test_label_prefixes_rows() {
        let capture = Capture::default();
        let mut engine = RenderEngine::new(
            1,
            capture.clone(),
            EngineOptions {
                label: Some("spm".into()),
                width: Some(80),
                ..EngineOptions::default()
            },
        );
        engine.printer(0).print("hi").unwrap();
        engine.join().unwrap();
        assert_eq!(capture.contents(), "\x1b[0;34m[spm]\x1b[0m hi\n");
    }

    #[test]
    fn test_disabled_engine_writes_nothing() {
        let capture = Capture::default();
        let mut engine = RenderEngine::new(1, capture.clone(), options(80));
        engine.set_enabled(false);
        assert!(!engine.is_enabled());
        engine.printer(0).print("quiet").unwrap();
        engine.join().unwrap();
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn test_prints_after_terminate_are_dropped() {
        let capture = Capture::default();
        let mut engine = RenderEngine::new(1, capture.clone(), options(80));
        let line = engine.printer(0);
        line.print("before").unwrap();
        engine.terminate();
        assert!(engine.is_terminated());
        line.print("after").unwrap();
        engine.join().unwrap();
        assert_eq!(capture.contents(), "before\n");
    }

    #[test]
    fn test_write_error_surfaces_on_join() {
        let mut engine = RenderEngine::new(1, FailingWriter, options(80));
        engine.printer(0).print("x").unwrap();
        assert!(matches!(engine.join(), Err(RenderError::Io(_))));
    }

    #[test]
    fn test_input_lock_failure_still_renders() {
        // Without a TTY on stdin the lock fails and is ignored
        let capture = Capture::default();
        let mut engine = RenderEngine::new(
            1,
            capture.clone(),
            EngineOptions {
                disable_input: true,
                width: Some(80),
                ..EngineOptions::default()
            },
        );
        engine.printer(0).print("hello").unwrap();
        engine.join().unwrap();
        assert_eq!(capture.contents(), "hello\n");
    }

    #[test]
    fn test_join_twice_is_ok() {
        let mut engine = RenderEngine::new(1, Capture::default(), options(80));
        engine.join().unwrap();
        engine.join().unwrap();
    }
}
