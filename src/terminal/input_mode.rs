//! Keyboard input suppression while the display is live.
//!
//! Keystrokes echoed into the terminal would shift the cursor and break the
//! erase accounting, so the engine switches stdin to non-canonical, no-echo
//! mode. The original mode is restored on drop, on panic, and on demand via
//! [`restore_input_mode`] (used by the Ctrl+C handler).

use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Set while stdin is in cbreak/no-echo mode.
pub(crate) static INPUT_LOCKED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
static SAVED_MODE: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(not(unix))]
static SAVED_MODE: Mutex<Option<()>> = Mutex::new(None);

/// Guard that restores the terminal input mode on drop.
#[derive(Debug)]
pub struct InputModeGuard {
    active: bool,
}

impl InputModeGuard {
    /// Disable echo and line buffering on stdin.
    ///
    /// # Errors
    /// Returns an error if stdin is not a terminal or the mode can't be set.
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();
        enter_cbreak()?;
        INPUT_LOCKED.store(true, Ordering::SeqCst);
        Ok(Self { active: true })
    }

    /// Restore the original mode now; drop becomes a no-op.
    pub fn exit(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            restore()?;
        }
        Ok(())
    }
}

impl Drop for InputModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = restore();
        }
    }
}

/// Restore the saved input mode if one is active.
///
/// Safe to call from any thread and more than once.
pub fn restore_input_mode() {
    if INPUT_LOCKED.load(Ordering::SeqCst) {
        let _ = restore();
    }
}

#[cfg(unix)]
fn enter_cbreak() -> io::Result<()> {
    let fd = libc::STDIN_FILENO;
    let mut mode: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut mode) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let original = mode;
    mode.c_lflag &= !(libc::ICANON | libc::ECHO);
    mode.c_cc[libc::VMIN] = 1;
    mode.c_cc[libc::VTIME] = 0;
    if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &mode) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut saved = SAVED_MODE.lock().unwrap_or_else(PoisonError::into_inner);
    if saved.is_none() {
        *saved = Some(original);
    }
    Ok(())
}

#[cfg(unix)]
fn restore() -> io::Result<()> {
    let saved = SAVED_MODE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    INPUT_LOCKED.store(false, Ordering::SeqCst);
    if let Some(mode) = saved {
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &mode) } != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn enter_cbreak() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "input mode control is only available on unix",
    ))
}

#[cfg(not(unix))]
fn restore() -> io::Result<()> {
    SAVED_MODE.lock().unwrap_or_else(PoisonError::into_inner).take();
    INPUT_LOCKED.store(false, Ordering::SeqCst);
    Ok(())
}

/// Panics inside scheduled work items are caught and logged by the
/// scheduler; the display keeps running, so input stays locked.
fn panic_escapes() -> bool {
    !crate::scheduler::in_task()
}

/// Install a panic hook that restores input mode before the panic message.
///
/// Panics the scheduler will catch are left to its `log::error!` report and
/// write nothing to stderr, which would tear the live block.
pub(crate) fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if !panic_escapes() {
            return;
        }
        restore_input_mode();
        original_hook(panic_info);
    }));
}
