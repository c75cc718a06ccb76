//! Terminal logging for the `tola-render` binary.
//!
//! - `log!("module"; ...)` prints a colored `[module]` prefix, fitting the
//!   message to the terminal width
//! - `Progress` redraws a `[module] 3/10 pages/home` counter in place
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//!
//! if let Some(progress) = Progress::new("build", pages.len()) {
//!     progress.step("pages/home");
//! }
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::{
        OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

static TERMINAL_WIDTH: OnceLock<usize> = OnceLock::new();

/// Set while a progress line is on screen without a trailing newline.
static PROGRESS_LINE: AtomicBool = AtomicBool::new(false);

fn terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| size().map_or(120, |(w, _)| w as usize))
}

/// Columns taken by `[module] `.
const fn prefix_width(module: &str) -> usize {
    module.len() + 3
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Long single-line messages are truncated to the terminal width.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();

    // a message replaces an unfinished progress line
    if PROGRESS_LINE.swap(false, Ordering::SeqCst) {
        write!(stdout, "\r").ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
    }

    if message.contains('\n') {
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let room = terminal_width().saturating_sub(prefix_width(module));
        writeln!(stdout, "{prefix} {}", truncate_str(message, room)).ok();
    }
    stdout.flush().ok();
}

/// `[module]`, colored by module.
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => prefix.bright_blue().bold(),
        "reload" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Progress
// ============================================================================

/// In-place `done/total` counter for batch work.
pub struct Progress {
    module: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl Progress {
    /// `None` for a single item or less; the summary log is enough then.
    pub fn new(module: &'static str, total: usize) -> Option<Self> {
        (total > 1).then(|| Self {
            module,
            total,
            done: AtomicUsize::new(0),
        })
    }

    /// Count one finished item and show its name.
    pub fn step(&self, item: &str) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let line = progress_line(done, self.total, item);
        let room = terminal_width().saturating_sub(prefix_width(self.module));

        let mut stdout = stdout().lock();
        write!(stdout, "\r").ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "{} {}", colorize_prefix(self.module), truncate_str(&line, room)).ok();
        stdout.flush().ok();
        PROGRESS_LINE.store(true, Ordering::SeqCst);
    }

    /// Erase the counter line.
    pub fn finish(&self) {
        if PROGRESS_LINE.swap(false, Ordering::SeqCst) {
            let mut stdout = stdout().lock();
            write!(stdout, "\r").ok();
            execute!(stdout, Clear(ClearType::CurrentLine)).ok();
            stdout.flush().ok();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}

fn progress_line(done: usize, total: usize, item: &str) -> String {
    format!("{}/{} {item}", done.min(total), total)
}

// ============================================================================
// Tests
// ============================================================================
