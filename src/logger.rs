//! Logging utilities with colored output and link status display.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `LinkStatus` for single-line connection status display
//! - `ChunkProgress` for per-upload chunk counters
//!
//! # Example
//!
//! ```ignore
//! // Simple logging
//! log!("sync"; "applied {} directives", count);
//!
//! // Progress line for an upload
//! let progress = ChunkProgress::new("report.pdf", 7);
//! progress.inc();
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
#[allow(dead_code)] // Used by debug! macro
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Active progress line count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
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

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Execute code only when --verbose is enabled
///
/// Use this to avoid computing expensive debug data when not needed.
#[macro_export]
macro_rules! debug_do {
    ($($body:tt)*) => {{
        if $crate::logger::is_verbose() {
            $($body)*
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // Safe: bar count is always small
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveUp(bar_count as u16)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();

    if bar_count > 0 {
        for _ in 0..bar_count {
            writeln!(stdout).ok();
        }
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "ws" => prefix.bright_blue().bold().to_string(),
        "sync" => prefix.bright_green().bold().to_string(),
        "upload" => prefix.bright_cyan().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Link Status (single-line status with overwrite)
// ============================================================================

/// Get current time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Single-line status display for the connection lifecycle
///
/// Displays status messages that overwrite the previous output,
/// keeping the terminal clean. A connect/disconnect cycle stays
/// a single block instead of scrolling history.
///
/// # Example
///
/// ```ignore
/// let mut status = LinkStatus::new();
/// status.connected("ws://127.0.0.1:8100");
/// status.disconnected("connection reset", "type `reconnect` to retry");
/// ```
pub struct LinkStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Global link status display shared across subsystems.
///
/// The connection manager and run loop both report here so that
/// state transitions overwrite each other instead of stacking.
static LINK_STATUS: LazyLock<Mutex<LinkStatus>> = LazyLock::new(|| Mutex::new(LinkStatus::new()));

impl LinkStatus {
    /// Create a new link status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display connected message (✓ prefix, green).
    pub fn connected(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display disconnected message (✗ prefix, red) with optional detail.
    pub fn disconnected(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Display neutral info message (dimmed, no symbol).
    pub fn info(&mut self, message: &str) {
        self.display(String::new(), &format!("{}", message.dimmed()));
    }

    /// Internal display logic with line overwriting.
    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        // Clear previous output by moving cursor up and clearing
        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        // Format message with timestamp
        let timestamp = format!("[{}]", now()).dimmed().to_string();
        let line = if symbol.is_empty() {
            format!("{timestamp} {message}")
        } else {
            format!("{timestamp} {symbol} {message}")
        };

        writeln!(stdout, "{line}").ok();
        stdout.flush().ok();

        // Track actual line count (including newlines in message)
        self.last_lines = message.matches('\n').count() + 1;
    }
}

/// Global link status: connected
pub fn status_connected(message: &str) {
    LINK_STATUS.lock().connected(message);
}

/// Global link status: disconnected
pub fn status_disconnected(summary: &str, detail: &str) {
    LINK_STATUS.lock().disconnected(summary, detail);
}

/// Global link status: info
#[allow(dead_code)]
pub fn status_info(message: &str) {
    LINK_STATUS.lock().info(message);
}

// ============================================================================
// Chunk Progress (single-line upload counter)
// ============================================================================

/// Single-line progress display for one chunked upload
///
/// Displays: `[upload] report.pdf(3/7)`
///
/// Updates in place on the same line. Uses `try_lock` to avoid blocking
/// the upload loop - if display is busy, the refresh is skipped
pub struct ChunkProgress {
    name: String,
    total: u64,
    current: AtomicU64,
    lock: Mutex<()>,
}

impl ChunkProgress {
    /// Progress display for one transfer. Empty transfers emit no chunks
    /// and get no progress line.
    pub fn for_transfer(name: &str, total: u64) -> Option<Self> {
        (total > 0).then(|| Self::new(name, total))
    }

    /// Create a new upload progress display.
    pub fn new(name: &str, total: u64) -> Self {
        BAR_COUNT.store(1, Ordering::SeqCst);

        let progress = Self {
            name: name.to_string(),
            total,
            current: AtomicU64::new(0),
            lock: Mutex::new(()),
        };
        progress.display();
        progress
    }

    /// Record one emitted chunk.
    ///
    /// Non-blocking: if display lock is held, skips refresh.
    #[inline]
    pub fn inc(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
        if self.lock.try_lock().is_some() {
            self.display();
        }
    }

    /// Display the current progress line (overwrites current line).
    fn display(&self) {
        let current = self.current.load(Ordering::Relaxed);
        let line = format!("{}({}/{})", self.name, current, self.total);
        let prefix = colorize_prefix("upload", "upload");

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        write!(stdout, "{} {}", prefix, line).ok();
        stdout.flush().ok();
    }

    /// Finish progress display, preserve line and move to next line.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        {
            let _guard = self.lock.lock(); // Wait for any pending display

            let current = self.current.load(Ordering::Relaxed);
            let line = format!("{}({}/{})", self.name, current, self.total);
            let prefix = colorize_prefix("upload", "upload");

            let mut stdout = stdout().lock();
            execute!(
                stdout,
                cursor::MoveToColumn(0),
                Clear(ClearType::CurrentLine)
            )
            .ok();
            writeln!(stdout, "{} {}", prefix, line).ok();
            stdout.flush().ok();
        }

        std::mem::forget(self); // Prevent Drop from clearing
    }
}

impl Drop for ChunkProgress {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        // Clear the line on drop (upload aborted before finish)
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_status_new() {
        let status = LinkStatus::new();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_link_status_line_count_single() {
        // Single line message should count as 1
        let message = "connected: ws://127.0.0.1:8100";
        let count = message.matches('\n').count() + 1;
        assert_eq!(count, 1);
    }

    #[test]
    fn test_no_progress_line_for_empty_transfer() {
        assert!(ChunkProgress::for_transfer("empty.bin", 0).is_none());
        let progress = ChunkProgress::for_transfer("full.bin", 3).unwrap();
        progress.finish();
    }

    #[test]
    fn test_link_status_line_count_with_detail() {
        // Typical disconnect format: summary + newline + detail
        let summary = "disconnected";
        let detail = "connection reset by peer\ntype `reconnect` to retry";
        let message = format!("{summary}\n{detail}");
        let count = message.matches('\n').count() + 1;
        assert_eq!(count, 3);
    }
}
