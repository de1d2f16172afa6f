// src/tty.rs

use crate::constants::DEFAULT_TERMINAL_WIDTH;

pub const ANSI_RESET: &str = "\x1b[0m";
pub const ANSI_GREEN: &str = "\x1b[32m";
pub const ANSI_YELLOW: &str = "\x1b[33m";
pub const ANSI_RED: &str = "\x1b[31m";

/// Hides the cursor so in-place redraws don't flicker.
pub const CURSOR_HIDE: &str = "\x1b[?25l";
/// Makes the cursor visible again.
pub const CURSOR_SHOW: &str = "\x1b[?25h";

/// Facts about the output terminal that rendering decisions depend on.
///
/// Renderers take a `Terminal` value instead of probing the environment on
/// every write, so tests can pin width, interactivity and coloring without
/// touching process-global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    /// Number of columns available for a rendered line.
    pub width: usize,
    /// Whether the output is a live terminal that supports cursor movement.
    pub interactive: bool,
    /// Whether ANSI color sequences should be emitted.
    pub coloring: bool,
}

impl Terminal {
    /// Probes the real environment: column count, tty-ness of stdout and the
    /// global color decision made by `colored`.
    pub fn detect() -> Self {
        let width = match crossterm::terminal::size() {
            Ok((cols, _)) if cols > 0 => cols as usize,
            _ => DEFAULT_TERMINAL_WIDTH,
        };
        Terminal {
            width,
            interactive: atty::is(atty::Stream::Stdout),
            coloring: colored::control::SHOULD_COLORIZE.should_colorize(),
        }
    }

    /// A fixed-width, non-interactive, uncolored terminal. Handy in tests and
    /// when writing to a pipe.
    pub fn plain(width: usize) -> Self {
        Terminal {
            width,
            interactive: false,
            coloring: false,
        }
    }

    /// Like [`Terminal::plain`] but interactive, for in-place redraw paths.
    pub fn interactive(width: usize) -> Self {
        Terminal {
            width,
            interactive: true,
            coloring: false,
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Terminal::detect()
    }
}

/// ANSI sequence moving the cursor `lines` rows up.
pub fn cursor_up(lines: usize) -> String {
    format!("\x1b[{lines}A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_terminal_is_inert() {
        let term = Terminal::plain(70);
        assert_eq!(term.width, 70);
        assert!(!term.interactive);
        assert!(!term.coloring);
    }

    #[test]
    fn cursor_up_sequence() {
        assert_eq!(cursor_up(3), "\x1b[3A");
    }
}
