// src/progress/download.rs

//! Single-line rendering of one download.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};

use crate::constants::DEFAULT_DESCRIPTION_WIDTH;
use crate::progress::widgets::{self, WidgetKind};
use crate::progress::{MessageType, ProgressBar, ProgressBarState};
use crate::tty::{Terminal, ANSI_GREEN, ANSI_RED, ANSI_RESET, ANSI_YELLOW};

/// A progress bar rendered as one line of column widgets, followed by its
/// messages. Under width pressure the line sheds widgets: first the progress
/// cells, then the speed, then the time column; whatever room is left goes to
/// the description.
#[derive(Debug, Clone)]
pub struct DownloadProgressBar {
    bar: ProgressBar,
    terminal: Terminal,
    number_widget_visible: bool,
}

impl DownloadProgressBar {
    pub fn new(download_size: i64, description: &str) -> Self {
        DownloadProgressBar {
            bar: ProgressBar::new(download_size, description),
            terminal: Terminal::detect(),
            number_widget_visible: true,
        }
    }

    /// Overrides the detected terminal facts; rendering never probes the
    /// environment afterwards.
    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = terminal;
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    pub fn number_widget_visible(&self) -> bool {
        self.number_widget_visible
    }

    pub fn set_number_widget_visible(&mut self, visible: bool) {
        self.number_widget_visible = visible;
    }

    /// Renders the bar into `out`. An unfinished bar on a non-interactive
    /// terminal renders nothing, so plain output only carries final forms.
    /// The line is not newline-terminated.
    pub fn to_stream(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.bar.update();

        if !self.bar.is_finished() && !self.terminal.interactive {
            return Ok(());
        }

        let mut layout: Vec<(WidgetKind, &str)> = vec![
            (WidgetKind::Number, ""),
            (WidgetKind::Description, " "),
            (WidgetKind::Percent, " "),
            (WidgetKind::Progress, " "),
            (WidgetKind::Speed, " | "),
            (WidgetKind::Size, " | "),
            (WidgetKind::Time, " | "),
        ];
        if !self.number_widget_visible {
            layout.retain(|(kind, _)| *kind != WidgetKind::Number);
        }

        let mut description_width = DEFAULT_DESCRIPTION_WIDTH;
        let terminal_width = self.terminal.width;

        // shed widgets until the line fits
        if self.line_width(&layout, description_width) > terminal_width {
            layout.retain(|(kind, _)| *kind != WidgetKind::Progress);
        }
        if self.line_width(&layout, description_width) > terminal_width {
            layout.retain(|(kind, _)| *kind != WidgetKind::Speed);
        }
        if self.line_width(&layout, description_width) > terminal_width {
            layout.retain(|(kind, _)| *kind != WidgetKind::Time);
        }

        // a bar that is no longer running has nothing to animate
        if self.bar.state() != ProgressBarState::Started {
            layout.retain(|(kind, _)| *kind != WidgetKind::Progress);
        }

        // the description is elastic: it absorbs the width difference
        let line_width = self.line_width(&layout, description_width);
        if line_width != terminal_width {
            let adjusted =
                description_width as i64 + terminal_width as i64 - line_width as i64;
            description_width = adjusted.max(0) as usize;
        }

        let color = if self.terminal.coloring {
            match self.bar.state() {
                ProgressBarState::Warning => Some(ANSI_YELLOW),
                ProgressBarState::Error => Some(ANSI_RED),
                _ => None,
            }
        } else {
            None
        };
        if let Some(color) = color {
            out.write_all(color.as_bytes())?;
        }

        for &(kind, delimiter) in &layout {
            let total_width = delimiter.len() + self.widget_width(kind, description_width);
            let text = format!("{delimiter}{}", self.render_widget(kind, description_width));
            out.write_all(widgets::fit(&text, total_width).as_bytes())?;
        }

        if color.is_some() {
            out.write_all(ANSI_RESET.as_bytes())?;
        }

        self.write_messages(out)?;
        Ok(())
    }

    fn widget_width(&self, kind: WidgetKind, description_width: usize) -> usize {
        match kind {
            WidgetKind::Number => widgets::number_width(&self.bar),
            WidgetKind::Description => description_width,
            WidgetKind::Percent => widgets::PERCENT_WIDTH,
            WidgetKind::Progress => widgets::PROGRESS_WIDTH,
            WidgetKind::Speed => widgets::SPEED_WIDTH,
            WidgetKind::Size => widgets::SIZE_WIDTH,
            WidgetKind::Time => widgets::TIME_WIDTH,
        }
    }

    fn render_widget(&self, kind: WidgetKind, description_width: usize) -> String {
        match kind {
            WidgetKind::Number => widgets::render_number(&self.bar),
            WidgetKind::Description => {
                widgets::fit(self.bar.description(), description_width)
            }
            WidgetKind::Percent => widgets::render_percent(&self.bar),
            WidgetKind::Progress => widgets::render_progress(&self.bar),
            WidgetKind::Speed => widgets::render_speed(&self.bar),
            WidgetKind::Size => widgets::render_size(&self.bar),
            WidgetKind::Time => widgets::render_time(&self.bar),
        }
    }

    fn line_width(&self, layout: &[(WidgetKind, &str)], description_width: usize) -> usize {
        layout
            .iter()
            .map(|&(kind, delimiter)| delimiter.len() + self.widget_width(kind, description_width))
            .sum()
    }

    /// Messages go below the bar, `>>> ` prefixed and padded to the full
    /// terminal width so an in-place redraw fully overwrites older text.
    fn write_messages(&self, out: &mut dyn Write) -> io::Result<()> {
        const PREFIX: &str = ">>> ";
        let terminal_width = self.terminal.width;
        for (message_type, message) in self.bar.messages() {
            out.write_all(b"\n")?;
            out.write_all(widgets::fit(PREFIX, terminal_width.min(PREFIX.len())).as_bytes())?;
            if PREFIX.len() >= terminal_width {
                continue;
            }
            let color = if self.terminal.coloring {
                match message_type {
                    MessageType::Info => None,
                    MessageType::Success => Some(ANSI_GREEN),
                    MessageType::Warning => Some(ANSI_YELLOW),
                    MessageType::Error => Some(ANSI_RED),
                }
            } else {
                None
            };
            if let Some(color) = color {
                out.write_all(color.as_bytes())?;
            }
            let space_available = terminal_width - PREFIX.len();
            out.write_all(widgets::fit(message, space_available).as_bytes())?;
            if color.is_some() {
                out.write_all(ANSI_RESET.as_bytes())?;
            }
        }
        Ok(())
    }
}

impl Deref for DownloadProgressBar {
    type Target = ProgressBar;

    fn deref(&self) -> &ProgressBar {
        &self.bar
    }
}

impl DerefMut for DownloadProgressBar {
    fn deref_mut(&mut self) -> &mut ProgressBar {
        &mut self.bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(bar: &mut DownloadProgressBar) -> String {
        let mut buf = Vec::new();
        bar.to_stream(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn running_bar_drops_progress_widget_at_seventy_columns() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::interactive(70));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);

        let line = render(&mut bar);
        assert!(line.starts_with("[0/0] test"));
        assert!(line.contains(" 40% | "));
        assert!(line.contains(" |   4.0   B | "));
        assert!(!line.contains('='));
        assert_eq!(line.len(), 70);
    }

    #[test]
    fn finished_bar_renders_at_hundred_percent() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::interactive(70));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);
        bar.set_ticks(10);
        bar.set_state(ProgressBarState::Success);

        let line = render(&mut bar);
        assert!(line.contains("100% | "));
        assert!(line.contains(" |  10.0   B | "));
        assert_eq!(line.len(), 70);
    }

    #[test]
    fn wide_terminal_keeps_progress_widget() {
        let mut bar = DownloadProgressBar::new(100, "pkg");
        bar.set_terminal(Terminal::interactive(120));
        bar.set_auto_finish(false);
        bar.start();
        bar.set_ticks(50);

        let line = render(&mut bar);
        assert!(line.contains("[==========          ]"));
        assert_eq!(line.len(), 120);
    }

    #[test]
    fn narrow_terminal_sheds_speed_and_time() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::interactive(40));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);

        let line = render(&mut bar);
        assert!(!line.contains("/s"));
        assert!(!line.contains('='));
        assert_eq!(line.len(), 40);
    }

    #[test]
    fn halfway_download_shows_percent_and_size() {
        let mut bar = DownloadProgressBar::new(1000, "pkg");
        bar.set_terminal(Terminal::interactive(80));
        bar.set_auto_finish(false);
        bar.start();
        bar.set_ticks(500);

        let line = render(&mut bar);
        assert!(line.contains(" 50%"));
        assert!(line.contains("500.0   B"));
        assert_eq!(line.len(), 80);
    }

    #[test]
    fn tiny_terminal_still_prints_the_minimal_set() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::interactive(20));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);

        let line = render(&mut bar);
        assert!(line.starts_with("[0/0]"));
        assert!(line.contains("40%"));
        assert!(line.contains('B'));
    }

    #[test]
    fn non_interactive_hides_running_bar() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::plain(70));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);
        assert_eq!(render(&mut bar), "");

        bar.set_ticks(10);
        bar.set_state(ProgressBarState::Success);
        let line = render(&mut bar);
        assert!(line.contains("100%"));
    }

    #[test]
    fn messages_are_padded_to_terminal_width() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal::interactive(70));
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Started);
        bar.add_message(MessageType::Info, "test message1");
        bar.add_message(MessageType::Info, "test message2");

        let text = render(&mut bar);
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(">>> test message1"));
        assert_eq!(lines[1].len(), 70);
        assert!(lines[2].starts_with(">>> test message2"));
    }

    #[test]
    fn failed_bar_is_colored_when_coloring_is_on() {
        let mut bar = DownloadProgressBar::new(10, "test");
        bar.set_terminal(Terminal {
            width: 70,
            interactive: true,
            coloring: true,
        });
        bar.set_ticks(4);
        bar.set_state(ProgressBarState::Error);

        let line = render(&mut bar);
        assert!(line.starts_with(ANSI_RED));
        assert!(line.ends_with(ANSI_RESET));
    }

    #[test]
    fn hidden_number_widget_gives_room_to_description() {
        let mut bar = DownloadProgressBar::new(10, "some-long-package-name");
        bar.set_terminal(Terminal::interactive(70));
        bar.set_number_widget_visible(false);
        bar.set_ticks(10);
        bar.set_state(ProgressBarState::Success);

        let line = render(&mut bar);
        assert!(line.starts_with("some-long-package-name"));
        assert_eq!(line.len(), 70);
    }
}
