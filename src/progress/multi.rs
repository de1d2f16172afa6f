// src/progress/multi.rs

//! In-place rendering of a stack of download bars.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_TOTAL_BAR_VISIBLE_LIMIT, MIN_REDRAW_INTERVAL_MS};
use crate::progress::{DownloadProgressBar, ProgressBarState};
use crate::tty::{cursor_up, Terminal, CURSOR_HIDE, CURSOR_SHOW};

/// Handle to a bar registered in a [`MultiProgressBar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarId(usize);

/// Renders several bars as one block that is redrawn in place.
///
/// Finished bars scroll away permanently; running bars and the aggregate
/// "Total" bar are rewritten on every draw by moving the cursor back up over
/// the previously printed lines. On a non-interactive terminal only finished
/// bars are printed, each exactly once.
#[derive(Debug)]
pub struct MultiProgressBar {
    bars: Vec<DownloadProgressBar>,
    todo: Vec<usize>,
    done: Vec<usize>,
    total: DownloadProgressBar,
    terminal: Terminal,
    total_bar_visible_limit: usize,
    num_of_lines_to_clear: usize,
    line_printed: bool,
    cursor_hidden: bool,
    min_redraw_interval: Duration,
    last_redraw: Option<Instant>,
}

impl Default for MultiProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiProgressBar {
    pub fn new() -> Self {
        let mut total = DownloadProgressBar::new(0, "Total");
        total.set_auto_finish(false);
        total.start();
        MultiProgressBar {
            bars: Vec::new(),
            todo: Vec::new(),
            done: Vec::new(),
            total,
            terminal: Terminal::detect(),
            total_bar_visible_limit: DEFAULT_TOTAL_BAR_VISIBLE_LIMIT,
            num_of_lines_to_clear: 0,
            line_printed: false,
            cursor_hidden: false,
            min_redraw_interval: Duration::from_millis(MIN_REDRAW_INTERVAL_MS),
            last_redraw: None,
        }
    }

    /// Overrides the detected terminal facts for this stack and every bar
    /// registered so far and later.
    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = terminal;
        self.total.set_terminal(terminal);
        for bar in &mut self.bars {
            bar.set_terminal(terminal);
        }
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    /// Hides the "Total" bar until at least `limit` bars are registered.
    pub fn set_total_bar_visible_limit(&mut self, limit: usize) {
        self.total_bar_visible_limit = limit;
    }

    pub fn set_min_redraw_interval(&mut self, interval: Duration) {
        self.min_redraw_interval = interval;
    }

    /// Registers a bar and returns its handle. A bar without a number gets
    /// the next free one; totals of all running bars are kept in sync.
    pub fn add_bar(&mut self, mut bar: DownloadProgressBar) -> BarId {
        bar.set_terminal(self.terminal);
        if bar.number() == 0 {
            let next = self
                .todo
                .iter()
                .map(|&i| self.bars[i].number())
                .max()
                .unwrap_or(0);
            bar.set_number(next + 1);
        }
        self.bars.push(bar);
        let id = self.bars.len() - 1;
        self.todo.push(id);

        let registered = self.bars.len() as i32;
        if self.total.total() < registered {
            self.total.set_total(registered);
        }
        let total = self.total.total();
        for &i in &self.todo {
            self.bars[i].set_total(total);
        }
        BarId(id)
    }

    pub fn bar(&self, id: BarId) -> &DownloadProgressBar {
        &self.bars[id.0]
    }

    pub fn bar_mut(&mut self, id: BarId) -> &mut DownloadProgressBar {
        &mut self.bars[id.0]
    }

    /// Raises the expected number of bars shown as `[num/total]`, for when
    /// the final count is known before the bars are registered.
    pub fn set_total_num_of_bars(&mut self, value: usize) {
        let value = value.max(self.bars.len()) as i32;
        if value != self.total.total() {
            self.total.set_total(value);
            for &i in &self.todo {
                self.bars[i].set_total(value);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.todo.is_empty()
    }

    /// Redraws to stderr, throttled to the minimum redraw interval. The final
    /// state (all bars finished) is never throttled away.
    pub fn print(&mut self) -> io::Result<()> {
        let all_done = self.todo.iter().all(|&i| self.bars[i].is_finished());
        if !all_done {
            if let Some(last) = self.last_redraw {
                if last.elapsed() < self.min_redraw_interval {
                    return Ok(());
                }
            }
        }
        self.last_redraw = Some(Instant::now());
        let mut err = io::stderr().lock();
        self.to_stream(&mut err)?;
        err.flush()
    }

    /// Renders the whole block into `out` in one buffered write, rewinding
    /// over the previous draw first.
    pub fn to_stream(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut text = Vec::new();
        let interactive = self.terminal.interactive;

        // keep the cursor hidden while the block is being rewritten
        if interactive
            && !self.cursor_hidden
            && self
                .todo
                .iter()
                .any(|&i| self.bars[i].state() != ProgressBarState::Ready)
        {
            text.extend_from_slice(CURSOR_HIDE.as_bytes());
            self.cursor_hidden = true;
        }

        if interactive && self.num_of_lines_to_clear > 0 {
            if self.num_of_lines_to_clear > 1 {
                text.extend_from_slice(cursor_up(self.num_of_lines_to_clear - 1).as_bytes());
            }
            text.push(b'\r');
        }
        self.num_of_lines_to_clear = 0;
        self.line_printed = false;

        // numbers of the bars still in progress, reassigned so finished bars
        // always carry the lowest ones
        let mut numbers: Vec<i32> = self
            .todo
            .iter()
            .rev()
            .map(|&i| self.bars[i].number())
            .collect();

        // finished bars print once and scroll away
        let mut i = 0;
        while i < self.todo.len() {
            let idx = self.todo[i];
            if !self.bars[idx].is_finished() {
                i += 1;
                continue;
            }
            if let Some(number) = numbers.pop() {
                self.bars[idx].set_number(number);
            }
            self.bars[idx].to_stream(&mut text)?;
            text.push(b'\n');
            self.done.push(idx);
            self.todo.remove(i);
        }

        // running bars are rewritten on every draw
        for pos in 0..self.todo.len() {
            let idx = self.todo[pos];
            if let Some(number) = numbers.pop() {
                self.bars[idx].set_number(number);
            }
            if self.bars[idx].state() != ProgressBarState::Started {
                self.bars[idx].update();
                continue;
            }
            if !interactive {
                self.bars[idx].update();
                continue;
            }
            if self.line_printed {
                text.push(b'\n');
            }
            self.bars[idx].to_stream(&mut text)?;
            self.line_printed = true;
            self.num_of_lines_to_clear += 1 + self.bars[idx].messages().len();
        }

        // aggregate numbers for the "Total" bar
        let mut ticks = 0;
        let mut total_ticks = 0;
        for &idx in &self.done {
            // a finished bar may have failed mid-way; count what it processed
            let done_ticks = self.bars[idx].ticks().max(0);
            ticks += done_ticks;
            total_ticks += done_ticks;
        }
        for &idx in &self.todo {
            ticks += self.bars[idx].ticks().max(0);
            total_ticks += self.bars[idx].total_ticks().max(0);
        }

        if self.bars.len() >= self.total_bar_visible_limit
            && (interactive || self.todo.is_empty())
        {
            if self.line_printed {
                text.push(b'\n');
            }
            let divider = "-".repeat(self.terminal.width);
            text.extend_from_slice(divider.as_bytes());
            text.push(b'\n');

            self.total.set_number(self.done.len() as i32);
            self.total.set_total_ticks(total_ticks);
            self.total.set_ticks(ticks);
            if self.todo.is_empty() {
                self.total.set_state(ProgressBarState::Success);
            }
            self.total.to_stream(&mut text)?;
            text.push(b'\n');
            self.num_of_lines_to_clear += 3;
        }

        if self.cursor_hidden && self.todo.is_empty() {
            text.extend_from_slice(CURSOR_SHOW.as_bytes());
            self.cursor_hidden = false;
        }

        out.write_all(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TOTAL_BAR_NEVER_VISIBLE;
    use crate::progress::MessageType;

    fn render(mbar: &mut MultiProgressBar) -> String {
        let mut buf = Vec::new();
        mbar.to_stream(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn new_multi(terminal: Terminal) -> MultiProgressBar {
        let mut mbar = MultiProgressBar::new();
        mbar.set_terminal(terminal);
        mbar
    }

    fn started_bar(total: i64, description: &str) -> DownloadProgressBar {
        let mut bar = DownloadProgressBar::new(total, description);
        bar.set_auto_finish(false);
        bar.start();
        bar
    }

    #[test]
    fn numbers_are_assigned_sequentially() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(DownloadProgressBar::new(10, "a"));
        let b = mbar.add_bar(DownloadProgressBar::new(10, "b"));
        assert_eq!(mbar.bar(a).number(), 1);
        assert_eq!(mbar.bar(b).number(), 2);
        assert_eq!(mbar.bar(a).total(), 2);
        assert_eq!(mbar.bar(b).total(), 2);
    }

    #[test]
    fn second_draw_rewinds_over_the_first() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(started_bar(10, "a"));
        let b = mbar.add_bar(started_bar(10, "b"));
        mbar.bar_mut(a).set_ticks(2);
        mbar.bar_mut(b).set_ticks(2);

        let first = render(&mut mbar);
        assert!(first.starts_with(CURSOR_HIDE));
        // two bars, a divider and the total, each redrawable
        assert_eq!(mbar.num_of_lines_to_clear, 5);

        let second = render(&mut mbar);
        assert!(second.starts_with("\x1b[4A\r"));
    }

    #[test]
    fn finished_bars_print_first_and_take_lowest_numbers() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(started_bar(10, "first"));
        let b = mbar.add_bar(started_bar(10, "second"));
        // the second bar finishes before the first
        mbar.bar_mut(b).set_ticks(10);
        mbar.bar_mut(b).set_state(ProgressBarState::Success);
        mbar.bar_mut(a).set_ticks(3);

        let text = render(&mut mbar);
        let lines: Vec<&str> = text.lines().collect();
        let head = lines[0].strip_prefix(CURSOR_HIDE).unwrap();
        assert!(head.starts_with("[1/2] second"));
        assert!(lines[1].starts_with("[2/2] first"));
        assert!(mbar.bar(b).is_finished());
        assert_eq!(mbar.bar(b).number(), 1);
        assert_eq!(mbar.bar(a).number(), 2);
    }

    #[test]
    fn total_bar_follows_a_divider() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(started_bar(10, "a"));
        mbar.bar_mut(a).set_ticks(5);

        let text = render(&mut mbar);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "-".repeat(70));
        assert!(lines[2].contains("Total"));
    }

    #[test]
    fn total_bar_succeeds_when_all_bars_are_done() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(started_bar(10, "a"));
        mbar.bar_mut(a).set_ticks(10);
        mbar.bar_mut(a).set_state(ProgressBarState::Success);

        let text = render(&mut mbar);
        assert!(mbar.is_finished());
        assert!(text.contains("Total"));
        assert!(text.contains("100%"));
    }

    #[test]
    fn total_bar_respects_visible_limit() {
        let mut mbar = new_multi(Terminal::interactive(70));
        mbar.set_total_bar_visible_limit(2);
        let a = mbar.add_bar(started_bar(10, "a"));
        mbar.bar_mut(a).set_ticks(5);
        let text = render(&mut mbar);
        assert!(!text.contains("Total"));

        let b = mbar.add_bar(started_bar(10, "b"));
        mbar.bar_mut(b).set_ticks(1);
        let text = render(&mut mbar);
        assert!(text.contains("Total"));
    }

    #[test]
    fn non_interactive_prints_only_finished_bars() {
        let mut mbar = new_multi(Terminal::plain(70));
        mbar.set_total_bar_visible_limit(TOTAL_BAR_NEVER_VISIBLE);
        let a = mbar.add_bar(started_bar(10, "a"));
        let b = mbar.add_bar(started_bar(10, "b"));
        mbar.bar_mut(a).set_ticks(4);
        mbar.bar_mut(b).set_ticks(4);

        assert_eq!(render(&mut mbar), "");

        mbar.bar_mut(a).set_ticks(10);
        mbar.bar_mut(a).set_state(ProgressBarState::Success);
        let text = render(&mut mbar);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("100%"));
        // a finished bar is printed exactly once
        assert_eq!(render(&mut mbar), "");
    }

    #[test]
    fn messages_count_toward_lines_to_clear() {
        let mut mbar = new_multi(Terminal::interactive(70));
        mbar.set_total_bar_visible_limit(TOTAL_BAR_NEVER_VISIBLE);
        let a = mbar.add_bar(started_bar(10, "a"));
        mbar.bar_mut(a).set_ticks(2);
        mbar.bar_mut(a)
            .add_message(MessageType::Warning, "mirror failed");

        render(&mut mbar);
        assert_eq!(mbar.num_of_lines_to_clear, 2);
    }

    #[test]
    fn cursor_is_hidden_while_redrawing_and_restored_at_the_end() {
        let mut mbar = new_multi(Terminal::interactive(70));
        let a = mbar.add_bar(started_bar(10, "a"));
        mbar.bar_mut(a).set_ticks(2);

        let first = render(&mut mbar);
        assert!(first.starts_with(CURSOR_HIDE));
        assert!(!first.contains(CURSOR_SHOW));

        // hidden once, not per draw
        let second = render(&mut mbar);
        assert!(!second.contains(CURSOR_HIDE));

        mbar.bar_mut(a).set_ticks(10);
        mbar.bar_mut(a).set_state(ProgressBarState::Success);
        let last = render(&mut mbar);
        assert!(last.ends_with(CURSOR_SHOW));
        assert!(mbar.is_finished());
    }

    #[test]
    fn unstarted_bars_are_not_drawn() {
        let mut mbar = new_multi(Terminal::interactive(70));
        mbar.set_total_bar_visible_limit(TOTAL_BAR_NEVER_VISIBLE);
        mbar.add_bar(DownloadProgressBar::new(10, "queued"));
        assert_eq!(render(&mut mbar), "");
    }
}
