// src/progress/mod.rs

//! Terminal progress reporting.
//!
//! [`ProgressBar`] tracks the numbers behind one long-running operation,
//! [`DownloadProgressBar`](download::DownloadProgressBar) renders it as a
//! single line of column widgets, [`MultiProgressBar`](multi::MultiProgressBar)
//! redraws a stack of bars in place and
//! [`DownloadTracker`](tracker::DownloadTracker) adapts the stack to
//! download-callback style events.

pub mod download;
pub mod multi;
pub mod tracker;
pub(crate) mod widgets;

pub use download::DownloadProgressBar;
pub use multi::{BarId, MultiProgressBar};
pub use tracker::{DownloadTracker, TransferStatus};

use std::time::Instant;

use crate::constants::SPEED_WINDOW_MS;

/// Lifecycle of a progress bar. A bar finishes in exactly one of the three
/// terminal states and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBarState {
    Ready,
    Started,
    Success,
    Warning,
    Error,
}

/// Severity of a line attached below a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Bookkeeping for one operation: tick counts, derived speeds and times, and
/// a message list. Rendering lives elsewhere; this type only does the math.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    ticks: i64,
    total_ticks: i64,
    number: i32,
    total: i32,
    description: String,
    messages: Vec<(MessageType, String)>,
    state: ProgressBarState,
    percent_done: i32,
    elapsed_seconds: i64,
    remaining_seconds: i64,
    average_speed: i64,
    auto_finish: bool,
    begin: Option<Instant>,
    end: Option<Instant>,
    current_speed_window_start: Instant,
    current_speed: i64,
    current_speed_window_ticks: i64,
}

impl ProgressBar {
    /// A new bar in the `Ready` state. `total_ticks < 0` means the total is
    /// unknown.
    pub fn new(total_ticks: i64, description: &str) -> Self {
        ProgressBar {
            ticks: -1,
            total_ticks,
            number: 0,
            total: 0,
            description: description.to_string(),
            messages: Vec::new(),
            state: ProgressBarState::Ready,
            percent_done: -1,
            elapsed_seconds: 0,
            remaining_seconds: 0,
            average_speed: 0,
            auto_finish: true,
            begin: None,
            end: None,
            current_speed_window_start: Instant::now(),
            current_speed: 0,
            current_speed_window_ticks: 0,
        }
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Moves the tick counter forward, clamped to the total. Ticks going
    /// backwards reset the current-speed window. Ignored once finished.
    pub fn set_ticks(&mut self, value: i64) {
        if self.is_finished() {
            return;
        }
        let mut new_ticks = value;
        if self.total_ticks >= 0 {
            new_ticks = new_ticks.min(self.total_ticks);
        }
        if new_ticks >= self.ticks {
            self.current_speed_window_ticks += new_ticks - self.ticks;
        } else {
            self.current_speed_window_ticks = 0;
        }
        self.ticks = new_ticks;
    }

    pub fn add_ticks(&mut self, value: i64) {
        self.set_ticks(self.ticks + value);
    }

    pub fn total_ticks(&self) -> i64 {
        self.total_ticks
    }

    pub fn set_total_ticks(&mut self, value: i64) {
        if self.is_finished() {
            return;
        }
        self.total_ticks = value;
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn set_number(&mut self, value: i32) {
        self.number = value;
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn set_total(&mut self, value: i32) {
        self.total = value;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = value.to_string();
    }

    pub fn state(&self) -> ProgressBarState {
        self.state
    }

    /// Forces a state. Refreshes the derived numbers first so a bar closed by
    /// hand carries final speed and time values.
    pub fn set_state(&mut self, value: ProgressBarState) {
        self.update();
        self.state = value;
    }

    pub fn is_finished(&self) -> bool {
        !matches!(
            self.state,
            ProgressBarState::Ready | ProgressBarState::Started
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self.state,
            ProgressBarState::Warning | ProgressBarState::Error
        )
    }

    pub fn add_message(&mut self, message_type: MessageType, message: &str) {
        self.messages.push((message_type, message.to_string()));
    }

    /// Drops the most recently added message.
    pub fn pop_message(&mut self) {
        self.messages.pop();
    }

    pub fn messages(&self) -> &[(MessageType, String)] {
        &self.messages
    }

    pub fn auto_finish(&self) -> bool {
        self.auto_finish
    }

    /// With auto-finish on (the default), reaching the total flips a started
    /// bar to `Success` on the next update.
    pub fn set_auto_finish(&mut self, value: bool) {
        self.auto_finish = value;
    }

    pub fn percent_done(&self) -> i32 {
        self.percent_done
    }

    pub fn current_speed(&self) -> i64 {
        self.current_speed
    }

    pub fn average_speed(&self) -> i64 {
        self.average_speed
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed_seconds
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    /// Starts the clock and moves to `Started`. Subsequent calls are no-ops.
    pub fn start(&mut self) {
        if self.begin.is_none() {
            self.begin = Some(Instant::now());
            self.state = ProgressBarState::Started;
        }
    }

    /// Back to a pristine `Ready` bar.
    pub fn reset(&mut self) {
        *self = ProgressBar::new(-1, "");
    }

    /// Recomputes percent, speeds and times from the tick counters. Called
    /// before every render and on explicit state changes.
    pub fn update(&mut self) {
        if self.is_finished() {
            return;
        }

        if self.total_ticks < 0 {
            self.percent_done = -1;
        } else if self.total_ticks == 0 || self.ticks >= self.total_ticks {
            // an empty total counts as fully done
            self.percent_done = 100;
        } else {
            self.percent_done = (self.ticks as f64 / self.total_ticks as f64 * 100.0) as i32;
        }

        let now = Instant::now();

        // current speed over a sliding window of roughly one second
        let window_ms = now
            .duration_since(self.current_speed_window_start)
            .as_millis() as i64;
        if window_ms > SPEED_WINDOW_MS as i64 {
            self.current_speed = self.current_speed_window_ticks * 1000 / window_ms;
            self.current_speed_window_ticks = 0;
            self.current_speed_window_start = now;
        } else if self.current_speed == 0 && window_ms != 0 {
            self.current_speed = self.current_speed_window_ticks * 1000 / window_ms;
        }

        if let Some(begin) = self.begin {
            let elapsed = now.duration_since(begin);
            let elapsed_ms = elapsed.as_millis() as i64;
            self.average_speed = if elapsed_ms == 0 {
                0
            } else {
                self.ticks * 1000 / elapsed_ms
            };
            // round so 00m00s is displayed less often
            self.elapsed_seconds = (elapsed_ms + 500) / 1000;
        } else {
            self.average_speed = 0;
            self.elapsed_seconds = 0;
        }

        if self.total_ticks >= 0 {
            if self.current_speed != 0 {
                self.remaining_seconds = (self.total_ticks - self.ticks) / self.current_speed;
            }
        } else {
            self.remaining_seconds = -1;
        }

        if self.total_ticks >= 0 && self.ticks >= self.total_ticks {
            if self.auto_finish && self.state == ProgressBarState::Started {
                self.state = ProgressBarState::Success;
            }
            self.end = Some(now);
            self.percent_done = 100;
            self.remaining_seconds = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bar_is_ready_and_unknown() {
        let bar = ProgressBar::new(-1, "meta");
        assert_eq!(bar.state(), ProgressBarState::Ready);
        assert_eq!(bar.ticks(), -1);
        assert_eq!(bar.percent_done(), -1);
        assert!(!bar.is_finished());
    }

    #[test]
    fn ticks_are_clamped_to_total() {
        let mut bar = ProgressBar::new(10, "dl");
        bar.start();
        bar.set_ticks(25);
        assert_eq!(bar.ticks(), 10);
    }

    #[test]
    fn reaching_total_auto_finishes() {
        let mut bar = ProgressBar::new(10, "dl");
        bar.start();
        bar.set_ticks(10);
        bar.update();
        assert_eq!(bar.state(), ProgressBarState::Success);
        assert_eq!(bar.percent_done(), 100);
        assert_eq!(bar.remaining_seconds(), 0);
        assert!(bar.is_finished());
    }

    #[test]
    fn auto_finish_can_be_disabled() {
        let mut bar = ProgressBar::new(10, "dl");
        bar.set_auto_finish(false);
        bar.start();
        bar.set_ticks(10);
        bar.update();
        assert_eq!(bar.state(), ProgressBarState::Started);
        assert_eq!(bar.percent_done(), 100);
    }

    #[test]
    fn finished_bar_ignores_further_ticks() {
        let mut bar = ProgressBar::new(10, "dl");
        bar.start();
        bar.set_state(ProgressBarState::Error);
        bar.set_ticks(5);
        assert_eq!(bar.ticks(), -1);
        assert!(bar.is_failed());
    }

    #[test]
    fn zero_total_counts_as_complete() {
        let mut bar = ProgressBar::new(0, "noop");
        bar.start();
        bar.set_ticks(0);
        bar.update();
        assert_eq!(bar.percent_done(), 100);
        assert_eq!(bar.state(), ProgressBarState::Success);
    }

    #[test]
    fn percent_tracks_ticks() {
        let mut bar = ProgressBar::new(200, "dl");
        bar.start();
        bar.set_ticks(80);
        bar.update();
        assert_eq!(bar.percent_done(), 40);
        assert_eq!(bar.state(), ProgressBarState::Started);
    }

    #[test]
    fn messages_push_and_pop() {
        let mut bar = ProgressBar::new(-1, "dl");
        bar.add_message(MessageType::Warning, "mirror failed");
        bar.add_message(MessageType::Info, "retrying");
        assert_eq!(bar.messages().len(), 2);
        bar.pop_message();
        assert_eq!(bar.messages().len(), 1);
        assert_eq!(bar.messages()[0].1, "mirror failed");
        bar.pop_message();
        bar.pop_message();
        assert!(bar.messages().is_empty());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut bar = ProgressBar::new(10, "dl");
        bar.start();
        bar.set_ticks(10);
        bar.update();
        bar.reset();
        assert_eq!(bar.state(), ProgressBarState::Ready);
        assert_eq!(bar.ticks(), -1);
        assert_eq!(bar.total_ticks(), -1);
        assert!(bar.description().is_empty());
    }

    #[test]
    fn unknown_total_has_unknown_remaining() {
        let mut bar = ProgressBar::new(-1, "meta");
        bar.start();
        bar.set_ticks(100);
        bar.update();
        assert_eq!(bar.percent_done(), -1);
        assert_eq!(bar.remaining_seconds(), -1);
    }
}
