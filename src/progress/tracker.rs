// src/progress/tracker.rs

//! Download-callback adapter around [`MultiProgressBar`].
//!
//! Download machinery reports events per transfer: created, progressed,
//! ended, mirror failed. The tracker turns those events into a bar per
//! transfer and keeps the stack redrawn.

use std::io;

use crate::progress::multi::BarId;
use crate::progress::{DownloadProgressBar, MessageType, MultiProgressBar, ProgressBarState};
use crate::tty::Terminal;

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Successful,
    AlreadyExists,
    Error,
}

/// Tracks a batch of downloads as a redrawn stack of progress bars.
#[derive(Debug)]
pub struct DownloadTracker {
    multi_progress_bar: MultiProgressBar,
    number_widget_visible: bool,
    printed: bool,
}

impl Default for DownloadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadTracker {
    pub fn new() -> Self {
        DownloadTracker {
            multi_progress_bar: MultiProgressBar::new(),
            number_widget_visible: true,
            printed: false,
        }
    }

    /// Hides the `[num/total]` column on bars created from now on; single
    /// downloads outside a batch don't need one.
    pub fn set_number_widget_visible(&mut self, visible: bool) {
        self.number_widget_visible = visible;
    }

    /// Forwarded to [`MultiProgressBar::set_total_bar_visible_limit`].
    pub fn set_show_total_bar_limit(&mut self, limit: usize) {
        self.multi_progress_bar.set_total_bar_visible_limit(limit);
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.multi_progress_bar.set_terminal(terminal);
    }

    pub fn multi_progress_bar(&mut self) -> &mut MultiProgressBar {
        &mut self.multi_progress_bar
    }

    /// Registers a new transfer and returns its handle. `total_to_download`
    /// may be negative when the size is not known yet.
    pub fn add_new_download(&mut self, description: &str, total_to_download: i64) -> BarId {
        let mut bar = DownloadProgressBar::new(total_to_download, description);
        bar.set_number_widget_visible(self.number_widget_visible);
        self.multi_progress_bar.add_bar(bar)
    }

    /// Progress event: updates totals and ticks, starting the bar on its
    /// first byte.
    pub fn progress(
        &mut self,
        handle: BarId,
        total_to_download: i64,
        downloaded: i64,
    ) -> io::Result<()> {
        let bar = self.multi_progress_bar.bar_mut(handle);
        bar.set_total_ticks(total_to_download);
        if bar.state() == ProgressBarState::Ready {
            bar.start();
        }
        bar.set_ticks(downloaded);
        self.print()
    }

    /// End-of-transfer event. An error message lands below the bar; a
    /// transfer resolved from cache is marked as such.
    pub fn end(&mut self, handle: BarId, status: TransferStatus, message: &str) -> io::Result<()> {
        let bar = self.multi_progress_bar.bar_mut(handle);
        match status {
            TransferStatus::Successful => {
                if bar.state() == ProgressBarState::Ready {
                    bar.start();
                }
                let total = bar.total_ticks();
                bar.set_ticks(total);
                bar.set_state(ProgressBarState::Success);
            }
            TransferStatus::AlreadyExists => {
                if bar.state() == ProgressBarState::Ready {
                    bar.start();
                }
                let total = bar.total_ticks();
                bar.set_ticks(total);
                bar.add_message(MessageType::Info, message);
                bar.set_state(ProgressBarState::Success);
            }
            TransferStatus::Error => {
                bar.add_message(MessageType::Error, message);
                bar.set_state(ProgressBarState::Error);
            }
        }
        self.print()
    }

    /// A mirror failed but the transfer goes on elsewhere; recorded as a
    /// warning under the bar.
    pub fn mirror_failure(&mut self, handle: BarId, message: &str, url: &str) -> io::Result<()> {
        let bar = self.multi_progress_bar.bar_mut(handle);
        bar.add_message(MessageType::Warning, &format!("{message} - {url}"));
        self.print()
    }

    /// Whether the current batch has drawn anything yet.
    pub fn printed(&self) -> bool {
        self.printed
    }

    /// Drops the current stack so the next batch starts on a fresh block,
    /// separated by a blank line when the old one reached the screen.
    pub fn reset_progress_bar(&mut self) {
        let terminal = self.multi_progress_bar.terminal();
        self.multi_progress_bar = MultiProgressBar::new();
        self.multi_progress_bar.set_terminal(terminal);
        if self.printed {
            eprintln!();
            self.printed = false;
        }
    }

    fn print(&mut self) -> io::Result<()> {
        self.multi_progress_bar.print()?;
        self.printed = true;
        Ok(())
    }
}
