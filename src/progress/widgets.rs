// src/progress/widgets.rs

//! Column widgets of a rendered progress bar line.
//!
//! Each widget renders one column from the bar's numbers. Layout:
//!
//! `<numbers><description...........><%%%><progress...><speed.....><size.....><time....>`

use unicode_width::UnicodeWidthChar;

use crate::constants::PROGRESS_CELLS;
use crate::progress::ProgressBar;

pub(crate) const PERCENT_WIDTH: usize = 4;
pub(crate) const PROGRESS_WIDTH: usize = PROGRESS_CELLS + 2;
pub(crate) const SPEED_WIDTH: usize = 11;
pub(crate) const SIZE_WIDTH: usize = 9;
pub(crate) const TIME_WIDTH: usize = 7;

const SIZE_UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];

/// The widgets a download bar can render, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WidgetKind {
    Number,
    Description,
    Percent,
    Progress,
    Speed,
    Size,
    Time,
}

fn digits(value: i32) -> usize {
    let mut value = value.max(0);
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

/// `[  1/999]`, with the current number right-aligned to the total's digits.
pub(crate) fn render_number(bar: &ProgressBar) -> String {
    let width = digits(bar.total());
    format!("[{:>width$}/{}]", bar.number(), bar.total())
}

pub(crate) fn number_width(bar: &ProgressBar) -> usize {
    digits(bar.total()) * 2 + 3
}

/// ` 40%`, or `???%` while the total is unknown.
pub(crate) fn render_percent(bar: &ProgressBar) -> String {
    if bar.percent_done() < 0 {
        "???%".to_string()
    } else {
        format!("{:>3}%", bar.percent_done())
    }
}

/// `[=======             ]`
pub(crate) fn render_progress(bar: &ProgressBar) -> String {
    let percent = bar.percent_done().clamp(0, 100) as usize;
    let filled = percent * PROGRESS_CELLS / 100;
    let mut out = String::with_capacity(PROGRESS_WIDTH);
    out.push('[');
    for _ in 0..filled {
        out.push('=');
    }
    for _ in filled..PROGRESS_CELLS {
        out.push(' ');
    }
    out.push(']');
    out
}

/// `123.4 kB/s`; the current speed while running, the average once finished.
pub(crate) fn render_speed(bar: &ProgressBar) -> String {
    let speed = if bar.is_finished() {
        bar.average_speed()
    } else {
        bar.current_speed()
    };
    format!("{}/s", format_size(speed))
}

/// `123.4 kB` of data processed so far.
pub(crate) fn render_size(bar: &ProgressBar) -> String {
    format_size(bar.ticks().max(0))
}

/// `-00m42s` remaining while running, ` 00m42s` elapsed once finished.
pub(crate) fn render_time(bar: &ProgressBar) -> String {
    if bar.is_finished() {
        format!(" {}", format_time(bar.elapsed_seconds()))
    } else {
        format!("-{}", format_time(bar.remaining_seconds()))
    }
}

/// A byte count as a fixed nine-character column, e.g. `  4.0   B`.
pub(crate) fn format_size(num: i64) -> String {
    let mut value = num.max(0) as f64;
    let mut unit = 0;
    while value >= 999.95 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:>5.1} {:>3}", value, SIZE_UNITS[unit])
}

/// A duration as `MMmSSs`; negative means unknown and renders as `??m??s`.
pub(crate) fn format_time(seconds: i64) -> String {
    if seconds < 0 {
        return "??m??s".to_string();
    }
    let minutes = seconds / 60;
    if minutes > 99 {
        let hours = minutes / 60;
        return format!("{:02}h{:02}m", hours.min(99), minutes % 60);
    }
    format!("{:02}m{:02}s", minutes, seconds % 60)
}

/// Truncates `text` to `width` terminal cells and pads the rest with spaces.
pub(crate) fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    for _ in used..width {
        out.push(' ');
    }
    out
}

/// Display width of `text` in terminal cells.
pub(crate) fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_keeps_nine_columns() {
        assert_eq!(format_size(4), "  4.0   B");
        assert_eq!(format_size(10), " 10.0   B");
        assert_eq!(format_size(126_976), "124.0  kB");
        assert_eq!(format_size(0), "  0.0   B");
        assert_eq!(format_size(5 * 1024 * 1024), "  5.0  MB");
        assert_eq!(format_size(4).len(), 9);
    }

    #[test]
    fn format_time_minutes_and_seconds() {
        assert_eq!(format_time(0), "00m00s");
        assert_eq!(format_time(754), "12m34s");
        assert_eq!(format_time(-1), "??m??s");
        assert_eq!(format_time(0).len(), 6);
    }

    #[test]
    fn number_widget_aligns_to_total() {
        let mut bar = ProgressBar::new(10, "x");
        bar.set_number(1);
        bar.set_total(999);
        assert_eq!(render_number(&bar), "[  1/999]");
        assert_eq!(number_width(&bar), 9);
        bar.set_total(0);
        bar.set_number(0);
        assert_eq!(render_number(&bar), "[0/0]");
        assert_eq!(number_width(&bar), 5);
    }

    #[test]
    fn percent_widget_handles_unknown_total() {
        let mut bar = ProgressBar::new(-1, "x");
        bar.start();
        bar.update();
        assert_eq!(render_percent(&bar), "???%");
        let mut bar = ProgressBar::new(200, "x");
        bar.start();
        bar.set_ticks(80);
        bar.update();
        assert_eq!(render_percent(&bar), " 40%");
    }

    #[test]
    fn progress_widget_fills_proportionally() {
        let mut bar = ProgressBar::new(100, "x");
        bar.set_auto_finish(false);
        bar.start();
        bar.set_ticks(50);
        bar.update();
        assert_eq!(render_progress(&bar), "[==========          ]");
        assert_eq!(render_progress(&bar).len(), PROGRESS_WIDTH);
    }

    #[test]
    fn fit_truncates_by_display_width() {
        assert_eq!(fit("test", 6), "test  ");
        assert_eq!(fit("overflowing", 4), "over");
        // a double-width character does not fit into the last single cell
        assert_eq!(fit("aも", 2), "a ");
        assert_eq!(display_width("もで"), 4);
    }
}
