// src/constants.rs

/// Version string an alias definition file must carry to be loaded.
pub const ALIASES_FILE_VERSION: &str = "1.0";

/// Extension of alias definition files picked up from an alias directory.
pub const ALIASES_FILE_EXTENSION: &str = "conf";

/// Terminal width assumed when detection fails or reports zero columns.
pub const DEFAULT_TERMINAL_WIDTH: usize = 80;

/// Default width reserved for the description column of a download bar.
pub const DEFAULT_DESCRIPTION_WIDTH: usize = 21;

/// Number of fill cells inside the progress widget, excluding the brackets.
pub const PROGRESS_CELLS: usize = 20;

/// Number of registered bars below which the aggregate "Total" bar stays
/// hidden. Zero shows it always.
pub const DEFAULT_TOTAL_BAR_VISIBLE_LIMIT: usize = 0;

/// A "Total" bar limit high enough that the bar is never shown.
pub const TOTAL_BAR_NEVER_VISIBLE: usize = usize::MAX;

/// Minimum delay between two throttled multi-bar redraws, in milliseconds.
pub const MIN_REDRAW_INTERVAL_MS: u64 = 100;

/// Sliding window used for the current-speed estimate, in milliseconds.
pub const SPEED_WINDOW_MS: u64 = 950;
