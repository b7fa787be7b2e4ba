//! Internal constants for include processing.

/// Marker that, placed right before a directive, keeps it unresolved.
pub const ESCAPE_MARKER: &str = "\\";

/// Prefix introducing a line slice inside a target's brackets.
pub const SLICE_PREFIX: &str = "ln:";
