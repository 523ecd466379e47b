//! Bounded, wholesale-replaced buffers.
//!
//! Each helper returns a new vector instead of splicing the old one, so a
//! state update is always a full replacement.

pub const MAX_LOGS: usize = 40;
pub const MAX_HISTORY: usize = 30;
pub const MAX_COMMAND_OUTPUT: usize = 200;

/// How many output lines of a finished command are copied into the logs.
pub const MIRRORED_OUTPUT_LINES: usize = 12;

/// Prepend `item`, keeping at most `capacity` entries (oldest dropped).
pub fn push_recent(items: &[String], item: String, capacity: usize) -> Vec<String> {
    std::iter::once(item)
        .chain(items.iter().cloned())
        .take(capacity)
        .collect()
}

/// Append `item`, keeping the newest `capacity` entries in arrival order.
pub fn append_bounded(items: &[String], item: String, capacity: usize) -> Vec<String> {
    let skip = (items.len() + 1).saturating_sub(capacity);
    items
        .iter()
        .cloned()
        .chain(std::iter::once(item))
        .skip(skip)
        .collect()
}
