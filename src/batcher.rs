//! Dual-bounded batching of entries.
//!
//! Entries are packed greedily, left to right, into batches limited both by
//! item count and by the cumulative length of their `full_entry_text`.

use crate::entry::Entry;
use std::iter::Peekable;
use std::vec::IntoIter;

/// Split `entries` into batches of at most `max_count` items whose
/// `full_entry_text` lengths sum to at most `max_chars`.
///
/// A single entry longer than `max_chars` still forms a batch of its own;
/// empty batches are never produced. `max_count` of zero is treated as one.
pub fn make_batches(entries: Vec<Entry>, max_count: usize, max_chars: usize) -> Batches {
    Batches {
        entries: entries.into_iter().peekable(),
        max_count: max_count.max(1),
        max_chars,
    }
}

/// Lazy iterator over batches, see [`make_batches`].
#[derive(Debug)]
pub struct Batches {
    entries: Peekable<IntoIter<Entry>>,
    max_count: usize,
    max_chars: usize,
}

/// Character budget an entry consumes.
pub fn entry_chars(entry: &Entry) -> usize {
    entry.full_entry_text().chars().count()
}

impl Iterator for Batches {
    type Item = Vec<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.entries.next()?;
        let mut chars = entry_chars(&first);
        let mut batch = vec![first];

        while batch.len() < self.max_count {
            let Some(next) = self.entries.peek() else {
                break;
            };
            let next_chars = entry_chars(next);
            if chars + next_chars > self.max_chars {
                break;
            }
            chars += next_chars;
            if let Some(entry) = self.entries.next() {
                batch.push(entry);
            }
        }

        Some(batch)
    }
}
