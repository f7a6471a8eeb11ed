//! Recall ring for accepted command lines.

use arrayvec::ArrayVec;

use crate::buffer::LINE_CAP;

/// Number of lines the recall ring keeps.
pub const HISTORY_CAP: usize = 15;

type Entry = ArrayVec<u8, LINE_CAP>;

/// The most recent accepted lines, oldest first.
#[derive(Debug, Default)]
pub struct History {
    entries: ArrayVec<Entry, HISTORY_CAP>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|entry| entry.as_slice())
    }

    /// Save a line. A line equal to the most recently saved one is skipped,
    /// and the oldest entry is evicted once the ring is full. Empty lines
    /// are never saved.
    pub fn save(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        if self.entries.last().map(|entry| entry.as_slice()) == Some(line) {
            return;
        }
        if self.entries.is_full() {
            self.entries.remove(0);
        }
        let mut entry = Entry::new();
        entry
            .try_extend_from_slice(line)
            .expect("BUG: History entry too small.");
        self.entries.push(entry);
    }
}
