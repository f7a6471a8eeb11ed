//! Fixed-capacity line buffer with a cursor, the working storage for the
//! serial line editor.

use arrayvec::ArrayVec;

/// Hard ceiling for an edited command line, including its command letter.
pub const LINE_CAP: usize = 64;

// Slack for the end-of-message bytes appended before transmission.
const STORE_CAP: usize = LINE_CAP + 2;

/// An editable byte sequence with an independent cursor.
///
/// The invariant `cursor <= len < LINE_CAP` holds after every edit
/// operation; [`append_end`](Self::append_end) may push the length past the
/// editable ceiling, into the slack reserved for end-of-message bytes.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    data: ArrayVec<u8, STORE_CAP>,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> LineBuffer {
        LineBuffer::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from the cursor to the end of the line.
    pub fn tail(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }

    /// Insert at the cursor, shifting the tail right. Returns false once the
    /// line holds `LINE_CAP - 1` bytes; the byte is dropped.
    pub fn insert(&mut self, byte: u8) -> bool {
        if self.data.len() >= LINE_CAP - 1 {
            return false;
        }
        self.data.insert(self.cursor, byte);
        self.cursor += 1;
        true
    }

    /// Delete the byte before the cursor, shifting the tail left. No-op at
    /// the start of the line.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.data.remove(self.cursor);
        true
    }

    pub fn cursor_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn cursor_right(&mut self) -> bool {
        if self.cursor >= self.data.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Replace the contents with `line`, cursor at the end.
    pub fn load(&mut self, line: &[u8]) {
        self.data.clear();
        self.data
            .try_extend_from_slice(line)
            .expect("BUG: Line store too small.");
        self.cursor = self.data.len();
    }

    /// Append end-of-message bytes past the editable region.
    pub fn append_end(&mut self, bytes: &[u8]) {
        self.data
            .try_extend_from_slice(bytes)
            .expect("BUG: Line store too small.");
    }

    /// Drop `n` trailing bytes, undoing [`append_end`](Self::append_end).
    pub fn trim_end(&mut self, n: usize) {
        let len = self.data.len().saturating_sub(n);
        self.data.truncate(len);
        if self.cursor > len {
            self.cursor = len;
        }
    }
}
