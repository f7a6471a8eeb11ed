//! Serial line discipline: cursor-aware editing of the command line, recall
//! of previous lines, and the terminal echo that keeps the remote screen
//! consistent with the buffer.
//!
//! The echo contract is erase-and-redraw: edits in the middle of the line
//! re-send the tail and walk the cursor back with backspaces rather than
//! repainting the whole line.

use crate::ascii::{BS, CR, CSI, ESC, KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_UP, LF, SP};
use crate::buffer::LineBuffer;
use crate::history::History;
use crate::serial::SerialLink;

/// The line editor; owns the line under edit and the local-echo flag.
#[derive(Debug, Default)]
pub struct LineEditor {
    line: LineBuffer,
    echo: bool,
    /// History recall selection; `history.len()` means "editing a new line".
    selected: usize,
}

impl LineEditor {
    pub fn new(echo: bool) -> LineEditor {
        LineEditor {
            line: LineBuffer::new(),
            echo,
            selected: 0,
        }
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn line_mut(&mut self) -> &mut LineBuffer {
        &mut self.line
    }

    /// Start a fresh prompt: recall restarts just past the newest entry.
    pub fn reset_recall(&mut self, history: &History) {
        self.selected = history.len();
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }

    /// Feed one serial byte. Returns true when a carriage return terminated
    /// the line; the line stays in the buffer for dispatch.
    pub fn feed<S: SerialLink>(&mut self, byte: u8, serial: &mut S, history: &History) -> bool {
        match byte {
            BS => self.backspace(serial),
            // line feeds are transport noise, not terminators
            LF => {}
            ESC => self.escape(serial, history),
            CR => {
                if self.echo {
                    serial.send_all(b"\r\n");
                }
                return true;
            }
            _ => self.insert(byte, serial),
        }
        false
    }

    fn insert<S: SerialLink>(&mut self, byte: u8, serial: &mut S) {
        let at_end = self.line.cursor() == self.line.len();
        if !self.line.insert(byte) {
            // line full, byte dropped
            return;
        }
        if !self.echo {
            return;
        }
        serial.send(byte);
        if !at_end {
            let tail_len = self.line.len() - self.line.cursor();
            serial.send_all(self.line.tail());
            for _ in 0..tail_len {
                serial.send(BS);
            }
        }
    }

    fn backspace<S: SerialLink>(&mut self, serial: &mut S) {
        let at_end = self.line.cursor() == self.line.len();
        if !self.line.backspace() {
            return;
        }
        if !self.echo {
            return;
        }
        if at_end {
            serial.send_all(&[BS, SP, BS]);
        } else {
            let tail_len = self.line.len() - self.line.cursor();
            serial.send(BS);
            serial.send_all(self.line.tail());
            serial.send(SP);
            for _ in 0..tail_len + 1 {
                serial.send(BS);
            }
        }
    }

    /// Handle an escape sequence: `ESC [` plus one final byte. A lone ESC
    /// consumes its lookahead byte and is otherwise ignored.
    fn escape<S: SerialLink>(&mut self, serial: &mut S, history: &History) {
        match serial.recv() {
            Some(byte) if byte == CSI => {}
            _ => return,
        }
        let key = match serial.recv() {
            Some(key) => key,
            None => return,
        };
        match key {
            KEY_UP => self.recall_older(serial, history),
            KEY_DOWN => self.recall_newer(serial, history),
            KEY_LEFT => {
                if self.line.cursor_left() && self.echo {
                    serial.send_all(&[ESC, CSI, KEY_LEFT]);
                }
            }
            KEY_RIGHT => {
                if self.line.cursor_right() && self.echo {
                    serial.send_all(&[ESC, CSI, KEY_RIGHT]);
                }
            }
            _ => {}
        }
    }

    fn recall_older<S: SerialLink>(&mut self, serial: &mut S, history: &History) {
        self.selected = self.selected.saturating_sub(1);
        let entry = history.get(self.selected).unwrap_or(b"");
        self.swap_line(serial, entry);
    }

    fn recall_newer<S: SerialLink>(&mut self, serial: &mut S, history: &History) {
        if self.selected + 1 == history.len() {
            // back past the newest entry: an empty line
            self.selected = history.len();
            self.swap_line(serial, b"");
        } else if self.selected + 1 < history.len() {
            self.selected += 1;
            let entry = history.get(self.selected).unwrap_or(b"");
            self.swap_line(serial, entry);
        }
    }

    /// Replace the visible line: walk the cursor to the end with spaces, rub
    /// the line out with backspace-space-backspace, then draw the new one.
    fn swap_line<S: SerialLink>(&mut self, serial: &mut S, entry: &[u8]) {
        if self.echo {
            for _ in self.line.cursor()..self.line.len() {
                serial.send(SP);
            }
            for _ in 0..self.line.len() {
                serial.send_all(&[BS, SP, BS]);
            }
            serial.send_all(entry);
        }
        self.line.load(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeLink {
        rx: std::collections::VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl FakeLink {
        fn with_rx(rx: &[u8]) -> FakeLink {
            FakeLink {
                rx: rx.iter().copied().collect(),
                tx: Vec::new(),
            }
        }
    }

    impl SerialLink for FakeLink {
        fn recv(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
        fn poll(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
        fn send(&mut self, byte: u8) {
            self.tx.push(byte);
        }
    }

    fn feed_all(editor: &mut LineEditor, link: &mut FakeLink, history: &History) -> bool {
        let mut done = false;
        while let Some(byte) = link.recv() {
            done = editor.feed(byte, link, history);
            if done {
                break;
            }
        }
        done
    }

    #[test]
    fn test_plain_line() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        let mut link = FakeLink::with_rx(b"A07\r");
        assert!(feed_all(&mut editor, &mut link, &history));
        assert_eq!(editor.line().as_bytes(), b"A07");
        assert_eq!(link.tx, b"A07\r\n");
    }

    #[test]
    fn test_line_feed_is_ignored() {
        let history = History::new();
        let mut editor = LineEditor::new(false);
        let mut link = FakeLink::with_rx(b"A\n07\r");
        assert!(feed_all(&mut editor, &mut link, &history));
        assert_eq!(editor.line().as_bytes(), b"A07");
    }

    #[test]
    fn test_backspace_at_end_echo() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        let mut link = FakeLink::with_rx(b"AB\x08\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"A");
        assert_eq!(link.tx, b"AB\x08 \x08\r\n");
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        let mut link = FakeLink::with_rx(b"\x08\x08A\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"A");
        assert_eq!(link.tx, b"A\r\n");
    }

    #[test]
    fn test_mid_line_insert_echo() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        // "AC", cursor left, insert "B"
        let mut link = FakeLink::with_rx(b"AC\x1b[DB\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"ABC");
        // echo: A, C, cursor-left, B plus tail redraw "C" and one backspace
        assert_eq!(link.tx, b"AC\x1b[DBC\x08\r\n");
    }

    #[test]
    fn test_mid_line_backspace_echo() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        // "ABC", cursor left, backspace deletes 'B'
        let mut link = FakeLink::with_rx(b"ABC\x1b[D\x08\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"AC");
        // BS, tail "C", space, then tail+1 backspaces
        assert_eq!(link.tx, b"ABC\x1b[D\x08C \x08\x08\r\n");
    }

    #[test]
    fn test_cursor_bounds() {
        let history = History::new();
        let mut editor = LineEditor::new(true);
        // more rights than the line has room for, then back past the start
        let mut link = FakeLink::with_rx(b"A\x1b[C\x1b[D\x1b[D\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"A");
        // only the one valid left move is echoed
        assert_eq!(link.tx, b"A\x1b[D\r\n");
    }

    #[test]
    fn test_lone_escape_is_ignored() {
        let history = History::new();
        let mut editor = LineEditor::new(false);
        // ESC followed by something other than '[' swallows one byte
        let mut link = FakeLink::with_rx(b"\x1bxA\r");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"A");
    }

    #[test]
    fn test_history_recall() {
        let mut history = History::new();
        history.save(b"A07");
        history.save(b"Dquery");

        let mut editor = LineEditor::new(false);
        editor.reset_recall(&history);

        // up: newest; up: older; up again: clamped at oldest
        let mut link = FakeLink::with_rx(b"\x1b[A");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"Dquery");

        let mut link = FakeLink::with_rx(b"\x1b[A\x1b[A");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"A07");

        // down: newest again; down past the newest clears the line
        let mut link = FakeLink::with_rx(b"\x1b[B");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"Dquery");

        let mut link = FakeLink::with_rx(b"\x1b[B");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"");
    }

    #[test]
    fn test_recall_with_empty_history() {
        let history = History::new();
        let mut editor = LineEditor::new(false);
        editor.reset_recall(&history);
        let mut link = FakeLink::with_rx(b"AB\x1b[A");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"");
    }

    #[test]
    fn test_recall_erase_sequence() {
        let mut history = History::new();
        history.save(b"XY");

        let mut editor = LineEditor::new(true);
        editor.reset_recall(&history);
        // two chars on screen, cursor at the end, then recall
        let mut link = FakeLink::with_rx(b"AB\x1b[A");
        feed_all(&mut editor, &mut link, &history);
        assert_eq!(editor.line().as_bytes(), b"XY");
        // rub out "AB" with BS SP BS per char, then draw the entry
        assert_eq!(link.tx, b"AB\x08 \x08\x08 \x08XY");
    }

    #[test]
    fn test_capacity_drops_bytes_silently() {
        let history = History::new();
        let mut editor = LineEditor::new(false);
        let mut overlong = Vec::new();
        overlong.resize(100, b'x');
        overlong.push(b'\r');
        let mut link = FakeLink {
            rx: overlong.iter().copied().collect(),
            tx: Vec::new(),
        };
        assert!(feed_all(&mut editor, &mut link, &history));
        assert_eq!(editor.line().len(), crate::buffer::LINE_CAP - 1);
    }
}
