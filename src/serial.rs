//! Host-link byte I/O seam.

/// Byte transport to the host. Implementations wrap a UART, a USB bridge
/// endpoint, or a test script.
pub trait SerialLink {
    /// Blocking receive. `None` means the link is gone and the command loop
    /// should wind down.
    fn recv(&mut self) -> Option<u8>;

    /// Non-blocking receive; `None` when no byte is pending.
    fn poll(&mut self) -> Option<u8>;

    /// Transmit one byte.
    fn send(&mut self, byte: u8);

    /// Transmit a byte slice.
    fn send_all(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.send(*byte);
        }
    }
}
