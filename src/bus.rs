//! Byte-level bus transfer engine: the three-wire interlocked handshake,
//! with every wait bounded by an iteration budget.

use arrayvec::ArrayVec;
use log::{debug, warn};
use snafu::Snafu;

use crate::port::{BusPort, Line, Role};

/// Capacity of the bus message buffer.
pub const MSG_CAP: usize = 128;

/// Landing area for bus receive operations.
pub type MsgBuffer = ArrayVec<u8, MSG_CAP>;

/// Upper bound for a single handshake wait, counted in poll iterations.
///
/// The budget is deliberately not wall-clock: a fixed iteration count keeps
/// the timing behavior identical between hardware and simulation, and tests
/// can make it small.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PollBudget(u32);

impl PollBudget {
    /// Default wait bound, roughly tens of milliseconds on target hardware.
    pub const DEFAULT: PollBudget = PollBudget(50_000);

    pub const fn new(iterations: u32) -> Self {
        PollBudget(iterations)
    }

    fn counter(self) -> PollCounter {
        PollCounter { left: self.0 }
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        PollBudget::DEFAULT
    }
}

struct PollCounter {
    left: u32,
}

impl PollCounter {
    /// Account one poll iteration; false once the budget is spent.
    fn tick(&mut self) -> bool {
        if self.left == 0 {
            return false;
        }
        self.left -= 1;
        true
    }
}

/// How a receive operation came to a stop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RxEnd {
    /// The byte limit given to the call was reached.
    Capacity,
    /// The talker asserted the end marker on the last captured byte.
    EndMarker,
    /// The terminator byte was captured.
    Terminator,
    /// A handshake wait ran out of budget. The buffer holds the bytes
    /// captured before that.
    Timeout,
}

impl RxEnd {
    pub fn timed_out(self) -> bool {
        self == RxEnd::Timeout
    }
}

/// Transmit failure.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum TransmitError {
    /// Nothing to transmit.
    #[snafu(display("Empty transmit buffer"))]
    Empty,
    /// NRFD and NDAC were both high before the first byte; no listener is
    /// holding the handshake lines.
    #[snafu(display("Handshake lines busy"))]
    Busy,
    /// A listener did not complete the handshake within the poll budget.
    #[snafu(display("Transmit timeout"))]
    Timeout,
}

/// Stop condition for the receive loop.
#[derive(Copy, Clone)]
enum Stop {
    Never,
    EndMarker,
    Byte(u8),
}

/// The handshake engine, wrapping a [`BusPort`] with the transfer state
/// machines and the role/management-line bookkeeping.
pub struct Gpib<P> {
    port: P,
    role: Role,
    remote: bool,
    budget: PollBudget,
}

impl<P: BusPort> Gpib<P> {
    /// Take ownership of the port with the default wait budget. The port is
    /// configured for controller electrics, local state.
    pub fn new(port: P) -> Self {
        Self::with_budget(port, PollBudget::DEFAULT)
    }

    pub fn with_budget(mut port: P, budget: PollBudget) -> Self {
        port.configure(Role::Controller, false);
        Gpib {
            port,
            role: Role::Controller,
            remote: false,
            budget,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn remote(&self) -> bool {
        self.remote
    }

    /// Switch the electrical role, re-driving REN from the remote flag.
    pub fn set_role(&mut self, role: Role) {
        if role != self.role {
            debug!("bus role {:?} -> {:?}", self.role, role);
        }
        self.role = role;
        self.port.configure(role, self.remote);
    }

    /// Set the remote/local state, mirrored on the (active low) REN line.
    pub fn set_remote(&mut self, remote: bool) {
        self.remote = remote;
        self.port.write_line(Line::Ren, !remote);
    }

    /// Assert or release ATN. `true` puts command framing on the bus; the
    /// line is given settling time after assertion.
    pub fn set_attention(&mut self, attention: bool) {
        self.port.write_line(Line::Atn, !attention);
        if attention {
            self.port.settle();
        }
    }

    /// Pulse IFC low for one millisecond, resetting every device interface
    /// on the bus.
    pub fn pulse_interface_clear(&mut self) {
        self.port.write_line(Line::Ifc, false);
        self.port.hold_ms(1);
        self.port.write_line(Line::Ifc, true);
    }

    /// True while some device holds SRQ asserted.
    pub fn service_request(&mut self) -> bool {
        !self.port.read_line(Line::Srq)
    }

    /// Millisecond delay through the port, for mode-change settling.
    pub fn hold_ms(&mut self, ms: u16) {
        self.port.hold_ms(ms);
    }

    /// Receive up to `max` bytes.
    pub fn receive(&mut self, buf: &mut MsgBuffer, max: usize) -> RxEnd {
        self.receive_inner(buf, max, Stop::Never)
    }

    /// Receive until the talker asserts the end marker, sampled for each
    /// byte at the moment DAV falls.
    pub fn receive_until_end(&mut self, buf: &mut MsgBuffer, max: usize) -> RxEnd {
        self.receive_inner(buf, max, Stop::EndMarker)
    }

    /// Receive until `terminator` is captured.
    pub fn receive_until_byte(
        &mut self,
        buf: &mut MsgBuffer,
        max: usize,
        terminator: u8,
    ) -> RxEnd {
        self.receive_inner(buf, max, Stop::Byte(terminator))
    }

    fn receive_inner(&mut self, buf: &mut MsgBuffer, max: usize, stop: Stop) -> RxEnd {
        buf.clear();
        let max = max.min(buf.capacity());
        if max == 0 {
            return RxEnd::Capacity;
        }
        loop {
            // ready for data
            self.port.write_line(Line::Nrfd, true);

            let mut wait = self.budget.counter();
            while self.port.read_line(Line::Dav) {
                if !wait.tick() {
                    self.port.write_line(Line::Nrfd, false);
                    warn!("receive timed out waiting for DAV, {} bytes captured", buf.len());
                    return RxEnd::Timeout;
                }
            }

            // DAV fell: the end marker is only meaningful while the byte is
            // still on the bus.
            let end_marker = matches!(stop, Stop::EndMarker) && !self.port.read_line(Line::Eoi);

            self.port.write_line(Line::Nrfd, false);
            let byte = !self.port.read_data();
            buf.push(byte);

            // data accepted
            self.port.write_line(Line::Ndac, true);

            while !self.port.read_line(Line::Dav) {
                if !wait.tick() {
                    self.port.write_line(Line::Ndac, false);
                    warn!("receive timed out waiting for DAV release, {} bytes captured", buf.len());
                    return RxEnd::Timeout;
                }
            }
            self.port.write_line(Line::Ndac, false);

            if end_marker {
                return RxEnd::EndMarker;
            }
            if let Stop::Byte(terminator) = stop {
                if byte == terminator {
                    return RxEnd::Terminator;
                }
            }
            if buf.len() >= max {
                return RxEnd::Capacity;
            }
        }
    }

    /// Transmit `bytes` with the three-wire handshake. With `end_marker`,
    /// EOI is asserted while the final byte is on the bus.
    ///
    /// Fails without touching the bus if there is nothing to send, or if
    /// NRFD and NDAC are both already high — no listener is participating in
    /// the handshake.
    pub fn transmit(&mut self, bytes: &[u8], end_marker: bool) -> Result<(), TransmitError> {
        if bytes.is_empty() {
            return Err(TransmitError::Empty);
        }
        if self.port.read_line(Line::Nrfd) && self.port.read_line(Line::Ndac) {
            return Err(TransmitError::Busy);
        }

        let last = bytes.len() - 1;
        for (index, byte) in bytes.iter().enumerate() {
            if index == last && end_marker {
                self.port.write_line(Line::Eoi, false);
            }

            self.port.drive_data(!byte);
            self.port.settle();

            let mut wait = self.budget.counter();
            while !self.port.read_line(Line::Nrfd) {
                if !wait.tick() {
                    self.port.write_line(Line::Eoi, true);
                    warn!("transmit timed out waiting for NRFD at byte {}", index);
                    return Err(TransmitError::Timeout);
                }
            }

            self.port.write_line(Line::Dav, false);
            self.port.settle();

            while !self.port.read_line(Line::Ndac) {
                if !wait.tick() {
                    self.port.write_line(Line::Eoi, true);
                    self.port.write_line(Line::Dav, true);
                    warn!("transmit timed out waiting for NDAC at byte {}", index);
                    return Err(TransmitError::Timeout);
                }
            }

            self.port.write_line(Line::Eoi, true);
            self.port.write_line(Line::Dav, true);
        }
        Ok(())
    }
}
