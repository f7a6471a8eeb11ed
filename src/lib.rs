//! Sans-io implementation of a serial-to-GPIB controller bridge.
//!
//! The crate is the protocol core of a GPIB (IEEE-488) controller driven
//! over a byte-oriented host link with single-letter text commands: the
//! three-wire interlocked handshake engine ([`Gpib`]), and the line editor
//! plus command interpreter on top of it ([`Bridge`]).
//!
//! Hardware access goes through the [`BusPort`] and [`SerialLink`] traits,
//! and every bus wait is bounded by an iteration budget ([`PollBudget`]),
//! so a dead or disconnected bus can never hang the device.
//!
//! # Example
//!
//! ```no_run
//! use gpib_bridge::{BlinkCell, Bridge, BridgeConfig, BusPort, Gpib, Line, Role, SerialLink};
//!
//! // The embedding firmware implements the two hardware seams.
//! struct Uart;
//! impl SerialLink for Uart {
//!     fn recv(&mut self) -> Option<u8> { unimplemented!() }
//!     fn poll(&mut self) -> Option<u8> { unimplemented!() }
//!     fn send(&mut self, _byte: u8) { unimplemented!() }
//! }
//!
//! struct Pins;
//! impl BusPort for Pins {
//!     fn configure(&mut self, _role: Role, _remote: bool) {}
//!     fn write_line(&mut self, _line: Line, _level: bool) {}
//!     fn read_line(&mut self, _line: Line) -> bool { true }
//!     fn drive_data(&mut self, _wire: u8) {}
//!     fn read_data(&mut self) -> u8 { 0xff }
//!     fn settle(&mut self) {}
//!     fn hold_ms(&mut self, _ms: u16) {}
//! }
//!
//! static INDICATOR: BlinkCell = BlinkCell::new();
//!
//! let bus = Gpib::new(Pins);
//! let mut bridge = Bridge::new(bus, Uart, &INDICATOR, BridgeConfig::default());
//! bridge.run();
//! ```

mod ascii;
pub mod buffer;
pub mod bus;
pub mod editor;
mod help;
pub mod hex;
pub mod history;
pub mod indicator;
pub mod interp;
pub mod port;
pub mod serial;
pub mod types;

pub use buffer::{LineBuffer, LINE_CAP};
pub use bus::{Gpib, MsgBuffer, PollBudget, RxEnd, TransmitError, MSG_CAP};
pub use indicator::{BlinkCell, BlinkDriver, BlinkMode};
pub use interp::{Bridge, BridgeConfig, Command};
pub use port::{BusPort, Line, Role};
pub use serial::SerialLink;
pub use types::{addr, Address, IntoAddress, MsgEnd};
