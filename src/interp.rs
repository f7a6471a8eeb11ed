//! Command interpreter: the device context, one handler per command letter,
//! and the interactive / continuous-receive / printer loops.

use log::debug;

use crate::ascii::ESC;
use crate::bus::{Gpib, MsgBuffer, TransmitError, MSG_CAP};
use crate::editor::LineEditor;
use crate::help::HELP;
use crate::hex::{self, Framing};
use crate::history::History;
use crate::indicator::{BlinkCell, BlinkMode};
use crate::port::{BusPort, Role};
use crate::serial::SerialLink;
use crate::types::{Address, MsgEnd, UNLISTEN};

const PROMPT: &[u8] = b"<GPIB> ";
const OK: &[u8] = b"OK\r\n";
const TIMEOUT: &[u8] = b"TIMEOUT\r\n";
const ERROR: &[u8] = b"ERROR\r\n";
const WRONG_COMMAND: &[u8] = b"WRONG COMMAND\r\n";
const CRLF: &[u8] = b"\r\n";

/// Receive ceiling, leaving headroom for the one-byte length prefix framing.
const RECV_MAX: usize = MSG_CAP - 2;

/// Commands, keyed on the uppercased first byte of an accepted line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    /// `D` — transmit the line as device data.
    SendData,
    /// `M` — like `D`, without asserting the end marker.
    SendDataNoEnd,
    /// `C` — transmit the line with command framing (ATN asserted).
    SendCommand,
    /// `T` — transmit a hex-encoded payload, command or data framed.
    SendHex,
    /// `X` — receive until the end marker, report as text.
    ReceiveText,
    /// `Y` — receive until the end marker, report length byte plus raw bytes.
    ReceiveBinary,
    /// `Z` — receive until the end marker, report as hex.
    ReceiveHex,
    /// `P` — continuous receive (plotter mode) until ESC on the host link.
    ContinuousReceive,
    /// `R` — remote mode (REN asserted).
    Remote,
    /// `L` — local mode (REN released).
    Local,
    /// `I` — pulse interface clear.
    InterfaceClear,
    /// `S` — report remote/SRQ/listen flags.
    Status,
    /// `A` — report or set the bus address.
    SetAddress,
    /// `Q` — report or set the end-of-message policy.
    SetMsgEnd,
    /// `E` — report or set local echo.
    SetEcho,
    /// `H` — list the command history.
    ShowHistory,
    /// `?` — print the help block.
    ShowHelp,
    /// A bare carriage return; redraws the prompt and nothing else.
    Empty,
    /// Anything else; answered with `WRONG COMMAND`.
    Unknown(u8),
}

impl Command {
    /// Map an accepted line to the command its first byte selects.
    pub fn from_line(line: &[u8]) -> Command {
        let first = match line.first() {
            Some(byte) => byte.to_ascii_uppercase(),
            None => return Command::Empty,
        };
        match first {
            b'D' => Command::SendData,
            b'M' => Command::SendDataNoEnd,
            b'C' => Command::SendCommand,
            b'T' => Command::SendHex,
            b'X' => Command::ReceiveText,
            b'Y' => Command::ReceiveBinary,
            b'Z' => Command::ReceiveHex,
            b'P' => Command::ContinuousReceive,
            b'R' => Command::Remote,
            b'L' => Command::Local,
            b'I' => Command::InterfaceClear,
            b'S' => Command::Status,
            b'A' => Command::SetAddress,
            b'Q' => Command::SetMsgEnd,
            b'E' => Command::SetEcho,
            b'H' => Command::ShowHistory,
            b'?' => Command::ShowHelp,
            other => Command::Unknown(other),
        }
    }

    /// Whether a line carrying this command belongs in the recall ring.
    fn saves_history(self) -> bool {
        !matches!(
            self,
            Command::ShowHistory | Command::Empty | Command::Unknown(_)
        )
    }
}

/// Startup configuration, sampled by the embedding firmware.
#[derive(Debug, Copy, Clone)]
pub struct BridgeConfig {
    /// Bus address used for listen/unlisten token recognition.
    pub address: Address,
    /// Initial local-echo state (a strap pin on the reference hardware).
    pub echo: bool,
    /// Start in printer mode: forward bus traffic to the host forever,
    /// bypassing the interpreter (a second strap pin).
    pub printer_mode: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            address: Address::DEFAULT,
            echo: true,
            printer_mode: false,
        }
    }
}

/// The bridge device: context state plus the seams it drives.
pub struct Bridge<'a, P, S> {
    bus: Gpib<P>,
    serial: S,
    indicator: &'a BlinkCell,
    editor: LineEditor,
    history: History,
    msg: MsgBuffer,
    address: Address,
    msg_end: MsgEnd,
    listen_mode: bool,
    printer_mode: bool,
}

impl<'a, P: BusPort, S: SerialLink> Bridge<'a, P, S> {
    pub fn new(bus: Gpib<P>, serial: S, indicator: &'a BlinkCell, config: BridgeConfig) -> Self {
        Bridge {
            bus,
            serial,
            indicator,
            editor: LineEditor::new(config.echo),
            history: History::new(),
            msg: MsgBuffer::new(),
            address: config.address,
            msg_end: MsgEnd::default(),
            listen_mode: false,
            printer_mode: config.printer_mode,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn listen_mode(&self) -> bool {
        self.listen_mode
    }

    pub fn msg_end(&self) -> MsgEnd {
        self.msg_end
    }

    pub fn echo(&self) -> bool {
        self.editor.echo()
    }

    /// Run the device. The printer-mode strap bypasses the interpreter
    /// entirely; otherwise prompt cycles repeat until the host link closes.
    pub fn run(&mut self) {
        if self.printer_mode {
            self.run_printer();
        }
        while self.prompt_cycle() {}
    }

    /// One prompt/edit/dispatch cycle. Returns false once the host link is
    /// gone.
    pub fn prompt_cycle(&mut self) -> bool {
        self.editor.reset_recall(&self.history);
        if self.editor.echo() && self.editor.line().is_empty() {
            self.serial.send_all(PROMPT);
        }
        loop {
            let byte = match self.serial.recv() {
                Some(byte) => byte,
                None => return false,
            };
            if self.editor.feed(byte, &mut self.serial, &self.history) {
                break;
            }
        }

        let command = Command::from_line(self.editor.line().as_bytes());
        debug!("dispatch {:?}", command);
        self.dispatch(command);

        if command.saves_history() {
            self.history.save(self.editor.line().as_bytes());
        }
        self.editor.clear();
        true
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::SendData => self.cmd_send_data(true),
            Command::SendDataNoEnd => self.cmd_send_data(false),
            Command::SendCommand => self.cmd_send_command(),
            Command::SendHex => self.cmd_send_hex(),
            Command::ReceiveText => self.cmd_receive_text(),
            Command::ReceiveBinary => self.cmd_receive_binary(),
            Command::ReceiveHex => self.cmd_receive_hex(),
            Command::ContinuousReceive => self.cmd_continuous_receive(),
            Command::Remote => self.cmd_remote(true),
            Command::Local => self.cmd_remote(false),
            Command::InterfaceClear => self.cmd_interface_clear(),
            Command::Status => self.cmd_status(),
            Command::SetAddress => self.cmd_address(),
            Command::SetMsgEnd => self.cmd_msg_end(),
            Command::SetEcho => self.cmd_echo(),
            Command::ShowHistory => self.cmd_history(),
            Command::ShowHelp => self.cmd_help(),
            Command::Empty => {}
            Command::Unknown(_) => self.serial.send_all(WRONG_COMMAND),
        }
    }

    fn send_transmit_status(&mut self, result: Result<(), TransmitError>) {
        match result {
            Ok(()) => self.serial.send_all(OK),
            Err(_) => self.serial.send_all(TIMEOUT),
        }
    }

    fn set_listen_mode(&mut self, listen: bool) {
        if listen != self.listen_mode {
            debug!("listen mode {}", listen);
        }
        self.listen_mode = listen;
        self.indicator.set(if listen {
            BlinkMode::Fast
        } else {
            BlinkMode::Off
        });
    }

    /// `D` / `M` — transmit the line as data, with the end-of-message bytes
    /// appended for the transfer and trimmed back off afterwards.
    fn cmd_send_data(&mut self, end_marker: bool) {
        if self.listen_mode {
            // an addressed listener must not originate data
            self.serial.send_all(ERROR);
            return;
        }
        let trailer_len = self.msg_end.bytes().len();
        self.editor.line_mut().append_end(self.msg_end.bytes());
        let result = self.bus.transmit(&self.editor.line().as_bytes()[1..], end_marker);
        self.editor.line_mut().trim_end(trailer_len);
        self.send_transmit_status(result);
    }

    /// `C` — transmit the line with command framing, tracking our own
    /// listen/unlisten tokens in the traffic.
    fn cmd_send_command(&mut self) {
        if let Some(listen) =
            listen_state_change(&self.editor.line().as_bytes()[1..], self.address)
        {
            self.set_listen_mode(listen);
        }

        let trailer_len = self.msg_end.bytes().len();
        self.editor.line_mut().append_end(self.msg_end.bytes());

        self.bus.set_role(Role::Controller);
        self.bus.set_attention(true);
        let result = self.bus.transmit(&self.editor.line().as_bytes()[1..], true);
        self.send_transmit_status(result);
        self.bus.set_attention(false);

        self.editor.line_mut().trim_end(trailer_len);

        if self.listen_mode {
            self.bus.set_role(Role::Listener);
        } else {
            self.bus.set_role(Role::Controller);
        }
    }

    /// `T` — decode a hex payload and transmit it with the framing the tag
    /// selects.
    fn cmd_send_hex(&mut self) {
        let message = match hex::parse(&self.editor.line().as_bytes()[1..]) {
            Ok(message) => message,
            Err(_) => {
                self.serial.send_all(ERROR);
                return;
            }
        };
        match message.framing {
            Framing::Data => {
                let result = self.bus.transmit(&message.bytes, message.end_marker);
                self.send_transmit_status(result);
            }
            Framing::Command => {
                // The token scan runs over the decoded payload, listen and
                // unlisten side alike.
                if let Some(listen) = listen_state_change(&message.bytes, self.address) {
                    self.set_listen_mode(listen);
                }

                self.bus.set_role(Role::Controller);
                self.bus.set_attention(true);
                let result = self.bus.transmit(&message.bytes, true);
                self.send_transmit_status(result);
                self.bus.set_attention(false);

                if self.listen_mode {
                    self.bus.set_role(Role::Listener);
                } else {
                    self.bus.set_role(Role::Controller);
                }
            }
        }
    }

    /// `R` / `L` — remote/local state, mirrored on the REN line.
    fn cmd_remote(&mut self, remote: bool) {
        self.bus.set_remote(remote);
        self.serial.send_all(OK);
    }

    /// `I` — pulse interface clear; a listening bridge returns to idle.
    fn cmd_interface_clear(&mut self) {
        self.bus.pulse_interface_clear();
        if self.listen_mode {
            self.set_listen_mode(false);
            self.bus.set_role(Role::Controller);
        }
        self.serial.send_all(OK);
    }

    /// `S` — remote, service-request and listen flags as three digits.
    fn cmd_status(&mut self) {
        let flags = [
            flag_digit(self.bus.remote()),
            flag_digit(self.bus.service_request()),
            flag_digit(self.listen_mode),
        ];
        self.serial.send_all(&flags);
        self.serial.send_all(CRLF);
    }

    /// `P` — continuous receive until ESC arrives on the host link. Any
    /// other host byte is consumed and discarded.
    fn cmd_continuous_receive(&mut self) {
        self.set_listen_mode(false);
        self.indicator.set(BlinkMode::Slow);
        self.bus.set_role(Role::Listener);
        self.bus.hold_ms(1);

        loop {
            if let Some(ESC) = self.serial.poll() {
                break;
            }
            self.bus.receive(&mut self.msg, RECV_MAX);
            if self.msg.is_empty() {
                self.bus.hold_ms(10);
            } else {
                self.serial.send_all(&self.msg);
            }
        }

        self.bus.set_role(Role::Controller);
        self.indicator.set(BlinkMode::Off);
    }

    /// Receive commands borrow listener electrics unless the bridge is
    /// already an addressed listener.
    fn enter_listener(&mut self) {
        if !self.listen_mode {
            self.bus.set_role(Role::Listener);
            self.bus.hold_ms(1);
        }
    }

    fn leave_listener(&mut self) {
        if !self.listen_mode {
            self.bus.set_role(Role::Controller);
        }
    }

    /// `X` — receive a message, report it as text.
    fn cmd_receive_text(&mut self) {
        self.enter_listener();
        self.bus.receive_until_end(&mut self.msg, RECV_MAX);
        if self.msg.is_empty() {
            self.serial.send_all(TIMEOUT);
        } else {
            self.serial.send_all(&self.msg);
        }
        self.leave_listener();
    }

    /// `Y` — receive a message, report a length byte plus the raw bytes.
    fn cmd_receive_binary(&mut self) {
        self.enter_listener();
        self.bus.receive_until_end(&mut self.msg, RECV_MAX);
        self.serial.send(self.msg.len() as u8);
        self.serial.send_all(&self.msg);
        self.leave_listener();
    }

    /// `Z` — receive a message, report length and payload as hex.
    fn cmd_receive_hex(&mut self) {
        self.enter_listener();
        self.bus.receive_until_end(&mut self.msg, RECV_MAX);
        send_hex(&mut self.serial, self.msg.len() as u8);
        for index in 0..self.msg.len() {
            send_hex(&mut self.serial, self.msg[index]);
        }
        self.serial.send_all(CRLF);
        self.leave_listener();
    }

    /// `A` — report the address, or set it from a two-digit argument.
    fn cmd_address(&mut self) {
        let (len, tens, ones) = {
            let line = self.editor.line().as_bytes();
            (line.len(), line.get(1).copied(), line.get(2).copied())
        };
        match (len, tens, ones) {
            (1, ..) => {
                send_padded(&mut self.serial, *self.address);
                self.serial.send_all(CRLF);
            }
            (3, Some(tens @ b'0'..=b'9'), Some(ones @ b'0'..=b'9')) => {
                match Address::new((tens - b'0') * 10 + (ones - b'0')) {
                    Ok(address) => {
                        self.address = address;
                        self.serial.send_all(OK);
                    }
                    Err(_) => self.serial.send_all(ERROR),
                }
            }
            _ => self.serial.send_all(ERROR),
        }
    }

    /// `Q` — report the end-of-message policy, or set it from a digit.
    fn cmd_msg_end(&mut self) {
        let (len, arg) = {
            let line = self.editor.line().as_bytes();
            (line.len(), line.get(1).copied())
        };
        match (len, arg) {
            (1, _) => {
                self.serial.send(self.msg_end.digit());
                self.serial.send_all(CRLF);
            }
            (2, Some(digit)) => match MsgEnd::from_digit(digit) {
                Ok(policy) => {
                    self.msg_end = policy;
                    self.serial.send_all(OK);
                }
                Err(_) => self.serial.send_all(ERROR),
            },
            _ => self.serial.send_all(ERROR),
        }
    }

    /// `E` — report the echo flag, or set it from `0`/`1`.
    fn cmd_echo(&mut self) {
        let (len, arg) = {
            let line = self.editor.line().as_bytes();
            (line.len(), line.get(1).copied())
        };
        match (len, arg) {
            (1, _) => {
                self.serial.send(flag_digit(self.editor.echo()));
                self.serial.send_all(CRLF);
            }
            (2, Some(b'0')) => {
                self.editor.set_echo(false);
                self.serial.send_all(OK);
            }
            (2, Some(b'1')) => {
                self.editor.set_echo(true);
                self.serial.send_all(OK);
            }
            _ => self.serial.send_all(ERROR),
        }
    }

    /// `H` — list the recall ring, oldest first.
    fn cmd_history(&mut self) {
        for index in 0..self.history.len() {
            send_decimal(&mut self.serial, index as u8);
            self.serial.send_all(b": ");
            if let Some(line) = self.history.get(index) {
                self.serial.send_all(line);
            }
            self.serial.send_all(CRLF);
        }
    }

    /// `?` — the static help block.
    fn cmd_help(&mut self) {
        for line in HELP {
            self.serial.send_all(line.as_bytes());
        }
    }

    /// Enter printer mode: listener electrics and a slow blink.
    pub fn enter_printer(&mut self) {
        self.indicator.set(BlinkMode::Slow);
        self.bus.set_role(Role::Listener);
        self.bus.hold_ms(1);
    }

    /// One forward pass of printer mode: receive a chunk, stream it to the
    /// host, back off briefly when the bus is quiet.
    pub fn printer_cycle(&mut self) {
        self.bus.receive(&mut self.msg, RECV_MAX);
        if self.msg.is_empty() {
            self.bus.hold_ms(10);
        } else {
            self.serial.send_all(&self.msg);
        }
    }

    /// Printer mode never returns: the strap has to be changed and the
    /// device restarted.
    pub fn run_printer(&mut self) -> ! {
        self.enter_printer();
        loop {
            self.printer_cycle();
        }
    }
}

/// Scan command-framed traffic for the bridge's listen/unlisten tokens.
/// The last matching token wins; `None` means no token was present.
fn listen_state_change(bytes: &[u8], address: Address) -> Option<bool> {
    let mut change = None;
    for byte in bytes {
        if *byte == UNLISTEN || *byte == address.talk_token() {
            change = Some(false);
        } else if *byte == address.listen_token() {
            change = Some(true);
        }
    }
    change
}

fn flag_digit(flag: bool) -> u8 {
    if flag {
        b'1'
    } else {
        b'0'
    }
}

fn send_decimal<S: SerialLink>(serial: &mut S, value: u8) {
    if value >= 10 {
        serial.send(b'0' + value / 10);
    }
    serial.send(b'0' + value % 10);
}

/// Two-digit zero-padded decimal, for the address report.
fn send_padded<S: SerialLink>(serial: &mut S, value: u8) {
    serial.send(b'0' + value / 10);
    serial.send(b'0' + value % 10);
}

fn send_hex<S: SerialLink>(serial: &mut S, byte: u8) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    serial.send(DIGITS[(byte >> 4) as usize]);
    serial.send(DIGITS[(byte & 0x0f) as usize]);
}
