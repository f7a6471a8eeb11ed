//! Interactive demo: the bridge on stdin/stdout, wired to a simulated
//! instrument that echoes back whatever data it is sent.
//!
//! Try `Dhello`, then `X` to read the echo. `--no-echo` and `--printer`
//! stand in for the two hardware strap pins; a bare number sets the address.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::mpsc;
use std::thread;

use gpib_bridge::{
    Address, BlinkCell, Bridge, BridgeConfig, BusPort, Gpib, Line, Role, SerialLink,
};

static INDICATOR: BlinkCell = BlinkCell::new();

fn main() {
    let mut config = BridgeConfig::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--printer" => config.printer_mode = true,
            "--no-echo" => config.echo = false,
            other => {
                let address = other
                    .parse::<u8>()
                    .ok()
                    .and_then(|n| Address::new(n).ok())
                    .expect("expected --printer, --no-echo or an address 0-30");
                config.address = address;
            }
        }
    }

    let bus = Gpib::new(EchoInstrument::new());
    let mut bridge = Bridge::new(bus, StdioLink::new(), &INDICATOR, config);
    bridge.run();
}

/// Host link over stdin/stdout. A reader thread feeds a channel so the
/// plotter-mode escape poll has something non-blocking to look at.
struct StdioLink {
    rx: mpsc::Receiver<u8>,
}

impl StdioLink {
    fn new() -> StdioLink {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 1];
            while let Ok(1) = stdin.read(&mut buf) {
                if tx.send(buf[0]).is_err() {
                    break;
                }
            }
        });
        StdioLink { rx }
    }
}

impl SerialLink for StdioLink {
    fn recv(&mut self) -> Option<u8> {
        self.rx.recv().ok()
    }

    fn poll(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }

    fn send(&mut self, byte: u8) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}

/// One simulated instrument on the bus: it completes every handshake,
/// swallows command-framed bytes, and queues data bytes to be talked back.
struct EchoInstrument {
    role: Role,
    // engine-driven wire levels
    data: u8,
    eoi: bool,
    dav: bool,
    nrfd: bool,
    ndac: bool,
    atn: bool,
    ren: bool,
    ifc: bool,
    // instrument listener side
    accepted: bool,
    inst_nrfd: bool,
    inst_ndac: bool,
    // instrument talker side
    echo_queue: VecDeque<(u8, bool)>,
    driving: bool,
    talk_dav: bool,
    talk_eoi: bool,
    talk_data: u8,
}

impl EchoInstrument {
    fn new() -> EchoInstrument {
        EchoInstrument {
            role: Role::Controller,
            data: 0xff,
            eoi: true,
            dav: true,
            nrfd: true,
            ndac: true,
            atn: true,
            ren: true,
            ifc: true,
            accepted: false,
            inst_nrfd: true,
            inst_ndac: false,
            echo_queue: VecDeque::new(),
            driving: false,
            talk_dav: true,
            talk_eoi: true,
            talk_data: 0xff,
        }
    }

    fn step(&mut self) {
        if self.role == Role::Listener {
            // instrument talks the echo queue back
            if self.driving {
                if self.ndac {
                    self.echo_queue.pop_front();
                    self.talk_dav = true;
                    self.talk_eoi = true;
                    self.driving = false;
                }
            } else if self.nrfd {
                if let Some((byte, end)) = self.echo_queue.front().copied() {
                    self.talk_data = !byte;
                    self.talk_eoi = !end;
                    self.talk_dav = false;
                    self.driving = true;
                }
            }
        } else {
            // instrument listens to the engine
            if self.accepted {
                if self.dav {
                    self.inst_ndac = false;
                    self.inst_nrfd = true;
                    self.accepted = false;
                }
            } else if !self.dav {
                let byte = !self.data;
                if self.atn {
                    // data byte: queue it for the echo
                    self.echo_queue.push_back((byte, !self.eoi));
                }
                self.inst_nrfd = false;
                self.inst_ndac = true;
                self.accepted = true;
            }
        }
    }
}

impl BusPort for EchoInstrument {
    fn configure(&mut self, role: Role, remote: bool) {
        self.role = role;
        let listener = role == Role::Listener;
        self.nrfd = !listener;
        self.ndac = !listener;
        self.eoi = true;
        self.dav = true;
        self.atn = true;
        self.ifc = true;
        self.ren = !remote;
        self.step();
    }

    fn write_line(&mut self, line: Line, level: bool) {
        match line {
            Line::Eoi => self.eoi = level,
            Line::Dav => self.dav = level,
            Line::Nrfd => self.nrfd = level,
            Line::Ndac => self.ndac = level,
            Line::Ifc => self.ifc = level,
            Line::Atn => self.atn = level,
            Line::Ren => self.ren = level,
            Line::Srq => {}
        }
        self.step();
    }

    fn read_line(&mut self, line: Line) -> bool {
        self.step();
        match line {
            Line::Eoi => {
                if self.role == Role::Listener {
                    self.talk_eoi
                } else {
                    self.eoi
                }
            }
            Line::Dav => {
                if self.role == Role::Listener {
                    self.talk_dav
                } else {
                    self.dav
                }
            }
            Line::Nrfd => {
                if self.role == Role::Listener {
                    self.nrfd
                } else {
                    self.nrfd && self.inst_nrfd
                }
            }
            Line::Ndac => {
                if self.role == Role::Listener {
                    self.ndac
                } else {
                    self.ndac && self.inst_ndac
                }
            }
            Line::Ifc => self.ifc,
            Line::Atn => self.atn,
            Line::Ren => self.ren,
            Line::Srq => true,
        }
    }

    fn drive_data(&mut self, wire: u8) {
        self.data = wire;
        self.step();
    }

    fn read_data(&mut self) -> u8 {
        self.step();
        if self.role == Role::Listener {
            self.talk_data
        } else {
            self.data
        }
    }

    fn settle(&mut self) {
        self.step();
    }

    fn hold_ms(&mut self, ms: u16) {
        thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
        self.step();
    }
}
