#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use gpib_bridge::{BusPort, Line, Role, SerialLink};

/// How the simulated instrument answers the listener side of the handshake.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListenerSim {
    /// Completes every handshake and records the bytes.
    Responsive,
    /// Holds NRFD and NDAC low forever; transmits run out of budget.
    Deaf,
    /// Nobody driving the lines; the pull-ups leave both high and transmits
    /// fail the busy precondition.
    Absent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ListenerPhase {
    Ready,
    Accepted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TalkerPhase {
    Idle,
    DrivingByte,
}

/// Co-simulated GPIB segment: the far side of the three-wire handshake is
/// played out inside `read_line`/`write_line`, so the engine's polling
/// loops see a live peer without any threads.
///
/// All stored levels are wire levels, `true` = electrically high.
pub struct SimBus {
    // engine-driven state
    pub role: Option<Role>,
    pub remote: bool,
    data: u8,
    eoi: bool,
    dav: bool,
    nrfd: bool,
    ndac: bool,
    ifc: bool,
    atn: bool,
    pub ren: bool,

    // instrument-driven SRQ
    srq: bool,

    // instrument as listener
    pub listener: ListenerSim,
    listener_phase: ListenerPhase,
    listener_nrfd: bool,
    listener_ndac: bool,
    /// Bytes the instrument captured: (byte, end_marker, attention).
    pub captured: Vec<(u8, bool, bool)>,

    // instrument as talker
    talk_queue: VecDeque<(u8, bool)>,
    talker_phase: TalkerPhase,
    talker_dav: bool,
    talker_eoi: bool,
    talker_data: u8,

    // accounting
    pub nrfd_polls: u32,
    pub dav_polls: u32,
    pub held_ms: u32,
    pub ifc_pulses: u32,
    ifc_low: bool,
}

impl SimBus {
    pub fn new() -> Rc<RefCell<SimBus>> {
        Rc::new(RefCell::new(SimBus {
            role: None,
            remote: false,
            data: 0xff,
            eoi: true,
            dav: true,
            nrfd: true,
            ndac: true,
            ifc: true,
            atn: true,
            ren: true,
            srq: true,
            listener: ListenerSim::Responsive,
            listener_phase: ListenerPhase::Ready,
            listener_nrfd: true,
            listener_ndac: false,
            captured: Vec::new(),
            talk_queue: VecDeque::new(),
            talker_phase: TalkerPhase::Idle,
            talker_dav: true,
            talker_eoi: true,
            talker_data: 0xff,
            nrfd_polls: 0,
            dav_polls: 0,
            held_ms: 0,
            ifc_pulses: 0,
            ifc_low: false,
        }))
    }

    /// Queue a message for the instrument to talk; the end marker goes out
    /// with the final byte.
    pub fn queue_message(&mut self, bytes: &[u8]) {
        for (index, byte) in bytes.iter().enumerate() {
            self.talk_queue.push_back((*byte, index + 1 == bytes.len()));
        }
    }

    /// Queue bytes without an end marker anywhere.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.talk_queue.push_back((*byte, false));
        }
    }

    pub fn set_srq(&mut self, asserted: bool) {
        self.srq = !asserted;
    }

    /// Captured bytes without the per-byte line states.
    pub fn captured_bytes(&self) -> Vec<u8> {
        self.captured.iter().map(|entry| entry.0).collect()
    }

    pub fn eoi_level(&self) -> bool {
        self.eoi
    }

    pub fn dav_level(&self) -> bool {
        self.dav
    }

    pub fn atn_level(&self) -> bool {
        self.atn
    }

    fn wire_dav(&self) -> bool {
        match self.role {
            Some(Role::Listener) => self.talker_dav,
            _ => self.dav,
        }
    }

    fn wire_eoi(&self) -> bool {
        match self.role {
            Some(Role::Listener) => self.talker_eoi,
            _ => self.eoi,
        }
    }

    fn wire_nrfd(&self) -> bool {
        match self.role {
            Some(Role::Listener) => self.nrfd,
            _ => self.nrfd && self.listener_nrfd,
        }
    }

    fn wire_ndac(&self) -> bool {
        match self.role {
            Some(Role::Listener) => self.ndac,
            _ => self.ndac && self.listener_ndac,
        }
    }

    /// Advance the instrument state machines from the current wire levels.
    fn step(&mut self) {
        match self.listener {
            ListenerSim::Responsive => self.step_listener(),
            ListenerSim::Deaf => {
                self.listener_nrfd = false;
                self.listener_ndac = false;
            }
            ListenerSim::Absent => {
                self.listener_nrfd = true;
                self.listener_ndac = true;
            }
        }
        if self.role == Some(Role::Listener) {
            self.step_talker();
        }
    }

    fn step_listener(&mut self) {
        if self.role == Some(Role::Listener) {
            // a device doesn't listen to itself while the engine listens
            return;
        }
        match self.listener_phase {
            ListenerPhase::Ready => {
                if !self.dav {
                    let byte = !self.data;
                    let end_marker = !self.eoi;
                    let attention = !self.atn;
                    self.captured.push((byte, end_marker, attention));
                    self.listener_nrfd = false;
                    self.listener_ndac = true;
                    self.listener_phase = ListenerPhase::Accepted;
                }
            }
            ListenerPhase::Accepted => {
                if self.dav {
                    self.listener_ndac = false;
                    self.listener_nrfd = true;
                    self.listener_phase = ListenerPhase::Ready;
                }
            }
        }
    }

    fn step_talker(&mut self) {
        match self.talker_phase {
            TalkerPhase::Idle => {
                if self.nrfd {
                    if let Some((byte, end_marker)) = self.talk_queue.front().copied() {
                        self.talker_data = !byte;
                        self.talker_eoi = !end_marker;
                        self.talker_dav = false;
                        self.talker_phase = TalkerPhase::DrivingByte;
                    }
                }
            }
            TalkerPhase::DrivingByte => {
                if self.ndac {
                    self.talk_queue.pop_front();
                    self.talker_dav = true;
                    self.talker_eoi = true;
                    self.talker_phase = TalkerPhase::Idle;
                }
            }
        }
    }
}

/// The engine's handle to the simulated bus segment.
pub struct SimPort(Rc<RefCell<SimBus>>);

impl SimPort {
    pub fn new(bus: &Rc<RefCell<SimBus>>) -> SimPort {
        SimPort(bus.clone())
    }
}

impl BusPort for SimPort {
    fn configure(&mut self, role: Role, remote: bool) {
        let mut bus = self.0.borrow_mut();
        bus.role = Some(role);
        bus.remote = remote;
        // pull-up defaults for the lines the new role doesn't drive; an
        // idle listener parks NRFD/NDAC low
        let listener = role == Role::Listener;
        bus.nrfd = !listener;
        bus.ndac = !listener;
        bus.eoi = true;
        bus.dav = true;
        bus.ifc = true;
        bus.atn = true;
        bus.ren = !remote;
        bus.step();
    }

    fn write_line(&mut self, line: Line, level: bool) {
        let mut bus = self.0.borrow_mut();
        match line {
            Line::Eoi => bus.eoi = level,
            Line::Dav => bus.dav = level,
            Line::Nrfd => bus.nrfd = level,
            Line::Ndac => bus.ndac = level,
            Line::Ifc => {
                if !level {
                    bus.ifc_low = true;
                } else if bus.ifc_low {
                    bus.ifc_low = false;
                    bus.ifc_pulses += 1;
                }
                bus.ifc = level;
            }
            Line::Srq => bus.srq = level,
            Line::Atn => bus.atn = level,
            Line::Ren => bus.ren = level,
        }
        bus.step();
    }

    fn read_line(&mut self, line: Line) -> bool {
        let mut bus = self.0.borrow_mut();
        bus.step();
        match line {
            Line::Eoi => bus.wire_eoi(),
            Line::Dav => {
                bus.dav_polls += 1;
                bus.wire_dav()
            }
            Line::Nrfd => {
                bus.nrfd_polls += 1;
                bus.wire_nrfd()
            }
            Line::Ndac => bus.wire_ndac(),
            Line::Ifc => bus.ifc,
            Line::Srq => bus.srq,
            Line::Atn => bus.atn,
            Line::Ren => bus.ren,
        }
    }

    fn drive_data(&mut self, wire: u8) {
        let mut bus = self.0.borrow_mut();
        bus.data = wire;
        bus.step();
    }

    fn read_data(&mut self) -> u8 {
        let mut bus = self.0.borrow_mut();
        bus.step();
        match bus.role {
            Some(Role::Listener) => bus.talker_data,
            _ => bus.data,
        }
    }

    fn settle(&mut self) {
        self.0.borrow_mut().step();
    }

    fn hold_ms(&mut self, ms: u16) {
        let mut bus = self.0.borrow_mut();
        bus.held_ms += u32::from(ms);
        bus.step();
    }
}

/// Scripted host link, shared between the test and the bridge.
pub struct SerialScript {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    defer_polls: u32,
}

impl SerialScript {
    pub fn new(rx: &[u8]) -> Rc<RefCell<SerialScript>> {
        Rc::new(RefCell::new(SerialScript {
            rx: rx.iter().copied().collect(),
            tx: Vec::new(),
            defer_polls: 0,
        }))
    }

    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Make the next `count` polls come up empty, so a polling loop gets
    /// some iterations in before the script continues.
    pub fn defer_polls(&mut self, count: u32) {
        self.defer_polls = count;
    }

    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    pub fn tx_string(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }
}

pub struct ScriptLink(Rc<RefCell<SerialScript>>);

impl ScriptLink {
    pub fn new(script: &Rc<RefCell<SerialScript>>) -> ScriptLink {
        ScriptLink(script.clone())
    }
}

impl SerialLink for ScriptLink {
    fn recv(&mut self) -> Option<u8> {
        self.0.borrow_mut().rx.pop_front()
    }

    fn poll(&mut self) -> Option<u8> {
        let mut script = self.0.borrow_mut();
        if script.defer_polls > 0 {
            script.defer_polls -= 1;
            return None;
        }
        script.rx.pop_front()
    }

    fn send(&mut self, byte: u8) {
        self.0.borrow_mut().tx.push(byte);
    }
}
