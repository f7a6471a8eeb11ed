//! The electrical seam between the handshake engine and the GPIO hardware.
//!
//! Everything below this trait is wire level: `true` is electrically high.
//! GPIB control lines are active low and the data lines carry the one's
//! complement of the logical byte; both mappings are the engine's business,
//! so implementations only move levels between the bus and the pins.

/// GPIB management and handshake lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Line {
    /// End-or-identify: pulled low by the talker on the last byte of a message.
    Eoi,
    /// Data valid: pulled low by the talker once the data lines are settled.
    Dav,
    /// Not ready for data: high while every listener can take the next byte.
    Nrfd,
    /// Not data accepted: high once every listener has latched the byte.
    Ndac,
    /// Interface clear: pulsed low by the controller to reset the bus.
    Ifc,
    /// Service request: pulled low by a device needing attention.
    Srq,
    /// Attention: low while command (addressing) bytes are on the bus.
    Atn,
    /// Remote enable: low while instruments are held in remote state.
    Ren,
}

/// Electrical direction set for the data and handshake lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    /// Talker/controller electrics: drives the data lines, DAV and EOI,
    /// senses NRFD and NDAC.
    Controller,
    /// Listener electrics: senses the data lines, DAV and EOI, drives NRFD
    /// and NDAC.
    Listener,
}

/// GPIO access as the handshake engine needs it.
pub trait BusPort {
    /// Reconfigure line directions for `role`. REN must be re-driven from
    /// `remote` in the same operation so a role switch never glitches it.
    fn configure(&mut self, role: Role, remote: bool);

    /// Drive a controller-owned line to the given wire level.
    fn write_line(&mut self, line: Line, level: bool);

    /// Sample a line's wire level.
    fn read_line(&mut self, line: Line) -> bool;

    /// Drive the eight data lines with raw wire levels.
    fn drive_data(&mut self, wire: u8);

    /// Sample the eight data lines' raw wire levels.
    fn read_data(&mut self) -> u8;

    /// Data settling delay, on the order of 100 microseconds.
    fn settle(&mut self);

    /// Millisecond-scale delay for IFC pulses and mode changes.
    fn hold_ms(&mut self, ms: u16);
}
