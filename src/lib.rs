//! IEEE 802.15.4 MAC Common Part Sublayer (MCPS) for rust IoT devices
//!
//! Provides a poll-driven 802.15.4 MAC with a transaction queue and the
//! MCPS-DATA and MCPS-PURGE service primitives (IEEE Std 802.15.4-2006 §7.1.1).
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

#![no_std]

use core::fmt::Debug;

use radio::{State, Busy, Transmit, Receive, Rssi, ReceiveInfo};

use ieee802154::mac::Address;

#[cfg(any(test, feature="std"))]
extern crate std;

pub mod log;

pub mod timer;

pub mod base;

pub mod error;

pub mod mac_802154;

pub mod prelude;


/// Statically sized packet buffer
#[derive(Clone, Debug, PartialEq)]
pub struct RawPacket {
    pub data: [u8; 256],
    pub len: usize,
    pub rssi: i16,
}

impl Default for RawPacket {
    fn default() -> Self {
        Self {
            data: [0u8; 256],
            len: 0,
            rssi: 0,
        }
    }
}

impl RawPacket {
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// Information associated with a received MSDU (MCPS-DATA.indication)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxInfo {
    /// Source address of the received frame
    pub source: Address,
    /// Receive signal strength
    pub rssi: i16,
}

/// Generic MAC interface, used by higher layers that do not care about
/// MSDU handles or confirmations
pub trait Mac<Addr = Address> {
    type Error;

    /// Enqueue a payload for transmission
    fn transmit(&mut self, dest: Addr, data: &[u8], ack: bool) -> Result<(), Self::Error>;

    /// Fetch a received payload (if available), returning the length and receive info
    fn receive(&mut self, data: &mut [u8]) -> Result<Option<(usize, RxInfo)>, Self::Error>;

    /// Check whether the MAC is able to accept new transmissions
    fn busy(&mut self) -> Result<bool, Self::Error>;

    /// Update the MAC state, must be called periodically
    fn tick(&mut self) -> Result<(), Self::Error>;
}

/// Radio interface combines `radio` traits
pub trait Radio<S: radio::RadioState, I: radio::ReceiveInfo, E: Debug>: radio::State<State=S, Error=E> + radio::Busy<Error=E> + radio::Transmit<Error=E> + radio::Receive<Info=I, Error=E> + radio::Rssi<Error=E> {}

/// Default Radio impl for radio devices
impl <T, S: radio::RadioState, I: ReceiveInfo, E: Debug> Radio<S, I, E> for T where
    T: State<State=S, Error=E> + Busy<Error=E> + Transmit<Error=E> + Receive<Info=I, Error=E> + Rssi<Error=E>,
{}
