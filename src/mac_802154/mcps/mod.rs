//! MAC Common Part Sublayer (MCPS) service primitives
//!
//! Requests are owned by the caller until handed to the MAC, asynchronous
//! requests are scheduled and serviced in a later [`tick`](crate::Mac::tick),
//! with the supplied callback invoked exactly once with the populated confirm.
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use bitflags::bitflags;

pub mod data;
pub use data::{DataRequest, DataConfirm, DataConfirmCb};

#[cfg(feature = "purge")]
pub mod purge;
#[cfg(feature = "purge")]
pub use purge::{PurgeRequest, PurgeConfirm, PurgeConfirmCb};

/// Service primitive kinds
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Primitive {
    McpsData,
    #[cfg(feature = "purge")]
    McpsPurge,
}

/// Request lifecycle, maintained by the MAC
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestState {
    /// Not yet serviced by the MAC
    Idle,
    /// Serviced, confirm populated
    Completed,
}

/// Service metadata embedded in each request, only modified by the MAC
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Service {
    primitive: Primitive,
    state: RequestState,
}

impl Service {
    pub(crate) fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            state: RequestState::Idle,
        }
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: RequestState) {
        self.state = state;
    }
}

bitflags! {
    /// MCPS-DATA.request transmission options
    pub struct TxOptions: u8 {
        /// Acknowledged transmission
        const ACK = 0x01;
        /// GTS transmission (unsupported)
        const GTS = 0x02;
        /// Indirect transmission, held until polled by the destination
        const INDIRECT = 0x04;
    }
}

impl Default for TxOptions {
    fn default() -> Self {
        TxOptions::empty()
    }
}
