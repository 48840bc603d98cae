//! MAC engine errors
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use crate::mac_802154::Packet;

/// MAC engine errors, generic over the underlying radio error
///
/// These cover faults in driving the MAC itself, the outcome of MCPS
/// primitives is reported via [`MacStatus`](crate::mac_802154::MacStatus)
/// in the associated confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError<E> {
    /// Transaction queue full
    BufferFull(Packet),

    /// Request queue full, the primitive was not scheduled
    RequestQueueFull,

    /// Payload exceeds the maximum MSDU length
    PayloadTooLong(usize),

    /// Wrapper for unhandled / underlying radio errors
    Radio(E),

    /// Radio busy
    Busy,
}
