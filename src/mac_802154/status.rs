//! MAC enumeration / status codes
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use strum::{Display, EnumIter, FromRepr};

/// MAC status codes returned in primitive confirmations
///
/// Values per IEEE Std 802.15.4-2006 Table 78
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumIter, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MacStatus {
    /// The requested operation was completed successfully
    Success = 0x00,
    /// Synchronization with a coordinator was lost
    BeaconLoss = 0xe0,
    /// Transmission failed due to activity on the channel
    ChannelAccessFailure = 0xe1,
    /// The frame exceeds the maximum frame size
    FrameTooLong = 0xe5,
    /// No MSDU with the requested handle was found in the transaction queue
    InvalidHandle = 0xe7,
    /// A parameter was out of range or not supported
    InvalidParameter = 0xe8,
    /// No acknowledgement was received after the maximum number of retries
    NoAck = 0xe9,
    /// The transaction expired before it was polled
    TransactionExpired = 0xf0,
    /// There is no capacity to store the transaction
    TransactionOverflow = 0xf1,
}

impl MacStatus {
    pub fn is_success(&self) -> bool {
        *self == MacStatus::Success
    }
}

impl From<MacStatus> for u8 {
    fn from(s: MacStatus) -> u8 {
        s as u8
    }
}

impl core::convert::TryFrom<u8> for MacStatus {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        MacStatus::from_repr(v).ok_or(v)
    }
}

#[cfg(test)]
mod test {
    use core::convert::TryFrom;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(u8::from(MacStatus::Success), 0x00);
        assert_eq!(u8::from(MacStatus::InvalidHandle), 0xe7);
        assert_eq!(u8::from(MacStatus::TransactionOverflow), 0xf1);

        for s in MacStatus::iter() {
            assert_eq!(MacStatus::try_from(u8::from(s)), Ok(s));
        }

        assert_eq!(MacStatus::try_from(0x42), Err(0x42));
        assert!(MacStatus::Success.is_success());
        assert!(!MacStatus::NoAck.is_success());
    }

    #[test]
    fn status_display() {
        use std::string::ToString;

        assert_eq!(MacStatus::InvalidHandle.to_string(), "InvalidHandle");
    }
}
