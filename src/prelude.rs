//! LPWAN MCPS crate prelude
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

pub use crate::{Radio, RawPacket, RxInfo, Mac};

pub use crate::error::CoreError;
pub use crate::timer::{Timer as MacTimer};

pub use crate::base::{Base as MacBase, BaseState as MacBaseState};

pub use crate::mac_802154::{self, Mac as Mac802154, MacStatus, MacStats, TxOptions};
pub use crate::mac_802154::{DataRequest, DataConfirm, DataConfirmCb};
#[cfg(feature = "purge")]
pub use crate::mac_802154::{PurgeRequest, PurgeConfirm, PurgeConfirmCb};

pub use ieee802154::mac::{Address as MacAddress, PanId, AddressMode, ShortAddress, ExtendedAddress};
