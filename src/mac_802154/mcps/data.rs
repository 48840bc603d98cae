//! MCPS-DATA primitives (IEEE Std 802.15.4-2006 §7.1.1.1 - §7.1.1.3)
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use core::fmt::Debug;

use ieee802154::mac::{Address, AddressMode};
use heapless::Vec;
use rand_core::RngCore;

use crate::log::{debug, warn};
use crate::{Radio, error::CoreError, timer::Timer};

use super::{Service, Primitive, RequestState, TxOptions};
use crate::mac_802154::{Mac, MacStatus, Packet, packet::MAX_MSDU_LEN};
use crate::mac_802154::queue::Transaction;
use crate::mac_802154::scheduler::Request;

/// MCPS-DATA.confirm
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataConfirm {
    /// Handle of the MSDU this confirm reports on
    pub msdu_handle: u8,
    /// Result of the transmission
    pub status: MacStatus,
    /// Time of completion in ms (set for successful transmissions)
    pub timestamp: Option<u64>,
}

/// MCPS-DATA.confirm callback
pub type DataConfirmCb = fn(&DataConfirm);

/// MCPS-DATA.request
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    service: Service,

    /// Confirmation for this request, populated by the MAC
    pub confirm: DataConfirm,

    /// Source addressing mode
    pub src_addr_mode: AddressMode,
    /// Destination address (including PAN ID)
    pub dst: Address,
    /// Handle of the MSDU, used to correlate confirms and purges
    pub msdu_handle: u8,
    /// Transmission options
    pub tx_options: TxOptions,

    msdu: Vec<u8, MAX_MSDU_LEN>,
}

impl DataRequest {
    /// Create a new data request using extended source addressing,
    /// fails with [`MacStatus::FrameTooLong`] for oversized MSDUs
    pub fn new(dst: Address, msdu: &[u8], msdu_handle: u8, tx_options: TxOptions) -> Result<Self, MacStatus> {
        let msdu = Vec::from_slice(msdu).map_err(|_| MacStatus::FrameTooLong)?;

        Ok(Self {
            service: Service::new(Primitive::McpsData),
            confirm: DataConfirm {
                msdu_handle,
                status: MacStatus::Success,
                timestamp: None,
            },
            src_addr_mode: AddressMode::Extended,
            dst,
            msdu_handle,
            tx_options,
            msdu,
        })
    }

    /// Fetch request service metadata
    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn msdu(&self) -> &[u8] {
        &self.msdu
    }
}

impl <R, S, I, E, T, G> Mac<R, S, I, E, T, G>
where
    R: Radio<S, I, E>,
    S: radio::RadioState,
    I: radio::ReceiveInfo + Default + Debug,
    E: Debug,
    T: Timer,
    G: RngCore,
{
    /// MCPS-DATA.request service
    ///
    /// Schedules the request, `conf_cb` is called with the MCPS-DATA.confirm
    /// once the MSDU has been transmitted or has failed.
    pub fn data_request(&mut self, req: DataRequest, conf_cb: DataConfirmCb) -> Result<(), CoreError<E>> {
        self.requests.post(Request::Data(req, conf_cb))
            .map_err(|_| CoreError::RequestQueueFull)
    }

    /// Service a scheduled data request, returning the status if the
    /// request completes immediately
    pub(crate) fn service_data(&mut self, now: u64, req: &mut DataRequest, conf_cb: DataConfirmCb) -> Option<MacStatus> {
        let status = match self.enqueue_data(now, req, conf_cb) {
            Ok(()) => {
                debug!("Queued MSDU {} for {:?}", req.msdu_handle, req.dst);
                return None
            },
            Err(s) => s,
        };

        warn!("Data request for MSDU {} failed: {:?}", req.msdu_handle, status);

        req.confirm = DataConfirm{
            msdu_handle: req.msdu_handle,
            status,
            timestamp: None,
        };
        req.service.set_state(RequestState::Completed);

        Some(status)
    }

    fn enqueue_data(&mut self, now: u64, req: &DataRequest, conf_cb: DataConfirmCb) -> Result<(), MacStatus> {
        if req.tx_options.contains(TxOptions::GTS) {
            return Err(MacStatus::InvalidParameter);
        }

        let src = self.source_addr(req.src_addr_mode)
            .ok_or(MacStatus::InvalidParameter)?;

        if self.tx_queue.is_full() {
            return Err(MacStatus::TransactionOverflow);
        }

        let ack = req.tx_options.contains(TxOptions::ACK);
        let packet = Packet::data(req.dst, src, self.seq(), req.msdu(), ack)
            .map_err(|_| MacStatus::FrameTooLong)?;

        let t = match req.tx_options.contains(TxOptions::INDIRECT) {
            true => Transaction::indirect(Some(req.msdu_handle), packet, self.config.transaction_expiry(now), Some(conf_cb)),
            false => Transaction::direct(Some(req.msdu_handle), packet, Some(conf_cb)),
        };

        self.tx_queue.push(t).map_err(|_| MacStatus::TransactionOverflow)
    }

    /// Resolve our address for the requested source addressing mode
    fn source_addr(&self, mode: AddressMode) -> Option<Address> {
        match mode {
            AddressMode::None => Some(Address::None),
            AddressMode::Short => self.short_addr.map(|s| Address::Short(self.config.pan_id, s)),
            AddressMode::Extended => Some(Address::Extended(self.config.pan_id, self.address)),
        }
    }
}
