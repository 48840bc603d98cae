//! MCPS-PURGE primitives (IEEE Std 802.15.4-2006 §7.1.1.4 - §7.1.1.5)
//!
//! Allows the next higher layer to remove a previously queued MSDU from the
//! transaction queue before it is transmitted. In addition to the standard
//! request / confirm approach, a synchronous [`Mac::purge`] is provided.
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use core::fmt::Debug;

use rand_core::RngCore;

use crate::log::{debug, info};
use crate::{Radio, error::CoreError, timer::Timer};

use super::{Service, Primitive, RequestState};
use crate::mac_802154::{Mac, MacStatus, TxState};
use crate::mac_802154::scheduler::Request;

/// MCPS-PURGE.confirm
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PurgeConfirm {
    /// The handle of the MSDU to be purged from the transaction queue
    pub msdu_handle: u8,
    /// Either [`MacStatus::Success`] or [`MacStatus::InvalidHandle`]
    pub status: MacStatus,
}

/// MCPS-PURGE.confirm callback
pub type PurgeConfirmCb = fn(&PurgeConfirm);

/// MCPS-PURGE.request
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PurgeRequest {
    service: Service,

    /// Confirmation to this request, populated by the MAC
    pub confirm: PurgeConfirm,

    /// The handle of the MSDU to be purged from the transaction queue
    pub msdu_handle: u8,
}

impl PurgeRequest {
    pub fn new(msdu_handle: u8) -> Self {
        Self {
            service: Service::new(Primitive::McpsPurge),
            confirm: PurgeConfirm {
                msdu_handle,
                status: MacStatus::InvalidHandle,
            },
            msdu_handle,
        }
    }

    /// Fetch request service metadata
    pub fn service(&self) -> &Service {
        &self.service
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
    /// MCPS-PURGE.request service
    ///
    /// Schedules the purge, `conf_cb` is called exactly once with the
    /// MCPS-PURGE.confirm from a subsequent [`tick`](crate::Mac::tick).
    /// If the request cannot be scheduled an error is returned and the
    /// callback is never called.
    pub fn purge_request(&mut self, req: PurgeRequest, conf_cb: PurgeConfirmCb) -> Result<(), CoreError<E>> {
        self.requests.post(Request::Purge(req, conf_cb))
            .map_err(|_| CoreError::RequestQueueFull)
    }

    /// Perform MCPS-PURGE.request directly (without the request / confirm approach)
    ///
    /// A transaction awaiting retransmission after a missed ACK has already
    /// been sent and is reported as [`MacStatus::InvalidHandle`].
    ///
    /// Previously scheduled requests are serviced first so that the purge
    /// observes the same queue an asynchronous purge would. The confirm is
    /// written to `req.confirm` and the status returned.
    pub fn purge(&mut self, req: &mut PurgeRequest) -> MacStatus {
        let now = self.timer.ticks_ms();

        self.service_requests(now);

        self.service_purge(req)
    }

    /// Remove the referenced MSDU from the transaction queue, or cancel it
    /// if it is in CSMA-CA backoff prior to its first transmission
    pub(crate) fn service_purge(&mut self, req: &mut PurgeRequest) -> MacStatus {
        let handle = req.msdu_handle;

        let status = if self.tx_queue.purge(handle).is_some() {
            MacStatus::Success

        } else if matches!(&self.tx_state, TxState::Backoff{tx, retries: 0, ..} if tx.handle == Some(handle)) {
            debug!("Cancelling CSMA backoff for MSDU {}", handle);
            self.tx_state = TxState::Idle;
            MacStatus::Success

        } else {
            MacStatus::InvalidHandle
        };

        match status {
            MacStatus::Success => {
                info!("Purged MSDU {}", handle);
                self.stats.purged = self.stats.purged.saturating_add(1);
            },
            _ => debug!("Purge failed, no pending MSDU {}", handle),
        }

        req.confirm = PurgeConfirm{
            msdu_handle: handle,
            status,
        };
        req.service.set_state(RequestState::Completed);

        status
    }
}
