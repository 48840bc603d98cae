//! 802.15.4 MAC Implementation
//!
//! Non-beacon (unslotted CSMA-CA) MAC providing the MCPS-DATA and MCPS-PURGE
//! services over a [`Radio`]. The MAC is poll driven, [`tick`](MacIf::tick)
//! must be called regularly to service requests and progress transmissions.
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use core::fmt::Debug;

use ieee802154::mac::{Address, ExtendedAddress, FrameContent, PanId, ShortAddress, WriteFooter};
use heapless::spsc::Queue;
use rand_core::RngCore;

use crate::log::{trace, debug, info, warn, error};
use crate::{Mac as MacIf, Radio, RawPacket, RxInfo, error::CoreError, timer::Timer};
use crate::base::{Base, BaseEvent};

pub mod config;
pub use config::Config;

pub mod packet;
pub use packet::{Packet, MAX_MSDU_LEN};

pub mod status;
pub use status::MacStatus;

pub mod queue;
pub use queue::{Transaction, TransactionQueue, TX_QUEUE_LEN};

pub mod scheduler;
use scheduler::{Scheduler, Request};

pub mod mcps;
pub use mcps::{DataRequest, DataConfirm, DataConfirmCb, TxOptions, RequestState};
#[cfg(feature = "purge")]
pub use mcps::{PurgeRequest, PurgeConfirm, PurgeConfirmCb};

/// Receive queue storage size
pub const RX_QUEUE_LEN: usize = 16;

/// Transmission state for the active transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TxState {
    Idle,
    /// Waiting out a CSMA-CA backoff prior to CCA
    Backoff {
        tx: Transaction,
        until: u64,
        nb: u8,
        be: u8,
        retries: u8,
    },
    /// Handed to the radio
    OnAir {
        tx: Transaction,
        retries: u8,
    },
    /// Transmitted, waiting for acknowledgement
    AwaitingAck {
        tx: Transaction,
        deadline: u64,
        retries: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AckState {
    None,
    Pending {
        packet: Packet,
        tx_time: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacStats {
    pub deadline_miss_tx: u32,
    pub deadline_miss_ack: u32,
    pub csma_cca_fail: u32,
    pub tx_fail: u32,
    pub expired: u32,
    pub purged: u32,
    pub rx_dropped: u32,
}

pub struct Mac<R, S, I, E, T, G> {
    pub address: ExtendedAddress,
    pub short_addr: Option<ShortAddress>,

    config: Config,
    base: Base<R, S, I, E>,
    timer: T,
    rng: G,

    seq: u8,

    tx_state: TxState,
    ack_state: AckState,

    stats: MacStats,

    tx_queue: TransactionQueue,
    requests: Scheduler,
    rx_buff: Queue<(RxInfo, Packet), RX_QUEUE_LEN>,
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
    pub fn new(address: ExtendedAddress, config: Config, radio: R, timer: T, rng: G) -> Result<Self, CoreError<E>> {
        let mut s = Self {
            address,
            short_addr: None,
            config,

            base: Base::new(radio)?,
            timer,
            rng,

            seq: 0,

            tx_state: TxState::Idle,
            ack_state: AckState::None,

            stats: MacStats::default(),

            tx_queue: TransactionQueue::new(),
            requests: Scheduler::new(),
            rx_buff: Queue::new(),
        };

        let now = s.timer.ticks_ms();

        debug!("Setup MAC with address {:?} at {} ms", s.address, now);

        debug!("Set radio to receive mode");
        s.base.receive(now)?;

        Ok(s)
    }

    /// Fetch configured MAC address
    pub fn addr(&self) -> Address {
        match self.short_addr {
            Some(s) => Address::Short(self.config.pan_id, s),
            None => Address::Extended(self.config.pan_id, self.address),
        }
    }

    /// Fetch MAC configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch MAC layer statistics
    pub fn stats(&self) -> MacStats {
        self.stats.clone()
    }

    /// Fetch the number of queued (not yet active) transactions
    pub fn pending(&self) -> usize {
        self.tx_queue.len()
    }

    /// Fetch and increment TX sequence number
    fn seq(&mut self) -> u8 {
        let s = self.seq;
        self.seq = self.seq.wrapping_add(1);
        s
    }

    /// Service all scheduled requests in order, issuing confirms
    pub(crate) fn service_requests(&mut self, now: u64) {
        while let Some(r) = self.requests.next() {
            match r {
                Request::Data(mut req, conf_cb) => {
                    // Accepted MSDUs are confirmed on completion
                    if self.service_data(now, &mut req, conf_cb).is_some() {
                        conf_cb(&req.confirm);
                    }
                },
                #[cfg(feature = "purge")]
                Request::Purge(mut req, conf_cb) => {
                    self.service_purge(&mut req);
                    conf_cb(&req.confirm);
                },
            }
        }
    }

    /// Issue MCPS-DATA.confirm for a finished transaction
    fn complete(&mut self, now: u64, tx: Transaction, status: MacStatus) {
        debug!("Transaction {:?} (seq: {}) complete: {:?}", tx.handle, tx.packet.header.seq, status);

        if let (Some(msdu_handle), Some(conf_cb)) = (tx.handle, tx.confirm) {
            let timestamp = match status {
                MacStatus::Success => Some(now),
                _ => None,
            };

            conf_cb(&DataConfirm{ msdu_handle, status, timestamp });
        }
    }

    fn expire_transactions(&mut self, now: u64) {
        while let Some(tx) = self.tx_queue.pop_expired(now) {
            warn!("Indirect transaction {:?} expired at {} ms", tx.handle, now);
            self.stats.expired = self.stats.expired.saturating_add(1);

            self.complete(now, tx, MacStatus::TransactionExpired);
        }
    }

    fn start_backoff(&mut self, now: u64, tx: Transaction, retries: u8) {
        let be = self.config.min_be;
        let until = now + self.config.backoff_ms(self.rng.next_u32(), be);

        debug!("Scheduling CSMA TX for packet {} at {} ms (retries: {})", tx.packet.header.seq, until, retries);

        self.tx_state = TxState::Backoff{ tx, until, nb: 0, be, retries };
    }

    fn tick_ack(&mut self, now: u64) -> Result<(), CoreError<E>> {
        let (packet, tx_time) = match &self.ack_state {
            AckState::Pending{packet, tx_time} if *tx_time <= now && !self.base.is_busy() => (packet.clone(), *tx_time),
            _ => return Ok(()),
        };

        if now > (tx_time + self.config.mac_deadline as u64) {
            warn!("ACK deadline exceeded (expected: {} actual: {})", tx_time, now);
            self.stats.deadline_miss_ack = self.stats.deadline_miss_ack.saturating_add(1);
        }

        debug!("Sending ACK for packet {} to {:?} at {} ms", packet.header.seq, packet.header.destination, now);

        let mut buff = [0u8; 256];
        let n = packet.encode(&mut buff, WriteFooter::No);

        self.base.transmit(now, &buff[..n])?;

        self.ack_state = AckState::None;

        Ok(())
    }

    fn tick_tx(&mut self, now: u64) -> Result<(), CoreError<E>> {
        // Nothing to do until the radio is free
        if self.base.is_busy() {
            return Ok(())
        }

        match core::mem::replace(&mut self.tx_state, TxState::Idle) {
            TxState::Idle => {
                if let Some(tx) = self.tx_queue.next_ready() {
                    self.start_backoff(now, tx, 0);
                }
            },
            // Pending ACKs take priority over CSMA transmissions
            TxState::Backoff{tx, until, nb, be, retries} if now >= until && self.ack_state == AckState::None => {
                // Clear channel assessment
                let rssi = match self.base.rssi(now) {
                    Ok(v) => v,
                    Err(e) => {
                        self.tx_state = TxState::Backoff{tx, until, nb, be, retries};
                        return Err(e)
                    }
                };

                if rssi > self.config.channel_clear_threshold {
                    let nb = nb + 1;

                    if nb > self.config.csma_max_backoffs {
                        warn!("CSMA TX failed for packet {} (rssi: {})", tx.packet.header.seq, rssi);
                        self.stats.csma_cca_fail = self.stats.csma_cca_fail.saturating_add(1);

                        self.complete(now, tx, MacStatus::ChannelAccessFailure);
                    } else {
                        let be = (be + 1).min(self.config.max_be);
                        let until = now + self.config.backoff_ms(self.rng.next_u32(), be);

                        debug!("CCA fail at {} ms (rssi: {}), backoff until {} ms", now, rssi, until);

                        self.tx_state = TxState::Backoff{tx, until, nb, be, retries};
                    }

                    return Ok(())
                }

                if now > (until + self.config.mac_deadline as u64) {
                    warn!("CSMA TX deadline exceeded (expected: {} actual: {})", until, now);
                    self.stats.deadline_miss_tx = self.stats.deadline_miss_tx.saturating_add(1);
                }

                let mut buff = [0u8; 256];
                let n = tx.packet.encode(&mut buff, WriteFooter::No);

                if let Err(e) = self.base.transmit(now, &buff[..n]) {
                    self.tx_state = TxState::Backoff{tx, until, nb, be, retries};
                    return Err(e)
                }

                debug!("CSMA TX packet {} at {} ms", tx.packet.header.seq, now);

                self.tx_state = TxState::OnAir{tx, retries};
            },
            TxState::AwaitingAck{tx, deadline, retries} if now > deadline => {
                if retries >= self.config.max_retries {
                    warn!("No ACK for packet {}, exceeded max retries", tx.packet.header.seq);
                    self.stats.tx_fail = self.stats.tx_fail.saturating_add(1);

                    self.complete(now, tx, MacStatus::NoAck);
                } else {
                    debug!("ACK timeout for packet {} at {} ms", tx.packet.header.seq, now);

                    self.start_backoff(now, tx, retries + 1);
                }
            },
            s => self.tx_state = s,
        }

        Ok(())
    }

    fn handle_transmitted(&mut self, now: u64) {
        match core::mem::replace(&mut self.tx_state, TxState::Idle) {
            TxState::OnAir{tx, retries} if tx.packet.header.ack_request => {
                let deadline = now + self.config.ack_wait_duration;

                trace!("Awaiting ACK for packet {} until {} ms", tx.packet.header.seq, deadline);

                self.tx_state = TxState::AwaitingAck{tx, deadline, retries};
            },
            TxState::OnAir{tx, ..} => {
                self.complete(now, tx, MacStatus::Success);
            },
            // Completion of an ACK transmission
            s => self.tx_state = s,
        }
    }

    fn handle_received(&mut self, now: u64, rx: RawPacket) -> Result<(), CoreError<E>> {
        let p = match Packet::decode(rx.data(), false) {
            Ok(p) => p,
            Err(e) => {
                error!("Error decoding received packet: {:?}", e);
                self.stats.rx_dropped = self.stats.rx_dropped.saturating_add(1);
                return Ok(())
            }
        };

        trace!("Received {} byte {:?} packet", p.payload().len(), p.header.frame_type);

        // Filter by PAN ID
        let pan_id = p.pan_id();
        if pan_id != PanId::broadcast() && pan_id != self.config.pan_id {
            debug!("Pan ID mismatch, dropped packet {} for {:?}", p.header.seq, pan_id);
            return Ok(())
        }

        // Filter by address
        match (p.header.destination, self.short_addr) {
            (Address::Short(_, short), _) if short == ShortAddress::broadcast() => (),
            (Address::Short(_, short), Some(addr)) if short == addr => (),
            (Address::Extended(_, ext), _) if ext == self.address => (),
            _ => {
                debug!("Address mismatch, dropped packet {} for {:?}", p.header.seq, p.header.destination);
                return Ok(())
            },
        };

        if let FrameContent::Acknowledgement = p.content {
            match core::mem::replace(&mut self.tx_state, TxState::Idle) {
                TxState::AwaitingAck{tx, ..} if p.is_ack_for(&tx.packet) => {
                    debug!("ACK rx for packet: {}", p.header.seq);

                    self.complete(now, tx, MacStatus::Success);
                },
                s => {
                    warn!("ACK for packet {} with no matching operation", p.header.seq);
                    self.tx_state = s;
                },
            }

            return Ok(())
        }

        // Release indirect transactions on poll
        let mut frame_pending = false;
        if p.is_data_request() {
            frame_pending = self.tx_queue.mark_polled(&p.header.source);

            debug!("Data request from {:?} (pending: {})", p.header.source, frame_pending);
        }

        // Arm ACK response if required, broadcasts are never acknowledged
        let broadcast = matches!(p.header.destination, Address::Short(_, s) if s == ShortAddress::broadcast());
        if p.header.ack_request && !broadcast {
            let ack = Packet::ack(&p, frame_pending);
            let tx_time = now + self.config.ack_delay;

            debug!("Scheduled ACK for packet {} from {:?} for {} ms", p.header.seq, p.header.source, tx_time);

            self.ack_state = AckState::Pending{ packet: ack, tx_time };
        }

        match p.content {
            FrameContent::Data => {
                debug!("Received {} bytes of data from {:?}", p.payload().len(), p.header.source);

                let i = RxInfo{
                    source: p.header.source,
                    rssi: rx.rssi,
                };

                if let Err(_e) = self.rx_buff.enqueue((i, p)) {
                    error!("Error adding packet to RX queue");
                    self.stats.rx_dropped = self.stats.rx_dropped.saturating_add(1);
                }
            },
            FrameContent::Command(_) if frame_pending => (),
            FrameContent::Command(c) => {
                info!("RX unhandled command: {:?}", c);
            },
            FrameContent::Beacon(_) => {
                trace!("Ignoring beacon from {:?}", p.header.source);
            },
            FrameContent::Acknowledgement => (),
        }

        Ok(())
    }
}

impl <R, S, I, E, T, G> MacIf<Address> for Mac<R, S, I, E, T, G>
where
    R: Radio<S, I, E>,
    S: radio::RadioState,
    I: radio::ReceiveInfo + Default + Debug,
    E: Debug,
    T: Timer,
    G: RngCore,
{
    type Error = CoreError<E>;

    /// Enqueue a packet for TX without an MSDU handle or confirm
    fn transmit(&mut self, dest: Address, data: &[u8], ack: bool) -> Result<(), Self::Error> {
        if data.len() > MAX_MSDU_LEN {
            return Err(CoreError::PayloadTooLong(data.len()))
        }

        let (src, seq) = (self.addr(), self.seq());
        let packet = Packet::data(dest, src, seq, data, ack)
            .map_err(|_| CoreError::PayloadTooLong(data.len()))?;

        self.tx_queue.push(Transaction::direct(None, packet, None))
            .map_err(|t| CoreError::BufferFull(t.packet))
    }

    /// Check for received packets (MCPS-DATA.indication)
    fn receive(&mut self, data: &mut[u8]) -> Result<Option<(usize, RxInfo)>, Self::Error> {
        let n = match self.rx_buff.peek() {
            Some((_i, p)) => p.payload().len(),
            None => return Ok(None),
        };

        if n > data.len() {
            return Err(CoreError::PayloadTooLong(n))
        }

        let (info, p) = match self.rx_buff.dequeue() {
            Some(rx) => rx,
            None => return Ok(None),
        };

        data[..n].copy_from_slice(p.payload());

        Ok(Some((n, info)))
    }

    /// Check whether the MAC is busy
    fn busy(&mut self) -> Result<bool, Self::Error> {
        let b = self.tx_state != TxState::Idle
            || !self.requests.is_empty()
            || self.ack_state != AckState::None
            || self.tx_queue.is_full();

        Ok(b)
    }

    fn tick(&mut self) -> Result<(), Self::Error> {
        let now = self.timer.ticks_ms();

        trace!("Tick at {} ms", now);

        match self.base.tick(now)? {
            Some(BaseEvent::Received(rx)) => self.handle_received(now, rx)?,
            Some(BaseEvent::Transmitted) => self.handle_transmitted(now),
            None => (),
        }

        self.service_requests(now);

        self.expire_transactions(now);

        self.tick_ack(now)?;

        self.tick_tx(now)?;

        Ok(())
    }
}
