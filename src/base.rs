//! Base radio wrapper, tracks radio state for the MAC
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use core::{fmt::Debug, marker::PhantomData};

use radio::{State, Transmit, Receive, Rssi, ReceiveInfo, RadioState};

use crate::log::{trace, debug};
use crate::{Radio, RawPacket, error::CoreError};

/// Radio states as seen by the MAC
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaseState {
    Idle,
    Listening,
    Transmitting,
    Sleeping,
}

/// Events produced by polling the radio
#[derive(Debug, Clone, PartialEq)]
pub enum BaseEvent {
    /// A frame was received
    Received(RawPacket),
    /// A transmission completed (radio has returned to receive mode)
    Transmitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Base<R, S, I, E> {
    radio: R,
    state: BaseState,
    last_change: u64,
    _radio_state: PhantomData<S>,
    _radio_info: PhantomData<I>,
    _radio_err: PhantomData<E>,
}

impl <R, S, I, E> Base<R, S, I, E>
where
    R: Radio<S, I, E>,
    S: RadioState,
    I: ReceiveInfo + Default + Debug,
    E: Debug,
{
    pub fn new(radio: R) -> Result<Self, CoreError<E>> {
        let s = Self {
            radio,
            state: BaseState::Idle,
            last_change: 0,
            _radio_state: PhantomData,
            _radio_info: PhantomData,
            _radio_err: PhantomData,
        };

        Ok(s)
    }

    /// Fetch the current radio state
    pub fn state(&self) -> BaseState {
        self.state.clone()
    }

    /// Fetch the time of the last state change
    pub fn last_change(&self) -> u64 {
        self.last_change
    }

    /// Check whether the radio is busy (ie. transmitting)
    pub fn is_busy(&self) -> bool {
        self.state == BaseState::Transmitting
    }

    /// Enter receive mode
    pub fn receive(&mut self, now: u64) -> Result<(), CoreError<E>> {
        trace!("Start receive at {} ms", now);

        self.radio.start_receive().map_err(CoreError::Radio)?;

        self.state = BaseState::Listening;
        self.last_change = now;

        Ok(())
    }

    /// Start transmission of an encoded frame
    pub fn transmit(&mut self, now: u64, data: &[u8]) -> Result<(), CoreError<E>> {
        if self.is_busy() {
            return Err(CoreError::Busy);
        }

        debug!("Transmit {} bytes at {} ms", data.len(), now);

        self.radio.start_transmit(data).map_err(CoreError::Radio)?;

        self.state = BaseState::Transmitting;
        self.last_change = now;

        Ok(())
    }

    /// Sample the channel RSSI, entering receive mode if required
    pub fn rssi(&mut self, now: u64) -> Result<i16, CoreError<E>> {
        if self.state != BaseState::Listening {
            self.receive(now)?;
        }

        self.radio.poll_rssi().map_err(CoreError::Radio)
    }

    /// Put the radio to sleep
    pub fn sleep(&mut self) -> Result<(), CoreError<E>> {
        self.radio.set_state(S::sleep()).map_err(CoreError::Radio)?;

        self.state = BaseState::Sleeping;

        Ok(())
    }

    /// Poll the radio for received frames and transmit completion
    pub fn tick(&mut self, now: u64) -> Result<Option<BaseEvent>, CoreError<E>> {
        match self.state {
            BaseState::Listening => {
                if !self.radio.check_receive(true).map_err(CoreError::Radio)? {
                    return Ok(None)
                }

                let mut rx = RawPacket::default();
                let (n, info) = self.radio.get_received(&mut rx.data).map_err(CoreError::Radio)?;
                rx.len = n;
                rx.rssi = info.rssi();

                trace!("Received {} bytes at {} ms (rssi: {})", n, now, rx.rssi);

                // Re-enter receive mode
                self.receive(now)?;

                Ok(Some(BaseEvent::Received(rx)))
            },
            BaseState::Transmitting => {
                if !self.radio.check_transmit().map_err(CoreError::Radio)? {
                    return Ok(None)
                }

                trace!("Transmit complete at {} ms", now);

                // Return to receive mode following TX
                self.receive(now)?;

                Ok(Some(BaseEvent::Transmitted))
            },
            BaseState::Idle | BaseState::Sleeping => Ok(None),
        }
    }
}
