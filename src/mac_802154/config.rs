use ieee802154::mac::PanId;

/// Upper bound for backoff exponents (aMaxBE)
pub const MAX_BE: u8 = 8;

/// MAC configuration (a subset of the MAC PIB)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub pan_id: PanId,

    /// Maximum number of retries for acknowledged frames (macMaxFrameRetries)
    pub max_retries: u8,

    /// Delay between packet RX and ACK in ms
    pub ack_delay: u64,

    /// Time to wait for an ACK following transmission in ms
    pub ack_wait_duration: u64,

    /// Minimum backoff exponent
    pub min_be: u8,
    /// Maximum backoff exponent
    pub max_be: u8,
    /// Maximum number of CCA failures before declaring channel access failure
    pub csma_max_backoffs: u8,
    /// Duration of a backoff period in ms
    pub unit_backoff_period: u64,
    /// RSSI threshold for a channel to be determined to be clear
    pub channel_clear_threshold: i16,

    /// Time an indirect transaction is held awaiting a poll, in ms
    /// (macTransactionPersistenceTime). A value of 0 disables expiry.
    pub transaction_persistence_time: u64,

    /// Deadline for MAC operations (maximum allowed schedule slip)
    pub mac_deadline: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pan_id: PanId(0x0100),

            max_retries: 3,
            ack_delay: 2,
            ack_wait_duration: 20,

            min_be: 3,
            max_be: 5,
            csma_max_backoffs: 4,
            unit_backoff_period: 1,
            channel_clear_threshold: -50,

            transaction_persistence_time: 5 * 1000,

            mac_deadline: 10,
        }
    }
}

impl Config {
    /// Compute the CSMA-CA backoff delay in ms for a random value and backoff exponent
    pub fn backoff_ms(&self, rand: u32, be: u8) -> u64 {
        let periods = rand % (1u32 << be.min(MAX_BE));
        periods as u64 * self.unit_backoff_period
    }

    /// Compute the expiry time for an indirect transaction queued at `now`
    pub fn transaction_expiry(&self, now: u64) -> Option<u64> {
        match self.transaction_persistence_time {
            0 => None,
            t => Some(now + t),
        }
    }
}
