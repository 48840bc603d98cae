//! 802.15.4 MCPS Example Application
//!
//! Periodically issues MCPS-DATA.requests, purging the previous MSDU
//! if it is still pending when the next is issued.
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn, error};

use structopt::StructOpt;

use embedded_hal::delay::blocking::DelayUs;
use linux_embedded_hal::Delay;
use driver_pal::hal::{HalInst, DeviceConfig};

use radio_sx128x::prelude::*;
use radio_sx128x::{Config as Sx128xConfig};

use lpwan_mcps::prelude::*;


#[derive(Debug, StructOpt)]
struct Options {

    #[structopt(flatten)]
    pub spi_config: DeviceConfig,

    #[structopt(long, default_value="256")]
    /// Set PAN ID
    pub pan_id: u16,

    #[structopt(long, default_value="65535")]
    /// Destination short address
    pub dest: u16,

    #[structopt(long)]
    /// Hold MSDUs for indirect transmission (released on device poll)
    pub indirect: bool,

    #[structopt(long)]
    /// Request acknowledgement of transmitted MSDUs
    pub ack: bool,

    #[structopt(long, default_value="10s", parse(try_from_str = humantime::parse_duration))]
    /// Period between MCPS-DATA.requests
    pub tx_period: Duration,

    #[structopt(long, default_value = "info")]
    /// Configure radio log level
    pub log_level: simplelog::LevelFilter,
}

#[derive(Clone, Debug)]
pub struct SystemTimer {
    start: Instant,
}

impl SystemTimer {
    fn new() -> Self {
        Self {
            start: Instant::now()
        }
    }
}

impl MacTimer for SystemTimer {
    fn ticks_ms(&self) -> u64 {
        Instant::now().duration_since(self.start).as_millis() as u64
    }

    fn ticks_us(&self) -> u64 {
        Instant::now().duration_since(self.start).as_micros() as u64
    }
}

fn data_confirm(c: &DataConfirm) {
    match c.status {
        MacStatus::Success => info!("MSDU {} sent at {:?} ms", c.msdu_handle, c.timestamp),
        _ => warn!("MSDU {} failed: {}", c.msdu_handle, c.status),
    }
}

fn purge_confirm(c: &PurgeConfirm) {
    match c.status {
        MacStatus::Success => info!("Purged stale MSDU {}", c.msdu_handle),
        _ => debug!("MSDU {} no longer pending ({})", c.msdu_handle, c.status),
    }
}

fn main() -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Bind exit handler
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    // Load options
    let opts = Options::from_args();

    // Initialise logging
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_ignore_str("radio_sx128x")
        .add_filter_ignore_str("driver_cp2130")
        .build();
    let _ = simplelog::SimpleLogger::init(opts.log_level, log_cfg);

    info!("Starting lpwan-mcps-sx128x");

    debug!("Connecting to HAL");
    let HalInst{base: _, spi, pins} = match HalInst::load(&opts.spi_config) {
        Ok(v) => v,
        Err(e) => {
            return Err(anyhow::anyhow!("HAL error: {:?}", e));
        }
    };

    debug!("Initialising Radio");
    let mut rf_config = Sx128xConfig::gfsk();
    if let Modem::Gfsk(gfsk) = &mut rf_config.modem {
        gfsk.patch_preamble = false;
        gfsk.crc_mode = radio_sx128x::device::common::GfskFlrcCrcModes::RADIO_CRC_2_BYTES;
    }

    let mut radio = match Sx128x::spi(spi, pins.cs, pins.busy, pins.ready, pins.reset, Delay{}, &rf_config) {
        Ok(v) => v,
        Err(e) => {
            return Err(anyhow::anyhow!("Radio init error: {:?}", e));
        }
    };

    if let Modem::Gfsk(_gfsk) = &mut rf_config.modem {
        if let Err(e) = radio.set_syncword(1, &[0x11, 0x22, 0x33, 0x44, 0x55]) {
            return Err(anyhow::anyhow!("Radio syncword error: {:?}", e));
        }
    }

    // Initialise MAC
    let address = ExtendedAddress(rand::random::<u64>() % 1000);
    let mac_config = mac_802154::Config {
        pan_id: PanId(opts.pan_id),
        ..Default::default()
    };
    let dest = MacAddress::Short(mac_config.pan_id, ShortAddress(opts.dest));

    let mut tx_options = TxOptions::empty();
    tx_options.set(TxOptions::INDIRECT, opts.indirect);
    tx_options.set(TxOptions::ACK, opts.ack);

    debug!("Initialising MAC");

    let timer = SystemTimer::new();
    let mut mac = match Mac802154::new(address, mac_config, radio, timer.clone(), rand_core::OsRng) {
        Ok(m) => m,
        Err(e) => {
            return Err(anyhow::anyhow!("Error initalising MAC: {:?}", e));
        }
    };

    debug!("Starting loop");

    let tx_period = opts.tx_period.as_millis() as u64;
    let mut last_tx = timer.ticks_ms();
    let mut handle = 0u8;

    while running.load(Ordering::SeqCst) {
        let now = timer.ticks_ms();

        // Update the mac
        if let Err(e) = mac.tick() {
            error!("MAC tick error: {:?}", e);
        }

        // Check for MCPS-DATA.indications
        let mut buff = [0u8; 256];
        match mac.receive(&mut buff) {
            Ok(Some((n, i))) => {
                info!("Received data from {:?}: {:02x?}", i.source, &buff[..n]);
            },
            Err(e) => {
                error!("MAC RX error: {:?}", e)
            },
            _ => (),
        }

        // Periodic transmit
        if now > last_tx + tx_period {
            // Drop the previous MSDU if it has not yet gone out
            if let Err(e) = mac.purge_request(PurgeRequest::new(handle), purge_confirm) {
                error!("MCPS-PURGE.request error: {:?}", e);
            }

            handle = handle.wrapping_add(1);
            let data = [0xaa, 0xbb, 0xcc, handle];

            info!("MSDU {} request {:02x?} at {} ms", handle, data, now);

            let req = match DataRequest::new(dest, &data, handle, tx_options) {
                Ok(r) => r,
                Err(e) => return Err(anyhow::anyhow!("Invalid data request: {:?}", e)),
            };

            if let Err(e) = mac.data_request(req, data_confirm) {
                error!("MCPS-DATA.request error: {:?}", e);
            }

            last_tx = now;
        }

        let _ = Delay{}.delay_ms(1);
    }

    info!("Exiting, MAC stats: {:?}", mac.stats());

    Ok(())
}
