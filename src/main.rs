// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Chunklink: acknowledged 8-byte frame file upload over a serial line
mod ack;
mod config;
mod cursor;
mod encoder;
mod error;
mod frame;
mod logging;
mod protocol;
mod serial;
mod transfer;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use config::{SenderConfig, DEFAULT_CONFIG_FILE};
use error::TransferError;
use frame::Payload;
use serial::RealSerialPort;
use transfer::{Session, Timing};

#[derive(Parser)]
#[command(name = "chunklink")]
#[command(about = "Send a file to a microcontroller in acknowledged 8-byte frames", long_about = None)]
struct Cli {
    /// File to send
    file: PathBuf,

    /// Serial port (e.g., /dev/ttyACM0 or COM1), overrides the config file
    tty: Option<String>,

    /// Connection config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, value_name = "PATH")]
    config: PathBuf,

    /// Delay in milliseconds between opening the port and the first frame
    #[arg(long, default_value = "2000", value_name = "MS")]
    start_delay: u64,

    /// Delay in milliseconds before each frame
    #[arg(long, default_value = "0", value_name = "MS")]
    chunk_delay: u64,

    /// Delay in milliseconds between sending each character of a frame
    #[arg(long, default_value = "0", value_name = "MS")]
    byte_delay: u64,

    /// Abort when a frame is not acknowledged within this many milliseconds
    #[arg(long, value_name = "MS")]
    ack_timeout: Option<u64>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match send_file(&cli) {
        Ok(frames) => {
            info!(frames, "Quitting");
        }
        Err(e) => {
            error!("Send failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_payload(path: &Path) -> Result<Payload, TransferError> {
    info!("Reading input file: {}", path.display());
    let data = std::fs::read(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("Error while reading file {}: {}", path.display(), e))
    })?;

    let payload = Payload::new(data);
    if payload.is_empty() {
        return Err(TransferError::EmptyPayload);
    }
    info!(bytes = payload.len(), chunks = payload.chunk_count(), "Done.");
    Ok(payload)
}

fn send_file(cli: &Cli) -> Result<usize, TransferError> {
    let payload = read_payload(&cli.file)?;

    info!("Loading config file: {}", cli.config.display());
    let settings = SenderConfig::load(&cli.config)?.settings(cli.tty.as_deref())?;

    info!("Opening serial port: {}", settings.port);
    info!(
        "Settings: {} baud, {:?}, {:?}, {:?}",
        settings.baud, settings.data_bits, settings.parity, settings.stop_bits
    );
    let serial_port = RealSerialPort::open(
        &settings.port,
        settings.baud,
        settings.data_bits,
        settings.parity,
        settings.stop_bits,
    )?;

    let timing = Timing {
        start_delay: Duration::from_millis(cli.start_delay),
        chunk_delay: Duration::from_millis(cli.chunk_delay),
        byte_delay: Duration::from_millis(cli.byte_delay),
        ack_timeout: cli.ack_timeout.map(Duration::from_millis),
    };

    let session = Session::new(Box::new(serial_port), payload, timing)?;
    session.run()
}
