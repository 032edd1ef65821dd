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

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid data bits: {0}. Must be 5, 6, 7, or 8")]
    DataBits(u8),
    #[error("Invalid parity: {0}. Must be 'none', 'odd', or 'even'")]
    Parity(String),
    #[error("Invalid stop bits: {0}. Must be 1 or 2")]
    StopBits(u8),
    #[error("no serial port given on the command line or in the config file")]
    MissingPort,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to open serial port: {0}")]
    Open(#[from] serialport::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input file is empty, nothing to send")]
    EmptyPayload,
    #[error("no acknowledgment for chunk {index} within {waited:?}")]
    AckTimeout {
        index: usize,
        waited: Duration,
    },
}
