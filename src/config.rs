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

//! JSON connection configuration.
//!
//! ```json
//! { "tty": "/dev/ttyACM0", "baudrate": 9600, "databits": 8, "parity": "none", "stopbits": 1 }
//! ```

use std::path::Path;
use serde::Deserialize;
use serialport::{DataBits, Parity, StopBits};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = ".sender_config.json";

/// Config file contents as written by the user
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub tty: Option<String>,
    pub baudrate: u32,
    pub databits: u8,
    pub parity: String,
    pub stopbits: u8,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            tty: None,
            baudrate: 9600,
            databits: 8,
            parity: "none".to_string(),
            stopbits: 1,
        }
    }
}

/// Validated parameters ready for `RealSerialPort::open`
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SenderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Resolves the settings, `tty` taking precedence over the file's port
    pub fn settings(&self, tty: Option<&str>) -> Result<SerialSettings, ConfigError> {
        let port = tty
            .or(self.tty.as_deref())
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPort)?;

        Ok(SerialSettings {
            port: port.to_string(),
            baud: self.baudrate,
            data_bits: parse_data_bits(self.databits)?,
            parity: parse_parity(&self.parity)?,
            stop_bits: parse_stop_bits(self.stopbits)?,
        })
    }
}

fn parse_data_bits(bits: u8) -> Result<DataBits, ConfigError> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(ConfigError::DataBits(bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, ConfigError> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(ConfigError::Parity(parity.to_string())),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, ConfigError> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(ConfigError::StopBits(bits)),
    }
}
