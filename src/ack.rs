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

use crate::protocol::{ACK_FAILURE, ACK_OK, LINE_DELIMITER};

/// One classified line from the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Success,
    Failure,
    /// Anything else the receiver prints; informational only
    Diagnostic(String),
}

impl Ack {
    pub fn classify(line: &str) -> Ack {
        match line.trim() {
            ACK_OK => Ack::Success,
            ACK_FAILURE => Ack::Failure,
            other => Ack::Diagnostic(other.to_string()),
        }
    }
}

/// Splits the inbound byte stream into lines.
///
/// Holds only the bytes of the current unterminated line.
#[derive(Default)]
pub struct AckDecoder {
    partial: Vec<u8>,
}

impl AckDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes, returning every line completed by them in arrival order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Ack> {
        let mut acks = Vec::new();
        for &byte in bytes {
            if byte == LINE_DELIMITER {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                acks.push(Ack::classify(&line));
            } else {
                self.partial.push(byte);
            }
        }
        acks
    }
}
