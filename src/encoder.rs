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

//! Frame transport encoding and paced emission.

use std::time::Duration;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{trace, warn};
use crate::protocol::FRAME_SIZE;
use crate::serial::SerialPort;

/// Outcome of pushing one encoded frame onto the sink.
///
/// Only says the last character was submitted. Whether the receiver got the
/// frame is decided by its acknowledgment, never by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmission {
    pub submitted: usize,
    pub failed: usize,
}

impl Transmission {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub struct Encoder {
    initial_delay: Duration,
    char_delay: Duration,
}

impl Encoder {
    pub fn new(initial_delay: Duration, char_delay: Duration) -> Self {
        Encoder { initial_delay, char_delay }
    }

    pub fn encode(frame: &[u8; FRAME_SIZE]) -> String {
        STANDARD.encode(frame)
    }

    /// Writes `text` one character at a time.
    ///
    /// A failed write is logged and skipped; pacing continues with the next
    /// character.
    pub fn transmit(&self, sink: &mut dyn SerialPort, text: &str) -> Transmission {
        if !self.initial_delay.is_zero() {
            std::thread::sleep(self.initial_delay);
        }

        let mut result = Transmission { submitted: 0, failed: 0 };
        for (i, byte) in text.bytes().enumerate() {
            if i > 0 && !self.char_delay.is_zero() {
                std::thread::sleep(self.char_delay);
            }

            match sink.write_all(&[byte]) {
                Ok(()) => result.submitted += 1,
                Err(e) => {
                    warn!(error = %e, position = i, "write failed");
                    result.failed += 1;
                }
            }
        }

        trace!(submitted = result.submitted, failed = result.failed, "frame submitted");
        result
    }

    pub fn send_frame(&self, sink: &mut dyn SerialPort, frame: &[u8; FRAME_SIZE]) -> Transmission {
        let text = Self::encode(frame);
        trace!(frame = ?frame, base64 = %text, "encoded frame");
        self.transmit(sink, &text)
    }
}

// ============================================================================
// Tests
// ============================================================================
