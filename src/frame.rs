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

//! Payload chunking and frame construction.
//!
//! A frame is a chunk right-padded with `PAD_BYTE` to `CHUNK_SIZE` bytes
//! followed by a one byte checksum. The checksum packs the least significant
//! bit of every padded byte, first byte in the most significant position.

use crate::protocol::{CHUNK_SIZE, FRAME_SIZE, PAD_BYTE};

// ============================================================================
// Payload
// ============================================================================

/// The complete file content, read once and never modified
pub struct Payload {
    data: Vec<u8>,
}

impl Payload {
    pub fn new(data: Vec<u8>) -> Self {
        Payload { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks().len()
    }

    /// Returns chunk `idx`.
    ///
    /// Panics if `idx >= chunk_count()`.
    pub fn chunk(&self, idx: usize) -> &[u8] {
        let start = idx * CHUNK_SIZE;
        let end = (start + CHUNK_SIZE).min(self.data.len());
        &self.data[start..end]
    }

    pub fn chunks(&self) -> std::slice::Chunks<'_, u8> {
        self.data.chunks(CHUNK_SIZE)
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Right-pads `chunk` with `PAD_BYTE` up to `CHUNK_SIZE` bytes.
///
/// Chunks longer than `CHUNK_SIZE` are truncated; `Payload` never produces them.
pub fn pad(chunk: &[u8]) -> [u8; CHUNK_SIZE] {
    let mut block = [PAD_BYTE; CHUNK_SIZE];
    let len = chunk.len().min(CHUNK_SIZE);
    block[..len].copy_from_slice(&chunk[..len]);
    block
}

/// Packs the low bit of each byte into one byte, MSB first
pub fn checksum(block: &[u8]) -> u8 {
    block.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1))
}

/// Builds the frame sent on the wire for `chunk`
pub fn frame(chunk: &[u8]) -> [u8; FRAME_SIZE] {
    let block = pad(chunk);
    let mut out = [0u8; FRAME_SIZE];
    out[..CHUNK_SIZE].copy_from_slice(&block);
    out[CHUNK_SIZE] = checksum(&block);
    out
}

// ============================================================================
// Tests
// ============================================================================
