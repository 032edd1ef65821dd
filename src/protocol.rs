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

//! Chunklink wire protocol constants

/// Payload bytes carried by each frame
pub const CHUNK_SIZE: usize = 8;

/// Padded chunk plus one checksum byte
pub const FRAME_SIZE: usize = CHUNK_SIZE + 1;

/// Byte used to pad the final chunk up to `CHUNK_SIZE`
pub const PAD_BYTE: u8 = 0x00;

/// Receiver line - frame checksum matched, send the next chunk
pub const ACK_OK: &str = "k";

/// Receiver line - frame checksum mismatch, repeat the current chunk
pub const ACK_FAILURE: &str = "f";

/// Terminates every line the receiver sends back
pub const LINE_DELIMITER: u8 = b'\n';
