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

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};
use tracing::debug;

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Byte connection to the receiver
pub trait SerialPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;

    /// Releases the connection. Later writes and reads fail with `NotConnected`.
    fn close(&mut self) -> std::io::Result<()>;
}

fn not_connected() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "serial port closed")
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Option<Box<dyn SerialPortTrait>>,
}

impl RealSerialPort {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(RealSerialPort { port: Some(port) })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let port = self.port.as_mut().ok_or_else(not_connected)?;
        port.write_all(buf)?;
        port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        let port = self.port.as_mut().ok_or_else(not_connected)?;
        port.set_timeout(timeout)
            .map_err(std::io::Error::other)?;
        port.read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        match self.port.take() {
            Some(port) => {
                if let Some(name) = port.name() {
                    debug!(port = %name, "closing serial port");
                }
                drop(port);
                Ok(())
            }
            None => Err(not_connected()),
        }
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
    // Indices of write_all calls that fail instead of logging
    failing_writes: Vec<usize>,
    write_calls: usize,
    close_count: usize,
    expected_closes: usize,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
            failing_writes: Vec::new(),
            write_calls: 0,
            close_count: 0,
            expected_closes: 0,
        }
    }

    /// The port must be closed exactly once before it is dropped
    pub fn expect_close(mut self) -> Self {
        self.expected_closes = 1;
        self
    }

    /// Makes the `n`-th call to `write_all` (zero based) fail
    pub fn fail_write(mut self, n: usize) -> Self {
        self.failing_writes.push(n);
        self
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let call = self.write_calls;
        self.write_calls += 1;
        if self.close_count > 0 {
            return Err(not_connected());
        }
        if self.failing_writes.contains(&call) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Mock write failure"
            ));
        }
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        // Out of responses = timeout
        if self.read_pos >= self.read_buffer.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        // If current response is None = timeout
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => break,  // Stop at timeout marker
            }
        }

        Ok(bytes_read)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            String::from_utf8_lossy(&self.write_log),
            String::from_utf8_lossy(&self.expected_writes),
            "MockSerialPort write log mismatch!"
        );

        assert_eq!(
            self.close_count,
            self.expected_closes,
            "MockSerialPort closed {} times, expected {}",
            self.close_count,
            self.expected_closes
        );
    }
}

/// Turns receiver lines into mock read responses, one read per line
#[cfg(test)]
pub fn lines(lines: &[&str]) -> Vec<Option<u8>> {
    let mut responses = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            responses.push(None);
        }
        responses.extend(line.bytes().map(Some));
        responses.push(Some(b'\n'));
    }
    responses
}
