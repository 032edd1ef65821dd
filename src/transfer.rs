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

//! Acknowledgment driven transfer state machine and the session that runs it.
//!
//! At most one frame is outstanding at any time: a frame is only sent on
//! `Start` or in response to the acknowledgment of the previous one.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use crate::ack::{Ack, AckDecoder};
use crate::cursor::IndexCursor;
use crate::encoder::Encoder;
use crate::error::TransferError;
use crate::frame::{frame, Payload};
use crate::serial::SerialPort;

/// How long a single read waits before the session looks at its deadline again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Sending(usize),
    AwaitingAck(usize),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Start,
    Success,
    Failure,
}

/// Work the session has to carry out after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Send { index: usize, repeat: bool },
    Finish,
}

pub struct TransferFsm {
    state: State,
    cursor: IndexCursor,
}

impl TransferFsm {
    pub fn new(chunk_count: usize) -> Result<Self, TransferError> {
        let cursor = IndexCursor::new(chunk_count).ok_or(TransferError::EmptyPayload)?;
        debug!(last = cursor.max(), "transfer prepared");
        Ok(TransferFsm { state: State::Idle, cursor })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Applies `signal`. Returns `None` when the signal means nothing in the
    /// current state; the state is then left untouched.
    pub fn handle(&mut self, signal: Signal) -> Option<Effect> {
        let (next, effect) = match (self.state, signal) {
            (State::Idle, Signal::Start) => {
                (State::Sending(0), Effect::Send { index: 0, repeat: false })
            }
            (State::AwaitingAck(_), Signal::Success) => match self.cursor.increase() {
                Some(index) => (State::Sending(index), Effect::Send { index, repeat: false }),
                None => (State::Done, Effect::Finish),
            },
            // Index 0 is repeated like any other chunk
            (State::AwaitingAck(_), Signal::Failure) => {
                let index = self.cursor.get();
                (State::Sending(index), Effect::Send { index, repeat: true })
            }
            _ => return None,
        };

        debug!(from = ?self.state, to = ?next, signal = ?signal, "transition");
        self.state = next;
        Some(effect)
    }

    /// Marks the frame being sent as handed to the transport
    pub fn sent(&mut self) {
        if let State::Sending(index) = self.state {
            self.state = State::AwaitingAck(index);
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Timing {
    /// Settle time between opening the port and the first frame
    pub start_delay: Duration,
    /// Pause before each frame
    pub chunk_delay: Duration,
    /// Pause between characters of a frame
    pub byte_delay: Duration,
    /// Give up when an acknowledgment takes longer than this. `None` waits forever.
    pub ack_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Done,
}

pub struct Session {
    serial: Box<dyn SerialPort>,
    payload: Payload,
    fsm: TransferFsm,
    encoder: Encoder,
    decoder: AckDecoder,
    pending: VecDeque<Ack>,
    timing: Timing,
    awaiting_since: Option<Instant>,
    frames_sent: usize,
}

impl Session {
    pub fn new(serial: Box<dyn SerialPort>, payload: Payload, timing: Timing) -> Result<Self, TransferError> {
        let fsm = TransferFsm::new(payload.chunk_count())?;
        Ok(Session {
            serial,
            payload,
            fsm,
            encoder: Encoder::new(timing.chunk_delay, timing.byte_delay),
            decoder: AckDecoder::new(),
            pending: VecDeque::new(),
            timing,
            awaiting_since: None,
            frames_sent: 0,
        })
    }

    /// Runs the transfer until the last chunk is acknowledged, returning the
    /// number of frames sent including repeats
    pub fn run(mut self) -> Result<usize, TransferError> {
        if !self.timing.start_delay.is_zero() {
            debug!(delay = ?self.timing.start_delay, "waiting for receiver to settle");
            std::thread::sleep(self.timing.start_delay);
        }
        info!("Ready to send data");

        let mut status = self.start();
        while status == Status::Running {
            status = self.step()?;
        }
        Ok(self.frames_sent)
    }

    /// Sends chunk 0
    pub fn start(&mut self) -> Status {
        match self.fsm.handle(Signal::Start) {
            Some(effect) => self.apply(effect),
            None => {
                warn!(state = ?self.fsm.state(), "session already started");
                if self.fsm.state() == State::Done { Status::Done } else { Status::Running }
            }
        }
    }

    /// Processes one acknowledgment, or waits for more input if none is queued
    pub fn step(&mut self) -> Result<Status, TransferError> {
        if self.fsm.state() == State::Done {
            return Ok(Status::Done);
        }

        if let Some(ack) = self.pending.pop_front() {
            return Ok(self.on_ack(ack));
        }

        self.poll();
        if self.pending.is_empty() {
            self.check_deadline()?;
        }
        Ok(Status::Running)
    }

    fn on_ack(&mut self, ack: Ack) -> Status {
        let signal = match ack {
            Ack::Success => Signal::Success,
            Ack::Failure => Signal::Failure,
            Ack::Diagnostic(line) => {
                info!(response = %line, "receiver response");
                return Status::Running;
            }
        };

        match self.fsm.handle(signal) {
            Some(effect) => self.apply(effect),
            None => {
                warn!(signal = ?signal, state = ?self.fsm.state(), "acknowledgment without outstanding frame");
                Status::Running
            }
        }
    }

    fn apply(&mut self, effect: Effect) -> Status {
        match effect {
            Effect::Send { index, repeat } => {
                if repeat {
                    info!("Repeating chunk: {}", index);
                } else {
                    info!("Sending chunk: {}", index);
                }

                let frame = frame(self.payload.chunk(index));
                let transmission = self.encoder.send_frame(self.serial.as_mut(), &frame);
                if !transmission.is_clean() {
                    warn!(index, failed = transmission.failed, "frame sent with write errors");
                }

                self.fsm.sent();
                self.frames_sent += 1;
                self.awaiting_since = Some(Instant::now());
                Status::Running
            }
            Effect::Finish => {
                info!(chunks = self.payload.chunk_count(), frames = self.frames_sent, "Data transferred successfully");
                self.awaiting_since = None;
                if let Err(e) = self.serial.close() {
                    warn!(error = %e, "failed to close serial port");
                }
                Status::Done
            }
        }
    }

    fn poll(&mut self) {
        let mut buf = [0u8; 64];
        match self.serial.read_timeout(&mut buf, POLL_INTERVAL) {
            Ok(n) => {
                let acks = self.decoder.feed(&buf[..n]);
                self.pending.extend(acks);
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!(error = %e, "Error on read");
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    fn check_deadline(&self) -> Result<(), TransferError> {
        let (Some(limit), Some(since), State::AwaitingAck(index)) =
            (self.timing.ack_timeout, self.awaiting_since, self.fsm.state())
        else {
            return Ok(());
        };

        let waited = since.elapsed();
        if waited >= limit {
            return Err(TransferError::AckTimeout { index, waited });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{lines, MockSerialPort};
    use proptest::prelude::*;

    fn twenty_bytes() -> Payload {
        Payload::new((0u8..20).collect())
    }

    fn encoded(payload: &Payload, indices: &[usize]) -> Vec<u8> {
        let mut out = Vec::new();
        for &i in indices {
            out.extend_from_slice(Encoder::encode(&frame(payload.chunk(i))).as_bytes());
        }
        out
    }

    fn run_session(mock: MockSerialPort, payload: Payload, timing: Timing) -> Result<usize, TransferError> {
        let mut session = Session::new(Box::new(mock), payload, timing)?;
        let mut status = session.start();
        while status == Status::Running {
            status = session.step()?;
        }
        assert_eq!(session.fsm.state(), State::Done);
        Ok(session.frames_sent)
    }

    #[test]
    fn test_fsm_full_progression() {
        let mut fsm = TransferFsm::new(3).unwrap();
        assert_eq!(fsm.state(), State::Idle);

        assert_eq!(fsm.handle(Signal::Start), Some(Effect::Send { index: 0, repeat: false }));
        assert_eq!(fsm.state(), State::Sending(0));
        fsm.sent();
        assert_eq!(fsm.state(), State::AwaitingAck(0));

        assert_eq!(fsm.handle(Signal::Success), Some(Effect::Send { index: 1, repeat: false }));
        fsm.sent();
        assert_eq!(fsm.handle(Signal::Success), Some(Effect::Send { index: 2, repeat: false }));
        fsm.sent();
        assert_eq!(fsm.handle(Signal::Success), Some(Effect::Finish));
        assert_eq!(fsm.state(), State::Done);
    }

    #[test]
    fn test_fsm_failure_repeats_current() {
        let mut fsm = TransferFsm::new(3).unwrap();
        fsm.handle(Signal::Start);
        fsm.sent();
        fsm.handle(Signal::Success);
        fsm.sent();

        assert_eq!(fsm.handle(Signal::Failure), Some(Effect::Send { index: 1, repeat: true }));
        assert_eq!(fsm.state(), State::Sending(1));
        fsm.sent();
        assert_eq!(fsm.state(), State::AwaitingAck(1));
    }

    #[test]
    fn test_fsm_failure_on_first_chunk_retries() {
        let mut fsm = TransferFsm::new(2).unwrap();
        fsm.handle(Signal::Start);
        fsm.sent();

        assert_eq!(fsm.handle(Signal::Failure), Some(Effect::Send { index: 0, repeat: true }));
        assert_eq!(fsm.state(), State::Sending(0));
    }

    #[test]
    fn test_fsm_ignores_signals_without_outstanding_frame() {
        let mut fsm = TransferFsm::new(2).unwrap();
        assert_eq!(fsm.handle(Signal::Success), None);
        assert_eq!(fsm.handle(Signal::Failure), None);
        assert_eq!(fsm.state(), State::Idle);

        fsm.handle(Signal::Start);
        // frame not yet handed to the transport
        assert_eq!(fsm.handle(Signal::Success), None);
        assert_eq!(fsm.handle(Signal::Start), None);
        assert_eq!(fsm.state(), State::Sending(0));

        fsm.sent();
        fsm.handle(Signal::Success);
        fsm.sent();
        fsm.handle(Signal::Success);
        assert_eq!(fsm.state(), State::Done);
        assert_eq!(fsm.handle(Signal::Success), None);
        assert_eq!(fsm.handle(Signal::Failure), None);
        assert_eq!(fsm.state(), State::Done);
    }

    #[test]
    fn test_fsm_single_chunk() {
        let mut fsm = TransferFsm::new(1).unwrap();
        fsm.handle(Signal::Start);
        fsm.sent();
        assert_eq!(fsm.handle(Signal::Success), Some(Effect::Finish));
    }

    #[test]
    fn test_fsm_empty_payload() {
        assert!(matches!(TransferFsm::new(0), Err(TransferError::EmptyPayload)));
    }

    #[test]
    fn test_session_all_success() {
        let payload = twenty_bytes();
        let expected = encoded(&payload, &[0, 1, 2]);
        let mock = MockSerialPort::new(lines(&["k", "k", "k"]), expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 3);
    }

    #[test]
    fn test_session_retry_after_failure() {
        let payload = twenty_bytes();
        let expected = encoded(&payload, &[0, 1, 1, 2]);
        let mock = MockSerialPort::new(lines(&["k", "f", "k", "k"]), expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 4);
    }

    #[test]
    fn test_session_retry_first_chunk() {
        let payload = twenty_bytes();
        let expected = encoded(&payload, &[0, 0, 1, 2]);
        let mock = MockSerialPort::new(lines(&["f", "k", "k", "k"]), expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 4);
    }

    #[test]
    fn test_session_ignores_diagnostics() {
        let payload = twenty_bytes();
        let expected = encoded(&payload, &[0, 1, 2]);
        let responses = lines(&["Arduino ready", "k", "checksum 0x3c", "k", "", "k"]);
        let mock = MockSerialPort::new(responses, expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 3);
    }

    #[test]
    fn test_session_acks_in_one_read() {
        let payload = Payload::new(b"0123456789".to_vec());
        let expected = encoded(&payload, &[0, 1]);
        let responses = b"k\r\nk\r\n".iter().map(|&b| Some(b)).collect();
        let mock = MockSerialPort::new(responses, expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 2);
    }

    #[test]
    fn test_session_write_failure_is_not_a_nak() {
        let payload = Payload::new(b"hi".to_vec());
        let mut expected = encoded(&payload, &[0]);
        expected.remove(3);
        let mock = MockSerialPort::new(lines(&["k"]), expected).fail_write(3).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 1);
    }

    #[test]
    fn test_session_waits_through_read_timeouts() {
        let payload = Payload::new(b"hi".to_vec());
        let expected = encoded(&payload, &[0]);
        let mut responses = vec![None, None, None];
        responses.extend(lines(&["k"]));
        let mock = MockSerialPort::new(responses, expected).expect_close();

        assert_eq!(run_session(mock, payload, Timing::default()).unwrap(), 1);
    }

    #[test]
    fn test_session_ack_timeout() {
        let payload = twenty_bytes();
        let expected = encoded(&payload, &[0, 1]);
        let mock = MockSerialPort::new(lines(&["k"]), expected);
        let timing = Timing {
            ack_timeout: Some(Duration::from_millis(20)),
            ..Timing::default()
        };

        match run_session(mock, payload, timing) {
            Err(TransferError::AckTimeout { index, waited }) => {
                assert_eq!(index, 1);
                assert!(waited >= Duration::from_millis(20));
            }
            other => panic!("expected ack timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_session_rejects_empty_payload() {
        let mock = MockSerialPort::new(vec![], vec![]);
        let result = Session::new(Box::new(mock), Payload::new(Vec::new()), Timing::default());
        assert!(matches!(result, Err(TransferError::EmptyPayload)));
    }

    #[test]
    fn test_session_run_with_delays() {
        let payload = Payload::new(b"abc".to_vec());
        let expected = encoded(&payload, &[0]);
        let mock = MockSerialPort::new(lines(&["k"]), expected).expect_close();
        let timing = Timing {
            start_delay: Duration::from_millis(10),
            chunk_delay: Duration::from_millis(1),
            byte_delay: Duration::from_millis(1),
            ack_timeout: None,
        };

        let session = Session::new(Box::new(mock), payload, timing).unwrap();
        let start = Instant::now();
        assert_eq!(session.run().unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    proptest! {
        #[test]
        fn prop_fsm_sends_in_order(count in 1usize..12, acks in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut fsm = TransferFsm::new(count).unwrap();
            let mut sent = Vec::new();

            if let Some(Effect::Send { index, .. }) = fsm.handle(Signal::Start) {
                sent.push(index);
                fsm.sent();
            }

            let mut successes = 0;
            for ok in acks {
                let signal = if ok { Signal::Success } else { Signal::Failure };
                let before = fsm.state();
                let outstanding = sent.len();

                match fsm.handle(signal) {
                    Some(Effect::Send { index, repeat }) => {
                        let State::AwaitingAck(prev) = before else {
                            return Err(TestCaseError::fail("sent without outstanding ack"));
                        };
                        // exactly one new frame per acknowledgment
                        prop_assert_eq!(fsm.state(), State::Sending(index));
                        prop_assert_eq!(index, if repeat { prev } else { prev + 1 });
                        prop_assert_eq!(repeat, !ok);
                        sent.push(index);
                        fsm.sent();
                    }
                    Some(Effect::Finish) => {
                        prop_assert_eq!(before, State::AwaitingAck(count - 1));
                        prop_assert_eq!(fsm.state(), State::Done);
                    }
                    None => {
                        prop_assert_eq!(before, State::Done);
                        prop_assert_eq!(sent.len(), outstanding);
                    }
                }
                if ok && before != State::Done {
                    successes += 1;
                }
            }

            let mut distinct = sent.clone();
            distinct.dedup();
            prop_assert_eq!(distinct, (0..successes.min(count - 1) + 1).collect::<Vec<_>>());
            prop_assert_eq!(fsm.state() == State::Done, successes >= count);
        }
    }
}
