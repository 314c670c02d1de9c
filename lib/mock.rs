//! Test doubles for the peripheral traits.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;

use crate::hw::{Channel, ScanUnit, Transport, TransportEvent};
use crate::record::{BatchStatus, FramedRecord, StatusRecord, RECORD_LEN};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockError {
    Open,
    Read,
    Write,
    Poll,
    Request,
}

/// Bulk link double. Every accepted write completes on a later poll unless
/// it is stalled, received commands are delivered only while a read is armed.
#[derive(Default)]
pub struct MockTransport {
    pub events: VecDeque<TransportEvent>,
    pub inbox: VecDeque<Vec<u8>>,
    pub rx: Vec<u8>,
    pub reading: bool,
    pub read_requests: usize,
    pub fail_reads: usize,
    pub written: Vec<u8>,
    pub writes: usize,
    pub fail_writes: usize,
    pub stall_writes: usize,
    /// Stalls only start once this many writes were issued.
    pub stall_after: Option<usize>,
    pub completions: usize,
    pub write_cancels: usize,
    pub polls: usize,
    pub fail_polls: usize,
    pub fail_open: bool,
    pub fail_requests: usize,
    pub requests_answered: usize,
}

impl MockTransport {
    /// Places a completed read in the receive buffer.
    pub fn deliver(&mut self, bytes: &[u8]) {
        self.rx = bytes.to_vec();
    }

    /// Queues a command, it completes the next armed read.
    pub fn host_sends(&mut self, bytes: &[u8]) {
        self.inbox.push_back(bytes.to_vec());
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    fn open(&mut self) -> Result<(), MockError> {
        if self.fail_open {
            return Err(MockError::Open);
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<TransportEvent>, MockError> {
        self.polls += 1;
        if self.fail_polls > 0 {
            self.fail_polls -= 1;
            return Err(MockError::Poll);
        }
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        if self.reading {
            if let Some(command) = self.inbox.pop_front() {
                self.rx = command;
                self.reading = false;
                return Ok(Some(TransportEvent::ReadComplete));
            }
        }
        if self.completions > 0 {
            self.completions -= 1;
            return Ok(Some(TransportEvent::WriteComplete));
        }
        Ok(None)
    }

    fn start_read(&mut self) -> Result<(), MockError> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(MockError::Read);
        }
        self.read_requests += 1;
        self.reading = true;
        Ok(())
    }

    fn received(&self) -> &[u8] {
        &self.rx
    }

    fn clear_received(&mut self) {
        self.rx.clear();
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(MockError::Write);
        }
        let stalling =
            self.stall_writes > 0 && self.stall_after.map_or(true, |after| self.writes >= after);
        self.writes += 1;
        if stalling {
            self.stall_writes -= 1;
        } else {
            self.written.extend_from_slice(bytes);
            self.completions += 1;
        }
        Ok(())
    }

    fn cancel_write(&mut self) {
        self.write_cancels += 1;
    }

    fn answer_request(&mut self) -> Result<(), MockError> {
        if self.fail_requests > 0 {
            self.fail_requests -= 1;
            return Err(MockError::Request);
        }
        self.requests_answered += 1;
        Ok(())
    }
}

/// Converter double. Scan `n` reads `n` on channel A and `0x8000 | n` on
/// channel B.
#[derive(Default)]
pub struct MockAdc {
    pub scans: usize,
    /// `is_complete` calls per scan.
    pub status_polls: Vec<usize>,
    /// Scans that never complete.
    pub stall_on: Vec<usize>,
    pub fail_start_on: Vec<usize>,
    pub fail_read_on: Vec<usize>,
    /// Incomplete polls before every scan completes.
    pub busy_polls: usize,
    pub cancels: usize,
    current: usize,
}

impl ScanUnit for MockAdc {
    type Error = ();

    fn start_scan(&mut self) -> Result<(), ()> {
        self.current = self.scans;
        self.scans += 1;
        self.status_polls.push(0);
        if self.fail_start_on.contains(&self.current) {
            return Err(());
        }
        Ok(())
    }

    fn is_complete(&mut self, _channel: Channel) -> Result<bool, ()> {
        let polls = &mut self.status_polls[self.current];
        *polls += 1;
        if self.stall_on.contains(&self.current) {
            return Ok(false);
        }
        Ok(*polls > self.busy_polls)
    }

    fn read(&mut self, channel: Channel) -> Result<u16, ()> {
        if self.fail_read_on.contains(&self.current) {
            return Err(());
        }
        let value = self.current as u16;
        Ok(match channel {
            Channel::A => value,
            Channel::B => 0x8000 | value,
        })
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }
}

/// Records every level driven.
#[derive(Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
    pub broken: bool,
}

impl OutputPin for MockPin {
    type Error = ();

    fn set_low(&mut self) -> Result<(), ()> {
        if self.broken {
            return Err(());
        }
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), ()> {
        if self.broken {
            return Err(());
        }
        self.levels.push(true);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDelay {
    pub waited_us: u32,
}

impl DelayUs<u32> for MockDelay {
    fn delay_us(&mut self, us: u32) {
        self.waited_us += us;
    }
}

/// UART double.
#[derive(Default)]
pub struct MockSerial {
    pub incoming: VecDeque<u8>,
    pub outgoing: Vec<u8>,
    /// `flush` calls answered with `WouldBlock` before the line is idle.
    pub flush_delay: usize,
    /// Bytes accepted before the next write answers `WouldBlock`.
    pub accept_per_call: Option<usize>,
    burst: usize,
}

impl serial::Read<u8> for MockSerial {
    type Error = ();

    fn read(&mut self) -> nb::Result<u8, ()> {
        self.incoming.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for MockSerial {
    type Error = ();

    fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
        if let Some(limit) = self.accept_per_call {
            if self.burst >= limit {
                self.burst = 0;
                return Err(nb::Error::WouldBlock);
            }
            self.burst += 1;
        }
        self.outgoing.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), ()> {
        if self.flush_delay > 0 {
            self.flush_delay -= 1;
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}

/// Sample values of every sample record in `bytes`, in wire order.
pub fn records(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(RECORD_LEN)
        .filter_map(FramedRecord::from_bytes)
        .map(|record| record.value)
        .collect()
}

/// Every status record in `bytes`, in wire order.
pub fn statuses(bytes: &[u8]) -> Vec<BatchStatus> {
    bytes
        .chunks(RECORD_LEN)
        .filter_map(StatusRecord::from_bytes)
        .map(|record| record.status)
        .collect()
}
