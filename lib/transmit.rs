use heapless::Deque;

use crate::config::{Config, StatusReport};
use crate::error::{retry, Error, Result};
use crate::hw::{Channel, Transport, TransportEvent};
use crate::record::{BatchStatus, FramedRecord, StatusRecord, RECORD_LEN};
use crate::session::Session;

pub const DEFERRED_LEN: usize = 8;

/// Events seen while waiting for a write completion, handled once the
/// transmitter gives the link back to the main loop.
pub type Deferred = Deque<TransportEvent, DEFERRED_LEN>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Complete,
    /// The record at `index` of `channel` never completed, nothing after it was sent.
    Aborted { channel: Channel, index: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchReport {
    pub original: u16,
    pub sent_a: u16,
    pub sent_b: u16,
    pub dropped: u16,
    pub outcome: Outcome,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        match self.outcome {
            Outcome::Aborted { .. } => BatchStatus::Aborted,
            Outcome::Complete if self.dropped > 0 => BatchStatus::Degraded {
                dropped: self.dropped,
            },
            Outcome::Complete => BatchStatus::Complete,
        }
    }

    fn count(&mut self, channel: Channel) {
        match channel {
            Channel::A => self.sent_a += 1,
            Channel::B => self.sent_b += 1,
        }
    }
}

/// Drains a ready batch to the host: every channel A record in capture
/// order, then every channel B record, one write completion at a time.
pub struct BatchTransmitter {
    poll_attempts: u32,
    write_retries: u8,
    io_retries: u8,
    status: StatusReport,
}

impl BatchTransmitter {
    pub fn new(config: &Config) -> Self {
        BatchTransmitter {
            poll_attempts: config.write_poll_attempts.max(1),
            write_retries: config.write_retries,
            io_retries: config.io_retries,
            status: config.status,
        }
    }

    /// Sends the batch and returns the session to idle. Only fatal transport
    /// errors are returned, a stuck write aborts the batch instead.
    pub fn drain<T: Transport, const CAP: usize>(
        &mut self,
        transport: &mut T,
        session: &mut Session<CAP>,
        deferred: &mut Deferred,
    ) -> Result<BatchReport, T::Error> {
        let mut report = BatchReport {
            original: session.original(),
            sent_a: 0,
            sent_b: 0,
            dropped: session.dropped(),
            outcome: Outcome::Complete,
        };

        'channels: for channel in Channel::ALL {
            for (index, &value) in session.buffer().channel(channel).iter().enumerate() {
                let record = FramedRecord::new(value).to_bytes();
                match self.send(transport, &record, deferred) {
                    Ok(()) => report.count(channel),
                    Err(Error::WriteTimeout) => {
                        error!(
                            "record {} of channel {} never completed, batch aborted",
                            index, channel
                        );
                        report.outcome = Outcome::Aborted {
                            channel,
                            index: index as u16,
                        };
                        break 'channels;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        session.finish();

        info!(
            "batch sent: {} + {} records of {}",
            report.sent_a, report.sent_b, report.original
        );
        self.report(transport, report.status(), deferred)?;
        Ok(report)
    }

    /// Appends a status record if the reporting policy asks for it.
    /// Returns whether the record went out.
    pub fn report<T: Transport>(
        &mut self,
        transport: &mut T,
        status: BatchStatus,
        deferred: &mut Deferred,
    ) -> Result<bool, T::Error> {
        let wanted = match self.status {
            StatusReport::Never => false,
            StatusReport::OnFault => status.is_fault(),
            StatusReport::Always => true,
        };
        if !wanted {
            return Ok(false);
        }

        let record = StatusRecord::new(status).to_bytes();
        match self.send(transport, &record, deferred) {
            Ok(()) => Ok(true),
            Err(Error::WriteTimeout) => {
                warn!("status record {} not delivered", status);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn send<T: Transport>(
        &self,
        transport: &mut T,
        record: &[u8; RECORD_LEN],
        deferred: &mut Deferred,
    ) -> Result<(), T::Error> {
        let mut attempt = 0;
        loop {
            retry(self.io_retries, || transport.write(record)).map_err(Error::Io)?;
            match self.wait_write_complete(transport, deferred) {
                Err(Error::WriteTimeout) => {
                    transport.cancel_write();
                    if attempt == self.write_retries {
                        return Err(Error::WriteTimeout);
                    }
                    attempt += 1;
                    warn!(
                        "write completion timed out, retry {} of {}",
                        attempt, self.write_retries
                    );
                }
                res => return res,
            }
        }
    }

    fn wait_write_complete<T: Transport>(
        &self,
        transport: &mut T,
        deferred: &mut Deferred,
    ) -> Result<(), T::Error> {
        for _ in 0..self.poll_attempts {
            match retry(self.io_retries, || transport.poll_event()).map_err(Error::Io)? {
                Some(TransportEvent::WriteComplete) => return Ok(()),
                Some(event) => {
                    if deferred.push_back(event).is_err() {
                        warn!("event {} lost, deferred queue full", event);
                    }
                }
                None => {}
            }
        }
        Err(Error::WriteTimeout)
    }
}
