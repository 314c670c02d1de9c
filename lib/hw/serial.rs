use embedded_hal::serial;
use heapless::Vec;

use crate::command::COMMAND_LEN;
use crate::hw::{Transport, TransportEvent};

const RX_LEN: usize = 64;
const TX_LEN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    // Previous write still in flight
    Busy,
    // Write does not fit the staging buffer
    TooLong,
    // Serial peripheral refused a byte
    Write,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tx {
    Idle,
    Sending,
    Done,
}

/// Host link over a plain UART.
///
/// The byte stream is mapped onto the bulk transport lifecycle: the link is
/// configured on the first poll, an armed read completes once a whole command
/// has arrived and a write completes once its last byte left the shift register.
pub struct SerialTransport<S> {
    serial: S,
    configured: bool,
    reading: bool,
    rx: Vec<u8, RX_LEN>,
    rx_dropped: u32,
    tx: Vec<u8, TX_LEN>,
    sent: usize,
    state: Tx,
}

impl<S> SerialTransport<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(serial: S) -> Self {
        SerialTransport {
            serial,
            configured: false,
            reading: false,
            rx: Vec::new(),
            rx_dropped: 0,
            tx: Vec::new(),
            sent: 0,
            state: Tx::Idle,
        }
    }

    /// Bytes lost to a full receive buffer or a receiver error.
    pub fn rx_dropped(&self) -> u32 {
        self.rx_dropped
    }

    pub fn release(self) -> S {
        self.serial
    }

    fn receive(&mut self) {
        loop {
            match self.serial.read() {
                Ok(byte) => {
                    if self.rx.push(byte).is_err() {
                        self.rx_dropped = self.rx_dropped.saturating_add(1);
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    // overrun or framing error, the byte is gone
                    self.rx_dropped = self.rx_dropped.saturating_add(1);
                    warn!("serial receive error");
                    break;
                }
            }
        }
    }

    fn transmit(&mut self) -> Result<(), LinkError> {
        while let Some(&byte) = self.tx.get(self.sent) {
            match self.serial.write(byte) {
                Ok(()) => self.sent += 1,
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(_)) => return Err(LinkError::Write),
            }
        }
        match self.serial.flush() {
            Ok(()) => {
                self.state = Tx::Done;
                Ok(())
            }
            Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(_)) => Err(LinkError::Write),
        }
    }
}

impl<S> Transport for SerialTransport<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    type Error = LinkError;

    fn poll_event(&mut self) -> Result<Option<TransportEvent>, LinkError> {
        if !self.configured {
            self.configured = true;
            return Ok(Some(TransportEvent::Configured));
        }

        self.receive();

        if self.state == Tx::Sending {
            self.transmit()?;
        }
        if self.state == Tx::Done {
            self.state = Tx::Idle;
            return Ok(Some(TransportEvent::WriteComplete));
        }

        if self.reading && self.rx.len() >= COMMAND_LEN {
            self.reading = false;
            return Ok(Some(TransportEvent::ReadComplete));
        }
        Ok(None)
    }

    fn start_read(&mut self) -> Result<(), LinkError> {
        self.reading = true;
        Ok(())
    }

    fn received(&self) -> &[u8] {
        &self.rx
    }

    fn clear_received(&mut self) {
        self.rx.clear();
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.state == Tx::Sending {
            return Err(LinkError::Busy);
        }
        self.tx.clear();
        self.tx
            .extend_from_slice(bytes)
            .map_err(|_| LinkError::TooLong)?;
        self.sent = 0;
        self.state = Tx::Sending;
        self.transmit()
    }

    fn cancel_write(&mut self) {
        if self.state == Tx::Sending {
            debug!("write abandoned after {} of {} bytes", self.sent, self.tx.len());
        }
        self.tx.clear();
        self.sent = 0;
        self.state = Tx::Idle;
    }
}
