#[cfg(feature = "firmware")]
mod adc;
#[cfg(feature = "firmware")]
mod helper;
mod serial;
#[cfg(feature = "firmware")]
mod timers;

#[cfg(feature = "firmware")]
pub use adc::{AdcError, ScanAdc};
#[cfg(feature = "firmware")]
pub use helper::*;
pub use serial::{LinkError, SerialTransport};
#[cfg(feature = "firmware")]
pub use timers::TickTimer;

/// One of the two analog inputs scanned together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];
}

/// Synchronized conversion of both analog channels.
pub trait ScanUnit {
    type Error;
    fn start_scan(&mut self) -> Result<(), Self::Error>;
    /// Whether the running scan has finished converting `channel`.
    fn is_complete(&mut self, channel: Channel) -> Result<bool, Self::Error>;
    fn read(&mut self, channel: Channel) -> Result<u16, Self::Error>;
    /// Leaves the converter idle after a stalled scan.
    fn cancel(&mut self) {}
}

/// Lifecycle and data events reported by the host link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent {
    Configured,
    ReadComplete,
    WriteComplete,
    /// Class request (line coding, control line state) waiting for an answer.
    Request,
    Detach,
    Suspend,
    Resume,
}

/// Bulk link to the host.
pub trait Transport {
    type Error;

    fn open(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<TransportEvent>, Self::Error>;

    /// Arms the receive path, completion is signalled by [`TransportEvent::ReadComplete`].
    fn start_read(&mut self) -> Result<(), Self::Error>;
    fn received(&self) -> &[u8];
    fn clear_received(&mut self);

    /// Starts sending `bytes`, completion is signalled by [`TransportEvent::WriteComplete`].
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Gives up a write whose completion never arrived, so the next one can start.
    fn cancel_write(&mut self) {}

    fn answer_request(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
