use heapless::Vec;

use crate::hw::Channel;

/// Samples of one batch, one sequence per channel in capture order.
///
/// Both channels are always pushed together, so entry `i` of channel A and
/// entry `i` of channel B come from the same scan.
pub struct SampleBuffer<const CAP: usize> {
    a: Vec<u16, CAP>,
    b: Vec<u16, CAP>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Full;

impl<const CAP: usize> SampleBuffer<CAP> {
    pub const fn new() -> Self {
        SampleBuffer {
            a: Vec::new(),
            b: Vec::new(),
        }
    }

    pub fn push(&mut self, a: u16, b: u16) -> Result<(), Full> {
        if self.is_full() {
            return Err(Full);
        }
        self.a.push(a).map_err(|_| Full)?;
        self.b.push(b).map_err(|_| Full)
    }

    pub fn reset(&mut self) {
        self.a.clear();
        self.b.clear();
    }

    pub fn channel(&self, channel: Channel) -> &[u16] {
        match channel {
            Channel::A => &self.a,
            Channel::B => &self.b,
        }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.a.len() == CAP
    }
}

impl<const CAP: usize> Default for SampleBuffer<CAP> {
    fn default() -> Self {
        SampleBuffer::new()
    }
}
