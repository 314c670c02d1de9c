use crate::buffer::SampleBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatchState {
    Idle,
    Acquiring,
    /// Every sample slot of the batch is used, waiting to be drained.
    Ready,
}

/// Counts, state and samples of the current batch.
///
/// Owned by the main loop and lent to the command channel, the controller and
/// the transmitter in turn. Invariant: `remaining <= original <= CAP`.
pub struct AcquisitionSession<const CAP: usize> {
    state: BatchState,
    remaining: u16,
    original: u16,
    dropped: u16,
    batches: u32,
    buffer: SampleBuffer<CAP>,
}

pub type Session<const CAP: usize> = AcquisitionSession<CAP>;

impl<const CAP: usize> AcquisitionSession<CAP> {
    pub const fn new() -> Self {
        AcquisitionSession {
            state: BatchState::Idle,
            remaining: 0,
            original: 0,
            dropped: 0,
            batches: 0,
            buffer: SampleBuffer::new(),
        }
    }

    /// Starts a batch of `count` samples, discarding whatever was in flight.
    /// `count` has already been checked against the capacity.
    pub fn arm(&mut self, count: u16) {
        debug_assert!(usize::from(count) <= CAP);
        self.buffer.reset();
        self.original = count;
        self.remaining = count;
        self.dropped = 0;
        self.state = if count == 0 {
            BatchState::Idle
        } else {
            self.batches = self.batches.wrapping_add(1);
            BatchState::Acquiring
        };
    }

    /// Stores one dual-channel sample and uses up its slot.
    pub fn record(&mut self, a: u16, b: u16) {
        if self.state != BatchState::Acquiring {
            return;
        }
        if self.buffer.push(a, b).is_err() {
            // cannot happen while remaining <= CAP - len
            self.dropped = self.dropped.saturating_add(1);
        }
        self.advance();
    }

    /// Uses up a slot without storing anything.
    pub fn skip(&mut self) {
        if self.state != BatchState::Acquiring {
            return;
        }
        self.dropped = self.dropped.saturating_add(1);
        self.advance();
    }

    /// Ready -> Idle, once the batch has been drained.
    pub fn finish(&mut self) {
        self.remaining = 0;
        self.state = BatchState::Idle;
    }

    fn advance(&mut self) {
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = BatchState::Ready;
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    pub fn original(&self) -> u16 {
        self.original
    }

    /// Slots used so far, stored or dropped.
    pub fn capture_index(&self) -> u16 {
        self.original - self.remaining
    }

    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    /// Batches armed since power on.
    pub fn batches(&self) -> u32 {
        self.batches
    }

    pub fn buffer(&self) -> &SampleBuffer<CAP> {
        &self.buffer
    }
}

impl<const CAP: usize> Default for AcquisitionSession<CAP> {
    fn default() -> Self {
        AcquisitionSession::new()
    }
}
