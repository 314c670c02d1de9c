//! Device to host wire format.
//!
//! Every sample travels as a 6-byte record, all fields little-endian:
//!
//! ```text
//! offset 0-1: start marker (0xDEAD for samples, 0xC0DE for status)
//! offset 2-3: sample value or status word
//! offset 4-5: end marker 0xBEEF
//! ```

pub const START_MARKER: u16 = 0xDEAD;
pub const STATUS_MARKER: u16 = 0xC0DE;
pub const END_MARKER: u16 = 0xBEEF;
pub const RECORD_LEN: usize = 6;

/// One channel sample on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramedRecord {
    pub value: u16,
}

impl FramedRecord {
    pub fn new(value: u16) -> Self {
        FramedRecord { value }
    }

    pub fn to_bytes(self) -> [u8; RECORD_LEN] {
        frame(START_MARKER, self.value)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        unframe(START_MARKER, bytes).map(FramedRecord::new)
    }
}

/// Why a command was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rejection {
    Oversize,
    Busy,
    Malformed,
}

/// Batch or command outcome reported after the sample records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatchStatus {
    Complete,
    Degraded { dropped: u16 },
    Aborted,
    Rejected(Rejection),
}

impl BatchStatus {
    const DETAIL_MASK: u16 = 0x0fff;

    pub fn word(self) -> u16 {
        match self {
            BatchStatus::Complete => 0x0000,
            BatchStatus::Degraded { dropped } => 0x1000 | dropped.min(Self::DETAIL_MASK),
            BatchStatus::Aborted => 0x2000,
            BatchStatus::Rejected(Rejection::Oversize) => 0x3000,
            BatchStatus::Rejected(Rejection::Busy) => 0x3001,
            BatchStatus::Rejected(Rejection::Malformed) => 0x3002,
        }
    }

    pub fn from_word(word: u16) -> Option<Self> {
        let detail = word & Self::DETAIL_MASK;
        match (word >> 12, detail) {
            (0x0, 0) => Some(BatchStatus::Complete),
            (0x1, dropped) => Some(BatchStatus::Degraded { dropped }),
            (0x2, 0) => Some(BatchStatus::Aborted),
            (0x3, 0) => Some(BatchStatus::Rejected(Rejection::Oversize)),
            (0x3, 1) => Some(BatchStatus::Rejected(Rejection::Busy)),
            (0x3, 2) => Some(BatchStatus::Rejected(Rejection::Malformed)),
            _ => None,
        }
    }

    pub fn is_fault(self) -> bool {
        self != BatchStatus::Complete
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusRecord {
    pub status: BatchStatus,
}

impl StatusRecord {
    pub fn new(status: BatchStatus) -> Self {
        StatusRecord { status }
    }

    pub fn to_bytes(self) -> [u8; RECORD_LEN] {
        frame(STATUS_MARKER, self.status.word())
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        unframe(STATUS_MARKER, bytes)
            .and_then(BatchStatus::from_word)
            .map(StatusRecord::new)
    }
}

fn frame(start: u16, value: u16) -> [u8; RECORD_LEN] {
    let mut bytes = [0; RECORD_LEN];
    bytes[0..2].copy_from_slice(&start.to_le_bytes());
    bytes[2..4].copy_from_slice(&value.to_le_bytes());
    bytes[4..6].copy_from_slice(&END_MARKER.to_le_bytes());
    bytes
}

fn unframe(start: u16, bytes: &[u8]) -> Option<u16> {
    if bytes.len() != RECORD_LEN {
        return None;
    }
    let field = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    if field(0) != start || field(4) != END_MARKER {
        return None;
    }
    Some(field(2))
}
