/// Largest batch the host may request. Both channel buffers hold this many samples.
pub const BUFFER_CAPACITY: usize = 8192;
/// A batch of exactly this size raises the diagnostic pulse when it is armed.
/// It is the oscilloscope trigger for the full-size test batch, not a progress signal.
pub const PULSE_BATCH_SIZE: u16 = BUFFER_CAPACITY as u16;
/// High time of the diagnostic pulse, long enough for a scope to trigger on
/// and short against the 10 ms sampling interval.
pub const PULSE_WIDTH_US: u32 = 10;
/// Sampling interval of the tick timer (10 ms).
pub const TICK_RATE_HZ: u32 = 100;

/// Event polls spent waiting for the completion of one record write.
pub const WRITE_POLL_ATTEMPTS: u32 = 65_536;
/// Extra attempts for a record whose completion never showed up.
pub const WRITE_RETRIES: u8 = 2;
/// Status polls per channel before a scan is declared stalled.
pub const SCAN_POLL_ATTEMPTS: u32 = 10_000;
/// Extra attempts for a transport call that returned an error.
pub const IO_RETRIES: u8 = 3;

/// How ticks raised by the timer interrupt are handed to the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickPolicy {
    /// At most one pending tick, ticks raised while one is pending are lost.
    Latest,
    /// Up to `limit` pending ticks, the excess is dropped and counted.
    Counted { limit: u16 },
}

/// What a command does to a batch that is still being acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusyPolicy {
    /// Abandon the running batch and arm the new count.
    Replace,
    /// Keep the running batch and report the command as rejected.
    Reject,
}

/// What a command asking for more than the buffer capacity does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OversizePolicy {
    Reject,
    Clamp,
}

/// When status records are appended to the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusReport {
    Never,
    /// Only for degraded or aborted batches and rejected commands.
    OnFault,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub busy: BusyPolicy,
    pub oversize: OversizePolicy,
    pub status: StatusReport,
    pub pulse_batch_size: u16,
    pub write_poll_attempts: u32,
    pub write_retries: u8,
    pub scan_poll_attempts: u32,
    pub io_retries: u8,
}

impl Config {
    pub const fn new() -> Self {
        Config {
            busy: BusyPolicy::Replace,
            oversize: OversizePolicy::Reject,
            status: StatusReport::OnFault,
            pulse_batch_size: PULSE_BATCH_SIZE,
            write_poll_attempts: WRITE_POLL_ATTEMPTS,
            write_retries: WRITE_RETRIES,
            scan_poll_attempts: SCAN_POLL_ATTEMPTS,
            io_retries: IO_RETRIES,
        }
    }

    pub const fn busy(mut self, busy: BusyPolicy) -> Self {
        self.busy = busy;
        self
    }

    pub const fn oversize(mut self, oversize: OversizePolicy) -> Self {
        self.oversize = oversize;
        self
    }

    pub const fn status(mut self, status: StatusReport) -> Self {
        self.status = status;
        self
    }

    pub const fn pulse_batch_size(mut self, size: u16) -> Self {
        self.pulse_batch_size = size;
        self
    }

    pub const fn write_poll_attempts(mut self, attempts: u32) -> Self {
        self.write_poll_attempts = attempts;
        self
    }

    pub const fn write_retries(mut self, retries: u8) -> Self {
        self.write_retries = retries;
        self
    }

    pub const fn scan_poll_attempts(mut self, attempts: u32) -> Self {
        self.scan_poll_attempts = attempts;
        self
    }

    pub const fn io_retries(mut self, retries: u8) -> Self {
        self.io_retries = retries;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
