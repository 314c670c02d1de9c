use crate::hw::Channel;

pub type Result<T, IO> = core::result::Result<T, Error<IO>>;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<IO> {
    // Transport could not be opened
    Init(IO),
    // Transport call kept failing after retries
    Io(IO),
    // Single sample lost
    Sample(SampleError),
    // Record write never completed
    WriteTimeout,
}

impl<IO> Error<IO> {
    /// Fatal errors stop the main loop, everything else is handled in place.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Init(_) | Error::Io(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    Start,
    Status(Channel),
    Timeout(Channel),
    Read(Channel),
}

impl<IO> From<SampleError> for Error<IO> {
    fn from(err: SampleError) -> Self {
        Error::Sample(err)
    }
}

/// Runs `op` once plus up to `retries` more times while it fails.
pub(crate) fn retry<T, E>(
    retries: u8,
    mut op: impl FnMut() -> core::result::Result<T, E>,
) -> core::result::Result<T, E> {
    let mut left = retries;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if left == 0 => return Err(err),
            Err(_) => {
                left -= 1;
                warn!("transport call failed, {} retries left", left);
            }
        }
    }
}
