use crate::config::Config;
use crate::error::SampleError;
use crate::hw::{Channel, ScanUnit};
use crate::session::{BatchState, Session};
use crate::tick::TickSignal;

/// Outcome of one controller poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// No batch is being acquired.
    Idle,
    /// Acquiring, but no tick is pending.
    Waiting,
    Captured,
    Dropped(SampleError),
}

/// Turns pending ticks into dual-channel samples for the session.
pub struct AcquisitionController {
    scan_attempts: u32,
}

impl AcquisitionController {
    pub fn new(config: &Config) -> Self {
        AcquisitionController {
            scan_attempts: config.scan_poll_attempts.max(1),
        }
    }

    /// Runs at most one sampling step. A failed sample still uses up its
    /// tick and its slot, so the batch always ends after `original` ticks.
    pub fn poll<S: ScanUnit, const CAP: usize>(
        &mut self,
        session: &mut Session<CAP>,
        scanner: &mut S,
        ticks: &TickSignal,
    ) -> Step {
        if session.state() != BatchState::Acquiring {
            ticks.discard();
            return Step::Idle;
        }
        if !ticks.take() {
            return Step::Waiting;
        }

        let index = session.capture_index();
        let step = match self.sample(scanner) {
            Ok((a, b)) => {
                trace!("sample {}: {} {}", index, a, b);
                session.record(a, b);
                Step::Captured
            }
            Err(err) => {
                warn!("sample {} dropped: {}", index, err);
                session.skip();
                Step::Dropped(err)
            }
        };

        if session.state() == BatchState::Ready {
            info!(
                "batch of {} samples acquired, {} dropped, {} ticks lost so far",
                session.original(),
                session.dropped(),
                ticks.dropped()
            );
        }
        step
    }

    fn sample<S: ScanUnit>(&self, scanner: &mut S) -> Result<(u16, u16), SampleError> {
        scanner.start_scan().map_err(|_| SampleError::Start)?;
        for channel in Channel::ALL {
            self.wait_complete(scanner, channel)?;
        }
        let a = scanner
            .read(Channel::A)
            .map_err(|_| SampleError::Read(Channel::A))?;
        let b = scanner
            .read(Channel::B)
            .map_err(|_| SampleError::Read(Channel::B))?;
        Ok((a, b))
    }

    fn wait_complete<S: ScanUnit>(
        &self,
        scanner: &mut S,
        channel: Channel,
    ) -> Result<(), SampleError> {
        for _ in 0..self.scan_attempts {
            match scanner.is_complete(channel) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(_) => return Err(SampleError::Status(channel)),
            }
        }
        scanner.cancel();
        Err(SampleError::Timeout(channel))
    }
}
