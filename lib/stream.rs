use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;

use crate::command::{Admission, CommandChannel};
use crate::config::Config;
use crate::controller::AcquisitionController;
use crate::error::{retry, Error, Result};
use crate::hw::{ScanUnit, Transport, TransportEvent};
use crate::pulse::DiagnosticPulse;
use crate::record::BatchStatus;
use crate::session::{BatchState, Session};
use crate::tick::TickSignal;
use crate::transmit::{BatchReport, BatchTransmitter, Deferred, Outcome};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub completed: u32,
    pub aborted: u32,
    pub rejected: u32,
    /// Ticks lost to the backlog limit since power on.
    pub ticks_dropped: u32,
    pub last: Option<BatchReport>,
}

/// The main loop: link events, tick-driven acquisition and batch draining.
///
/// Everything runs from [`Stream::poll`] on the main thread. The only thing
/// shared with an interrupt is the [`TickSignal`].
pub struct Stream<'a, T, S, P, D, const CAP: usize> {
    transport: T,
    scanner: S,
    pulse: DiagnosticPulse<P, D>,
    ticks: &'a TickSignal,
    session: &'a mut Session<CAP>,
    commands: CommandChannel,
    controller: AcquisitionController,
    transmitter: BatchTransmitter,
    deferred: Deferred,
    io_retries: u8,
    stats: Stats,
}

impl<'a, T, S, P, D, const CAP: usize> Stream<'a, T, S, P, D, CAP>
where
    T: Transport,
    S: ScanUnit,
    P: OutputPin,
    D: DelayUs<u32>,
{
    pub fn new(
        transport: T,
        scanner: S,
        pulse: DiagnosticPulse<P, D>,
        ticks: &'a TickSignal,
        session: &'a mut Session<CAP>,
        config: &Config,
    ) -> Self {
        Stream {
            transport,
            scanner,
            pulse,
            ticks,
            session,
            commands: CommandChannel::new(config),
            controller: AcquisitionController::new(config),
            transmitter: BatchTransmitter::new(config),
            deferred: Deferred::new(),
            io_retries: config.io_retries,
            stats: Stats::default(),
        }
    }

    pub fn open(&mut self) -> Result<(), T::Error> {
        self.transport.open().map_err(Error::Init)?;
        info!("host link open");
        Ok(())
    }

    /// Polls until a fatal error shows up and returns it.
    pub fn run(&mut self) -> Error<T::Error> {
        loop {
            match self.poll() {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return err,
                Err(_) => {}
            }
        }
    }

    /// One pass of the main loop.
    pub fn poll(&mut self) -> Result<(), T::Error> {
        let event = match self.deferred.pop_front() {
            Some(event) => Some(event),
            None => retry(self.io_retries, || self.transport.poll_event()).map_err(Error::Io)?,
        };
        if let Some(event) = event {
            self.dispatch(event)?;
        }

        self.controller
            .poll(self.session, &mut self.scanner, self.ticks);
        self.stats.ticks_dropped = self.ticks.dropped();

        if self.session.state() == BatchState::Ready {
            let report =
                self.transmitter
                    .drain(&mut self.transport, self.session, &mut self.deferred)?;
            match report.outcome {
                Outcome::Complete => self.stats.completed += 1,
                Outcome::Aborted { .. } => self.stats.aborted += 1,
            }
            self.stats.last = Some(report);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: TransportEvent) -> Result<(), T::Error> {
        trace!("link event {}", event);
        match event {
            TransportEvent::Configured => self.commands.on_configured(&mut self.transport)?,
            TransportEvent::ReadComplete => {
                let admission = self
                    .commands
                    .on_data_received(&mut self.transport, self.session)?;
                self.admitted(admission)?;
            }
            TransportEvent::WriteComplete => debug!("write completion outside a batch"),
            TransportEvent::Request => {
                retry(self.io_retries, || self.transport.answer_request()).map_err(Error::Io)?
            }
            TransportEvent::Detach | TransportEvent::Suspend => {
                self.commands.on_detach_or_suspend(&mut self.transport)
            }
            TransportEvent::Resume => self.commands.on_resume(),
        }
        Ok(())
    }

    fn admitted(&mut self, admission: Admission) -> Result<(), T::Error> {
        if let Admission::Rejected(rejection) = admission {
            self.stats.rejected += 1;
            self.transmitter.report(
                &mut self.transport,
                BatchStatus::Rejected(rejection),
                &mut self.deferred,
            )?;
        } else if let Some(count) = admission.armed() {
            self.pulse.on_batch_start(count);
        }
        Ok(())
    }

    pub fn session(&self) -> &Session<CAP> {
        self.session
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn scanner_mut(&mut self) -> &mut S {
        &mut self.scanner
    }

    pub fn pulse(&self) -> &DiagnosticPulse<P, D> {
        &self.pulse
    }
}
