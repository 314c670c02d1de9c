use crate::config::{BusyPolicy, Config, OversizePolicy};
use crate::error::{retry, Error, Result};
use crate::hw::Transport;
use crate::record::Rejection;
use crate::session::{BatchState, Session};

/// Host commands are a bare little-endian `u16` batch size.
pub const COMMAND_LEN: usize = 2;

pub fn parse(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// What happened to a received command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    Armed(u16),
    /// Zero samples requested, nothing to acquire.
    Idle,
    Clamped { requested: u16, armed: u16 },
    Rejected(Rejection),
}

impl Admission {
    /// Size of the batch that was started, if any.
    pub fn armed(self) -> Option<u16> {
        match self {
            Admission::Armed(count) => Some(count),
            Admission::Clamped { armed, .. } => Some(armed),
            Admission::Idle | Admission::Rejected(_) => None,
        }
    }
}

/// Receive side of the host link: keeps a read armed and turns completed
/// reads into batch sizes for the session.
pub struct CommandChannel {
    attached: bool,
    busy: BusyPolicy,
    oversize: OversizePolicy,
    io_retries: u8,
}

impl CommandChannel {
    pub fn new(config: &Config) -> Self {
        CommandChannel {
            attached: false,
            busy: config.busy,
            oversize: config.oversize,
            io_retries: config.io_retries,
        }
    }

    pub fn on_configured<T: Transport>(&mut self, transport: &mut T) -> Result<(), T::Error> {
        info!("host link configured");
        self.attached = true;
        retry(self.io_retries, || transport.start_read()).map_err(Error::Io)
    }

    pub fn on_data_received<T: Transport, const CAP: usize>(
        &mut self,
        transport: &mut T,
        session: &mut Session<CAP>,
    ) -> Result<Admission, T::Error> {
        let request = parse(transport.received());
        transport.clear_received();
        if self.attached {
            retry(self.io_retries, || transport.start_read()).map_err(Error::Io)?;
        }

        let admission = match request {
            Some(count) => {
                info!("host requested {} samples", count);
                self.admit(count, session)
            }
            None => {
                warn!("command shorter than {} bytes", COMMAND_LEN);
                Admission::Rejected(Rejection::Malformed)
            }
        };
        Ok(admission)
    }

    pub fn on_detach_or_suspend<T: Transport>(&mut self, transport: &mut T) {
        info!("host link detached");
        self.attached = false;
        transport.clear_received();
    }

    pub fn on_resume(&mut self) {
        info!("host link resumed");
        self.attached = true;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Applies a requested batch size to the session according to the policies.
    pub fn admit<const CAP: usize>(&self, count: u16, session: &mut Session<CAP>) -> Admission {
        match session.state() {
            BatchState::Ready => {
                warn!("batch waiting for transmission, command rejected");
                return Admission::Rejected(Rejection::Busy);
            }
            BatchState::Acquiring if self.busy == BusyPolicy::Reject => {
                warn!(
                    "batch running with {} samples left, command rejected",
                    session.remaining()
                );
                return Admission::Rejected(Rejection::Busy);
            }
            BatchState::Acquiring => {
                warn!(
                    "batch abandoned after {} of {} samples",
                    session.capture_index(),
                    session.original()
                );
            }
            BatchState::Idle => {}
        }

        let capacity = u16::try_from(CAP).unwrap_or(u16::MAX);
        if count > capacity {
            match self.oversize {
                OversizePolicy::Reject => {
                    warn!("{} samples exceed capacity {}, rejected", count, capacity);
                    return Admission::Rejected(Rejection::Oversize);
                }
                OversizePolicy::Clamp => {
                    warn!("{} samples exceed capacity, clamped to {}", count, capacity);
                    session.arm(capacity);
                    return Admission::Clamped {
                        requested: count,
                        armed: capacity,
                    };
                }
            }
        }

        session.arm(count);
        if count == 0 {
            Admission::Idle
        } else {
            info!("acquiring batch of {} samples", count);
            Admission::Armed(count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::Channel;
    use crate::mock::{MockError, MockTransport};

    fn channel(config: Config) -> (CommandChannel, MockTransport) {
        let mut transport = MockTransport::default();
        let mut commands = CommandChannel::new(&config);
        commands.on_configured(&mut transport).unwrap();
        (commands, transport)
    }

    #[test]
    fn parses_little_endian_count() {
        assert_eq!(parse(&[0x0a, 0x00]), Some(10));
        assert_eq!(parse(&[0x00, 0x20]), Some(8192));
        assert_eq!(parse(&[0x00, 0x20, 0xff, 0xff]), Some(8192));
        assert_eq!(parse(&[0x0a]), None);
        assert_eq!(parse(&[]), None);
    }

    #[test]
    fn configured_arms_first_read() {
        let (commands, transport) = channel(Config::new());
        assert!(commands.is_attached());
        assert_eq!(transport.read_requests, 1);
    }

    #[test]
    fn received_command_arms_session_and_rearms_read() {
        let (mut commands, mut transport) = channel(Config::new());
        let mut session = Session::<16>::new();

        transport.deliver(&[0x0a, 0x00, 0x55]);
        let admission = commands
            .on_data_received(&mut transport, &mut session)
            .unwrap();

        assert_eq!(admission, Admission::Armed(10));
        assert_eq!(session.state(), BatchState::Acquiring);
        assert_eq!(session.remaining(), 10);
        assert_eq!(session.original(), 10);
        assert!(transport.received().is_empty());
        assert_eq!(transport.read_requests, 2);
    }

    #[test]
    fn zero_count_keeps_session_idle() {
        let (mut commands, mut transport) = channel(Config::new());
        let mut session = Session::<16>::new();

        transport.deliver(&[0, 0]);
        let admission = commands
            .on_data_received(&mut transport, &mut session)
            .unwrap();
        assert_eq!(admission, Admission::Idle);
        assert_eq!(session.state(), BatchState::Idle);
    }

    #[test]
    fn short_command_is_malformed() {
        let (mut commands, mut transport) = channel(Config::new());
        let mut session = Session::<16>::new();

        transport.deliver(&[7]);
        let admission = commands
            .on_data_received(&mut transport, &mut session)
            .unwrap();
        assert_eq!(admission, Admission::Rejected(Rejection::Malformed));
        assert_eq!(session.state(), BatchState::Idle);
    }

    #[test]
    fn oversize_is_rejected_by_default() {
        let (commands, _) = channel(Config::new());
        let mut session = Session::<16>::new();

        assert_eq!(
            commands.admit(17, &mut session),
            Admission::Rejected(Rejection::Oversize)
        );
        assert_eq!(session.state(), BatchState::Idle);
        assert_eq!(commands.admit(16, &mut session), Admission::Armed(16));
    }

    #[test]
    fn oversize_can_be_clamped() {
        let (commands, _) = channel(Config::new().oversize(OversizePolicy::Clamp));
        let mut session = Session::<16>::new();

        assert_eq!(
            commands.admit(1000, &mut session),
            Admission::Clamped {
                requested: 1000,
                armed: 16
            }
        );
        assert_eq!(session.original(), 16);
    }

    #[test]
    fn busy_batch_is_replaced_by_default() {
        let (commands, _) = channel(Config::new());
        let mut session = Session::<16>::new();

        commands.admit(8, &mut session);
        session.record(1, 1);
        assert_eq!(commands.admit(3, &mut session), Admission::Armed(3));
        assert_eq!(session.remaining(), 3);
        assert!(session.buffer().is_empty());
    }

    #[test]
    fn busy_batch_can_reject_commands() {
        let (commands, _) = channel(Config::new().busy(BusyPolicy::Reject));
        let mut session = Session::<16>::new();

        commands.admit(8, &mut session);
        session.record(1, 1);
        assert_eq!(
            commands.admit(3, &mut session),
            Admission::Rejected(Rejection::Busy)
        );
        assert_eq!(session.remaining(), 7);
        assert_eq!(session.buffer().len(), 1);
    }

    #[test]
    fn ready_batch_rejects_commands() {
        let (commands, _) = channel(Config::new());
        let mut session = Session::<16>::new();

        commands.admit(2, &mut session);
        session.record(1, 11);
        session.record(2, 12);
        assert_eq!(session.state(), BatchState::Ready);

        assert_eq!(
            commands.admit(5, &mut session),
            Admission::Rejected(Rejection::Busy)
        );
        assert_eq!(session.state(), BatchState::Ready);
        assert_eq!(session.original(), 2);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.buffer().channel(Channel::A), &[1, 2]);
        assert_eq!(session.buffer().channel(Channel::B), &[11, 12]);
    }

    #[test]
    fn detached_link_does_not_rearm_read() {
        let (mut commands, mut transport) = channel(Config::new());
        let mut session = Session::<16>::new();

        transport.deliver(&[1, 0]);
        commands.on_detach_or_suspend(&mut transport);
        assert!(!commands.is_attached());
        assert!(transport.received().is_empty());

        transport.deliver(&[2, 0]);
        commands
            .on_data_received(&mut transport, &mut session)
            .unwrap();
        assert_eq!(transport.read_requests, 1);

        commands.on_resume();
        transport.deliver(&[3, 0]);
        commands
            .on_data_received(&mut transport, &mut session)
            .unwrap();
        assert_eq!(transport.read_requests, 2);
        assert_eq!(session.original(), 3);
    }

    #[test]
    fn failing_read_rearm_escalates() {
        let (mut commands, mut transport) = channel(Config::new().io_retries(2));
        let mut session = Session::<16>::new();

        transport.fail_reads = 3;
        transport.deliver(&[1, 0]);
        assert_eq!(
            commands.on_data_received(&mut transport, &mut session),
            Err(Error::Io(MockError::Read))
        );
        assert_eq!(transport.fail_reads, 0);
    }
}
