use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;

/// Scope trigger on a status output.
///
/// Pulses once when a batch of exactly `trigger` samples is armed. Smaller
/// and larger batches never pulse.
pub struct DiagnosticPulse<P, D> {
    pin: P,
    delay: D,
    trigger: u16,
    width_us: u32,
    fired: u32,
}

impl<P, D> DiagnosticPulse<P, D>
where
    P: OutputPin,
    D: DelayUs<u32>,
{
    pub fn new(pin: P, delay: D, trigger: u16, width_us: u32) -> Self {
        let mut pulse = DiagnosticPulse {
            pin,
            delay,
            trigger,
            width_us,
            fired: 0,
        };
        if pulse.pin.set_low().is_err() {
            warn!("diagnostic output not driven low");
        }
        pulse
    }

    /// Returns whether the pulse was emitted.
    pub fn on_batch_start(&mut self, original: u16) -> bool {
        if original != self.trigger {
            return false;
        }
        if self.pin.set_high().is_err() {
            warn!("diagnostic output failed");
            return false;
        }
        self.delay.delay_us(self.width_us);
        if self.pin.set_low().is_err() {
            warn!("diagnostic output stuck high");
        }
        self.fired = self.fired.wrapping_add(1);
        debug!("diagnostic pulse for batch of {}", original);
        true
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}
