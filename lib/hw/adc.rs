use stm32g0xx_hal::analog::adc::Adc as HalAdc;
use stm32g0xx_hal::hal::adc::Channel as AdcChannel;
use stm32g0xx_hal::hal::blocking::delay::DelayUs;
use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::stm32g0::stm32g070::{ADC, RCC};

use crate::hw::{Channel, ScanUnit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    // Previous scan still converting
    Busy,
    // Result overwritten before it was read
    Overrun,
    // Channel not converted yet
    NotReady,
    // Regulator, calibration or enable never finished during bring-up
    Timeout,
}

// Status polls per bring-up step, far longer than calibration takes at 64 MHz
const BRING_UP_POLLS: u32 = 100_000;

fn wait_for(mut done: impl FnMut() -> bool) -> Result<(), AdcError> {
    for _ in 0..BRING_UP_POLLS {
        if done() {
            return Ok(());
        }
    }
    Err(AdcError::Timeout)
}

/// Both inputs in one software triggered sequence scan.
///
/// The converter walks the channel selection upwards, so the input with the
/// lower channel number is converted first. Each end of conversion moves one
/// result out of the data register before the next can overrun it.
pub struct ScanAdc<A, B> {
    adc: ADC,
    order: [Channel; 2],
    results: [Option<u16>; 2],
    next: usize,
    _inputs: (A, B),
}

impl<A, B> ScanAdc<A, B>
where
    A: AdcChannel<HalAdc, ID = u8>,
    B: AdcChannel<HalAdc, ID = u8>,
{
    pub fn new<D: DelayUs<u8>>(
        pac_adc: ADC,
        a: A,
        b: B,
        rcc: &mut Rcc,
        delay: &mut D,
    ) -> Result<Self, AdcError> {
        enable_clock_and_reset(rcc);
        let order = if A::channel() < B::channel() {
            [Channel::A, Channel::B]
        } else {
            [Channel::B, Channel::A]
        };
        let mut adc = ScanAdc {
            adc: pac_adc,
            order,
            results: [None; 2],
            next: 0,
            _inputs: (a, b),
        };
        adc.disable()?;
        adc.enable_vreg(delay);
        adc.calibrate()?;
        adc.enable()?;
        adc.configure()?;
        Ok(adc)
    }

    fn configure(&mut self) -> Result<(), AdcError> {
        self.adc.cfgr1.write(|w| unsafe {
            // Software trigger
            w.exten().bits(0b00);
            // Right alignment
            w.align().clear_bit();
            // 12-bit resolution
            w.res().bits(0b00);
            // Upward scan
            w.scandir().clear_bit();
            // Keep the old result on overrun
            w.ovrmod().clear_bit()
        });
        // 160.5 cycles, both inputs are high impedance
        self.adc.smpr.write(|w| unsafe { w.smp1().bits(0b111) });
        self.adc
            .chselr()
            .write(|w| unsafe { w.chsel().bits(1 << A::channel() | 1 << B::channel()) });
        wait_for(|| self.adc.isr.read().ccrdy().bit_is_set())?;
        self.adc.isr.write(|w| w.ccrdy().set_bit());
        Ok(())
    }

    fn enable_vreg<D: DelayUs<u8>>(&mut self, delay: &mut D) {
        self.adc.cr.modify(|_, w| w.advregen().set_bit());
        // Max starting time declared by stm32g070 datasheet is 20 us
        delay.delay_us(20);
    }

    fn enable(&mut self) -> Result<(), AdcError> {
        self.adc.isr.write(|w| w.adrdy().set_bit());
        self.adc.cr.modify(|_, w| w.aden().set_bit());
        wait_for(|| self.adc.isr.read().adrdy().bit_is_set())
    }

    fn disable(&mut self) -> Result<(), AdcError> {
        let cr = self.adc.cr.read();
        if cr.aden().bit_is_clear() {
            return Ok(());
        }
        if cr.adstart().bit_is_set() {
            self.adc.cr.modify(|_, w| w.adstp().set_bit());
        }
        self.adc.cr.modify(|_, w| w.addis().set_bit());
        wait_for(|| self.adc.cr.read().aden().bit_is_clear())?;
        self.adc.isr.write(|w| w.adrdy().set_bit());
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), AdcError> {
        self.adc.cr.modify(|_, w| w.adcal().set_bit());
        wait_for(|| self.adc.isr.read().eocal().bit_is_set())?;
        self.adc.isr.write(|w| w.eocal().set_bit());
        Ok(())
    }
}

impl<A, B> ScanUnit for ScanAdc<A, B> {
    type Error = AdcError;

    fn start_scan(&mut self) -> Result<(), AdcError> {
        if self.adc.cr.read().adstart().bit_is_set() {
            return Err(AdcError::Busy);
        }
        self.results = [None; 2];
        self.next = 0;
        self.adc.isr.write(|w| {
            w.eoc().set_bit();
            w.eos().set_bit();
            w.ovr().set_bit()
        });
        self.adc.cr.modify(|_, w| w.adstart().set_bit());
        Ok(())
    }

    fn is_complete(&mut self, channel: Channel) -> Result<bool, AdcError> {
        let isr = self.adc.isr.read();
        if isr.ovr().bit_is_set() {
            self.adc.isr.write(|w| w.ovr().set_bit());
            return Err(AdcError::Overrun);
        }
        if isr.eoc().bit_is_set() {
            if let Some(&converted) = self.order.get(self.next) {
                // reading the data register clears EOC
                let value = self.adc.dr.read().bits() as u16;
                self.results[slot(converted)] = Some(value);
                self.next += 1;
            }
        }
        Ok(self.results[slot(channel)].is_some())
    }

    fn read(&mut self, channel: Channel) -> Result<u16, AdcError> {
        self.results[slot(channel)].ok_or(AdcError::NotReady)
    }

    fn cancel(&mut self) {
        if self.adc.cr.read().adstart().bit_is_set() {
            self.adc.cr.modify(|_, w| w.adstp().set_bit());
        }
        self.results = [None; 2];
        self.next = 0;
    }
}

fn slot(channel: Channel) -> usize {
    match channel {
        Channel::A => 0,
        Channel::B => 1,
    }
}

fn enable_clock_and_reset(_: &mut Rcc) {
    let rcc = unsafe { &(*RCC::ptr()) };
    rcc.apbenr2.modify(|_, w| w.adcen().set_bit());
    rcc.apbrstr2.modify(|_, w| w.adcrst().set_bit());
    rcc.apbrstr2.modify(|_, w| w.adcrst().clear_bit());
}
