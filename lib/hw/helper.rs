use cortex_m::peripheral::SYST;
use stm32g0xx_hal::gpio::gpioa::{PA0, PA1, PA2, PA3, PA5, PA6};
use stm32g0xx_hal::gpio::{Analog, DefaultMode, Output, PushPull};
use stm32g0xx_hal::rcc::{Config, PllConfig, Rcc, RccExt};
use stm32g0xx_hal::serial::{FullConfig, InvalidConfig, Serial, SerialExt};
use stm32g0xx_hal::stm32g0::stm32g070::{RCC, USART2};
use stm32g0xx_hal::time::U32Ext;
use stm32g0xx_hal::timer::delay::Delay;

use crate::hw::adc::ScanAdc;
use crate::hw::serial::SerialTransport;
use crate::pulse::DiagnosticPulse;

pub const HOST_BAUDRATE: u32 = 115_200;

pub fn init_clock(pac_rcc: RCC) -> Rcc {
    // ((16 MHz / 4) * 32) / 2 = 64 MHz
    let pll_config = PllConfig::with_hsi(4, 32, 2);
    pac_rcc.freeze(Config::pll().pll_cfg(pll_config))
}

// PA0 - ADC channel A input
type InputA = PA0<Analog>;
// PA1 - ADC channel B input
type InputB = PA1<Analog>;
// PA2 - USART2_TX (host link)
type HostTx = PA2<DefaultMode>;
// PA3 - USART2_RX (host link)
type HostRx = PA3<DefaultMode>;

// PA5 - Fault LED
pub type FaultLed = PA5<Output<PushPull>>;
// PA6 - Diagnostic pulse (scope trigger)
pub type DiagPin = PA6<Output<PushPull>>;

pub type Adc = ScanAdc<InputA, InputB>;
pub type HostSerial = Serial<USART2, FullConfig>;
pub type HostLink = SerialTransport<HostSerial>;
pub type Pulse = DiagnosticPulse<DiagPin, Delay<SYST>>;

pub fn init_host_link(
    pac_usart: USART2,
    tx: HostTx,
    rx: HostRx,
    rcc: &mut Rcc,
) -> Result<HostLink, InvalidConfig> {
    let config = FullConfig::default().baudrate(HOST_BAUDRATE.bps());
    let serial = pac_usart.usart(tx, rx, config, rcc)?;
    Ok(SerialTransport::new(serial))
}
