#![no_main]
#![no_std]

use lib as _;

use cortex_m::peripheral::SYST;
use lib::config::{TickPolicy, BUFFER_CAPACITY};
use lib::hw::{Adc, DiagPin, HostLink};
use lib::stream::Stream;
use lib::tick::TickSignal;
use stm32g0xx_hal::timer::delay::Delay;

// Written by the TIM6 handler, read by the main loop.
static TICKS: TickSignal = TickSignal::new(TickPolicy::Latest);

type HwStream = Stream<'static, HostLink, Adc, DiagPin, Delay<SYST>, BUFFER_CAPACITY>;

#[rtic::app(device = stm32g0xx_hal::stm32, peripherals = true)]
mod app {
    use crate::{HwStream, TICKS};
    use lib::config::{Config, BUFFER_CAPACITY, PULSE_WIDTH_US, TICK_RATE_HZ};
    use lib::hw::{init_clock, init_host_link, Adc, FaultLed, Pulse, TickTimer};
    use lib::session::Session;
    use lib::stream::Stream;
    use stm32g0xx_hal::delay::DelayExt;
    use stm32g0xx_hal::gpio::GpioExt;
    use stm32g0xx_hal::prelude::OutputPin;
    use stm32g0xx_hal::time::U32Ext;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        stream: HwStream,
        fault_led: FaultLed,
        tick_timer: TickTimer,
    }

    #[init(local = [session: Session<BUFFER_CAPACITY> = Session::new()])]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let core = cx.core;
        let device = cx.device;
        defmt::info!("power on");

        // Clock
        let mut rcc = init_clock(device.RCC);
        let mut delay = core.SYST.delay(&mut rcc);

        // GPIO
        let gpioa = device.GPIOA.split(&mut rcc);
        let mut fault_led = gpioa.pa5.into_push_pull_output();
        let _ = fault_led.set_low();

        // ADC
        let adc = match Adc::new(device.ADC, gpioa.pa0, gpioa.pa1, &mut rcc, &mut delay) {
            Ok(adc) => adc,
            Err(err) => {
                defmt::error!("adc bring-up failed: {}", err);
                let _ = fault_led.set_high();
                lib::exit()
            }
        };
        defmt::info!("adc calibrated");

        // Host link
        let link = match init_host_link(device.USART2, gpioa.pa2, gpioa.pa3, &mut rcc) {
            Ok(link) => link,
            Err(_) => {
                defmt::error!("host link configuration rejected");
                let _ = fault_led.set_high();
                lib::exit()
            }
        };

        let config = Config::new();
        let pulse = Pulse::new(
            gpioa.pa6.into_push_pull_output(),
            delay,
            config.pulse_batch_size,
            PULSE_WIDTH_US,
        );
        let mut stream = Stream::new(link, adc, pulse, &TICKS, cx.local.session, &config);
        if let Err(err) = stream.open() {
            defmt::error!("host link failed to open: {}", err);
            let _ = fault_led.set_high();
            lib::exit()
        }

        // Sampling tick
        let mut tick_timer = TickTimer::new(device.TIM6, TICK_RATE_HZ.hz(), &mut rcc);
        tick_timer.start();
        defmt::info!("ready, sampling at {} Hz", TICK_RATE_HZ);

        (
            Shared {},
            Local {
                stream,
                fault_led,
                tick_timer,
            },
            init::Monotonics(),
        )
    }

    #[idle(local = [stream, fault_led])]
    fn idle(cx: idle::Context) -> ! {
        let err = cx.local.stream.run();
        defmt::error!("streaming stopped: {}", err);
        let _ = cx.local.fault_led.set_high();
        lib::exit()
    }

    #[task(binds = TIM6, priority = 1, local = [tick_timer])]
    fn tim6(cx: tim6::Context) {
        cx.local.tick_timer.unpend();
        TICKS.raise();
    }
}
