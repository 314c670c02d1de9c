use stm32g0xx_hal::hal::timer::CountDown;
use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::stm32g0::stm32g070::TIM6;
use stm32g0xx_hal::time::Hertz;
use stm32g0xx_hal::timer::{Timer, TimerExt};

/// Periodic update interrupt that paces sampling.
pub struct TickTimer {
    timer: Timer<TIM6>,
    rate: Hertz,
}

impl TickTimer {
    pub fn new(pac_tim: TIM6, rate: Hertz, rcc: &mut Rcc) -> Self {
        TickTimer {
            timer: pac_tim.timer(rcc),
            rate,
        }
    }

    pub fn start(&mut self) {
        self.timer.clear_irq();
        self.timer.listen();
        self.timer.start(self.rate);
    }

    /// Acknowledges the update interrupt.
    pub fn unpend(&mut self) {
        self.timer.clear_irq();
    }
}
