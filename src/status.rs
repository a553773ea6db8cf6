//! Status LED: a short heartbeat blink, interrupted by a longer dark period
//! when the host identifies the adapter.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Loop passes per heartbeat period.
const HEARTBEAT_TICKS: u8 = 30;
/// Loop passes the LED stays lit at the start of each heartbeat.
const HEARTBEAT_ON_TICKS: u8 = 2;
/// Steps of an identify hold.
const HOLD_STEPS: u8 = 20;
const HOLD_STEP_MS: u32 = 20;

#[derive(Debug)]
pub struct StatusLed<P> {
    pin: P,
    heartbeat: u8,
    hold: u8,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            heartbeat: 0,
            hold: 0,
        }
    }

    pub fn free(self) -> P {
        self.pin
    }

    /// Turns the LED off for a while so the host can see which adapter answered.
    pub fn identify(&mut self) -> Result<(), P::Error> {
        if self.hold == 0 {
            self.pin.set_low()?;
        }
        self.hold = HOLD_STEPS;
        Ok(())
    }

    pub fn holding(&self) -> bool {
        self.hold > 0
    }

    /// Advances the pattern by one loop pass. During an identify hold each
    /// pass also waits one hold step.
    pub fn tick<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), P::Error> {
        if self.hold > 0 {
            self.hold -= 1;
            delay.delay_ms(HOLD_STEP_MS);
            if self.hold == 0 {
                self.heartbeat = 0;
            }
            return Ok(());
        }

        if self.heartbeat == 0 {
            self.pin.set_high()?;
            self.heartbeat = HEARTBEAT_TICKS;
        } else {
            self.heartbeat -= 1;
            if self.heartbeat == HEARTBEAT_TICKS - HEARTBEAT_ON_TICKS {
                self.pin.set_low()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn heartbeat_blinks_once_per_period() {
        let expectations = [
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut led = StatusLed::new(PinMock::new(&expectations));
        let mut delay = NoopDelay::new();

        // on, then off two passes later, then on again once the period runs out
        for _ in 0..HEARTBEAT_TICKS + 2 {
            led.tick(&mut delay).unwrap();
        }

        led.free().done();
    }

    #[test]
    fn identify_holds_the_led_dark() {
        let expectations = [
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let mut led = StatusLed::new(PinMock::new(&expectations));
        let mut delay = NoopDelay::new();

        led.tick(&mut delay).unwrap();
        led.identify().unwrap();
        for _ in 0..HOLD_STEPS {
            assert!(led.holding());
            led.tick(&mut delay).unwrap();
        }
        assert!(!led.holding());
        led.tick(&mut delay).unwrap();

        led.free().done();
    }
}
