// Raspberry Pi backend: hardware PWM plus direction/sleep GPIO per
// actuator, with rising-edge interrupts on the encoder A phases.

use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};
use tracing::{error, info};

use super::driver::{Actuator, MotorDriver, clamp_speed};
use crate::config::PWM_MAX;
use crate::state::QuadratureCounter;

const PWM_FREQ_HZ: f64 = 20_000.0;

#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("gpio: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("pwm: {0}")]
    Pwm(#[from] rppal::pwm::Error),
}

/// BCM pin assignment for one actuator channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelPins {
    pub sleep: u8,
    pub dir: u8,
    pub enc_a: u8,
    pub enc_b: u8,
    pub pwm: Channel,
}

/// Reference wiring: actuator A on PWM0, actuator B on PWM1.
pub const PINS_A: ChannelPins = ChannelPins {
    sleep: 10,
    dir: 15,
    enc_a: 21,
    enc_b: 22,
    pwm: Channel::Pwm0,
};
pub const PINS_B: ChannelPins = ChannelPins {
    sleep: 17,
    dir: 14,
    enc_a: 19,
    enc_b: 20,
    pwm: Channel::Pwm1,
};

struct DriveChannel {
    // held so the sleep line stays asserted for the process lifetime
    _sleep: OutputPin,
    dir: OutputPin,
    pwm: Pwm,
    // holding the pin keeps the interrupt registration alive
    _enc_a: InputPin,
}

impl DriveChannel {
    fn claim(gpio: &Gpio, pins: ChannelPins, counter: QuadratureCounter) -> Result<Self, GpioError> {
        let mut sleep = gpio.get(pins.sleep)?.into_output_low();
        let dir = gpio.get(pins.dir)?.into_output_low();
        let pwm = Pwm::with_frequency(pins.pwm, PWM_FREQ_HZ, 0.0, Polarity::Normal, true)?;

        let mut enc_a = gpio.get(pins.enc_a)?.into_input();
        let enc_b = gpio.get(pins.enc_b)?.into_input();
        // The B phase must be sampled in the same callback invocation as
        // the A edge; reading it any later loses the quadrature pairing.
        enc_a.set_async_interrupt(Trigger::RisingEdge, None, move |_| {
            counter.on_rising_edge(enc_b.is_high());
        })?;

        // driver enabled from here on; drive(0) only zeroes the duty
        sleep.set_high();
        Ok(Self {
            _sleep: sleep,
            dir,
            pwm,
            _enc_a: enc_a,
        })
    }

    fn drive(&mut self, speed: i32) -> Result<(), GpioError> {
        let speed = clamp_speed(speed);
        if speed >= 0 {
            self.dir.set_low();
        } else {
            self.dir.set_high();
        }
        let duty = f64::from(speed.unsigned_abs()) / f64::from(PWM_MAX as u32);
        self.pwm.set_duty_cycle(duty)?;
        Ok(())
    }
}

pub struct GpioActuators {
    a: DriveChannel,
    b: DriveChannel,
}

impl GpioActuators {
    /// Claim the reference pins, assert both sleep lines and hook the
    /// encoder interrupts. The counters feed the shared state from
    /// rppal's interrupt thread.
    pub fn new(
        counter_a: QuadratureCounter,
        counter_b: QuadratureCounter,
    ) -> Result<Self, GpioError> {
        Self::with_pins(PINS_A, PINS_B, counter_a, counter_b)
    }

    pub fn with_pins(
        pins_a: ChannelPins,
        pins_b: ChannelPins,
        counter_a: QuadratureCounter,
        counter_b: QuadratureCounter,
    ) -> Result<Self, GpioError> {
        let gpio = Gpio::new()?;
        let a = DriveChannel::claim(&gpio, pins_a, counter_a)?;
        let b = DriveChannel::claim(&gpio, pins_b, counter_b)?;
        info!("gpio actuator channels up");
        Ok(Self { a, b })
    }
}

impl MotorDriver for GpioActuators {
    fn drive(&mut self, actuator: Actuator, speed: i32) {
        let channel = match actuator {
            Actuator::A => &mut self.a,
            Actuator::B => &mut self.b,
        };
        if let Err(e) = channel.drive(speed) {
            error!(?actuator, "pwm update failed: {e}");
        }
    }
}

impl Drop for GpioActuators {
    fn drop(&mut self) {
        // de-energize both coils on the way out
        let _ = self.a.pwm.set_duty_cycle(0.0);
        let _ = self.b.pwm.set_duty_cycle(0.0);
    }
}
