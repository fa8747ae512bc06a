#![no_std]

//! Platform-agnostic driver for a capacitive touch front panel with a wheel,
//! five buttons and a PWM LED bar, in the style of the AT32UC3L-EK demo
//! board. The crate splits the job in three:
//!
//! - a millisecond [`TickClock`] and a [`MeasurementSlot`], the two
//!   interrupt-shared cells that carry "time to measure" and "measurement
//!   done" between ISRs and the main loop;
//! - a [`TouchSense`] trait for the acquisition backend that owns the
//!   sensing hardware;
//! - [`Panel`], the interpretation state machine that turns measurements
//!   into wheel and button behaviour on the LED bar.
//!
//! The main loop calls [`Panel::poll`] as often as it can. Each call pumps
//! backend events, starts an acquisition when one is due, and interprets
//! whatever measurement has completed since the last call.

mod buttons;
mod clock;
mod config;
mod leds;
mod measure;
mod sense;
mod wheel;

pub use buttons::ButtonPhase;
pub use clock::TickClock;
pub use config::{
  AksGroup, Held, Hysteresis, PanelLayout, Resolution, SensorConfig, SensorKind, UC3L_EK_SENSORS,
};
pub use leds::{LedBar, LedDrive, PwmLeds, DUTY_MAX, DUTY_MIN, DUTY_STEP};
pub use measure::{AcqStatus, Measurement, MeasurementSlot};
pub use sense::{AcqMode, SenseError, SensorId, TouchSense};
pub use wheel::Direction;

use buttons::Buttons;
use embedded_hal::delay::DelayNs;
use wheel::Wheel;

/// Any error the panel can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error<E> {
  /// The acquisition backend failed.
  Sense(SenseError),
  /// The LED sink failed.
  Led(E),
}

impl<E> From<SenseError> for Error<E> {
  fn from(error: SenseError) -> Self {
    Error::Sense(error)
  }
}

/// Top-level interpretation state: which sensor group owns the LED bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum DemoState {
  /// No touch activity seen yet.
  #[default]
  Idle,
  /// The wheel owns the bar.
  WheelProcessing,
  /// The buttons own the bar.
  ButtonsProcessing,
}

/// The touch panel: acquisition backend, LED sink and the interpretation
/// state machine between them.
///
/// `N` is the number of LEDs in the bar.
pub struct Panel<S, L, const N: usize> {
  sense: S,
  leds: L,
  layout: PanelLayout,
  bar: LedBar<N>,
  state: DemoState,
  wheel: Wheel,
  buttons: Buttons,
  last: Measurement,
  overruns: u32,
  consecutive_overruns: u8,
}

impl<S, L, const N: usize> Panel<S, L, N>
where
  S: TouchSense,
  L: LedDrive<N>,
{
  pub fn new(sense: S, leds: L, layout: PanelLayout) -> Self {
    Self {
      sense,
      leds,
      layout,
      bar: LedBar::new(),
      state: DemoState::Idle,
      wheel: Wheel::new(),
      buttons: Buttons::new(),
      last: Measurement::new(AcqStatus::from_bits(0), 0, 0),
      overruns: 0,
      consecutive_overruns: 0,
    }
  }

  /// Register the sensors with the backend, calibrate, and blank the bar.
  pub fn initialize(&mut self, sensors: &[SensorConfig]) -> Result<(), Error<L::Error>> {
    for sensor in sensors {
      self.sense.configure_sensor(sensor)?;
    }
    self.sense.calibrate()?;
    self.bar.reset();
    self.leds.set_all(DUTY_MAX).map_err(Error::Led)?;
    Ok(())
  }

  /// Fade all LEDs between the rails, `repeats` rail hits in total, one
  /// intensity step every 15 ms. A blocking attract sequence for power-on.
  pub fn startup_show<D>(&mut self, delay: &mut D, repeats: u8) -> Result<(), Error<L::Error>>
  where
    D: DelayNs,
  {
    if repeats == 0 {
      return Ok(());
    }
    let mut remaining = repeats;
    let mut duty = self.bar.duty()[self.bar.focus()];
    // Head for the far rail first so a bar already sitting on a rail still
    // produces a full fade.
    let mut dimming = duty != DUTY_MAX;
    loop {
      duty = if dimming { duty.saturating_add(DUTY_STEP) } else { duty.saturating_sub(DUTY_STEP) };
      self.bar.fill(duty);
      self.leds.set_all(duty).map_err(Error::Led)?;
      if duty == DUTY_MAX || duty == DUTY_MIN {
        dimming = !dimming;
        remaining -= 1;
        if remaining == 0 {
          return Ok(());
        }
      }
      delay.delay_ms(15);
    }
  }

  /// One main-loop iteration.
  ///
  /// Pumps backend events, starts an acquisition if one is due and the
  /// previous one has been consumed, then interprets the latest
  /// measurement. A [`SenseError::Busy`] from the start is an overrun and
  /// is counted rather than returned; any other backend error is fatal.
  pub fn poll(&mut self, clock: &TickClock, slot: &MeasurementSlot) -> Result<(), Error<L::Error>> {
    self.sense.pump_events();

    // Never start a new acquisition while a completed one sits unread; the
    // slot would drop the older measurement.
    if !slot.is_pending() {
      if let Some(now) = clock.take_due() {
        match self.sense.start_acquisition(now, AcqMode::Normal) {
          Ok(()) => self.consecutive_overruns = 0,
          Err(SenseError::Busy) => {
            self.overruns = self.overruns.wrapping_add(1);
            self.consecutive_overruns = self.consecutive_overruns.saturating_add(1);
          }
          Err(error) => return Err(Error::Sense(error)),
        }
      }
    }

    let fresh = match slot.take() {
      Some(measurement) => {
        self.last = measurement;
        true
      }
      None => false,
    };
    self.interpret(fresh)?;
    if fresh {
      // Consume the measurement: later polls without a new one must see no
      // activity, or a held button would double as a new touch.
      self.last.clear();
    }
    Ok(())
  }

  fn interpret(&mut self, fresh: bool) -> Result<(), Error<L::Error>> {
    let activity = self.last.status.status_changed || self.last.status.position_changed;
    let wheel_active = self.layout.wheel_active(self.last.states);
    let held = self.layout.held(self.last.states);

    loop {
      match self.state {
        DemoState::Idle => {
          if !activity {
            return Ok(());
          }
          if wheel_active {
            self.state = DemoState::WheelProcessing;
            self.wheel.rearm();
          } else if held.any() {
            self.state = DemoState::ButtonsProcessing;
          } else {
            return Ok(());
          }
          self.bar.reset();
          self.leds.set_all(DUTY_MAX).map_err(Error::Led)?;
        }
        DemoState::WheelProcessing => {
          if activity && wheel_active {
            let position = self.last.position;
            self.wheel.process(position, &mut self.bar, &mut self.leds).map_err(Error::Led)?;
            return Ok(());
          }
          if activity && held.any() {
            self.state = DemoState::ButtonsProcessing;
            continue;
          }
          return Ok(());
        }
        DemoState::ButtonsProcessing => {
          if activity && wheel_active {
            // The wheel takes the bar back; deliver any pending quick push
            // first, then start from a blank bar.
            self.buttons.reset_phase(&mut self.bar, &mut self.leds).map_err(Error::Led)?;
            self.bar.reset();
            self.leds.set_all(DUTY_MAX).map_err(Error::Led)?;
            self.state = DemoState::WheelProcessing;
            self.wheel.rearm();
            continue;
          }
          self.buttons.process(held, fresh, &mut self.bar, &mut self.leds).map_err(Error::Led)?;
          return Ok(());
        }
      }
    }
  }

  pub fn state(&self) -> DemoState {
    self.state
  }

  pub fn button_phase(&self) -> ButtonPhase {
    self.buttons.phase()
  }

  /// The LED bar as last flushed.
  pub fn bar(&self) -> &LedBar<N> {
    &self.bar
  }

  /// Measurement periods skipped because the backend was still acquiring.
  pub fn overruns(&self) -> u32 {
    self.overruns
  }

  /// Overruns since the last successful acquisition start. A persistently
  /// growing value means the measurement period is shorter than an
  /// acquisition takes.
  pub fn consecutive_overruns(&self) -> u8 {
    self.consecutive_overruns
  }

  pub fn sense(&self) -> &S {
    &self.sense
  }

  pub fn sense_mut(&mut self) -> &mut S {
    &mut self.sense
  }

  pub fn leds(&self) -> &L {
    &self.leds
  }

  /// Shut the backend down and give the peripherals back.
  pub fn release(mut self) -> Result<(S, L), Error<L::Error>> {
    self.sense.deinit()?;
    Ok((self.sense, self.leds))
  }
}
