//! LED intensity vector and the PWM actuation seam.
//!
//! Duty values follow the board's inverted polarity: [`DUTY_MIN`] (0x00) is
//! fully lit and [`DUTY_MAX`] (0xFF) is fully off. Every mutation clamps to
//! that range; nothing ever wraps.

use embedded_hal::pwm::SetDutyCycle;

/// Duty value for a fully lit LED (inverted PWM polarity).
pub const DUTY_MIN: u8 = 0x00;
/// Duty value for a fully dark LED.
pub const DUTY_MAX: u8 = 0xFF;
/// Intensity change applied by one effect step.
pub const DUTY_STEP: u8 = 0x0F;

/// Half of the usable intensity range; crossing it makes the bar effects
/// start dragging the neighbouring LED along, producing a gradient across
/// LED boundaries.
pub(crate) const DUTY_HALF: u8 = (DUTY_MAX - DUTY_MIN) >> 1;

/// Sink for duty-cycle updates, one value per LED.
///
/// `set_each` must apply the whole vector in one go so a bar update never
/// renders half-applied.
pub trait LedDrive<const N: usize> {
  type Error;

  /// Set every LED to the same duty value.
  fn set_all(&mut self, duty: u8) -> Result<(), Self::Error>;

  /// Set each LED to its own duty value, atomically.
  fn set_each(&mut self, duty: &[u8; N]) -> Result<(), Self::Error>;
}

/// [`LedDrive`] over `N` independent `embedded-hal` PWM channels.
///
/// The 8-bit duty range is rescaled onto whatever resolution each channel
/// actually runs at.
pub struct PwmLeds<C, const N: usize> {
  channels: [C; N],
}

impl<C: SetDutyCycle, const N: usize> PwmLeds<C, N> {
  pub fn new(channels: [C; N]) -> Self {
    Self { channels }
  }

  pub fn release(self) -> [C; N] {
    self.channels
  }
}

impl<C: SetDutyCycle, const N: usize> LedDrive<N> for PwmLeds<C, N> {
  type Error = C::Error;

  fn set_all(&mut self, duty: u8) -> Result<(), Self::Error> {
    for channel in &mut self.channels {
      channel.set_duty_cycle_fraction(duty as u16, DUTY_MAX as u16)?;
    }
    Ok(())
  }

  fn set_each(&mut self, duty: &[u8; N]) -> Result<(), Self::Error> {
    for (channel, value) in self.channels.iter_mut().zip(duty) {
      channel.set_duty_cycle_fraction(*value as u16, DUTY_MAX as u16)?;
    }
    Ok(())
  }
}

/// The LED intensity vector plus the effect focus.
///
/// All wheel and button effects walk this "bar": they brighten or darken the
/// focused LED one [`DUTY_STEP`] at a time, move the focus when it saturates,
/// and nudge the neighbour past the half-intensity point. The bar itself
/// never talks to hardware; callers flush it through a [`LedDrive`].
#[derive(Debug, Clone, PartialEq, Eq, defmt::Format)]
pub struct LedBar<const N: usize> {
  pub(crate) duty: [u8; N],
  pub(crate) focus: usize,
}

impl<const N: usize> LedBar<N> {
  /// A new bar with every LED fully lit, the hardware's power-on state.
  pub const fn new() -> Self {
    assert!(N > 0);
    Self { duty: [DUTY_MIN; N], focus: 0 }
  }

  /// Duty values, lowest LED first.
  pub const fn duty(&self) -> &[u8; N] {
    &self.duty
  }

  /// Index of the LED the effects are currently working on.
  pub const fn focus(&self) -> usize {
    self.focus
  }

  /// All LEDs dark, focus back on the first LED.
  pub(crate) fn reset(&mut self) {
    self.fill(DUTY_MAX);
    self.focus = 0;
  }

  /// Same duty everywhere, focus untouched.
  pub(crate) fn fill(&mut self, duty: u8) {
    self.duty = [duty; N];
  }

  /// One step brighter for `index`, clamped at [`DUTY_MIN`].
  pub(crate) fn brighten(&mut self, index: usize) {
    self.duty[index] = self.duty[index].saturating_sub(DUTY_STEP);
  }

  /// One step darker for `index`, clamped at [`DUTY_MAX`].
  pub(crate) fn darken(&mut self, index: usize) {
    self.duty[index] = self.duty[index].saturating_add(DUTY_STEP);
  }

  /// One brightening step of the bar walk.
  ///
  /// Skips the focus forward past already-saturated LEDs, brightens the
  /// focused LED, and drags the next one along once the focus has crossed
  /// half intensity. Returns `false` — and leaves the bar untouched — when
  /// every LED is already fully lit.
  pub(crate) fn step_brighter(&mut self) -> bool {
    while self.duty[self.focus] == DUTY_MIN {
      if self.focus == N - 1 {
        return false;
      }
      self.focus += 1;
    }
    self.brighten(self.focus);
    if self.focus != N - 1 && self.duty[self.focus] <= DUTY_HALF && self.duty[self.focus + 1] != DUTY_MIN {
      self.brighten(self.focus + 1);
    }
    true
  }

  /// One darkening step of the bar walk; mirror image of
  /// [`step_brighter`](Self::step_brighter).
  pub(crate) fn step_darker(&mut self) -> bool {
    while self.duty[self.focus] == DUTY_MAX {
      if self.focus == 0 {
        return false;
      }
      self.focus -= 1;
    }
    self.darken(self.focus);
    if self.focus != 0 && self.duty[self.focus] >= DUTY_HALF && self.duty[self.focus - 1] != DUTY_MAX {
      self.darken(self.focus - 1);
    }
    true
  }
}

impl<const N: usize> Default for LedBar<N> {
  fn default() -> Self {
    Self::new()
  }
}
