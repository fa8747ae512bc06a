//! Rotor interpretation: turns a stream of 8-bit wheel positions into
//! brightness steps on the LED bar.

use crate::leds::{LedBar, LedDrive};

/// Direction of travel between two wheel readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Direction {
  Stable,
  Clockwise,
  Anticlockwise,
}

/// Direction of travel from `previous` to `current` on the 8-bit wheel.
///
/// The positions are compared as plain bytes, not circularly: when the
/// unsigned distance exceeds half the range the move is treated as a
/// sampling artifact and reported as [`Direction::Stable`], so a step
/// across the 0/255 seam yields no direction. Within the guard the delta
/// is read as signed; a distance of exactly half the range wraps to -128
/// and reads as anticlockwise from either side.
pub(crate) fn direction_between(previous: u8, current: u8) -> Direction {
  let distance = if current >= previous { current - previous } else { previous - current };
  if distance > 128 {
    return Direction::Stable;
  }
  let delta = (current as i8).wrapping_sub(previous as i8);
  match delta {
    0 => Direction::Stable,
    d if d > 0 => Direction::Clockwise,
    _ => Direction::Anticlockwise,
  }
}

/// Wheel state machine.
///
/// The first reading after [`rearm`](Self::rearm) only primes the position
/// baseline; effects start from the second reading. Clockwise travel
/// brightens the bar, anticlockwise darkens it.
#[derive(Debug, Default, defmt::Format)]
pub struct Wheel {
  previous_position: u8,
  previous_direction: Direction,
  primed: bool,
}

impl Default for Direction {
  fn default() -> Self {
    Direction::Stable
  }
}

impl Wheel {
  pub(crate) const fn new() -> Self {
    Self { previous_position: 0, previous_direction: Direction::Stable, primed: false }
  }

  /// Drop the position baseline; the next reading primes it afresh.
  pub(crate) fn rearm(&mut self) {
    self.primed = false;
  }

  /// Feed one position reading and drive the bar accordingly.
  pub(crate) fn process<L, const N: usize>(
    &mut self,
    position: u8,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    if !self.primed {
      self.previous_position = position;
      self.primed = true;
      return Ok(());
    }

    let direction = direction_between(self.previous_position, position);
    self.previous_position = position;

    let stepped = match direction {
      Direction::Stable => false,
      Direction::Clockwise => {
        // A reversal leaves the focus one LED past where the brightening
        // walk wants it; pull it back before stepping.
        if self.previous_direction != Direction::Clockwise && bar.focus() != 0 {
          bar.focus -= 1;
        }
        self.previous_direction = direction;
        bar.step_brighter()
      }
      Direction::Anticlockwise => {
        if self.previous_direction != Direction::Anticlockwise && bar.focus() != N - 1 {
          bar.focus += 1;
        }
        self.previous_direction = direction;
        bar.step_darker()
      }
    };

    if stepped {
      leds.set_each(bar.duty())?;
    }
    Ok(())
  }
}
