//! Measurement snapshots and the single-slot handoff between the acquisition
//! completion callback and the dispatch loop.

use core::cell::Cell;

use critical_section::Mutex;

/// Decoded acquisition status word reported with every completed measurement.
///
/// The bit layout mirrors the QMatrix library status flags; `burst_again`
/// occupies the high byte of the on-wire word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, defmt::Format)]
pub struct AcqStatus {
  /// At least one sensor is currently in detect.
  pub in_detect: bool,
  /// One or more sensor in/out-of-detect states changed since the last pass.
  pub status_changed: bool,
  /// A rotor or slider position changed since the last pass.
  pub position_changed: bool,
  /// A channel reference was recalibrated during this pass.
  pub reference_changed: bool,
  /// The library wants another burst before the data settles.
  pub burst_again: bool,
}

impl AcqStatus {
  const IN_DETECT: u16 = 0x0001;
  const STATUS_CHANGE: u16 = 0x0002;
  const POSITION_CHANGE: u16 = 0x0004;
  const REFERENCE_CHANGE: u16 = 0x0008;
  const BURST_AGAIN: u16 = 0x0100;

  pub const fn from_bits(bits: u16) -> Self {
    Self {
      in_detect: bits & Self::IN_DETECT != 0,
      status_changed: bits & Self::STATUS_CHANGE != 0,
      position_changed: bits & Self::POSITION_CHANGE != 0,
      reference_changed: bits & Self::REFERENCE_CHANGE != 0,
      burst_again: bits & Self::BURST_AGAIN != 0,
    }
  }

  pub const fn to_bits(self) -> u16 {
    let mut bits = 0;
    if self.in_detect {
      bits |= Self::IN_DETECT;
    }
    if self.status_changed {
      bits |= Self::STATUS_CHANGE;
    }
    if self.position_changed {
      bits |= Self::POSITION_CHANGE;
    }
    if self.reference_changed {
      bits |= Self::REFERENCE_CHANGE;
    }
    if self.burst_again {
      bits |= Self::BURST_AGAIN;
    }
    bits
  }

  /// `true` if this pass carries a reportable touch event.
  pub const fn changed(self) -> bool {
    self.status_changed || self.position_changed
  }
}

/// Value copy of one completed acquisition pass.
///
/// The underlying library exposes its result through a pointer that is only
/// valid until the next acquisition starts. Copying the fields the
/// interpretation layer needs into this struct removes that lifetime hazard
/// altogether: a `Measurement` is never invalidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, defmt::Format)]
pub struct Measurement {
  /// Acquisition status word.
  pub status: AcqStatus,
  /// One bit per logical sensor, set while the sensor is in detect. Supports
  /// panels with up to eight logical sensors; the bit positions are matched
  /// against the group masks of [`PanelLayout`](crate::PanelLayout).
  pub states: u8,
  /// Rotor/slider position, scaled to the configured resolution.
  pub position: u8,
}

impl Measurement {
  pub const fn new(status: AcqStatus, states: u8, position: u8) -> Self {
    Self { status, states, position }
  }

  /// Zero out the snapshot once its events have been acted upon, so that
  /// subsequent dispatch cycles without fresh data observe no activity.
  pub fn clear(&mut self) {
    *self = Self::default();
  }
}

/// Single-slot mailbox between the measurement-complete callback and the
/// dispatch loop.
///
/// The callback side runs in interrupt context and must stay minimal, so
/// [`complete`](Self::complete) only stores the value copy. The loop side
/// drains it with [`take`](Self::take); while a snapshot sits unconsumed the
/// scheduler refuses to start another acquisition (see
/// [`Panel::poll`](crate::Panel::poll)).
///
/// Designed to live in a `static` shared between both contexts.
pub struct MeasurementSlot {
  latest: Mutex<Cell<Option<Measurement>>>,
}

impl MeasurementSlot {
  pub const fn new() -> Self {
    Self { latest: Mutex::new(Cell::new(None)) }
  }

  /// Completion-callback side: publish a finished measurement.
  ///
  /// Bounded work only; safe to call from interrupt context.
  pub fn complete(&self, measurement: Measurement) {
    critical_section::with(|cs| self.latest.borrow(cs).set(Some(measurement)));
  }

  /// Loop side: read and clear the pending measurement, if any.
  pub fn take(&self) -> Option<Measurement> {
    critical_section::with(|cs| self.latest.borrow(cs).take())
  }

  /// `true` while a completed measurement is waiting to be consumed.
  pub fn is_pending(&self) -> bool {
    critical_section::with(|cs| {
      let slot = self.latest.borrow(cs);
      let value = slot.take();
      let pending = value.is_some();
      slot.set(value);
      pending
    })
  }
}

impl Default for MeasurementSlot {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_round_trips() {
    for bits in [0x0000u16, 0x0001, 0x0002, 0x0004, 0x0008, 0x0100, 0x010F] {
      assert_eq!(AcqStatus::from_bits(bits).to_bits(), bits);
    }
  }

  #[test]
  fn status_change_detection() {
    assert!(AcqStatus::from_bits(0x0002).changed());
    assert!(AcqStatus::from_bits(0x0004).changed());
    assert!(!AcqStatus::from_bits(0x0001).changed());
    assert!(!AcqStatus::from_bits(0x0108).changed());
  }

  #[test]
  fn slot_is_read_and_clear() {
    let slot = MeasurementSlot::new();
    assert!(!slot.is_pending());
    assert_eq!(slot.take(), None);

    let m = Measurement::new(AcqStatus::from_bits(0x0002), 0x01, 42);
    slot.complete(m);
    assert!(slot.is_pending());
    assert_eq!(slot.take(), Some(m));
    assert!(!slot.is_pending());
    assert_eq!(slot.take(), None);
  }

  #[test]
  fn slot_keeps_latest_on_overwrite() {
    let slot = MeasurementSlot::new();
    slot.complete(Measurement::new(AcqStatus::default(), 0x01, 1));
    slot.complete(Measurement::new(AcqStatus::default(), 0x02, 2));
    let m = slot.take().unwrap();
    assert_eq!(m.states, 0x02);
    assert_eq!(m.position, 2);
  }

  #[test]
  fn cleared_measurement_reports_no_activity() {
    let mut m = Measurement::new(AcqStatus::from_bits(0x0006), 0x3F, 200);
    m.clear();
    assert_eq!(m, Measurement::default());
    assert!(!m.status.changed());
  }
}
