//! Seam between the scheduler and the capacitive acquisition library.

use crate::config::SensorConfig;

/// Acquisition post-processing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AcqMode {
  /// Raw burst counts only; no detect states or positions are resolved.
  Raw,
  /// Full pass: filtering, detect-state resolution and rotor/slider position
  /// computation. Required for the interpretation layer to see anything.
  Normal,
}

/// Identifier assigned to a sensor by the acquisition library at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SensorId(pub u8);

/// Status codes surfaced by the acquisition library.
///
/// `Busy` is the only recoverable variant: an earlier acquisition or filter
/// pass has not resolved yet and the current measurement period is simply
/// skipped. Every other variant signals a broken configuration and is fatal
/// at the call site that provoked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SenseError {
  /// A previous acquisition is still in flight.
  Busy,
  /// A channel, threshold or resource parameter was rejected.
  InvalidParameter,
  /// The operation is not permitted in the library's current state.
  InvalidState,
  /// Initial calibration failed.
  Calibration,
}

/// Contract the acquisition backend has to fulfil.
///
/// Implementations wrap the opaque vendor library (or, in tests, a fake).
/// The DMA/resource descriptor the hardware needs for a burst is deliberately
/// absent from `start_acquisition`: it is opaque to the scheduler, so the
/// implementor captures it at construction time.
///
/// On completion of a pass started with
/// [`start_acquisition`](TouchSense::start_acquisition), the backend must
/// copy the result into the [`MeasurementSlot`](crate::MeasurementSlot) it
/// was wired to and nothing more, since that callback typically runs in
/// interrupt context.
pub trait TouchSense {
  /// Register one sensor (key, rotor or slider) with the library.
  fn configure_sensor(&mut self, sensor: &SensorConfig) -> Result<SensorId, SenseError>;

  /// Calibrate all configured sensors. Must be called once after
  /// configuration, before the first acquisition.
  fn calibrate(&mut self) -> Result<(), SenseError>;

  /// Kick off one asynchronous acquisition pass.
  ///
  /// `at_ms` is the current tick value; the library uses it to time drift
  /// compensation and recalibration. Returns `Err(SenseError::Busy)` when the
  /// previous pass has not resolved yet.
  fn start_acquisition(&mut self, at_ms: u16, mode: AcqMode) -> Result<(), SenseError>;

  /// Pump the library's internal event queue.
  ///
  /// Must be called once per loop iteration regardless of pending data; the
  /// library resolves recalibration and filtering states here.
  fn pump_events(&mut self);

  /// Release the hardware. Further calls on this backend are invalid.
  fn deinit(&mut self) -> Result<(), SenseError> {
    Ok(())
  }
}
