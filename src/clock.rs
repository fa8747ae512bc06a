//! Millisecond tick bookkeeping shared between the timer interrupt and the
//! cooperative dispatch loop.

use core::cell::Cell;
use core::num::NonZeroU16;

use critical_section::Mutex;

/// Wrapping millisecond counter plus the "time to measure" request flag.
///
/// [`tick`](Self::tick) is the only interrupt-side entry point and does
/// bounded work: increment, one modulo compare, one flag store. Everything
/// else runs from the main loop. The two sides share state through
/// `critical_section`, which also makes the read-modify-clear of the request
/// flag race-free against a tick landing in between.
///
/// The counter is 16 bits wide and wraps silently at 65536, matching the
/// timestamp argument expected by the acquisition primitive.
///
/// Designed to live in a `static`:
///
/// ```no_run
/// use core::num::NonZeroU16;
/// use qpanel::TickClock;
///
/// static CLOCK: TickClock = TickClock::new(match NonZeroU16::new(25) {
///   Some(period) => period,
///   None => unreachable!(),
/// });
///
/// // timer interrupt handler:
/// fn on_timer_irq() {
///   CLOCK.tick();
/// }
/// ```
pub struct TickClock {
  period: NonZeroU16,
  now: Mutex<Cell<u16>>,
  due: Mutex<Cell<bool>>,
}

impl TickClock {
  /// Create a clock that raises the measurement request every `period_ms`
  /// milliseconds. The period is fixed for the lifetime of the clock.
  pub const fn new(period_ms: NonZeroU16) -> Self {
    Self {
      period: period_ms,
      now: Mutex::new(Cell::new(0)),
      due: Mutex::new(Cell::new(false)),
    }
  }

  /// Milliseconds between acquisition requests.
  pub const fn period_ms(&self) -> u16 {
    self.period.get()
  }

  /// Advance the counter by one millisecond. Call from the timer interrupt.
  pub fn tick(&self) {
    critical_section::with(|cs| {
      let now = self.now.borrow(cs);
      let t = now.get().wrapping_add(1);
      now.set(t);
      if t % self.period.get() == 0 {
        self.due.borrow(cs).set(true);
      }
    });
  }

  /// Current counter value.
  pub fn now(&self) -> u16 {
    critical_section::with(|cs| self.now.borrow(cs).get())
  }

  /// `true` while a measurement request is pending.
  pub fn is_due(&self) -> bool {
    critical_section::with(|cs| self.due.borrow(cs).get())
  }

  /// Consume a pending measurement request.
  ///
  /// Returns the current tick value to pass as the acquisition timestamp, or
  /// `None` if no request is pending. The flag is cleared atomically with the
  /// read, so a request can never be consumed twice.
  pub fn take_due(&self) -> Option<u16> {
    critical_section::with(|cs| {
      let due = self.due.borrow(cs);
      if due.get() {
        due.set(false);
        Some(self.now.borrow(cs).get())
      } else {
        None
      }
    })
  }
}
