//! Button interpretation: the play, right/left and up/down handlers and the
//! phase machine that arbitrates between them.

use crate::config::Held;
use crate::leds::{LedBar, LedDrive, DUTY_HALF, DUTY_MAX, DUTY_MIN, DUTY_STEP};

/// Which button handler currently owns the LED bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum ButtonPhase {
  #[default]
  Idle,
  /// Automatic running lights, entered by play/pause.
  Play,
  /// Dimming light switch, entered by up or down outside [`Play`](Self::Play).
  UpDown,
  /// Level bar, entered by right or left.
  RightLeft,
}

/// Speed input to the running lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpeedChange {
  Faster,
  Slower,
  Hold,
}

/// One light-switch input per acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SwitchEvent {
  Up,
  Down,
  Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intensity {
  Increase,
  Decrease,
}

/// Debounce count before a sustained up/down press changes the running
/// lights period.
const SPEED_DEBOUNCE: u8 = 15;
const RUNNING_LIGHTS_MIN_PERIOD: u16 = 1;
const RUNNING_LIGHTS_DEFAULT_PERIOD: u16 = 25;
const RUNNING_LIGHTS_MAX_PERIOD: u16 = 1000;

/// Automatic running lights: a bar sweep that brightens bottom-up, then
/// darkens bottom-up, forever. `period` cycles pass between sweep steps.
#[derive(Debug)]
pub(crate) struct RunningLights {
  timer: u16,
  period: u16,
  faster_count: u8,
  slower_count: u8,
  effect: Intensity,
}

impl RunningLights {
  pub(crate) const fn new() -> Self {
    Self {
      timer: 1,
      period: RUNNING_LIGHTS_DEFAULT_PERIOD,
      faster_count: 0,
      slower_count: 0,
      effect: Intensity::Increase,
    }
  }

  pub(crate) fn period(&self) -> u16 {
    self.period
  }

  fn restart(&mut self) {
    self.effect = Intensity::Increase;
  }

  /// One acquisition cycle worth of running lights.
  ///
  /// Speed changes are debounced over [`SPEED_DEBOUNCE`] consecutive
  /// signals; a signal in the other direction restarts the count.
  pub(crate) fn advance<L, const N: usize>(
    &mut self,
    change: SpeedChange,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    match change {
      SpeedChange::Faster => {
        self.slower_count = 0;
        self.faster_count += 1;
        if self.faster_count == SPEED_DEBOUNCE {
          self.faster_count = 0;
          self.period = self.period.saturating_sub(1).max(RUNNING_LIGHTS_MIN_PERIOD);
        }
      }
      SpeedChange::Slower => {
        self.faster_count = 0;
        self.slower_count += 1;
        if self.slower_count == SPEED_DEBOUNCE {
          self.slower_count = 0;
          self.period = (self.period + 1).min(RUNNING_LIGHTS_MAX_PERIOD);
        }
      }
      SpeedChange::Hold => {}
    }

    self.timer -= 1;
    if self.timer != 0 {
      return Ok(());
    }
    self.timer = self.period;

    if self.effect == Intensity::Increase {
      if bar.duty[bar.focus] == DUTY_MIN {
        if bar.focus == N - 1 {
          // Fully lit: restart from the bottom, darkening this time.
          bar.focus = 0;
          self.effect = Intensity::Decrease;
        } else {
          bar.focus += 1;
        }
      }
      if self.effect == Intensity::Increase {
        bar.brighten(bar.focus);
        if bar.focus != N - 1 && bar.duty[bar.focus] <= DUTY_HALF {
          bar.brighten(bar.focus + 1);
        }
      }
    }
    if self.effect == Intensity::Decrease {
      if bar.duty[bar.focus] == DUTY_MAX {
        if bar.focus == N - 1 {
          // Fully dark: restart from the bottom, brightening. The step
          // itself waits for the next expiry.
          bar.focus = 0;
          self.effect = Intensity::Increase;
        } else {
          bar.focus += 1;
        }
      }
      if self.effect == Intensity::Decrease {
        bar.darken(bar.focus);
        if bar.focus != N - 1 && bar.duty[bar.focus] >= DUTY_HALF {
          bar.darken(bar.focus + 1);
        }
      }
    }
    leds.set_each(bar.duty())
  }
}

/// Press-duration threshold separating a quick push from a sustained dim.
const SHORT_PRESS_LIMIT: u32 = 32;
/// Cycles between dimming steps while a press is sustained.
const DIM_PERIOD: u8 = 5;

/// Dimming light switch emulation.
///
/// A quick push of up turns everything fully on, a quick push of down turns
/// everything off; holding either for longer fades all LEDs together. Quick
/// pushes take effect on release, or immediately when the opposite arrow
/// follows.
#[derive(Debug)]
pub(crate) struct LightSwitch {
  up_count: u32,
  down_count: u32,
  dim_timer: u8,
}

impl LightSwitch {
  pub(crate) const fn new() -> Self {
    Self { up_count: 0, down_count: 0, dim_timer: 1 }
  }

  pub(crate) fn handle<L, const N: usize>(
    &mut self,
    event: SwitchEvent,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    match event {
      SwitchEvent::Up => {
        if self.down_count != 0 && self.down_count < SHORT_PRESS_LIMIT {
          bar.reset();
          leds.set_all(DUTY_MAX)?;
        }
        self.down_count = 0;
        self.up_count += 1;
        if self.up_count < SHORT_PRESS_LIMIT {
          return Ok(());
        }
      }
      SwitchEvent::Down => {
        if self.up_count != 0 && self.up_count < SHORT_PRESS_LIMIT {
          bar.fill(DUTY_MIN);
          leds.set_all(DUTY_MIN)?;
        }
        self.up_count = 0;
        self.down_count += 1;
        if self.down_count < SHORT_PRESS_LIMIT {
          return Ok(());
        }
      }
      SwitchEvent::Release => {
        if self.down_count != 0 && self.down_count < SHORT_PRESS_LIMIT {
          bar.reset();
          leds.set_all(DUTY_MAX)?;
        }
        self.down_count = 0;
        if self.up_count != 0 && self.up_count < SHORT_PRESS_LIMIT {
          bar.fill(DUTY_MIN);
          leds.set_all(DUTY_MIN)?;
        }
        self.up_count = 0;
        return Ok(());
      }
    }

    // Sustained press: fade all LEDs together, one step per DIM_PERIOD cycles.
    self.dim_timer -= 1;
    if self.dim_timer != 0 {
      return Ok(());
    }
    self.dim_timer = DIM_PERIOD;

    // All LEDs carry the same duty here; the focused one is as good as any.
    let current = bar.duty[bar.focus];
    let next = match event {
      SwitchEvent::Up => {
        if current == DUTY_MIN {
          return Ok(());
        }
        current - DUTY_STEP
      }
      SwitchEvent::Down => {
        if current == DUTY_MAX {
          return Ok(());
        }
        current + DUTY_STEP
      }
      SwitchEvent::Release => return Ok(()),
    };
    bar.fill(next);
    leds.set_all(next)
  }
}

/// Cycles between level bar steps while right or left is held.
const LEVEL_BAR_PERIOD: u8 = 2;

/// The right/left level bar: right grows the lit bar bottom-up, left shrinks
/// it top-down. Unlike the other effects it tolerates entering with the bar
/// in any shape, re-seating the focus before every step.
#[derive(Debug)]
pub(crate) struct LevelBar {
  timer: u8,
}

impl LevelBar {
  pub(crate) const fn new() -> Self {
    Self { timer: 1 }
  }

  pub(crate) fn advance<L, const N: usize>(
    &mut self,
    grow: bool,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    self.timer -= 1;
    if self.timer != 0 {
      return Ok(());
    }
    self.timer = LEVEL_BAR_PERIOD;

    if grow {
      loop {
        if bar.duty[bar.focus] != DUTY_MIN {
          break;
        }
        if bar.focus == N - 1 {
          // Top saturated; something below may still have headroom.
          match bar.duty.iter().position(|&d| d != DUTY_MIN) {
            Some(i) => bar.focus = i,
            None => return Ok(()),
          }
        } else {
          bar.focus += 1;
        }
      }
      bar.brighten(bar.focus);
      if bar.focus != N - 1
        && bar.duty[bar.focus] <= DUTY_HALF
        && bar.duty[bar.focus + 1] != DUTY_MIN
      {
        bar.brighten(bar.focus + 1);
      }
    } else {
      // Shrink from the highest LED that still shows anything.
      match bar.duty.iter().rposition(|&d| d != DUTY_MAX) {
        Some(i) => bar.focus = i,
        None => return Ok(()),
      }
      bar.darken(bar.focus);
      if bar.focus != 0
        && bar.duty[bar.focus] >= DUTY_HALF
        && bar.duty[bar.focus - 1] != DUTY_MAX
      {
        bar.darken(bar.focus - 1);
      }
    }
    leds.set_each(bar.duty())
  }
}

/// The button phase machine.
///
/// While any button is held, the handler it selects runs with this
/// priority: play, then right, then left, then up, then down. With nothing
/// held, running lights keep free-running and the light switch sees one
/// release per fresh acquisition.
#[derive(Debug)]
pub(crate) struct Buttons {
  phase: ButtonPhase,
  lights: RunningLights,
  switch: LightSwitch,
  level: LevelBar,
}

impl Buttons {
  pub(crate) const fn new() -> Self {
    Self {
      phase: ButtonPhase::Idle,
      lights: RunningLights::new(),
      switch: LightSwitch::new(),
      level: LevelBar::new(),
    }
  }

  pub(crate) fn phase(&self) -> ButtonPhase {
    self.phase
  }

  #[cfg(test)]
  pub(crate) fn lights(&self) -> &RunningLights {
    &self.lights
  }

  /// Leave the up/down phase, delivering any pending quick push first.
  fn leave_up_down<L, const N: usize>(
    &mut self,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    if self.phase == ButtonPhase::UpDown {
      self.switch.handle(SwitchEvent::Release, bar, leds)?;
    }
    Ok(())
  }

  /// Back to [`ButtonPhase::Idle`], as when the wheel takes over.
  pub(crate) fn reset_phase<L, const N: usize>(
    &mut self,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    self.leave_up_down(bar, leds)?;
    self.phase = ButtonPhase::Idle;
    Ok(())
  }

  /// One acquisition cycle worth of button handling.
  ///
  /// `fresh` is true when `held` comes from a new measurement rather than a
  /// carried-over one; only fresh cycles may count as a release.
  pub(crate) fn process<L, const N: usize>(
    &mut self,
    held: Held,
    fresh: bool,
    bar: &mut LedBar<N>,
    leds: &mut L,
  ) -> Result<(), L::Error>
  where
    L: LedDrive<N>,
  {
    if held.any() {
      if held.play_pause {
        self.leave_up_down(bar, leds)?;
        bar.reset();
        leds.set_all(DUTY_MAX)?;
        self.phase = ButtonPhase::Play;
        self.lights.restart();
        self.lights.advance(SpeedChange::Hold, bar, leds)?;
      } else if held.right {
        self.leave_up_down(bar, leds)?;
        self.phase = ButtonPhase::RightLeft;
        self.level.advance(true, bar, leds)?;
      } else if held.left {
        self.leave_up_down(bar, leds)?;
        self.phase = ButtonPhase::RightLeft;
        self.level.advance(false, bar, leds)?;
      } else if held.up {
        if self.phase == ButtonPhase::Play {
          self.lights.advance(SpeedChange::Faster, bar, leds)?;
        } else {
          if self.phase != ButtonPhase::UpDown {
            bar.reset();
            leds.set_all(DUTY_MAX)?;
            self.phase = ButtonPhase::UpDown;
          }
          self.switch.handle(SwitchEvent::Up, bar, leds)?;
        }
      } else if held.down {
        if self.phase == ButtonPhase::Play {
          self.lights.advance(SpeedChange::Slower, bar, leds)?;
        } else {
          if self.phase != ButtonPhase::UpDown {
            bar.reset();
            leds.set_all(DUTY_MAX)?;
            self.phase = ButtonPhase::UpDown;
          }
          self.switch.handle(SwitchEvent::Down, bar, leds)?;
        }
      }
    } else {
      match self.phase {
        ButtonPhase::Play => self.lights.advance(SpeedChange::Hold, bar, leds)?,
        ButtonPhase::UpDown if fresh => self.switch.handle(SwitchEvent::Release, bar, leds)?,
        _ => {}
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct RecordingLeds<const N: usize> {
    frames: u32,
    last: [u8; N],
  }

  impl<const N: usize> RecordingLeds<N> {
    fn new() -> Self {
      Self { frames: 0, last: [DUTY_MAX; N] }
    }
  }

  impl<const N: usize> LedDrive<N> for RecordingLeds<N> {
    type Error = core::convert::Infallible;

    fn set_all(&mut self, duty: u8) -> Result<(), Self::Error> {
      self.last = [duty; N];
      self.frames += 1;
      Ok(())
    }

    fn set_each(&mut self, duty: &[u8; N]) -> Result<(), Self::Error> {
      self.last = *duty;
      self.frames += 1;
      Ok(())
    }
  }

  fn held(play_pause: bool, right: bool, left: bool, up: bool, down: bool) -> Held {
    Held { down, up, left, play_pause, right }
  }

  const NONE: Held = Held { down: false, up: false, left: false, play_pause: false, right: false };

  #[test]
  fn running_lights_sweep_up_then_down() {
    let mut lights = RunningLights::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    // Drive enough expiries to fill the bar and watch it drain again.
    let mut saw_full = false;
    let mut saw_dark_after_full = false;
    for _ in 0..200 * RUNNING_LIGHTS_DEFAULT_PERIOD {
      lights.advance(SpeedChange::Hold, &mut bar, &mut leds).unwrap();
      if bar.duty() == &[DUTY_MIN; 4] {
        saw_full = true;
      }
      if saw_full && bar.duty() == &[DUTY_MAX; 4] {
        saw_dark_after_full = true;
      }
    }
    assert!(saw_full);
    assert!(saw_dark_after_full);
  }

  #[test]
  fn running_lights_speed_debounce() {
    let mut lights = RunningLights::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    assert_eq!(lights.period(), 25);
    for _ in 0..14 {
      lights.advance(SpeedChange::Faster, &mut bar, &mut leds).unwrap();
    }
    assert_eq!(lights.period(), 25);
    lights.advance(SpeedChange::Faster, &mut bar, &mut leds).unwrap();
    assert_eq!(lights.period(), 24);
    // A signal in the other direction restarts the count.
    for _ in 0..14 {
      lights.advance(SpeedChange::Faster, &mut bar, &mut leds).unwrap();
    }
    lights.advance(SpeedChange::Slower, &mut bar, &mut leds).unwrap();
    lights.advance(SpeedChange::Faster, &mut bar, &mut leds).unwrap();
    assert_eq!(lights.period(), 24);
  }

  #[test]
  fn running_lights_period_clamps_at_one() {
    let mut lights = RunningLights::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..15 * 40 {
      lights.advance(SpeedChange::Faster, &mut bar, &mut leds).unwrap();
    }
    assert_eq!(lights.period(), RUNNING_LIGHTS_MIN_PERIOD);
  }

  #[test]
  fn quick_up_push_turns_everything_on() {
    let mut switch = LightSwitch::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..5 {
      switch.handle(SwitchEvent::Up, &mut bar, &mut leds).unwrap();
    }
    // Nothing visible until the release delivers the quick push.
    assert_eq!(leds.frames, 0);
    switch.handle(SwitchEvent::Release, &mut bar, &mut leds).unwrap();
    assert_eq!(leds.frames, 1);
    assert_eq!(leds.last, [DUTY_MIN; 4]);
    // A later quick down push turns everything off again.
    for _ in 0..5 {
      switch.handle(SwitchEvent::Down, &mut bar, &mut leds).unwrap();
    }
    switch.handle(SwitchEvent::Release, &mut bar, &mut leds).unwrap();
    assert_eq!(leds.last, [DUTY_MAX; 4]);
  }

  #[test]
  fn sustained_up_press_fades_all_leds_together() {
    let mut switch = LightSwitch::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..SHORT_PRESS_LIMIT + 10 {
      switch.handle(SwitchEvent::Up, &mut bar, &mut leds).unwrap();
    }
    assert!(leds.frames > 0);
    let duty = bar.duty()[0];
    assert!(duty < DUTY_MAX);
    assert!(bar.duty().iter().all(|&d| d == duty));
    // Release after a long press delivers nothing extra.
    let frames = leds.frames;
    switch.handle(SwitchEvent::Release, &mut bar, &mut leds).unwrap();
    assert_eq!(leds.frames, frames);
  }

  #[test]
  fn level_bar_grows_and_shrinks() {
    let mut level = LevelBar::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..4u32 * 17 * 2 * LEVEL_BAR_PERIOD as u32 {
      level.advance(true, &mut bar, &mut leds).unwrap();
      for i in 0..3 {
        assert!(bar.duty()[i] <= bar.duty()[i + 1]);
      }
    }
    assert_eq!(bar.duty(), &[DUTY_MIN; 4]);
    for _ in 0..4u32 * 17 * 2 * LEVEL_BAR_PERIOD as u32 {
      level.advance(false, &mut bar, &mut leds).unwrap();
      for i in 0..3 {
        assert!(bar.duty()[i] <= bar.duty()[i + 1]);
      }
    }
    assert_eq!(bar.duty(), &[DUTY_MAX; 4]);
    // Saturated in both directions: no further frames.
    let frames = leds.frames;
    for _ in 0..4 {
      level.advance(false, &mut bar, &mut leds).unwrap();
    }
    assert_eq!(leds.frames, frames);
  }

  #[test]
  fn play_outranks_arrows() {
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    buttons
      .process(held(true, true, false, true, false), true, &mut bar, &mut leds)
      .unwrap();
    assert_eq!(buttons.phase(), ButtonPhase::Play);
    // Up while playing adjusts speed instead of switching phases.
    let period = buttons.lights().period();
    for _ in 0..15 {
      buttons.process(held(false, false, false, true, false), true, &mut bar, &mut leds).unwrap();
    }
    assert_eq!(buttons.phase(), ButtonPhase::Play);
    assert_eq!(buttons.lights().period(), period - 1);
  }

  #[test]
  fn right_outranks_left_and_up_outranks_down() {
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    // Right and left together grow the level bar.
    buttons.process(held(false, true, true, false, false), true, &mut bar, &mut leds).unwrap();
    assert_eq!(buttons.phase(), ButtonPhase::RightLeft);
    assert!(bar.duty()[0] < DUTY_MAX);

    // Up and down together act as the up side of the light switch: the
    // quick push lands as all-on.
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    buttons.process(held(false, false, false, true, true), true, &mut bar, &mut leds).unwrap();
    assert_eq!(buttons.phase(), ButtonPhase::UpDown);
    buttons.process(NONE, true, &mut bar, &mut leds).unwrap();
    assert_eq!(leds.last, [DUTY_MIN; 4]);
  }

  #[test]
  fn running_lights_keep_going_after_release() {
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    buttons.process(held(true, false, false, false, false), true, &mut bar, &mut leds).unwrap();
    let frames = leds.frames;
    for _ in 0..3 * RUNNING_LIGHTS_DEFAULT_PERIOD {
      buttons.process(NONE, false, &mut bar, &mut leds).unwrap();
    }
    assert!(leds.frames > frames);
  }

  #[test]
  fn stale_cycles_do_not_release_the_switch() {
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..3 {
      buttons.process(held(false, false, false, true, false), true, &mut bar, &mut leds).unwrap();
    }
    assert_eq!(buttons.phase(), ButtonPhase::UpDown);
    let frames = leds.frames;
    // Carried-over measurements must not be mistaken for a release.
    buttons.process(NONE, false, &mut bar, &mut leds).unwrap();
    assert_eq!(leds.frames, frames);
    buttons.process(NONE, true, &mut bar, &mut leds).unwrap();
    // The quick push is delivered on the genuine release.
    assert_eq!(leds.last, [DUTY_MIN; 4]);
  }

  #[test]
  fn leaving_up_down_delivers_the_pending_push() {
    let mut buttons = Buttons::new();
    let mut bar: LedBar<4> = LedBar::new();
    bar.reset();
    let mut leds = RecordingLeds::new();
    for _ in 0..3 {
      buttons.process(held(false, false, false, true, false), true, &mut bar, &mut leds).unwrap();
    }
    // Right arrow takes over; the short up push still lands first.
    buttons.process(held(false, true, false, false, false), true, &mut bar, &mut leds).unwrap();
    assert_eq!(buttons.phase(), ButtonPhase::RightLeft);
    assert_eq!(leds.frames, 1 + 1);
  }
}
