//! Sensor topology configuration.
//!
//! The original firmware selected its sensor arrangement with preprocessor
//! switches; here the topology is plain data so several board layouts can
//! coexist in one binary (and in one test suite). A [`SensorConfig`] list
//! describes what the acquisition library should measure, a [`PanelLayout`]
//! describes how the resulting state bits map onto the wheel and the five
//! demo buttons.

/// What a logical sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SensorKind {
  /// Single on/off touch key.
  Key,
  /// Circular position sensor reporting an angle.
  Rotor,
  /// Linear position sensor.
  Slider,
}

/// Detect hysteresis, as a fraction of the detect threshold (rounded down,
/// hard-limited to 2 counts by the library).
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Hysteresis {
  Pct50,
  Pct25,
  Pct12_5,
  Pct6_25,
}

/// Reported rotor/slider position resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum Resolution {
  Bit1 = 1,
  Bit2 = 2,
  Bit3 = 3,
  Bit4 = 4,
  Bit5 = 5,
  Bit6 = 6,
  Bit7 = 7,
  Bit8 = 8,
}

impl Resolution {
  /// Largest position value reportable at this resolution.
  pub const fn max_position(self) -> u8 {
    ((1u16 << self as u8) - 1) as u8
  }
}

/// Adjacent-key-suppression group membership. Sensors in the same group
/// suppress each other so only one reports detect at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AksGroup {
  None,
  Group1,
  Group2,
  Group3,
  Group4,
  Group5,
  Group6,
  Group7,
}

/// Configuration of one logical sensor, spanning a contiguous channel range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SensorConfig {
  pub kind: SensorKind,
  pub from_channel: u8,
  pub to_channel: u8,
  /// Detect threshold in counts.
  pub threshold: u8,
  pub hysteresis: Hysteresis,
  pub resolution: Resolution,
  pub aks_group: AksGroup,
}

impl SensorConfig {
  /// A touch key on a single channel with the demo-board defaults.
  pub const fn key(channel: u8) -> Self {
    Self {
      kind: SensorKind::Key,
      from_channel: channel,
      to_channel: channel,
      threshold: 25,
      hysteresis: Hysteresis::Pct6_25,
      resolution: Resolution::Bit1,
      aks_group: AksGroup::None,
    }
  }

  /// An 8-bit rotor spanning `from_channel..=to_channel`.
  pub const fn rotor(from_channel: u8, to_channel: u8) -> Self {
    Self {
      kind: SensorKind::Rotor,
      from_channel,
      to_channel,
      threshold: 25,
      hysteresis: Hysteresis::Pct6_25,
      resolution: Resolution::Bit8,
      aks_group: AksGroup::None,
    }
  }

  /// An 8-bit slider spanning `from_channel..=to_channel`.
  pub const fn slider(from_channel: u8, to_channel: u8) -> Self {
    Self { kind: SensorKind::Slider, ..Self::rotor(from_channel, to_channel) }
  }

  pub const fn with_threshold(mut self, threshold: u8) -> Self {
    self.threshold = threshold;
    self
  }

  pub const fn with_hysteresis(mut self, hysteresis: Hysteresis) -> Self {
    self.hysteresis = hysteresis;
    self
  }

  pub const fn with_resolution(mut self, resolution: Resolution) -> Self {
    self.resolution = resolution;
    self
  }

  pub const fn with_aks_group(mut self, aks_group: AksGroup) -> Self {
    self.aks_group = aks_group;
    self
  }
}

/// Which buttons a snapshot reports as held, after masking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, defmt::Format)]
pub struct Held {
  pub down: bool,
  pub up: bool,
  pub left: bool,
  pub play_pause: bool,
  pub right: bool,
}

impl Held {
  pub const fn any(self) -> bool {
    self.down || self.up || self.left || self.play_pause || self.right
  }
}

/// Mapping from sensor state bits to the wheel and button groups.
///
/// Each mask selects the state bits belonging to one group; masks may cover
/// several bits (a wheel made of multiple sensors) but must not overlap.
/// `Default` reproduces the UC3L-EK front panel assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct PanelLayout {
  pub wheel_mask: u8,
  pub down_mask: u8,
  pub up_mask: u8,
  pub left_mask: u8,
  pub play_pause_mask: u8,
  pub right_mask: u8,
}

impl PanelLayout {
  pub const fn new() -> Self {
    Self {
      wheel_mask: 0x01,
      down_mask: 0x02,
      up_mask: 0x04,
      left_mask: 0x08,
      play_pause_mask: 0x10,
      right_mask: 0x20,
    }
  }

  pub const fn with_wheel_mask(mut self, mask: u8) -> Self {
    self.wheel_mask = mask;
    self
  }

  pub const fn with_down_mask(mut self, mask: u8) -> Self {
    self.down_mask = mask;
    self
  }

  pub const fn with_up_mask(mut self, mask: u8) -> Self {
    self.up_mask = mask;
    self
  }

  pub const fn with_left_mask(mut self, mask: u8) -> Self {
    self.left_mask = mask;
    self
  }

  pub const fn with_play_pause_mask(mut self, mask: u8) -> Self {
    self.play_pause_mask = mask;
    self
  }

  pub const fn with_right_mask(mut self, mask: u8) -> Self {
    self.right_mask = mask;
    self
  }

  /// Union of all five button masks.
  pub const fn buttons_mask(&self) -> u8 {
    self.down_mask | self.up_mask | self.left_mask | self.play_pause_mask | self.right_mask
  }

  /// `true` if any wheel sensor is in detect in `states`.
  pub const fn wheel_active(&self, states: u8) -> bool {
    states & self.wheel_mask != 0
  }

  /// Decode the held buttons out of a sensor state byte.
  pub const fn held(&self, states: u8) -> Held {
    Held {
      down: states & self.down_mask != 0,
      up: states & self.up_mask != 0,
      left: states & self.left_mask != 0,
      play_pause: states & self.play_pause_mask != 0,
      right: states & self.right_mask != 0,
    }
  }
}

impl Default for PanelLayout {
  fn default() -> Self {
    Self::new()
  }
}

/// Sensor list of the UC3L-EK front panel: one 8-bit wheel rotor over
/// channels 0–5 and the five navigation keys. The list order determines the
/// state bit order, matching [`PanelLayout::new`].
pub const UC3L_EK_SENSORS: [SensorConfig; 6] = [
  SensorConfig::rotor(0, 5),
  SensorConfig::key(6),
  SensorConfig::key(7),
  SensorConfig::key(8),
  SensorConfig::key(10),
  SensorConfig::key(11),
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_layout_masks_are_disjoint() {
    let layout = PanelLayout::default();
    let mut seen = 0u8;
    for mask in [
      layout.wheel_mask,
      layout.down_mask,
      layout.up_mask,
      layout.left_mask,
      layout.play_pause_mask,
      layout.right_mask,
    ] {
      assert_eq!(seen & mask, 0);
      seen |= mask;
    }
    assert_eq!(layout.buttons_mask(), 0x3E);
  }

  #[test]
  fn held_decodes_against_masks() {
    let layout = PanelLayout::default();
    let held = layout.held(0x14);
    assert!(held.play_pause);
    assert!(held.up);
    assert!(!held.down && !held.left && !held.right);
    assert!(held.any());
    assert!(!layout.held(0x01).any());
    assert!(layout.wheel_active(0x01));
  }

  #[test]
  fn resolution_position_range() {
    assert_eq!(Resolution::Bit1.max_position(), 1);
    assert_eq!(Resolution::Bit7.max_position(), 127);
    assert_eq!(Resolution::Bit8.max_position(), 255);
  }

  #[test]
  fn sensor_builders() {
    let rotor = UC3L_EK_SENSORS[0];
    assert_eq!(rotor.kind, SensorKind::Rotor);
    assert_eq!((rotor.from_channel, rotor.to_channel), (0, 5));
    assert_eq!(rotor.resolution, Resolution::Bit8);

    let key = SensorConfig::key(6).with_threshold(30).with_aks_group(AksGroup::Group1);
    assert_eq!(key.threshold, 30);
    assert_eq!(key.aks_group, AksGroup::Group1);
    assert_eq!(key.resolution, Resolution::Bit1);
  }
}
