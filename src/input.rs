//! Input events forwarded from the activity, mirroring `android.view.KeyEvent` and `MotionEvent`.

pub const KEYCODE_BACK: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
  Down,
  Up,
  LongPress,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
  pub key_code: i32,
  pub action: KeyAction,
  /// Number of auto-repeats for a held key, 0 for the initial press.
  pub repeat_count: i32,
}

impl KeyEvent {
  pub fn new(key_code: i32, action: KeyAction) -> KeyEvent {
    KeyEvent {
      key_code: key_code,
      action: action,
      repeat_count: 0,
    }
  }

  pub fn is_back(&self) -> bool {
    self.key_code == KEYCODE_BACK
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionAction {
  Down,
  Up,
  Move,
  Cancel,
  Other(i32),
}

impl MotionAction {
  /// Maps `MotionEvent.getActionMasked()`.
  pub fn from_masked(action: i32) -> MotionAction {
    match action {
      0 => MotionAction::Down,
      1 => MotionAction::Up,
      2 => MotionAction::Move,
      3 => MotionAction::Cancel,
      other => MotionAction::Other(other),
    }
  }
}

/** Pointer event.  Whole numbers are pixels; coordinates may have a fraction for input devices
 * that are sub-pixel precise. */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionEvent {
  pub action: MotionAction,
  pub x: f32,
  pub y: f32,
}
