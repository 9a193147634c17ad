//! Directional input and key state
//!
//! The host reports movement keys through one handler per direction, called
//! with `began = true` on key-down and `false` on key-up. Each call nudges an
//! accumulator by one unit; opposite keys cancel. The accumulators are not
//! clamped, so unmatched or out-of-order events can leave them off zero until
//! the matching event arrives.

/// Host movement handler a key event came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::Jump,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Jump => "jump",
        }
    }
}

/// Accumulated directional input
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InputDirection {
    /// Forward minus backward
    pub forward: f32,
    /// Left minus right
    pub strafe: f32,
    /// Jump held
    pub jump: bool,
}

impl InputDirection {
    /// Record a key event
    ///
    /// Returns the `began` value to forward to the host's own handler: the
    /// real state for jump, `false` for the movement keys so the host never
    /// starts moving on its own.
    pub fn apply(&mut self, direction: Direction, began: bool) -> bool {
        let step = if began { 1.0 } else { -1.0 };

        match direction {
            Direction::Forward => self.forward += step,
            Direction::Backward => self.forward -= step,
            Direction::Left => self.strafe += step,
            Direction::Right => self.strafe -= step,
            Direction::Jump => {
                self.jump = began;
                return began;
            }
        }
        false
    }

    /// Drop all held input
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Source of physical key state
pub trait KeySource {
    /// Whether the key with virtual-key code `key` is held right now
    fn is_pressed(&self, key: u8) -> bool;
}

/// Hardware key state via `GetAsyncKeyState`
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncKeyState;

#[cfg(windows)]
impl KeySource for AsyncKeyState {
    fn is_pressed(&self, key: u8) -> bool {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

        let state = unsafe { GetAsyncKeyState(i32::from(key)) };
        (state as u16) & 0x8000 != 0
    }
}

// No global key-state query here; toggles stay in their initial state.
#[cfg(not(windows))]
impl KeySource for AsyncKeyState {
    fn is_pressed(&self, _key: u8) -> bool {
        false
    }
}
