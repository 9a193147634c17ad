//! Physics entity layout
//!
//! Byte offsets of the host's `physent` fields, measured from the start of the
//! field block. The object pointer stored at the local-player slot points at
//! the vtable pointer, so the field block starts one pointer further on.

pub const ORIGIN: usize = 0x00;
pub const VELOCITY: usize = 0x0C;
pub const DELTA_POS: usize = 0x18;
pub const NEW_POS: usize = 0x24;
pub const YAW: usize = 0x30;
pub const PITCH: usize = 0x34;
pub const ROLL: usize = 0x38;
pub const PITCH_VEL: usize = 0x3C;
pub const MAX_SPEED: usize = 0x40;
pub const TIME_IN_AIR: usize = 0x44;
pub const RADIUS: usize = 0x48;
pub const EYE_HEIGHT: usize = 0x4C;
pub const MAX_EYE_HEIGHT: usize = 0x50;
pub const ABOVE_EYE: usize = 0x54;
pub const IN_WATER: usize = 0x58;
pub const ON_FLOOR: usize = 0x59;
pub const ON_LADDER: usize = 0x5A;
pub const JUMP_NEXT: usize = 0x5B;
pub const CROUCHING: usize = 0x5D;

/// Size of the field block
pub const SIZE: usize = 0x7C;
