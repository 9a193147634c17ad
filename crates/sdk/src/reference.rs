//! Addresses captured against the reference build
//!
//! Every address here is relative to [`IMAGE_BASE`], the base used by the
//! reversing tool. They must be rebased against the loaded image before use
//! and re-derived whenever the host binary changes.

/// Image base the addresses below were captured against
pub const IMAGE_BASE: usize = 0x400000;

/// Pointer to the local player object
pub const LOCAL_PLAYER: usize = 0x58AC00;

/// Directional input handlers, `int handler(bool began)`
pub const PLAYER_FORWARD: usize = 0x4BFCA0;
pub const PLAYER_BACKWARD: usize = 0x4BFD00;
pub const PLAYER_LEFT: usize = 0x4BFC40;
pub const PLAYER_RIGHT: usize = 0x4BFBF0;
pub const PLAYER_JUMP: usize = 0x4BFA30;

/// Per-frame input polling routine, `void checkinput()`
pub const CHECK_INPUT: usize = 0x4EC970;

/// Ground friction site inside `moveplayer`
pub const MOVEPLAYER_FRICTION_GROUND: usize = 0x4C19D3;
/// Whole-instruction byte count at [`MOVEPLAYER_FRICTION_GROUND`]
pub const MOVEPLAYER_FRICTION_GROUND_SIZE: usize = 6;

/// Air friction site inside `moveplayer`
pub const MOVEPLAYER_FRICTION_AIR: usize = 0x4C21D5;
/// Whole-instruction byte count at [`MOVEPLAYER_FRICTION_AIR`]
pub const MOVEPLAYER_FRICTION_AIR_SIZE: usize = 10;
