//! strafe - Core Logic
//!
//! Hooking, code patching and the replacement movement model.
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Host types, reference addresses and default offsets
//! - [`engine`] - Host image discovery and rebasing

// Allow the crate to refer to itself as `strafe_core` for proc macro compatibility
extern crate self as strafe_core;

// Re-export SDK and engine crates
pub use strafe_engine as engine;
pub use strafe_sdk as sdk;

pub mod config;
pub mod frame;
pub mod gamedata;
pub mod hooks;
pub mod input;
pub mod layout;
pub mod memory;
pub mod movement;
pub mod player;
pub mod session;
pub mod toggles;

// Re-export commonly used items
pub use config::{ConfigError, ConfigResult, IntegrationMode, StrafeConfig};
pub use frame::{FrameDriver, FrameReport};
pub use gamedata::{Gamedata, GamedataError};
pub use hooks::{HookError, HookKey, HookManager, HookSlot, InlineHookKey, MidHookKey};
pub use input::{Direction, InputDirection, KeySource};
pub use memory::MemoryError;
pub use movement::{Body, MoveState, SurfaceFlags, Tunables};
pub use session::{attach, is_attached, AttachError};
pub use toggles::{Effect, ToggleRegistry, TransitionTable};

// Re-export macros
pub use strafe_macros::HostStruct;
