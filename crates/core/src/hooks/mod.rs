//! Hook system
//!
//! Provides two hook types:
//! - Inline hooks (function detours with relocated trampolines)
//! - Mid-function hooks (arbitrary address, original bytes replayed in a synthesized body)
//!
//! Both are built from the same pieces: [`emitter`] encodes the machine code,
//! [`trampoline`] provides executable memory next to the hooked code and
//! [`crate::memory`] writes the patch.

pub mod context;
pub mod emitter;
pub mod inline;
pub mod manager;
pub mod midhook;
pub mod trampoline;

pub use context::{RegisterContext, SavedRegister};
pub use emitter::{Injector, ObserverCall, JMP_ABS_LEN};
pub use inline::{HookError, HookSlot, InlineHookKey};
pub use manager::{HookKey, HookManager};
pub use midhook::MidHookKey;
