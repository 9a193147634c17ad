//! Mid-function hooks
//!
//! Splices code into an arbitrary offset inside a function body. The bytes at
//! the hook site are moved into a synthesized body that runs them, then the
//! optional injected instructions, then jumps back to the first untouched
//! instruction:
//!
//! ```text
//! target:   jmp [body_slot] ; nop ...          (preserve_size bytes)
//! body:     <original preserve_size bytes>
//!           <injected code>
//!           jmp [resume_slot]                  -> target + preserve_size
//! ```
//!
//! The preserved bytes are copied verbatim, so they must not contain
//! position-dependent instructions; choosing the site is the caller's job.
//! Mid-hooks are permanent for the life of the process.

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};
use std::sync::LazyLock;

use super::emitter::{self, Injector, JMP_ABS_LEN};
use super::inline::HookError;
use super::trampoline;
use crate::memory;

new_key_type! {
    /// Handle for a mid-function hook
    pub struct MidHookKey;
}

/// Executable bytes reserved for each mid-hook body
pub const MID_BODY_SIZE: usize = 256;

/// Storage for a mid-function hook
struct MidHookEntry {
    /// Hooked address
    target: usize,

    /// Synthesized body
    body: usize,

    /// Standalone `jmp [body_slot]` block
    trampoline: usize,

    /// Bytes that were at `target`
    original: Vec<u8>,

    /// Debug name
    name: String,
}

/// Global mid-hook registry
static MID_HOOKS: LazyLock<RwLock<SlotMap<MidHookKey, MidHookEntry>>> =
    LazyLock::new(|| RwLock::new(SlotMap::with_key()));

/// Lay out a mid-hook body placed at `body`
fn build_body(
    body: usize,
    original: &[u8],
    injector: Option<&Injector>,
    resume_slot: usize,
) -> Result<Vec<u8>, HookError> {
    let mut code = emitter::nops(original.len());

    if let Some(injector) = injector {
        let injected = emitter::assemble(body + code.len(), injector)?;
        code.extend_from_slice(&injected);
    }

    code[..original.len()].copy_from_slice(original);

    let jmp_back = emitter::indirect_jmp(body + code.len(), resume_slot)?;
    code.extend_from_slice(&jmp_back);

    if code.len() > MID_BODY_SIZE {
        return Err(HookError::Assembly(format!(
            "mid-hook body needs {} bytes, {} available",
            code.len(),
            MID_BODY_SIZE
        )));
    }
    Ok(code)
}

/// Synthesize the body and trampoline, then redirect `target`
unsafe fn splice(
    target: usize,
    original: &[u8],
    injector: Option<&Injector>,
) -> Result<(usize, usize), HookError> {
    let preserve_size = original.len();

    let body = trampoline::alloc_code(target, MID_BODY_SIZE)?;
    let resume_slot = trampoline::alloc_slot(body, target + preserve_size)?;
    let code = build_body(body, original, injector, resume_slot)?;
    trampoline::write_code(body, &code);

    let body_slot = trampoline::alloc_slot(target, body)?;
    let tramp = trampoline::alloc_code(target, JMP_ABS_LEN)?;
    trampoline::write_code(tramp, &emitter::indirect_jmp(tramp, body_slot)?);

    // Same jump, encoded for the hook site
    let patch = emitter::padded_jmp(target, body_slot, preserve_size)?;
    memory::write_bytes(target, &patch)?;

    Ok((body, tramp))
}

/// Create a mid-function hook at an arbitrary address
///
/// Rejects `preserve_size` below the jump length without touching memory. If
/// anything fails after the site has been cleared, the original bytes are put
/// back before the error is returned.
///
/// # Safety
/// - `target..target + preserve_size` must cover whole, position-independent instructions
/// - No thread may be executing that range while the hook is installed
pub unsafe fn create_mid_hook(
    name: &str,
    target: usize,
    preserve_size: usize,
    injector: Option<Injector>,
) -> Result<MidHookKey, HookError> {
    if preserve_size < JMP_ABS_LEN {
        tracing::error!(
            "Refusing mid-hook '{}' at {:x}: {} bytes < {}",
            name,
            target,
            preserve_size,
            JMP_ABS_LEN
        );
        return Err(HookError::RegionTooSmall {
            size: preserve_size,
            required: JMP_ABS_LEN,
        });
    }
    if target == 0 {
        return Err(HookError::InvalidAddress(target));
    }

    tracing::debug!(
        "Creating mid-hook '{}' at {:x} ({} bytes)",
        name,
        target,
        preserve_size
    );

    let original = memory::read_bytes(target, preserve_size)?;
    memory::fill(target, emitter::NOP, preserve_size)?;

    let (body, tramp) = match splice(target, &original, injector.as_ref()) {
        Ok(blocks) => blocks,
        Err(err) => {
            memory::write_bytes(target, &original)?;
            tracing::error!("Failed to create mid-hook '{}': {}", name, err);
            return Err(err);
        }
    };

    let entry = MidHookEntry {
        target,
        body,
        trampoline: tramp,
        original,
        name: name.to_string(),
    };

    let key = MID_HOOKS.write().insert(entry);

    tracing::info!("Created mid-hook '{}' at {:x} (body {:x})", name, target, body);

    Ok(key)
}

/// Mid-hooks cannot be switched off
pub fn disable_mid_hook(key: MidHookKey) -> Result<(), HookError> {
    let hooks = MID_HOOKS.read();
    let entry = hooks.get(key).ok_or(HookError::NotFound)?;
    tracing::warn!("Mid-hook '{}' is permanent", entry.name);
    Err(HookError::Permanent)
}

/// A mid-hook is active for as long as it exists
pub fn is_mid_hook_enabled(key: MidHookKey) -> bool {
    MID_HOOKS.read().contains_key(key)
}

/// Hooked address of a mid-hook
pub fn get_mid_hook_target(key: MidHookKey) -> Option<usize> {
    MID_HOOKS.read().get(key).map(|e| e.target)
}

/// Address of the synthesized body
pub fn get_mid_hook_body(key: MidHookKey) -> Option<usize> {
    MID_HOOKS.read().get(key).map(|e| e.body)
}

/// Address of the standalone trampoline block
pub fn get_mid_hook_trampoline(key: MidHookKey) -> Option<usize> {
    MID_HOOKS.read().get(key).map(|e| e.trampoline)
}

/// Bytes the hook displaced
pub fn get_mid_hook_original_bytes(key: MidHookKey) -> Option<Vec<u8>> {
    MID_HOOKS.read().get(key).map(|e| e.original.clone())
}

/// Number of installed mid-hooks
pub fn mid_hook_count() -> usize {
    MID_HOOKS.read().len()
}
