//! Inline function hooks
//!
//! Redirects a function's entry point to a detour. The instructions displaced by
//! the patch are decoded with iced-x86 and re-encoded into a trampoline near
//! the target, followed by a jump back into the untouched rest of the function,
//! so the trampoline behaves exactly like the original function.
//!
//! Hooks are created disabled. Enabling writes the patch, disabling restores
//! the saved bytes; both are idempotent.

use iced_x86::{
    BlockEncoder, BlockEncoderOptions, Decoder, DecoderOptions, FlowControl, IcedError,
    Instruction, InstructionBlock,
};
use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};
use std::sync::{LazyLock, OnceLock};

use super::emitter::{self, BITNESS, JMP_ABS_LEN};
use super::trampoline::{self, TRAMPOLINE_SIZE};
use crate::memory::{self, MemoryError};

new_key_type! {
    /// Handle for an inline hook
    pub struct InlineHookKey;
}

/// Error type for hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Code generation failed: {0}")]
    Assembly(String),

    #[error("Region of {size} bytes cannot hold a {required}-byte jump")]
    RegionTooSmall { size: usize, required: usize },

    #[error("Failed to allocate {size} executable bytes near {target:#x}")]
    Allocation { target: usize, size: usize },

    #[error("Jump from {from:#x} cannot reach {to:#x}")]
    OutOfRange { from: usize, to: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("Hook not found")]
    NotFound,

    #[error("Mid-function hooks cannot be disabled or removed")]
    Permanent,

    #[error("Invalid address: {0:#x}")]
    InvalidAddress(usize),

    #[error("Undecodable instruction at {0:#x}")]
    Decode(usize),

    #[error("Instruction relocation failed: {0}")]
    RelocationFailed(String),

    #[error("Hook already installed")]
    AlreadyInstalled,

    #[error("Hook signature must be a plain function pointer")]
    InvalidSignature,
}

impl From<IcedError> for HookError {
    fn from(err: IcedError) -> Self {
        HookError::Assembly(err.to_string())
    }
}

/// Bytes read from a target when looking for whole instructions
const MAX_PROLOGUE: usize = 32;

/// Internal storage for an inline hook
struct InlineHookEntry {
    /// Target function address
    target: usize,

    /// Relocated prologue plus jump back (the callable original)
    trampoline: usize,

    /// Bytes displaced by the patch
    original: Vec<u8>,

    /// `jmp [redirect slot]` padded to `original.len()`
    patch: Vec<u8>,

    /// Whether the patch is currently written
    enabled: bool,

    /// Description for debugging
    name: String,
}

/// Global inline hook registry
static INLINE_HOOKS: LazyLock<RwLock<SlotMap<InlineHookKey, InlineHookEntry>>> =
    LazyLock::new(|| RwLock::new(SlotMap::with_key()));

/// Bytes from `address` that lie in mapped memory, at most `max`
fn mapped_len(address: usize, max: usize) -> usize {
    let limit = address.saturating_add(max);
    let mut end = address;
    while end < limit {
        match region::query(end as *const u8) {
            Ok(mapping) => end = mapping.as_range().end,
            Err(_) => break,
        }
    }
    end.min(limit) - address
}

/// Decode whole instructions from the start of `code` until at least `min_len` bytes are covered
fn decode_prologue(code: &[u8], ip: usize, min_len: usize) -> Result<Vec<Instruction>, HookError> {
    let mut decoder = Decoder::with_ip(BITNESS, code, ip as u64, DecoderOptions::NONE);
    let mut instructions = Vec::new();
    let mut covered = 0;

    while covered < min_len {
        if !decoder.can_decode() {
            return Err(HookError::Decode(ip + covered));
        }

        let instr = decoder.decode();
        if instr.is_invalid() {
            return Err(HookError::Decode(ip + covered));
        }

        covered += instr.len();
        let ends_flow = matches!(
            instr.flow_control(),
            FlowControl::Return | FlowControl::UnconditionalBranch | FlowControl::IndirectBranch
        );
        instructions.push(instr);

        if ends_flow && covered < min_len {
            return Err(HookError::RegionTooSmall {
                size: covered,
                required: min_len,
            });
        }
    }

    Ok(instructions)
}

/// Build the trampoline for `instructions` at `block`, returning to `resume`
fn build_trampoline(
    instructions: &[Instruction],
    block: usize,
    resume_slot: usize,
) -> Result<Vec<u8>, HookError> {
    let relocated = BlockEncoder::encode(
        BITNESS,
        InstructionBlock::new(instructions, block as u64),
        BlockEncoderOptions::NONE,
    )
    .map_err(|e| HookError::RelocationFailed(e.to_string()))?;

    let mut code = relocated.code_buffer;
    let jmp_back = emitter::indirect_jmp(block + code.len(), resume_slot)?;
    code.extend_from_slice(&jmp_back);

    if code.len() > TRAMPOLINE_SIZE {
        return Err(HookError::RelocationFailed(format!(
            "trampoline needs {} bytes",
            code.len()
        )));
    }
    Ok(code)
}

/// Create an inline hook for a function
///
/// The hook starts disabled.
///
/// # Safety
/// - `target` must be the entry of a function whose first instructions can be relocated
/// - `detour` must be a function with a signature compatible with `target`
///
/// # Returns
/// A key to manage the hook, and a pointer to call the original function
pub unsafe fn create_inline_hook(
    name: &str,
    target: *const (),
    detour: *const (),
) -> Result<(InlineHookKey, *const ()), HookError> {
    let target = target as usize;
    if target == 0 {
        return Err(HookError::InvalidAddress(target));
    }

    tracing::debug!(
        "Creating inline hook '{}' at {:x} -> {:x}",
        name,
        target,
        detour as usize
    );

    // A short function may end right before an unmapped page
    let prologue = memory::read_bytes(target, mapped_len(target, MAX_PROLOGUE))?;
    let instructions = decode_prologue(&prologue, target, JMP_ABS_LEN)?;
    let stolen: usize = instructions.iter().map(Instruction::len).sum();

    let block = trampoline::alloc_trampoline(target)?;
    let resume_slot = trampoline::alloc_slot(block, target + stolen)?;
    let code = build_trampoline(&instructions, block, resume_slot)?;
    trampoline::write_code(block, &code);

    let redirect_slot = trampoline::alloc_slot(target, detour as usize)?;
    let patch = emitter::padded_jmp(target, redirect_slot, stolen)?;

    let entry = InlineHookEntry {
        target,
        trampoline: block,
        original: prologue[..stolen].to_vec(),
        patch,
        enabled: false,
        name: name.to_string(),
    };

    let key = INLINE_HOOKS.write().insert(entry);

    tracing::info!(
        "Created inline hook '{}' at {:x} ({} bytes relocated)",
        name,
        target,
        stolen
    );

    Ok((key, block as *const ()))
}

fn apply(entry: &mut InlineHookEntry, enabled: bool) -> Result<(), HookError> {
    if entry.enabled == enabled {
        return Ok(());
    }

    let bytes = if enabled { &entry.patch } else { &entry.original };
    unsafe { memory::write_bytes(entry.target, bytes)? };
    entry.enabled = enabled;
    Ok(())
}

/// Enable an inline hook
pub fn enable_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get_mut(key).ok_or(HookError::NotFound)?;

    if !entry.enabled {
        apply(entry, true)?;
        tracing::info!("Enabled inline hook '{}' at {:x}", entry.name, entry.target);
    }
    Ok(())
}

/// Disable an inline hook (keeps it installed but restores original bytes)
pub fn disable_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get_mut(key).ok_or(HookError::NotFound)?;

    if entry.enabled {
        apply(entry, false)?;
        tracing::info!("Disabled inline hook '{}' at {:x}", entry.name, entry.target);
    }
    Ok(())
}

/// Set several hooks to the same state under one registry lock
///
/// Either every hook ends up in the requested state or, on failure, every hook
/// changed so far is put back.
pub(crate) fn set_inline_hooks_enabled(
    keys: &[InlineHookKey],
    enabled: bool,
) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();

    if keys.iter().any(|&key| !hooks.contains_key(key)) {
        return Err(HookError::NotFound);
    }

    let mut changed = Vec::with_capacity(keys.len());
    for &key in keys {
        let Some(entry) = hooks.get_mut(key) else {
            continue;
        };
        if entry.enabled == enabled {
            continue;
        }

        if let Err(err) = apply(entry, enabled) {
            tracing::error!("Failed to switch inline hook '{}': {}", entry.name, err);
            for &done in changed.iter().rev() {
                if let Some(entry) = hooks.get_mut(done) {
                    if let Err(undo) = apply(entry, !enabled) {
                        tracing::error!(
                            "Failed to roll back inline hook '{}': {}",
                            entry.name,
                            undo
                        );
                    }
                }
            }
            return Err(err);
        }
        changed.push(key);
    }

    Ok(())
}

/// Remove an inline hook completely, restoring the original bytes
pub fn remove_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get_mut(key).ok_or(HookError::NotFound)?;
    apply(entry, false)?;

    if let Some(entry) = hooks.remove(key) {
        tracing::info!("Removed inline hook '{}' at {:x}", entry.name, entry.target);
    }
    Ok(())
}

/// Check if an inline hook is enabled
pub fn is_inline_hook_enabled(key: InlineHookKey) -> bool {
    INLINE_HOOKS
        .read()
        .get(key)
        .map(|e| e.enabled)
        .unwrap_or(false)
}

/// Get the target address of an inline hook
pub fn get_inline_hook_target(key: InlineHookKey) -> Option<usize> {
    INLINE_HOOKS.read().get(key).map(|e| e.target)
}

/// Get the original function trampoline for an inline hook
pub fn get_inline_hook_original(key: InlineHookKey) -> Option<*const ()> {
    INLINE_HOOKS
        .read()
        .get(key)
        .map(|e| e.trampoline as *const ())
}

/// Number of registered inline hooks
pub fn inline_hook_count() -> usize {
    INLINE_HOOKS.read().len()
}

/// Typed, write-once holder for an inline hook and its original function
///
/// The original pointer is stored before the hook can be enabled, so a detour
/// reading it through [`HookSlot::original`] never observes an empty slot
/// while redirected.
pub struct HookSlot<F> {
    name: &'static str,
    hook: OnceLock<(InlineHookKey, F)>,
}

impl<F: Copy> HookSlot<F> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            hook: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Install `detour` over `target` (disabled)
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the function at `target`.
    pub unsafe fn install(&self, target: usize, detour: F) -> Result<InlineHookKey, HookError> {
        if std::mem::size_of::<F>() != std::mem::size_of::<*const ()>() {
            return Err(HookError::InvalidSignature);
        }
        if self.hook.get().is_some() {
            return Err(HookError::AlreadyInstalled);
        }

        let detour_ptr: *const () = std::mem::transmute_copy(&detour);
        let (key, original) = create_inline_hook(self.name, target as *const (), detour_ptr)?;
        let original: F = std::mem::transmute_copy(&original);

        if self.hook.set((key, original)).is_err() {
            let _ = remove_inline_hook(key);
            return Err(HookError::AlreadyInstalled);
        }
        Ok(key)
    }

    /// Callable original function
    pub fn original(&self) -> Option<F> {
        self.hook.get().map(|(_, original)| *original)
    }

    pub fn key(&self) -> Option<InlineHookKey> {
        self.hook.get().map(|(key, _)| *key)
    }

    /// Check if the hook is installed
    pub fn is_installed(&self) -> bool {
        self.hook.get().is_some()
    }

    /// Check if the hook is enabled
    pub fn is_enabled(&self) -> bool {
        self.key().map(is_inline_hook_enabled).unwrap_or(false)
    }

    /// Enable the hook
    pub fn enable(&self) -> Result<(), HookError> {
        enable_inline_hook(self.key().ok_or(HookError::NotFound)?)
    }

    /// Disable the hook
    pub fn disable(&self) -> Result<(), HookError> {
        disable_inline_hook(self.key().ok_or(HookError::NotFound)?)
    }
}
