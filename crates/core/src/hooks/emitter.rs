//! Machine-code emitter
//!
//! Everything that turns intent into x86 bytes lives here so the unsafe parts
//! of hooking (writing the bytes somewhere executable) stay separate from the
//! encoding, which is pure and can be checked against scratch buffers.
//!
//! Control transfers use one fixed encoding, `jmp [slot]` (`FF 25 disp32`),
//! six bytes on both x86 and x86-64. On x86 the displacement is the absolute
//! address of the pointer slot; on x86-64 it is RIP-relative, so the slot must
//! sit within ±2GB of the jump, which the trampoline allocator guarantees.

use iced_x86::code_asm::CodeAssembler;

use super::inline::HookError;

/// Length of the `jmp [slot]` encoding
pub const JMP_ABS_LEN: usize = 6;

/// Size of a jump-target pointer slot
pub const SLOT_SIZE: usize = std::mem::size_of::<usize>();

/// Single-byte no-op
pub const NOP: u8 = 0x90;

/// Decoder/assembler bitness for the current target
pub const BITNESS: u32 = usize::BITS;

/// Callback that emits instructions into a mid-hook body
pub type Injector = Box<dyn Fn(&mut CodeAssembler) -> Result<(), HookError> + Send + Sync>;

/// Encode `jmp [slot]` for an instruction placed at `site`
#[cfg(target_pointer_width = "32")]
pub fn indirect_jmp(_site: usize, slot: usize) -> Result<[u8; JMP_ABS_LEN], HookError> {
    let disp = (slot as u32).to_le_bytes();
    Ok([0xFF, 0x25, disp[0], disp[1], disp[2], disp[3]])
}

/// Encode `jmp [rip + disp32]` reaching `slot` from an instruction placed at `site`
#[cfg(target_pointer_width = "64")]
pub fn indirect_jmp(site: usize, slot: usize) -> Result<[u8; JMP_ABS_LEN], HookError> {
    let next = (site as i64).wrapping_add(JMP_ABS_LEN as i64);
    let delta = (slot as i64).wrapping_sub(next);
    let disp = i32::try_from(delta).map_err(|_| HookError::OutOfRange { from: site, to: slot })?;
    let disp = disp.to_le_bytes();
    Ok([0xFF, 0x25, disp[0], disp[1], disp[2], disp[3]])
}

/// `len` bytes of no-op
pub fn nops(len: usize) -> Vec<u8> {
    vec![NOP; len]
}

/// `jmp [slot]` at `site`, padded with no-ops to exactly `len` bytes
pub fn padded_jmp(site: usize, slot: usize, len: usize) -> Result<Vec<u8>, HookError> {
    if len < JMP_ABS_LEN {
        return Err(HookError::RegionTooSmall {
            size: len,
            required: JMP_ABS_LEN,
        });
    }

    let mut code = indirect_jmp(site, slot)?.to_vec();
    code.resize(len, NOP);
    Ok(code)
}

/// Assemble an injector's instructions as they will run at `ip`
pub fn assemble(ip: usize, injector: &Injector) -> Result<Vec<u8>, HookError> {
    let mut assembler = CodeAssembler::new(BITNESS)?;
    injector(&mut assembler)?;

    if assembler.instructions().is_empty() {
        return Ok(Vec::new());
    }

    Ok(assembler.assemble(ip as u64)?)
}

/// Bytes `fxsave` writes; the area must be 16-byte aligned
pub const FXSAVE_SIZE: usize = 512;

/// A call out to an observer function from inside a mid-hook body
///
/// The emitted sequence saves the general-purpose registers and flags as a
/// [`RegisterContext`](super::RegisterContext), saves the x87/SSE state with
/// `fxsave`, aligns the stack and calls the observer with the native C
/// convention. Everything is restored afterwards, so the host resumes with the
/// state it had before the call, apart from context fields the observer wrote.
///
/// With [`with_context`](Self::with_context) the observer's first argument is
/// a `*mut RegisterContext`; the immediates follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverCall {
    target: usize,
    args: Vec<usize>,
    context: bool,
}

impl ObserverCall {
    /// Maximum number of arguments, context pointer included
    pub const MAX_ARGS: usize = 4;

    /// Call a zero-argument `extern "C"` observer
    pub fn new(target: usize) -> Self {
        Self {
            target,
            args: Vec::new(),
            context: false,
        }
    }

    /// Pass immediate arguments, in declaration order
    pub fn with_args(mut self, args: &[usize]) -> Result<Self, HookError> {
        self.args = args.to_vec();
        self.check_arity()?;
        Ok(self)
    }

    /// Pass a pointer to the saved registers as the first argument
    pub fn with_context(mut self) -> Result<Self, HookError> {
        self.context = true;
        self.check_arity()?;
        Ok(self)
    }

    fn check_arity(&self) -> Result<(), HookError> {
        if self.arity() > Self::MAX_ARGS {
            return Err(HookError::Assembly(format!(
                "observer takes {} arguments, at most {} supported",
                self.arity(),
                Self::MAX_ARGS
            )));
        }
        Ok(())
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn passes_context(&self) -> bool {
        self.context
    }

    /// Number of arguments the observer receives
    pub fn arity(&self) -> usize {
        self.args.len() + usize::from(self.context)
    }

    /// Bytes of stack arguments the caller removes after the call
    pub fn stack_cleanup(&self) -> usize {
        if cfg!(target_pointer_width = "32") {
            self.arity() * SLOT_SIZE
        } else {
            0
        }
    }

    /// Padding that keeps the stack 16-byte aligned at the call on x86
    pub fn stack_padding(&self) -> usize {
        (16 - self.stack_cleanup() % 16) % 16
    }

    /// Turn this call into a mid-hook injector
    pub fn into_injector(self) -> Injector {
        Box::new(move |assembler| self.emit(assembler))
    }

    #[cfg(target_arch = "x86_64")]
    pub fn emit(&self, a: &mut CodeAssembler) -> Result<(), HookError> {
        use iced_x86::code_asm::*;

        // Reverse of the `RegisterContext` field order
        const SAVED: [AsmRegister64; 15] = [
            rax, rcx, rdx, rbx, rbp, rsi, rdi, r8, r9, r10, r11, r12, r13, r14, r15,
        ];
        #[cfg(windows)]
        const ARGS: [AsmRegister64; 4] = [rcx, rdx, r8, r9];
        #[cfg(not(windows))]
        const ARGS: [AsmRegister64; 4] = [rdi, rsi, rdx, rcx];

        // Step over the SysV red zone before touching the stack
        a.lea(rsp, ptr(rsp - 128))?;
        a.pushfq()?;
        for reg in SAVED {
            a.push(reg)?;
        }
        // rbp is callee-saved, so it still addresses the block after the call
        a.mov(rbp, rsp)?;
        a.and(rsp, -16)?;
        a.sub(rsp, FXSAVE_SIZE as i32)?;
        a.fxsave(ptr(rsp))?;
        // Win64 shadow space
        a.sub(rsp, 32)?;

        let mut regs = ARGS.iter();
        if self.context {
            if let Some(reg) = regs.next() {
                a.mov(*reg, rbp)?;
            }
        }
        for (reg, value) in regs.zip(&self.args) {
            a.mov(*reg, *value as u64)?;
        }
        a.mov(rax, self.target as u64)?;
        a.call(rax)?;

        a.add(rsp, 32)?;
        a.fxrstor(ptr(rsp))?;
        a.mov(rsp, rbp)?;
        for reg in SAVED.iter().rev() {
            a.pop(*reg)?;
        }
        a.popfq()?;
        a.lea(rsp, ptr(rsp + 128))?;
        Ok(())
    }

    #[cfg(target_arch = "x86")]
    pub fn emit(&self, a: &mut CodeAssembler) -> Result<(), HookError> {
        use iced_x86::code_asm::*;

        a.pushfd()?;
        a.pushad()?;
        a.mov(ebp, esp)?;
        a.and(esp, -16)?;
        a.sub(esp, FXSAVE_SIZE as i32)?;
        a.fxsave(ptr(esp))?;

        let padding = self.stack_padding();
        if padding > 0 {
            a.sub(esp, padding as i32)?;
        }
        for value in self.args.iter().rev() {
            a.push(*value as u32)?;
        }
        if self.context {
            a.push(ebp)?;
        }
        a.mov(eax, self.target as u32)?;
        a.call(eax)?;
        let cleanup = self.stack_cleanup() + padding;
        if cleanup > 0 {
            a.add(esp, cleanup as i32)?;
        }

        a.fxrstor(ptr(esp))?;
        a.mov(esp, ebp)?;
        a.popad()?;
        a.popfd()?;
        Ok(())
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn emit(&self, _a: &mut CodeAssembler) -> Result<(), HookError> {
        Err(HookError::Assembly(
            "observer calls are only emitted for x86 targets".into(),
        ))
    }
}
