//! Register block seen by mid-hook observers
//!
//! [`ObserverCall::with_context`](super::ObserverCall::with_context) pushes
//! the host's general-purpose registers and flags, then hands the observer a
//! pointer to them. The field order mirrors the push order, lowest address
//! first. Writes through the pointer are popped back into the registers when
//! the observer returns.

use serde::{Deserialize, Serialize};

/// Saved registers on x86-64
#[cfg(target_arch = "x86_64")]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rax: u64,
    pub rflags: u64,
}

/// Saved registers on x86, in `pushad` order
#[cfg(not(target_arch = "x86_64"))]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterContext {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Value before `pushad`; ignored by `popad`
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub eflags: u32,
}

/// A general-purpose register, named independently of the register width
///
/// Configuration may use either the 32- or 64-bit name (`"esi"` or `"rsi"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SavedRegister {
    #[serde(rename = "eax", alias = "rax")]
    Ax,
    #[serde(rename = "ecx", alias = "rcx")]
    Cx,
    #[serde(rename = "edx", alias = "rdx")]
    Dx,
    #[serde(rename = "ebx", alias = "rbx")]
    Bx,
    #[serde(rename = "ebp", alias = "rbp")]
    Bp,
    #[serde(rename = "esi", alias = "rsi")]
    Si,
    #[serde(rename = "edi", alias = "rdi")]
    Di,
}

impl SavedRegister {
    pub const ALL: [SavedRegister; 7] = [
        SavedRegister::Ax,
        SavedRegister::Cx,
        SavedRegister::Dx,
        SavedRegister::Bx,
        SavedRegister::Bp,
        SavedRegister::Si,
        SavedRegister::Di,
    ];

    /// Immediate passed to an observer to name this register; never 0
    pub fn code(self) -> usize {
        self as usize + 1
    }

    /// Inverse of [`code`](Self::code); 0 and unknown codes give `None`
    pub fn from_code(code: usize) -> Option<Self> {
        code.checked_sub(1)
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }
}

impl RegisterContext {
    /// Value of one saved register
    #[cfg(target_arch = "x86_64")]
    pub fn get(&self, register: SavedRegister) -> usize {
        (match register {
            SavedRegister::Ax => self.rax,
            SavedRegister::Cx => self.rcx,
            SavedRegister::Dx => self.rdx,
            SavedRegister::Bx => self.rbx,
            SavedRegister::Bp => self.rbp,
            SavedRegister::Si => self.rsi,
            SavedRegister::Di => self.rdi,
        }) as usize
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub fn get(&self, register: SavedRegister) -> usize {
        (match register {
            SavedRegister::Ax => self.eax,
            SavedRegister::Cx => self.ecx,
            SavedRegister::Dx => self.edx,
            SavedRegister::Bx => self.ebx,
            SavedRegister::Bp => self.ebp,
            SavedRegister::Si => self.esi,
            SavedRegister::Di => self.edi,
        }) as usize
    }

    /// Whether `register` holds `value`, or any saved register does when `None`
    pub fn holds(&self, register: Option<SavedRegister>, value: usize) -> bool {
        match register {
            Some(register) => self.get(register) == value,
            None => SavedRegister::ALL.iter().any(|&r| self.get(r) == value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_codes_round_trip_and_skip_zero() {
        assert_eq!(SavedRegister::from_code(0), None);
        assert_eq!(SavedRegister::from_code(8), None);
        for register in SavedRegister::ALL {
            assert_ne!(register.code(), 0);
            assert_eq!(SavedRegister::from_code(register.code()), Some(register));
        }
    }

    #[test]
    fn test_register_names_accept_both_widths() {
        let narrow: SavedRegister = serde_json::from_str("\"esi\"").unwrap();
        let wide: SavedRegister = serde_json::from_str("\"rsi\"").unwrap();
        assert_eq!(narrow, SavedRegister::Si);
        assert_eq!(wide, SavedRegister::Si);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_holds_checks_named_or_any_register() {
        let ctx = RegisterContext {
            rsi: 0x1000,
            rbx: 0x2000,
            ..RegisterContext::default()
        };

        assert!(ctx.holds(Some(SavedRegister::Si), 0x1000));
        assert!(!ctx.holds(Some(SavedRegister::Di), 0x1000));
        assert!(ctx.holds(None, 0x2000));
        assert!(!ctx.holds(None, 0x3000));
        assert_eq!(std::mem::size_of::<RegisterContext>(), 16 * 8);
    }
}
