//! Address rebasing
//!
//! Addresses in the address table are captured against a fixed reference
//! image base. At runtime they are translated to the actual load base of the
//! current process image.

/// Translate `address` from `reference_base` to `image_base`
#[inline]
pub const fn rebase(address: usize, reference_base: usize, image_base: usize) -> usize {
    image_base.wrapping_add(address.wrapping_sub(reference_base))
}

/// Rebases addresses from one reference base onto one loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rebaser {
    reference_base: usize,
    image_base: usize,
}

impl Rebaser {
    pub const fn new(reference_base: usize, image_base: usize) -> Self {
        Self {
            reference_base,
            image_base,
        }
    }

    /// Rebaser for the image currently loaded in this process
    pub fn for_current_image(reference_base: usize) -> Result<Self, crate::ImageError> {
        let image_base = crate::loader::current_image_base()?;
        tracing::debug!(
            "Rebasing from {:#x} onto image at {:#x}",
            reference_base,
            image_base
        );
        Ok(Self::new(reference_base, image_base))
    }

    pub fn reference_base(&self) -> usize {
        self.reference_base
    }

    pub fn image_base(&self) -> usize {
        self.image_base
    }

    /// Rebase a raw address
    #[inline]
    pub fn address(&self, address: usize) -> usize {
        rebase(address, self.reference_base, self.image_base)
    }

    /// Rebase an address and view it as a typed pointer
    #[inline]
    pub fn pointer<T>(&self, address: usize) -> *mut T {
        self.address(address) as *mut T
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebase_moves_by_load_delta() {
        assert_eq!(rebase(0x4BFCA0, 0x400000, 0x1000000), 0x10BFCA0);
    }

    #[test]
    fn test_rebase_identity_when_loaded_at_reference() {
        assert_eq!(rebase(0x58AC00, 0x400000, 0x400000), 0x58AC00);
    }

    #[test]
    fn test_rebase_to_lower_base() {
        assert_eq!(rebase(0x4EC970, 0x400000, 0x300000), 0x3EC970);
    }

    #[test]
    fn test_pointer_and_address_agree() {
        let rebaser = Rebaser::new(0x400000, 0x7FF6_0000_0000u64 as usize);
        let ptr: *mut u32 = rebaser.pointer(0x58AC00);
        assert_eq!(ptr as usize, rebaser.address(0x58AC00));
    }
}
