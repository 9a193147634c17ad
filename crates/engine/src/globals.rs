//! Global host image storage
//!
//! The image base is discovered once during attach and stored here for the
//! rest of the process lifetime. It is never persisted: the next process
//! discovers its own.

use std::sync::OnceLock;
use std::thread::ThreadId;

use crate::error::ImageError;
use crate::rebase::Rebaser;

/// Process-wide facts about the host image
#[derive(Debug)]
pub struct HostImage {
    /// Rebaser from the address table's reference base onto the loaded image
    pub rebaser: Rebaser,

    /// Thread that performed the attach
    pub attach_thread_id: ThreadId,
}

impl HostImage {
    /// Create new HostImage
    ///
    /// # Arguments
    /// * `rebaser` - Rebaser for the loaded image
    pub fn new(rebaser: Rebaser) -> Self {
        Self {
            rebaser,
            attach_thread_id: std::thread::current().id(),
        }
    }

    /// Discover the loaded image and build the globals for it
    pub fn discover(reference_base: usize) -> Result<Self, ImageError> {
        Ok(Self::new(Rebaser::for_current_image(reference_base)?))
    }

    /// Rebase a reference-build address onto the loaded image
    pub fn rebase(&self, address: usize) -> usize {
        self.rebaser.address(address)
    }
}

/// Global host image storage
static IMAGE: OnceLock<HostImage> = OnceLock::new();

/// Initialize image globals
///
/// Called once during attach. Returns error if already initialized.
pub fn init_image(image: HostImage) -> Result<&'static HostImage, ImageError> {
    IMAGE.set(image).map_err(|_| ImageError::AlreadyInitialized)?;
    let image = IMAGE.get().ok_or(ImageError::AlreadyInitialized)?;
    tracing::info!("Host image at {:#x}", image.rebaser.image_base());
    Ok(image)
}

/// Get image globals, if attach has run
pub fn try_image() -> Option<&'static HostImage> {
    IMAGE.get()
}

/// Check if image globals are initialized
pub fn is_image_initialized() -> bool {
    IMAGE.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_starts_uninitialized() {
        assert!(!is_image_initialized());
        assert!(try_image().is_none());
    }

    #[test]
    fn test_image_rebases_through_rebaser() {
        let image = HostImage::new(Rebaser::new(0x400000, 0x10_0000));
        assert_eq!(image.rebase(0x4C19D3), 0x1C19D3);
    }
}
