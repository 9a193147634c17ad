//! strafe Engine - Host Image Discovery and Global Storage
//!
//! This crate handles:
//! - Locating the loaded main image of the host process
//! - Rebasing reference-build addresses onto that image
//! - Storing the result in a process-wide global
//!
//! # Architecture
//!
//! The image base is discovered once during attach via [`HostImage::discover`]
//! and stored with [`init_image`]. Every address from the address table goes
//! through [`Rebaser`] before it is dereferenced or patched.

pub mod error;
pub mod globals;
pub mod loader;
pub mod rebase;

pub use error::ImageError;
pub use globals::{init_image, is_image_initialized, try_image, HostImage};
pub use loader::current_image_base;
pub use rebase::{rebase, Rebaser};
