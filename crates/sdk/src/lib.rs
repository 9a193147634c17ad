//! strafe SDK - Host Type Definitions
//!
//! This crate contains the plain data types shared with the host process.
//! It has no dependencies and compiles quickly, allowing parallel compilation
//! of dependent crates.
//!
//! # Modules
//!
//! - [`vec3`] - The host's three-float vector
//! - [`reference`] - Addresses captured against the reference build
//! - [`physent`] - Default field offsets of the host's physics entity
//! - [`keys`] - Virtual-key codes used by the default toggle bindings

pub mod keys;
pub mod physent;
pub mod reference;
pub mod vec3;

pub use vec3::Vec3;
