//! strafe Proc Macros
//!
//! This crate provides proc macros for the strafe framework:
//!
//! - `#[derive(HostStruct)]` - Generate typed accessors for host-owned structs
//!
//! # HostStruct Example
//!
//! ```ignore
//! use std::ffi::c_void;
//! use std::marker::PhantomData;
//! use strafe_core::layout::PhysentLayout;
//! use strafe_macros::HostStruct;
//!
//! #[derive(HostStruct)]
//! #[host(layout = "PhysentLayout", name = "physent")]
//! pub struct PlayerState {
//!     ptr: *mut c_void,
//!
//!     #[host(field = "vel")]
//!     _velocity: PhantomData<Vec3>,
//!
//!     #[host(field = "yaw", readonly)]
//!     _yaw: PhantomData<f32>,
//! }
//!
//! // Generated methods:
//! // - player.velocity() -> Vec3
//! // - player.set_velocity(v)
//! // - player.yaw() -> f32
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[host(layout = "Type")]` - **Required.** Offset table implementing `HostLayout`.
//! - `#[host(name = "physent")]` - Optional. Host-side type name for logs.
//!
//! ## Field Attributes
//!
//! - `#[host(field = "name")]` - Offset table entry backing this field.
//! - `#[host(readonly)]` - Don't generate a setter.

mod host_struct;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for host struct wrappers
///
/// Generates typed accessors that read and write fields of a host-owned
/// structure at offsets taken from a layout table. The table is consulted on
/// every access, so offsets loaded from configuration take effect without
/// recompiling.
///
/// # Generated Code
///
/// For each host field, the macro generates:
///
/// - A getter method (`fn velocity(&self) -> Vec3`)
/// - A setter method (`fn set_velocity(&mut self, value: Vec3)`) unless `readonly`
/// - A constant naming the layout entry
///
/// And for the struct:
///
/// - `fn as_ptr(&self) -> *mut c_void`
/// - A `HostObject` trait implementation (`from_ptr`, `is_valid`, ...)
#[proc_macro_derive(HostStruct, attributes(host))]
pub fn derive_host_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    host_struct::derive_host_struct(input).into()
}
