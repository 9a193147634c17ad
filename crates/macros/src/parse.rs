//! Attribute parsing for HostStruct derive macro

use darling::{FromDeriveInput, FromField};
use syn::{DeriveInput, Ident, Path, Type, Visibility};

/// Parsed #[host(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(host), supports(struct_named))]
pub struct HostStructArgs {
    /// Struct identifier
    pub ident: Ident,

    /// Struct visibility
    pub vis: Visibility,

    /// Struct fields
    pub data: darling::ast::Data<(), HostFieldArgs>,

    /// Offset table type implementing `HostLayout` (e.g., "PhysentLayout")
    pub layout: Path,

    /// Host-side type name used in logs (defaults to the struct name)
    #[darling(default)]
    pub name: Option<String>,
}

/// Parsed #[host(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(host))]
pub struct HostFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Field visibility
    pub vis: Visibility,

    /// Name of the offset in the layout table (e.g., "vel")
    /// If not specified, this is not a host field (e.g., the ptr field)
    #[darling(rename = "field")]
    pub field_name: Option<String>,

    /// Whether this field is read-only (no setter generated)
    #[darling(default)]
    pub readonly: bool,
}

impl HostFieldArgs {
    /// Check if this is a host field (has field attribute)
    pub fn is_host_field(&self) -> bool {
        self.field_name.is_some()
    }

    /// Check if this is the base pointer field
    pub fn is_ptr_field(&self) -> bool {
        self.ident.as_ref().map(|i| i == "ptr").unwrap_or(false)
    }
}

/// Parse a DeriveInput into HostStructArgs
pub fn parse_host_struct(input: &DeriveInput) -> darling::Result<HostStructArgs> {
    HostStructArgs::from_derive_input(input)
}
