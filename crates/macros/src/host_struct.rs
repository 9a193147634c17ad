//! HostStruct derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericArgument, Path, PathArguments, Type};

use crate::parse::{parse_host_struct, HostFieldArgs, HostStructArgs};

/// Extract the inner type from `PhantomData<T>` if present, otherwise return the type as-is
fn extract_inner_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "PhantomData" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}

/// Check if a type is PhantomData
fn is_phantom_data(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "PhantomData";
        }
    }
    false
}

/// Generate the HostStruct implementation
pub fn derive_host_struct(input: DeriveInput) -> TokenStream {
    match parse_host_struct(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: HostStructArgs) -> TokenStream {
    let struct_name = &args.ident;
    let type_name = args
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let fields = match args.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        _ => {
            return syn::Error::new_spanned(
                &args.ident,
                "HostStruct can only be derived for structs",
            )
            .to_compile_error()
        }
    };

    if !fields.iter().any(|f| f.is_ptr_field()) {
        return syn::Error::new_spanned(
            &args.ident,
            "HostStruct requires a `ptr: *mut c_void` field",
        )
        .to_compile_error();
    }

    let accessors: Vec<_> = fields
        .iter()
        .filter(|f| f.is_host_field())
        .map(|f| generate_accessors(struct_name, &args.layout, f))
        .collect();

    let constants = generate_constants(&type_name, &fields);
    let host_object_impl = generate_host_object_impl(struct_name, &type_name, &fields);

    quote! {
        impl #struct_name {
            #constants

            /// Get the raw pointer
            pub fn as_ptr(&self) -> *mut ::std::ffi::c_void {
                self.ptr
            }
        }

        #(#accessors)*

        #host_object_impl
    }
}

fn clean_name(field: &HostFieldArgs) -> String {
    let field_name_str = field
        .ident
        .as_ref()
        .map(|i| i.to_string())
        .unwrap_or_default();
    field_name_str
        .strip_prefix('_')
        .unwrap_or(&field_name_str)
        .to_string()
}

fn generate_accessors(struct_name: &syn::Ident, layout: &Path, field: &HostFieldArgs) -> TokenStream {
    let layout_field_str = field.field_name.as_deref().unwrap_or_default();
    let layout_field = format_ident!("{}", layout_field_str);
    let field_ty = extract_inner_type(&field.ty);

    let clean = clean_name(field);
    let getter_name = format_ident!("{}", clean);
    let setter_name = format_ident!("set_{}", clean);

    let getter_doc = format!("Read the host field `{}`", layout_field_str);
    let setter_doc = format!("Write the host field `{}`", layout_field_str);

    let getter = quote! {
        #[doc = #getter_doc]
        #[inline]
        pub fn #getter_name(&self) -> #field_ty {
            let offset = <#layout as ::strafe_core::layout::HostLayout>::current().#layout_field;

            unsafe {
                let ptr = self.ptr.byte_add(offset).cast::<#field_ty>();
                ptr.read_unaligned()
            }
        }
    };

    let setter = if field.readonly {
        quote! {}
    } else {
        quote! {
            #[doc = #setter_doc]
            #[inline]
            pub fn #setter_name(&mut self, value: #field_ty) {
                let offset = <#layout as ::strafe_core::layout::HostLayout>::current().#layout_field;

                unsafe {
                    let ptr = self.ptr.byte_add(offset).cast::<#field_ty>();
                    ptr.write_unaligned(value);
                }
            }
        }
    };

    quote! {
        impl #struct_name {
            #getter
            #setter
        }
    }
}

fn generate_constants(type_name: &str, fields: &[HostFieldArgs]) -> TokenStream {
    let field_constants = fields.iter().filter(|f| f.is_host_field()).map(|f| {
        let layout_field = f.field_name.as_deref().unwrap_or_default();
        let const_name = format_ident!("{}_FIELD", clean_name(f).to_uppercase());
        let field_doc = format!("Layout entry backing `{}`", clean_name(f));

        quote! {
            #[doc = #field_doc]
            pub const #const_name: &'static str = #layout_field;
        }
    });

    quote! {
        /// Host-side type name
        pub const TYPE_NAME: &'static str = #type_name;

        #(#field_constants)*
    }
}

fn generate_host_object_impl(
    struct_name: &syn::Ident,
    type_name: &str,
    fields: &[HostFieldArgs],
) -> TokenStream {
    let field_inits: Vec<_> = fields
        .iter()
        .filter(|f| !f.is_ptr_field())
        .filter_map(|f| {
            let ident = f.ident.as_ref()?;
            if is_phantom_data(&f.ty) {
                Some(quote! { #ident: ::std::marker::PhantomData })
            } else {
                Some(quote! { #ident: ::std::default::Default::default() })
            }
        })
        .collect();

    quote! {
        impl ::strafe_core::layout::HostObject for #struct_name {
            fn ptr(&self) -> *mut ::std::ffi::c_void {
                self.ptr
            }

            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn is_valid(&self) -> bool {
                !self.ptr.is_null()
            }

            unsafe fn from_ptr(ptr: *mut ::std::ffi::c_void) -> Option<Self> {
                if ptr.is_null() {
                    None
                } else {
                    Some(Self {
                        ptr,
                        #(#field_inits),*
                    })
                }
            }
        }
    }
}
