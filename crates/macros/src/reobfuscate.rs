//! Reobfuscate derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident};
use tinyproto_mappings::{parse_spec, SymbolStyle};

use crate::parse::{parse_packet, PacketArgs, PacketFieldArgs};

/// Generate the Reobfuscated implementation
pub fn derive_reobfuscate(input: DeriveInput) -> TokenStream {
    match parse_packet(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

/// Reject malformed mapping strings at compile time
fn check_mapping(
    errors: &mut darling::error::Accumulator,
    span: &Ident,
    what: &str,
    spec: &str,
) {
    if let Err(e) = parse_spec(spec, SymbolStyle::Verbatim) {
        errors.push(darling::Error::from(syn::Error::new_spanned(
            span,
            format!("invalid {} mapping `{}`: {}", what, spec, e),
        )));
    }
}

fn check_bounds(
    errors: &mut darling::error::Accumulator,
    span: &Ident,
    min: Option<u32>,
    max: Option<u32>,
) {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(darling::Error::from(syn::Error::new_spanned(
                span,
                format!("min ({}) is greater than max ({})", min, max),
            )));
        }
    }
}

fn validate(args: &PacketArgs, fields: &[PacketFieldArgs]) -> darling::Result<()> {
    let mut errors = darling::Error::accumulator();
    let ident = &args.ident;

    check_mapping(&mut errors, ident, "type", &args.mapping);
    check_bounds(&mut errors, ident, args.min, args.max);

    if let Some(buffer) = &args.buffer {
        check_mapping(&mut errors, ident, "buffer", buffer);
    } else if args.read.is_some() || args.write.is_some() {
        errors.push(darling::Error::from(syn::Error::new_spanned(
            ident,
            "`read` and `write` need a `buffer` mapping",
        )));
    }
    if let Some(read) = &args.read {
        check_mapping(&mut errors, ident, "read", read);
    }
    if let Some(write) = &args.write {
        check_mapping(&mut errors, ident, "write", write);
    }

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        match &field.mapping {
            Some(mapping) => {
                check_mapping(&mut errors, field_ident, "field", mapping);
                check_bounds(&mut errors, field_ident, field.min, field.max);
            }
            None if field.min.is_some() || field.max.is_some() || field.external_type.is_some() => {
                errors.push(darling::Error::from(syn::Error::new_spanned(
                    field_ident,
                    "`min`, `max` and `external_type` need a `mapping`",
                )));
            }
            None => {}
        }
    }

    errors.finish()
}

fn reobfuscation(mapping: &str, min: Option<u32>, max: Option<u32>) -> TokenStream {
    let min = min.map(|min| quote! { .with_min(#min) });
    let max = max.map(|max| quote! { .with_max(#max) });
    quote! {
        ::tinyproto_core::mappings::Reobfuscation::new(#mapping) #min #max
    }
}

fn generate_impl(args: PacketArgs) -> TokenStream {
    let fields = match &args.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(
                &args.ident,
                "Reobfuscate can only be derived for structs",
            )
            .to_compile_error()
        }
    };

    if let Err(e) = validate(&args, fields) {
        return e.write_errors();
    }

    let struct_name = &args.ident;
    let entity = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    let mapped: Vec<_> = fields
        .iter()
        .filter(|f| f.is_mapped())
        .filter_map(|f| f.ident.as_ref().map(|ident| (ident, f)))
        .collect();

    let type_mapping = reobfuscation(&args.mapping, args.min, args.max);
    let field_mappings = mapped.iter().map(|(ident, f)| generate_field_mapping(ident, f));
    let constants = generate_constants(&args, &mapped);
    let stream_mappings = generate_stream_mappings(&args);

    let getters = mapped.iter().map(|(ident, _)| {
        let name = ident.to_string();
        quote! {
            #name => ::std::option::Option::Some(
                ::tinyproto_core::runtime::Value::from(::std::clone::Clone::clone(&self.#ident)),
            ),
        }
    });

    let setters = mapped.iter().map(|(ident, f)| {
        let name = ident.to_string();
        let ty = &f.ty;
        quote! {
            #name => {
                self.#ident = <#ty as ::std::convert::TryFrom<::tinyproto_core::runtime::Value>>::try_from(value)?;
                ::std::result::Result::Ok(())
            }
        }
    });

    quote! {
        impl #impl_generics #struct_name #ty_generics #where_clause {
            #constants
        }

        impl #impl_generics ::tinyproto_core::packet::Reobfuscated for #struct_name #ty_generics #where_clause {
            const ENTITY: &'static str = #entity;

            fn type_mapping() -> ::tinyproto_core::mappings::Reobfuscation {
                #type_mapping
            }

            fn field_mappings() -> &'static [::tinyproto_core::packet::FieldMapping] {
                const FIELDS: &[::tinyproto_core::packet::FieldMapping] = &[#(#field_mappings),*];
                FIELDS
            }

            #stream_mappings

            fn field_value(&self, name: &str) -> ::std::option::Option<::tinyproto_core::runtime::Value> {
                match name {
                    #(#getters)*
                    _ => ::std::option::Option::None,
                }
            }

            fn apply_field_value(
                &mut self,
                name: &str,
                value: ::tinyproto_core::runtime::Value,
            ) -> ::tinyproto_core::Result<()> {
                match name {
                    #(#setters)*
                    _ => ::std::result::Result::Err(::tinyproto_core::Error::MemberNotFound {
                        owner: ::std::string::ToString::to_string(#entity),
                        member: ::std::string::ToString::to_string(name),
                    }),
                }
            }
        }
    }
}

fn generate_field_mapping(ident: &Ident, field: &PacketFieldArgs) -> TokenStream {
    let name = ident.to_string();
    let reobf = reobfuscation(field.mapping.as_deref().unwrap_or_default(), field.min, field.max);
    let external_type = match &field.external_type {
        Some(ty) => quote! { ::std::option::Option::Some(#ty) },
        None => quote! { ::std::option::Option::None },
    };

    quote! {
        ::tinyproto_core::packet::FieldMapping {
            name: #name,
            reobf: #reobf,
            external_type: #external_type,
        }
    }
}

fn generate_constants(args: &PacketArgs, mapped: &[(&Ident, &PacketFieldArgs)]) -> TokenStream {
    let type_mapping = &args.mapping;

    let field_constants = mapped.iter().map(|(ident, f)| {
        let field_name = ident.to_string();
        let clean_name = field_name.strip_prefix('_').unwrap_or(&field_name);
        let const_name = format_ident!("{}_MAPPING", clean_name.to_uppercase());
        let mapping = f.mapping.as_deref().unwrap_or_default();
        let doc = format!("Mapping of `{}`", clean_name);

        quote! {
            #[doc = #doc]
            pub const #const_name: &'static str = #mapping;
        }
    });

    quote! {
        /// Mapping of the raw packet type
        pub const TYPE_MAPPING: &'static str = #type_mapping;

        #(#field_constants)*
    }
}

fn generate_stream_mappings(args: &PacketArgs) -> TokenStream {
    let Some(buffer) = &args.buffer else {
        return quote! {};
    };

    let optional = |spec: &Option<String>| match spec {
        Some(spec) => quote! { ::std::option::Option::Some(#spec) },
        None => quote! { ::std::option::Option::None },
    };
    let read = optional(&args.read);
    let write = optional(&args.write);

    quote! {
        fn stream_mappings() -> ::std::option::Option<::tinyproto_core::packet::StreamMappings> {
            ::std::option::Option::Some(::tinyproto_core::packet::StreamMappings {
                buffer: #buffer,
                read: #read,
                write: #write,
            })
        }
    }
}
