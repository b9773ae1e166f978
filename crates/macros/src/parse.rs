//! Attribute parsing for the Reobfuscate derive macro

use darling::{FromDeriveInput, FromField};
use syn::{DeriveInput, Generics, Ident, Type};

/// Parsed #[reobf(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(reobf), supports(struct_named))]
pub struct PacketArgs {
    pub ident: Ident,

    pub generics: Generics,

    pub data: darling::ast::Data<(), PacketFieldArgs>,

    /// Mapping of the raw packet type (e.g., "ps=340+net/minecraft/ChatPacket=754")
    pub mapping: String,

    #[darling(default)]
    pub min: Option<u32>,

    #[darling(default)]
    pub max: Option<u32>,

    /// Type mapping of the buffer the raw packet reads from and writes to
    #[darling(default)]
    pub buffer: Option<String>,

    /// Method mapping of the raw read method
    #[darling(default)]
    pub read: Option<String>,

    /// Method mapping of the raw write method
    #[darling(default)]
    pub write: Option<String>,
}

/// Parsed #[reobf(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(reobf))]
pub struct PacketFieldArgs {
    pub ident: Option<Ident>,

    pub ty: Type,

    /// Field mapping on the raw packet
    /// If not specified, the field is not mapped and conversions leave it alone
    #[darling(default)]
    pub mapping: Option<String>,

    #[darling(default)]
    pub min: Option<u32>,

    #[darling(default)]
    pub max: Option<u32>,

    /// Raw type of the field's value
    #[darling(default)]
    pub external_type: Option<String>,
}

impl PacketFieldArgs {
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }
}

/// Parse a DeriveInput into PacketArgs
pub fn parse_packet(input: &DeriveInput) -> darling::Result<PacketArgs> {
    PacketArgs::from_derive_input(input)
}
