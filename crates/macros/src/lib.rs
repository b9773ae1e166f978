//! tinyproto Proc Macros
//!
//! - `#[derive(Reobfuscate)]` - Describe a packet wrapper's raw mappings
//!
//! # Example
//!
//! ```ignore
//! use tinyproto_core::Reobfuscate;
//!
//! #[derive(Default, Reobfuscate)]
//! #[reobf(
//!     mapping = "ps=340+net/minecraft/network/ChatPacket=754",
//!     buffer = "net/minecraft/network/FriendlyByteBuf=340,754",
//!     read = "a=340",
//!     write = "b=340+write=754"
//! )]
//! pub struct ChatPacket {
//!     #[reobf(mapping = "a=340+message=754")]
//!     message: String,
//!
//!     #[reobf(mapping = "overlay=754", min = 754)]
//!     overlay: bool,
//!
//!     // Not mapped, conversions leave it alone
//!     received_at: u64,
//! }
//!
//! // Generated:
//! // - impl Reobfuscated for ChatPacket (and so Packet)
//! // - ChatPacket::TYPE_MAPPING, MESSAGE_MAPPING, OVERLAY_MAPPING
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[reobf(mapping = "...")]` - **Required.** Mapping of the raw packet type.
//! - `#[reobf(min = N, max = N)]` - Optional. Inclusive protocol version bounds.
//! - `#[reobf(buffer = "...")]` - Optional. Type mapping of the buffer.
//! - `#[reobf(read = "...", write = "...")]` - Optional. Method mappings of the
//!   raw read/write methods; need `buffer`.
//!
//! ## Field Attributes
//!
//! - `#[reobf(mapping = "...")]` - Mark as a mapped field.
//! - `#[reobf(min = N, max = N)]` - Versions the field exists in.
//! - `#[reobf(external_type = "...")]` - Raw type of the value.
//!
//! Mapped field types must convert to and from `Value`. Mapping strings are
//! checked at compile time.

mod parse;
mod reobfuscate;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for reobfuscated packet wrappers
///
/// Implements `tinyproto_core::packet::Reobfuscated` from the `#[reobf]`
/// attributes; the blanket `Packet` impl then provides the conversions.
///
/// The entity key every mapping is cached under is the struct's name.
#[proc_macro_derive(Reobfuscate, attributes(reobf))]
pub fn derive_reobfuscate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reobfuscate::derive_reobfuscate(input).into()
}
