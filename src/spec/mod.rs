//! Transform spec: token grammar, wire codec, and the ratio float
//!
//! A spec travels as `checksum_byte || header_bits || packed_attr_values`:
//! - the header is a fixed-order run of 1-bit flags,
//! - the body packs attribute values contiguously in header order, so its
//!   layout depends on which flags are set,
//! - the checksum is a 1-byte additive integrity check over the body
//!   (format integrity only, not authentication — see [`crate::cipher`]).

pub mod bitfloat;
pub mod codec;

mod grammar;

pub use bitfloat::PrecisionError;
pub use codec::{ImageFormat, LayoutVersion, SpecAttrs, SpecError, SpecFlags, TransformSpec};
