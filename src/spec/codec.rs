//! Transform spec representation and wire codec
//!
//! Wire layout: `checksum_byte || header_bits || packed_attr_values`.
//! The header is a fixed-order run of 1-bit flags. Body values follow in
//! header-declaration order, each at the next free bit offset — only set
//! flags contribute a value, so body offsets vary with the flag set and must
//! never be "simplified" to fixed per-field positions. The packed integer is
//! rendered through an even-length hex string zero-padded to at least 8
//! digits, giving a minimum body of 4 bytes.

use std::fmt;

use tracing::debug;

use super::bitfloat::PrecisionError;
use super::grammar;

/// Spec decoding failures
#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    /// Recomputed body checksum does not match the prefix byte
    Checksum,
    /// A ratio cannot be represented in the packed ratio word
    Precision { value: f64 },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::Checksum => write!(f, "spec bytes failed checksum verification"),
            SpecError::Precision { value } => {
                write!(f, "not enough precision to represent ratio {}", value)
            }
        }
    }
}

impl std::error::Error for SpecError {}

impl From<PrecisionError> for SpecError {
    fn from(err: PrecisionError) -> Self {
        SpecError::Precision { value: err.value }
    }
}

/// Wire code for an undefined/unset output format
pub const FORMAT_UNDEF: u32 = 0;

/// Output image format carried in the `image_fmt` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// The 3-bit wire code for this format
    pub fn code(self) -> u32 {
        match self {
            Self::Png => 1,
            Self::Jpeg => 2,
        }
    }

    /// Decode a wire code; unknown codes (including [`FORMAT_UNDEF`]) are None
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Png),
            2 => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// The named fields of the wire layout, in no particular order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecField {
    Crop,
    Scale,
    Resize,
    Width,
    Height,
    ImageFmt,
    FormatArg,
    CropRatio,
}

impl SpecField {
    /// Bit width of this field's body value, if it carries one
    fn attr_bits(self) -> Option<u32> {
        match self {
            SpecField::Height => Some(13),
            SpecField::Width => Some(13),
            SpecField::Scale => Some(10),
            SpecField::ImageFmt => Some(3),
            SpecField::FormatArg => Some(7),
            SpecField::CropRatio => Some(16),
            SpecField::Crop | SpecField::Resize => None,
        }
    }
}

/// Header layout version
///
/// The current layout carries the crop-ratio flag; the legacy layout predates
/// it and reads a 7-bit header. Legacy is a decode-side compatibility mode
/// only — encoding always emits the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutVersion {
    Legacy,
    #[default]
    Current,
}

impl LayoutVersion {
    /// Header fields in wire order; position defines both the header bit and
    /// the body packing order
    pub fn header_fields(&self) -> &'static [SpecField] {
        const CURRENT: [SpecField; 8] = [
            SpecField::Crop,
            SpecField::Scale,
            SpecField::Resize,
            SpecField::Width,
            SpecField::Height,
            SpecField::ImageFmt,
            SpecField::FormatArg,
            SpecField::CropRatio,
        ];
        const LEGACY: [SpecField; 7] = [
            SpecField::Crop,
            SpecField::Scale,
            SpecField::Resize,
            SpecField::Width,
            SpecField::Height,
            SpecField::ImageFmt,
            SpecField::FormatArg,
        ];
        match self {
            LayoutVersion::Current => &CURRENT,
            LayoutVersion::Legacy => &LEGACY,
        }
    }

    /// Header width in bits (one bit per field)
    pub fn header_len(&self) -> u32 {
        self.header_fields().len() as u32
    }
}

/// Presence flags, one per header field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecFlags {
    pub crop: bool,
    pub scale: bool,
    pub resize: bool,
    pub width: bool,
    pub height: bool,
    pub image_fmt: bool,
    pub format_arg: bool,
    pub crop_ratio: bool,
}

impl SpecFlags {
    fn get(&self, field: SpecField) -> bool {
        match field {
            SpecField::Crop => self.crop,
            SpecField::Scale => self.scale,
            SpecField::Resize => self.resize,
            SpecField::Width => self.width,
            SpecField::Height => self.height,
            SpecField::ImageFmt => self.image_fmt,
            SpecField::FormatArg => self.format_arg,
            SpecField::CropRatio => self.crop_ratio,
        }
    }

    fn set(&mut self, field: SpecField, value: bool) {
        match field {
            SpecField::Crop => self.crop = value,
            SpecField::Scale => self.scale = value,
            SpecField::Resize => self.resize = value,
            SpecField::Width => self.width = value,
            SpecField::Height => self.height = value,
            SpecField::ImageFmt => self.image_fmt = value,
            SpecField::FormatArg => self.format_arg = value,
            SpecField::CropRatio => self.crop_ratio = value,
        }
    }
}

/// Attribute values, present only when the matching flag is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecAttrs {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<u32>,
    pub image_fmt: Option<u32>,
    pub format_arg: Option<u32>,
    pub crop_ratio: Option<u32>,
}

impl SpecAttrs {
    fn get(&self, field: SpecField) -> Option<u32> {
        match field {
            SpecField::Width => self.width,
            SpecField::Height => self.height,
            SpecField::Scale => self.scale,
            SpecField::ImageFmt => self.image_fmt,
            SpecField::FormatArg => self.format_arg,
            SpecField::CropRatio => self.crop_ratio,
            SpecField::Crop | SpecField::Resize => None,
        }
    }

    fn set(&mut self, field: SpecField, value: u32) {
        match field {
            SpecField::Width => self.width = Some(value),
            SpecField::Height => self.height = Some(value),
            SpecField::Scale => self.scale = Some(value),
            SpecField::ImageFmt => self.image_fmt = Some(value),
            SpecField::FormatArg => self.format_arg = Some(value),
            SpecField::CropRatio => self.crop_ratio = Some(value),
            SpecField::Crop | SpecField::Resize => {}
        }
    }
}

/// The canonical, validated representation of one requested transform
///
/// Immutable after construction; the encoded wire bytes are computed once and
/// cached for the object's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSpec {
    flags: SpecFlags,
    attrs: SpecAttrs,
    encoded: Vec<u8>,
}

impl TransformSpec {
    pub fn new(flags: SpecFlags, attrs: SpecAttrs) -> Self {
        let encoded = encode(&flags, &attrs, LayoutVersion::Current);
        Self {
            flags,
            attrs,
            encoded,
        }
    }

    /// Parse a whitespace-separated transform string, e.g. `"320x240 jpg80"`
    ///
    /// Unmatched tokens are silently ignored. Fails only when a crop ratio
    /// cannot be represented in the ratio word.
    pub fn from_string(text: &str) -> Result<Self, SpecError> {
        let (flags, attrs) = grammar::parse(text)?;
        Ok(Self::new(flags, attrs))
    }

    /// Decode wire bytes produced by [`TransformSpec::encoded`]
    pub fn from_bytes(data: &[u8]) -> Result<Self, SpecError> {
        Self::from_bytes_with_layout(data, LayoutVersion::Current)
    }

    /// Decode wire bytes under an explicit header layout version
    pub fn from_bytes_with_layout(data: &[u8], layout: LayoutVersion) -> Result<Self, SpecError> {
        let (check, body) = match data.split_first() {
            Some(parts) => parts,
            None => return Err(SpecError::Checksum),
        };
        if checksum(body) != *check {
            debug!(body = %hex::encode(body), "spec checksum mismatch");
            return Err(SpecError::Checksum);
        }

        // Encoder output never exceeds 9 body bytes; anything wider than the
        // packed integer is forged or corrupt.
        if body.len() > 16 {
            return Err(SpecError::Checksum);
        }

        // Mirrors the packing rendering: the body is the big-endian hex form
        // of the packed integer.
        let packed =
            u128::from_str_radix(&hex::encode(body), 16).map_err(|_| SpecError::Checksum)?;

        let mut flags = SpecFlags::default();
        let mut attrs = SpecAttrs::default();
        let mut header_pos = 0u32;
        let mut body_pos = layout.header_len();
        for &field in layout.header_fields() {
            let set = (packed >> header_pos) & 1 == 1;
            flags.set(field, set);
            header_pos += 1;
            if set {
                if let Some(bits) = field.attr_bits() {
                    let mask = (1u128 << bits) - 1;
                    attrs.set(field, ((packed >> body_pos) & mask) as u32);
                    body_pos += bits;
                }
            }
        }

        Ok(Self::new(flags, attrs))
    }

    /// The cached wire bytes for this spec
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn flags(&self) -> &SpecFlags {
        &self.flags
    }

    pub fn attrs(&self) -> &SpecAttrs {
        &self.attrs
    }

    /// Attribute value for a field: the attribute when present, else the
    /// flag as 0/1 — so an unset field reads as 0 while a present-but-zero
    /// attribute stays distinguishable through the flag accessors.
    fn field_value(&self, field: SpecField) -> u32 {
        self.attrs
            .get(field)
            .unwrap_or(self.flags.get(field) as u32)
    }

    pub fn width(&self) -> u32 {
        self.field_value(SpecField::Width)
    }

    pub fn height(&self) -> u32 {
        self.field_value(SpecField::Height)
    }

    pub fn scale(&self) -> u32 {
        self.field_value(SpecField::Scale)
    }

    pub fn image_fmt(&self) -> u32 {
        self.field_value(SpecField::ImageFmt)
    }

    pub fn format_arg(&self) -> u32 {
        self.field_value(SpecField::FormatArg)
    }

    pub fn crop_ratio(&self) -> u32 {
        self.field_value(SpecField::CropRatio)
    }

    pub fn has_crop(&self) -> bool {
        self.flags.crop
    }

    pub fn has_scale(&self) -> bool {
        self.flags.scale
    }

    pub fn has_width(&self) -> bool {
        self.flags.width
    }

    pub fn has_height(&self) -> bool {
        self.flags.height
    }

    pub fn has_image_fmt(&self) -> bool {
        self.flags.image_fmt
    }

    pub fn has_format_arg(&self) -> bool {
        self.flags.format_arg
    }

    pub fn has_crop_ratio(&self) -> bool {
        self.flags.crop_ratio
    }

    /// The requested output format, when one is set and its code is known
    pub fn output_format(&self) -> Option<ImageFormat> {
        if self.flags.image_fmt {
            ImageFormat::from_code(self.image_fmt())
        } else {
            None
        }
    }
}

/// 1-byte additive checksum over the body bytes
fn checksum(body: &[u8]) -> u8 {
    (body.iter().map(|&b| b as u32).sum::<u32>() % 255) as u8
}

/// Saturate a value to `bits` wide — silent clamping, never an error
fn clamp_to_bits(value: u32, bits: u32) -> u32 {
    let max = (1u64 << bits) - 1;
    value.min(max as u32)
}

/// Pack flags and attrs into wire bytes under the given layout
pub(super) fn encode(flags: &SpecFlags, attrs: &SpecAttrs, layout: LayoutVersion) -> Vec<u8> {
    let mut packed: u128 = 0;
    let mut header_pos = 0u32;
    let mut body_pos = layout.header_len();
    for &field in layout.header_fields() {
        if flags.get(field) {
            packed |= 1u128 << header_pos;
            if let Some(bits) = field.attr_bits() {
                let value = clamp_to_bits(attrs.get(field).unwrap_or(0), bits);
                packed |= (value as u128) << body_pos;
                body_pos += bits;
            }
        }
        header_pos += 1;
    }

    // Hex rendering rule: zero-pad to at least 8 digits (4 bytes), then to
    // an even digit count, and read the digits back out big-endian.
    let significant_bits = 128 - packed.leading_zeros();
    let nibbles = ((significant_bits + 3) / 4).max(8);
    let n_bytes = ((nibbles + 1) / 2) as usize;
    let be = packed.to_be_bytes();
    let body = &be[be.len() - n_bytes..];

    let mut out = Vec::with_capacity(n_bytes + 1);
    out.push(checksum(body));
    out.extend_from_slice(body);
    out
}
