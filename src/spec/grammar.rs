//! Token grammar for transform strings
//!
//! A transform string is a whitespace-separated list of tokens, each matched
//! independently against a fixed, ordered list of anchored patterns. Tokens
//! that match nothing are silently ignored; later matches overwrite earlier
//! ones. `resize` and `crop` both populate width and height as a side effect,
//! which is why `resize` never needs a header flag of its own.

use std::sync::OnceLock;

use regex::Regex;

use super::bitfloat;
use super::codec::{ImageFormat, SpecAttrs, SpecError, SpecFlags};

#[derive(Debug, Clone, Copy)]
enum TokenRule {
    FormatJpeg,
    FormatPng,
    Crop,
    Scale,
    Resize,
    Width,
    Height,
    CropRatio,
}

/// Pattern order is part of the grammar: a token is applied once per rule it
/// matches, in this order.
const TOKEN_PATTERNS: &[(TokenRule, &str)] = &[
    (TokenRule::FormatJpeg, r"^jpe?g(\d*)$"),
    (TokenRule::FormatPng, r"^png([Oo])?$"),
    (TokenRule::Crop, r"^(\d+)x(\d+),[Cc]$"),
    (TokenRule::Scale, r"^(\d+(?:\.\d*)?)%$"),
    (TokenRule::Resize, r"^(\d+)x(\d+)$"),
    (TokenRule::Width, r"^(\d+)x$"),
    (TokenRule::Height, r"^x(\d+)$"),
    (TokenRule::CropRatio, r"^[Cc](\d+):(\d+)$"),
];

fn compiled_patterns() -> &'static [(TokenRule, Regex)] {
    static PATTERNS: OnceLock<Vec<(TokenRule, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TOKEN_PATTERNS
            .iter()
            .map(|&(rule, pattern)| {
                (
                    rule,
                    Regex::new(pattern).expect("token pattern is static and must compile"),
                )
            })
            .collect()
    })
}

/// Parse a transform string into flags and attrs
pub(super) fn parse(filter_string: &str) -> Result<(SpecFlags, SpecAttrs), SpecError> {
    let tokens: Vec<&str> = filter_string.split_whitespace().collect();
    let mut flags = SpecFlags::default();
    let mut attrs = SpecAttrs::default();

    for (rule, pattern) in compiled_patterns() {
        for token in &tokens {
            if let Some(caps) = pattern.captures(token) {
                apply(*rule, &caps, &mut flags, &mut attrs)?;
            }
        }
    }

    Ok((flags, attrs))
}

fn apply(
    rule: TokenRule,
    caps: &regex::Captures<'_>,
    flags: &mut SpecFlags,
    attrs: &mut SpecAttrs,
) -> Result<(), SpecError> {
    match rule {
        TokenRule::Width => {
            flags.width = true;
            attrs.width = Some(parse_dim(&caps[1]));
        }
        TokenRule::Height => {
            flags.height = true;
            attrs.height = Some(parse_dim(&caps[1]));
        }
        TokenRule::Resize => {
            flags.width = true;
            flags.height = true;
            attrs.width = Some(parse_dim(&caps[1]));
            attrs.height = Some(parse_dim(&caps[2]));
        }
        TokenRule::Crop => {
            flags.crop = true;
            flags.width = true;
            flags.height = true;
            attrs.width = Some(parse_dim(&caps[1]));
            attrs.height = Some(parse_dim(&caps[2]));
        }
        TokenRule::FormatJpeg => {
            flags.image_fmt = true;
            attrs.image_fmt = Some(ImageFormat::Jpeg.code());
            if let Some(quality) = caps.get(1) {
                if !quality.as_str().is_empty() {
                    flags.format_arg = true;
                    attrs.format_arg = Some(parse_dim(quality.as_str()));
                }
            }
        }
        TokenRule::FormatPng => {
            flags.image_fmt = true;
            attrs.image_fmt = Some(ImageFormat::Png.code());
            if caps.get(1).is_some() {
                flags.format_arg = true;
                attrs.format_arg = Some(1);
            }
        }
        TokenRule::Scale => {
            flags.scale = true;
            // Fractional percents truncate; the attribute is a whole percent.
            let percent: f64 = caps[1].parse().unwrap_or(0.0);
            attrs.scale = Some(percent as u32);
        }
        TokenRule::CropRatio => {
            let numerator: f64 = caps[1].parse().unwrap_or(0.0);
            let denominator: f64 = caps[2].parse().unwrap_or(0.0);
            flags.crop_ratio = true;
            attrs.crop_ratio = Some(bitfloat::pack(numerator / denominator)? as u32);
        }
    }
    Ok(())
}

/// Parse a digit run, saturating on overflow — the encoder clamps to field
/// width anyway, so oversized literals are indistinguishable on the wire.
fn parse_dim(digits: &str) -> u32 {
    digits.parse::<u32>().unwrap_or(u32::MAX)
}
