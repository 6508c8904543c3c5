//! Deterministic string-to-colour hashing.
//!
//! Every sphere gets its tint by hashing a palette entry (the literal string, e.g. `"#69d2e7"`)
//! and keeping the lower 24 bits of the hash as an RGB triple.

use anyhow::{Context, bail};

/// Polynomial string hash with multiplier 31 and wrapping 32-bit signed arithmetic.
///
/// Iterates over UTF-16 code units so non-BMP characters hash as their surrogate pairs.
pub fn hash_code(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Lower 24 bits of `i` as a zero-padded, upper case hex string.
pub fn int_to_rgb(i: i32) -> String {
    format!("{:06X}", i & 0x00FF_FFFF)
}

/// `int_to_rgb(hash_code(s))`
pub fn color_of(s: &str) -> String {
    int_to_rgb(hash_code(s))
}

/// Parse `#RRGGBB` or `RRGGBB` into its three bytes.
pub fn parse_hex(hex: &str) -> anyhow::Result<[u8; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("expected six hex digits, got {:?}", hex);
    }
    let value = u32::from_str_radix(digits, 16)
        .with_context(|| format!("{:?} is not a hex colour", hex))?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

/// Unpack a `0xRRGGBB` integer.
pub fn rgb_from_u32(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// Convert sRGB bytes into linear floats as expected by an sRGB render target.
pub fn srgb_to_linear(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    })
}
