//! Fixed-width integer helpers shared by the encoder, decoder, and parsers.

use std::convert::TryFrom;

/// Check that `value` fits in a `bits`-wide field, i.e. |value| < 2^bits.
/// Note the asymmetry: -2^bits is rejected while +2^bits - 1 is accepted.
pub fn fit_signed(value: i32, bits: u32) -> Option<i32> {
    if u64::from(value.unsigned_abs()) < (1u64 << bits) {
        Some(value)
    } else {
        None
    }
}

/// Sign-extend the low `bits` bits of `value` to 32 bits.
pub fn sign_extend(value: i32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (value << shift) >> shift
}

/// Zero-extend: mask `value` to its low `bits` bits.
pub fn zero_extend(value: i32, bits: u32) -> i32 {
    let mask = if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    };
    (value as u32 & mask) as i32
}

/// Parse exactly eight hex digits into a 32-bit word.
pub fn word_from_hex(hex: &str) -> Option<u32> {
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Format a 32-bit word as eight lowercase hex digits.
pub fn word_to_hex(word: u32) -> String {
    format!("{:08x}", word)
}

/// Parse a general integer literal: decimal with optional sign, `0x`/`0X`
/// hex, or leading-`0` octal.
pub fn parse_int(text: &str) -> Option<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };

    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

/// Whether the token is in integer form (`-?\d+`). Branch and jump operands
/// in this form are numeric targets; anything else is a label.
pub fn is_integer_form(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
