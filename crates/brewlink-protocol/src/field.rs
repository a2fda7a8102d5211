//! Permissive numeric decoding for status payload tokens.
//!
//! The controller's firmware occasionally emits tokens with trailing units or
//! noise (`"93.5C"`, `"12 "`). A token is decoded from its longest leading
//! number and anything after it is ignored. A token without a leading number
//! decodes to `0` so a single bad slot never discards a whole frame.
//!
//! ```
//! use brewlink_protocol::field::{parse_float, parse_int};
//!
//! assert_eq!(parse_int("12abc"), 12);
//! assert_eq!(parse_int("1.5"), 1);
//! assert_eq!(parse_float("1.5x"), 1.5);
//! assert_eq!(parse_float("abc"), 0.0);
//! ```

/// Decode an integer slot.
///
/// Accepts an optional sign followed by decimal digits. Values beyond the
/// `i64` range saturate.
#[must_use]
pub fn parse_int(token: &str) -> i64 {
    let token = token.trim();
    let bytes = token.as_bytes();

    let (negative, digits_start) = match bytes.first() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for &byte in &bytes[digits_start..] {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        let digit = i64::from(byte - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }

    if seen_digit { value } else { 0 }
}

/// Decode a float slot.
///
/// Accepts `[+-]digits[.digits][(e|E)[+-]digits]` (either side of the point
/// may be empty, not both). Non-finite results decode to `0.0`.
#[must_use]
pub fn parse_float(token: &str) -> f64 {
    let token = token.trim();
    let end = float_prefix_len(token.as_bytes());
    if end == 0 {
        return 0.0;
    }

    match token[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Length of the longest leading decimal-number prefix, `0` if none.
fn float_prefix_len(bytes: &[u8]) -> usize {
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        frac_digits = count_digits(&bytes[pos + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            pos += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp.min(bytes.len())..]);
        if exp_digits > 0 {
            pos = exp + exp_digits;
        }
    }

    pos
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("42", 42)]
    #[case("  42  ", 42)]
    #[case("-7", -7)]
    #[case("+7", 7)]
    #[case("12abc", 12)]
    #[case("1.5", 1)]
    #[case("", 0)]
    #[case("abc", 0)]
    #[case("-", 0)]
    #[case("--1", 0)]
    #[case("99999999999999999999999", i64::MAX)]
    #[case("-99999999999999999999999", i64::MIN)]
    fn test_parse_int(#[case] token: &str, #[case] expected: i64) {
        assert_eq!(parse_int(token), expected);
    }

    #[rstest]
    #[case("0", 0.0)]
    #[case("93.5", 93.5)]
    #[case("93.5C", 93.5)]
    #[case("-1.25", -1.25)]
    #[case(".5", 0.5)]
    #[case("5.", 5.0)]
    #[case("1e3", 1000.0)]
    #[case("1e", 1.0)]
    #[case("1e+", 1.0)]
    #[case("2.5E-1x", 0.25)]
    #[case("1.2.3", 1.2)]
    #[case(".", 0.0)]
    #[case("", 0.0)]
    #[case("NaN", 0.0)]
    #[case("Infinity", 0.0)]
    #[case("1e999", 0.0)]
    fn test_parse_float(#[case] token: &str, #[case] expected: f64) {
        assert_eq!(parse_float(token), expected);
    }
}
