//! Numeric-literal detection and coercion for form values.
//!
//! Form inputs only ever produce strings. Values that *start* like a base-10
//! integer are sent as JSON numbers instead. The rule is deliberately loose:
//! leading whitespace is skipped and anything after the digits is ignored,
//! so `"42abc"` becomes `42`.
//!
//! ## Decimal truncation
//!
//! Under the default [`NumberCoercion::LeadingInteger`] mode a decimal such as
//! `"3.14"` is sent as `3`. Servers written against the existing wire format
//! may rely on integer-only fields, so truncation is kept. Deployments that
//! need fractional values opt into [`NumberCoercion::LeadingDecimal`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// How numeric-looking parameter values are converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberCoercion {
    /// Leading base-10 integer; any fractional part is dropped.
    #[default]
    LeadingInteger,
    /// Leading decimal literal (fraction and exponent allowed).
    LeadingDecimal,
}

impl NumberCoercion {
    /// Converts a raw form value into the JSON value to send.
    pub fn coerce(self, value: &str) -> Value {
        let number = match self {
            NumberCoercion::LeadingInteger => leading_integer(value),
            NumberCoercion::LeadingDecimal => leading_decimal(value),
        };
        match number {
            Some(n) => Value::Number(n),
            None => Value::String(value.to_owned()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NumberCoercion::LeadingInteger => "leading-integer",
            NumberCoercion::LeadingDecimal => "leading-decimal",
        }
    }
}

impl fmt::Display for NumberCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberCoercion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leading-integer" => Ok(NumberCoercion::LeadingInteger),
            "leading-decimal" => Ok(NumberCoercion::LeadingDecimal),
            other => Err(format!(
                "unknown coercion '{other}' (expected leading-integer or leading-decimal)"
            )),
        }
    }
}

/// Returns `true` if `value` begins with a base-10 integer literal.
///
/// This is the predicate that decides whether a form value is sent as a
/// number. It does not validate the whole string: `"42abc"` and `"3.14"`
/// both qualify, while `""`, `"   "`, `"-"` and `"abc"` do not.
pub fn is_number(value: &str) -> bool {
    leading_integer(value).is_some()
}

/// Parses the leading base-10 integer of `value`.
///
/// Integers beyond the 64-bit range are carried as `f64`; a digit run too
/// long to be finite yields `None`.
pub fn leading_integer(value: &str) -> Option<Number> {
    let (negative, rest) = split_sign(value);
    let digits = digit_run(rest);
    if digits == 0 {
        return None;
    }
    integer_from_digits(negative, &rest[..digits])
}

/// Parses the leading decimal literal of `value`.
///
/// Integral results are emitted as JSON integers, everything else as `f64`.
pub fn leading_decimal(value: &str) -> Option<Number> {
    let (negative, rest) = split_sign(value);
    let int_len = digit_run(rest);
    let mut end = int_len;
    let mut frac_len = 0;

    if rest[end..].starts_with('.') {
        frac_len = digit_run(&rest[end + 1..]);
        end += 1 + frac_len;
    }
    if int_len == 0 && frac_len == 0 {
        return None;
    }
    if int_len > 0 && frac_len == 0 && end == int_len {
        // No fraction; an exponent may still follow.
        if exponent_len(&rest[end..]) == 0 {
            return integer_from_digits(negative, &rest[..int_len]);
        }
    }
    end += exponent_len(&rest[end..]);

    let literal = &rest[..end];
    let parsed: f64 = literal.parse().ok()?;
    let signed = if negative { -parsed } else { parsed };
    if !signed.is_finite() {
        return None;
    }
    if signed.fract() == 0.0 && signed.abs() < MAX_SAFE_INTEGER {
        // Exact: |signed| < 2^53.
        return Some(Number::from(signed as i64));
    }
    Number::from_f64(signed)
}

/// 2^53, the bound below which every integer is exact in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Skips leading whitespace and an optional sign.
fn split_sign(value: &str) -> (bool, &str) {
    let trimmed = value.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        (false, rest)
    } else {
        (false, trimmed)
    }
}

/// Length in bytes of the leading ASCII digit run.
fn digit_run(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Length of a well-formed exponent (`e`, optional sign, digits) at the start of `s`.
fn exponent_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'+' | b'-')));
    let digits = digit_run(&s[1 + sign..]);
    if digits == 0 {
        0
    } else {
        1 + sign + digits
    }
}

fn integer_from_digits(negative: bool, digits: &str) -> Option<Number> {
    let literal = if negative {
        format!("-{digits}")
    } else {
        digits.to_owned()
    };
    if let Ok(n) = literal.parse::<i64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = literal.parse::<u64>() {
        return Some(Number::from(n));
    }
    // Overflowing digit runs parse to infinity, which from_f64 rejects.
    let wide: f64 = literal.parse().ok()?;
    Number::from_f64(wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int(value: &str) -> Option<i64> {
        leading_integer(value).and_then(|n| n.as_i64())
    }

    #[test]
    fn plain_integers() {
        assert_eq!(int("10"), Some(10));
        assert_eq!(int("007"), Some(7));
        assert_eq!(int("-15"), Some(-15));
        assert_eq!(int("+4"), Some(4));
        assert_eq!(int("-0"), Some(0));
    }

    #[test]
    fn trailing_content_is_ignored() {
        assert_eq!(int("42abc"), Some(42));
        assert_eq!(int("  12 "), Some(12));
        assert_eq!(int("\t\n8px"), Some(8));
        assert_eq!(int("1e5"), Some(1));
        assert_eq!(int("0x1F"), Some(0));
    }

    // Compatibility case: decimals are truncated, not rounded.
    #[test]
    fn decimals_truncate_under_default_mode() {
        assert_eq!(int("3.14"), Some(3));
        assert_eq!(int("99.5"), Some(99));
        assert_eq!(int("-2.9"), Some(-2));
        assert_eq!(NumberCoercion::default().coerce("3.14"), json!(3));
    }

    #[test]
    fn non_numbers() {
        for value in ["", "   ", "abc", "-", "+", ".5", "Infinity", "NaN", "− 3"] {
            assert!(!is_number(value), "{value:?} should not be a number");
        }
    }

    #[test]
    fn predicate_matches_coercion() {
        for value in ["1", "x1", " 7 days", "", "3.14"] {
            assert_eq!(
                is_number(value),
                NumberCoercion::LeadingInteger.coerce(value).is_number(),
                "{value:?}"
            );
        }
    }

    #[test]
    fn wide_integers_fall_back_to_float() {
        assert_eq!(leading_integer("18446744073709551615").and_then(|n| n.as_u64()), Some(u64::MAX));
        let wide = leading_integer("100000000000000000000").unwrap();
        assert_eq!(wide.as_f64(), Some(1e20));
        assert!(leading_integer(&"9".repeat(400)).is_none());
    }

    #[test]
    fn decimal_mode_keeps_fractions() {
        let mode = NumberCoercion::LeadingDecimal;
        assert_eq!(mode.coerce("99.5"), json!(99.5));
        assert_eq!(mode.coerce("-0.25kg"), json!(-0.25));
        assert_eq!(mode.coerce(".5"), json!(0.5));
        assert_eq!(mode.coerce("2.0"), json!(2));
        assert_eq!(mode.coerce("1e3"), json!(1000));
        assert_eq!(mode.coerce("1e"), json!(1));
        assert_eq!(mode.coerce("12"), json!(12));
        assert_eq!(mode.coerce("abc"), json!("abc"));
        assert_eq!(mode.coerce("."), json!("."));
    }

    #[test]
    fn coercion_names_round_trip_through_from_str() {
        for mode in [NumberCoercion::LeadingInteger, NumberCoercion::LeadingDecimal] {
            assert_eq!(mode.to_string().parse::<NumberCoercion>(), Ok(mode));
        }
        assert!("float".parse::<NumberCoercion>().is_err());
    }
}
