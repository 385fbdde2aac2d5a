//! Payload fields and their text rendering

use std::fmt::{self, Write};

use crate::vocab::PAYLOAD_DELIMITER;

/// Significant digits used for floating-point fields
pub const FLOAT_PRECISION: usize = 7;

/// One payload field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadField<'a> {
    Text(&'a str),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl fmt::Display for PayloadField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_significant(*v, FLOAT_PRECISION)),
        }
    }
}

impl<'a> From<&'a str> for PayloadField<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a String> for PayloadField<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(s.as_str())
    }
}

impl From<f64> for PayloadField<'_> {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for PayloadField<'_> {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<i32> for PayloadField<'_> {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for PayloadField<'_> {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u16> for PayloadField<'_> {
    fn from(v: u16) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u32> for PayloadField<'_> {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u64> for PayloadField<'_> {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

/// Append one field and its delimiter, counting it
///
/// The field count wraps at `u16::MAX` like the header's data length.
pub fn append_field<'a>(
    field: impl Into<PayloadField<'a>>,
    payload: &mut String,
    field_count: &mut u16,
) {
    // Writing into a String cannot fail
    let _ = write!(payload, "{}{}", field.into(), PAYLOAD_DELIMITER);
    *field_count = field_count.wrapping_add(1);
}

/// Render a float like a C++ output stream with `precision(p)`
///
/// Default (`%g`) notation: `p` significant digits, trailing zeros dropped,
/// scientific form when the decimal exponent is below -4 or at least `p`.
pub fn format_significant(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }
    if value == 0.0 {
        return String::from(if value.is_sign_negative() { "-0" } else { "0" });
    }

    let p = precision.max(1);
    // Rounds to p digits first, so the exponent already accounts for carry (9.9999999 -> 1e1)
    let sci = format!("{:.*e}", p - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return value.to_string();
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.unsigned_abs())
    } else {
        let decimals = (p as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Payload under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    text: String,
    len: u16,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field
    pub fn push<'a>(&mut self, field: impl Into<PayloadField<'a>>) -> &mut Self {
        append_field(field, &mut self.text, &mut self.len);
        self
    }

    /// Append a label followed by its value
    pub fn push_labeled<'a>(
        &mut self,
        label: &str,
        value: impl Into<PayloadField<'a>>,
    ) -> &mut Self {
        self.push(label);
        self.push(value)
    }

    /// Delimited payload text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of fields
    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reset for reuse
    pub fn clear(&mut self) {
        self.text.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_uses_seven_significant_digits() {
        assert_eq!(format_significant(12345.678901, 7), "12345.68");
        assert_eq!(format_significant(1234567.89, 7), "1234568");
        assert_eq!(format_significant(0.1, 7), "0.1");
        assert_eq!(format_significant(15.0, 7), "15");
        assert_eq!(format_significant(-2.5, 7), "-2.5");
    }

    #[test]
    fn test_float_switches_to_scientific() {
        assert_eq!(format_significant(12345678.9, 7), "1.234568e+07");
        assert_eq!(format_significant(0.00001234, 7), "1.234e-05");
        assert_eq!(format_significant(0.0001234, 7), "0.0001234");
        assert_eq!(format_significant(9999999.6, 7), "1e+07");
    }

    #[test]
    fn test_float_special_values() {
        assert_eq!(format_significant(0.0, 7), "0");
        assert_eq!(format_significant(f64::NAN, 7), "nan");
        assert_eq!(format_significant(f64::NEG_INFINITY, 7), "-inf");
    }

    #[test]
    fn test_append_field_adds_delimiter_and_counts() {
        let mut payload = String::new();
        let mut count = 0u16;
        append_field("LC", &mut payload, &mut count);
        append_field(3.25_f64, &mut payload, &mut count);
        append_field(42_u16, &mut payload, &mut count);
        append_field(-7_i32, &mut payload, &mut count);
        assert_eq!(payload, "LC,3.25,42,-7,");
        assert_eq!(count, 4);
    }

    #[test]
    fn test_field_count_wraps() {
        let mut payload = String::new();
        let mut count = u16::MAX;
        append_field("x", &mut payload, &mut count);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_payload_builder() {
        let mut payload = Payload::new();
        payload
            .push_labeled("TL", "2024-01-01_00-00-00-000000")
            .push_labeled("LC", 100.0_f64);
        assert_eq!(payload.as_str(), "TL,2024-01-01_00-00-00-000000,LC,100,");
        assert_eq!(payload.len(), 4);

        payload.clear();
        assert!(payload.is_empty());
        assert_eq!(payload.as_str(), "");
    }
}
