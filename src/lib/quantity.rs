//! Kubernetes resource quantity parsing.
//!
//! Quantities arrive as strings such as `250m`, `512Mi`, `1.5` or `1e3`.
//! Memory is converted to bytes and CPU to millicores, both rounded up.
//! Arithmetic is exact: the mantissa is kept as integer digits plus a count
//! of fractional digits, so `2.007` is 2007 millicores and never 2008.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use log::warn;

const BINARY_SUFFIXES: [(&str, i128); 6] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

/// Decimal SI suffixes as powers of ten
const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Parse a quantity string into base units, rounded up
pub fn parse_quantity(raw: &str) -> Option<i64> {
    parse_scaled(raw, 0)
}

/// Parse a quantity and express it in units of `10^-scale`, rounded up.
/// Values beyond the `i64` range saturate.
fn parse_scaled(raw: &str, scale: i32) -> Option<i64> {
    let (number, multiplier, exponent) = split_suffix(raw.trim())?;
    let (digits, fraction) = parse_mantissa(number)?;

    let value = digits.checked_mul(multiplier)?;
    let exponent = exponent.checked_add(scale)?.checked_sub(fraction)?;
    let value = shift_ceil(value, exponent)?;

    Some(i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX }))
}

/// Split off the suffix: the number, a binary multiplier and a power of ten
fn split_suffix(raw: &str) -> Option<(&str, i128, i32)> {
    if let Some((number, multiplier)) = BINARY_SUFFIXES
        .iter()
        .find_map(|(suffix, m)| raw.strip_suffix(suffix).map(|n| (n, *m)))
    {
        return Some((number, multiplier, 0));
    }
    if let Some((number, exponent)) = DECIMAL_SUFFIXES
        .iter()
        .find_map(|(suffix, e)| raw.strip_suffix(suffix).map(|n| (n, *e)))
    {
        return Some((number, 1, exponent));
    }

    // `1e3` / `1E-3` style exponent
    match raw.find(['e', 'E']) {
        Some(i) => Some((&raw[..i], 1, raw[i + 1..].parse().ok()?)),
        None => Some((raw, 1, 0)),
    }
}

/// Signed decimal number as `(digits, fractional digit count)`
fn parse_mantissa(number: &str) -> Option<(i128, i32)> {
    let (negative, number) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut digits: i128 = 0;
    for c in whole.chars().chain(fraction.chars()) {
        digits = digits
            .checked_mul(10)?
            .checked_add(i128::from(c.to_digit(10)?))?;
    }

    let fraction = i32::try_from(fraction.len()).ok()?;
    Some((if negative { -digits } else { digits }, fraction))
}

/// Multiply by `10^exponent`; for negative exponents divide, rounding up
/// only when a remainder is left
fn shift_ceil(value: i128, exponent: i32) -> Option<i128> {
    if value == 0 {
        return Some(0);
    }
    if exponent >= 0 {
        return value.checked_mul(10i128.checked_pow(exponent.unsigned_abs())?);
    }

    let Some(divisor) = 10i128.checked_pow(exponent.unsigned_abs()) else {
        // Smaller than any representable unit
        return Some(i128::from(value > 0));
    };
    let floor = value.div_euclid(divisor);
    Some(if value.rem_euclid(divisor) == 0 {
        floor
    } else {
        floor + 1
    })
}

/// Bytes of a memory quantity
pub fn memory_bytes(quantity: &Quantity) -> Option<i64> {
    convert(quantity, 0)
}

/// Millicores of a CPU quantity
pub fn cpu_millis(quantity: &Quantity) -> Option<i64> {
    convert(quantity, 3)
}

fn convert(quantity: &Quantity, scale: i32) -> Option<i64> {
    let value = parse_scaled(&quantity.0, scale);
    if value.is_none() {
        warn!("Ignoring unparsable quantity {:?}", quantity.0);
    }
    value
}
