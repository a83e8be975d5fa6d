// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

/// Normalize a frame-rate literal into a `num/den` fraction string.
///
/// Integers map to `n/1`. Decimals keep their digits as the numerator over a
/// power of ten (`0.5` -> `5/10`, `29.97` -> `2997/100`). Anything else is
/// rejected with the offending text.
pub fn to_fraction(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty frame rate".to_string());
    }

    let (whole, decimals) = match value.split_once('.') {
        Some((whole, decimals)) => (whole, decimals),
        None => (value, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(decimals) || (whole.is_empty() && decimals.is_empty()) {
        return Err(format!("'{}' is not a numeric frame rate", value));
    }

    let digits = format!("{}{}", whole, decimals);
    let numerator: u64 = digits
        .parse()
        .map_err(|e| format!("'{}' is not a numeric frame rate: {}", value, e))?;
    let denominator = 10u64
        .checked_pow(decimals.len() as u32)
        .ok_or_else(|| format!("'{}' has too many decimal places", value))?;

    Ok(format!("{}/{}", numerator, denominator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_rate() {
        assert_eq!(to_fraction("30").as_deref(), Ok("30/1"));
    }

    #[test]
    fn test_decimal_rate() {
        assert_eq!(to_fraction("0.5").as_deref(), Ok("5/10"));
        assert_eq!(to_fraction("29.97").as_deref(), Ok("2997/100"));
    }

    #[test]
    fn test_non_numeric_rate_rejected() {
        assert!(to_fraction("fast").is_err());
        assert!(to_fraction("30/1").is_err());
        assert!(to_fraction("").is_err());
        assert!(to_fraction(".").is_err());
    }
}
