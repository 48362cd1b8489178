//! Decimal rounding helpers.

/// Round half away from zero to `places` decimal places. Negative `places`
/// rounds to tens, hundreds, and so on.
pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if places >= 0 {
        let factor = 10f64.powi(places);
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-places);
        (value / factor).round() * factor
    }
}

/// Number of digits after the decimal point in a published number (`"34.60"` has 2).
pub fn decimal_places(raw: &str) -> u32 {
    match raw.trim().split_once('.') {
        Some((_, frac)) => frac.chars().take_while(|c| c.is_ascii_digit()).count() as u32,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_positive_places() {
        assert_eq!(round_to(88.2300001, 2), 88.23);
        assert_eq!(round_to(41.17500000001, 3), 41.175);
        assert_eq!(round_to(25.5, 0), 26.0);
    }

    #[test]
    fn test_round_to_negative_places() {
        assert_eq!(round_to(1234.0, -2), 1200.0);
        assert_eq!(round_to(1250.0, -2), 1300.0);
    }

    #[test]
    fn test_round_to_non_finite() {
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places("10"), 0);
        assert_eq!(decimal_places("34.60"), 2);
        assert_eq!(decimal_places("-0.125"), 3);
        assert_eq!(decimal_places("1.5e3"), 1);
    }
}
