/// Output rounding
///
/// Report values are accumulated unrounded and only rounded when
/// serialized, so totals never compound per-line rounding error.
use crate::constants::{NATIVE_DECIMALS, TOKEN_AMOUNT_DECIMALS, TOKEN_USD_DECIMALS, USD_DECIMALS};
use serde::Serializer;

/// Round half away from zero to `decimals` places
///
/// The epsilon nudge keeps values like `0.000000005` (stored slightly below
/// the half) rounding up at 8 decimals.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    value.signum() * ((value.abs() + f64::EPSILON) * factor).round() / factor
}

pub fn native_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, NATIVE_DECIMALS))
}

pub fn usd<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, USD_DECIMALS))
}

pub fn token_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, TOKEN_AMOUNT_DECIMALS))
}

pub fn token_usd<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, TOKEN_USD_DECIMALS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(2.344, 2), 2.34);
        assert_eq!(round_to(-2.345, 2), -2.35);
        assert_eq!(round_to(15.0, 3), 15.0);
        assert_eq!(round_to(0.0, 8), 0.0);
    }

    #[test]
    fn test_dust_survives_eight_decimals() {
        assert_eq!(round_to(0.000000005 * 1.0, 8), 0.00000001);
        assert_ne!(round_to(0.000000005, 8), 0.0);
    }
}
