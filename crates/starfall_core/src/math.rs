//! Fixed-point math utilities for deterministic simulation.
//!
//! Market prices, demand modifiers and distances use fixed-point
//! arithmetic so that two simulations fed the same seed and commands
//! stay bit-identical across platforms.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for maps of fixed-point values keyed by string.
pub mod fixed_map_serde {
    use std::collections::BTreeMap;

    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize each value as its raw bit representation.
    pub fn serialize<S>(value: &BTreeMap<String, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bits: BTreeMap<&String, i64> = value.iter().map(|(k, v)| (k, v.to_bits())).collect();
        bits.serialize(serializer)
    }

    /// Deserialize each value from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = BTreeMap::<String, i64>::deserialize(deserializer)?;
        Ok(bits
            .into_iter()
            .map(|(k, v)| (k, Fixed::from_bits(v)))
            .collect())
    }
}

/// Clamp a value between a minimum and maximum.
///
/// Unlike [`Ord::clamp`] this never panics: when `min > max` the
/// minimum wins, matching `max(min, min(value, max))`.
#[must_use]
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    let upper = if value < max { value } else { max };
    if upper > min {
        upper
    } else {
        min
    }
}

/// Euclidean distance between two points in 2D space.
#[must_use]
pub fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> Fixed {
    let dx = Fixed::from_num(x2) - Fixed::from_num(x1);
    let dy = Fixed::from_num(y2) - Fixed::from_num(y1);
    fixed_sqrt(dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)))
}

/// π as a simulation fixed-point value.
#[must_use]
pub fn pi() -> Fixed {
    Fixed::from_num(fixed::consts::PI)
}

/// Convert degrees to radians.
#[must_use]
pub fn degrees_to_radians(degrees: Fixed) -> Fixed {
    degrees * pi() / Fixed::from_num(180)
}

/// Convert radians to degrees.
#[must_use]
pub fn radians_to_degrees(radians: Fixed) -> Fixed {
    radians * Fixed::from_num(180) / pi()
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}
