//! Geohash encoding and prefix range arithmetic.
//!
//! Mirrors the bit layout used by geofire-style stores so that planned
//! ranges line up with keys written by other clients.

use crate::model::record::Coordinate;

/// Geohash base-32 alphabet.
pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
/// Default stored key length.
pub const GEOHASH_PRECISION: usize = 10;
pub const BITS_PER_CHAR: u32 = 5;
/// Upper bound on query depth (22 characters).
pub const MAXIMUM_BITS_PRECISION: u32 = 22 * BITS_PER_CHAR;
/// Sorts after every base-32 character; closes open-ended prefix ranges.
pub const RANGE_END_SENTINEL: char = '~';

/// Encodes `location` as a geohash of `precision` characters.
pub fn geohash_for_location(location: Coordinate, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut hash_value = 0_usize;
    let mut bits = 0_u32;
    let mut even = true;

    while hash.len() < precision {
        let (value, range) = if even {
            (location.lng, &mut lng_range)
        } else {
            (location.lat, &mut lat_range)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value > mid {
            hash_value = (hash_value << 1) + 1;
            range.0 = mid;
        } else {
            hash_value <<= 1;
            range.1 = mid;
        }
        even = !even;

        if bits < BITS_PER_CHAR - 1 {
            bits += 1;
        } else {
            bits = 0;
            hash.push(char::from(BASE32[hash_value]));
            hash_value = 0;
        }
    }

    hash
}

/// Returns the inclusive `(start, end)` key range covering every geohash
/// that shares the first `bits` bits with `geohash`.
pub fn prefix_range(geohash: &str, bits: u32) -> (String, String) {
    let precision = bits.div_ceil(BITS_PER_CHAR) as usize;
    if geohash.len() < precision {
        return (geohash.to_string(), format!("{geohash}{RANGE_END_SENTINEL}"));
    }

    let prefix = &geohash[..precision];
    let base = &prefix[..precision - 1];
    let last_value = prefix
        .bytes()
        .last()
        .and_then(|last| BASE32.iter().position(|c| *c == last))
        .unwrap_or(0);
    let significant_bits = bits - (base.len() as u32 * BITS_PER_CHAR);
    let unused_bits = BITS_PER_CHAR - significant_bits;

    let start_value = (last_value >> unused_bits) << unused_bits;
    let end_value = start_value + (1 << unused_bits);
    let start = format!("{base}{}", char::from(BASE32[start_value]));
    if end_value > 31 {
        (start, format!("{base}{RANGE_END_SENTINEL}"))
    } else {
        (start, format!("{base}{}", char::from(BASE32[end_value])))
    }
}
