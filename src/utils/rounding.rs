// src/utils/rounding.rs

/// Integer division with round-half-up, on non-negative operands.
///
/// Computed on exact integers rather than floats so that half values always
/// round up (12.5 -> 13), matching the reference score vectors.
pub fn round_half_up(numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

/// Rounded percentage of `part` out of `whole`. Zero when `whole` is zero.
pub fn percent_of(part: i64, whole: i64) -> i32 {
    round_half_up(part * 100, whole) as i32
}
