//! Range-unit mismatch detection: catches the common case where one file is
//! in yards and the other in nautical miles (ratio ~1852), which otherwise
//! presents as a wall of spurious critical differences on every row.

/// Nautical-mile-to-yard ratio the detector checks for, in either direction.
const NAUTICAL_MILE_RATIO: f64 = 1852.0;
const RATIO_TOLERANCE: f64 = 0.01;

/// Compare the first column's first-line values from each file and report
/// whether they look like a unit mismatch rather than a genuine difference.
pub fn detect(first_value1: f64, first_value2: f64, zero: f64) -> bool {
    let a = first_value1.abs();
    let b = first_value2.abs();
    if a.min(b) <= zero || b == 0.0 {
        return false;
    }

    let ratio = a / b;
    let direct = (ratio - NAUTICAL_MILE_RATIO).abs() / NAUTICAL_MILE_RATIO;
    let inverse = (1.0 / ratio - NAUTICAL_MILE_RATIO).abs() / NAUTICAL_MILE_RATIO;

    direct < RATIO_TOLERANCE || inverse < RATIO_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_yards_to_nautical_miles() {
        assert!(detect(1852.0, 1.0, 1e-10));
        assert!(detect(1.0, 1852.0, 1e-10));
    }

    #[test]
    fn tolerates_small_rounding_noise_in_the_ratio() {
        assert!(detect(1850.5, 1.0, 1e-10));
    }

    #[test]
    fn does_not_flag_genuinely_close_values() {
        assert!(!detect(100.0, 100.1, 1e-10));
    }

    #[test]
    fn does_not_flag_values_at_or_below_the_zero_threshold() {
        assert!(!detect(0.0, 0.0, 1e-10));
        assert!(!detect(1e-12, 1852e-12, 1e-10));
    }
}
