//! Integer arithmetic helpers with PL/0's specific rounding rules.

/// Integer division rounding toward negative infinity, as required by
/// spec.md §4.D ("`DIV` is integer division rounding toward negative
/// infinity"). Rust's `/` truncates toward zero, so `-7 / 2 == -3`, not
/// the `-4` PL/0 requires; this corrects for that.
pub fn floor_div(lhs: i64, rhs: i64) -> i64 {
    let q = lhs / rhs;
    let r = lhs % rhs;
    if r != 0 && (r < 0) != (rhs < 0) {
        q - 1
    } else {
        q
    }
}

/// `v mod 2`, normalized to `{0, 1}` regardless of the sign of `v` — used
/// by the `ODD` operation, where `1` means "odd" and `0` means "even".
pub fn odd(v: i64) -> i64 {
    v.rem_euclid(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
        assert_eq!(floor_div(6, 3), 2);
    }

    #[test]
    fn odd_is_always_zero_or_one() {
        assert_eq!(odd(7), 1);
        assert_eq!(odd(6), 0);
        assert_eq!(odd(-3), 1);
        assert_eq!(odd(-4), 0);
    }
}
