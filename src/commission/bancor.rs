// Bancor - Bonding-curve sale formulas
//
// Fixed-point integer math at 18 digits. Rational powers are computed as an
// integer power followed by a Newton root on BigUint, so the result is the
// same on every replica.

use crate::types::{div_ceil, Amount};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

const PRECISION_DIGITS: u32 = 18;

fn scale() -> BigUint {
    BigUint::from(10u32).pow(PRECISION_DIGITS)
}

/// `value * (num / den) ^ (exp_num / exp_den)`, rounded down
pub fn pow_ratio(value: &Amount, num: &Amount, den: &Amount, exp_num: u32, exp_den: u32) -> Amount {
    if den.is_zero() || exp_den == 0 {
        return BigUint::zero();
    }
    let g = exp_num.gcd(&exp_den);
    let (p, q) = (exp_num / g, exp_den / g);
    let s = scale();

    let ratio = num * &s / den;
    let mut power = s.clone();
    for _ in 0..p {
        power = power * &ratio / &s;
    }
    let root = if q == 1 {
        power
    } else {
        (power * s.pow(q - 1)).nth_root(q)
    };
    value * root / s
}

/// Coins to sell so that the reserve pays out `want_reserve`
pub fn calculate_sale_amount(supply: &Amount, reserve: &Amount, crr: u32, want_reserve: &Amount) -> Option<Amount> {
    if want_reserve > reserve || reserve.is_zero() || crr == 0 {
        return None;
    }
    if want_reserve == reserve {
        return Some(supply.clone());
    }
    if crr == 100 {
        return Some(div_ceil(&(want_reserve * supply), reserve));
    }
    let left = pow_ratio(supply, &(reserve - want_reserve), reserve, crr, 100);
    Some(supply - left.min(supply.clone()))
}

/// Reserve paid out for selling `amount` coins. The subtracted term is
/// rounded up so the seller never receives more than the curve allows.
pub fn calculate_sale_return(supply: &Amount, reserve: &Amount, crr: u32, amount: &Amount) -> Option<Amount> {
    if amount > supply || supply.is_zero() || crr == 0 {
        return None;
    }
    if amount == supply {
        return Some(reserve.clone());
    }
    if crr == 100 {
        return Some(amount * reserve / supply);
    }
    let left = pow_ratio(reserve, &(supply - amount), supply, 100, crr) + BigUint::one();
    Some(reserve - left.min(reserve.clone()))
}
