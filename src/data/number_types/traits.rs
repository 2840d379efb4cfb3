//! # Traits
//!
//! A single trait describes the scalars the engine can work with. The contract is weaker than a
//! mathematical ordered field: only a partial order is required, because IEEE floats don't provide
//! a total one, and all comparisons that carry meaning for presolving go through the
//! tolerance-aware predicates in the sibling module.
use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num::{BigRational, Signed, ToPrimitive, Zero};
use twofloat::TwoFloat;

/// Scalar type the presolve engine computes with.
///
/// Implementations exist for `f64`, for the double-double type `twofloat::TwoFloat` and for the
/// exact rational `num::BigRational`. All operations are total except `from_f64`, which requires a
/// finite argument; it is only ever called with tolerance constants and problem data, both of
/// which are finite by construction.
pub trait Real:
    Clone
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
{
    fn zero() -> Self;

    fn one() -> Self;

    /// Convert a finite `f64` into this type.
    ///
    /// For the rational implementation the conversion is exact.
    fn from_f64(value: f64) -> Self;

    /// Approximate this value as an `f64`, for diagnostics.
    fn to_f64(&self) -> f64;

    fn abs(&self) -> Self;

    fn floor(&self) -> Self;

    fn ceil(&self) -> Self;

    /// The nearest integral value, rounding half-way cases up.
    fn round(&self) -> Self {
        (self.clone() + Self::from_f64(0.5)).floor()
    }
}

impl Real for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_f64(value: f64) -> Self {
        debug_assert!(value.is_finite());

        value
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    fn floor(&self) -> Self {
        f64::floor(*self)
    }

    fn ceil(&self) -> Self {
        f64::ceil(*self)
    }
}

impl Real for TwoFloat {
    fn zero() -> Self {
        TwoFloat::from(0.0)
    }

    fn one() -> Self {
        TwoFloat::from(1.0)
    }

    fn from_f64(value: f64) -> Self {
        debug_assert!(value.is_finite());

        TwoFloat::from(value)
    }

    fn to_f64(&self) -> f64 {
        self.hi()
    }

    fn abs(&self) -> Self {
        (*self).abs()
    }

    fn floor(&self) -> Self {
        (*self).floor()
    }

    fn ceil(&self) -> Self {
        (*self).ceil()
    }
}

impl Real for BigRational {
    fn zero() -> Self {
        <BigRational as Zero>::zero()
    }

    fn one() -> Self {
        <BigRational as num::One>::one()
    }

    fn from_f64(value: f64) -> Self {
        // Finite doubles are exactly representable as rationals.
        BigRational::from_float(value).expect("value should be finite")
    }

    fn to_f64(&self) -> f64 {
        ToPrimitive::to_f64(self).unwrap_or_else(|| {
            if self.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        })
    }

    fn abs(&self) -> Self {
        Signed::abs(self)
    }

    fn floor(&self) -> Self {
        BigRational::floor(self)
    }

    fn ceil(&self) -> Self {
        BigRational::ceil(self)
    }
}

#[cfg(test)]
mod test {
    use num::BigRational;
    use twofloat::TwoFloat;

    use crate::data::number_types::traits::Real;

    fn rounding<R: Real>() {
        assert_eq!(R::from_f64(1.25).floor(), R::one());
        assert_eq!(R::from_f64(1.25).ceil(), R::from_f64(2.0));
        assert_eq!(R::from_f64(-1.5).floor(), R::from_f64(-2.0));
        assert_eq!(R::from_f64(2.5).round(), R::from_f64(3.0));
        assert_eq!(R::from_f64(-0.25).abs(), R::from_f64(0.25));
    }

    #[test]
    fn rounding_all_types() {
        rounding::<f64>();
        rounding::<TwoFloat>();
        rounding::<BigRational>();
    }

    #[test]
    fn exact_rational_conversion() {
        let value = <BigRational as Real>::from_f64(0.1);
        // 0.1 is not representable in binary; the conversion preserves the represented value.
        assert_eq!(value.to_f64(), 0.1);
        assert_ne!(value, BigRational::new(1.into(), 10.into()));
    }
}
