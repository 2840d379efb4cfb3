//! # Tolerances
//!
//! Feasibility-tolerance aware comparison predicates. Every comparison the engine makes that
//! decides feasibility, redundancy or integrality goes through this struct, so that the same
//! engine code is numerically safe for floats and exact for rationals (where the tolerances are
//! represented exactly as well).
use crate::data::number_types::traits::Real;

/// Tolerance-aware numeric predicates.
///
/// Two tolerances are distinguished: `feastol` is the feasibility tolerance used for all decisions
/// that relax or reject problem state, `epsilon` is the much smaller tolerance used to recognize
/// values that are zero for numerical purposes. `hugeval` is the magnitude beyond which a finite
/// bound no longer constrains row activities.
#[derive(Clone, Debug)]
pub struct Tolerances<R> {
    feastol: R,
    epsilon: R,
    hugeval: R,
}

impl<R: Real> Default for Tolerances<R> {
    fn default() -> Self {
        Self::new(1e-6, 1e-9, 1e8)
    }
}

impl<R: Real> Tolerances<R> {
    pub fn new(feastol: f64, epsilon: f64, hugeval: f64) -> Self {
        debug_assert!(0.0 < epsilon && epsilon < feastol && feastol < hugeval);

        Self {
            feastol: R::from_f64(feastol),
            epsilon: R::from_f64(epsilon),
            hugeval: R::from_f64(hugeval),
        }
    }

    pub fn feas_tol(&self) -> &R {
        &self.feastol
    }

    pub fn epsilon(&self) -> &R {
        &self.epsilon
    }

    /// Whether `a < b` by more than the feasibility tolerance.
    pub fn is_feas_lt(&self, a: &R, b: &R) -> bool {
        b.clone() - a.clone() > self.feastol
    }

    /// Whether `a > b` by more than the feasibility tolerance.
    pub fn is_feas_gt(&self, a: &R, b: &R) -> bool {
        a.clone() - b.clone() > self.feastol
    }

    /// Whether `a <= b` up to the feasibility tolerance.
    pub fn is_feas_le(&self, a: &R, b: &R) -> bool {
        !self.is_feas_gt(a, b)
    }

    /// Whether `a >= b` up to the feasibility tolerance.
    pub fn is_feas_ge(&self, a: &R, b: &R) -> bool {
        !self.is_feas_lt(a, b)
    }

    pub fn is_feas_eq(&self, a: &R, b: &R) -> bool {
        (a.clone() - b.clone()).abs() <= self.feastol
    }

    /// Whether `a` and `b` are equal up to `epsilon`.
    pub fn is_eq(&self, a: &R, b: &R) -> bool {
        (a.clone() - b.clone()).abs() <= self.epsilon
    }

    /// Whether `value` is zero up to `epsilon`.
    pub fn is_zero(&self, value: &R) -> bool {
        value.abs() <= self.epsilon
    }

    /// Whether the magnitude of a finite value is too large to constrain activities.
    pub fn is_huge(&self, value: &R) -> bool {
        value.abs() >= self.hugeval
    }

    /// The smallest integral value not feasibly below `value`.
    pub fn feas_ceil(&self, value: &R) -> R {
        (value.clone() - self.feastol.clone()).ceil()
    }

    /// The largest integral value not feasibly above `value`.
    pub fn feas_floor(&self, value: &R) -> R {
        (value.clone() + self.feastol.clone()).floor()
    }

    pub fn is_feas_integral(&self, value: &R) -> bool {
        (value.clone() - value.round()).abs() <= self.feastol
    }
}

#[cfg(test)]
mod test {
    use num::BigRational;
    use twofloat::TwoFloat;

    use crate::data::number_types::tolerances::Tolerances;
    use crate::data::number_types::traits::Real;

    fn predicates<R: Real>() {
        let num = Tolerances::<R>::default();

        assert!(num.is_feas_lt(&R::zero(), &R::one()));
        assert!(!num.is_feas_lt(&R::zero(), &R::from_f64(1e-8)));
        assert!(num.is_feas_ge(&R::zero(), &R::from_f64(1e-8)));
        assert!(num.is_feas_eq(&R::from_f64(3.0), &R::from_f64(3.0 + 1e-7)));
        assert!(!num.is_eq(&R::from_f64(3.0), &R::from_f64(3.0 + 1e-7)));

        assert!(num.is_zero(&R::from_f64(1e-10)));
        assert!(!num.is_zero(&R::from_f64(1e-8)));

        assert!(num.is_huge(&R::from_f64(1e9)));
        assert!(num.is_huge(&R::from_f64(-1e9)));
        assert!(!num.is_huge(&R::from_f64(1e7)));
    }

    fn rounding<R: Real>() {
        let num = Tolerances::<R>::default();

        assert_eq!(num.feas_ceil(&R::from_f64(1.4)), R::from_f64(2.0));
        // Within the tolerance of an integer, rounding snaps instead of moving a full unit.
        assert_eq!(num.feas_ceil(&R::from_f64(2.0 + 1e-9)), R::from_f64(2.0));
        assert_eq!(num.feas_floor(&R::from_f64(5.7)), R::from_f64(5.0));
        assert_eq!(num.feas_floor(&R::from_f64(5.0 - 1e-9)), R::from_f64(5.0));

        assert!(num.is_feas_integral(&R::from_f64(3.0 + 1e-8)));
        assert!(!num.is_feas_integral(&R::from_f64(3.5)));
    }

    #[test]
    fn predicates_all_types() {
        predicates::<f64>();
        predicates::<TwoFloat>();
        predicates::<BigRational>();
    }

    #[test]
    fn rounding_all_types() {
        rounding::<f64>();
        rounding::<TwoFloat>();
        rounding::<BigRational>();
    }
}
