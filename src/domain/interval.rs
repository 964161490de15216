//! The Interval domain (spec §4.2): integers extended with ±∞, plus an
//! `exclude_zero` refinement bit used by branch-condition narrowing.

use std::cmp::Ordering;
use std::fmt;

use crate::error::DomainError;

/// An integer extended with ±∞, ordered the expected way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtInt {
    /// Negative infinity.
    NegInf,
    /// A concrete `i64`.
    Finite(i64),
    /// Positive infinity.
    PosInf,
}

impl ExtInt {
    fn rank(self) -> i128 {
        match self {
            ExtInt::NegInf => i128::MIN,
            ExtInt::Finite(v) => v as i128,
            ExtInt::PosInf => i128::MAX,
        }
    }

    fn add(self, other: Self) -> Self {
        use ExtInt::*;
        match (self, other) {
            (NegInf, PosInf) | (PosInf, NegInf) => {
                // Not reachable for well-formed lo/hi endpoint arithmetic in
                // this domain (lo never exceeds hi across an add of two
                // non-bottom intervals), but defined for totality.
                Finite(0)
            }
            (NegInf, _) | (_, NegInf) => NegInf,
            (PosInf, _) | (_, PosInf) => PosInf,
            (Finite(a), Finite(b)) => Finite(a.saturating_add(b)),
        }
    }

    fn neg(self) -> Self {
        match self {
            ExtInt::NegInf => ExtInt::PosInf,
            ExtInt::PosInf => ExtInt::NegInf,
            ExtInt::Finite(v) => finite_neg(v),
        }
    }

    fn mul(self, other: Self) -> Self {
        use ExtInt::*;
        match (self, other) {
            (Finite(0), _) | (_, Finite(0)) => Finite(0),
            (Finite(a), Finite(b)) => Finite(a.saturating_mul(b)),
            _ => {
                let neg = self.is_negative_ish() ^ other.is_negative_ish();
                if neg {
                    NegInf
                } else {
                    PosInf
                }
            }
        }
    }

    fn is_negative_ish(self) -> bool {
        matches!(self, ExtInt::NegInf) || matches!(self, ExtInt::Finite(v) if v < 0)
    }

    fn div(self, other: Self) -> Self {
        use ExtInt::*;
        match (self, other) {
            (Finite(a), Finite(b)) if b != 0 => Finite(a / b),
            (Finite(0), _) => Finite(0),
            _ => {
                let neg = self.is_negative_ish() ^ other.is_negative_ish();
                if neg {
                    NegInf
                } else {
                    PosInf
                }
            }
        }
    }
}

fn finite_neg(v: i64) -> ExtInt {
    ExtInt::Finite(v.checked_neg().unwrap_or(i64::MAX))
}

impl PartialOrd for ExtInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}
impl Ord for ExtInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for ExtInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtInt::NegInf => write!(f, "-inf"),
            ExtInt::PosInf => write!(f, "+inf"),
            ExtInt::Finite(v) => write!(f, "{v}"),
        }
    }
}

/// An abstract integer value as a closed interval `[lo, hi]`, plus a bit
/// recording that zero — though inside the bounds — is provably excluded
/// (only meaningful when `lo <= 0 <= hi`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalValue {
    lo: ExtInt,
    hi: ExtInt,
    exclude_zero: bool,
}

impl IntervalValue {
    /// Construct, normalizing `lo > hi` to the canonical bottom and clearing
    /// `exclude_zero` whenever zero is already outside the range.
    pub fn new(lo: ExtInt, hi: ExtInt, exclude_zero: bool) -> Self {
        if lo > hi {
            return Self::bottom();
        }
        let straddles_zero = lo <= ExtInt::Finite(0) && ExtInt::Finite(0) <= hi;
        Self {
            lo,
            hi,
            exclude_zero: exclude_zero && straddles_zero,
        }
    }

    /// The singleton interval `[v, v]`.
    pub fn from_concrete(v: i64) -> Self {
        Self::new(ExtInt::Finite(v), ExtInt::Finite(v), false)
    }

    /// Canonical bottom: `lo = +inf, hi = -inf`.
    pub fn bottom() -> Self {
        Self {
            lo: ExtInt::PosInf,
            hi: ExtInt::NegInf,
            exclude_zero: false,
        }
    }

    /// Canonical top: `[-inf, +inf]`, zero not excluded.
    pub fn top() -> Self {
        Self {
            lo: ExtInt::NegInf,
            hi: ExtInt::PosInf,
            exclude_zero: false,
        }
    }

    /// Lower bound.
    pub fn lo(&self) -> ExtInt {
        self.lo
    }

    /// Upper bound.
    pub fn hi(&self) -> ExtInt {
        self.hi
    }

    /// `true` iff `exclude_zero` is currently meaningful and set.
    pub fn excludes_zero_flag(&self) -> bool {
        self.exclude_zero
    }

    /// `true` iff this is the canonical bottom.
    pub fn is_bottom(&self) -> bool {
        self.lo > self.hi
    }

    /// `true` iff this is `[-inf, +inf]` with zero not excluded.
    pub fn is_top(&self) -> bool {
        self.lo == ExtInt::NegInf && self.hi == ExtInt::PosInf && !self.exclude_zero
    }

    /// `true` iff `value` is a possible concretization.
    pub fn contains(&self, value: i64) -> bool {
        if self.is_bottom() {
            return false;
        }
        let v = ExtInt::Finite(value);
        let in_range = self.lo <= v && v <= self.hi;
        in_range && !(value == 0 && self.exclude_zero)
    }

    /// `true` iff zero is provably not a concretization.
    pub fn definitely_not_zero(&self) -> bool {
        if self.is_bottom() {
            return true;
        }
        self.lo > ExtInt::Finite(0) || self.hi < ExtInt::Finite(0) || self.exclude_zero
    }

    /// `true` iff zero is a possible concretization.
    pub fn possibly_zero(&self) -> bool {
        !self.is_bottom() && !self.definitely_not_zero()
    }

    /// `true` iff every concretization is exactly zero.
    pub fn is_definitely_zero(&self) -> bool {
        self.lo == ExtInt::Finite(0) && self.hi == ExtInt::Finite(0)
    }

    /// Partial order by inclusion of the represented concrete set.
    pub fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.lo <= self.lo && self.hi <= other.hi && (!other.exclude_zero || !self.contains(0))
    }

    /// Least upper bound.
    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self::new(
            self.lo.min(other.lo),
            self.hi.max(other.hi),
            self.exclude_zero && other.exclude_zero,
        )
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::new(
            self.lo.max(other.lo),
            self.hi.min(other.hi),
            self.exclude_zero || other.exclude_zero,
        )
    }

    /// Widen `self` (the old, stored state) against `other` (the freshly
    /// computed successor), using `constants` as snap-to anchors (spec
    /// §4.2). `constants` need not be sorted or deduplicated.
    pub fn widen(&self, other: &Self, constants: &[i64]) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }

        let mut anchors: Vec<ExtInt> = constants.iter().map(|&c| ExtInt::Finite(c)).collect();
        anchors.push(self.lo);
        anchors.push(self.hi);
        anchors.sort();
        anchors.dedup();

        let new_lo = if other.lo < self.lo {
            anchors
                .iter()
                .rev()
                .find(|&&c| c <= other.lo)
                .copied()
                .unwrap_or(ExtInt::NegInf)
        } else {
            self.lo
        };

        let new_hi = if other.hi > self.hi {
            anchors
                .iter()
                .find(|&&c| c >= other.hi)
                .copied()
                .unwrap_or(ExtInt::PosInf)
        } else {
            self.hi
        };

        Self::new(new_lo, new_hi, false)
    }

    /// Unary negation.
    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        Self::new(self.hi.neg(), self.lo.neg(), self.exclude_zero)
    }

    /// Abstract addition.
    pub fn add(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::new(self.lo.add(other.lo), self.hi.add(other.hi), false)
    }

    /// Abstract subtraction: `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Abstract multiplication, by min/max over the four endpoint products.
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let products = [
            self.lo.mul(other.lo),
            self.lo.mul(other.hi),
            self.hi.mul(other.lo),
            self.hi.mul(other.hi),
        ];
        let lo = *products.iter().min().unwrap();
        let hi = *products.iter().max().unwrap();
        Self::new(lo, hi, false)
    }

    /// Abstract division. Errors with [`DomainError::DefiniteDivideByZero`]
    /// when the divisor interval is exactly `[0, 0]`. A divisor interval
    /// that straddles zero with `exclude_zero` set returns top (sound but
    /// maximally imprecise, per spec); otherwise callers must ensure
    /// zero has already been excluded from `other` (e.g. by branch
    /// refinement) before calling this for the "only possibly zero" case,
    /// mirroring how the transfer function records a warning and then
    /// proceeds with a top result itself.
    pub fn div(&self, other: &Self) -> Result<Self, DomainError> {
        if self.is_bottom() || other.is_bottom() {
            return Ok(Self::bottom());
        }
        if other.is_definitely_zero() {
            return Err(DomainError::DefiniteDivideByZero);
        }
        if other.contains(0) {
            // Possible zero (refined away via `exclude_zero` or not): sound
            // over-approximation either way.
            return Ok(Self::top());
        }
        let quotients = [
            self.lo.div(other.lo),
            self.lo.div(other.hi),
            self.hi.div(other.lo),
            self.hi.div(other.hi),
        ];
        let lo = *quotients.iter().min().unwrap();
        let hi = *quotients.iter().max().unwrap();
        Ok(Self::new(lo, hi, false))
    }

    /// Abstract remainder, bounded by the divisor's magnitude and signed
    /// like the dividend (Java's truncating-remainder rule). Same
    /// divide-by-zero contract as [`IntervalValue::div`].
    pub fn rem(&self, other: &Self) -> Result<Self, DomainError> {
        if self.is_bottom() || other.is_bottom() {
            return Ok(Self::bottom());
        }
        if other.is_definitely_zero() {
            return Err(DomainError::DefiniteDivideByZero);
        }
        if other.contains(0) {
            return Ok(Self::top());
        }
        let abs = |v: ExtInt| match v {
            ExtInt::Finite(x) => ExtInt::Finite(x.unsigned_abs().min(i64::MAX as u64) as i64),
            _ => ExtInt::PosInf,
        };
        let bound = abs(other.lo).max(abs(other.hi));
        let bound_minus_one = match bound {
            ExtInt::Finite(v) => ExtInt::Finite((v - 1).max(0)),
            _ => ExtInt::PosInf,
        };
        let neg_possible = self.lo < ExtInt::Finite(0);
        let pos_possible = self.hi > ExtInt::Finite(0);
        let lo = if neg_possible { bound_minus_one.neg() } else { ExtInt::Finite(0) };
        let hi = if pos_possible { bound_minus_one } else { ExtInt::Finite(0) };
        Ok(Self::new(lo, hi, false))
    }

    /// Intersect with `[-inf, -1] ∪ {strictly excludes value}` style
    /// refinements used by branch narrowing: restrict to values `!= v`.
    /// Uses `exclude_zero` when `v == 0` and the interval straddles it;
    /// otherwise shrinks the bound by one when `v` sits at an endpoint.
    pub fn exclude_value(&self, v: i64) -> Self {
        if self.is_bottom() {
            return *self;
        }
        if v == 0 && self.lo <= ExtInt::Finite(0) && ExtInt::Finite(0) <= self.hi {
            return Self::new(self.lo, self.hi, true);
        }
        if self.lo == ExtInt::Finite(v) {
            return Self::new(ExtInt::Finite(v.saturating_add(1)), self.hi, self.exclude_zero);
        }
        if self.hi == ExtInt::Finite(v) {
            return Self::new(self.lo, ExtInt::Finite(v.saturating_sub(1)), self.exclude_zero);
        }
        *self
    }
}

impl fmt::Display for IntervalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "\u{22a5}");
        }
        write!(f, "[{}, {}]", self.lo, self.hi)?;
        if self.exclude_zero {
            write!(f, "\\{{0}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for IntervalValue {
        fn arbitrary(g: &mut Gen) -> Self {
            let a = i64::arbitrary(g) % 20;
            let b = i64::arbitrary(g) % 20;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            IntervalValue::new(ExtInt::Finite(lo), ExtInt::Finite(hi), bool::arbitrary(g))
        }
    }

    #[quickcheck_macros::quickcheck]
    fn join_is_least_upper_bound(a: IntervalValue, b: IntervalValue) -> bool {
        let j = a.join(&b);
        a.leq(&j) && b.leq(&j)
    }

    #[quickcheck_macros::quickcheck]
    fn meet_is_greatest_lower_bound(a: IntervalValue, b: IntervalValue) -> bool {
        let m = a.meet(&b);
        m.leq(&a) && m.leq(&b)
    }

    #[quickcheck_macros::quickcheck]
    fn widen_never_loses_either_side(a: IntervalValue, b: IntervalValue) -> bool {
        let w = a.widen(&b, &[0]);
        a.leq(&w) && b.leq(&w)
    }

    #[test]
    fn widen_snaps_to_constants() {
        let old = IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(1), false);
        let new = IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(2), false);
        let widened = old.widen(&new, &[0, 10]);
        assert_eq!(widened, IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(10), false));
    }

    #[test]
    fn widen_to_infinity_past_largest_constant() {
        let old = IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(10), false);
        let new = IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(11), false);
        let widened = old.widen(&new, &[0, 10]);
        assert_eq!(widened, IntervalValue::new(ExtInt::Finite(0), ExtInt::PosInf, false));
    }

    #[test]
    fn div_by_definite_zero_errors() {
        let a = IntervalValue::from_concrete(4);
        let z = IntervalValue::from_concrete(0);
        assert_eq!(a.div(&z), Err(DomainError::DefiniteDivideByZero));
    }

    #[test]
    fn exclude_zero_cleared_when_zero_outside_range() {
        let v = IntervalValue::new(ExtInt::Finite(1), ExtInt::Finite(5), true);
        assert!(!v.excludes_zero_flag());
    }

    #[test]
    fn soundness_add_sub_mul_over_small_range() {
        let range: Vec<i64> = (-2..=2).collect();
        for &v1 in &range {
            for &v2 in &range {
                let a1 = IntervalValue::from_concrete(v1);
                let a2 = IntervalValue::from_concrete(v2);
                assert!(IntervalValue::from_concrete(v1 + v2).leq(&a1.add(&a2)));
                assert!(IntervalValue::from_concrete(v1 - v2).leq(&a1.sub(&a2)));
                assert!(IntervalValue::from_concrete(v1 * v2).leq(&a1.mul(&a2)));
                if v2 != 0 {
                    assert!(IntervalValue::from_concrete(v1 / v2).leq(&a1.div(&a2).unwrap()));
                }
            }
        }
    }

    #[test]
    fn rem_is_bounded_by_divisor_magnitude_and_sound() {
        let range: Vec<i64> = (-4..=4).collect();
        for &v1 in &range {
            for &v2 in &range {
                if v2 == 0 {
                    continue;
                }
                let a1 = IntervalValue::from_concrete(v1);
                let a2 = IntervalValue::from_concrete(v2);
                assert!(IntervalValue::from_concrete(v1 % v2).leq(&a1.rem(&a2).unwrap()));
            }
        }
    }

    #[test]
    fn rem_by_definite_zero_errors() {
        let a = IntervalValue::from_concrete(4);
        let z = IntervalValue::from_concrete(0);
        assert_eq!(a.rem(&z), Err(DomainError::DefiniteDivideByZero));
    }

    #[test]
    fn join_is_lub() {
        let a = IntervalValue::from_concrete(-3);
        let b = IntervalValue::from_concrete(5);
        let j = a.join(&b);
        assert!(a.leq(&j));
        assert!(b.leq(&j));
        assert_eq!(j, IntervalValue::new(ExtInt::Finite(-3), ExtInt::Finite(5), false));
    }
}
