//! The Sign domain (spec §4.1): a 3-element powerset lattice over
//! `{Neg, Zero, Pos}`.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::DomainError;

/// One of the three concrete signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sign {
    /// Strictly negative.
    Neg,
    /// Exactly zero.
    Zero,
    /// Strictly positive.
    Pos,
}

/// An abstract integer value: the set of signs its concretizations may have.
/// The empty set is bottom; the full set `{Neg, Zero, Pos}` is top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignValue {
    signs: BTreeSet<Sign>,
}

impl SignValue {
    /// The bottom element (no concretizations).
    pub fn bottom() -> Self {
        Self {
            signs: BTreeSet::new(),
        }
    }

    /// The top element (any sign).
    pub fn top() -> Self {
        Self {
            signs: [Sign::Neg, Sign::Zero, Sign::Pos].into_iter().collect(),
        }
    }

    /// The abstraction of a single concrete integer.
    pub fn from_concrete(v: i64) -> Self {
        let s = match v.cmp(&0) {
            std::cmp::Ordering::Less => Sign::Neg,
            std::cmp::Ordering::Equal => Sign::Zero,
            std::cmp::Ordering::Greater => Sign::Pos,
        };
        Self {
            signs: [s].into_iter().collect(),
        }
    }

    /// Construct directly from a set of signs.
    pub fn from_signs(signs: impl IntoIterator<Item = Sign>) -> Self {
        Self {
            signs: signs.into_iter().collect(),
        }
    }

    /// `true` iff this is the bottom element.
    pub fn is_bottom(&self) -> bool {
        self.signs.is_empty()
    }

    /// `true` iff this is the top element.
    pub fn is_top(&self) -> bool {
        self.signs.len() == 3
    }

    /// `true` iff every concretization is `Sign::Zero`.
    pub fn is_definitely_zero(&self) -> bool {
        self.signs.len() == 1 && self.signs.contains(&Sign::Zero)
    }

    /// `true` iff `Sign::Zero` is among the tracked signs (but not the only one).
    pub fn may_be_zero(&self) -> bool {
        self.signs.contains(&Sign::Zero)
    }

    /// `true` iff zero is provably excluded.
    pub fn definitely_not_zero(&self) -> bool {
        !self.signs.contains(&Sign::Zero) && !self.signs.is_empty()
    }

    /// Partial order: `self ⊑ other` iff `self.signs ⊆ other.signs`.
    pub fn leq(&self, other: &Self) -> bool {
        self.signs.is_subset(&other.signs)
    }

    /// `true` iff `s` is one of the tracked signs.
    pub fn contains_sign(&self, s: Sign) -> bool {
        self.signs.contains(&s)
    }

    /// Least upper bound.
    pub fn join(&self, other: &Self) -> Self {
        Self {
            signs: self.signs.union(&other.signs).copied().collect(),
        }
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Self) -> Self {
        Self {
            signs: self.signs.intersection(&other.signs).copied().collect(),
        }
    }

    /// The lattice has finite height 3; there is no precision to lose, so
    /// widening is just join (included for interface uniformity with the
    /// other, genuinely-widened domains).
    pub fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }

    /// Unary negation.
    pub fn neg(&self) -> Self {
        let mut out = BTreeSet::new();
        for s in &self.signs {
            out.insert(match s {
                Sign::Neg => Sign::Pos,
                Sign::Zero => Sign::Zero,
                Sign::Pos => Sign::Neg,
            });
        }
        Self { signs: out }
    }

    fn pointwise(&self, other: &Self, f: impl Fn(Sign, Sign) -> BTreeSet<Sign>) -> Self {
        let mut out = BTreeSet::new();
        for &a in &self.signs {
            for &b in &other.signs {
                out.extend(f(a, b));
            }
        }
        Self { signs: out }
    }

    /// Abstract addition (spec §4.1 semantics table, generalized pointwise).
    pub fn add(&self, other: &Self) -> Self {
        self.pointwise(other, |a, b| sign_add(a, b))
    }

    /// Abstract subtraction: `a - b == a + (-b)`.
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Abstract multiplication.
    pub fn mul(&self, other: &Self) -> Self {
        self.pointwise(other, |a, b| sign_mul(a, b))
    }

    /// Abstract division. Returns [`DomainError::DefiniteDivideByZero`] when
    /// the divisor can only be `Zero`; a divisor that merely *may* be zero
    /// silently drops the zero case from the pointwise union (the caller is
    /// responsible for having already recorded the possible-divide-by-zero
    /// outcome before calling this).
    pub fn div(&self, other: &Self) -> Result<Self, DomainError> {
        if other.is_definitely_zero() {
            return Err(DomainError::DefiniteDivideByZero);
        }
        let mut out = BTreeSet::new();
        for &a in &self.signs {
            for &b in &other.signs {
                if b == Sign::Zero {
                    continue;
                }
                out.extend(sign_div(a, b));
            }
        }
        Ok(Self { signs: out })
    }

    /// Abstract remainder. Follows Java's truncating-remainder rule (result
    /// takes the dividend's sign, or zero): same divide-by-zero contract as
    /// [`SignValue::div`].
    pub fn rem(&self, other: &Self) -> Result<Self, DomainError> {
        if other.is_definitely_zero() {
            return Err(DomainError::DefiniteDivideByZero);
        }
        let mut out = BTreeSet::new();
        for &a in &self.signs {
            for &b in &other.signs {
                if b == Sign::Zero {
                    continue;
                }
                out.insert(a);
            }
        }
        Ok(Self { signs: out })
    }
}

fn sign_add(a: Sign, b: Sign) -> BTreeSet<Sign> {
    if a == b {
        return [a].into_iter().collect();
    }
    if a == Sign::Zero {
        return [b].into_iter().collect();
    }
    if b == Sign::Zero {
        return [a].into_iter().collect();
    }
    [Sign::Neg, Sign::Zero, Sign::Pos].into_iter().collect()
}

fn sign_mul(a: Sign, b: Sign) -> BTreeSet<Sign> {
    if a == Sign::Zero || b == Sign::Zero {
        return [Sign::Zero].into_iter().collect();
    }
    if a == b {
        [Sign::Pos].into_iter().collect()
    } else {
        [Sign::Neg].into_iter().collect()
    }
}

fn sign_div(a: Sign, b: Sign) -> BTreeSet<Sign> {
    debug_assert_ne!(b, Sign::Zero);
    if a == Sign::Zero {
        [Sign::Zero].into_iter().collect()
    } else if a == b {
        [Sign::Pos].into_iter().collect()
    } else {
        [Sign::Neg].into_iter().collect()
    }
}

impl fmt::Display for SignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "\u{22a5}");
        }
        write!(f, "{{")?;
        for (i, s) in self.signs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(
                f,
                "{}",
                match s {
                    Sign::Neg => "-",
                    Sign::Zero => "0",
                    Sign::Pos => "+",
                }
            )?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for SignValue {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut signs = BTreeSet::new();
            for s in [Sign::Neg, Sign::Zero, Sign::Pos] {
                if bool::arbitrary(g) {
                    signs.insert(s);
                }
            }
            SignValue { signs }
        }
    }

    fn all_concrete() -> Vec<i64> {
        vec![-2, -1, 0, 1, 2]
    }

    #[quickcheck_macros::quickcheck]
    fn join_is_commutative(a: SignValue, b: SignValue) -> bool {
        a.join(&b) == b.join(&a)
    }

    #[quickcheck_macros::quickcheck]
    fn join_is_least_upper_bound(a: SignValue, b: SignValue) -> bool {
        let j = a.join(&b);
        a.leq(&j) && b.leq(&j)
    }

    #[quickcheck_macros::quickcheck]
    fn widen_never_loses_either_side(a: SignValue, b: SignValue) -> bool {
        let w = a.widen(&b);
        a.leq(&w) && b.leq(&w)
    }

    #[quickcheck_macros::quickcheck]
    fn meet_is_greatest_lower_bound(a: SignValue, b: SignValue) -> bool {
        let m = a.meet(&b);
        m.leq(&a) && m.leq(&b)
    }

    #[test]
    fn join_is_union_and_lub() {
        let a = SignValue::from_concrete(-1);
        let b = SignValue::from_concrete(1);
        let j = a.join(&b);
        assert!(a.leq(&j));
        assert!(b.leq(&j));
        assert_eq!(j, SignValue::from_signs([Sign::Neg, Sign::Pos]));
    }

    #[test]
    fn meet_of_disjoint_is_bottom() {
        let a = SignValue::from_concrete(-1);
        let b = SignValue::from_concrete(1);
        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn div_by_definite_zero_errors() {
        let a = SignValue::from_concrete(4);
        let zero = SignValue::from_concrete(0);
        assert_eq!(a.div(&zero), Err(DomainError::DefiniteDivideByZero));
    }

    #[test]
    fn soundness_over_small_range_add_sub_mul() {
        for &v1 in &all_concrete() {
            for &v2 in &all_concrete() {
                let a1 = SignValue::from_concrete(v1);
                let a2 = SignValue::from_concrete(v2);

                assert!(SignValue::from_concrete(v1 + v2).leq(&a1.add(&a2)));
                assert!(SignValue::from_concrete(v1 - v2).leq(&a1.sub(&a2)));
                assert!(SignValue::from_concrete(v1 * v2).leq(&a1.mul(&a2)));

                if v2 != 0 {
                    assert!(SignValue::from_concrete(v1 / v2).leq(&a1.div(&a2).unwrap()));
                }
            }
        }
    }

    #[test]
    fn monotonicity_of_add() {
        let x = SignValue::from_concrete(1);
        let xp = SignValue::from_signs([Sign::Pos, Sign::Zero]);
        let y = SignValue::from_concrete(-1);
        let yp = SignValue::top();
        assert!(x.leq(&xp));
        assert!(y.leq(&yp));
        assert!(x.add(&y).leq(&xp.add(&yp)));
    }
}
