//! The domain dispatcher (spec §4.5): a uniform surface the transfer
//! functions call through regardless of which concrete lattice a slot's
//! value inhabits.
//!
//! Two numeric lattices ([`sign::SignValue`], [`interval::IntervalValue`])
//! and two string lattices ([`strings::PrefixSuffixValue`],
//! [`strings::BricksValue`]) are available; a single [`crate::consts::AnalysisConfig`]
//! picks exactly one of each for the whole of one `analyze` run (mirroring
//! the out-of-scope CLI's `--abs {int|str}` mode selection), so [`Value`]'s
//! four variants never need to interoperate pairwise — only same-domain
//! pairs are ever joined, widened, or combined.

pub mod interval;
pub mod sign;
pub mod strings;

use crate::consts::{AnalysisConfig, NumericDomainKind, StringDomainKind};
use crate::domain::interval::{ExtInt, IntervalValue};
use crate::domain::sign::{Sign, SignValue};
use crate::domain::strings::{BricksValue, PrefixSuffixValue};
use crate::error::DomainError;
use crate::ternary::Ternary;

/// A stack/local slot value, tagged by which concrete lattice produced it
/// (spec §9: "model the stack element as a tagged union of the supported
/// domain values").
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Sign-domain integer.
    Sign(SignValue),
    /// Interval-domain integer.
    Interval(IntervalValue),
    /// Prefix/Suffix-domain string.
    PrefixSuffix(PrefixSuffixValue),
    /// Bricks-domain string.
    Bricks(BricksValue),
}

/// The six zero-relative truth sets a branch condition can refine a numeric
/// value to (spec §4.8: "on the true branch the local is the intersection
/// with the condition's truth set").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `== 0`.
    EqZero,
    /// `!= 0`.
    NeZero,
    /// `< 0`.
    LtZero,
    /// `>= 0`.
    GeZero,
    /// `> 0`.
    GtZero,
    /// `<= 0`.
    LeZero,
}

impl Value {
    /// `true` iff this slot holds one of the two string domains.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::PrefixSuffix(_) | Value::Bricks(_))
    }

    /// `true` iff this slot holds one of the two numeric domains.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Sign(_) | Value::Interval(_))
    }

    /// Seed the top numeric value for the configured numeric domain.
    pub fn top_numeric(cfg: &AnalysisConfig) -> Self {
        match cfg.numeric_domain {
            NumericDomainKind::Sign => Value::Sign(SignValue::top()),
            NumericDomainKind::Interval => Value::Interval(IntervalValue::top()),
        }
    }

    /// Seed the top string value (possibly null) for the configured string
    /// domain.
    pub fn top_string(cfg: &AnalysisConfig) -> Self {
        match cfg.string_domain {
            StringDomainKind::PrefixSuffix => Value::PrefixSuffix(PrefixSuffixValue::top(cfg.lmax)),
            StringDomainKind::Bricks => Value::Bricks(BricksValue::top()),
        }
    }

    /// The concrete int `v`, abstracted into the configured numeric domain.
    pub fn concrete_int(v: i64, cfg: &AnalysisConfig) -> Self {
        match cfg.numeric_domain {
            NumericDomainKind::Sign => Value::Sign(SignValue::from_concrete(v)),
            NumericDomainKind::Interval => Value::Interval(IntervalValue::from_concrete(v)),
        }
    }

    /// The concrete string `s`, abstracted into the configured string domain.
    pub fn concrete_string(s: &str, cfg: &AnalysisConfig) -> Self {
        match cfg.string_domain {
            StringDomainKind::PrefixSuffix => Value::PrefixSuffix(PrefixSuffixValue::from_concrete(s, cfg.dp)),
            StringDomainKind::Bricks => Value::Bricks(BricksValue::from_concrete(s)),
        }
    }

    /// A definite `null` in the configured string domain.
    pub fn null_string(cfg: &AnalysisConfig) -> Self {
        match cfg.string_domain {
            StringDomainKind::PrefixSuffix => Value::PrefixSuffix(PrefixSuffixValue::null()),
            StringDomainKind::Bricks => Value::Bricks(BricksValue::null()),
        }
    }

    /// The "some digits" over-approximation (spec §4.5) used when an `int`
    /// flows into a string concatenation, in the configured string domain.
    pub fn digits_approx(cfg: &AnalysisConfig) -> Self {
        match cfg.string_domain {
            StringDomainKind::PrefixSuffix => Value::PrefixSuffix(PrefixSuffixValue::digits_approx()),
            StringDomainKind::Bricks => Value::Bricks(BricksValue::digits_approx()),
        }
    }

    /// Coerce to a string-domain value, applying the digits approximation
    /// when `self` is numeric (spec §4.5: "when numeric operations receive
    /// a top-string operand... approximated as 'some digits'" — the
    /// symmetric numeric-into-string case this dispatcher also needs for
    /// `invokedynamic` concatenation of an `int` operand).
    fn as_string_value(&self, cfg: &AnalysisConfig) -> Value {
        match self {
            Value::PrefixSuffix(_) | Value::Bricks(_) => self.clone(),
            Value::Sign(_) | Value::Interval(_) => Self::digits_approx(cfg),
        }
    }

    // --- numeric operations ---

    /// Unary negation; no-op on a string value.
    pub fn neg(&self) -> Self {
        match self {
            Value::Sign(s) => Value::Sign(s.neg()),
            Value::Interval(i) => Value::Interval(i.neg()),
            other => other.clone(),
        }
    }

    /// Abstract addition. Mismatched variants never arise in a well-formed
    /// run (one numeric domain per `analyze` call); falls back to `self`.
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.add(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.add(b)),
            _ => self.clone(),
        }
    }

    /// Abstract subtraction.
    pub fn sub(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.sub(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.sub(b)),
            _ => self.clone(),
        }
    }

    /// Abstract multiplication.
    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.mul(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.mul(b)),
            _ => self.clone(),
        }
    }

    /// Abstract division; propagates [`DomainError::DefiniteDivideByZero`].
    pub fn div(&self, other: &Self) -> Result<Self, DomainError> {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Ok(Value::Sign(a.div(b)?)),
            (Value::Interval(a), Value::Interval(b)) => Ok(Value::Interval(a.div(b)?)),
            _ => Ok(self.clone()),
        }
    }

    /// Abstract remainder; propagates [`DomainError::DefiniteDivideByZero`].
    pub fn rem(&self, other: &Self) -> Result<Self, DomainError> {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Ok(Value::Sign(a.rem(b)?)),
            (Value::Interval(a), Value::Interval(b)) => Ok(Value::Interval(a.rem(b)?)),
            _ => Ok(self.clone()),
        }
    }

    /// `true` iff this value is the bottom element of its lattice (no
    /// concretizations at all — not even `null`). Used by branch
    /// feasibility checks: a refined value that collapses to bottom means
    /// that side of the branch cannot be reached.
    pub fn is_bottom(&self) -> bool {
        match self {
            Value::Sign(s) => s.is_bottom(),
            Value::Interval(i) => i.is_bottom(),
            Value::PrefixSuffix(p) => p.is_bottom(),
            Value::Bricks(b) => b.is_bottom(),
        }
    }

    /// The exact concrete string this value represents, if any — only ever
    /// `Some` for a string-domain singleton short/simple enough to
    /// reconstruct in full. Bridges call sites that need a literal `&str`
    /// argument (e.g. `startsWith`) to an abstract stack value that may or
    /// may not be a known constant.
    pub fn as_literal(&self) -> Option<String> {
        match self {
            Value::PrefixSuffix(p) => p.as_literal(),
            Value::Bricks(b) => b.as_literal(),
            _ => None,
        }
    }

    /// `true` iff every concretization is zero.
    pub fn is_definitely_zero(&self) -> bool {
        match self {
            Value::Sign(s) => s.is_definitely_zero(),
            Value::Interval(i) => i.is_definitely_zero(),
            _ => false,
        }
    }

    /// `true` iff zero is a possible concretization.
    pub fn possibly_zero(&self) -> bool {
        match self {
            Value::Sign(s) => s.may_be_zero(),
            Value::Interval(i) => i.possibly_zero(),
            _ => false,
        }
    }

    /// `true` iff zero is provably excluded.
    pub fn definitely_not_zero(&self) -> bool {
        match self {
            Value::Sign(s) => s.definitely_not_zero(),
            Value::Interval(i) => i.definitely_not_zero(),
            _ => true,
        }
    }

    /// Greatest lower bound, used by branch-condition refinement.
    pub fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.meet(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.meet(b)),
            _ => self.clone(),
        }
    }

    /// Refine `self` to the truth set of `relation` (spec §4.8 branch
    /// refinement). No-op on a string value.
    pub fn refine_zero_cmp(&self, relation: Relation) -> Self {
        match self {
            Value::Interval(i) => Value::Interval(i.meet(&interval_truth_set(relation))),
            Value::Sign(s) => Value::Sign(s.meet(&sign_truth_set(relation))),
            other => other.clone(),
        }
    }

    /// A conservative bounding [`IntervalValue`] for any numeric value —
    /// the identity for Interval, and a coarse embedding for Sign — used by
    /// `if_icmp*` feasibility checks that want one shared representation
    /// regardless of the configured numeric domain. Non-numeric values map
    /// to `top`.
    pub fn bounding_interval(&self) -> IntervalValue {
        match self {
            Value::Interval(i) => *i,
            Value::Sign(s) => {
                if s.is_bottom() {
                    IntervalValue::bottom()
                } else {
                    sign_bounding_interval(s)
                }
            }
            _ => IntervalValue::top(),
        }
    }

    // --- nullability (meaningful only on string values) ---

    /// `true` iff every concretization is `null`.
    pub fn is_definitely_null(&self) -> bool {
        match self {
            Value::PrefixSuffix(p) => p.is_definitely_null(),
            Value::Bricks(b) => b.is_definitely_null(),
            _ => false,
        }
    }

    /// `true` iff `null` is a possible but not the only concretization.
    pub fn is_possibly_null(&self) -> bool {
        match self {
            Value::PrefixSuffix(p) => p.is_possibly_null(),
            Value::Bricks(b) => b.is_possibly_null(),
            _ => false,
        }
    }

    /// `true` iff `null` is provably excluded (always true for numerics).
    pub fn is_definitely_not_null(&self) -> bool {
        match self {
            Value::PrefixSuffix(p) => p.is_definitely_not_null(),
            Value::Bricks(b) => b.is_definitely_not_null(),
            _ => true,
        }
    }

    /// Refine to exclude `null`; no-op on a numeric value.
    pub fn set_not_null(&self) -> Self {
        match self {
            Value::PrefixSuffix(p) => Value::PrefixSuffix(p.set_not_null()),
            Value::Bricks(b) => Value::Bricks(b.set_not_null()),
            other => other.clone(),
        }
    }

    // --- string operations ---

    /// `length()`. A non-string value reports the unbounded `[0, +inf)`
    /// range a top-string would (spec §4.5: "when a string operation
    /// receives a non-string value it returns a top-string").
    pub fn length(&self) -> IntervalValue {
        match self {
            Value::PrefixSuffix(p) => p.length(),
            Value::Bricks(b) => b.length(),
            _ => IntervalValue::new(ExtInt::Finite(0), ExtInt::PosInf, false),
        }
    }

    /// `concat(self, other)`, coercing either side from numeric via the
    /// digits approximation first.
    pub fn concat(&self, other: &Self, cfg: &AnalysisConfig) -> Self {
        match (self.as_string_value(cfg), other.as_string_value(cfg)) {
            (Value::PrefixSuffix(a), Value::PrefixSuffix(b)) => Value::PrefixSuffix(a.concat(&b, cfg.dp, cfg.lmax)),
            (Value::Bricks(a), Value::Bricks(b)) => Value::Bricks(a.concat(&b)),
            _ => Self::top_string(cfg),
        }
    }

    /// `substring(start, end?)`.
    pub fn substring(&self, start: &IntervalValue, end: Option<&IntervalValue>, cfg: &AnalysisConfig) -> Self {
        match self {
            Value::PrefixSuffix(p) => Value::PrefixSuffix(p.substring(start, end, cfg.lmax)),
            Value::Bricks(b) => match clamp_substring_bounds(start, end, &b.length()) {
                (Some(i), Some(j)) if i <= j => Value::Bricks(b.substring(i, j)),
                _ => Self::top_string(cfg),
            },
            _ => Self::top_string(cfg),
        }
    }

    /// `startsWith(p)`.
    pub fn starts_with(&self, p: &str) -> Ternary {
        match self {
            Value::PrefixSuffix(v) => v.starts_with(p),
            Value::Bricks(v) => v.starts_with(p),
            _ => Ternary::Unknown,
        }
    }

    /// `endsWith(s)`.
    pub fn ends_with(&self, s: &str) -> Ternary {
        match self {
            Value::PrefixSuffix(v) => v.ends_with(s),
            Value::Bricks(v) => v.ends_with(s),
            _ => Ternary::Unknown,
        }
    }

    /// `contains(sub)`.
    pub fn contains(&self, sub: &str) -> Ternary {
        match self {
            Value::PrefixSuffix(v) => v.contains(sub),
            Value::Bricks(v) => v.contains(sub),
            _ => Ternary::Unknown,
        }
    }

    /// `isEmpty()`.
    pub fn is_empty(&self) -> Ternary {
        match self {
            Value::PrefixSuffix(v) => v.is_empty(),
            Value::Bricks(v) => v.is_empty(),
            _ => Ternary::Unknown,
        }
    }

    /// `equals(other)`: only same-domain string pairs can be compared
    /// precisely; anything else is unknown.
    pub fn equals(&self, other: &Self) -> Ternary {
        match (self, other) {
            (Value::PrefixSuffix(a), Value::PrefixSuffix(b)) => a.equals(b),
            (Value::Bricks(a), Value::Bricks(b)) => a.equals(b),
            _ => Ternary::Unknown,
        }
    }

    /// Least upper bound. Numeric and string pairs of the same variant join
    /// via their own lattice; a bottom value on either side degenerates to
    /// the other (frame-join identity).
    pub fn join(&self, other: &Self, cfg: &AnalysisConfig) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.join(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.join(b)),
            (Value::PrefixSuffix(a), Value::PrefixSuffix(b)) => Value::PrefixSuffix(a.join(b, cfg.lmax)),
            (Value::Bricks(a), Value::Bricks(b)) => Value::Bricks(a.join(b)),
            _ => other.clone(),
        }
    }

    /// Widening, used at loop heads in place of `join` (spec §4.6: "State
    /// widen uses widen on values of widenable domains... and plain join
    /// elsewhere"). Sign has no genuine widening (finite height 3), so it
    /// falls back to join.
    pub fn widen(&self, other: &Self, cfg: &AnalysisConfig, constants: &[i64]) -> Self {
        match (self, other) {
            (Value::Sign(a), Value::Sign(b)) => Value::Sign(a.widen(b)),
            (Value::Interval(a), Value::Interval(b)) => Value::Interval(a.widen(b, constants)),
            (Value::PrefixSuffix(a), Value::PrefixSuffix(b)) => Value::PrefixSuffix(a.widen(b, cfg.lmax)),
            (Value::Bricks(a), Value::Bricks(b)) => {
                Value::Bricks(a.widen(b, cfg.max_list_length, cfg.max_string_count, cfg.max_index_range))
            }
            _ => other.clone(),
        }
    }
}

fn interval_truth_set(relation: Relation) -> IntervalValue {
    use ExtInt::*;
    match relation {
        Relation::EqZero => IntervalValue::new(Finite(0), Finite(0), false),
        Relation::NeZero => IntervalValue::new(NegInf, PosInf, true),
        Relation::LtZero => IntervalValue::new(NegInf, Finite(-1), false),
        Relation::GeZero => IntervalValue::new(Finite(0), PosInf, false),
        Relation::GtZero => IntervalValue::new(Finite(1), PosInf, false),
        Relation::LeZero => IntervalValue::new(NegInf, Finite(0), false),
    }
}

fn sign_truth_set(relation: Relation) -> SignValue {
    match relation {
        Relation::EqZero => SignValue::from_signs([Sign::Zero]),
        Relation::NeZero => SignValue::from_signs([Sign::Neg, Sign::Pos]),
        Relation::LtZero => SignValue::from_signs([Sign::Neg]),
        Relation::GeZero => SignValue::from_signs([Sign::Zero, Sign::Pos]),
        Relation::GtZero => SignValue::from_signs([Sign::Pos]),
        Relation::LeZero => SignValue::from_signs([Sign::Zero, Sign::Neg]),
    }
}

fn sign_bounding_interval(s: &SignValue) -> IntervalValue {
    let lo = if s.contains_sign(Sign::Neg) {
        ExtInt::NegInf
    } else if s.contains_sign(Sign::Zero) {
        ExtInt::Finite(0)
    } else {
        ExtInt::Finite(1)
    };
    let hi = if s.contains_sign(Sign::Pos) {
        ExtInt::PosInf
    } else if s.contains_sign(Sign::Zero) {
        ExtInt::Finite(0)
    } else {
        ExtInt::Finite(-1)
    };
    IntervalValue::new(lo, hi, false)
}

fn clamp_substring_bounds(start: &IntervalValue, end: Option<&IntervalValue>, own_len: &IntervalValue) -> (Option<usize>, Option<usize>) {
    let end = end.cloned().unwrap_or(*own_len);
    let as_usize = |v: ExtInt| -> Option<usize> {
        match v {
            ExtInt::Finite(x) if x >= 0 => Some(x as usize),
            _ => None,
        }
    };
    if start.lo() != start.hi() || end.lo() != end.hi() {
        return (None, None);
    }
    (as_usize(start.lo()), as_usize(end.lo()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refine_zero_cmp_on_interval() {
        let v = Value::Interval(IntervalValue::new(ExtInt::Finite(-5), ExtInt::Finite(5), false));
        let refined = v.refine_zero_cmp(Relation::GeZero);
        assert_eq!(refined, Value::Interval(IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(5), false)));
    }

    #[test]
    fn digits_approx_used_for_numeric_concat_operand() {
        let cfg = AnalysisConfig::default();
        let s = Value::concrete_string("n=", &cfg);
        let n = Value::concrete_int(42, &cfg);
        let joined = s.concat(&n, &cfg);
        assert!(joined.is_string());
    }

    #[test]
    fn null_tracking_through_dispatcher() {
        let cfg = AnalysisConfig::default();
        let n = Value::null_string(&cfg);
        assert!(n.is_definitely_null());
        assert!(!n.set_not_null().is_definitely_null());
    }
}
