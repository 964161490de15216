//! The Prefix/Suffix string domain (spec §4.3): a bounded tuple
//! `(P, S, minLen, maxLen, nullable, Dp, Lmax)`.

use std::collections::BTreeSet;

use crate::domain::interval::IntervalValue;
use crate::ternary::Ternary;

/// An abstract string value tracking a finite set of possible prefixes and
/// suffixes (each bounded to `Dp` characters), a length range bounded by
/// `Lmax`, and nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixSuffixValue {
    prefixes: BTreeSet<String>,
    suffixes: BTreeSet<String>,
    min_len: usize,
    max_len: usize,
    nullable: bool,
}

impl PrefixSuffixValue {
    /// The bottom element: no possible string, not nullable.
    pub fn bottom() -> Self {
        Self {
            prefixes: BTreeSet::new(),
            suffixes: BTreeSet::new(),
            min_len: 1,
            max_len: 0,
            nullable: false,
        }
    }

    /// A value that is definitely `null`.
    pub fn null() -> Self {
        Self {
            nullable: true,
            ..Self::bottom()
        }
    }

    /// The top element for the given `lmax`: any string, possibly null.
    pub fn top(lmax: usize) -> Self {
        Self {
            prefixes: [String::new()].into_iter().collect(),
            suffixes: [String::new()].into_iter().collect(),
            min_len: 0,
            max_len: lmax,
            nullable: true,
        }
    }

    /// Abstraction of a single known, non-null string.
    pub fn from_concrete(s: &str, dp: usize) -> Self {
        let len = s.chars().count();
        let prefix: String = s.chars().take(dp).collect();
        let suffix: String = {
            let total = s.chars().count();
            let skip = total.saturating_sub(dp);
            s.chars().skip(skip).collect()
        };
        Self {
            prefixes: [prefix].into_iter().collect(),
            suffixes: [suffix].into_iter().collect(),
            min_len: len,
            max_len: len,
            nullable: false,
        }
    }

    /// The digits-only over-approximation used when an integer value flows
    /// into a string context (spec §4.5: "some digits", min 1, max 11).
    pub fn digits_approx() -> Self {
        Self {
            prefixes: BTreeSet::new(),
            suffixes: BTreeSet::new(),
            min_len: 1,
            max_len: 11,
            nullable: false,
        }
    }

    /// `true` iff no non-null string is tracked (`minLen > maxLen`).
    pub fn has_no_string_component(&self) -> bool {
        self.min_len > self.max_len
    }

    /// `true` iff this is the canonical bottom (no string, not nullable).
    pub fn is_bottom(&self) -> bool {
        self.has_no_string_component() && !self.nullable
    }

    /// `true` iff this is top for the given `lmax`.
    pub fn is_top(&self, lmax: usize) -> bool {
        self.nullable
            && self.min_len == 0
            && self.max_len == lmax
            && self.prefixes.len() == 1
            && self.prefixes.contains("")
            && self.suffixes.len() == 1
            && self.suffixes.contains("")
    }

    /// `true` iff every concretization is `null`.
    pub fn is_definitely_null(&self) -> bool {
        self.nullable && self.has_no_string_component()
    }

    /// `true` iff `null` is a possible but not the only concretization.
    pub fn is_possibly_null(&self) -> bool {
        self.nullable && !self.has_no_string_component()
    }

    /// `true` iff `null` is provably excluded.
    pub fn is_definitely_not_null(&self) -> bool {
        !self.nullable
    }

    /// Refine to exclude `null` (used on the non-null branch of
    /// `ifnonnull`/after a null-check).
    pub fn set_not_null(&self) -> Self {
        Self {
            nullable: false,
            ..self.clone()
        }
    }

    /// `(minLen, maxLen)` as an [`IntervalValue`].
    pub fn length(&self) -> IntervalValue {
        if self.has_no_string_component() {
            return IntervalValue::bottom();
        }
        IntervalValue::new(
            crate::domain::interval::ExtInt::Finite(self.min_len as i64),
            crate::domain::interval::ExtInt::Finite(self.max_len as i64),
            false,
        )
    }

    /// Join (spec §4.3): longest common prefix/suffix pairwise, lengths by
    /// min/max, nullable OR-ed, collapsing to top when fully widened.
    pub fn join(&self, other: &Self, lmax: usize) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        if self.has_no_string_component() {
            return Self {
                nullable: self.nullable || other.nullable,
                ..other.clone()
            };
        }
        if other.has_no_string_component() {
            return Self {
                nullable: self.nullable || other.nullable,
                ..self.clone()
            };
        }

        let mut prefixes = BTreeSet::new();
        for p1 in &self.prefixes {
            for p2 in &other.prefixes {
                prefixes.insert(common_prefix(p1, p2));
            }
        }
        let mut suffixes = BTreeSet::new();
        for s1 in &self.suffixes {
            for s2 in &other.suffixes {
                suffixes.insert(common_suffix(s1, s2));
            }
        }

        let result = Self {
            prefixes,
            suffixes,
            min_len: self.min_len.min(other.min_len),
            max_len: self.max_len.max(other.max_len),
            nullable: self.nullable || other.nullable,
        };

        if result.prefixes.len() == 1
            && result.prefixes.contains("")
            && result.suffixes.len() == 1
            && result.suffixes.contains("")
            && result.min_len == 0
            && result.max_len == lmax
        {
            return Self::top(lmax).with_nullable(result.nullable);
        }
        result
    }

    fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Widen (spec §4.3): any prefix/suffix-set change widens that set to
    /// `{""}`; a more-than-doubled max length jumps straight to `Lmax`.
    pub fn widen(&self, other: &Self, lmax: usize) -> Self {
        let joined = self.join(other, lmax);
        if joined.is_top(lmax) || self.is_bottom() {
            return joined;
        }

        let prefixes = if joined.prefixes != self.prefixes {
            [String::new()].into_iter().collect()
        } else {
            joined.prefixes.clone()
        };
        let suffixes = if joined.suffixes != self.suffixes {
            [String::new()].into_iter().collect()
        } else {
            joined.suffixes.clone()
        };
        let max_len = if joined.max_len > self.max_len.saturating_mul(2) {
            lmax
        } else {
            joined.max_len
        };

        let result = Self {
            prefixes,
            suffixes,
            min_len: joined.min_len,
            max_len,
            nullable: joined.nullable,
        };

        if result.prefixes.len() == 1
            && result.prefixes.contains("")
            && result.suffixes.len() == 1
            && result.suffixes.contains("")
            && result.min_len == 0
            && result.max_len == lmax
        {
            return Self::top(lmax).with_nullable(result.nullable);
        }
        result
    }

    /// `concat(a, b)` (spec §4.3 transfer contract).
    pub fn concat(&self, other: &Self, dp: usize, lmax: usize) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let mut prefixes = BTreeSet::new();
        for pa in &self.prefixes {
            for pb in &other.prefixes {
                let joined: String = pa.chars().chain(pb.chars()).take(dp).collect();
                prefixes.insert(joined);
            }
        }
        let mut suffixes = BTreeSet::new();
        for sa in &self.suffixes {
            for sb in &other.suffixes {
                let combined: String = sa.chars().chain(sb.chars()).collect();
                let total = combined.chars().count();
                let skip = total.saturating_sub(dp);
                suffixes.insert(combined.chars().skip(skip).collect());
            }
        }
        Self {
            prefixes,
            suffixes,
            min_len: (self.min_len + other.min_len).min(lmax),
            max_len: (self.max_len + other.max_len).min(lmax),
            nullable: false,
        }
    }

    /// `substring(start, end?)`: loses prefix/suffix precision, keeps a
    /// clamped length range.
    pub fn substring(&self, start: &IntervalValue, end: Option<&IntervalValue>, lmax: usize) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        let own_len = self.length();
        let end = end.cloned().unwrap_or(own_len);
        let range = end.sub(start).meet(&IntervalValue::new(
            crate::domain::interval::ExtInt::Finite(0),
            crate::domain::interval::ExtInt::Finite(lmax as i64),
            false,
        ));
        if range.is_bottom() {
            return Self::bottom();
        }
        let min_len = match range.lo() {
            crate::domain::interval::ExtInt::Finite(v) => v.max(0) as usize,
            _ => 0,
        };
        let max_len = match range.hi() {
            crate::domain::interval::ExtInt::Finite(v) => (v.max(0) as usize).min(lmax),
            _ => lmax,
        };
        Self {
            prefixes: [String::new()].into_iter().collect(),
            suffixes: [String::new()].into_iter().collect(),
            min_len,
            max_len,
            nullable: false,
        }
    }

    /// `startsWith(p)` (spec §4.3). Mirrors the reference implementation:
    /// a tracked prefix that itself starts with `p` settles it definitely
    /// true when `p` is no longer than the tracked prefix, possibly true
    /// when the string could still be long enough, and otherwise false.
    pub fn starts_with(&self, p: &str) -> Ternary {
        if self.is_bottom() {
            return Ternary::Unknown;
        }
        let plen = p.chars().count();
        for tracked in &self.prefixes {
            if tracked.starts_with(p) {
                if plen <= tracked.chars().count() {
                    return Ternary::True;
                }
                return if self.min_len >= plen {
                    Ternary::Unknown
                } else {
                    Ternary::False
                };
            }
        }
        if self.min_len < plen {
            Ternary::False
        } else {
            Ternary::Unknown
        }
    }

    /// `endsWith(s)` (spec §4.3), symmetric to `starts_with` via suffixes.
    pub fn ends_with(&self, s: &str) -> Ternary {
        if self.is_bottom() {
            return Ternary::Unknown;
        }
        let slen = s.chars().count();
        if self.max_len < slen {
            return Ternary::False;
        }
        for tracked in &self.suffixes {
            if tracked.ends_with(s) {
                if slen <= tracked.chars().count() {
                    return Ternary::True;
                }
                return if self.min_len >= slen {
                    Ternary::Unknown
                } else {
                    Ternary::False
                };
            }
        }
        if self.min_len < slen {
            Ternary::False
        } else {
            Ternary::Unknown
        }
    }

    /// `equals(other)` (spec §4.3): true only when both sides match on
    /// prefix, suffix, and an identical exact length; false when exact
    /// lengths differ or the prefix sets are disjoint.
    pub fn equals(&self, other: &Self) -> Ternary {
        if self.is_bottom() || other.is_bottom() {
            return Ternary::Unknown;
        }
        let self_exact = self.min_len == self.max_len;
        let other_exact = other.min_len == other.max_len;

        if self.prefixes == other.prefixes && self.suffixes == other.suffixes && self_exact && other_exact && self.min_len == other.min_len {
            return Ternary::True;
        }
        if self_exact && other_exact && self.min_len != other.min_len {
            return Ternary::False;
        }
        if self.prefixes.is_disjoint(&other.prefixes) {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// Best-effort `contains(sub)`: true if some tracked prefix or suffix
    /// already contains `sub`; otherwise unknown (this domain does not
    /// track infix information precisely).
    pub fn contains(&self, sub: &str) -> Ternary {
        if self.is_bottom() {
            return Ternary::Unknown;
        }
        if sub.is_empty() {
            return Ternary::True;
        }
        if self.prefixes.iter().any(|p| p.contains(sub)) || self.suffixes.iter().any(|s| s.contains(sub)) {
            return Ternary::True;
        }
        Ternary::Unknown
    }

    /// The exact concrete string this value represents, if it is a
    /// singleton short enough that the tracked prefix reconstructs it in
    /// full (`minLen == maxLen <= Dp`). Used by call sites that need a
    /// literal `&str` to hand to [`Self::starts_with`]/[`Self::ends_with`]/
    /// [`Self::contains`] for a non-constant argument.
    pub fn as_literal(&self) -> Option<String> {
        if self.min_len == self.max_len && self.prefixes.len() == 1 {
            let p = self.prefixes.iter().next().unwrap();
            if p.chars().count() == self.min_len {
                return Some(p.clone());
            }
        }
        None
    }

    /// `isEmpty()`.
    pub fn is_empty(&self) -> Ternary {
        if self.is_bottom() {
            return Ternary::Unknown;
        }
        if self.max_len == 0 {
            return Ternary::True;
        }
        if self.min_len > 0 {
            return Ternary::False;
        }
        Ternary::Unknown
    }
}

fn common_prefix(a: &str, b: &str) -> String {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).map(|(x, _)| x).collect()
}

fn common_suffix(a: &str, b: &str) -> String {
    let ra: Vec<char> = a.chars().rev().collect();
    let rb: Vec<char> = b.chars().rev().collect();
    let common: Vec<char> = ra.iter().zip(rb.iter()).take_while(|(x, y)| x == y).map(|(x, _)| *x).collect();
    common.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_truncates_to_dp_and_clamps_length() {
        let a = PrefixSuffixValue::from_concrete("ab", 3);
        let b = PrefixSuffixValue::from_concrete("cdef", 3);
        let c = a.concat(&b, 3, 100);
        assert_eq!(c.length(), IntervalValue::from_concrete(6));
    }

    #[test]
    fn join_of_identical_singletons_is_identity_shaped() {
        let a = PrefixSuffixValue::from_concrete("ab", 3);
        let j = a.join(&a, 100);
        assert_eq!(j.length(), IntervalValue::from_concrete(2));
    }

    #[test]
    fn join_collapses_to_top_when_fully_generalized() {
        let a = PrefixSuffixValue::from_concrete("", 3);
        let b = PrefixSuffixValue::top(100);
        let j = a.join(&b, 100);
        assert!(j.is_top(100));
    }

    #[test]
    fn starts_with_true_and_false_cases() {
        let a = PrefixSuffixValue::from_concrete("hello", 3);
        assert_eq!(a.starts_with("he"), Ternary::True);
        assert_eq!(a.starts_with("hello world"), Ternary::False);
    }

    #[test]
    fn null_tracking() {
        let n = PrefixSuffixValue::null();
        assert!(n.is_definitely_null());
        assert!(!n.set_not_null().is_definitely_null());
    }
}
