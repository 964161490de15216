//! The Bricks string domain (spec §4.4): a string as a concatenation of
//! "bricks", each denoting `min..max` repetitions of a finite string set.

use std::collections::BTreeSet;

use crate::domain::interval::IntervalValue;
use crate::ternary::Ternary;

/// `(StringSet, min, max)`. `max = None` denotes unbounded repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brick {
    strings: BTreeSet<String>,
    min: usize,
    max: Option<usize>,
}

impl Brick {
    /// Construct a brick, validating `min <= max` when `max` is bounded.
    pub fn new(strings: BTreeSet<String>, min: usize, max: Option<usize>) -> Self {
        if let Some(m) = max {
            debug_assert!(min <= m, "brick max_count must be >= min_count");
        }
        Self { strings, min, max }
    }

    fn is_empty_brick(&self) -> bool {
        self.strings.is_empty() && self.min == 0 && self.max == Some(0)
    }

    fn is_top_brick(&self) -> bool {
        self.max.is_none() && self.min == 0 && self.strings.len() == 1 && self.strings.contains(".*")
    }

    fn min_length(&self) -> usize {
        self.strings
            .iter()
            .map(|s| s.chars().count())
            .min()
            .unwrap_or(0)
            .saturating_mul(self.min)
    }

    fn max_length(&self) -> Option<usize> {
        let max = self.max?;
        let longest = self.strings.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        Some(longest.saturating_mul(max))
    }
}

fn expand_strings(strings: &BTreeSet<String>, count: usize) -> BTreeSet<String> {
    let mut result: BTreeSet<String> = [String::new()].into_iter().collect();
    for _ in 0..count {
        result = concat_string_sets(&result, strings);
    }
    result
}

fn concat_string_sets(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for sa in a {
        for sb in b {
            out.insert(format!("{sa}{sb}"));
        }
    }
    out
}

/// An abstract string value as a normalized sequence of [`Brick`]s, plus
/// nullability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BricksValue {
    bricks: Vec<Brick>,
    nullable: bool,
}

impl BricksValue {
    /// The bottom element: empty list, not nullable.
    pub fn bottom() -> Self {
        Self {
            bricks: Vec::new(),
            nullable: false,
        }
    }

    /// A value that is definitely `null`.
    pub fn null() -> Self {
        Self {
            bricks: Vec::new(),
            nullable: true,
        }
    }

    /// The top element: a single `(.*,0,∞)` brick, possibly null.
    pub fn top() -> Self {
        Self {
            bricks: vec![Brick::new([".*".to_string()].into_iter().collect(), 0, None)],
            nullable: true,
        }
    }

    /// Abstraction of a single known, non-null string.
    pub fn from_concrete(s: &str) -> Self {
        Self {
            bricks: vec![Brick::new([s.to_string()].into_iter().collect(), 1, 1.into())],
            nullable: false,
        }
    }

    /// The digits-only over-approximation for int-to-string contexts (spec
    /// §4.5), represented as a top-ish brick sequence of length 1..11.
    pub fn digits_approx() -> Self {
        Self {
            bricks: vec![Brick::new([".*".to_string()].into_iter().collect(), 1, Some(11))],
            nullable: false,
        }
    }

    /// `true` iff this is the canonical bottom.
    pub fn is_bottom(&self) -> bool {
        self.bricks.is_empty() && !self.nullable
    }

    /// `true` iff this is the single top brick (nullability aside).
    pub fn is_top(&self) -> bool {
        self.bricks.len() == 1 && self.bricks[0].is_top_brick()
    }

    /// `true` iff every concretization is `null`.
    pub fn is_definitely_null(&self) -> bool {
        self.nullable && self.bricks.is_empty()
    }

    /// `true` iff `null` is a possible but not the only concretization.
    pub fn is_possibly_null(&self) -> bool {
        self.nullable && !self.bricks.is_empty()
    }

    /// `true` iff `null` is provably excluded.
    pub fn is_definitely_not_null(&self) -> bool {
        !self.nullable
    }

    /// Refine to exclude `null`.
    pub fn set_not_null(&self) -> Self {
        Self {
            bricks: self.bricks.clone(),
            nullable: false,
        }
    }

    /// Normalize until fixpoint (spec §4.4 rules 1-5).
    pub fn normalize(bricks: Vec<Brick>) -> Vec<Brick> {
        let mut result = bricks;
        loop {
            let (next, changed) = normalize_pass(result);
            result = next;
            if !changed {
                return result;
            }
        }
    }

    fn normalized(&self) -> Self {
        Self {
            bricks: Self::normalize(self.bricks.clone()),
            nullable: self.nullable,
        }
    }

    /// `concat(v1, v2)`: list concatenation followed by normalization.
    pub fn concat(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if self.is_top() || other.is_top() {
            return Self {
                bricks: Self::top().bricks,
                nullable: false,
            };
        }
        let mut combined = self.bricks.clone();
        combined.extend(other.bricks.clone());
        Self {
            bricks: Self::normalize(combined),
            nullable: false,
        }
    }

    /// `substring(v, i, j)`: precise only when the first brick is a
    /// `(S, 1, 1)` whose strings are all at least `j` long; otherwise top.
    pub fn substring(&self, i: usize, j: usize) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        if self.is_top() {
            return Self::top();
        }
        let normalized = self.normalized();
        if let Some(first) = normalized.bricks.first() {
            if first.min == 1 && first.max == Some(1) && first.strings.iter().all(|s| s.chars().count() >= j) {
                let extracted: BTreeSet<String> = first
                    .strings
                    .iter()
                    .map(|s| s.chars().skip(i).take(j - i).collect())
                    .collect();
                return Self {
                    bricks: vec![Brick::new(extracted, 1, Some(1))],
                    nullable: false,
                };
            }
        }
        Self::top()
    }

    /// `(minLen, maxLen)` as an [`IntervalValue`] (`maxLen = +inf` when any
    /// brick is unbounded).
    pub fn length(&self) -> IntervalValue {
        if self.is_bottom() {
            return IntervalValue::bottom();
        }
        if self.is_top() {
            return IntervalValue::new(
                crate::domain::interval::ExtInt::Finite(0),
                crate::domain::interval::ExtInt::PosInf,
                false,
            );
        }
        let mut min_total: i64 = 0;
        let mut max_total: i64 = 0;
        let mut unbounded = false;
        for b in &self.bricks {
            min_total += b.min_length() as i64;
            match b.max_length() {
                Some(m) => max_total += m as i64,
                None => unbounded = true,
            }
        }
        IntervalValue::new(
            crate::domain::interval::ExtInt::Finite(min_total),
            if unbounded {
                crate::domain::interval::ExtInt::PosInf
            } else {
                crate::domain::interval::ExtInt::Finite(max_total)
            },
            false,
        )
    }

    /// The exact concrete string this value represents, if it is a
    /// singleton `(S, 1, 1)` brick list with a single tracked string. Used
    /// by call sites that need a literal `&str` to hand to
    /// [`Self::starts_with`]/[`Self::ends_with`]/[`Self::contains`] for a
    /// non-constant argument.
    pub fn as_literal(&self) -> Option<String> {
        if self.bricks.len() == 1 && self.bricks[0].min == 1 && self.bricks[0].max == Some(1) && self.bricks[0].strings.len() == 1 {
            return self.bricks[0].strings.iter().next().cloned();
        }
        None
    }

    /// `isEmpty()`.
    pub fn is_empty(&self) -> Ternary {
        if self.is_bottom() || self.is_top() {
            return Ternary::Unknown;
        }
        let len = self.length();
        if len.hi() == crate::domain::interval::ExtInt::Finite(0) {
            return Ternary::True;
        }
        if matches!(len.lo(), crate::domain::interval::ExtInt::Finite(v) if v > 0) {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// `contains(sub)`: true if some brick with `min >= 1` has every string
    /// in its set containing `sub`; false if no brick string contains it
    /// anywhere; else unknown.
    pub fn contains(&self, sub: &str) -> Ternary {
        if self.is_bottom() || self.is_top() {
            return Ternary::Unknown;
        }
        for b in &self.bricks {
            if b.min >= 1 && !b.strings.is_empty() && b.strings.iter().all(|s| s.contains(sub)) {
                return Ternary::True;
            }
        }
        let has_top_brick = self.bricks.iter().any(|b| b.is_top_brick());
        if !has_top_brick && self.bricks.iter().all(|b| b.strings.iter().all(|s| !s.contains(sub))) {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// `startsWith(p)`.
    pub fn starts_with(&self, p: &str) -> Ternary {
        if self.is_bottom() || self.is_top() {
            return Ternary::Unknown;
        }
        if let Some(first) = self.bricks.first() {
            if first.min >= 1 && !first.strings.is_empty() && first.strings.iter().all(|s| s.starts_with(p)) {
                return Ternary::True;
            }
        }
        if self.bricks.iter().all(|b| !b.is_top_brick())
            && self.bricks.iter().all(|b| b.strings.iter().all(|s| !s.starts_with(p) && !p.starts_with(s.as_str())))
        {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// `endsWith(s)`, symmetric to `starts_with`.
    pub fn ends_with(&self, suffix: &str) -> Ternary {
        if self.is_bottom() || self.is_top() {
            return Ternary::Unknown;
        }
        if let Some(last) = self.bricks.last() {
            if last.min >= 1 && !last.strings.is_empty() && last.strings.iter().all(|s| s.ends_with(suffix)) {
                return Ternary::True;
            }
        }
        if self.bricks.iter().all(|b| !b.is_top_brick())
            && self.bricks.iter().all(|b| b.strings.iter().all(|s| !s.ends_with(suffix) && !suffix.ends_with(s.as_str())))
        {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// `equals(other)`: true for identical single-string singletons, false
    /// when the two are provably disjoint by length, else unknown.
    pub fn equals(&self, other: &Self) -> Ternary {
        if self.is_bottom() || other.is_bottom() || self.is_top() || other.is_top() {
            return Ternary::Unknown;
        }
        if self.bricks.len() == 1
            && other.bricks.len() == 1
            && self.bricks[0].min == 1
            && self.bricks[0].max == Some(1)
            && other.bricks[0].min == 1
            && other.bricks[0].max == Some(1)
            && self.bricks[0].strings.len() == 1
            && self.bricks[0].strings == other.bricks[0].strings
        {
            return Ternary::True;
        }
        let (smin, smax) = interval_endpoints(&self.length());
        let (omin, omax) = interval_endpoints(&other.length());
        if smax < omin || omax < smin {
            return Ternary::False;
        }
        Ternary::Unknown
    }

    /// Join (LUB) (spec §4.4): align by padding the shorter list with empty
    /// bricks wherever bricks differ, join per position, normalize.
    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        if self.is_top() || other.is_top() {
            return Self {
                bricks: Self::top().bricks,
                nullable: self.nullable || other.nullable,
            };
        }
        let a = Self::normalize(self.bricks.clone());
        let b = Self::normalize(other.bricks.clone());
        let (aligned_a, aligned_b) = align_brick_lists(&a, &b);
        let joined: Vec<Brick> = aligned_a.iter().zip(aligned_b.iter()).map(|(x, y)| brick_lub(x, y)).collect();
        Self {
            bricks: Self::normalize(joined),
            nullable: self.nullable || other.nullable,
        }
    }

    /// Widening (spec §4.4): three independent height bounds keep the
    /// lattice finite — list length, per-brick string-set size, and
    /// per-brick count span.
    pub fn widen(&self, other: &Self, max_list_length: usize, max_string_count: usize, max_index_range: usize) -> Self {
        if other.bricks.len() > max_list_length {
            return Self {
                bricks: Self::top().bricks,
                nullable: self.nullable || other.nullable,
            };
        }
        let joined = self.join(other);
        if joined.is_top() {
            return joined;
        }
        let widened: Vec<Brick> = joined
            .bricks
            .into_iter()
            .map(|b| {
                if b.strings.len() > max_string_count {
                    return Brick::new([".*".to_string()].into_iter().collect(), 0, None);
                }
                let span = match b.max {
                    Some(m) => m.saturating_sub(b.min),
                    None => usize::MAX,
                };
                if span > max_index_range {
                    return Brick::new(b.strings, 0, None);
                }
                b
            })
            .collect();
        Self {
            bricks: widened,
            nullable: joined.nullable,
        }
    }
}

fn interval_endpoints(v: &IntervalValue) -> (i64, i64) {
    use crate::domain::interval::ExtInt;
    let lo = match v.lo() {
        ExtInt::Finite(x) => x,
        ExtInt::NegInf => i64::MIN,
        ExtInt::PosInf => i64::MAX,
    };
    let hi = match v.hi() {
        ExtInt::Finite(x) => x,
        ExtInt::NegInf => i64::MIN,
        ExtInt::PosInf => i64::MAX,
    };
    (lo, hi)
}

fn normalize_pass(bricks: Vec<Brick>) -> (Vec<Brick>, bool) {
    let mut changed = false;
    let mut result: Vec<Brick> = Vec::new();
    let mut i = 0;
    while i < bricks.len() {
        let brick = &bricks[i];

        // Rule 1: drop empty brick.
        if brick.is_empty_brick() {
            changed = true;
            i += 1;
            continue;
        }

        // Rule 2: (S, n, n), n > 1 -> (S^n, 1, 1).
        if brick.max == Some(brick.min) && brick.min > 1 {
            let expanded = expand_strings(&brick.strings, brick.min);
            result.push(Brick::new(expanded, 1, Some(1)));
            changed = true;
            i += 1;
            continue;
        }

        // Rule 3: adjacent identical string sets merge their counts.
        if i + 1 < bricks.len() && bricks[i + 1].strings == brick.strings {
            let next = &bricks[i + 1];
            let max = match (brick.max, next.max) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            };
            result.push(Brick::new(brick.strings.clone(), brick.min + next.min, max));
            changed = true;
            i += 2;
            continue;
        }

        // Rule 4: (S, m, M), m > 1, M != m -> (S^m, 1, 1) . (S, 0, M-m).
        if brick.min > 1 && brick.max != Some(brick.min) {
            let expanded = expand_strings(&brick.strings, brick.min);
            result.push(Brick::new(expanded, 1, Some(1)));
            let new_max = brick.max.map(|m| m - brick.min);
            result.push(Brick::new(brick.strings.clone(), 0, new_max));
            changed = true;
            i += 1;
            continue;
        }

        // Rule 5: two adjacent (., 1, 1) bricks merge pairwise.
        if brick.min == 1 && brick.max == Some(1) && i + 1 < bricks.len() {
            let next = &bricks[i + 1];
            if next.min == 1 && next.max == Some(1) {
                let merged = concat_string_sets(&brick.strings, &next.strings);
                result.push(Brick::new(merged, 1, Some(1)));
                changed = true;
                i += 2;
                continue;
            }
        }

        result.push(brick.clone());
        i += 1;
    }
    (result, changed)
}

fn align_brick_lists(a: &[Brick], b: &[Brick]) -> (Vec<Brick>, Vec<Brick>) {
    if a.len() == b.len() {
        return (a.to_vec(), b.to_vec());
    }
    let (shorter, longer, shorter_is_a) = if a.len() < b.len() { (a, b, true) } else { (b, a, false) };

    let empty_brick = Brick::new([String::new()].into_iter().collect(), 0, Some(0));
    let mut aligned_shorter = Vec::with_capacity(longer.len());
    let mut shorter_idx = 0;
    for longer_brick in longer {
        if shorter_idx < shorter.len() && shorter[shorter_idx] == *longer_brick {
            aligned_shorter.push(shorter[shorter_idx].clone());
            shorter_idx += 1;
        } else {
            aligned_shorter.push(empty_brick.clone());
        }
    }
    while shorter_idx < shorter.len() {
        aligned_shorter.push(shorter[shorter_idx].clone());
        shorter_idx += 1;
    }

    if shorter_is_a {
        (aligned_shorter, longer.to_vec())
    } else {
        (longer.to_vec(), aligned_shorter)
    }
}

fn brick_lub(a: &Brick, b: &Brick) -> Brick {
    let strings: BTreeSet<String> = a.strings.union(&b.strings).cloned().collect();
    let min = a.min.min(b.min);
    let max = match (a.max, b.max) {
        (Some(x), Some(y)) => Some(x.max(y)),
        _ => None,
    };
    Brick::new(strings, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singleton(s: &str) -> Brick {
        Brick::new([s.to_string()].into_iter().collect(), 1, Some(1))
    }

    #[test]
    fn normalizes_adjacent_singletons_by_concatenation() {
        let bricks = vec![singleton("a"), singleton("a")];
        let normalized = BricksValue::normalize(bricks);
        assert_eq!(normalized, vec![singleton("aa")]);
    }

    #[test]
    fn normalizes_exact_repeat_count() {
        let bricks = vec![Brick::new(["a".to_string()].into_iter().collect(), 2, Some(2))];
        let normalized = BricksValue::normalize(bricks);
        assert_eq!(normalized, vec![singleton("aa")]);
    }

    #[test]
    fn normalizes_ranged_repeat_count() {
        let bricks = vec![Brick::new(["a".to_string()].into_iter().collect(), 2, Some(3))];
        let normalized = BricksValue::normalize(bricks);
        assert_eq!(
            normalized,
            vec![
                singleton("aa"),
                Brick::new(["a".to_string()].into_iter().collect(), 0, Some(1)),
            ]
        );
    }

    #[test]
    fn widening_collapses_long_list_to_top() {
        let old = BricksValue {
            bricks: vec![],
            nullable: false,
        };
        let many: Vec<Brick> = (0..11).map(|i| singleton(&i.to_string())).collect();
        let new = BricksValue {
            bricks: many,
            nullable: false,
        };
        let widened = old.widen(&new, 10, 5, 10);
        assert!(widened.is_top());
    }

    #[test]
    fn widening_collapses_large_string_set_brick() {
        let strings: BTreeSet<String> = (0..6).map(|i| i.to_string()).collect();
        let brick = Brick::new(strings, 1, Some(1));
        let old = BricksValue {
            bricks: vec![],
            nullable: false,
        };
        let new = BricksValue {
            bricks: vec![brick],
            nullable: false,
        };
        let widened = old.widen(&new, 10, 5, 10);
        assert_eq!(widened.bricks.len(), 1);
        assert!(widened.bricks[0].is_top_brick());
    }

    #[test]
    fn concat_normalizes_result() {
        let a = BricksValue::from_concrete("a");
        let b = BricksValue::from_concrete("a");
        let c = a.concat(&b);
        assert_eq!(c.bricks, vec![singleton("aa")]);
    }
}
