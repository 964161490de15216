//! Tunable parameters for the analyzer.
//!
//! Mirrors the way the reference interpreter centralizes VM parameters as
//! named constants: every magic number called out in the spec (lattice
//! height bounds, iteration caps, scan windows) lives here with its default,
//! and is threaded through [`crate::engine::AbstractInterpreter`] as an
//! [`AnalysisConfig`] rather than hardcoded in the transfer functions.

/// Bound on tracked prefix/suffix length for the Prefix/Suffix string domain.
pub const DEFAULT_DP: usize = 3;

/// Bound on tracked string length for the Prefix/Suffix string domain.
pub const DEFAULT_LMAX: usize = 100;

/// Bricks widening: maximum number of bricks before collapsing to top.
pub const DEFAULT_MAX_LIST_LENGTH: usize = 10;

/// Bricks widening: maximum distinct strings per brick before collapsing
/// that brick's string set to `.*`.
pub const DEFAULT_MAX_STRING_COUNT: usize = 5;

/// Bricks widening: maximum `max - min` count span before relaxing a
/// brick's count range to `(0, ∞)`.
pub const DEFAULT_MAX_INDEX_RANGE: usize = 10;

/// Hard cap on worklist iterations; exceeding it yields a
/// `done-with-warning` result instead of looping forever on a bug.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Forward-scan window (in instructions) used to detect the
/// `new AssertionError; <init>; athrow` pattern following a branch.
/// The spec documents 6/25/40-instruction compromises; this crate exposes
/// it as a knob rather than picking one constant for all callers.
pub const DEFAULT_ASSERTION_SCAN_WINDOW: usize = 40;

/// Which numeric domain a run uses for `int` locals and stack slots.
/// Selects between the two lattices of spec §4.1/§4.2 (mirrors the `--abs
/// int` CLI mode of the out-of-scope collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericDomainKind {
    /// The 3-element Sign lattice.
    Sign,
    /// The extended-integer Interval lattice.
    Interval,
}

/// Which string domain a run uses for `String` locals and stack slots
/// (mirrors `--abs str`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringDomainKind {
    /// The bounded Prefix/Suffix lattice.
    PrefixSuffix,
    /// The Bricks lattice.
    Bricks,
}

/// Bundle of every tunable the engine consults, so a caller can reproduce a
/// run or tighten precision bounds without editing the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Numeric domain used for every `int` value this run.
    pub numeric_domain: NumericDomainKind,
    /// String domain used for every `String` value this run.
    pub string_domain: StringDomainKind,
    /// Prefix/Suffix domain: max tracked prefix/suffix length (`Dp`).
    pub dp: usize,
    /// Prefix/Suffix domain: max tracked string length (`Lmax`).
    pub lmax: usize,
    /// Bricks domain: max brick-list length before widening to top.
    pub max_list_length: usize,
    /// Bricks domain: max distinct strings per brick before widening.
    pub max_string_count: usize,
    /// Bricks domain: max count-range span before widening.
    pub max_index_range: usize,
    /// Worklist iteration cap.
    pub max_iterations: usize,
    /// Assertion-pattern forward-scan window, in instructions.
    pub assertion_scan_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            numeric_domain: NumericDomainKind::Interval,
            string_domain: StringDomainKind::Bricks,
            dp: DEFAULT_DP,
            lmax: DEFAULT_LMAX,
            max_list_length: DEFAULT_MAX_LIST_LENGTH,
            max_string_count: DEFAULT_MAX_STRING_COUNT,
            max_index_range: DEFAULT_MAX_INDEX_RANGE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            assertion_scan_window: DEFAULT_ASSERTION_SCAN_WINDOW,
        }
    }
}
