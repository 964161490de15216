//! Frame and State (spec §4.6): the operand stack/locals snapshot the
//! transfer functions read and rewrite, and its pairing with a program
//! counter in the worklist.

use std::collections::BTreeMap;

use crate::consts::AnalysisConfig;
use crate::domain::Value;
use crate::error::{AnalysisError, AnalysisResult};
use crate::instr::{LocalIndex, Pc};

/// A map from local-variable index to abstract value, plus an ordered
/// operand stack. Frame clone is value-semantic: cloning copies the locals
/// map and the stack vector, but the [`Value`]s themselves are cheap,
/// immutable, shareable data.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    locals: BTreeMap<LocalIndex, Value>,
    stack: Vec<Value>,
}

impl Frame {
    /// An empty frame: no locals bound, empty stack.
    pub fn new() -> Self {
        Self {
            locals: BTreeMap::new(),
            stack: Vec::new(),
        }
    }

    /// Seed a frame with `locals` already bound (e.g. method parameters at
    /// their top abstraction) and an empty stack.
    pub fn with_locals(locals: BTreeMap<LocalIndex, Value>) -> Self {
        Self { locals, stack: Vec::new() }
    }

    /// Current operand-stack height.
    pub fn stack_height(&self) -> usize {
        self.stack.len()
    }

    /// Read a local. Errors if the local has never been stored to — a
    /// verifiable method never reads before writing (spec §7: internal
    /// invariant violations are hard failures, not abstract outcomes).
    pub fn load(&self, local: LocalIndex, pc: Pc) -> AnalysisResult<Value> {
        self.locals
            .get(&local)
            .cloned()
            .ok_or(AnalysisError::UninitializedLocal { pc, local })
    }

    /// Bind (or rebind) a local.
    pub fn store(&mut self, local: LocalIndex, value: Value) {
        self.locals.insert(local, value);
    }

    /// Push a value onto the operand stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top of the operand stack.
    pub fn pop(&mut self, pc: Pc, opcode: &'static str) -> AnalysisResult<Value> {
        self.stack.pop().ok_or(AnalysisError::StackUnderflow { pc, opcode })
    }

    /// Peek the top of the operand stack without removing it.
    pub fn peek(&self, pc: Pc, opcode: &'static str) -> AnalysisResult<&Value> {
        self.stack.last().ok_or(AnalysisError::StackUnderflow { pc, opcode })
    }

    /// Join two frames observed at the same PC. Requires equal stack
    /// height (spec §3 invariant); a mismatch means the instruction stream
    /// does not correspond to verifiable bytecode and is reported as a hard
    /// failure rather than silently patched.
    pub fn join(&self, other: &Self, pc: Pc, cfg: &AnalysisConfig) -> AnalysisResult<Self> {
        if self.stack.len() != other.stack.len() {
            return Err(AnalysisError::StackHeightMismatch {
                pc,
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }
        let stack = self
            .stack
            .iter()
            .zip(other.stack.iter())
            .map(|(a, b)| a.join(b, cfg))
            .collect();
        Ok(Self {
            locals: join_locals(&self.locals, &other.locals, cfg),
            stack,
        })
    }

    /// Widen `self` (the stored state) against `other` (the freshly
    /// computed successor) at a loop head.
    pub fn widen(&self, other: &Self, pc: Pc, cfg: &AnalysisConfig, constants: &[i64]) -> AnalysisResult<Self> {
        if self.stack.len() != other.stack.len() {
            return Err(AnalysisError::StackHeightMismatch {
                pc,
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }
        let stack = self
            .stack
            .iter()
            .zip(other.stack.iter())
            .map(|(a, b)| a.widen(b, cfg, constants))
            .collect();
        Ok(Self {
            locals: widen_locals(&self.locals, &other.locals, cfg, constants),
            stack,
        })
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

fn join_locals(a: &BTreeMap<LocalIndex, Value>, b: &BTreeMap<LocalIndex, Value>, cfg: &AnalysisConfig) -> BTreeMap<LocalIndex, Value> {
    let mut out = BTreeMap::new();
    for key in a.keys().chain(b.keys()) {
        if out.contains_key(key) {
            continue;
        }
        let merged = match (a.get(key), b.get(key)) {
            (Some(x), Some(y)) => x.join(y, cfg),
            (Some(x), None) => x.clone(),
            (None, Some(y)) => y.clone(),
            (None, None) => unreachable!("key came from one of the two maps"),
        };
        out.insert(*key, merged);
    }
    out
}

fn widen_locals(
    a: &BTreeMap<LocalIndex, Value>,
    b: &BTreeMap<LocalIndex, Value>,
    cfg: &AnalysisConfig,
    constants: &[i64],
) -> BTreeMap<LocalIndex, Value> {
    let mut out = BTreeMap::new();
    for key in a.keys().chain(b.keys()) {
        if out.contains_key(key) {
            continue;
        }
        let merged = match (a.get(key), b.get(key)) {
            (Some(x), Some(y)) => x.widen(y, cfg, constants),
            (Some(x), None) => x.clone(),
            (None, Some(y)) => y.clone(),
            (None, None) => unreachable!("key came from one of the two maps"),
        };
        out.insert(*key, merged);
    }
    out
}

/// A program point in the worklist: a PC paired with the [`Frame`]
/// observed there. Two states are equal iff same PC and structurally
/// equal frame (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Program counter.
    pub pc: Pc,
    /// The frame observed at `pc`.
    pub frame: Frame,
}

impl State {
    /// Construct a state.
    pub fn new(pc: Pc, frame: Frame) -> Self {
        Self { pc, frame }
    }

    /// Join two states at the same PC.
    pub fn join(&self, other: &Self, cfg: &AnalysisConfig) -> AnalysisResult<Self> {
        debug_assert_eq!(self.pc, other.pc, "State::join requires equal PCs");
        Ok(Self {
            pc: self.pc,
            frame: self.frame.join(&other.frame, self.pc, cfg)?,
        })
    }

    /// Widen `self` against `other` at the same PC.
    pub fn widen(&self, other: &Self, cfg: &AnalysisConfig, constants: &[i64]) -> AnalysisResult<Self> {
        debug_assert_eq!(self.pc, other.pc, "State::widen requires equal PCs");
        Ok(Self {
            pc: self.pc,
            frame: self.frame.widen(&other.frame, self.pc, cfg, constants)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::{ExtInt, IntervalValue};

    #[test]
    fn join_requires_equal_stack_height() {
        let cfg = AnalysisConfig::default();
        let mut a = Frame::new();
        a.push(Value::Interval(IntervalValue::from_concrete(1)));
        let b = Frame::new();
        assert!(matches!(a.join(&b, 0, &cfg), Err(AnalysisError::StackHeightMismatch { .. })));
    }

    #[test]
    fn join_carries_local_present_on_only_one_side() {
        let cfg = AnalysisConfig::default();
        let mut a = Frame::new();
        a.store(0, Value::Interval(IntervalValue::from_concrete(1)));
        let b = Frame::new();
        let joined = a.join(&b, 0, &cfg).unwrap();
        assert_eq!(joined.load(0, 0).unwrap(), Value::Interval(IntervalValue::from_concrete(1)));
    }

    #[test]
    fn load_before_store_is_a_hard_error() {
        let f = Frame::new();
        assert!(matches!(f.load(3, 10), Err(AnalysisError::UninitializedLocal { local: 3, pc: 10 })));
    }

    #[test]
    fn join_widens_stack_values_pointwise() {
        let cfg = AnalysisConfig::default();
        let mut a = Frame::new();
        a.push(Value::Interval(IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(1), false)));
        let mut b = Frame::new();
        b.push(Value::Interval(IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(2), false)));
        let joined = a.join(&b, 0, &cfg).unwrap();
        assert_eq!(
            joined.peek(0, "test").unwrap(),
            &Value::Interval(IntervalValue::new(ExtInt::Finite(0), ExtInt::Finite(2), false))
        );
    }
}
