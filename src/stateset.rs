//! StateSet / worklist engine (spec §4.7): a per-PC state table plus a
//! queue of PCs pending re-processing.

use std::collections::{BTreeSet, VecDeque};

use crate::consts::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::frame::State;
use crate::instr::{Instruction, Pc};

/// Map from PC to the joined [`State`] stored there, plus a FIFO worklist
/// of PCs whose stored state changed since it was last popped (spec §3
/// invariant: "a PC is on the worklist iff its stored state was updated
/// since last popped").
#[derive(Debug, Default)]
pub struct StateSet {
    states: std::collections::BTreeMap<Pc, State>,
    queue: VecDeque<Pc>,
    queued: BTreeSet<Pc>,
}

impl StateSet {
    /// An empty state set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stored state at `state.pc` and mark it pending.
    pub fn add_initial(&mut self, state: State) {
        let pc = state.pc;
        self.states.insert(pc, state);
        self.enqueue(pc);
    }

    fn enqueue(&mut self, pc: Pc) {
        if self.queued.insert(pc) {
            self.queue.push_back(pc);
        }
    }

    /// Merge `new_state` into whatever is stored at `new_state.pc`. Uses
    /// `widen` instead of `join` when `widen` is requested and the PC is a
    /// loop head (spec §4.7). Returns whether the stored state changed —
    /// callers re-enqueue nothing themselves; a change re-queues the PC
    /// automatically.
    pub fn update(
        &mut self,
        new_state: State,
        widen: bool,
        loop_heads: &BTreeSet<Pc>,
        constants: &[i64],
        cfg: &AnalysisConfig,
    ) -> AnalysisResult<bool> {
        let pc = new_state.pc;
        match self.states.get(&pc) {
            None => {
                self.states.insert(pc, new_state);
                self.enqueue(pc);
                Ok(true)
            }
            Some(stored) => {
                let merged = if widen && loop_heads.contains(&pc) {
                    stored.widen(&new_state, cfg, constants)?
                } else {
                    stored.join(&new_state, cfg)?
                };
                if &merged != stored {
                    self.states.insert(pc, merged);
                    self.enqueue(pc);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Pop the next pending PC and its currently stored state, draining the
    /// worklist one entry at a time. Returns `None` once the worklist is
    /// empty (fixpoint reached).
    pub fn pop(&mut self) -> Option<(Pc, State)> {
        let pc = self.queue.pop_front()?;
        self.queued.remove(&pc);
        let state = self.states.get(&pc).cloned()?;
        Some((pc, state))
    }

    /// `true` iff the worklist has no pending PCs.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The stored state at `pc`, if any has been recorded.
    pub fn get(&self, pc: Pc) -> Option<&State> {
        self.states.get(&pc)
    }
}

/// Loop-head detection (spec §4.7): any branch instruction whose target is
/// `<= ` its own PC is a back-edge; the target PC is a loop head. A
/// heuristic — see spec §9 — that misclassifies irreducible control flow
/// but holds for structured bytecode.
pub fn detect_loop_heads(instructions: &[(Pc, Instruction)]) -> BTreeSet<Pc> {
    let mut heads = BTreeSet::new();
    for (pc, instr) in instructions {
        if let Some(target) = branch_target(instr) {
            if target <= *pc {
                heads.insert(target);
            }
        }
    }
    heads
}

fn branch_target(instr: &Instruction) -> Option<Pc> {
    match instr {
        Instruction::IfZeroCmp(_, t) => Some(*t),
        Instruction::IfICmp(_, t) => Some(*t),
        Instruction::IfNull(t) => Some(*t),
        Instruction::IfNonNull(t) => Some(*t),
        Instruction::Goto(t) => Some(*t),
        _ => None,
    }
}

/// Widening constants (spec §4.7): the union of `{0}` with every integer
/// literal pushed by `iconst`/`bipush`/`sipush`/`ldc(int)`.
pub fn collect_widening_constants(instructions: &[(Pc, Instruction)]) -> Vec<i64> {
    let mut constants: BTreeSet<i64> = [0].into_iter().collect();
    for (_, instr) in instructions {
        match instr {
            Instruction::IConst(v) => {
                constants.insert(*v as i64);
            }
            Instruction::LdcInt(v) => {
                constants.insert(*v as i64);
            }
            _ => {}
        }
    }
    constants.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::IntervalValue;
    use crate::domain::Value;
    use crate::frame::Frame;
    use crate::instr::ZeroCmp;

    #[test]
    fn unseen_pc_is_stored_and_marked_changed() {
        let mut ss = StateSet::new();
        let cfg = AnalysisConfig::default();
        let changed = ss
            .update(State::new(0, Frame::new()), false, &BTreeSet::new(), &[], &cfg)
            .unwrap();
        assert!(changed);
        assert!(ss.get(0).is_some());
    }

    #[test]
    fn repeated_identical_update_reports_no_change() {
        let mut ss = StateSet::new();
        let cfg = AnalysisConfig::default();
        ss.add_initial(State::new(0, Frame::new()));
        ss.pop();
        let changed = ss
            .update(State::new(0, Frame::new()), false, &BTreeSet::new(), &[], &cfg)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn loop_head_detected_from_back_edge() {
        let instructions = vec![
            (0, Instruction::IConst(0)),
            (1, Instruction::IfZeroCmp(ZeroCmp::Ge, 0)),
        ];
        let heads = detect_loop_heads(&instructions);
        assert!(heads.contains(&0));
    }

    #[test]
    fn widening_constants_include_zero_and_literals() {
        let instructions = vec![(0, Instruction::IConst(10)), (1, Instruction::LdcInt(7))];
        let constants = collect_widening_constants(&instructions);
        assert!(constants.contains(&0));
        assert!(constants.contains(&10));
        assert!(constants.contains(&7));
    }

    #[test]
    fn widen_pushes_value_toward_infinity_past_constants() {
        let mut ss = StateSet::new();
        let cfg = AnalysisConfig::default();
        let mut loop_heads = BTreeSet::new();
        loop_heads.insert(5);

        let mut f0 = Frame::new();
        f0.store(0, Value::Interval(IntervalValue::from_concrete(0)));
        ss.add_initial(State::new(5, f0));
        ss.pop();

        let mut f1 = Frame::new();
        f1.store(0, Value::Interval(IntervalValue::from_concrete(1)));
        let changed = ss
            .update(State::new(5, f1), true, &loop_heads, &[0], &cfg)
            .unwrap();
        assert!(changed);
    }
}
