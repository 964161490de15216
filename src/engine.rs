//! The worklist-driven abstract interpreter (spec §3, §4.7, §4.9):
//! [`AbstractInterpreter`] owns one method's decoded instruction stream and
//! drives [`crate::stateset::StateSet`] to fixpoint, collecting terminal
//! outcomes and possible-error warnings along the way.

use std::collections::BTreeSet;

use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::consts::AnalysisConfig;
use crate::domain::Value;
use crate::error::{AnalysisError, AnalysisResult};
use crate::frame::{Frame, State};
use crate::instr::{Instruction, ParamType, Pc, RawInstruction};
use crate::outcome::{ErrorKind, PathOutcome};
use crate::stateset::{self, StateSet};
use crate::transfer::{self, StepContext};

/// Drives one method's worklist fixpoint and accumulates its results.
///
/// Mirrors the spec's state machine: idle (constructed) → running
/// (`analyze` draining the worklist) → done (worklist empty) or
/// done-with-warning (iteration budget exceeded). An instance owns its
/// [`StateSet`], path-outcome list, and error-warning list exclusively for
/// the duration of one `analyze` call; nothing here is shared across
/// instances, so two interpreters over the same method (e.g. Sign vs
/// Interval) may run on independent threads.
pub struct AbstractInterpreter {
    instructions: Vec<(Pc, Instruction)>,
    cfg: AnalysisConfig,
    /// Terminal outcomes recorded for explored paths (returns, definite
    /// errors, budget exhaustion).
    outcomes: Vec<PathOutcome>,
    /// Possible-error warnings recorded without halting exploration.
    warnings: Vec<ErrorKind>,
}

impl AbstractInterpreter {
    /// Decode `raw` once and build an interpreter over the result.
    pub fn new(raw: &[RawInstruction], cfg: AnalysisConfig) -> AnalysisResult<Self> {
        let instructions = raw.iter().map(|r| Ok((r.pc, r.decode()?))).collect::<AnalysisResult<Vec<_>>>()?;
        Ok(Self { instructions, cfg, outcomes: Vec::new(), warnings: Vec::new() })
    }

    /// Run the worklist to fixpoint, seeding `num_params` locals (indices
    /// `0..num_params`) at the top of their domain. `param_types` supplies
    /// each parameter's kind (defaulting to [`ParamType::Int`] when absent
    /// or shorter than `num_params`); `max_iterations` overrides the
    /// configured cap for this run only.
    #[tracing::instrument(name = "analyze", skip(self, param_types))]
    pub fn analyze(&mut self, num_params: usize, param_types: Option<&[ParamType]>, max_iterations: Option<usize>) -> AnalysisResult<()> {
        self.outcomes.clear();
        self.warnings.clear();

        let mut frame = Frame::new();
        for i in 0..num_params {
            let ty = param_types.and_then(|p| p.get(i)).copied().unwrap_or(ParamType::Int);
            let v = match ty {
                ParamType::Int => Value::top_numeric(&self.cfg),
                ParamType::StringRef => Value::top_string(&self.cfg),
            };
            frame.store(i as crate::instr::LocalIndex, v);
        }

        let loop_heads = stateset::detect_loop_heads(&self.instructions);
        let constants = stateset::collect_widening_constants(&self.instructions);
        let max_iter = max_iterations.unwrap_or(self.cfg.max_iterations);

        let mut worklist = StateSet::new();
        worklist.add_initial(State::new(0, frame));

        let mut iterations = 0usize;
        while let Some((pc, state)) = worklist.pop() {
            iterations += 1;
            if iterations > max_iter {
                tracing::warn!(pc, iterations, max_iter, "worklist iteration budget exceeded");
                self.outcomes.push(PathOutcome::Unknown);
                break;
            }

            let idx = self
                .instructions
                .iter()
                .position(|(p, _)| *p == pc)
                .ok_or(AnalysisError::PcOutOfRange { pc, len: self.instructions.len() })?;
            let next_pc = self.instructions.get(idx + 1).map(|(p, _)| *p);
            let ctx = StepContext { pc, instr: &self.instructions[idx].1, cfg: &self.cfg, next_pc, program: &self.instructions };

            let out = transfer::step(&ctx, state.frame)?;
            self.warnings.extend(out.warnings);
            if let Some(outcome) = out.outcome {
                self.outcomes.push(outcome);
            }
            for successor in out.successors {
                worklist.update(successor, true, &loop_heads, &constants, &self.cfg)?;
            }
        }

        tracing::debug!(outcomes = self.outcomes.len(), warnings = self.warnings.len(), "analysis reached fixpoint");
        Ok(())
    }

    /// Percentages over recorded path outcomes plus recorded warnings,
    /// quantised to integer percent (spec §4.9). Falls back to 100% `"ok"`
    /// only when both lists are empty (`analyze` hasn't run, or the method
    /// body is empty).
    pub fn get_error_probabilities(&self) -> std::collections::BTreeMap<String, u32> {
        let total = self.outcomes.len() + self.warnings.len();

        // Every reportable category appears in the table, at 0%, even when
        // never observed this run — a caller comparing two runs shouldn't
        // need to special-case a missing key.
        let mut counts: std::collections::BTreeMap<String, u64> = ["ok", "unknown"]
            .into_iter()
            .chain(ErrorKind::iter().map(|k| k.label()))
            .map(|label| (label.to_string(), 0))
            .collect();

        if total == 0 {
            *counts.get_mut("ok").expect("\"ok\" seeded above") = 1;
            return counts.into_iter().map(|(k, c)| (k, (c * 100) as u32)).collect();
        }

        for outcome in &self.outcomes {
            let label = match outcome {
                PathOutcome::Ok => "ok",
                PathOutcome::Error(kind) => kind.label(),
                PathOutcome::Unknown => "unknown",
            };
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        for warning in &self.warnings {
            *counts.entry(warning.label().to_string()).or_insert(0) += 1;
        }

        let total = total as u64;
        counts.into_iter().map(|(k, c)| (k, ((c * 100 + total / 2) / total) as u32)).collect()
    }

    /// The distinct [`ErrorKind`]s proven possible across every terminal
    /// outcome and warning recorded this run.
    pub fn get_error_set(&self) -> BTreeSet<ErrorKind> {
        let mut set = BTreeSet::new();
        for outcome in &self.outcomes {
            if let Some(kind) = outcome.error_kind() {
                set.insert(kind);
            }
        }
        set.extend(self.warnings.iter().copied());
        set
    }

    /// A priority-ordered, comma-joined label string over [`Self::get_error_set`]
    /// (spec §4.9), or `"ok"` when no error kind was ever observed.
    pub fn get_result_string(&self) -> String {
        let mut kinds: Vec<ErrorKind> = self.get_error_set().into_iter().collect();
        if kinds.is_empty() {
            return "ok".to_string();
        }
        kinds.sort_by_key(|k| k.priority());
        kinds.iter().map(|k| k.label()).join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Operand;

    fn raw(pc: Pc, opcode: &str, operands: Vec<Operand>) -> RawInstruction {
        RawInstruction { pc, opcode: opcode.to_string(), operands }
    }

    #[test]
    fn empty_method_falls_back_to_full_ok() {
        let program = vec![raw(0, "return", vec![])];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(0, None, None).unwrap();
        assert_eq!(interp.get_result_string(), "ok");
        assert_eq!(*interp.get_error_probabilities().get("ok").unwrap(), 100);
    }

    #[test]
    fn definite_divide_by_zero_is_sole_outcome() {
        let program = vec![
            raw(0, "iconst", vec![Operand::Int(4)]),
            raw(1, "iconst", vec![Operand::Int(0)]),
            raw(2, "idiv", vec![]),
            raw(3, "ireturn", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(0, None, None).unwrap();
        assert!(interp.get_error_set().contains(&ErrorKind::DivideByZero));
        assert!(interp.get_result_string().contains("divide by zero"));
    }

    #[test]
    fn possible_divide_by_zero_on_straight_line_path_also_records_ok() {
        let program = vec![
            raw(0, "iload", vec![Operand::Int(0)]),
            raw(1, "iload", vec![Operand::Int(1)]),
            raw(2, "idiv", vec![]),
            raw(3, "ireturn", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(2, Some(&[ParamType::Int, ParamType::Int]), None).unwrap();
        assert!(interp.get_error_set().contains(&ErrorKind::DivideByZero));
        let probs = interp.get_error_probabilities();
        assert!(probs.contains_key("ok"));
        assert!(probs.contains_key(ErrorKind::DivideByZero.label()));
    }

    // `iload_0; ifne L1; new AssertionError; dup; invokespecial <init>; athrow;
    // L1: return` with a top-int parameter: the "i == 0" side reaches the
    // assertion pattern, the other falls straight through to `return`.
    #[test]
    fn reachable_assertion_pattern_after_conditional_is_recorded_alongside_ok() {
        use crate::instr::MethodRef;

        let program = vec![
            raw(0, "iload", vec![Operand::Int(0)]),
            raw(1, "ifne", vec![Operand::Int(10)]),
            raw(
                2,
                "new",
                vec![Operand::Text("java/lang/AssertionError".to_string())],
            ),
            raw(3, "dup", vec![]),
            raw(
                4,
                "invokespecial",
                vec![Operand::Method(MethodRef::new(
                    "java/lang/AssertionError",
                    "<init>",
                    "()V",
                ))],
            ),
            raw(5, "athrow", vec![]),
            raw(10, "return", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(1, Some(&[ParamType::Int]), None).unwrap();
        assert!(interp.get_error_set().contains(&ErrorKind::AssertionError));
        let probs = interp.get_error_probabilities();
        assert!(*probs.get("ok").unwrap() > 0);
        assert!(*probs.get(ErrorKind::AssertionError.label()).unwrap() > 0);
    }

    // `iload_0; iconst_10; if_icmpge END; iload_0; iconst_1; iadd; istore_0;
    // goto LOOP; END: return` with a top-int parameter: widening at the loop
    // head must terminate the worklist and settle on `ok`.
    #[test]
    fn counting_loop_terminates_via_widening_and_settles_on_ok() {
        let program = vec![
            raw(0, "iload", vec![Operand::Int(0)]),
            raw(1, "iconst", vec![Operand::Int(10)]),
            raw(2, "if_icmpge", vec![Operand::Int(8)]),
            raw(3, "iload", vec![Operand::Int(0)]),
            raw(4, "iconst", vec![Operand::Int(1)]),
            raw(5, "iadd", vec![]),
            raw(6, "istore", vec![Operand::Int(0)]),
            raw(7, "goto", vec![Operand::Int(0)]),
            raw(8, "return", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(1, Some(&[ParamType::Int]), Some(10_000)).unwrap();
        assert_eq!(interp.get_result_string(), "ok");
        // A zero "unknown" share confirms the worklist reached a real
        // fixpoint rather than being cut off by the iteration budget.
        assert_eq!(*interp.get_error_probabilities().get("unknown").unwrap(), 0);
    }

    // `aload_0; invokevirtual String.length` with a possibly-null String
    // parameter: records both a possible null-pointer and a (non-negative)
    // length push on the surviving path, so both "ok" and the NPE warning
    // are recorded.
    #[test]
    fn string_length_on_possibly_null_parameter_records_npe_and_ok() {
        use crate::instr::MethodRef;

        let program = vec![
            raw(0, "aload", vec![Operand::Int(0)]),
            raw(
                1,
                "invokevirtual",
                vec![Operand::Method(MethodRef::new(
                    "java/lang/String",
                    "length",
                    "()I",
                ))],
            ),
            raw(2, "ireturn", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(1, Some(&[ParamType::StringRef]), None).unwrap();
        assert!(interp.get_error_set().contains(&ErrorKind::NullPointerException));
        let probs = interp.get_error_probabilities();
        assert!(*probs.get("ok").unwrap() > 0);
        assert!(*probs.get(ErrorKind::NullPointerException.label()).unwrap() > 0);
    }

    // `ldc "ab"; aload_1; invokevirtual String.concat; invokedynamic
    // makeConcatWithConstants; areturn` with a possibly-null second
    // parameter: the `concat` call alone already records a possible NPE.
    #[test]
    fn concat_chain_with_possibly_null_operand_records_npe() {
        use crate::instr::{ConcatDescriptor, MethodRef};

        let program = vec![
            raw(0, "ldc", vec![Operand::Ldc { ty: "string".to_string(), value: "ab".to_string() }]),
            raw(1, "aload", vec![Operand::Int(1)]),
            raw(
                2,
                "invokevirtual",
                vec![Operand::Method(MethodRef::new(
                    "java/lang/String",
                    "concat",
                    "(Ljava/lang/String;)Ljava/lang/String;",
                ))],
            ),
            raw(
                3,
                "invokedynamic",
                vec![Operand::Dynamic(ConcatDescriptor::from_values(vec![None]))],
            ),
            raw(4, "areturn", vec![]),
        ];
        let mut interp = AbstractInterpreter::new(&program, AnalysisConfig::default()).unwrap();
        interp.analyze(2, Some(&[ParamType::StringRef, ParamType::StringRef]), None).unwrap();
        assert!(interp.get_error_set().contains(&ErrorKind::NullPointerException));
    }
}
