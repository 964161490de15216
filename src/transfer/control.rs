//! Unconditional control-flow and object-identity opcodes: `goto`, `athrow`,
//! `new`, `getstatic`/`putstatic` (spec §4.8).

use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::{Frame, State};
use crate::instr::{Instruction, Pc};
use crate::outcome::{ErrorKind, PathOutcome};

use super::{StepContext, StepOutput};

/// `goto target`: unconditional jump, no fallthrough successor.
pub fn goto(ctx: &StepContext, frame: Frame, target: Pc) -> AnalysisResult<StepOutput> {
    let _ = ctx;
    Ok(StepOutput {
        successors: vec![State::new(target, frame)],
        outcome: None,
        warnings: Vec::new(),
    })
}

/// `new class`: push an opaque non-null reference. Object identity and
/// field state aren't modeled (spec Non-goals: "object/array heap
/// modeling"); the string domain's top-with-not-null stands in for "some
/// reference we otherwise know nothing about".
pub fn new_object(ctx: &StepContext, mut frame: Frame, class: &str) -> AnalysisResult<StepOutput> {
    let _ = class;
    frame.push(Value::top_string(ctx.cfg).set_not_null());
    match ctx.next_pc {
        Some(pc) => Ok(StepOutput {
            successors: vec![State::new(pc, frame)],
            outcome: None,
            warnings: Vec::new(),
        }),
        None => Ok(StepOutput::terminal(PathOutcome::Unknown)),
    }
}

/// `getstatic`/`putstatic`: collapsed into a single [`Instruction::StaticField`]
/// variant upstream with no get/put distinction and no field type, so
/// neither a push nor a pop can be done soundly here. A pure no-op
/// under-approximates the stack effect of `putstatic` (which pops one
/// value) — acceptable since static field access plays no role in any
/// tracked outcome (spec Non-goals: "full static/instance field model").
pub fn static_field(ctx: &StepContext, frame: Frame) -> AnalysisResult<StepOutput> {
    match ctx.next_pc {
        Some(pc) => Ok(StepOutput {
            successors: vec![State::new(pc, frame)],
            outcome: None,
            warnings: Vec::new(),
        }),
        None => Ok(StepOutput::terminal(PathOutcome::Unknown)),
    }
}

/// `athrow`: terminal. Classified as [`ErrorKind::AssertionError`] when the
/// thrown reference can be traced back to the nearest preceding `new
/// AssertionError`-shaped allocation within the scan window, else the
/// generic [`ErrorKind::Error`] bucket.
pub fn athrow(ctx: &StepContext, frame: Frame) -> AnalysisResult<StepOutput> {
    let _ = frame;
    let kind = if backward_reaches_assertion_new(ctx.program, ctx.pc, ctx.cfg.assertion_scan_window) {
        ErrorKind::AssertionError
    } else {
        ErrorKind::Error
    };
    Ok(StepOutput::terminal(PathOutcome::Error(kind)))
}

fn is_assertion_class(class: &str) -> bool {
    class == "java/lang/AssertionError" || class.ends_with("AssertionError")
}

/// Forward scan: does control starting at `start_pc` reach `new
/// AssertionError; invokespecial <init>; athrow` within `window`
/// instructions, without first hitting a `return`-family opcode (and,
/// absent an assertion `new` seen yet, without first hitting an
/// unconditional `goto` — a `goto` past the window's start is assumed to
/// leave the pattern to whatever is at its target, which this bounded scan
/// doesn't follow).
pub(crate) fn reaches_assertion_pattern(program: &[(Pc, Instruction)], start_pc: Pc, window: usize) -> bool {
    let Some(start_idx) = program.iter().position(|(p, _)| *p == start_pc) else {
        return false;
    };
    let mut seen_new = false;
    let mut seen_init = false;
    for (_, instr) in program.iter().skip(start_idx).take(window.max(1)) {
        match instr {
            Instruction::New(class) if is_assertion_class(class) => seen_new = true,
            Instruction::InvokeSpecial(m) if seen_new && m.name == "<init>" => seen_init = true,
            Instruction::AThrow if seen_init => return true,
            Instruction::Return | Instruction::IReturn | Instruction::AReturn => return false,
            Instruction::Goto(_) if !seen_new => return false,
            _ => {}
        }
    }
    false
}

/// Backward scan: is the nearest `new` allocation preceding `pc` (within
/// `window` instructions) an `AssertionError`?
fn backward_reaches_assertion_new(program: &[(Pc, Instruction)], pc: Pc, window: usize) -> bool {
    let Some(idx) = program.iter().position(|(p, _)| *p == pc) else {
        return false;
    };
    let start = idx.saturating_sub(window.max(1));
    for (_, instr) in program[start..idx].iter().rev() {
        if let Instruction::New(class) = instr {
            return is_assertion_class(class);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::instr::MethodRef;

    fn program() -> Vec<(Pc, Instruction)> {
        vec![
            (0, Instruction::New("java/lang/AssertionError".into())),
            (1, Instruction::Dup),
            (2, Instruction::InvokeSpecial(MethodRef::new("java/lang/AssertionError", "<init>", "()V"))),
            (3, Instruction::AThrow),
        ]
    }

    #[test]
    fn forward_scan_finds_assertion_pattern() {
        assert!(reaches_assertion_pattern(&program(), 0, 10));
    }

    #[test]
    fn backward_scan_classifies_athrow_as_assertion_error() {
        assert!(backward_reaches_assertion_new(&program(), 3, 10));
    }

    #[test]
    fn athrow_with_no_preceding_new_is_generic_error() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::AThrow;
        let prog = vec![(0, Instruction::AThrow)];
        let ctx = StepContext { pc: 0, instr: &instr, cfg: &cfg, next_pc: None, program: &prog };
        let out = athrow(&ctx, Frame::new()).unwrap();
        assert_eq!(out.outcome, Some(PathOutcome::Error(ErrorKind::Error)));
    }
}
