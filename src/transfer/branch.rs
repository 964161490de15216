//! Conditional-branch opcodes: `ifeq`/`ifne`/.../`if_icmp*`/`ifnull`/`ifnonnull`
//! (spec §4.8).
//!
//! Each produces up to two successor states — taken and fallthrough — with
//! the branch condition's local refined on whichever local the preceding
//! `iload`/`aload` pushed (frames don't otherwise remember which local
//! produced a stack value, so this is a best-effort heuristic: a branch
//! fed by anything other than a bare load is refined on the stack value
//! only, with no local-narrowing). A side whose refined value collapses to
//! lattice bottom is infeasible and is dropped rather than enqueued.

use crate::domain::{Relation, Value};
use crate::error::AnalysisResult;
use crate::frame::{Frame, State};
use crate::instr::{Instruction, IntCmp, LocalIndex, Pc, ZeroCmp};
use crate::outcome::ErrorKind;

use super::control::reaches_assertion_pattern;
use super::{StepContext, StepOutput};

fn zero_cmp_relations(cmp: ZeroCmp) -> (Relation, Relation) {
    match cmp {
        ZeroCmp::Eq => (Relation::EqZero, Relation::NeZero),
        ZeroCmp::Ne => (Relation::NeZero, Relation::EqZero),
        ZeroCmp::Lt => (Relation::LtZero, Relation::GeZero),
        ZeroCmp::Ge => (Relation::GeZero, Relation::LtZero),
        ZeroCmp::Gt => (Relation::GtZero, Relation::LeZero),
        ZeroCmp::Le => (Relation::LeZero, Relation::GtZero),
    }
}

fn int_cmp_relations(cmp: IntCmp) -> (Relation, Relation) {
    match cmp {
        IntCmp::Eq => (Relation::EqZero, Relation::NeZero),
        IntCmp::Ne => (Relation::NeZero, Relation::EqZero),
        IntCmp::Lt => (Relation::LtZero, Relation::GeZero),
        IntCmp::Ge => (Relation::GeZero, Relation::LtZero),
        IntCmp::Gt => (Relation::GtZero, Relation::LeZero),
        IntCmp::Le => (Relation::LeZero, Relation::GtZero),
    }
}

/// The local a bare `iload`/`aload` immediately before `pc` reads, if any.
fn preceding_load_local(program: &[(Pc, Instruction)], pc: Pc) -> Option<LocalIndex> {
    let idx = program.iter().position(|(p, _)| *p == pc)?;
    let (_, prev) = program.get(idx.checked_sub(1)?)?;
    match prev {
        Instruction::ILoad(l) | Instruction::ALoad(l) => Some(*l),
        _ => None,
    }
}

/// Builds the refined successor frame. `frame` is the post-pop frame (the
/// caller already popped the compared value off it before calling this), so
/// this only pushes the refined replacement back — it must not pop again.
fn refine_frame(frame: &Frame, local: Option<LocalIndex>, refined: Value) -> Frame {
    let mut out = frame.clone();
    out.push(refined.clone());
    if let Some(l) = local {
        out.store(l, refined);
    }
    out
}

/// Appends a possible-assertion-error warning when the branch side starting
/// at `target` can reach the `new AssertionError; <init>; athrow` pattern
/// within the configured scan window.
fn maybe_assertion_warning(program: &[(Pc, Instruction)], target: Pc, cfg: &crate::consts::AnalysisConfig, warnings: &mut Vec<ErrorKind>) {
    if reaches_assertion_pattern(program, target, cfg.assertion_scan_window) {
        warnings.push(ErrorKind::AssertionError);
    }
}

/// `ifeq`/`ifne`/`iflt`/`ifge`/`ifgt`/`ifle`: pop a numeric value, compare to zero.
pub fn if_zero_cmp(ctx: &StepContext, mut frame: Frame, cmp: ZeroCmp, target: Pc) -> AnalysisResult<StepOutput> {
    let top = frame.pop(ctx.pc, "if<zero-cmp>")?;
    let local = preceding_load_local(ctx.program, ctx.pc);
    let (taken_rel, fall_rel) = zero_cmp_relations(cmp);

    let mut successors = Vec::new();
    let mut warnings = Vec::new();

    let taken_value = top.refine_zero_cmp(taken_rel);
    if !taken_value.is_bottom() {
        let f = refine_frame(&frame, local, taken_value);
        successors.push(State::new(target, f));
        maybe_assertion_warning(ctx.program, target, ctx.cfg, &mut warnings);
    }

    let fall_value = top.refine_zero_cmp(fall_rel);
    if !fall_value.is_bottom() {
        if let Some(pc) = ctx.next_pc {
            let f = refine_frame(&frame, local, fall_value);
            successors.push(State::new(pc, f));
            maybe_assertion_warning(ctx.program, pc, ctx.cfg, &mut warnings);
        }
    }

    Ok(StepOutput { successors, outcome: None, warnings })
}

/// `if_icmpeq`/.../`if_icmple`: pop two numeric values, compare `a <cmp> b`.
///
/// Feasibility is decided on the abstract difference `a - b` relative to
/// zero; the operands themselves aren't individually narrowed (narrowing a
/// difference back onto two independent values isn't generally sound with
/// only a sum-type dispatcher to hand), so both successor frames carry the
/// original (unrefined) operands.
pub fn if_icmp(ctx: &StepContext, mut frame: Frame, cmp: IntCmp, target: Pc) -> AnalysisResult<StepOutput> {
    let b = frame.pop(ctx.pc, "if_icmp")?;
    let a = frame.pop(ctx.pc, "if_icmp")?;
    let diff = a.sub(&b);
    let (taken_rel, fall_rel) = int_cmp_relations(cmp);

    let mut successors = Vec::new();
    let mut warnings = Vec::new();

    if !diff.refine_zero_cmp(taken_rel).is_bottom() {
        successors.push(State::new(target, frame.clone()));
        maybe_assertion_warning(ctx.program, target, ctx.cfg, &mut warnings);
    }
    if !diff.refine_zero_cmp(fall_rel).is_bottom() {
        if let Some(pc) = ctx.next_pc {
            successors.push(State::new(pc, frame.clone()));
            maybe_assertion_warning(ctx.program, pc, ctx.cfg, &mut warnings);
        }
    }

    Ok(StepOutput { successors, outcome: None, warnings })
}

/// `ifnull`/`ifnonnull`: pop a string-reference value, test nullity.
pub fn if_null(ctx: &StepContext, mut frame: Frame, target: Pc, is_ifnull: bool) -> AnalysisResult<StepOutput> {
    let top = frame.pop(ctx.pc, "if<null-cmp>")?;
    let local = preceding_load_local(ctx.program, ctx.pc);

    let (null_target, not_null_target) = if is_ifnull {
        (Some(target), ctx.next_pc)
    } else {
        (ctx.next_pc, Some(target))
    };

    let mut successors = Vec::new();
    let mut warnings = Vec::new();

    if !top.is_definitely_not_null() {
        if let Some(pc) = null_target {
            let null_value = Value::null_string(ctx.cfg);
            let refined = if top.is_string() { null_value } else { top.clone() };
            let f = refine_frame(&frame, local, refined);
            successors.push(State::new(pc, f));
            maybe_assertion_warning(ctx.program, pc, ctx.cfg, &mut warnings);
        }
    }

    if !top.is_definitely_null() {
        if let Some(pc) = not_null_target {
            let refined = top.set_not_null();
            let f = refine_frame(&frame, local, refined);
            successors.push(State::new(pc, f));
            maybe_assertion_warning(ctx.program, pc, ctx.cfg, &mut warnings);
        }
    }

    Ok(StepOutput { successors, outcome: None, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;

    fn ctx<'a>(instr: &'a Instruction, cfg: &'a AnalysisConfig, program: &'a [(Pc, Instruction)]) -> StepContext<'a> {
        StepContext { pc: 0, instr, cfg, next_pc: Some(1), program }
    }

    #[test]
    fn ifeq_on_definite_zero_has_only_taken_branch() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IfZeroCmp(ZeroCmp::Eq, 10);
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(0, &cfg));
        let out = if_zero_cmp(&ctx(&instr, &cfg, &[]), frame, ZeroCmp::Eq, 10).unwrap();
        assert_eq!(out.successors.len(), 1);
        assert_eq!(out.successors[0].pc, 10);
    }

    #[test]
    fn ifeq_on_top_value_has_both_branches() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IfZeroCmp(ZeroCmp::Eq, 10);
        let mut frame = Frame::new();
        frame.push(Value::top_numeric(&cfg));
        let out = if_zero_cmp(&ctx(&instr, &cfg, &[]), frame, ZeroCmp::Eq, 10).unwrap();
        assert_eq!(out.successors.len(), 2);
    }

    #[test]
    fn ifnull_on_definitely_not_null_only_falls_through() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IfNull(10);
        let mut frame = Frame::new();
        frame.push(Value::concrete_string("x", &cfg));
        let out = if_null(&ctx(&instr, &cfg, &[]), frame, 10, true).unwrap();
        assert_eq!(out.successors.len(), 1);
        assert_eq!(out.successors[0].pc, 1);
    }

    // Stack height exactly 1 before the branch (the ordinary `if (x == 0)`
    // shape): refine_frame must not underflow by popping a second time.
    #[test]
    fn ifeq_with_single_stack_slot_produces_both_successor_frames() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IfZeroCmp(ZeroCmp::Eq, 10);
        let mut frame = Frame::new();
        frame.push(Value::top_numeric(&cfg));
        let out = if_zero_cmp(&ctx(&instr, &cfg, &[]), frame, ZeroCmp::Eq, 10).unwrap();
        assert_eq!(out.successors.len(), 2);
        for s in &out.successors {
            assert_eq!(s.frame.stack_height(), 1);
        }
    }

    // A value below the compared one must survive untouched, not be
    // clobbered by the refined value.
    #[test]
    fn refine_frame_preserves_unrelated_stack_slots() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IfZeroCmp(ZeroCmp::Eq, 10);
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(99, &cfg));
        frame.push(Value::top_numeric(&cfg));
        let out = if_zero_cmp(&ctx(&instr, &cfg, &[]), frame, ZeroCmp::Eq, 10).unwrap();
        for s in &out.successors {
            let mut f = s.frame.clone();
            assert_eq!(f.stack_height(), 2);
            f.pop(0, "t0").unwrap(); // the refined compared value
            assert_eq!(f.pop(0, "t1").unwrap(), Value::concrete_int(99, &cfg));
        }
    }
}
