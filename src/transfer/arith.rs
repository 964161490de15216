//! Arithmetic opcodes: `iadd`/`isub`/`imul`/`idiv`/`irem`/`ineg` (spec §4.8).
//!
//! Division and remainder are the only members of this family that can
//! terminate a path: a definite zero divisor is a terminal
//! [`PathOutcome::Error`]; a merely possible zero divisor is recorded as a
//! warning and the path continues with a top result (spec §4.8: "Division
//! `idiv`/`irem`").

use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::Frame;
use crate::outcome::{ErrorKind, PathOutcome};

use super::{StepContext, StepOutput};

fn fallthrough(ctx: &StepContext, frame: Frame) -> StepOutput {
    StepOutput::fallthrough(ctx, frame)
}

/// `iadd`/`isub`/`imul`: pop two operands, push `f(a, b)`.
pub fn binary(ctx: &StepContext, mut frame: Frame, opcode: &'static str, f: fn(&Value, &Value) -> Value) -> AnalysisResult<StepOutput> {
    let b = frame.pop(ctx.pc, opcode)?;
    let a = frame.pop(ctx.pc, opcode)?;
    frame.push(f(&a, &b));
    Ok(fallthrough(ctx, frame))
}

/// `ineg`: pop, negate, push.
pub fn neg(ctx: &StepContext, mut frame: Frame) -> AnalysisResult<StepOutput> {
    let v = frame.pop(ctx.pc, "ineg")?;
    frame.push(v.neg());
    Ok(fallthrough(ctx, frame))
}

/// `idiv`/`irem`: pop divisor `b`, dividend `a`.
///
/// - `b` definitely zero: terminal [`ErrorKind::DivideByZero`], no successor.
/// - `b` possibly zero: record the warning, push a top numeric result, and
///   continue (the path that eventually returns still counts as `ok`, per
///   spec scenario 2: "outcome includes possible divide-by-zero AND ok").
/// - otherwise: push the precise abstract quotient/remainder.
pub fn div_rem(ctx: &StepContext, mut frame: Frame, opcode: &'static str, is_rem: bool) -> AnalysisResult<StepOutput> {
    let b = frame.pop(ctx.pc, opcode)?;
    let a = frame.pop(ctx.pc, opcode)?;

    if b.is_definitely_zero() {
        return Ok(StepOutput {
            successors: Vec::new(),
            outcome: Some(PathOutcome::Error(ErrorKind::DivideByZero)),
            warnings: Vec::new(),
        });
    }

    if b.possibly_zero() {
        frame.push(Value::top_numeric(ctx.cfg));
        let mut out = fallthrough(ctx, frame);
        out.warnings.push(ErrorKind::DivideByZero);
        return Ok(out);
    }

    let result = if is_rem { a.rem(&b) } else { a.div(&b) };
    match result {
        Ok(v) => {
            frame.push(v);
            Ok(fallthrough(ctx, frame))
        }
        Err(_) => Ok(StepOutput {
            successors: Vec::new(),
            outcome: Some(PathOutcome::Error(ErrorKind::DivideByZero)),
            warnings: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::instr::Instruction;

    fn ctx<'a>(instr: &'a Instruction, cfg: &'a AnalysisConfig) -> StepContext<'a> {
        StepContext {
            pc: 0,
            instr,
            cfg,
            next_pc: Some(1),
            program: &[],
        }
    }

    #[test]
    fn definite_zero_divisor_is_terminal() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IDiv;
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(4, &cfg));
        frame.push(Value::concrete_int(0, &cfg));
        let out = div_rem(&ctx(&instr, &cfg), frame, "idiv", false).unwrap();
        assert!(out.successors.is_empty());
        assert_eq!(out.outcome, Some(PathOutcome::Error(ErrorKind::DivideByZero)));
    }

    #[test]
    fn possibly_zero_divisor_warns_and_continues() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IDiv;
        let mut frame = Frame::new();
        frame.push(Value::top_numeric(&cfg));
        frame.push(Value::top_numeric(&cfg));
        let out = div_rem(&ctx(&instr, &cfg), frame, "idiv", false).unwrap();
        assert_eq!(out.successors.len(), 1);
        assert_eq!(out.warnings, vec![ErrorKind::DivideByZero]);
    }

    #[test]
    fn definitely_nonzero_divisor_computes_precisely() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IDiv;
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(10, &cfg));
        frame.push(Value::concrete_int(2, &cfg));
        let out = div_rem(&ctx(&instr, &cfg), frame, "idiv", false).unwrap();
        assert_eq!(out.warnings, Vec::new());
        assert_eq!(out.successors[0].frame.peek(0, "t").unwrap(), &Value::concrete_int(5, &cfg));
    }
}
