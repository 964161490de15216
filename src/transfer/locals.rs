//! Local-variable opcodes: `iload`/`istore`/`aload`/`astore`/`iinc` (spec §4.8).

use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::Frame;
use crate::instr::LocalIndex;

use super::{StepContext, StepOutput};

fn fallthrough(ctx: &StepContext, frame: Frame) -> StepOutput {
    StepOutput::fallthrough(ctx, frame)
}

/// `iload`: push the numeric local onto the stack.
pub fn i_load(ctx: &StepContext, mut frame: Frame, local: LocalIndex) -> AnalysisResult<StepOutput> {
    let v = frame.load(local, ctx.pc)?;
    frame.push(v);
    Ok(fallthrough(ctx, frame))
}

/// `istore`: pop the top of stack into a numeric local.
pub fn i_store(ctx: &StepContext, mut frame: Frame, local: LocalIndex) -> AnalysisResult<StepOutput> {
    let v = frame.pop(ctx.pc, "istore")?;
    frame.store(local, v);
    Ok(fallthrough(ctx, frame))
}

/// `aload`: push the string-reference local onto the stack.
pub fn a_load(ctx: &StepContext, mut frame: Frame, local: LocalIndex) -> AnalysisResult<StepOutput> {
    let v = frame.load(local, ctx.pc)?;
    frame.push(v);
    Ok(fallthrough(ctx, frame))
}

/// `astore`: pop the top of stack into a string-reference local.
pub fn a_store(ctx: &StepContext, mut frame: Frame, local: LocalIndex) -> AnalysisResult<StepOutput> {
    let v = frame.pop(ctx.pc, "astore")?;
    frame.store(local, v);
    Ok(fallthrough(ctx, frame))
}

/// `iinc local, delta`: add the constant `delta` to a numeric local in place.
pub fn i_inc(ctx: &StepContext, mut frame: Frame, local: LocalIndex, delta: i32) -> AnalysisResult<StepOutput> {
    let v = frame.load(local, ctx.pc)?;
    let incr = Value::concrete_int(delta as i64, ctx.cfg);
    frame.store(local, v.add(&incr));
    Ok(fallthrough(ctx, frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::instr::Instruction;

    #[test]
    fn istore_then_iload_roundtrips() {
        let cfg = AnalysisConfig::default();
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(7, &cfg));
        let instr = Instruction::IStore(0);
        let ctx = StepContext {
            pc: 0,
            instr: &instr,
            cfg: &cfg,
            next_pc: Some(1),
            program: &[],
        };
        let out = i_store(&ctx, frame, 0).unwrap();
        let frame = out.successors[0].frame.clone();
        assert_eq!(frame.load(0, 1).unwrap(), Value::concrete_int(7, &cfg));
    }

    #[test]
    fn iinc_adds_delta_in_place() {
        let cfg = AnalysisConfig::default();
        let mut frame = Frame::new();
        frame.store(0, Value::concrete_int(3, &cfg));
        let instr = Instruction::IInc(0, 4);
        let ctx = StepContext {
            pc: 0,
            instr: &instr,
            cfg: &cfg,
            next_pc: Some(1),
            program: &[],
        };
        let out = i_inc(&ctx, frame, 0, 4).unwrap();
        let frame = out.successors[0].frame.clone();
        assert_eq!(frame.load(0, 1).unwrap(), Value::concrete_int(7, &cfg));
    }
}
