//! Constant-pushing opcodes: `iconst`/`bipush`/`sipush`/`ldc` (spec §4.8).

use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::Frame;

use super::{StepContext, StepOutput};

/// `iconst`/`bipush`/`sipush`: push a constant `int` abstracted into the
/// configured numeric domain.
pub fn i_const(ctx: &StepContext, mut frame: Frame, v: i32) -> AnalysisResult<StepOutput> {
    frame.push(Value::concrete_int(v as i64, ctx.cfg));
    Ok(fallthrough(ctx, frame))
}

/// `ldc` of an `int` constant.
pub fn ldc_int(ctx: &StepContext, mut frame: Frame, v: i32) -> AnalysisResult<StepOutput> {
    frame.push(Value::concrete_int(v as i64, ctx.cfg));
    Ok(fallthrough(ctx, frame))
}

/// `ldc` of a `String` constant. Constant-pool strings are never `null`.
pub fn ldc_string(ctx: &StepContext, mut frame: Frame, s: &str) -> AnalysisResult<StepOutput> {
    frame.push(Value::concrete_string(s, ctx.cfg));
    Ok(fallthrough(ctx, frame))
}

fn fallthrough(ctx: &StepContext, frame: Frame) -> StepOutput {
    StepOutput::fallthrough(ctx, frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::instr::Instruction;

    #[test]
    fn iconst_pushes_and_falls_through() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::IConst(5);
        let ctx = StepContext {
            pc: 0,
            instr: &instr,
            cfg: &cfg,
            next_pc: Some(1),
            program: &[],
        };
        let out = i_const(&ctx, Frame::new(), 5).unwrap();
        assert_eq!(out.successors.len(), 1);
        assert_eq!(out.successors[0].frame.peek(0, "test").unwrap(), &Value::concrete_int(5, &cfg));
    }
}
