//! Bare stack-shuffling opcodes: `dup`/`pop` (spec §4.8).

use crate::error::AnalysisResult;
use crate::frame::Frame;

use super::{StepContext, StepOutput};

fn fallthrough(ctx: &StepContext, frame: Frame) -> StepOutput {
    StepOutput::fallthrough(ctx, frame)
}

/// `dup`: duplicate the top of the operand stack.
pub fn dup(ctx: &StepContext, mut frame: Frame) -> AnalysisResult<StepOutput> {
    let top = frame.peek(ctx.pc, "dup")?.clone();
    frame.push(top);
    Ok(fallthrough(ctx, frame))
}

/// `pop`: discard the top of the operand stack.
pub fn pop(ctx: &StepContext, mut frame: Frame) -> AnalysisResult<StepOutput> {
    frame.pop(ctx.pc, "pop")?;
    Ok(fallthrough(ctx, frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::domain::Value;
    use crate::instr::Instruction;

    #[test]
    fn dup_grows_stack_by_one() {
        let cfg = AnalysisConfig::default();
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(1, &cfg));
        let instr = Instruction::Dup;
        let ctx = StepContext {
            pc: 0,
            instr: &instr,
            cfg: &cfg,
            next_pc: Some(1),
            program: &[],
        };
        let out = dup(&ctx, frame).unwrap();
        assert_eq!(out.successors[0].frame.stack_height(), 2);
    }

    #[test]
    fn pop_shrinks_stack_by_one() {
        let cfg = AnalysisConfig::default();
        let mut frame = Frame::new();
        frame.push(Value::concrete_int(1, &cfg));
        let instr = Instruction::Pop;
        let ctx = StepContext {
            pc: 0,
            instr: &instr,
            cfg: &cfg,
            next_pc: Some(1),
            program: &[],
        };
        let out = pop(&ctx, frame).unwrap();
        assert_eq!(out.successors[0].frame.stack_height(), 0);
    }
}
