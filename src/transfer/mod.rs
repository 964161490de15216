//! Transfer functions (spec §4.8): one per opcode family, each consuming a
//! [`Frame`] and producing zero or more successor [`State`]s or a terminal
//! [`PathOutcome`].

mod arith;
mod branch;
mod calls;
mod constants;
mod control;
mod locals;
mod stack;

use crate::consts::AnalysisConfig;
use crate::domain::interval::IntervalValue;
use crate::domain::sign::{Sign, SignValue};
use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::{Frame, State};
use crate::instr::{Instruction, Pc};
use crate::outcome::{ErrorKind, PathOutcome};

/// Everything a transfer function needs beyond the current [`Frame`]: its
/// own PC, the decoded instruction, the shared configuration, the next
/// sequential PC (fallthrough target, when one exists), and a forward
/// window of upcoming instructions used by the assertion-pattern scan.
pub struct StepContext<'a> {
    /// Program counter of the instruction being stepped.
    pub pc: Pc,
    /// The decoded instruction.
    pub instr: &'a Instruction,
    /// Shared tunables.
    pub cfg: &'a AnalysisConfig,
    /// PC of the instruction immediately following this one in program
    /// order, if any (`None` at the end of the stream).
    pub next_pc: Option<Pc>,
    /// The full instruction stream, in program order, paired with PCs —
    /// used to forward-scan for the assertion-error construction pattern
    /// from an arbitrary target PC.
    pub program: &'a [(Pc, Instruction)],
}

/// The result of stepping one instruction: successor states to feed back
/// into the worklist, an optional terminal outcome (mutually exclusive
/// with producing successors for returns/throws/definite errors), and any
/// "possible" error kinds to record without halting exploration.
#[derive(Debug, Default)]
pub struct StepOutput {
    /// Proposed successor states.
    pub successors: Vec<State>,
    /// A terminal outcome, if this instruction ends the path.
    pub outcome: Option<PathOutcome>,
    /// Non-terminal "possible" errors observed along the way.
    pub warnings: Vec<ErrorKind>,
}

impl StepOutput {
    fn terminal(outcome: PathOutcome) -> Self {
        Self {
            successors: Vec::new(),
            outcome: Some(outcome),
            warnings: Vec::new(),
        }
    }

    /// The common case for opcodes with no branching: continue at the next
    /// sequential PC, or fall off the end of the stream into `Unknown` if
    /// this was the last instruction.
    pub(crate) fn fallthrough(ctx: &StepContext, frame: Frame) -> Self {
        match ctx.next_pc {
            Some(pc) => Self {
                successors: vec![State::new(pc, frame)],
                outcome: None,
                warnings: Vec::new(),
            },
            None => Self {
                successors: Vec::new(),
                outcome: Some(PathOutcome::Unknown),
                warnings: Vec::new(),
            },
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<ErrorKind>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Dispatch one instruction to its opcode-family handler.
pub fn step(ctx: &StepContext, frame: Frame) -> AnalysisResult<StepOutput> {
    tracing::trace!(pc = ctx.pc, instr = ?ctx.instr, "stepping instruction");
    match ctx.instr {
        Instruction::IConst(v) => constants::i_const(ctx, frame, *v),
        Instruction::LdcInt(v) => constants::ldc_int(ctx, frame, *v),
        Instruction::LdcString(s) => constants::ldc_string(ctx, frame, s),

        Instruction::ILoad(l) => locals::i_load(ctx, frame, *l),
        Instruction::IStore(l) => locals::i_store(ctx, frame, *l),
        Instruction::ALoad(l) => locals::a_load(ctx, frame, *l),
        Instruction::AStore(l) => locals::a_store(ctx, frame, *l),
        Instruction::IInc(l, delta) => locals::i_inc(ctx, frame, *l, *delta),

        Instruction::Dup => stack::dup(ctx, frame),
        Instruction::Pop => stack::pop(ctx, frame),

        Instruction::IAdd => arith::binary(ctx, frame, "iadd", Value::add),
        Instruction::ISub => arith::binary(ctx, frame, "isub", Value::sub),
        Instruction::IMul => arith::binary(ctx, frame, "imul", Value::mul),
        Instruction::IDiv => arith::div_rem(ctx, frame, "idiv", false),
        Instruction::IRem => arith::div_rem(ctx, frame, "irem", true),
        Instruction::INeg => arith::neg(ctx, frame),

        Instruction::IfZeroCmp(cmp, target) => branch::if_zero_cmp(ctx, frame, *cmp, *target),
        Instruction::IfICmp(cmp, target) => branch::if_icmp(ctx, frame, *cmp, *target),
        Instruction::IfNull(target) => branch::if_null(ctx, frame, *target, true),
        Instruction::IfNonNull(target) => branch::if_null(ctx, frame, *target, false),

        Instruction::Goto(target) => control::goto(ctx, frame, *target),
        Instruction::Return => Ok(StepOutput::terminal(PathOutcome::Ok)),
        Instruction::IReturn => Ok(StepOutput::terminal(PathOutcome::Ok)),
        Instruction::AReturn => Ok(StepOutput::terminal(PathOutcome::Ok)),
        Instruction::AThrow => control::athrow(ctx, frame),

        Instruction::New(class) => control::new_object(ctx, frame, class),
        Instruction::StaticField => control::static_field(ctx, frame),
        Instruction::InvokeSpecial(m) => calls::invoke_special(ctx, frame, m),
        Instruction::InvokeStatic(m) => calls::invoke_static(ctx, frame, m),
        Instruction::InvokeVirtual(m) => calls::invoke_virtual(ctx, frame, m),
        Instruction::InvokeDynamic(d) => calls::invoke_dynamic(ctx, frame, d),
    }
}

pub(crate) fn interval_to_value(i: &IntervalValue, cfg: &AnalysisConfig) -> Value {
    match cfg.numeric_domain {
        crate::consts::NumericDomainKind::Interval => Value::Interval(*i),
        crate::consts::NumericDomainKind::Sign => {
            let mut signs = Vec::new();
            if i.contains(0) {
                signs.push(Sign::Zero);
            }
            if matches!(i.hi(), crate::domain::interval::ExtInt::PosInf)
                || matches!(i.hi(), crate::domain::interval::ExtInt::Finite(v) if v > 0)
            {
                signs.push(Sign::Pos);
            }
            if matches!(i.lo(), crate::domain::interval::ExtInt::NegInf)
                || matches!(i.lo(), crate::domain::interval::ExtInt::Finite(v) if v < 0)
            {
                signs.push(Sign::Neg);
            }
            Value::Sign(SignValue::from_signs(signs))
        }
    }
}

pub(crate) fn ternary_to_value(t: crate::ternary::Ternary, cfg: &AnalysisConfig) -> Value {
    match t {
        crate::ternary::Ternary::True => Value::concrete_int(1, cfg),
        crate::ternary::Ternary::False => Value::concrete_int(0, cfg),
        crate::ternary::Ternary::Unknown => Value::top_numeric(cfg),
    }
}
