//! Method-invocation opcodes: `invokespecial`/`invokestatic`/`invokevirtual`/
//! `invokedynamic` (spec §4.8, §6).
//!
//! Only the `java.lang.String`/`Integer.parseInt` surface spec §4.8 names is
//! modeled precisely; any other call is handled generically by its
//! descriptor's arity and return type, since no object/field heap is
//! tracked (spec Non-goals).

use crate::domain::Value;
use crate::error::AnalysisResult;
use crate::frame::Frame;
use crate::instr::{ConcatDescriptor, MethodRef};
use crate::outcome::{ErrorKind, PathOutcome};
use crate::ternary::Ternary;

use super::{interval_to_value, ternary_to_value, StepContext, StepOutput};

fn fallthrough(ctx: &StepContext, frame: Frame, warnings: Vec<ErrorKind>) -> StepOutput {
    StepOutput::fallthrough(ctx, frame).with_warnings(warnings)
}

fn terminal(kind: ErrorKind) -> StepOutput {
    StepOutput { successors: Vec::new(), outcome: Some(PathOutcome::Error(kind)), warnings: Vec::new() }
}

/// Checks `v` for nullity. `Err` carries a terminal outcome for a definite
/// null; `Ok` continues, pushing a warning first if `v` is only possibly
/// null.
fn null_check(v: &Value, warnings: &mut Vec<ErrorKind>) -> Result<(), StepOutput> {
    if v.is_definitely_null() {
        return Err(terminal(ErrorKind::NullPointerException));
    }
    if v.is_possibly_null() {
        warnings.push(ErrorKind::NullPointerException);
    }
    Ok(())
}

/// Bounds-checks `idx` against `len` for the `charAt`-style valid range
/// `0 <= idx < length`. Returns `Err(terminal)` when every feasible index
/// is out of range, else pushes a possible-bounds warning when some
/// feasible index might be.
fn bounds_check(idx: &crate::domain::interval::IntervalValue, len: &crate::domain::interval::IntervalValue, warnings: &mut Vec<ErrorKind>) -> Result<(), StepOutput> {
    use crate::domain::interval::ExtInt;
    let definitely_negative = idx.hi() < ExtInt::Finite(0);
    let definitely_too_large = idx.lo() >= len.hi();
    if definitely_negative || definitely_too_large {
        return Err(terminal(ErrorKind::IndexOutOfBounds));
    }
    let possibly_negative = idx.lo() < ExtInt::Finite(0);
    let possibly_too_large = idx.hi() >= len.lo();
    if possibly_negative || possibly_too_large {
        warnings.push(ErrorKind::IndexOutOfBounds);
    }
    Ok(())
}

/// Bounds-checks a `substring` cursor `idx` against `len` for the valid
/// range `0 <= idx <= length` (`idx == length` is legal, e.g.
/// `s.substring(1, s.length())`). Same shape as [`bounds_check`] but with
/// the upper-bound tests strict (`>` rather than `>=`), matching `idx` as
/// a cursor between characters rather than a character index.
fn bounds_check_cursor(idx: &crate::domain::interval::IntervalValue, len: &crate::domain::interval::IntervalValue, warnings: &mut Vec<ErrorKind>) -> Result<(), StepOutput> {
    use crate::domain::interval::ExtInt;
    let definitely_negative = idx.hi() < ExtInt::Finite(0);
    let definitely_too_large = idx.lo() > len.hi();
    if definitely_negative || definitely_too_large {
        return Err(terminal(ErrorKind::IndexOutOfBounds));
    }
    let possibly_negative = idx.lo() < ExtInt::Finite(0);
    let possibly_too_large = idx.hi() > len.lo();
    if possibly_negative || possibly_too_large {
        warnings.push(ErrorKind::IndexOutOfBounds);
    }
    Ok(())
}

/// `substring(i, j)` feasibility: `i > j` for some feasible pair is a
/// possible (not necessarily definite) `IndexRangeException`.
fn range_check(start: &crate::domain::interval::IntervalValue, end: &crate::domain::interval::IntervalValue, warnings: &mut Vec<ErrorKind>) {
    if start.hi() > end.lo() {
        warnings.push(ErrorKind::IndexRangeException);
    }
}

/// `invokespecial`: constructors (`<init>`) and private/super calls. Pops
/// the descriptor's argument count plus the implicit receiver, pushes
/// nothing — construction's only observable effect on analysis is via the
/// `new`/`athrow` pairing the control-flow scans look for.
pub fn invoke_special(ctx: &StepContext, mut frame: Frame, m: &MethodRef) -> AnalysisResult<StepOutput> {
    let (argc, _) = parse_descriptor(&m.descriptor);
    for _ in 0..argc {
        frame.pop(ctx.pc, "invokespecial")?;
    }
    frame.pop(ctx.pc, "invokespecial")?; // objectref
    Ok(fallthrough(ctx, frame, Vec::new()))
}

/// `invokestatic`: recognizes `Integer.parseInt`, falls back generically
/// otherwise.
pub fn invoke_static(ctx: &StepContext, mut frame: Frame, m: &MethodRef) -> AnalysisResult<StepOutput> {
    if m.name == "parseInt" && m.owner.ends_with("Integer") {
        let arg = frame.pop(ctx.pc, "invokestatic")?;
        let mut warnings = Vec::new();
        if let Err(out) = null_check(&arg, &mut warnings) {
            return Ok(out);
        }
        match arg.is_empty() {
            Ternary::True => return Ok(terminal(ErrorKind::NumberFormatException)),
            Ternary::Unknown => warnings.push(ErrorKind::NumberFormatException),
            Ternary::False => {}
        }
        frame.push(Value::top_numeric(ctx.cfg));
        return Ok(fallthrough(ctx, frame, warnings));
    }

    let (argc, ret) = parse_descriptor(&m.descriptor);
    for _ in 0..argc {
        frame.pop(ctx.pc, "invokestatic")?;
    }
    push_generic_return(&mut frame, ret, ctx);
    Ok(fallthrough(ctx, frame, Vec::new()))
}

/// `invokevirtual`: recognizes the `String` instance methods named in spec
/// §4.8, falls back generically otherwise.
pub fn invoke_virtual(ctx: &StepContext, mut frame: Frame, m: &MethodRef) -> AnalysisResult<StepOutput> {
    match m.name.as_str() {
        "length" => unary_string_query(ctx, frame, |recv, cfg, _w| interval_to_value(&recv.length(), cfg)),
        "isEmpty" => unary_string_query(ctx, frame, |recv, cfg, _w| ternary_to_value(recv.is_empty(), cfg)),

        "charAt" => {
            let idx_v = frame.pop(ctx.pc, "invokevirtual")?;
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            let idx = idx_v.bounding_interval();
            if let Err(out) = bounds_check(&idx, &recv.length(), &mut warnings) {
                return Ok(out);
            }
            frame.push(Value::top_numeric(ctx.cfg));
            Ok(fallthrough(ctx, frame, warnings))
        }

        "substring" => {
            let (argc, _) = parse_descriptor(&m.descriptor);
            let end_v = if argc == 2 { Some(frame.pop(ctx.pc, "invokevirtual")?) } else { None };
            let start_v = frame.pop(ctx.pc, "invokevirtual")?;
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            let len = recv.length();
            let start = start_v.bounding_interval();
            let end = end_v.as_ref().map(|v| v.bounding_interval()).unwrap_or(len);
            if let Err(out) = bounds_check_cursor(&start, &len, &mut warnings) {
                return Ok(out);
            }
            if let Err(out) = bounds_check_cursor(&end, &len, &mut warnings) {
                return Ok(out);
            }
            range_check(&start, &end, &mut warnings);
            let result = recv.substring(&start, end_v.is_some().then_some(&end), ctx.cfg);
            frame.push(result);
            Ok(fallthrough(ctx, frame, warnings))
        }

        "startsWith" | "endsWith" | "contains" | "equals" => {
            let arg = frame.pop(ctx.pc, "invokevirtual")?;
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            if let Err(out) = null_check(&arg, &mut warnings) {
                return Ok(out);
            }
            let truth = match (m.name.as_str(), arg.as_literal()) {
                ("startsWith", Some(lit)) => recv.starts_with(&lit),
                ("endsWith", Some(lit)) => recv.ends_with(&lit),
                ("contains", Some(lit)) => recv.contains(&lit),
                ("equals", _) => recv.equals(&arg),
                _ => Ternary::Unknown,
            };
            frame.push(ternary_to_value(truth, ctx.cfg));
            Ok(fallthrough(ctx, frame, warnings))
        }

        "compareTo" => {
            let arg = frame.pop(ctx.pc, "invokevirtual")?;
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            if let Err(out) = null_check(&arg, &mut warnings) {
                return Ok(out);
            }
            frame.push(Value::top_numeric(ctx.cfg));
            Ok(fallthrough(ctx, frame, warnings))
        }

        "concat" => {
            let arg = frame.pop(ctx.pc, "invokevirtual")?;
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            if let Err(out) = null_check(&arg, &mut warnings) {
                return Ok(out);
            }
            frame.push(recv.concat(&arg, ctx.cfg));
            Ok(fallthrough(ctx, frame, warnings))
        }

        "split" => unary_string_query(ctx, frame, |_recv, cfg, w| {
            let _ = w;
            Value::top_string(cfg).set_not_null()
        }),

        "toLowerCase" | "toUpperCase" | "trim" => unary_string_query(ctx, frame, |_recv, cfg, _w| Value::top_string(cfg)),

        "replace" => {
            let (argc, _) = parse_descriptor(&m.descriptor);
            for _ in 0..argc {
                frame.pop(ctx.pc, "invokevirtual")?;
            }
            let recv = frame.pop(ctx.pc, "invokevirtual")?;
            let mut warnings = Vec::new();
            if let Err(out) = null_check(&recv, &mut warnings) {
                return Ok(out);
            }
            frame.push(Value::top_string(ctx.cfg));
            Ok(fallthrough(ctx, frame, warnings))
        }

        _ => {
            let (argc, ret) = parse_descriptor(&m.descriptor);
            for _ in 0..argc {
                frame.pop(ctx.pc, "invokevirtual")?;
            }
            frame.pop(ctx.pc, "invokevirtual")?; // objectref
            push_generic_return(&mut frame, ret, ctx);
            Ok(fallthrough(ctx, frame, Vec::new()))
        }
    }
}

fn unary_string_query(ctx: &StepContext, mut frame: Frame, f: impl Fn(&Value, &crate::consts::AnalysisConfig, &mut Vec<ErrorKind>) -> Value) -> AnalysisResult<StepOutput> {
    let recv = frame.pop(ctx.pc, "invokevirtual")?;
    let mut warnings = Vec::new();
    if let Err(out) = null_check(&recv, &mut warnings) {
        return Ok(out);
    }
    let result = f(&recv, ctx.cfg, &mut warnings);
    frame.push(result);
    Ok(fallthrough(ctx, frame, warnings))
}

/// `invokedynamic`: pops the descriptor's dynamic operand count, null-checks
/// each, folds the result with the constant interleaving via `concat`.
pub fn invoke_dynamic(ctx: &StepContext, mut frame: Frame, d: &ConcatDescriptor) -> AnalysisResult<StepOutput> {
    let mut operands = Vec::with_capacity(d.dynamic_operand_count);
    for _ in 0..d.dynamic_operand_count {
        operands.push(frame.pop(ctx.pc, "invokedynamic")?);
    }
    operands.reverse();

    let mut warnings = Vec::new();
    let mut dynamic_iter = operands.into_iter();
    let mut acc: Option<Value> = None;
    for slot in &d.values {
        let next = match slot {
            Some(constant) => Value::concrete_string(constant, ctx.cfg),
            None => {
                let v = dynamic_iter.next().unwrap_or_else(|| Value::top_string(ctx.cfg));
                if let Err(out) = null_check(&v, &mut warnings) {
                    return Ok(out);
                }
                v
            }
        };
        acc = Some(match acc {
            Some(existing) => existing.concat(&next, ctx.cfg),
            None => next,
        });
    }
    frame.push(acc.unwrap_or_else(|| Value::concrete_string("", ctx.cfg)));
    Ok(fallthrough(ctx, frame, warnings))
}

/// What kind of value a generic (unrecognized) method's return slot pushes.
enum ReturnKind {
    Void,
    Int,
    StringRef,
    Other,
}

fn push_generic_return(frame: &mut Frame, ret: ReturnKind, ctx: &StepContext) {
    match ret {
        ReturnKind::Void => {}
        ReturnKind::Int => frame.push(Value::top_numeric(ctx.cfg)),
        ReturnKind::StringRef => frame.push(Value::top_string(ctx.cfg)),
        ReturnKind::Other => frame.push(Value::top_string(ctx.cfg).set_not_null()),
    }
}

/// Parses a JVM method descriptor `"(ParamTypes)ReturnType"` into a
/// top-level parameter count and a coarse return-value kind. Doesn't model
/// `long`/`double` (spec only tracks `int` and `String`): any primitive or
/// reference parameter consumes exactly one stack slot for this analyzer's
/// purposes.
fn parse_descriptor(descriptor: &str) -> (usize, ReturnKind) {
    let Some(close) = descriptor.find(')') else {
        return (0, ReturnKind::Other);
    };
    let params = &descriptor[1..close];
    let ret = &descriptor[close + 1..];

    let mut count = 0;
    let mut chars = params.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                while matches!(chars.peek(), Some('[')) {
                    chars.next();
                }
                match chars.next() {
                    Some('L') => {
                        while chars.next().is_some_and(|c| c != ';') {}
                    }
                    _ => {}
                }
                count += 1;
            }
            'L' => {
                while chars.next().is_some_and(|c| c != ';') {}
                count += 1;
            }
            _ => count += 1,
        }
    }

    let ret_kind = match ret.chars().next() {
        Some('V') => ReturnKind::Void,
        Some('I') | Some('Z') | Some('B') | Some('C') | Some('S') => ReturnKind::Int,
        Some('L') if ret == "Ljava/lang/String;" => ReturnKind::StringRef,
        Some('L') | Some('[') => ReturnKind::Other,
        _ => ReturnKind::Other,
    };
    (count, ret_kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::AnalysisConfig;
    use crate::instr::Instruction;

    #[test]
    fn descriptor_counts_params_and_classifies_return() {
        assert_eq!(parse_descriptor("(II)Ljava/lang/String;").0, 2);
        assert!(matches!(parse_descriptor("(II)Ljava/lang/String;").1, ReturnKind::StringRef));
        assert_eq!(parse_descriptor("()V").0, 0);
        assert!(matches!(parse_descriptor("()V").1, ReturnKind::Void));
        assert_eq!(parse_descriptor("(Ljava/lang/String;I)I").0, 2);
    }

    #[test]
    fn parse_int_on_definitely_empty_string_is_terminal() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::InvokeStatic(MethodRef::new("java/lang/Integer", "parseInt", "(Ljava/lang/String;)I"));
        let mut frame = Frame::new();
        frame.push(Value::concrete_string("", &cfg));
        let ctx = StepContext { pc: 0, instr: &instr, cfg: &cfg, next_pc: Some(1), program: &[] };
        let m = MethodRef::new("java/lang/Integer", "parseInt", "(Ljava/lang/String;)I");
        let out = invoke_static(&ctx, frame, &m).unwrap();
        assert_eq!(out.outcome, Some(PathOutcome::Error(ErrorKind::NumberFormatException)));
    }

    // `substring(i, s.length())` is always safe Java — `end == length` is the
    // cursor past the last character, not an out-of-bounds index.
    #[test]
    fn substring_to_exact_length_is_not_flagged_out_of_bounds() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::InvokeVirtual(MethodRef::new("java/lang/String", "substring", "(II)Ljava/lang/String;"));
        let mut frame = Frame::new();
        frame.push(Value::concrete_string("hello", &cfg));
        frame.push(Value::concrete_int(1, &cfg));
        frame.push(Value::concrete_int(5, &cfg));
        let ctx = StepContext { pc: 0, instr: &instr, cfg: &cfg, next_pc: Some(1), program: &[] };
        let m = MethodRef::new("java/lang/String", "substring", "(II)Ljava/lang/String;");
        let out = invoke_virtual(&ctx, frame, &m).unwrap();
        assert_eq!(out.outcome, None);
        assert!(!out.warnings.contains(&ErrorKind::IndexOutOfBounds));
    }

    #[test]
    fn null_receiver_length_is_terminal_npe() {
        let cfg = AnalysisConfig::default();
        let instr = Instruction::InvokeVirtual(MethodRef::new("java/lang/String", "length", "()I"));
        let mut frame = Frame::new();
        frame.push(Value::null_string(&cfg));
        let ctx = StepContext { pc: 0, instr: &instr, cfg: &cfg, next_pc: Some(1), program: &[] };
        let m = MethodRef::new("java/lang/String", "length", "()I");
        let out = invoke_virtual(&ctx, frame, &m).unwrap();
        assert_eq!(out.outcome, Some(PathOutcome::Error(ErrorKind::NullPointerException)));
    }
}
