//! The instruction-stream interface (spec §6): what the abstract interpreter
//! consumes from the (out-of-scope) classfile parser/decompiler.
//!
//! The collaborator "provides: modifiers, ordered list of instructions with
//! byte offsets and decoded operands; consumes: nothing from the core." This
//! module defines that boundary as plain Rust types: a [`RawInstruction`]
//! tuple-of-(offset, opcode-name, operands) as the wire shape, and an
//! [`Instruction`] enum the transfer functions actually match on. Decoding
//! one into the other is the only logic this module owns; it does not parse
//! classfiles.

use once_regex::MAKE_CONCAT_RE;

use crate::error::{AnalysisError, AnalysisResult};

/// A local-variable slot index.
pub type LocalIndex = u16;

/// A byte offset into the instruction stream; doubles as a program counter.
pub type Pc = u32;

/// The type of a formal parameter, as far as the domain dispatcher cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// `int` (or any type the Sign/Interval domains model).
    Int,
    /// `java.lang.String`.
    StringRef,
}

/// A resolved method reference, as produced by an `invoke*` operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Fully-qualified owner class, e.g. `"java/lang/String"`.
    pub owner: String,
    /// Method name, e.g. `"substring"`.
    pub name: String,
    /// Raw descriptor, e.g. `"(II)Ljava/lang/String;"`.
    pub descriptor: String,
}

impl MethodRef {
    /// Convenience constructor.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// A decoded `invokedynamic` string-concatenation descriptor (spec §6, §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatDescriptor {
    /// Number of stack values to pop as dynamic operands.
    pub dynamic_operand_count: usize,
    /// The constant/dynamic interleaving template; `None` marks a slot filled
    /// by a popped dynamic operand, in left-to-right order.
    pub values: Vec<Option<String>>,
}

impl ConcatDescriptor {
    /// Build directly from a structured record (the `{name, parameters,
    /// values}` shape of spec §6).
    pub fn from_values(values: Vec<Option<String>>) -> Self {
        let dynamic_operand_count = values.iter().filter(|v| v.is_none()).count();
        Self {
            dynamic_operand_count,
            values,
        }
    }

    /// Parse the `makeConcatWithConstants(...)`-style string form (spec §6:
    /// "a string containing makeConcat…(…) parsed by a regex"). Constant
    /// segments are literal text between `` placeholders; each ``
    /// stands for one popped dynamic operand.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = MAKE_CONCAT_RE.captures(raw)?;
        let template = caps.get(1)?.as_str();
        let mut values = Vec::new();
        let mut buf = String::new();
        for ch in template.chars() {
            if ch == '\u{1}' {
                if !buf.is_empty() {
                    values.push(Some(std::mem::take(&mut buf)));
                }
                values.push(None);
            } else {
                buf.push(ch);
            }
        }
        if !buf.is_empty() {
            values.push(Some(buf));
        }
        Some(Self::from_values(values))
    }
}

mod once_regex {
    use regex::Regex;
    use std::sync::OnceLock;

    pub static MAKE_CONCAT_RE_CELL: OnceLock<Regex> = OnceLock::new();

    pub struct LazyConcatRe;
    impl LazyConcatRe {
        pub fn captures<'a>(&self, s: &'a str) -> Option<regex::Captures<'a>> {
            MAKE_CONCAT_RE_CELL
                .get_or_init(|| Regex::new(r"makeConcat\w*\(([^)]*)\)").expect("static regex"))
                .captures(s)
        }
    }
    pub static MAKE_CONCAT_RE: LazyConcatRe = LazyConcatRe;
}

/// One opcode's decoded form. Grouped per spec §4.8's opcode families.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // --- constants ---
    /// `iconst`/`bipush`/`sipush`: push a constant `int`.
    IConst(i32),
    /// `ldc` of an `int` constant.
    LdcInt(i32),
    /// `ldc` of a `String` constant.
    LdcString(String),

    // --- locals ---
    /// `iload`.
    ILoad(LocalIndex),
    /// `istore`.
    IStore(LocalIndex),
    /// `aload`.
    ALoad(LocalIndex),
    /// `astore`.
    AStore(LocalIndex),
    /// `iinc local, delta`.
    IInc(LocalIndex, i32),

    // --- stack ---
    /// `dup`.
    Dup,
    /// `pop`.
    Pop,

    // --- arithmetic ---
    /// `iadd`.
    IAdd,
    /// `isub`.
    ISub,
    /// `imul`.
    IMul,
    /// `idiv`.
    IDiv,
    /// `irem`.
    IRem,
    /// `ineg`.
    INeg,

    // --- branches ---
    /// `ifeq`/`ifne`/`iflt`/`ifge`/`ifgt`/`ifle` against zero.
    IfZeroCmp(ZeroCmp, Pc),
    /// `if_icmp*` comparing two stack ints.
    IfICmp(IntCmp, Pc),
    /// `ifnull`.
    IfNull(Pc),
    /// `ifnonnull`.
    IfNonNull(Pc),

    // --- control ---
    /// `goto`.
    Goto(Pc),
    /// `return` (void).
    Return,
    /// `ireturn`.
    IReturn,
    /// `areturn`.
    AReturn,
    /// `athrow`.
    AThrow,

    // --- object ---
    /// `new ClassName`.
    New(String),
    /// `getstatic`/`putstatic` field access (value not tracked further).
    StaticField,
    /// `invokespecial` (constructors / `<init>`).
    InvokeSpecial(MethodRef),
    /// `invokestatic`.
    InvokeStatic(MethodRef),
    /// `invokevirtual`.
    InvokeVirtual(MethodRef),
    /// `invokedynamic` string concatenation.
    InvokeDynamic(ConcatDescriptor),
}

/// The six `ifeq`-family zero-comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZeroCmp {
    /// `ifeq`.
    Eq,
    /// `ifne`.
    Ne,
    /// `iflt`.
    Lt,
    /// `ifge`.
    Ge,
    /// `ifgt`.
    Gt,
    /// `ifle`.
    Le,
}

/// The six `if_icmp*` two-operand comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntCmp {
    /// `if_icmpeq`.
    Eq,
    /// `if_icmpne`.
    Ne,
    /// `if_icmplt`.
    Lt,
    /// `if_icmpge`.
    Ge,
    /// `if_icmpgt`.
    Gt,
    /// `if_icmple`.
    Le,
}

/// Wire shape of one instruction as handed to the engine: a byte offset, an
/// opcode mnemonic, and up to two operands (spec §6 table).
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    /// Byte offset of this instruction (also used as the PC).
    pub pc: Pc,
    /// Canonical JVM mnemonic, e.g. `"idiv"`, `"if_icmpge"`, `"invokevirtual"`.
    pub opcode: String,
    /// Decoded operand(s), opcode-dependent.
    pub operands: Vec<Operand>,
}

/// A single decoded operand value, shaped per the spec §6 table.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A signed integer (covers `iconst`/`bipush`/`sipush`/local indices/
    /// branch targets when stored as plain numbers).
    Int(i64),
    /// `ldc`'s `(type, value)` tuple, with `value` carried as text.
    Ldc {
        /// `"int"`, `"string"`, `"class"`, ...
        ty: String,
        /// Textual value, parsed per `ty`.
        value: String,
    },
    /// A class or method name/descriptor string.
    Text(String),
    /// `iinc`'s `(local-index, delta)` pair.
    IincPair(LocalIndex, i32),
    /// A fully decoded method reference (`invoke*`).
    Method(MethodRef),
    /// A fully decoded `invokedynamic` record.
    Dynamic(ConcatDescriptor),
}

impl RawInstruction {
    /// Decode into the typed [`Instruction`] the transfer functions operate
    /// on. Fails only on malformed operands (wrong shape/count for the given
    /// opcode), never on "this opcode isn't recognised" — unrecognised
    /// opcodes are the caller's concern since parsing is out of scope.
    pub fn decode(&self) -> AnalysisResult<Instruction> {
        let op = self.opcode.as_str();
        let malformed = |detail: &str| AnalysisError::MalformedOperand {
            opcode: opcode_static_name(op),
            pc: self.pc,
            detail: detail.to_string(),
        };

        let int_operand = |idx: usize| -> AnalysisResult<i64> {
            match self.operands.get(idx) {
                Some(Operand::Int(v)) => Ok(*v),
                _ => Err(malformed("expected integer operand")),
            }
        };
        let local_operand = |idx: usize| -> AnalysisResult<LocalIndex> {
            Ok(int_operand(idx)? as LocalIndex)
        };
        let target_operand = |idx: usize| -> AnalysisResult<Pc> {
            Ok(int_operand(idx)? as Pc)
        };

        Ok(match op {
            "iconst" | "bipush" | "sipush" => Instruction::IConst(
                match self.operands.first() {
                    Some(Operand::Int(v)) => *v as i32,
                    Some(Operand::Text(t)) if t == "m1" => -1,
                    Some(Operand::Text(t)) => t
                        .parse::<i32>()
                        .map_err(|_| malformed("expected integer literal text"))?,
                    _ => return Err(malformed("expected integer or 'm1' literal")),
                },
            ),
            "ldc" => match self.operands.first() {
                Some(Operand::Ldc { ty, value }) if ty == "int" => Instruction::LdcInt(
                    value.parse().map_err(|_| malformed("ldc int not parseable"))?,
                ),
                Some(Operand::Ldc { ty, value }) if ty == "string" => {
                    Instruction::LdcString(value.clone())
                }
                Some(Operand::Ldc { .. }) => {
                    // class / other constant-pool kinds carry no value the
                    // numeric/string domains track.
                    Instruction::LdcString(String::new())
                }
                _ => return Err(malformed("expected (type, value) ldc tuple")),
            },
            "iload" => Instruction::ILoad(local_operand(0)?),
            "istore" => Instruction::IStore(local_operand(0)?),
            "aload" => Instruction::ALoad(local_operand(0)?),
            "astore" => Instruction::AStore(local_operand(0)?),
            "iinc" => match self.operands.first() {
                Some(Operand::IincPair(idx, delta)) => Instruction::IInc(*idx, *delta),
                _ => return Err(malformed("expected (local-index, delta) pair")),
            },
            "dup" => Instruction::Dup,
            "pop" => Instruction::Pop,
            "iadd" => Instruction::IAdd,
            "isub" => Instruction::ISub,
            "imul" => Instruction::IMul,
            "idiv" => Instruction::IDiv,
            "irem" => Instruction::IRem,
            "ineg" => Instruction::INeg,
            "ifeq" => Instruction::IfZeroCmp(ZeroCmp::Eq, target_operand(0)?),
            "ifne" => Instruction::IfZeroCmp(ZeroCmp::Ne, target_operand(0)?),
            "iflt" => Instruction::IfZeroCmp(ZeroCmp::Lt, target_operand(0)?),
            "ifge" => Instruction::IfZeroCmp(ZeroCmp::Ge, target_operand(0)?),
            "ifgt" => Instruction::IfZeroCmp(ZeroCmp::Gt, target_operand(0)?),
            "ifle" => Instruction::IfZeroCmp(ZeroCmp::Le, target_operand(0)?),
            "if_icmpeq" => Instruction::IfICmp(IntCmp::Eq, target_operand(0)?),
            "if_icmpne" => Instruction::IfICmp(IntCmp::Ne, target_operand(0)?),
            "if_icmplt" => Instruction::IfICmp(IntCmp::Lt, target_operand(0)?),
            "if_icmpge" => Instruction::IfICmp(IntCmp::Ge, target_operand(0)?),
            "if_icmpgt" => Instruction::IfICmp(IntCmp::Gt, target_operand(0)?),
            "if_icmple" => Instruction::IfICmp(IntCmp::Le, target_operand(0)?),
            "ifnull" => Instruction::IfNull(target_operand(0)?),
            "ifnonnull" => Instruction::IfNonNull(target_operand(0)?),
            "goto" => Instruction::Goto(target_operand(0)?),
            "return" => Instruction::Return,
            "ireturn" => Instruction::IReturn,
            "areturn" => Instruction::AReturn,
            "athrow" => Instruction::AThrow,
            "new" => match self.operands.first() {
                Some(Operand::Text(name)) => Instruction::New(name.clone()),
                _ => return Err(malformed("expected class name")),
            },
            "getstatic" | "putstatic" => Instruction::StaticField,
            "invokespecial" => Instruction::InvokeSpecial(method_operand(self, &malformed)?),
            "invokestatic" => Instruction::InvokeStatic(method_operand(self, &malformed)?),
            "invokevirtual" => Instruction::InvokeVirtual(method_operand(self, &malformed)?),
            "invokedynamic" => match self.operands.first() {
                Some(Operand::Dynamic(d)) => Instruction::InvokeDynamic(d.clone()),
                Some(Operand::Text(raw)) => Instruction::InvokeDynamic(
                    ConcatDescriptor::parse(raw).ok_or_else(|| malformed("unparseable invokedynamic text"))?,
                ),
                _ => return Err(malformed("expected dynamic descriptor or text")),
            },
            other => {
                return Err(AnalysisError::MalformedOperand {
                    opcode: Box::leak(other.to_string().into_boxed_str()),
                    pc: self.pc,
                    detail: "unrecognised opcode mnemonic".to_string(),
                })
            }
        })
    }
}

fn method_operand(
    instr: &RawInstruction,
    malformed: &dyn Fn(&str) -> AnalysisError,
) -> AnalysisResult<MethodRef> {
    match instr.operands.first() {
        Some(Operand::Method(m)) => Ok(m.clone()),
        _ => Err(malformed("expected method reference")),
    }
}

/// Map a handful of hot opcodes to a `'static` name for error messages
/// without allocating; anything else falls back to a generic label.
fn opcode_static_name(op: &str) -> &'static str {
    match op {
        "iconst" => "iconst",
        "bipush" => "bipush",
        "sipush" => "sipush",
        "ldc" => "ldc",
        "iload" => "iload",
        "istore" => "istore",
        "aload" => "aload",
        "astore" => "astore",
        "iinc" => "iinc",
        "idiv" => "idiv",
        "irem" => "irem",
        "invokevirtual" => "invokevirtual",
        "invokespecial" => "invokespecial",
        "invokestatic" => "invokestatic",
        "invokedynamic" => "invokedynamic",
        "new" => "new",
        _ => "opcode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_iconst_m1() {
        let raw = RawInstruction {
            pc: 0,
            opcode: "iconst".to_string(),
            operands: vec![Operand::Text("m1".to_string())],
        };
        assert_eq!(raw.decode().unwrap(), Instruction::IConst(-1));
    }

    #[test]
    fn decodes_if_icmpge_target() {
        let raw = RawInstruction {
            pc: 10,
            opcode: "if_icmpge".to_string(),
            operands: vec![Operand::Int(42)],
        };
        assert_eq!(
            raw.decode().unwrap(),
            Instruction::IfICmp(IntCmp::Ge, 42)
        );
    }

    #[test]
    fn rejects_malformed_iinc() {
        let raw = RawInstruction {
            pc: 0,
            opcode: "iinc".to_string(),
            operands: vec![Operand::Int(1)],
        };
        assert!(raw.decode().is_err());
    }

    #[test]
    fn parses_make_concat_template() {
        let d = ConcatDescriptor::parse("makeConcatWithConstants(\u{1}ab\u{1})").unwrap();
        assert_eq!(d.dynamic_operand_count, 2);
        assert_eq!(d.values, vec![None, Some("ab".to_string()), None]);
    }
}
