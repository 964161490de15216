//! Engine-level error types.
//!
//! These are raised only on malformed input or internal invariant violations
//! (spec: "programmer bugs ... hard failures, not abstract-interpretation
//! outcomes"). A well-formed method never triggers one; callers should treat
//! them as fatal rather than retry.

use thiserror::Error;

use crate::outcome::ErrorKind;

/// Errors raised by the engine itself, as opposed to outcomes discovered
/// about the analyzed method.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Two frames were joined at the same program counter but had different
    /// operand-stack heights. This indicates the instruction stream does not
    /// correspond to verifiable bytecode.
    #[error("stack height mismatch joining frames at pc={pc}: {left} vs {right}")]
    StackHeightMismatch {
        /// Program counter at which the mismatch was observed.
        pc: u32,
        /// Stack height on one side of the join.
        left: usize,
        /// Stack height on the other side of the join.
        right: usize,
    },

    /// An opcode's operand did not match the shape documented for it.
    #[error("malformed operand for opcode {opcode} at pc={pc}: {detail}")]
    MalformedOperand {
        /// Opcode mnemonic.
        opcode: &'static str,
        /// Program counter of the offending instruction.
        pc: u32,
        /// Human-readable detail.
        detail: String,
    },

    /// A branch or call referenced a program counter outside the instruction
    /// stream.
    #[error("pc {pc} is out of range for this instruction stream (len={len})")]
    PcOutOfRange {
        /// The offending program counter.
        pc: u32,
        /// Number of instructions in the stream.
        len: usize,
    },

    /// The operand stack underflowed during a transfer function.
    #[error("operand stack underflow at pc={pc} executing {opcode}")]
    StackUnderflow {
        /// Program counter of the offending instruction.
        pc: u32,
        /// Opcode mnemonic.
        opcode: &'static str,
    },

    /// `iload`/`aload` read a local that has never been stored to (and is
    /// not a seeded parameter). A verifiable method never reads a local
    /// before writing it.
    #[error("read of uninitialized local {local} at pc={pc}")]
    UninitializedLocal {
        /// Program counter of the offending instruction.
        pc: u32,
        /// The local-variable index read.
        local: u16,
    },
}

/// A domain-level error: not a crate bug, but a condition the domain algebra
/// itself cannot proceed past (e.g. "divide by a definite zero"). Transfer
/// functions turn these into [`ErrorKind`]s rather than propagating them as
/// [`AnalysisError`]s.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    /// The divisor is the singleton {Zero} (Sign) or [0,0] (Interval).
    #[error("abstract division by a definite zero")]
    DefiniteDivideByZero,
}

impl From<DomainError> for ErrorKind {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::DefiniteDivideByZero => ErrorKind::DivideByZero,
        }
    }
}

/// Result alias for fallible engine operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
