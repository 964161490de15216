//! Abstract interpreter for predicting terminal outcomes of JVM bytecode methods.
//!
//! The crate is built around a small stack-machine abstract interpreter
//! (`engine`) that drives a worklist fixpoint (`stateset`) over frames
//! (`frame`) of pluggable abstract values (`domain`). Transfer functions
//! (`transfer`) consume a decoded instruction stream (`instr`) and push
//! terminal [`outcome::PathOutcome`]s as they are discovered.
//!
//! Classfile parsing, the concrete interpreter/fuzzer, and CLI/report
//! formatting are outside this crate's scope; it only consumes an already
//! decoded instruction stream (see [`instr`]).

#![warn(missing_docs)]
#![deny(unused_must_use)]

pub mod consts;
pub mod domain;
pub mod engine;
pub mod error;
pub mod frame;
pub mod instr;
pub mod outcome;
pub mod stateset;
pub mod ternary;
pub mod transfer;

pub mod prelude {
    //! Common imports for users of the engine.
    pub use crate::consts::AnalysisConfig;
    pub use crate::domain::Value;
    pub use crate::engine::AbstractInterpreter;
    pub use crate::error::AnalysisError;
    pub use crate::frame::{Frame, State};
    pub use crate::instr::{Instruction, Operand, ParamType};
    pub use crate::outcome::{ErrorKind, PathOutcome};
    pub use crate::ternary::Ternary;
}
