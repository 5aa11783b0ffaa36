/*! Core IR types and the divide-by-zero abstract interpreter.
 *
 * A division is only worth a runtime check when the analysis cannot prove its divisor nonzero.
 * This crate provides the IR the analysis runs over, the four-point zero/nonzero lattice, the
 * per-instruction transfer semantics (pointer-aware through a points-to oracle), the worklist
 * fixpoint engine, and the checker that turns fixpoint states into diagnostics.
 */

pub mod analysis;
pub mod block;
pub mod builder;
pub mod function;
pub mod instructions;
pub mod ir_persist;
pub mod module;
pub mod types;
pub mod values;

pub use analysis::{
    analyze_function, run_analysis, AbstractValue, AliasOracle, AnalysisConfig, AnalysisError,
    AnalysisMode, AnalysisResult, Diagnostic, DiagnosticKind, Memory, NoAliasOracle,
    PointsToAnalysis,
};
pub use block::{BasicBlock, BlockId};
pub use builder::{BlockBuilder, FunctionBuilder};
pub use function::{Function, InstId, Parameter};
pub use instructions::{BinaryOp, CastOp, Instruction, IntPredicate};
pub use module::{Declaration, Global, Module};
pub use types::Type;
pub use values::{Constant, SourceLocation, Value, ValueId};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Unknown block: {0}")]
    UnknownBlock(String),
    #[error("Block {0} has no terminator")]
    MissingTerminator(String),
    #[error("Value {0} is defined more than once")]
    DuplicateDefinition(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
