/*! Prove divisors nonzero by abstract interpretation.
 *
 * Every integer value is tracked as one point of a four-element lattice. A worklist pushes
 * abstract memories through the instruction-level CFG until nothing changes, then the checker
 * flags each `sdiv`/`udiv` whose divisor is not proven nonzero. In pointer-aware mode stores and
 * loads are resolved through a points-to oracle so values written through one pointer are seen
 * through its aliases.
 */

pub mod alias;
pub mod cfg;
pub mod checker;
pub mod config;
pub mod domain;
pub mod memory;
pub mod pass;
pub mod transfer;
pub mod worklist;

pub use alias::{
    AliasOracle, AliasResult, MemoryLocation, NoAliasOracle, PointsToAnalysis, PointsToSet,
};
pub use cfg::ControlFlowGraph;
pub use checker::{Checker, Diagnostic, DiagnosticKind};
pub use config::{AnalysisConfig, AnalysisMode};
pub use domain::AbstractValue;
pub use memory::Memory;
pub use pass::{DivZeroPass, FunctionPass, PassStatistics};
pub use transfer::TransferFunction;
pub use worklist::{AnalysisResult, WorklistEngine};

use crate::function::Function;
use crate::IrError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Function not found: {0}")]
    UnknownFunction(String),
    #[error("Analysis of {function} exceeded {limit} iterations")]
    IterationLimit { function: String, limit: usize },
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Runs the fixpoint over `function` with the given oracle and checks every division.
pub fn run_analysis(
    function: &Function,
    config: &AnalysisConfig,
    oracle: &dyn AliasOracle,
) -> Result<AnalysisResult, AnalysisError> {
    let mut engine = WorklistEngine::new(function, config, oracle);
    engine.run()?;
    Ok(engine.into_result())
}

/// Like [`run_analysis`], choosing the oracle from the configured mode.
pub fn analyze_function(
    function: &Function,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    match config.mode {
        AnalysisMode::Basic => run_analysis(function, config, &NoAliasOracle),
        AnalysisMode::PointerAware => {
            let points_to = PointsToAnalysis::build(function);
            run_analysis(function, config, &points_to)
        }
    }
}
