/*! Divide-by-zero analysis of LLVM IR in one import.
 *
 * Re-exports the IR, the analysis, the textual IR parser and the emitters, plus
 * [`analyze_source`] which takes IR text straight to a per-file report.
 */

pub use divzero_core as core;
pub use divzero_emit as emit;
pub use divzero_parser as parser;

pub use divzero_core::{
    analyze_function, AbstractValue, AnalysisConfig, AnalysisError, AnalysisMode, AnalysisResult,
    Diagnostic, DiagnosticKind, Function, InstId, Instruction, Memory, Module, Type, Value,
};

pub use divzero_emit::{
    AnnotatedIREmitter, Emitter, EmitterConfig, FileReport, JsonReportEmitter, TextReportEmitter,
};

pub use divzero_parser::{parse, parse_file, parse_module, ParseError};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parses `source` and analyzes every function it defines.
///
/// `name` labels the report, usually the path the text was read from.
pub fn analyze_source(name: &str, source: &str, config: &AnalysisConfig) -> Result<FileReport> {
    let module = divzero_parser::parse_module_named(name, source)?;
    analyze_module(name, &module, config)
}

/// Analyzes every function of an already built module.
pub fn analyze_module(name: &str, module: &Module, config: &AnalysisConfig) -> Result<FileReport> {
    let mut report = FileReport::new(name);
    for function in module.functions.values() {
        let result = analyze_function(function, config)?;
        report.push(function, result);
    }
    info!(
        file = name,
        functions = report.functions.len(),
        flagged = report.flagged_count(),
        "analyzed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUARDED: &str = "\
define i32 @safe(i32 %x) {
entry:
  %c = icmp eq i32 %x, 0
  br i1 %c, label %zero, label %div

zero:
  ret i32 0

div:
  %q = sdiv i32 100, 7
  ret i32 %q
}
";

    #[test]
    fn test_analyze_source_clean() {
        let report = analyze_source("guarded.ll", GUARDED, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.file, "guarded.ll");
        assert_eq!(report.functions.len(), 1);
        assert_eq!(report.division_count(), 1);
        assert_eq!(report.flagged_count(), 0);
    }

    #[test]
    fn test_analyze_source_parse_error() {
        let err = analyze_source("bad.ll", "define i32 @f( {", &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_analyze_source_iteration_limit() {
        let config = AnalysisConfig::default().with_max_iterations(1);
        let err = analyze_source("guarded.ll", GUARDED, &config).unwrap_err();
        assert!(matches!(
            err,
            Error::Analysis(AnalysisError::IterationLimit { limit: 1, .. })
        ));
    }
}
