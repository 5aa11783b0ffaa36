use divzero::emit::format_diagnostic;
use divzero::{analyze_source, AnalysisConfig, AnalysisMode, DiagnosticKind};
use pretty_assertions::assert_eq;

const INPUT_DIVISION: &str = include_str!("../../divzero-parser/tests/data/input_division.ll");
const LOOPS: &str = include_str!("../../divzero-parser/tests/data/loops.ll");

#[test]
fn test_input_division_report() {
    let report = analyze_source(
        "input_division.ll",
        INPUT_DIVISION,
        &AnalysisConfig::default(),
    )
    .unwrap();

    let lines: Vec<String> = report
        .diagnostics()
        .map(|d| format_diagnostic(&report.file, d))
        .collect();
    assert_eq!(
        lines,
        vec!["input_division.ll:5:14: main: possible division by zero (divisor %7 is MaybeZero)"]
    );
}

#[test]
fn test_basic_mode_flags_loaded_divisors() {
    let config = AnalysisConfig::default().with_mode(AnalysisMode::Basic);
    let report = analyze_source("input_division.ll", INPUT_DIVISION, &config).unwrap();
    assert_eq!(report.division_count(), 2);
    assert_eq!(report.flagged_count(), 2);
}

#[test]
fn test_loops_report() {
    let report = analyze_source("loops.ll", LOOPS, &AnalysisConfig::default()).unwrap();
    let flagged: Vec<(&str, &str, DiagnosticKind)> = report
        .diagnostics()
        .map(|d| (d.function.as_str(), d.divisor.as_str(), d.kind))
        .collect();
    assert_eq!(
        flagged,
        vec![
            ("sum_div", "%5", DiagnosticKind::PossiblyZero),
            ("widen", "%3", DiagnosticKind::PossiblyZero),
            ("widen", "%6", DiagnosticKind::PossiblyZero),
        ]
    );
}

#[test]
fn test_literal_zero_divisor() {
    let source = "define i32 @f(i32 %x) {\n  %q = udiv i32 %x, 0\n  ret i32 %q\n}\n";
    let report = analyze_source("zero.ll", source, &AnalysisConfig::default()).unwrap();
    let diagnostic = report.diagnostics().next().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::ConstantZero);
    assert_eq!(
        format_diagnostic(&report.file, diagnostic),
        "zero.ll: f: division by zero (divisor 0 is Zero) [0]"
    );
}
