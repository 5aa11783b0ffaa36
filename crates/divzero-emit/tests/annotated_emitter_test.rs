use divzero_core::{analyze_function, AnalysisConfig, Module};
use divzero_emit::{
    AnnotatedIREmitter, Emitter, EmitterConfig, FileReport, JsonReportEmitter, TextReportEmitter,
    VerbosityLevel,
};
use pretty_assertions::assert_eq;

const LOOPS: &str = include_str!("../../divzero-parser/tests/data/loops.ll");

fn report_for(file: &str, module: &Module) -> FileReport {
    let config = AnalysisConfig::pointer_aware();
    let mut report = FileReport::new(file);
    for function in module.functions.values() {
        let result = analyze_function(function, &config).unwrap();
        report.push(function, result);
    }
    report
}

#[test]
fn test_annotated_emitter_basic() {
    let source = "define i32 @f(i32 %x) {\n\
                  entry:\n\
                  \x20 %q = sdiv i32 10, %x\n\
                  \x20 ret i32 %q\n\
                  }\n";
    let module = divzero_parser::parse_module(source).unwrap();
    let function = module.function("f").unwrap();
    let result = analyze_function(function, &AnalysisConfig::pointer_aware()).unwrap();

    let output = AnnotatedIREmitter::new(&result)
        .with_config(EmitterConfig::plain())
        .emit_to_string(function)
        .unwrap();

    insta::assert_snapshot!(output.trim_end(), @r###"
define i32 @f(i32 %x) {
entry:
    %q = sdiv i32 10, %x  ; <- possible division by zero
        ; in:  {%x -> MaybeZero}
        ; out: {%q -> MaybeZero, %x -> MaybeZero}
    ret i32 %q
        ; in:  {%q -> MaybeZero, %x -> MaybeZero}
        ; out: {%q -> MaybeZero, %x -> MaybeZero}
}
"###);
}

#[test]
fn test_annotated_emitter_loop_memories() {
    let module = divzero_parser::parse_module(LOOPS).unwrap();
    let function = module.function("sum_div").unwrap();
    let result = analyze_function(function, &AnalysisConfig::pointer_aware()).unwrap();

    let output = AnnotatedIREmitter::new(&result)
        .with_config(EmitterConfig::plain())
        .emit_to_string(function)
        .unwrap();

    assert!(output.starts_with("define i32 @sum_div(i32 %0) {\n1:\n"));
    assert!(output.contains("\n3:\n"));
    assert!(output.contains("%6 = sdiv i32 100, %5  ; <- possible division by zero\n"));
    assert!(output.contains("%5 -> MaybeZero"));
}

#[test]
fn test_text_report_over_parsed_module() {
    let module = divzero_parser::parse_module(LOOPS).unwrap();
    let report = report_for("loops.ll", &module);

    assert_eq!(report.functions.len(), 3);
    assert_eq!(report.division_count(), 4);
    assert_eq!(report.flagged_count(), 3);

    let output = TextReportEmitter::new(EmitterConfig::plain())
        .emit_to_string(&[report])
        .unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "loops.ll: sum_div: possible division by zero (divisor %5 is MaybeZero) [3]",
            "loops.ll: widen: possible division by zero (divisor %3 is MaybeZero) [1]",
            "loops.ll: widen: possible division by zero (divisor %6 is Zero) [1]",
            "3 of 4 divisions flagged in 3 functions across 1 files",
        ]
    );
}

#[test]
fn test_verbose_text_report_prints_instruction() {
    let module = divzero_parser::parse_module(LOOPS).unwrap();
    let report = report_for("loops.ll", &module);

    let config = EmitterConfig::plain().with_verbosity(VerbosityLevel::Verbose);
    let output = TextReportEmitter::new(config)
        .emit_to_string(&[report])
        .unwrap();
    assert!(output.contains("\n    %7 = udiv i64 %4, %6\n"));
}

#[test]
fn test_json_report_over_parsed_module() {
    let module = divzero_parser::parse_module(LOOPS).unwrap();
    let value = JsonReportEmitter::to_value(&[report_for("loops.ll", &module)]);

    assert_eq!(value["summary"]["functions"], 3);
    assert_eq!(value["summary"]["divisions"], 4);
    assert_eq!(value["summary"]["flagged"], 3);
    let names: Vec<&str> = value["files"][0]["functions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert_eq!(names, vec!["sum_div", "pick", "widen"]);
}
