use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use colored::Color;
use divzero_core::{AnalysisResult, Diagnostic, DiagnosticKind, Function};
use serde::Serialize;
use serde_json::json;
use std::io::Write;

#[derive(Debug, Clone, Serialize)]
pub struct FunctionReport {
    pub name: String,
    pub divisions: usize,
    pub iterations: usize,
    #[serde(skip)]
    pub result: AnalysisResult,
}

/// Analysis results of every function defined in one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub functions: Vec<FunctionReport>,
}

impl FileReport {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            functions: Vec::new(),
        }
    }

    pub fn push(&mut self, function: &Function, result: AnalysisResult) {
        self.functions.push(FunctionReport {
            name: function.name.clone(),
            divisions: function.divisions().count(),
            iterations: result.iterations(),
            result,
        });
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.functions
            .iter()
            .flat_map(|f| f.result.diagnostics().iter())
    }

    pub fn division_count(&self) -> usize {
        self.functions.iter().map(|f| f.divisions).sum()
    }

    pub fn flagged_count(&self) -> usize {
        self.diagnostics().count()
    }
}

/// `file:line:col: function: possible division by zero (...)`, one line per diagnostic.
pub fn format_diagnostic(file: &str, diagnostic: &Diagnostic) -> String {
    match diagnostic.location {
        Some(_) => format!("{}:{}", file, diagnostic),
        None => format!("{}: {} [{}]", file, diagnostic, diagnostic.block),
    }
}

pub struct TextReportEmitter {
    config: EmitterConfig,
}

impl TextReportEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }
}

impl Emitter for TextReportEmitter {
    type Item = [FileReport];

    fn context(&self) -> EmitContext {
        EmitContext::from_config(&self.config)
    }

    fn emit<W: Write>(
        &self,
        reports: &[FileReport],
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        for report in reports {
            for diagnostic in report.diagnostics() {
                let color = match diagnostic.kind {
                    DiagnosticKind::ConstantZero => Color::Red,
                    DiagnosticKind::PossiblyZero => Color::Yellow,
                };
                EmitHelper::write_colored_line(
                    writer,
                    context,
                    &format_diagnostic(&report.file, diagnostic),
                    color,
                )?;
                if self.config.verbosity.should_print_locations() {
                    EmitHelper::write_line(writer, &context.nested(), &diagnostic.instruction)?;
                }
            }
        }

        if !self.config.verbosity.is_quiet() {
            let flagged: usize = reports.iter().map(FileReport::flagged_count).sum();
            let divisions: usize = reports.iter().map(FileReport::division_count).sum();
            let functions: usize = reports.iter().map(|r| r.functions.len()).sum();
            let summary = format!(
                "{} of {} divisions flagged in {} functions across {} files",
                flagged,
                divisions,
                functions,
                reports.len()
            );
            let color = if flagged == 0 { Color::Green } else { Color::Yellow };
            EmitHelper::write_colored_line(writer, context, &summary, color)?;
        }
        Ok(())
    }
}

pub struct JsonReportEmitter;

impl JsonReportEmitter {
    pub fn to_value(reports: &[FileReport]) -> serde_json::Value {
        let files: Vec<_> = reports
            .iter()
            .map(|report| {
                json!({
                    "file": report.file,
                    "functions": report.functions,
                    "diagnostics": report.diagnostics().collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "files": files,
            "summary": {
                "files": reports.len(),
                "functions": reports.iter().map(|r| r.functions.len()).sum::<usize>(),
                "divisions": reports.iter().map(FileReport::division_count).sum::<usize>(),
                "flagged": reports.iter().map(FileReport::flagged_count).sum::<usize>(),
            }
        })
    }
}

impl Emitter for JsonReportEmitter {
    type Item = [FileReport];

    fn emit<W: Write>(
        &self,
        reports: &[FileReport],
        writer: &mut W,
        _context: &mut EmitContext,
    ) -> EmitResult {
        serde_json::to_writer_pretty(&mut *writer, &Self::to_value(reports))?;
        writeln!(writer)?;
        Ok(())
    }
}
