/*! Render analysis results for people and tools.
 *
 * A diagnostic is only useful if someone reads it. The report emitters print one line per flagged
 * division (colored for terminals, JSON for pipelines), and the annotated IR emitter prints the
 * function back with the abstract memory before and after every instruction, which is how you
 * find out why a division was not proven safe.
 */

pub mod annotated_ir_emitter;
pub mod config;
pub mod emitter;
pub mod output;
pub mod report;

pub use annotated_ir_emitter::AnnotatedIREmitter;
pub use config::{EmitterConfig, IndentStyle, VerbosityLevel};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use output::OutputFormat;
pub use report::{format_diagnostic, FileReport, JsonReportEmitter, TextReportEmitter};
