use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use colored::Color;
use divzero_core::{AnalysisResult, Function, InstId, Instruction, Memory};
use std::io::Write;

/// Prints a function with the fixpoint memories around each instruction.
///
/// Flagged divisions are marked in place, so the memory that failed to prove the divisor
/// nonzero sits right under the offending line.
pub struct AnnotatedIREmitter<'a> {
    result: &'a AnalysisResult,
    config: EmitterConfig,
}

impl<'a> AnnotatedIREmitter<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        Self {
            result,
            config: EmitterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EmitterConfig) -> Self {
        self.config = config;
        self
    }

    fn summary(&self, function: &Function) -> String {
        format!(
            "function @{}: {} of {} divisions flagged after {} iterations",
            function.name,
            self.result.diagnostics().len(),
            function.divisions().count(),
            self.result.iterations()
        )
    }

    fn emit_instruction<W: Write>(
        &self,
        function: &Function,
        id: InstId,
        inst: &Instruction,
        writer: &mut W,
        context: &EmitContext,
    ) -> EmitResult {
        let text = inst.to_string_with(|block| function.block_label(block));
        match self.result.diagnostics().iter().find(|d| d.inst == id) {
            Some(diagnostic) => EmitHelper::write_colored_line(
                writer,
                context,
                &format!("{}  ; <- {}", text, diagnostic.kind),
                Color::Red,
            )?,
            None => EmitHelper::write_line(writer, context, &text)?,
        }

        let nested = context.nested();
        let verbosity = self.config.verbosity;
        if verbosity.should_print_locations() {
            if let Some(location) = function.location(id) {
                EmitHelper::write_comment(writer, &nested, &format!("at {}", location))?;
            }
        }
        if verbosity.should_print_memories() {
            let show = |memory: Option<&Memory>| {
                memory.map_or_else(|| "unreached".to_string(), Memory::to_string)
            };
            EmitHelper::write_comment(
                writer,
                &nested,
                &format!("in:  {}", show(self.result.in_memory(id))),
            )?;
            EmitHelper::write_comment(
                writer,
                &nested,
                &format!("out: {}", show(self.result.out_memory(id))),
            )?;
        }
        Ok(())
    }
}

impl Emitter for AnnotatedIREmitter<'_> {
    type Item = Function;

    fn context(&self) -> EmitContext {
        EmitContext::from_config(&self.config)
    }

    fn emit<W: Write>(
        &self,
        function: &Function,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        if self.config.verbosity.should_print_summary() {
            EmitHelper::write_comment(writer, context, &self.summary(function))?;
        }

        let params = function
            .params
            .iter()
            .map(|p| format!("{} {}", p.param_type, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        let header = format!(
            "define {} @{}({})",
            function.return_type, function.name, params
        );

        EmitHelper::write_block(writer, context, &header, |w, ctx| {
            for (position, block) in function.blocks.values().enumerate() {
                if position > 0 {
                    writeln!(w)?;
                }
                ctx.dedent();
                EmitHelper::write_line(w, ctx, &format!("{}:", block.label))?;
                ctx.indent();
                for (index, inst) in block.instructions.iter().enumerate() {
                    self.emit_instruction(function, InstId::new(block.id, index), inst, w, ctx)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerbosityLevel;
    use divzero_core::{analyze_function, AnalysisConfig, FunctionBuilder, SourceLocation, Type, Value};

    fn guarded() -> Function {
        let mut func = FunctionBuilder::new("g", Type::i32());
        let x = func.param("x", Type::i32());
        let entry = func.create_block("entry");
        let done = func.create_block("done");

        let mut b = func.block(entry);
        b.set_source_location(SourceLocation::new(3, 9));
        let q = b.named("q").udiv(Value::int(8, 32), x, Type::i32());
        b.jump(done).unwrap();

        let mut b = func.block(done);
        b.return_value(Type::i32(), q).unwrap();
        func.build().unwrap()
    }

    #[test]
    fn test_quiet_marks_only() {
        let function = guarded();
        let result = analyze_function(&function, &AnalysisConfig::default()).unwrap();
        let config = EmitterConfig::plain().with_verbosity(VerbosityLevel::Quiet);
        let output = AnnotatedIREmitter::new(&result)
            .with_config(config)
            .emit_to_string(&function)
            .unwrap();

        assert_eq!(
            output,
            "define i32 @g(i32 %x) {\n\
             entry:\n    \
             %q = udiv i32 8, %x  ; <- possible division by zero\n    \
             br label %done\n\
             \n\
             done:\n    \
             ret i32 %q\n\
             }\n"
        );
    }

    #[test]
    fn test_verbose_adds_locations_and_summary() {
        let function = guarded();
        let result = analyze_function(&function, &AnalysisConfig::default()).unwrap();
        let config = EmitterConfig::plain().with_verbosity(VerbosityLevel::Verbose);
        let output = AnnotatedIREmitter::new(&result)
            .with_config(config)
            .emit_to_string(&function)
            .unwrap();

        assert!(output.starts_with("; function @g: 1 of 1 divisions flagged after"));
        assert!(output.contains("        ; at 3:9\n"));
        assert!(output.contains("        ; in:  {%x -> MaybeZero}\n"));
    }
}
