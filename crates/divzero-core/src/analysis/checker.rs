use super::domain::AbstractValue;
use super::memory::Memory;
use crate::function::{Function, InstId};
use crate::values::{SourceLocation, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The divisor is the literal zero.
    ConstantZero,
    /// The divisor was not proven nonzero.
    PossiblyZero,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::ConstantZero => write!(f, "division by zero"),
            DiagnosticKind::PossiblyZero => write!(f, "possible division by zero"),
        }
    }
}

/// A division whose divisor the analysis could not prove nonzero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub function: String,
    pub inst: InstId,
    pub block: String,
    pub location: Option<SourceLocation>,
    pub instruction: String,
    pub divisor: String,
    pub divisor_value: AbstractValue,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = self.location {
            write!(f, "{}: ", location)?;
        }
        write!(
            f,
            "{}: {} (divisor {} is {})",
            self.function, self.kind, self.divisor, self.divisor_value
        )
    }
}

/// Classifies divisions against fixpoint In memories.
pub struct Checker<'a> {
    function: &'a Function,
}

impl<'a> Checker<'a> {
    pub fn new(function: &'a Function) -> Self {
        Self { function }
    }

    /// Abstract value of the divisor of `inst`, or `None` if `inst` is not a division.
    pub fn divisor_value(&self, inst: InstId, memory: &Memory) -> Option<AbstractValue> {
        let divisor = self.function.instruction(inst)?.divisor()?;
        Some(match divisor {
            Value::Constant(constant) => AbstractValue::from_constant(constant),
            Value::Register(id) => memory.get_or(id, AbstractValue::MaybeZero),
            Value::Undefined => AbstractValue::MaybeZero,
        })
    }

    /// True when `inst` is a division whose divisor is not proven nonzero.
    pub fn check(&self, inst: InstId, memory: &Memory) -> bool {
        self.divisor_value(inst, memory)
            .map_or(false, |value| !value.is_proven_nonzero())
    }

    pub fn diagnose(&self, inst: InstId, memory: &Memory) -> Option<Diagnostic> {
        let instruction = self.function.instruction(inst)?;
        let divisor = instruction.divisor()?;
        let divisor_value = self.divisor_value(inst, memory)?;
        if divisor_value.is_proven_nonzero() {
            return None;
        }

        let kind = match divisor.as_constant() {
            Some(constant) if constant.is_zero() => DiagnosticKind::ConstantZero,
            _ => DiagnosticKind::PossiblyZero,
        };

        Some(Diagnostic {
            function: self.function.name.clone(),
            inst,
            block: self.function.block_label(inst.block),
            location: self.function.location(inst),
            instruction: instruction.to_string(),
            divisor: divisor.to_string(),
            divisor_value,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::types::Type;
    use crate::values::ValueId;
    use AbstractValue::*;

    fn divide_by(divisor: Value) -> Function {
        let mut func = FunctionBuilder::new("f", Type::i32());
        func.param("x", Type::i32());
        let mut entry = func.entry_block();
        entry.set_source_location(SourceLocation::new(4, 12));
        let q = entry.named("d").sdiv(Value::int(10, 32), divisor, Type::i32());
        entry.clear_source_location();
        entry.return_value(Type::i32(), q).unwrap();
        func.build().unwrap()
    }

    fn first(function: &Function) -> InstId {
        InstId::new(function.entry_block, 0)
    }

    #[test]
    fn test_literal_divisors() {
        let zero = divide_by(Value::int(0, 32));
        let checker = Checker::new(&zero);
        assert!(checker.check(first(&zero), &Memory::new()));
        let diag = checker.diagnose(first(&zero), &Memory::new()).unwrap();
        assert_eq!(diag.kind, DiagnosticKind::ConstantZero);
        assert_eq!(diag.location, Some(SourceLocation::new(4, 12)));
        assert_eq!(diag.to_string(), "4:12: f: division by zero (divisor 0 is Zero)");

        let seven = divide_by(Value::int(7, 32));
        let checker = Checker::new(&seven);
        assert!(!checker.check(first(&seven), &Memory::new()));
        assert!(checker.diagnose(first(&seven), &Memory::new()).is_none());
    }

    #[test]
    fn test_register_divisor_needs_proof() {
        let function = divide_by(Value::local("x"));
        let checker = Checker::new(&function);
        let at = first(&function);

        for (value, flagged) in [(Zero, true), (MaybeZero, true), (Uninit, true), (NonZero, false)] {
            let memory: Memory = [(ValueId::local("x"), value)].into_iter().collect();
            assert_eq!(checker.check(at, &memory), flagged, "divisor {}", value);
        }
        assert!(checker.check(at, &Memory::new()));
        let diag = checker.diagnose(at, &Memory::new()).unwrap();
        assert_eq!(diag.kind, DiagnosticKind::PossiblyZero);
        assert_eq!(diag.divisor, "%x");
        assert_eq!(diag.block, "entry");
    }

    #[test]
    fn test_non_division_is_never_flagged() {
        let function = divide_by(Value::int(0, 32));
        let ret = InstId::new(function.entry_block, 1);
        assert!(!Checker::new(&function).check(ret, &Memory::new()));
    }
}
