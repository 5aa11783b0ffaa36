use super::alias::AliasOracle;
use super::config::{AnalysisConfig, AnalysisMode};
use super::domain::AbstractValue;
use super::memory::Memory;
use crate::instructions::{BinaryOp, CastOp, Instruction, IntPredicate};
use crate::values::{Constant, Value, ValueId};
use indexmap::IndexSet;
use num_bigint::{BigInt, Sign};
use tracing::trace;

/// Per-instruction abstract semantics.
///
/// `apply` never mutates the incoming memory. The outgoing memory is a copy with at most the
/// instruction's destination variables rebound.
pub struct TransferFunction<'a> {
    config: &'a AnalysisConfig,
    oracle: &'a dyn AliasOracle,
    pointers: &'a IndexSet<ValueId>,
}

impl<'a> TransferFunction<'a> {
    pub fn new(
        config: &'a AnalysisConfig,
        oracle: &'a dyn AliasOracle,
        pointers: &'a IndexSet<ValueId>,
    ) -> Self {
        Self {
            config,
            oracle,
            pointers,
        }
    }

    fn pointer_aware(&self) -> bool {
        self.config.mode == AnalysisMode::PointerAware
    }

    /// Literals classify exactly; anything else is looked up, unbound meaning unknown.
    pub fn resolve(&self, value: &Value, memory: &Memory) -> AbstractValue {
        match value {
            Value::Constant(Constant::Float(_)) => AbstractValue::MaybeZero,
            Value::Constant(constant) => AbstractValue::from_constant(constant),
            Value::Register(id) => memory.get_or(id, AbstractValue::MaybeZero),
            Value::Undefined => AbstractValue::MaybeZero,
        }
    }

    pub fn apply(&self, inst: &Instruction, incoming: &Memory) -> Memory {
        let mut out = incoming.clone();

        match inst {
            Instruction::Binary {
                result,
                op,
                left,
                right,
                ..
            } => {
                let value = if *op == BinaryOp::Sub && left == right {
                    AbstractValue::Zero
                } else {
                    let (l, r) = (self.resolve(left, incoming), self.resolve(right, incoming));
                    match op {
                        BinaryOp::Add => l.add(r),
                        BinaryOp::Sub => l.sub(r),
                        BinaryOp::Mul => l.mul(r),
                        BinaryOp::SDiv | BinaryOp::UDiv => l.div(r),
                        _ => AbstractValue::MaybeZero,
                    }
                };
                self.bind(&mut out, result, value);
            }

            Instruction::Cast {
                result,
                op,
                value,
                to,
                ..
            } => {
                let abstract_value = match (op, value) {
                    // Truncation can drop every set bit of a nonzero value.
                    (CastOp::Trunc, Value::Constant(Constant::Int { value, .. })) => {
                        match to.bit_width() {
                            Some(bits) => AbstractValue::from_constant(&Constant::Int {
                                value: value.clone(),
                                bits,
                            }),
                            None => AbstractValue::MaybeZero,
                        }
                    }
                    (CastOp::Trunc, _) => match self.resolve(value, incoming) {
                        AbstractValue::Zero => AbstractValue::Zero,
                        _ => AbstractValue::MaybeZero,
                    },
                    _ => self.resolve(value, incoming),
                };
                self.bind(&mut out, result, abstract_value);
            }

            Instruction::ICmp {
                result,
                predicate,
                left,
                right,
                ..
            } => {
                let value = match (left.as_constant(), right.as_constant()) {
                    (Some(l), Some(r)) => match fold_icmp(*predicate, l, r) {
                        Some(true) => AbstractValue::NonZero,
                        Some(false) => AbstractValue::Zero,
                        None => AbstractValue::MaybeZero,
                    },
                    _ => AbstractValue::MaybeZero,
                };
                self.bind(&mut out, result, value);
            }

            Instruction::Call {
                result: Some(result),
                ret_ty,
                callee,
                ..
            } => {
                if self.config.is_input_function(callee)
                    || (self.pointer_aware() && ret_ty.is_integer())
                {
                    self.bind(&mut out, result, AbstractValue::MaybeZero);
                }
            }

            Instruction::Store { value, ptr, .. } if self.pointer_aware() => {
                if let Some(dest) = ptr.as_register() {
                    let stored = self.resolve(value, incoming);
                    self.bind(&mut out, dest, stored);
                    for alias in self.aliases_of(dest) {
                        self.bind(&mut out, alias, stored);
                    }
                }
            }

            Instruction::Load { result, ty, ptr } if self.pointer_aware() && ty.is_integer() => {
                let value = match ptr.as_register() {
                    Some(source) => self.aliases_of(source).fold(
                        incoming.get_or(source, AbstractValue::MaybeZero),
                        |acc, alias| acc.join(incoming.get_or(alias, AbstractValue::Uninit)),
                    ),
                    None => AbstractValue::MaybeZero,
                };
                self.bind(&mut out, result, value);
            }

            Instruction::Phi {
                result, incoming: edges, ..
            } => {
                let value = edges
                    .iter()
                    .map(|(value, _)| self.resolve(value, incoming))
                    .fold(AbstractValue::Uninit, AbstractValue::join);
                self.bind(&mut out, result, value);
            }

            Instruction::Select {
                result,
                condition,
                then_val,
                else_val,
                ..
            } => {
                let value = match condition.as_int_literal() {
                    Some(c) if c.is_zero() => self.resolve(else_val, incoming),
                    Some(_) => self.resolve(then_val, incoming),
                    None => self
                        .resolve(then_val, incoming)
                        .join(self.resolve(else_val, incoming)),
                };
                self.bind(&mut out, result, value);
            }

            Instruction::Call { result: None, .. }
            | Instruction::Opaque { .. }
            | Instruction::Store { .. }
            | Instruction::Load { .. }
            | Instruction::Alloca { .. }
            | Instruction::GetElementPtr { .. }
            | Instruction::Jump { .. }
            | Instruction::Branch { .. }
            | Instruction::Switch { .. }
            | Instruction::Return { .. }
            | Instruction::Unreachable => {}
        }

        out
    }

    /// Other pointer variables the oracle says may share a location with `ptr`.
    fn aliases_of<'s>(&'s self, ptr: &'s ValueId) -> impl Iterator<Item = &'s ValueId> + 's {
        self.pointers
            .iter()
            .filter(move |other| *other != ptr && self.oracle.may_alias(ptr, other))
    }

    fn bind(&self, memory: &mut Memory, var: &ValueId, value: AbstractValue) {
        trace!(var = %var, value = %value, "bind");
        memory.set(var.clone(), value);
    }
}

/// Evaluates an integer comparison between two literals at their bit width.
pub fn fold_icmp(predicate: IntPredicate, left: &Constant, right: &Constant) -> Option<bool> {
    use IntPredicate::*;

    Some(match predicate {
        Eq => unsigned(left)? == unsigned(right)?,
        Ne => unsigned(left)? != unsigned(right)?,
        Ugt => unsigned(left)? > unsigned(right)?,
        Uge => unsigned(left)? >= unsigned(right)?,
        Ult => unsigned(left)? < unsigned(right)?,
        Ule => unsigned(left)? <= unsigned(right)?,
        Sgt => signed(left)? > signed(right)?,
        Sge => signed(left)? >= signed(right)?,
        Slt => signed(left)? < signed(right)?,
        Sle => signed(left)? <= signed(right)?,
    })
}

fn unsigned(constant: &Constant) -> Option<BigInt> {
    match constant {
        Constant::Null => Some(BigInt::default()),
        Constant::Int { .. } => constant
            .unsigned_value()
            .map(|v| BigInt::from_biguint(Sign::Plus, v)),
        Constant::Float(_) => None,
    }
}

fn signed(constant: &Constant) -> Option<BigInt> {
    match constant {
        Constant::Null => Some(BigInt::default()),
        Constant::Int { .. } => constant.signed_value(),
        Constant::Float(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::alias::NoAliasOracle;
    use crate::types::Type;
    use pretty_assertions::assert_eq;
    use AbstractValue::*;

    struct AllAlias;

    impl AliasOracle for AllAlias {
        fn may_alias(&self, _: &ValueId, _: &ValueId) -> bool {
            true
        }
    }

    fn id(name: &str) -> ValueId {
        ValueId::local(name)
    }

    fn binary(op: BinaryOp, left: Value, right: Value) -> Instruction {
        Instruction::Binary {
            result: id("r"),
            op,
            left,
            right,
            ty: Type::i32(),
        }
    }

    fn icmp(predicate: IntPredicate, l: i64, r: i64, bits: u16) -> Instruction {
        Instruction::ICmp {
            result: id("c"),
            predicate,
            left: Value::int(l, bits),
            right: Value::int(r, bits),
            ty: Type::Int(bits),
        }
    }

    fn with_transfer<R>(mode: AnalysisMode, f: impl FnOnce(&TransferFunction<'_>) -> R) -> R {
        let config = AnalysisConfig::default().with_mode(mode);
        let pointers: IndexSet<ValueId> = [id("p"), id("q")].into_iter().collect();
        let oracle = AllAlias;
        let transfer = TransferFunction::new(&config, &oracle, &pointers);
        f(&transfer)
    }

    #[test]
    fn test_binary_constants() {
        with_transfer(AnalysisMode::Basic, |t| {
            let out = t.apply(
                &binary(BinaryOp::Add, Value::int(5, 32), Value::int(3, 32)),
                &Memory::new(),
            );
            assert_eq!(out.get(&id("r")), Some(NonZero));

            let out = t.apply(
                &binary(BinaryOp::Mul, Value::int(0, 32), Value::local("x")),
                &Memory::new(),
            );
            assert_eq!(out.get(&id("r")), Some(Zero));

            let out = t.apply(
                &binary(BinaryOp::Xor, Value::int(5, 32), Value::int(3, 32)),
                &Memory::new(),
            );
            assert_eq!(out.get(&id("r")), Some(MaybeZero));
        });
    }

    #[test]
    fn test_self_subtraction_is_zero() {
        with_transfer(AnalysisMode::Basic, |t| {
            let mut memory = Memory::new();
            memory.set(id("x"), MaybeZero);
            let out = t.apply(
                &binary(BinaryOp::Sub, Value::local("x"), Value::local("x")),
                &memory,
            );
            assert_eq!(out.get(&id("r")), Some(Zero));
            assert_eq!(out.get(&id("x")), Some(MaybeZero));
        });
    }

    #[test]
    fn test_incoming_memory_is_untouched() {
        with_transfer(AnalysisMode::Basic, |t| {
            let memory: Memory = [(id("r"), Zero)].into_iter().collect();
            let out = t.apply(
                &binary(BinaryOp::Add, Value::int(1, 32), Value::int(0, 32)),
                &memory,
            );
            assert_eq!(memory.get(&id("r")), Some(Zero));
            assert_eq!(out.get(&id("r")), Some(NonZero));
        });
    }

    #[test]
    fn test_casts() {
        with_transfer(AnalysisMode::Basic, |t| {
            let memory: Memory = [(id("x"), NonZero)].into_iter().collect();
            let zext = Instruction::Cast {
                result: id("r"),
                op: CastOp::ZExt,
                value: Value::local("x"),
                from: Type::i8(),
                to: Type::i32(),
            };
            assert_eq!(t.apply(&zext, &memory).get(&id("r")), Some(NonZero));

            let trunc = Instruction::Cast {
                result: id("r"),
                op: CastOp::Trunc,
                value: Value::local("x"),
                from: Type::i32(),
                to: Type::i8(),
            };
            assert_eq!(t.apply(&trunc, &memory).get(&id("r")), Some(MaybeZero));

            let trunc_literal = Instruction::Cast {
                result: id("r"),
                op: CastOp::Trunc,
                value: Value::int(256, 32),
                from: Type::i32(),
                to: Type::i8(),
            };
            assert_eq!(t.apply(&trunc_literal, &memory).get(&id("r")), Some(Zero));
        });
    }

    #[test]
    fn test_icmp_folds_all_predicates() {
        use IntPredicate::*;

        let cases = [
            (Eq, 5, 0, false),
            (Eq, 7, 7, true),
            (Ne, 5, 0, true),
            (Ugt, -1, 1, true),
            (Uge, 0, 0, true),
            (Ult, -1, 1, false),
            (Ule, 1, -1, true),
            (Sgt, -1, 1, false),
            (Sge, -1, -1, true),
            (Slt, -1, 1, true),
            (Sle, 2, 1, false),
        ];
        with_transfer(AnalysisMode::Basic, |t| {
            for (predicate, l, r, expected) in cases {
                let out = t.apply(&icmp(predicate, l, r, 32), &Memory::new());
                let want = if expected { NonZero } else { Zero };
                assert_eq!(
                    out.get(&id("c")),
                    Some(want),
                    "icmp {} {}, {}",
                    predicate.mnemonic(),
                    l,
                    r
                );
            }
        });
    }

    #[test]
    fn test_icmp_respects_bit_width() {
        // 255 and -1 are the same i8 bit pattern.
        assert_eq!(
            fold_icmp(IntPredicate::Eq, &Constant::int(255, 8), &Constant::int(-1, 8)),
            Some(true)
        );
        assert_eq!(
            fold_icmp(IntPredicate::Slt, &Constant::int(128, 8), &Constant::int(0, 8)),
            Some(true)
        );
        assert_eq!(
            fold_icmp(IntPredicate::Ult, &Constant::int(128, 8), &Constant::int(0, 8)),
            Some(false)
        );
    }

    #[test]
    fn test_icmp_with_register_is_unknown() {
        with_transfer(AnalysisMode::Basic, |t| {
            let inst = Instruction::ICmp {
                result: id("c"),
                predicate: IntPredicate::Eq,
                left: Value::local("x"),
                right: Value::int(0, 32),
                ty: Type::i32(),
            };
            let memory: Memory = [(id("x"), Zero)].into_iter().collect();
            assert_eq!(t.apply(&inst, &memory).get(&id("c")), Some(MaybeZero));
        });
    }

    #[test]
    fn test_calls() {
        let input = Instruction::Call {
            result: Some(id("r")),
            ret_ty: Type::i32(),
            callee: "getchar".to_string(),
            args: Vec::new(),
        };
        let other = Instruction::Call {
            result: Some(id("r")),
            ret_ty: Type::i32(),
            callee: "abs".to_string(),
            args: vec![(Type::i32(), Value::int(3, 32))],
        };
        let seeded: Memory = [(id("r"), NonZero)].into_iter().collect();

        with_transfer(AnalysisMode::Basic, |t| {
            assert_eq!(t.apply(&input, &seeded).get(&id("r")), Some(MaybeZero));
            assert_eq!(t.apply(&other, &seeded).get(&id("r")), Some(NonZero));
        });
        with_transfer(AnalysisMode::PointerAware, |t| {
            assert_eq!(t.apply(&other, &seeded).get(&id("r")), Some(MaybeZero));
        });
    }

    #[test]
    fn test_store_updates_aliases() {
        let store = Instruction::Store {
            value: Value::int(0, 32),
            ty: Type::i32(),
            ptr: Value::local("p"),
        };
        with_transfer(AnalysisMode::PointerAware, |t| {
            let out = t.apply(&store, &Memory::new());
            assert_eq!(out.get(&id("p")), Some(Zero));
            assert_eq!(out.get(&id("q")), Some(Zero));
        });
        with_transfer(AnalysisMode::Basic, |t| {
            assert!(t.apply(&store, &Memory::new()).is_empty());
        });
    }

    #[test]
    fn test_load_joins_aliases() {
        let load = Instruction::Load {
            result: id("v"),
            ty: Type::i32(),
            ptr: Value::local("q"),
        };
        with_transfer(AnalysisMode::PointerAware, |t| {
            let memory: Memory = [(id("q"), Zero)].into_iter().collect();
            assert_eq!(t.apply(&load, &memory).get(&id("v")), Some(Zero));

            let memory: Memory = [(id("q"), Zero), (id("p"), NonZero)].into_iter().collect();
            assert_eq!(t.apply(&load, &memory).get(&id("v")), Some(MaybeZero));

            assert_eq!(t.apply(&load, &Memory::new()).get(&id("v")), Some(MaybeZero));
        });
    }

    #[test]
    fn test_no_alias_oracle_keeps_locations_apart() {
        let config = AnalysisConfig::pointer_aware();
        let pointers: IndexSet<ValueId> = [id("p"), id("q")].into_iter().collect();
        let t = TransferFunction::new(&config, &NoAliasOracle, &pointers);
        let store = Instruction::Store {
            value: Value::int(0, 32),
            ty: Type::i32(),
            ptr: Value::local("p"),
        };
        let out = t.apply(&store, &Memory::new());
        assert_eq!(out.get(&id("p")), Some(Zero));
        assert_eq!(out.get(&id("q")), None);
    }

    #[test]
    fn test_phi_and_select_join() {
        with_transfer(AnalysisMode::Basic, |t| {
            let memory: Memory = [(id("a"), Zero), (id("b"), NonZero)].into_iter().collect();
            let phi = Instruction::Phi {
                result: id("r"),
                ty: Type::i32(),
                incoming: vec![
                    (Value::local("b"), crate::block::BlockId(0)),
                    (Value::int(4, 32), crate::block::BlockId(1)),
                ],
            };
            assert_eq!(t.apply(&phi, &memory).get(&id("r")), Some(NonZero));

            let select = Instruction::Select {
                result: id("r"),
                condition: Value::local("c"),
                ty: Type::i32(),
                then_val: Value::local("a"),
                else_val: Value::local("b"),
            };
            assert_eq!(t.apply(&select, &memory).get(&id("r")), Some(MaybeZero));
        });
    }
}
