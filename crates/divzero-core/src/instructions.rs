use crate::block::BlockId;
use crate::types::Type;
use crate::values::{Value, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "sdiv" => BinaryOp::SDiv,
            "udiv" => BinaryOp::UDiv,
            "srem" => BinaryOp::SRem,
            "urem" => BinaryOp::URem,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            "shl" => BinaryOp::Shl,
            "lshr" => BinaryOp::LShr,
            "ashr" => BinaryOp::AShr,
            _ => return None,
        })
    }

    pub fn is_division(&self) -> bool {
        matches!(self, BinaryOp::SDiv | BinaryOp::UDiv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastOp {
    ZExt,
    SExt,
    Trunc,
    BitCast,
    PtrToInt,
    IntToPtr,
}

impl CastOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::Trunc => "trunc",
            CastOp::BitCast => "bitcast",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "zext" => CastOp::ZExt,
            "sext" => CastOp::SExt,
            "trunc" => CastOp::Trunc,
            "bitcast" => CastOp::BitCast,
            "ptrtoint" => CastOp::PtrToInt,
            "inttoptr" => CastOp::IntToPtr,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    pub const ALL: [IntPredicate; 10] = [
        IntPredicate::Eq,
        IntPredicate::Ne,
        IntPredicate::Ugt,
        IntPredicate::Uge,
        IntPredicate::Ult,
        IntPredicate::Ule,
        IntPredicate::Sgt,
        IntPredicate::Sge,
        IntPredicate::Slt,
        IntPredicate::Sle,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.mnemonic() == s)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            IntPredicate::Sgt | IntPredicate::Sge | IntPredicate::Slt | IntPredicate::Sle
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Binary {
        result: ValueId,
        op: BinaryOp,
        left: Value,
        right: Value,
        ty: Type,
    },
    Cast {
        result: ValueId,
        op: CastOp,
        value: Value,
        from: Type,
        to: Type,
    },
    ICmp {
        result: ValueId,
        predicate: IntPredicate,
        left: Value,
        right: Value,
        ty: Type,
    },
    Alloca {
        result: ValueId,
        ty: Type,
    },
    Load {
        result: ValueId,
        ty: Type,
        ptr: Value,
    },
    Store {
        value: Value,
        ty: Type,
        ptr: Value,
    },
    GetElementPtr {
        result: ValueId,
        base_ty: Type,
        ptr: Value,
        indices: Vec<(Type, Value)>,
    },
    Call {
        result: Option<ValueId>,
        ret_ty: Type,
        callee: String,
        args: Vec<(Type, Value)>,
    },
    Phi {
        result: ValueId,
        ty: Type,
        incoming: Vec<(Value, BlockId)>,
    },
    Select {
        result: ValueId,
        condition: Value,
        ty: Type,
        then_val: Value,
        else_val: Value,
    },
    /// A non-terminator the analysis has no rule for, kept as its source text.
    Opaque {
        result: Option<ValueId>,
        opcode: String,
        text: String,
    },

    Jump {
        target: BlockId,
    },
    Branch {
        condition: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Multi-way branch on an integer: `cases` are tried in order, `default` otherwise.
    Switch {
        value: Value,
        ty: Type,
        default: BlockId,
        cases: Vec<(Value, BlockId)>,
    },
    Return {
        value: Option<(Type, Value)>,
    },
    Unreachable,
}

impl Instruction {
    pub fn result(&self) -> Option<&ValueId> {
        match self {
            Instruction::Binary { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::ICmp { result, .. }
            | Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::GetElementPtr { result, .. }
            | Instruction::Phi { result, .. }
            | Instruction::Select { result, .. } => Some(result),
            Instruction::Call { result, .. } | Instruction::Opaque { result, .. } => {
                result.as_ref()
            }
            Instruction::Store { .. }
            | Instruction::Jump { .. }
            | Instruction::Branch { .. }
            | Instruction::Switch { .. }
            | Instruction::Return { .. }
            | Instruction::Unreachable => None,
        }
    }

    pub fn result_type(&self) -> Option<Type> {
        match self {
            Instruction::Binary { ty, .. }
            | Instruction::Load { ty, .. }
            | Instruction::Phi { ty, .. }
            | Instruction::Select { ty, .. } => Some(ty.clone()),
            Instruction::Cast { to, .. } => Some(to.clone()),
            Instruction::ICmp { .. } => Some(Type::i1()),
            Instruction::Alloca { ty, .. } => Some(Type::ptr_to(ty.clone())),
            Instruction::GetElementPtr { .. } => Some(Type::ptr()),
            Instruction::Call {
                result: Some(_),
                ret_ty,
                ..
            } => Some(ret_ty.clone()),
            _ => None,
        }
    }

    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::Binary { left, right, .. } | Instruction::ICmp { left, right, .. } => {
                vec![left, right]
            }
            Instruction::Cast { value, .. } => vec![value],
            Instruction::Alloca { .. }
            | Instruction::Opaque { .. }
            | Instruction::Jump { .. }
            | Instruction::Unreachable => Vec::new(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { value, ptr, .. } => vec![value, ptr],
            Instruction::GetElementPtr { ptr, indices, .. } => {
                std::iter::once(ptr).chain(indices.iter().map(|(_, v)| v)).collect()
            }
            Instruction::Call { args, .. } => args.iter().map(|(_, v)| v).collect(),
            Instruction::Phi { incoming, .. } => incoming.iter().map(|(v, _)| v).collect(),
            Instruction::Select {
                condition,
                then_val,
                else_val,
                ..
            } => vec![condition, then_val, else_val],
            Instruction::Branch { condition, .. } => vec![condition],
            Instruction::Switch { value, .. } => vec![value],
            Instruction::Return { value } => value.iter().map(|(_, v)| v).collect(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Jump { .. }
                | Instruction::Branch { .. }
                | Instruction::Switch { .. }
                | Instruction::Return { .. }
                | Instruction::Unreachable
        )
    }

    /// Blocks control may transfer to after this instruction, for terminators.
    pub fn successor_blocks(&self) -> Vec<BlockId> {
        match self {
            Instruction::Jump { target } => vec![*target],
            Instruction::Branch {
                then_block,
                else_block,
                ..
            } if then_block == else_block => vec![*then_block],
            Instruction::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Instruction::Switch { default, cases, .. } => {
                let mut targets = vec![*default];
                for (_, target) in cases {
                    if !targets.contains(target) {
                        targets.push(*target);
                    }
                }
                targets
            }
            _ => Vec::new(),
        }
    }

    pub fn is_division(&self) -> bool {
        matches!(self, Instruction::Binary { op, .. } if op.is_division())
    }

    /// Divisor operand of an `sdiv`/`udiv`.
    pub fn divisor(&self) -> Option<&Value> {
        match self {
            Instruction::Binary { op, right, .. } if op.is_division() => Some(right),
            _ => None,
        }
    }
}

impl Instruction {
    /// Like `to_string`, with block references printed through `label`.
    pub fn to_string_with(&self, label: impl Fn(BlockId) -> String) -> String {
        match self {
            Instruction::Jump { target } => format!("br label %{}", label(*target)),
            Instruction::Branch {
                condition,
                then_block,
                else_block,
            } => format!(
                "br i1 {}, label %{}, label %{}",
                condition,
                label(*then_block),
                label(*else_block)
            ),
            Instruction::Phi {
                result,
                ty,
                incoming,
            } => {
                let arms = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, %{} ]", v, label(*b)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} = phi {} {}", result, ty, arms)
            }
            Instruction::Switch {
                value,
                ty,
                default,
                cases,
            } => {
                let arms = cases
                    .iter()
                    .map(|(v, b)| format!("{} {}, label %{}", ty, v, label(*b)))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "switch {} {}, label %{} [ {} ]",
                    ty,
                    value,
                    label(*default),
                    arms
                )
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(items: &[(Type, Value)]) -> String {
            items
                .iter()
                .map(|(ty, v)| format!("{} {}", ty, v))
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            Instruction::Binary {
                result,
                op,
                left,
                right,
                ty,
            } => write!(f, "{} = {} {} {}, {}", result, op.mnemonic(), ty, left, right),
            Instruction::Cast {
                result,
                op,
                value,
                from,
                to,
            } => write!(f, "{} = {} {} {} to {}", result, op.mnemonic(), from, value, to),
            Instruction::ICmp {
                result,
                predicate,
                left,
                right,
                ty,
            } => write!(
                f,
                "{} = icmp {} {} {}, {}",
                result,
                predicate.mnemonic(),
                ty,
                left,
                right
            ),
            Instruction::Alloca { result, ty } => write!(f, "{} = alloca {}", result, ty),
            Instruction::Load { result, ty, ptr } => {
                write!(f, "{} = load {}, ptr {}", result, ty, ptr)
            }
            Instruction::Store { value, ty, ptr } => {
                write!(f, "store {} {}, ptr {}", ty, value, ptr)
            }
            Instruction::GetElementPtr {
                result,
                base_ty,
                ptr,
                indices,
            } => {
                write!(f, "{} = getelementptr {}, ptr {}", result, base_ty, ptr)?;
                if !indices.is_empty() {
                    write!(f, ", {}", list(indices))?;
                }
                Ok(())
            }
            Instruction::Call {
                result,
                ret_ty,
                callee,
                args,
            } => {
                if let Some(result) = result {
                    write!(f, "{} = ", result)?;
                }
                write!(f, "call {} @{}({})", ret_ty, callee, list(args))
            }
            Instruction::Phi {
                result,
                ty,
                incoming,
            } => {
                let arms = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, %{} ]", v, b))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} = phi {} {}", result, ty, arms)
            }
            Instruction::Select {
                result,
                condition,
                ty,
                then_val,
                else_val,
            } => write!(
                f,
                "{} = select i1 {}, {} {}, {} {}",
                result, condition, ty, then_val, ty, else_val
            ),
            Instruction::Opaque {
                result: Some(result),
                text,
                ..
            } => write!(f, "{} = {}", result, text),
            Instruction::Opaque { text, .. } => write!(f, "{}", text),
            Instruction::Jump { target } => write!(f, "br label %{}", target),
            Instruction::Branch {
                condition,
                then_block,
                else_block,
            } => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                condition, then_block, else_block
            ),
            Instruction::Switch { .. } => {
                write!(f, "{}", self.to_string_with(|block| block.to_string()))
            }
            Instruction::Return { value: None } => write!(f, "ret void"),
            Instruction::Return {
                value: Some((ty, v)),
            } => write!(f, "ret {} {}", ty, v),
            Instruction::Unreachable => write!(f, "unreachable"),
        }
    }
}
