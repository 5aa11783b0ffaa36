use crate::metadata::{dbg_reference, LocationTable};
use crate::{ParseError, Rule};
use divzero_core::{
    BinaryOp, BlockId, CastOp, Constant, Declaration, Function, Global, Instruction,
    IntPredicate, IrError, Module, SourceLocation, Type, Value, ValueId,
};
use num_bigint::BigInt;
use pest::iterators::{Pair, Pairs};
use std::collections::HashMap;
use tracing::debug;

type Lowered = (Instruction, Option<SourceLocation>);

pub fn lower_module(name: &str, mut pairs: Pairs<'_, Rule>) -> Result<Module, ParseError> {
    let mut module = Module::new(name);
    let Some(root) = pairs.next() else {
        return Ok(module);
    };

    let items: Vec<Pair<Rule>> = root.into_inner().collect();
    let locations = LocationTable::collect(&items)?;

    for item in items {
        match item.as_rule() {
            Rule::define => module.add_function(lower_function(item, &locations)?),
            Rule::declare => module.add_declaration(lower_declaration(item)?),
            Rule::global => module.add_global(lower_global(item)?),
            // named types only show up behind pointers, which are opaque to the analysis
            Rule::type_def => {}
            _ => {}
        }
    }

    debug!(
        module = name,
        functions = module.functions.len(),
        declarations = module.declarations.len(),
        globals = module.globals.len(),
        "lowered module"
    );
    Ok(module)
}

fn line(pair: &Pair<Rule>) -> usize {
    pair.line_col().0
}

fn children<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> Vec<Pair<'i, Rule>> {
    pair.clone()
        .into_inner()
        .filter(|p| p.as_rule() == rule)
        .collect()
}

fn child<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> Result<Pair<'i, Rule>, ParseError> {
    pair.clone()
        .into_inner()
        .find(|p| p.as_rule() == rule)
        .ok_or_else(|| malformed(pair))
}

fn malformed(pair: &Pair<Rule>) -> ParseError {
    IrError::InvalidInstruction(format!("line {}: {}", line(pair), pair.as_str().trim())).into()
}

fn strip_sigil(text: &str) -> &str {
    text.get(1..).unwrap_or_default()
}

fn local_id(pair: &Pair<Rule>) -> ValueId {
    ValueId::local(strip_sigil(pair.as_str()))
}

fn global_id(pair: &Pair<Rule>) -> ValueId {
    ValueId::global(strip_sigil(pair.as_str()))
}

pub fn lower_type(pair: Pair<Rule>) -> Result<Type, ParseError> {
    let mut inner = pair.clone().into_inner();
    let base = inner.next().ok_or_else(|| malformed(&pair))?;
    let mut ty = lower_base_type(&base)?;
    for _ in inner.filter(|p| p.as_rule() == Rule::pointer_star) {
        ty = Type::ptr_to(ty);
    }
    Ok(ty)
}

fn lower_base_type(pair: &Pair<Rule>) -> Result<Type, ParseError> {
    let text = pair.as_str().trim();
    Ok(match pair.as_rule() {
        Rule::int_type => Type::Int(strip_sigil(text).parse().map_err(|_| {
            ParseError::InvalidType {
                text: text.to_string(),
                line: line(pair),
            }
        })?),
        Rule::ptr_type => Type::ptr(),
        Rule::void_type => Type::Void,
        Rule::label_type => Type::Label,
        Rule::float_type => match text {
            "half" => Type::Float(16),
            "float" => Type::Float(32),
            "double" => Type::Float(64),
            "x86_fp80" => Type::Float(80),
            "fp128" => Type::Float(128),
            other => Type::Other(other.to_string()),
        },
        Rule::metadata_type
        | Rule::array_type
        | Rule::vector_type
        | Rule::struct_type
        | Rule::named_type => Type::Other(text.split_whitespace().collect::<Vec<_>>().join(" ")),
        _ => {
            return Err(ParseError::InvalidType {
                text: text.to_string(),
                line: line(pair),
            })
        }
    })
}

/// Lowers an operand; integer literals take their width from `ty`.
pub fn lower_value(pair: &Pair<Rule>, ty: &Type) -> Result<Value, ParseError> {
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .ok_or_else(|| malformed(pair))?;
    let text = inner.as_str();
    Ok(match inner.as_rule() {
        Rule::local_name => Value::Register(local_id(&inner)),
        Rule::global_name => Value::Register(global_id(&inner)),
        Rule::integer => {
            let value: BigInt = text.parse().map_err(|_| ParseError::InvalidInteger {
                text: text.to_string(),
                line: line(&inner),
            })?;
            let bits = match ty {
                Type::Int(bits) => *bits,
                _ => 64,
            };
            Value::Constant(Constant::Int { value, bits })
        }
        Rule::float => Value::Constant(Constant::Float(text.to_string())),
        Rule::value_keyword => match text {
            "true" => Value::Constant(Constant::bool(true)),
            "false" => Value::Constant(Constant::bool(false)),
            "null" => Value::Constant(Constant::Null),
            "zeroinitializer" => match ty {
                Type::Int(bits) => Value::int(0, *bits),
                _ => Value::Constant(Constant::Null),
            },
            _ => Value::Undefined,
        },
        _ => return Err(malformed(pair)),
    })
}

/// Parameter and return types of a `declare`.
fn lower_declaration(pair: Pair<Rule>) -> Result<Declaration, ParseError> {
    let return_type = lower_type(child(&pair, Rule::ty)?)?;
    let name = strip_sigil(child(&pair, Rule::global_name)?.as_str()).to_string();
    let mut param_types = Vec::new();
    if let Ok(params) = child(&pair, Rule::decl_params) {
        for param in params.into_inner() {
            if let Ok(ty) = child(&param, Rule::ty) {
                param_types.push(lower_type(ty)?);
            }
        }
    }
    Ok(Declaration {
        name,
        return_type,
        param_types,
    })
}

fn lower_global(pair: Pair<Rule>) -> Result<Global, ParseError> {
    let name = global_id(&child(&pair, Rule::global_name)?);
    let value_type = lower_type(child(&pair, Rule::ty)?)?;
    let initializer = match child(&pair, Rule::global_init)
        .ok()
        .and_then(|init| init.into_inner().next())
    {
        Some(init) if init.as_rule() == Rule::value => match lower_value(&init, &value_type)? {
            Value::Constant(constant) => Some(constant),
            _ => None,
        },
        _ => None,
    };
    Ok(Global {
        name,
        value_type,
        initializer,
    })
}

fn lower_function(pair: Pair<Rule>, locations: &LocationTable) -> Result<Function, ParseError> {
    let mut return_type = None;
    let mut name = None;
    let mut params = Vec::new();
    let mut body = None;
    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::ty if return_type.is_none() => return_type = Some(lower_type(part)?),
            Rule::global_name if name.is_none() => {
                name = Some(strip_sigil(part.as_str()).to_string())
            }
            Rule::params => params = part.into_inner().collect(),
            Rule::body => body = Some(part),
            _ => {}
        }
    }
    let (Some(return_type), Some(name), Some(body)) = (return_type, name, body) else {
        return Err(malformed(&pair));
    };

    let mut function = Function::new(name.clone(), return_type);

    // Unnamed values, parameters first, share one counter with the implicit entry label.
    let mut next_number = 0u32;
    for param in params {
        let Ok(ty) = child(&param, Rule::ty) else {
            continue;
        };
        let ty = lower_type(ty)?;
        let id = match child(&param, Rule::local_name) {
            Ok(local) => {
                let id = local_id(&local);
                if let Ok(number) = strip_sigil(id.as_str()).parse::<u32>() {
                    next_number = number + 1;
                }
                id
            }
            Err(_) => {
                let id = ValueId::local(next_number.to_string());
                next_number += 1;
                id
            }
        };
        function.add_param(id, ty);
    }

    let blocks: Vec<Pair<Rule>> = body.into_inner().collect();
    let mut labels = HashMap::new();
    for (index, block) in blocks.iter().enumerate() {
        let label = match child(block, Rule::label_def) {
            Ok(def) => def.as_str().trim_end_matches(':').to_string(),
            Err(_) if index == 0 => next_number.to_string(),
            Err(_) => format!("bb{}", index),
        };
        let id = function.create_block(label.clone());
        if labels.insert(label.clone(), id).is_some() {
            return Err(IrError::DuplicateDefinition(format!("label %{}", label)).into());
        }
    }

    let context = FunctionContext {
        name: &name,
        labels,
        locations,
    };
    for (block, id) in blocks.iter().zip(function.blocks.keys().copied().collect::<Vec<_>>()) {
        for inst in block.clone().into_inner() {
            if inst.as_rule() == Rule::label_def {
                continue;
            }
            let Some((instruction, location)) = context.lower_instruction(inst)? else {
                continue;
            };
            let block = function
                .get_block_mut(id)
                .ok_or_else(|| IrError::UnknownBlock(id.to_string()))?;
            match location {
                Some(location) => block.add_located_instruction(instruction, location),
                None => block.add_instruction(instruction),
            }
        }
    }

    function.validate()?;
    Ok(function)
}

struct FunctionContext<'a> {
    name: &'a str,
    labels: HashMap<String, BlockId>,
    locations: &'a LocationTable,
}

impl FunctionContext<'_> {
    fn block(&self, pair: &Pair<Rule>) -> Result<BlockId, ParseError> {
        let label = strip_sigil(pair.as_str());
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ParseError::UndefinedLabel {
                function: self.name.to_string(),
                label: label.to_string(),
                line: line(pair),
            })
    }

    fn location(&self, pair: &Pair<Rule>) -> Result<Option<SourceLocation>, ParseError> {
        match children(pair, Rule::dbg_attach).first() {
            Some(attach) => {
                let reference = child(attach, Rule::metadata_ref)?;
                self.locations
                    .resolve(reference.as_str(), line(&reference))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// `None` for lines that carry no instruction (debug intrinsics and records).
    fn lower_instruction(&self, pair: Pair<Rule>) -> Result<Option<Lowered>, ParseError> {
        let mut inner = pair.clone().into_inner();
        let (result, body) = match pair.as_rule() {
            Rule::assignment => {
                let result = inner.next().ok_or_else(|| malformed(&pair))?;
                (Some(local_id(&result)), inner.next())
            }
            _ => (None, inner.next()),
        };
        let body = body.ok_or_else(|| malformed(&pair))?;

        let instruction = match body.as_rule() {
            Rule::debug_record => return Ok(None),
            Rule::opaque => return self.lower_opaque(result, &body).map(Some),
            Rule::call => match self.lower_call(result, &body)? {
                Some(call) => call,
                None => return Ok(None),
            },
            Rule::store => self.lower_store(&body)?,
            Rule::br_cond => {
                let values = children(&body, Rule::value);
                let targets = children(&body, Rule::local_name);
                let (Some(condition), [then_block, else_block]) = (values.first(), &targets[..])
                else {
                    return Err(malformed(&body));
                };
                Instruction::Branch {
                    condition: lower_value(condition, &Type::i1())?,
                    then_block: self.block(then_block)?,
                    else_block: self.block(else_block)?,
                }
            }
            Rule::br => Instruction::Jump {
                target: self.block(&child(&body, Rule::local_name)?)?,
            },
            Rule::switch => {
                let ty = lower_type(child(&body, Rule::ty)?)?;
                let value = lower_value(&child(&body, Rule::value)?, &ty)?;
                let default = self.block(&child(&body, Rule::local_name)?)?;
                let cases = children(&body, Rule::switch_case)
                    .iter()
                    .map(|case| {
                        let case_ty = lower_type(child(case, Rule::ty)?)?;
                        Ok((
                            lower_value(&child(case, Rule::value)?, &case_ty)?,
                            self.block(&child(case, Rule::local_name)?)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, ParseError>>()?;
                Instruction::Switch {
                    value,
                    ty,
                    default,
                    cases,
                }
            }
            Rule::ret => match child(&body, Rule::ty) {
                Ok(ty) => {
                    let ty = lower_type(ty)?;
                    let value = lower_value(&child(&body, Rule::value)?, &ty)?;
                    Instruction::Return {
                        value: Some((ty, value)),
                    }
                }
                Err(_) => Instruction::Return { value: None },
            },
            Rule::unreachable => Instruction::Unreachable,
            _ => {
                let result = result.ok_or_else(|| malformed(&pair))?;
                self.lower_value_instruction(result, &body)?
            }
        };

        Ok(Some((instruction, self.location(&body)?)))
    }

    fn lower_value_instruction(
        &self,
        result: ValueId,
        body: &Pair<Rule>,
    ) -> Result<Instruction, ParseError> {
        let types = children(body, Rule::ty)
            .into_iter()
            .map(lower_type)
            .collect::<Result<Vec<_>, _>>()?;
        let values = children(body, Rule::value);
        let ty = types.first().cloned().ok_or_else(|| malformed(body))?;
        let operand = |index: usize, ty: &Type| -> Result<Value, ParseError> {
            values
                .get(index)
                .ok_or_else(|| malformed(body))
                .and_then(|value| lower_value(value, ty))
        };
        let type_at = |index: usize| types.get(index).cloned().ok_or_else(|| malformed(body));

        Ok(match body.as_rule() {
            Rule::binary => {
                let op = BinaryOp::from_mnemonic(child(body, Rule::binop)?.as_str())
                    .ok_or_else(|| malformed(body))?;
                Instruction::Binary {
                    result,
                    op,
                    left: operand(0, &ty)?,
                    right: operand(1, &ty)?,
                    ty,
                }
            }
            Rule::icmp => {
                let predicate = IntPredicate::from_mnemonic(child(body, Rule::predicate)?.as_str())
                    .ok_or_else(|| malformed(body))?;
                Instruction::ICmp {
                    result,
                    predicate,
                    left: operand(0, &ty)?,
                    right: operand(1, &ty)?,
                    ty,
                }
            }
            Rule::cast => {
                let op = CastOp::from_mnemonic(child(body, Rule::cast_op)?.as_str())
                    .ok_or_else(|| malformed(body))?;
                Instruction::Cast {
                    result,
                    op,
                    value: operand(0, &ty)?,
                    from: ty,
                    to: type_at(1)?,
                }
            }
            Rule::alloca => Instruction::Alloca { result, ty },
            Rule::load => Instruction::Load {
                result,
                ty,
                ptr: operand(0, &type_at(1)?)?,
            },
            Rule::gep => {
                let indices = children(body, Rule::gep_index)
                    .iter()
                    .map(|index| -> Result<(Type, Value), ParseError> {
                        let ty = lower_type(child(index, Rule::ty)?)?;
                        let value = lower_value(&child(index, Rule::value)?, &ty)?;
                        Ok((ty, value))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Instruction::GetElementPtr {
                    result,
                    base_ty: ty,
                    ptr: operand(0, &type_at(1)?)?,
                    indices,
                }
            }
            Rule::phi => {
                let incoming = children(body, Rule::phi_arm)
                    .iter()
                    .map(|arm| -> Result<(Value, BlockId), ParseError> {
                        let value = lower_value(&child(arm, Rule::value)?, &ty)?;
                        Ok((value, self.block(&child(arm, Rule::local_name)?)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Instruction::Phi {
                    result,
                    ty,
                    incoming,
                }
            }
            Rule::select => {
                let arm_ty = type_at(1)?;
                Instruction::Select {
                    result,
                    condition: operand(0, &ty)?,
                    then_val: operand(1, &arm_ty)?,
                    else_val: operand(2, &type_at(2)?)?,
                    ty: arm_ty,
                }
            }
            _ => return Err(malformed(body)),
        })
    }

    fn lower_store(&self, body: &Pair<Rule>) -> Result<Instruction, ParseError> {
        let types = children(body, Rule::ty);
        let values = children(body, Rule::value);
        let ([value_ty, ptr_ty], [value, ptr]) = (&types[..], &values[..]) else {
            return Err(malformed(body));
        };
        let ty = lower_type(value_ty.clone())?;
        Ok(Instruction::Store {
            value: lower_value(value, &ty)?,
            ptr: lower_value(ptr, &lower_type(ptr_ty.clone())?)?,
            ty,
        })
    }

    /// `None` for `llvm.dbg.*` intrinsics, which only describe variables.
    fn lower_call(
        &self,
        result: Option<ValueId>,
        body: &Pair<Rule>,
    ) -> Result<Option<Instruction>, ParseError> {
        let ret_ty = lower_type(child(body, Rule::ty)?)?;
        let callee = match child(body, Rule::global_name) {
            Ok(global) => strip_sigil(global.as_str()).to_string(),
            Err(_) => child(body, Rule::local_name)?.as_str().to_string(),
        };
        if callee.starts_with("llvm.dbg.") {
            return Ok(None);
        }

        let mut args = Vec::new();
        if let Ok(list) = child(body, Rule::args) {
            for arg in list.into_inner() {
                if child(&arg, Rule::metadata_arg).is_ok() {
                    args.push((Type::Other("metadata".to_string()), Value::Undefined));
                    continue;
                }
                let ty = lower_type(child(&arg, Rule::ty)?)?;
                let value = lower_value(&child(&arg, Rule::value)?, &ty)?;
                args.push((ty, value));
            }
        }

        Ok(Some(Instruction::Call {
            result,
            ret_ty,
            callee,
            args,
        }))
    }

    fn lower_opaque(
        &self,
        result: Option<ValueId>,
        body: &Pair<Rule>,
    ) -> Result<Lowered, ParseError> {
        let opcode = child(body, Rule::opcode)?.as_str().to_string();
        let text = body.as_str().trim().to_string();
        let location = match dbg_reference(&text) {
            Some(reference) => Some(self.locations.resolve(reference, line(body))?),
            None => None,
        };
        debug!(function = self.name, opcode = %opcode, "keeping unmodelled instruction");
        Ok((
            Instruction::Opaque {
                result,
                opcode,
                text,
            },
            location,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_module;
    use pretty_assertions::assert_eq;

    fn function(input: &str) -> Function {
        let module = parse_module(input).unwrap();
        module.functions.values().next().cloned().unwrap()
    }

    #[test]
    fn test_numbered_entry_and_params() {
        let f = function(
            r#"
define dso_local i32 @div(i32 noundef %0, i32 noundef %1) #0 {
  %3 = sdiv i32 %0, %1
  br label %4

4:                                                ; preds = %2
  ret i32 %3
}
"#,
        );
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].name, ValueId::local("1"));
        let labels: Vec<_> = f.blocks.values().map(|b| b.label.clone()).collect();
        assert_eq!(labels, vec!["2", "4"]);
        assert_eq!(
            f.instruction(divzero_core::InstId::new(f.entry_block, 1)),
            Some(&Instruction::Jump { target: BlockId(1) })
        );
    }

    #[test]
    fn test_literal_widths_follow_types() {
        let f = function(
            r#"
define i8 @f(i1 %c) {
entry:
  %a = add i8 -1, 1
  %s = select i1 true, i8 %a, i8 0
  ret i8 %s
}
"#,
        );
        let entry = &f.blocks[&f.entry_block];
        match &entry.instructions[0] {
            Instruction::Binary { left, .. } => assert_eq!(left, &Value::int(-1, 8)),
            other => panic!("unexpected {}", other),
        }
        match &entry.instructions[1] {
            Instruction::Select {
                condition,
                else_val,
                ty,
                ..
            } => {
                assert_eq!(condition, &Value::Constant(Constant::bool(true)));
                assert_eq!(else_val, &Value::int(0, 8));
                assert_eq!(ty, &Type::Int(8));
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_typed_pointers() {
        let f = function(
            r#"
define i32 @f(i32* %p) {
entry:
  %v = load i32, i32* %p, align 4
  store i32 %v, i32* %p, align 4
  ret i32 %v
}
"#,
        );
        assert_eq!(f.params[0].param_type, Type::ptr_to(Type::i32()));
        let entry = &f.blocks[&f.entry_block];
        assert_eq!(entry.instructions[0].to_string(), "%v = load i32, ptr %p");
        assert_eq!(entry.instructions[1].to_string(), "store i32 %v, ptr %p");
    }

    #[test]
    fn test_multiline_switch() {
        let f = function(
            r#"
%struct.pair = type { i32, i32 }
%struct.handle = type opaque

define dso_local i32 @f(i32 noundef %0) #0 {
  %2 = alloca i32, align 4
  store i32 %0, ptr %2, align 4
  %3 = load i32, ptr %2, align 4
  switch i32 %3, label %5 [
    i32 0, label %4
    i32 1, label %4
  ]

4:                                                ; preds = %1, %1
  br label %5

5:                                                ; preds = %4, %1
  ret i32 %3
}
"#,
        );
        let entry = &f.blocks[&f.entry_block];
        assert_eq!(
            entry.terminator(),
            Some(&Instruction::Switch {
                value: Value::Register(ValueId::local("3")),
                ty: Type::i32(),
                default: BlockId(2),
                cases: vec![(Value::int(0, 32), BlockId(1)), (Value::int(1, 32), BlockId(1))],
            })
        );
        assert_eq!(entry.successors(), vec![BlockId(2), BlockId(1)]);
    }

    #[test]
    fn test_undefined_label() {
        let err = parse_module(
            r#"
define void @f() {
entry:
  br label %missing
}
"#,
        )
        .unwrap_err();
        match err {
            ParseError::UndefinedLabel {
                function,
                label,
                line,
            } => {
                assert_eq!(function, "f");
                assert_eq!(label, "missing");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_unmodelled_instructions_become_opaque() {
        let f = function(
            r#"
define double @f(double %a, double %b) {
entry:
  %s = fadd double %a, %b
  fence seq_cst
  ret double %s
}
"#,
        );
        let entry = &f.blocks[&f.entry_block];
        assert_eq!(
            entry.instructions[0],
            Instruction::Opaque {
                result: Some(ValueId::local("s")),
                opcode: "fadd".to_string(),
                text: "fadd double %a, %b".to_string(),
            }
        );
        assert_eq!(entry.instructions[1].result(), None);
        assert_eq!(f.params[0].param_type, Type::Float(64));
    }

    #[test]
    fn test_declarations_and_globals() {
        let module = parse_module(
            r#"
@counter = dso_local global i32 7, align 4
@.str = private unnamed_addr constant [4 x i8] c"%d\0A\00", align 1
@ptr = global ptr null, align 8

declare i32 @getchar() #1
declare i32 @printf(ptr noundef, ...) #1
"#,
        )
        .unwrap();

        assert_eq!(module.globals.len(), 3);
        assert_eq!(module.globals[0].name, ValueId::global("counter"));
        assert_eq!(module.globals[0].initializer, Some(Constant::int(7, 32)));
        assert_eq!(module.globals[1].value_type, Type::Other("[4 x i8]".to_string()));
        assert_eq!(module.globals[1].initializer, None);
        assert_eq!(module.globals[2].initializer, Some(Constant::Null));

        assert_eq!(module.declarations["getchar"].return_type, Type::i32());
        assert_eq!(module.declarations["printf"].param_types, vec![Type::ptr()]);
    }
}
