use crate::{
    block::BlockId,
    function::Function,
    instructions::{BinaryOp, CastOp, Instruction, IntPredicate},
    types::Type,
    values::{SourceLocation, Value, ValueId},
    IrError, Result,
};

pub struct BlockBuilder<'a> {
    pub block_id: BlockId,
    function: &'a mut Function,
    next_temp: &'a mut u32,
    pending_name: Option<String>,
    current_source_location: Option<SourceLocation>,
}

impl<'a> BlockBuilder<'a> {
    pub(crate) fn new(block_id: BlockId, function: &'a mut Function, next_temp: &'a mut u32) -> Self {
        Self {
            block_id,
            function,
            next_temp,
            pending_name: None,
            current_source_location: None,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Names the result of the next value-producing instruction instead of numbering it.
    pub fn named(&mut self, name: &str) -> &mut Self {
        self.pending_name = Some(name.to_string());
        self
    }

    pub fn set_source_location(&mut self, location: SourceLocation) {
        self.current_source_location = Some(location);
    }

    pub fn clear_source_location(&mut self) {
        self.current_source_location = None;
    }

    fn new_result(&mut self) -> ValueId {
        match self.pending_name.take() {
            Some(name) => ValueId::local(name),
            None => {
                let id = ValueId::local(self.next_temp.to_string());
                *self.next_temp += 1;
                id
            }
        }
    }

    fn push_instruction(&mut self, inst: Instruction) {
        let location = self.current_source_location;
        if let Some(block) = self.function.get_block_mut(self.block_id) {
            match location {
                Some(location) => block.add_located_instruction(inst, location),
                None => block.add_instruction(inst),
            }
        }
    }

    fn seal_with_terminator(&mut self, inst: Instruction) -> Result<()> {
        let block = self
            .function
            .get_block(self.block_id)
            .ok_or_else(|| IrError::UnknownBlock(self.block_id.to_string()))?;
        if block.is_terminated() {
            return Err(IrError::BuilderError(format!(
                "block {} is already terminated",
                block.label
            )));
        }
        self.push_instruction(inst);
        Ok(())
    }

    pub fn binary(&mut self, op: BinaryOp, left: Value, right: Value, ty: Type) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Binary {
            result: result.clone(),
            op,
            left,
            right,
            ty,
        });
        Value::Register(result)
    }

    pub fn add(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::Add, left, right, ty)
    }

    pub fn sub(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::Sub, left, right, ty)
    }

    pub fn mul(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::Mul, left, right, ty)
    }

    pub fn sdiv(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::SDiv, left, right, ty)
    }

    pub fn udiv(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::UDiv, left, right, ty)
    }

    pub fn srem(&mut self, left: Value, right: Value, ty: Type) -> Value {
        self.binary(BinaryOp::SRem, left, right, ty)
    }

    pub fn icmp(&mut self, predicate: IntPredicate, left: Value, right: Value, ty: Type) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::ICmp {
            result: result.clone(),
            predicate,
            left,
            right,
            ty,
        });
        Value::Register(result)
    }

    pub fn cast(&mut self, op: CastOp, value: Value, from: Type, to: Type) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Cast {
            result: result.clone(),
            op,
            value,
            from,
            to,
        });
        Value::Register(result)
    }

    pub fn zext(&mut self, value: Value, from: Type, to: Type) -> Value {
        self.cast(CastOp::ZExt, value, from, to)
    }

    pub fn alloca(&mut self, ty: Type) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Alloca {
            result: result.clone(),
            ty,
        });
        Value::Register(result)
    }

    pub fn load(&mut self, ty: Type, ptr: Value) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Load {
            result: result.clone(),
            ty,
            ptr,
        });
        Value::Register(result)
    }

    pub fn store(&mut self, value: Value, ty: Type, ptr: Value) {
        self.push_instruction(Instruction::Store { value, ty, ptr });
    }

    pub fn gep(&mut self, base_ty: Type, ptr: Value, indices: Vec<(Type, Value)>) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::GetElementPtr {
            result: result.clone(),
            base_ty,
            ptr,
            indices,
        });
        Value::Register(result)
    }

    pub fn call(&mut self, ret_ty: Type, callee: &str, args: Vec<(Type, Value)>) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Call {
            result: Some(result.clone()),
            ret_ty,
            callee: callee.to_string(),
            args,
        });
        Value::Register(result)
    }

    pub fn call_void(&mut self, callee: &str, args: Vec<(Type, Value)>) {
        self.push_instruction(Instruction::Call {
            result: None,
            ret_ty: Type::Void,
            callee: callee.to_string(),
            args,
        });
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Phi {
            result: result.clone(),
            ty,
            incoming,
        });
        Value::Register(result)
    }

    pub fn select(&mut self, condition: Value, ty: Type, then_val: Value, else_val: Value) -> Value {
        let result = self.new_result();
        self.push_instruction(Instruction::Select {
            result: result.clone(),
            condition,
            ty,
            then_val,
            else_val,
        });
        Value::Register(result)
    }

    pub fn constant_int(&self, value: i64, bits: u16) -> Value {
        Value::int(value, bits)
    }

    pub fn jump(&mut self, target: BlockId) -> Result<()> {
        self.seal_with_terminator(Instruction::Jump { target })
    }

    pub fn branch(&mut self, condition: Value, then_block: BlockId, else_block: BlockId) -> Result<()> {
        self.seal_with_terminator(Instruction::Branch {
            condition,
            then_block,
            else_block,
        })
    }

    pub fn switch(
        &mut self,
        ty: Type,
        value: Value,
        default: BlockId,
        cases: Vec<(Value, BlockId)>,
    ) -> Result<()> {
        self.seal_with_terminator(Instruction::Switch {
            value,
            ty,
            default,
            cases,
        })
    }

    pub fn return_value(&mut self, ty: Type, value: Value) -> Result<()> {
        self.seal_with_terminator(Instruction::Return {
            value: Some((ty, value)),
        })
    }

    pub fn return_void(&mut self) -> Result<()> {
        self.seal_with_terminator(Instruction::Return { value: None })
    }

    pub fn unreachable(&mut self) -> Result<()> {
        self.seal_with_terminator(Instruction::Unreachable)
    }
}
