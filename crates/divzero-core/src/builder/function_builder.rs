use super::BlockBuilder;
use crate::{
    block::BlockId,
    function::Function,
    types::Type,
    values::{Value, ValueId},
    IrError, Result,
};

pub struct FunctionBuilder {
    function: Function,
    next_temp: u32,
}

impl FunctionBuilder {
    pub fn new(name: &str, return_type: Type) -> Self {
        Self {
            function: Function::new(name, return_type),
            next_temp: 0,
        }
    }

    /// Declares a parameter and returns it as an operand.
    pub fn param(&mut self, name: &str, ty: Type) -> Value {
        let id = ValueId::local(name);
        self.function.add_param(id.clone(), ty);
        Value::Register(id)
    }

    pub fn get_param(&self, index: usize) -> Value {
        self.function
            .params
            .get(index)
            .map(|p| Value::Register(p.name.clone()))
            .unwrap_or(Value::Undefined)
    }

    pub fn create_block(&mut self, label: &str) -> BlockId {
        self.function.create_block(label)
    }

    /// Builder for the entry block, creating it as `entry` if no block exists yet.
    pub fn entry_block(&mut self) -> BlockBuilder<'_> {
        if self.function.blocks.is_empty() {
            self.function.create_block("entry");
        }
        let entry = self.function.entry_block;
        self.block(entry)
    }

    pub fn block(&mut self, id: BlockId) -> BlockBuilder<'_> {
        BlockBuilder::new(id, &mut self.function, &mut self.next_temp)
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn build(self) -> Result<Function> {
        if self.function.blocks.is_empty() {
            return Err(IrError::BuilderError(format!(
                "function {} has no blocks",
                self.function.name
            )));
        }
        self.function.validate()?;
        Ok(self.function)
    }
}
