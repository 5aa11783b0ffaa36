use crate::block::{BasicBlock, BlockId};
use crate::instructions::Instruction;
use crate::types::Type;
use crate::values::{SourceLocation, ValueId};
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A program point: the `index`-th instruction of `block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId {
    pub block: BlockId,
    pub index: usize,
}

impl InstId {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.block, self.index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: ValueId,
    pub param_type: Type,
}

impl Parameter {
    pub fn new(name: ValueId, param_type: Type) -> Self {
        Self { name, param_type }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Type,
    pub entry_block: BlockId,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    next_block_id: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            entry_block: BlockId(0),
            blocks: IndexMap::new(),
            next_block_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_param(&mut self, name: ValueId, ty: Type) {
        self.params.push(Parameter::new(name, ty));
    }

    /// Appends a new empty block; the first block created becomes the entry.
    pub fn create_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        if self.blocks.is_empty() {
            self.entry_block = id;
        }
        self.blocks.insert(id, BasicBlock::new(id, label));
        id
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn block_by_label(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .values()
            .find(|block| block.label == label)
            .map(|block| block.id)
    }

    pub fn block_label(&self, id: BlockId) -> String {
        self.blocks
            .get(&id)
            .map(|block| block.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn instruction(&self, id: InstId) -> Option<&Instruction> {
        self.blocks.get(&id.block)?.instructions.get(id.index)
    }

    pub fn location(&self, id: InstId) -> Option<SourceLocation> {
        self.blocks
            .get(&id.block)?
            .metadata
            .get_location(id.index)
            .copied()
    }

    /// Every instruction in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = (InstId, &Instruction)> + '_ {
        self.blocks.values().flat_map(|block| {
            block
                .instructions
                .iter()
                .enumerate()
                .map(move |(index, inst)| (InstId::new(block.id, index), inst))
        })
    }

    pub fn entry_instruction(&self) -> Option<InstId> {
        let entry = self.blocks.get(&self.entry_block)?;
        (!entry.is_empty()).then(|| InstId::new(entry.id, 0))
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.values().map(BasicBlock::len).sum()
    }

    pub fn divisions(&self) -> impl Iterator<Item = (InstId, &Instruction)> + '_ {
        self.instructions().filter(|(_, inst)| inst.is_division())
    }

    /// Checks the structural invariants the analysis relies on.
    pub fn validate(&self) -> Result<()> {
        let mut defined: HashSet<&ValueId> = self.params.iter().map(|p| &p.name).collect();
        if defined.len() != self.params.len() {
            return Err(IrError::DuplicateDefinition(format!(
                "parameter of {}",
                self.name
            )));
        }

        for block in self.blocks.values() {
            if !block.is_terminated() {
                return Err(IrError::MissingTerminator(block.label.clone()));
            }

            for (index, inst) in block.instructions.iter().enumerate() {
                if inst.is_terminator() && index + 1 != block.len() {
                    return Err(IrError::InvalidInstruction(format!(
                        "terminator in the middle of block {}",
                        block.label
                    )));
                }

                if let Some(result) = inst.result() {
                    if !defined.insert(result) {
                        return Err(IrError::DuplicateDefinition(result.to_string()));
                    }
                }

                for target in inst.successor_blocks() {
                    if !self.blocks.contains_key(&target) {
                        return Err(IrError::UnknownBlock(target.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}
