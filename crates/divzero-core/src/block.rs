use crate::instructions::Instruction;
use crate::values::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub metadata: BlockMetadata,
}

impl BasicBlock {
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            instructions: Vec::new(),
            metadata: BlockMetadata::default(),
        }
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn add_located_instruction(&mut self, inst: Instruction, location: SourceLocation) {
        self.metadata.set_location(self.instructions.len(), location);
        self.instructions.push(inst);
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|inst| inst.is_terminator())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator()
            .map(Instruction::successor_blocks)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub instruction_locations: HashMap<usize, SourceLocation>,
}

impl BlockMetadata {
    pub fn get_location(&self, index: usize) -> Option<&SourceLocation> {
        self.instruction_locations.get(&index)
    }

    pub fn set_location(&mut self, index: usize, location: SourceLocation) {
        self.instruction_locations.insert(index, location);
    }
}
