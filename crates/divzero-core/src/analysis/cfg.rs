use crate::block::BlockId;
use crate::function::{Function, InstId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Instruction-level control-flow graph.
///
/// Inside a block each instruction flows into the next one. A block's terminator flows into the
/// first instruction of every successor block. Empty blocks are skipped over.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub entry: BlockId,
    pub edges: HashMap<BlockId, Vec<BlockId>>,
    pub reverse_edges: HashMap<BlockId, Vec<BlockId>>,
    inst_succs: IndexMap<InstId, Vec<InstId>>,
    inst_preds: HashMap<InstId, Vec<InstId>>,
}

impl ControlFlowGraph {
    pub fn from_function(function: &Function) -> Self {
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<BlockId, Vec<BlockId>> = HashMap::new();

        for (block_id, block) in &function.blocks {
            let successors = block.successors();
            for &succ in &successors {
                reverse_edges.entry(succ).or_default().push(*block_id);
            }
            edges.insert(*block_id, successors);
        }

        let mut cfg = Self {
            entry: function.entry_block,
            edges,
            reverse_edges,
            inst_succs: IndexMap::new(),
            inst_preds: HashMap::new(),
        };
        cfg.link_instructions(function);
        cfg
    }

    fn link_instructions(&mut self, function: &Function) {
        for block in function.blocks.values() {
            for index in 0..block.len() {
                let id = InstId::new(block.id, index);
                let succs = if index + 1 < block.len() {
                    vec![InstId::new(block.id, index + 1)]
                } else {
                    self.first_instructions(function, block.id)
                };
                self.inst_succs.insert(id, succs);
            }
        }

        for (&from, succs) in &self.inst_succs {
            for &to in succs {
                self.inst_preds.entry(to).or_default().push(from);
            }
        }
    }

    /// First instructions reached after leaving `block`, looking through empty blocks.
    fn first_instructions(&self, function: &Function, block: BlockId) -> Vec<InstId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<BlockId> = self.successors(block).iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            match function.get_block(current) {
                Some(b) if !b.is_empty() => result.push(InstId::new(current, 0)),
                Some(_) => queue.extend(self.successors(current).iter().copied()),
                None => {}
            }
        }

        result
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.reverse_edges
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        self.edges.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn inst_predecessors(&self, inst: InstId) -> &[InstId] {
        self.inst_preds
            .get(&inst)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn inst_successors(&self, inst: InstId) -> &[InstId] {
        self.inst_succs
            .get(&inst)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every instruction in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = InstId> + '_ {
        self.inst_succs.keys().copied()
    }

    pub fn instruction_count(&self) -> usize {
        self.inst_succs.len()
    }

    pub fn reachable_blocks(&self) -> HashSet<BlockId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(self.entry);

        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                for &succ in self.successors(current) {
                    queue.push_back(succ);
                }
            }
        }

        visited
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable_blocks().contains(&block)
    }
}
