use super::alias::AliasOracle;
use super::cfg::ControlFlowGraph;
use super::checker::{Checker, Diagnostic};
use super::config::AnalysisConfig;
use super::domain::AbstractValue;
use super::memory::Memory;
use super::transfer::TransferFunction;
use super::AnalysisError;
use crate::function::{Function, InstId};
use crate::instructions::Instruction;
use crate::values::ValueId;
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use tracing::{debug, info, trace};

/// Fixpoint driver for one function.
pub struct WorklistEngine<'a> {
    function: &'a Function,
    config: &'a AnalysisConfig,
    oracle: &'a dyn AliasOracle,
    cfg: ControlFlowGraph,
    pointers: IndexSet<ValueId>,
    entry: Option<InstId>,
    entry_seed: Memory,
    in_map: IndexMap<InstId, Memory>,
    out_map: IndexMap<InstId, Memory>,
    iterations: usize,
}

impl<'a> WorklistEngine<'a> {
    pub fn new(
        function: &'a Function,
        config: &'a AnalysisConfig,
        oracle: &'a dyn AliasOracle,
    ) -> Self {
        let cfg = ControlFlowGraph::from_function(function);
        let mut pointers = IndexSet::new();
        let mut entry_seed = Memory::new();

        for param in &function.params {
            if param.param_type.is_pointer() {
                entry_seed.set(param.name.clone(), AbstractValue::NonZero);
                pointers.insert(param.name.clone());
            } else if param.param_type.is_integer() {
                entry_seed.set(param.name.clone(), AbstractValue::MaybeZero);
            }
        }
        for (_, inst) in function.instructions() {
            if let (Some(result), Some(ty)) = (inst.result(), inst.result_type()) {
                if ty.is_pointer() {
                    pointers.insert(result.clone());
                }
            }
            if let Instruction::Load { ptr, .. } | Instruction::Store { ptr, .. } = inst {
                if let Some(global) = ptr.as_register().filter(|id| id.is_global()) {
                    pointers.insert(global.clone());
                }
            }
        }

        let in_map = cfg.instructions().map(|id| (id, Memory::new())).collect();
        let out_map = cfg.instructions().map(|id| (id, Memory::new())).collect();

        Self {
            function,
            config,
            oracle,
            entry: function.entry_instruction(),
            cfg,
            pointers,
            entry_seed,
            in_map,
            out_map,
            iterations: 0,
        }
    }

    pub fn pointers(&self) -> &IndexSet<ValueId> {
        &self.pointers
    }

    /// Iterates until the worklist drains. Returns how many Out memories changed.
    pub fn run(&mut self) -> Result<usize, AnalysisError> {
        let mut worklist: IndexSet<InstId> = self.cfg.instructions().collect();
        let mut changes = 0;

        while let Some(inst) = worklist.shift_remove_index(0) {
            self.iterations += 1;
            if let Some(limit) = self.config.max_iterations {
                if self.iterations > limit {
                    return Err(AnalysisError::IterationLimit {
                        function: self.function.name.clone(),
                        limit,
                    });
                }
            }

            let incoming = self.flow_in(inst);
            let candidate = match self.function.instruction(inst) {
                Some(instruction) => {
                    let transfer = TransferFunction::new(self.config, self.oracle, &self.pointers);
                    trace!(inst = %inst, "{}", instruction);
                    transfer.apply(instruction, &incoming)
                }
                None => incoming.clone(),
            };
            self.in_map.insert(inst, incoming);

            if self.flow_out(inst, candidate, &mut worklist) {
                changes += 1;
            }
        }

        debug!(
            function = %self.function.name,
            iterations = self.iterations,
            changes,
            "worklist drained"
        );
        Ok(changes)
    }

    /// Join of every predecessor's Out memory, plus the parameter seed at the entry.
    pub fn flow_in(&self, inst: InstId) -> Memory {
        let mut memory = if Some(inst) == self.entry {
            self.entry_seed.clone()
        } else {
            Memory::new()
        };
        for pred in self.cfg.inst_predecessors(inst) {
            if let Some(out) = self.out_map.get(pred) {
                memory = memory.join(out);
            }
        }
        memory
    }

    /// Stores `candidate` and reschedules successors if it differs from the previous Out.
    fn flow_out(
        &mut self,
        inst: InstId,
        candidate: Memory,
        worklist: &mut IndexSet<InstId>,
    ) -> bool {
        let changed = self
            .out_map
            .get(&inst)
            .map_or(true, |previous| !previous.equal(&candidate));
        self.out_map.insert(inst, candidate);

        if changed {
            worklist.extend(self.cfg.inst_successors(inst).iter().copied());
        }
        changed
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn in_memory(&self, inst: InstId) -> Option<&Memory> {
        self.in_map.get(&inst)
    }

    pub fn out_memory(&self, inst: InstId) -> Option<&Memory> {
        self.out_map.get(&inst)
    }

    /// Runs the checker over every division and packages the fixpoint.
    pub fn into_result(self) -> AnalysisResult {
        let checker = Checker::new(self.function);
        let diagnostics: Vec<Diagnostic> = self
            .function
            .divisions()
            .filter_map(|(inst, _)| {
                let memory = self.in_map.get(&inst)?;
                checker.diagnose(inst, memory)
            })
            .collect();

        info!(
            function = %self.function.name,
            divisions = self.function.divisions().count(),
            flagged = diagnostics.len(),
            "analysis finished"
        );

        AnalysisResult {
            function: self.function.name.clone(),
            in_map: self.in_map,
            out_map: self.out_map,
            diagnostics,
            iterations: self.iterations,
        }
    }
}

/// Fixpoint In/Out memories of one function together with its diagnostics.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub function: String,
    in_map: IndexMap<InstId, Memory>,
    out_map: IndexMap<InstId, Memory>,
    diagnostics: Vec<Diagnostic>,
    iterations: usize,
}

impl AnalysisResult {
    /// True when `inst` is a division that may divide by zero.
    pub fn check(&self, inst: InstId) -> bool {
        self.diagnostics.iter().any(|d| d.inst == inst)
    }

    pub fn in_memory(&self, inst: InstId) -> Option<&Memory> {
        self.in_map.get(&inst)
    }

    pub fn out_memory(&self, inst: InstId) -> Option<&Memory> {
        self.out_map.get(&inst)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Program points in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = InstId> + '_ {
        self.in_map.keys().copied()
    }
}

#[derive(Serialize)]
struct StateEntry<'a> {
    inst: InstId,
    #[serde(rename = "in")]
    in_memory: &'a Memory,
    out: &'a Memory,
}

#[derive(Serialize)]
struct ResultRepr<'a> {
    function: &'a str,
    iterations: usize,
    states: Vec<StateEntry<'a>>,
    diagnostics: &'a [Diagnostic],
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let states = self
            .in_map
            .iter()
            .filter_map(|(inst, in_memory)| {
                Some(StateEntry {
                    inst: *inst,
                    in_memory,
                    out: self.out_map.get(inst)?,
                })
            })
            .collect();

        ResultRepr {
            function: &self.function,
            iterations: self.iterations,
            states,
            diagnostics: &self.diagnostics,
        }
        .serialize(serializer)
    }
}
