use crate::{
    function::Function,
    instructions::{CastOp, Instruction},
    values::{Value, ValueId},
};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// May-alias queries between pointer-typed variables of one function.
///
/// Answers may over-approximate. Reporting an alias that cannot happen only costs precision;
/// missing one makes the pointer-aware transfer unsound.
pub trait AliasOracle {
    fn may_alias(&self, a: &ValueId, b: &ValueId) -> bool;
}

/// Every pointer aliases only itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliasOracle;

impl AliasOracle for NoAliasOracle {
    fn may_alias(&self, a: &ValueId, b: &ValueId) -> bool {
        a == b
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasResult {
    MustAlias,
    MayAlias,
    NoAlias,
}

/// An abstract memory location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryLocation {
    /// The object created by an `alloca`, named after its result.
    Stack(ValueId),
    Global(ValueId),
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLocation::Stack(id) => write!(f, "stack({})", id),
            MemoryLocation::Global(id) => write!(f, "global({})", id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsToSet {
    pub locations: BTreeSet<MemoryLocation>,
    /// The pointer may target memory this function cannot name.
    pub unknown: bool,
}

impl PointsToSet {
    fn single(location: MemoryLocation) -> Self {
        Self {
            locations: BTreeSet::from([location]),
            unknown: false,
        }
    }

    fn unknown() -> Self {
        Self {
            locations: BTreeSet::new(),
            unknown: true,
        }
    }

    /// Returns true if `self` grew.
    fn absorb(&mut self, other: &PointsToSet) -> bool {
        let before = (self.locations.len(), self.unknown);
        self.locations.extend(other.locations.iter().cloned());
        self.unknown |= other.unknown;
        before != (self.locations.len(), self.unknown)
    }

    pub fn intersects(&self, other: &PointsToSet) -> bool {
        self.unknown || other.unknown || !self.locations.is_disjoint(&other.locations)
    }
}

/// Flow-insensitive, inclusion-based points-to sets for one function.
#[derive(Debug, Clone, Default)]
pub struct PointsToAnalysis {
    points_to: HashMap<ValueId, PointsToSet>,
    contents: HashMap<MemoryLocation, PointsToSet>,
}

impl PointsToAnalysis {
    pub fn build(function: &Function) -> Self {
        let mut analysis = Self::default();

        // The caller may pass any pointer, including two equal ones.
        for param in &function.params {
            if param.param_type.is_pointer() {
                analysis
                    .points_to
                    .insert(param.name.clone(), PointsToSet::unknown());
            }
        }
        // Every nameable location exists up front so stores through unknown pointers reach it.
        // Globals may hold pointers written outside this function.
        for (_, inst) in function.instructions() {
            if let (Some(result), Some(ty)) = (inst.result(), inst.result_type()) {
                if ty.is_pointer() {
                    analysis.points_to.entry(result.clone()).or_default();
                }
            }
            if let Instruction::Alloca { result, .. } = inst {
                analysis
                    .contents
                    .entry(MemoryLocation::Stack(result.clone()))
                    .or_default();
            }
            for operand in inst.operands() {
                if let Value::Register(id) = operand {
                    if id.is_global() {
                        analysis
                            .contents
                            .entry(MemoryLocation::Global(id.clone()))
                            .or_insert_with(PointsToSet::unknown);
                    }
                }
            }
        }

        let mut changed = true;
        let mut rounds = 0;
        while changed {
            changed = false;
            rounds += 1;
            for (_, inst) in function.instructions() {
                changed |= analysis.apply(inst);
            }
        }
        tracing::debug!(
            function = %function.name,
            pointers = analysis.points_to.len(),
            rounds,
            "points-to sets converged"
        );

        analysis
    }

    fn apply(&mut self, inst: &Instruction) -> bool {
        match inst {
            Instruction::Alloca { result, .. } => {
                let site = PointsToSet::single(MemoryLocation::Stack(result.clone()));
                self.include(result, &site)
            }
            Instruction::Store { value, ty, ptr } if ty.is_pointer() => {
                let stored = self.value_set(value);
                let target = self.value_set(ptr);
                let mut locations: Vec<MemoryLocation> = target.locations.into_iter().collect();
                if target.unknown {
                    locations.extend(self.contents.keys().cloned());
                }
                let mut changed = false;
                for location in locations {
                    changed |= self.contents.entry(location).or_default().absorb(&stored);
                }
                changed
            }
            Instruction::Load { result, ty, ptr } if ty.is_pointer() => {
                let source = self.value_set(ptr);
                let mut loaded = PointsToSet {
                    locations: BTreeSet::new(),
                    unknown: source.unknown,
                };
                for stored in source.locations.iter().filter_map(|l| self.contents.get(l)) {
                    loaded.absorb(stored);
                }
                self.include(result, &loaded)
            }
            Instruction::Cast {
                result, op, value, ..
            } if inst.result_type().map_or(false, |t| t.is_pointer()) => {
                let set = match op {
                    CastOp::IntToPtr => PointsToSet::unknown(),
                    _ => self.value_set(value),
                };
                self.include(result, &set)
            }
            Instruction::GetElementPtr { result, ptr, .. } => {
                let set = self.value_set(ptr);
                self.include(result, &set)
            }
            Instruction::Phi {
                result,
                ty,
                incoming,
            } if ty.is_pointer() => {
                let mut set = PointsToSet::default();
                for (value, _) in incoming {
                    set.absorb(&self.value_set(value));
                }
                self.include(result, &set)
            }
            Instruction::Select {
                result,
                ty,
                then_val,
                else_val,
                ..
            } if ty.is_pointer() => {
                let mut set = self.value_set(then_val);
                set.absorb(&self.value_set(else_val));
                self.include(result, &set)
            }
            Instruction::Call {
                result: Some(result),
                ret_ty,
                ..
            } if ret_ty.is_pointer() => self.include(result, &PointsToSet::unknown()),
            _ => false,
        }
    }

    fn include(&mut self, var: &ValueId, set: &PointsToSet) -> bool {
        self.points_to.entry(var.clone()).or_default().absorb(set)
    }

    fn value_set(&self, value: &Value) -> PointsToSet {
        match value {
            Value::Register(id) if id.is_global() => {
                PointsToSet::single(MemoryLocation::Global(id.clone()))
            }
            Value::Register(id) => self
                .points_to
                .get(id)
                .cloned()
                .unwrap_or_else(PointsToSet::unknown),
            Value::Constant(_) | Value::Undefined => PointsToSet::default(),
        }
    }

    pub fn points_to(&self, var: &ValueId) -> Option<&PointsToSet> {
        self.points_to.get(var)
    }

    /// Pointer variables this analysis computed a set for.
    pub fn pointers(&self) -> impl Iterator<Item = &ValueId> + '_ {
        self.points_to.keys()
    }

    pub fn query(&self, a: &ValueId, b: &ValueId) -> AliasResult {
        if a == b {
            return AliasResult::MustAlias;
        }

        let (Some(pa), Some(pb)) = (self.set_of(a), self.set_of(b)) else {
            return AliasResult::MayAlias;
        };
        if !pa.intersects(&pb) {
            return AliasResult::NoAlias;
        }
        if !pa.unknown && !pb.unknown && pa.locations.len() == 1 && pa.locations == pb.locations {
            AliasResult::MustAlias
        } else {
            AliasResult::MayAlias
        }
    }

    fn set_of(&self, var: &ValueId) -> Option<PointsToSet> {
        if var.is_global() {
            return Some(PointsToSet::single(MemoryLocation::Global(var.clone())));
        }
        self.points_to.get(var).cloned()
    }
}

impl AliasOracle for PointsToAnalysis {
    fn may_alias(&self, a: &ValueId, b: &ValueId) -> bool {
        self.query(a, b) != AliasResult::NoAlias
    }
}
