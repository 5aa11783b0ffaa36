use super::domain::AbstractValue;
use crate::values::ValueId;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;

/// Abstract state at one program point: variable name to abstract value.
///
/// Unbound names are implicitly `Uninit`. Snapshots share their bindings until one of them is
/// written, so cloning a memory per instruction is cheap.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    bindings: Arc<IndexMap<ValueId, AbstractValue>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &ValueId) -> Option<AbstractValue> {
        self.bindings.get(var).copied()
    }

    /// Binding for `var`, or `default` when the memory says nothing about it.
    pub fn get_or(&self, var: &ValueId, default: AbstractValue) -> AbstractValue {
        self.get(var).unwrap_or(default)
    }

    pub fn set(&mut self, var: ValueId, value: AbstractValue) {
        if self.bindings.get(&var) != Some(&value) {
            Arc::make_mut(&mut self.bindings).insert(var, value);
        }
    }

    pub fn contains(&self, var: &ValueId) -> bool {
        self.bindings.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValueId, AbstractValue)> + '_ {
        self.bindings.iter().map(|(k, v)| (k, *v))
    }

    /// Pointwise least upper bound over the union of both key sets.
    pub fn join(&self, other: &Memory) -> Memory {
        if Arc::ptr_eq(&self.bindings, &other.bindings) || other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let mut result = self.clone();
        for (var, value) in other.iter() {
            let joined = match self.get(var) {
                Some(existing) => existing.join(value),
                None => value,
            };
            result.set(var.clone(), joined);
        }
        result
    }

    /// Same key set with pointwise-equal values.
    pub fn equal(&self, other: &Memory) -> bool {
        Arc::ptr_eq(&self.bindings, &other.bindings) || self.bindings == other.bindings
    }

    /// Pointwise `self ⊑ other`, treating unbound names as `Uninit`.
    pub fn leq(&self, other: &Memory) -> bool {
        self.iter()
            .all(|(var, value)| value.leq(other.get_or(var, AbstractValue::Uninit)))
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Eq for Memory {}

impl FromIterator<(ValueId, AbstractValue)> for Memory {
    fn from_iter<I: IntoIterator<Item = (ValueId, AbstractValue)>>(iter: I) -> Self {
        Self {
            bindings: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl Serialize for Memory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (var, value) in self.iter() {
            map.serialize_entry(var.as_str(), &value)?;
        }
        map.end()
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "{{")?;
        for (i, (var, value)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", var, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use AbstractValue::*;

    fn mem(entries: &[(&str, AbstractValue)]) -> Memory {
        entries
            .iter()
            .map(|(name, v)| (ValueId::local(name), *v))
            .collect()
    }

    #[test]
    fn test_join_union_of_keys() {
        let m1 = mem(&[("x", NonZero), ("y", Zero)]);
        let m2 = mem(&[("x", Zero), ("z", MaybeZero)]);

        let joined = m1.join(&m2);
        assert_eq!(
            joined,
            mem(&[("x", MaybeZero), ("y", Zero), ("z", MaybeZero)])
        );
        assert_eq!(joined, m2.join(&m1));
    }

    #[test]
    fn test_join_with_empty_is_identity() {
        let m = mem(&[("x", NonZero)]);
        assert_eq!(m.join(&Memory::new()), m);
        assert_eq!(Memory::new().join(&m), m);
    }

    #[test]
    fn test_equal_requires_same_keys() {
        let m1 = mem(&[("x", NonZero)]);
        let m2 = mem(&[("x", NonZero), ("y", Uninit)]);
        assert!(!m1.equal(&m2));
        assert!(m1.equal(&m1.clone()));
        assert!(mem(&[("a", Zero), ("b", NonZero)]).equal(&mem(&[("b", NonZero), ("a", Zero)])));
    }

    #[test]
    fn test_set_does_not_touch_snapshots() {
        let original = mem(&[("x", Zero)]);
        let mut copy = original.clone();
        copy.set(ValueId::local("x"), NonZero);

        assert_eq!(original.get(&ValueId::local("x")), Some(Zero));
        assert_eq!(copy.get(&ValueId::local("x")), Some(NonZero));
    }

    #[test]
    fn test_leq_and_display() {
        let low = mem(&[("x", Zero)]);
        let high = mem(&[("x", MaybeZero), ("y", NonZero)]);
        assert!(low.leq(&high));
        assert!(!high.leq(&low));
        assert_eq!(high.to_string(), "{%x -> MaybeZero, %y -> NonZero}");
    }
}
