//! The zero/nonzero lattice.
//!
//! ```text
//!        MaybeZero
//!        /       \
//!     Zero     NonZero
//!        \       /
//!         Uninit
//! ```

use crate::values::Constant;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AbstractValue {
    /// Bottom: nothing has flowed here yet.
    #[default]
    Uninit,
    Zero,
    NonZero,
    /// Top: zero, nonzero, or unknown.
    MaybeZero,
}

use AbstractValue::*;

impl AbstractValue {
    pub const ALL: [AbstractValue; 4] = [Uninit, Zero, NonZero, MaybeZero];

    /// Classifies an integer literal exactly.
    pub fn from_constant(constant: &Constant) -> Self {
        if constant.is_zero() {
            Zero
        } else {
            NonZero
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            Zero
        } else {
            NonZero
        }
    }

    /// Abstract sum. Two nonzero addends may cancel out.
    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (MaybeZero | Uninit, _) | (_, MaybeZero | Uninit) => MaybeZero,
            (Zero, v) | (v, Zero) => v,
            (NonZero, NonZero) => MaybeZero,
        }
    }

    /// Abstract difference. Callers handle `x - x` before reaching the domain.
    pub fn sub(self, other: Self) -> Self {
        match (self, other) {
            (MaybeZero | Uninit, _) | (_, MaybeZero | Uninit) => MaybeZero,
            (Zero, v) | (v, Zero) => v,
            (NonZero, NonZero) => MaybeZero,
        }
    }

    pub fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Zero, _) | (_, Zero) => Zero,
            (MaybeZero | Uninit, _) | (_, MaybeZero | Uninit) => MaybeZero,
            (NonZero, NonZero) => NonZero,
        }
    }

    /// Abstract quotient. Any divisor not proven nonzero makes the result unknown.
    pub fn div(self, divisor: Self) -> Self {
        match (self, divisor) {
            (_, Zero | MaybeZero | Uninit) => MaybeZero,
            (Zero, NonZero) => Zero,
            (NonZero, NonZero) => NonZero,
            (MaybeZero | Uninit, NonZero) => MaybeZero,
        }
    }

    /// Least upper bound.
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Uninit, v) | (v, Uninit) => v,
            (a, b) if a == b => a,
            _ => MaybeZero,
        }
    }

    /// Lattice order: `self ⊑ other`.
    pub fn leq(self, other: Self) -> bool {
        self.join(other) == other
    }

    /// True only when the value has been proven nonzero.
    pub fn is_proven_nonzero(self) -> bool {
        self == NonZero
    }
}

impl fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Uninit => "Uninit",
            Zero => "Zero",
            NonZero => "NonZero",
            MaybeZero => "MaybeZero",
        };
        f.write_str(name)
    }
}
