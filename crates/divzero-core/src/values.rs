use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an SSA value or global, sigil included (`%x`, `%3`, `@counter`).
///
/// Names are unique within a function, which makes them usable as abstract-memory keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(String);

impl ValueId {
    pub fn local(name: impl AsRef<str>) -> Self {
        Self(format!("%{}", name.as_ref()))
    }

    pub fn global(name: impl AsRef<str>) -> Self {
        Self(format!("@{}", name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0.starts_with('@')
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Register(ValueId),
    Constant(Constant),
    Undefined,
}

impl Value {
    pub fn local(name: impl AsRef<str>) -> Self {
        Value::Register(ValueId::local(name))
    }

    pub fn global(name: impl AsRef<str>) -> Self {
        Value::Register(ValueId::global(name))
    }

    pub fn int(value: i64, bits: u16) -> Self {
        Value::Constant(Constant::int(value, bits))
    }

    pub fn as_register(&self) -> Option<&ValueId> {
        match self {
            Value::Register(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Value::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Integer literal carried by this operand, if any.
    pub fn as_int_literal(&self) -> Option<&Constant> {
        match self {
            Value::Constant(c @ Constant::Int { .. }) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Register(id) => write!(f, "{}", id),
            Value::Constant(c) => write!(f, "{}", c),
            Value::Undefined => write!(f, "undef"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Int { value: BigInt, bits: u16 },
    Null,
    Float(String),
}

impl Constant {
    pub fn int(value: i64, bits: u16) -> Self {
        Constant::Int {
            value: BigInt::from(value),
            bits,
        }
    }

    pub fn bool(value: bool) -> Self {
        Constant::int(i64::from(value), 1)
    }

    /// True for an integer literal whose `bits`-wide bit pattern is all zeros, and for `null`.
    pub fn is_zero(&self) -> bool {
        match self {
            Constant::Int { .. } => self.unsigned_value().map_or(false, |v| v.is_zero()),
            Constant::Null => true,
            Constant::Float(_) => false,
        }
    }

    /// The literal reinterpreted as an unsigned `bits`-wide integer.
    pub fn unsigned_value(&self) -> Option<BigUint> {
        match self {
            Constant::Int { value, bits } => {
                let modulus = BigInt::one() << usize::from(*bits);
                let wrapped = ((value % &modulus) + &modulus) % &modulus;
                wrapped.to_biguint()
            }
            _ => None,
        }
    }

    /// The literal reinterpreted as a two's complement `bits`-wide integer.
    pub fn signed_value(&self) -> Option<BigInt> {
        let Constant::Int { bits, .. } = self else {
            return None;
        };
        let unsigned = BigInt::from_biguint(Sign::Plus, self.unsigned_value()?);
        if *bits == 0 {
            return Some(unsigned);
        }
        let half = BigInt::one() << (usize::from(*bits) - 1);
        if unsigned >= half {
            Some(unsigned - (half << 1))
        } else {
            Some(unsigned)
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.signed_value().and_then(|v| v.to_i64())
    }

    pub fn bits(&self) -> Option<u16> {
        match self {
            Constant::Int { bits, .. } => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int { value, bits: 1 } => write!(f, "{}", !value.is_zero()),
            Constant::Int { value, .. } => write!(f, "{}", value),
            Constant::Null => write!(f, "null"),
            Constant::Float(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_id_naming() {
        assert_eq!(ValueId::local("x").as_str(), "%x");
        assert_eq!(ValueId::global("g").to_string(), "@g");
        assert!(ValueId::global("g").is_global());
        assert!(!ValueId::local("0").is_global());
    }

    #[test]
    fn test_constant_zero() {
        assert!(Constant::int(0, 32).is_zero());
        assert!(!Constant::int(-1, 32).is_zero());
        assert!(Constant::int(256, 8).is_zero());
        assert!(Constant::Null.is_zero());
        assert!(!Constant::Float("0.0".into()).is_zero());
    }

    #[test]
    fn test_constant_reinterpretation() {
        let minus_one = Constant::int(-1, 8);
        assert_eq!(minus_one.unsigned_value(), Some(BigUint::from(255u32)));
        assert_eq!(minus_one.signed_value(), Some(BigInt::from(-1)));

        let big = Constant::int(200, 8);
        assert_eq!(big.signed_value(), Some(BigInt::from(-56)));
        assert_eq!(big.as_i64(), Some(-56));

        let truth = Constant::bool(true);
        assert_eq!(truth.signed_value(), Some(BigInt::from(-1)));
        assert_eq!(truth.to_string(), "true");
    }
}
