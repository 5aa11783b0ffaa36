use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int(u16),
    /// `None` is an opaque `ptr`; `Some` keeps the pointee of a typed pointer such as `i32*`.
    Ptr(Option<Box<Type>>),
    Float(u16),
    Label,
    Other(String),
}

impl Type {
    pub fn i1() -> Self {
        Type::Int(1)
    }

    pub fn i8() -> Self {
        Type::Int(8)
    }

    pub fn i32() -> Self {
        Type::Int(32)
    }

    pub fn i64() -> Self {
        Type::Int(64)
    }

    pub fn ptr() -> Self {
        Type::Ptr(None)
    }

    pub fn ptr_to(pointee: Type) -> Self {
        Type::Ptr(Some(Box::new(pointee)))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    pub fn bit_width(&self) -> Option<u16> {
        match self {
            Type::Int(bits) | Type::Float(bits) => Some(*bits),
            Type::Ptr(_) => Some(64),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(Some(inner)) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Ptr(None) => write!(f, "ptr"),
            Type::Ptr(Some(inner)) => write!(f, "{}*", inner),
            Type::Float(16) => write!(f, "half"),
            Type::Float(32) => write!(f, "float"),
            Type::Float(64) => write!(f, "double"),
            Type::Float(bits) => write!(f, "f{}", bits),
            Type::Label => write!(f, "label"),
            Type::Other(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::i32().to_string(), "i32");
        assert_eq!(Type::ptr().to_string(), "ptr");
        assert_eq!(Type::ptr_to(Type::ptr_to(Type::i8())).to_string(), "i8**");
        assert_eq!(Type::Float(64).to_string(), "double");
    }

    #[test]
    fn test_type_queries() {
        assert!(Type::i1().is_integer());
        assert!(!Type::ptr().is_integer());
        assert!(Type::ptr_to(Type::i32()).is_pointer());
        assert_eq!(Type::ptr_to(Type::i32()).pointee(), Some(&Type::i32()));
        assert_eq!(Type::ptr().pointee(), None);
        assert_eq!(Type::i64().bit_width(), Some(64));
        assert_eq!(Type::Void.bit_width(), None);
    }
}
