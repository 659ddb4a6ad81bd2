//! The kind of a type: the coarse category every type descriptor falls into.

use std::fmt;

/// Category of a [`Type`](crate::Type).
///
/// Named types share the kind of their underlying type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No type at all (the untyped nil)
    Invalid,
    /// `bool`
    Bool,
    /// Platform-sized signed integer (64 bits here)
    Int,
    /// `int8`
    Int8,
    /// `int16`
    Int16,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// Platform-sized unsigned integer (64 bits here)
    Uint,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// Unsigned integer large enough to hold a pointer
    Uintptr,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `complex64`
    Complex64,
    /// `complex128`
    Complex128,
    /// Fixed-size array
    Array,
    /// Channel
    Chan,
    /// Function
    Func,
    /// Interface
    Interface,
    /// Map
    Map,
    /// Pointer
    Pointer,
    /// Slice
    Slice,
    /// String
    String,
    /// Struct
    Struct,
}

impl Kind {
    /// Kinds whose zero value is nil.
    pub fn is_nilable(self) -> bool {
        matches!(
            self,
            Kind::Chan | Kind::Func | Kind::Map | Kind::Pointer | Kind::Interface | Kind::Slice
        )
    }

    /// Signed integer kinds
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64
        )
    }

    /// Unsigned integer kinds
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::Uint | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 | Kind::Uintptr
        )
    }

    /// Any integer kind
    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Floating-point kinds
    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    /// Complex kinds
    pub fn is_complex(self) -> bool {
        matches!(self, Kind::Complex64 | Kind::Complex128)
    }

    /// Integer or floating-point kinds (complex numbers convert only among themselves)
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Kinds backed by a predeclared type
    pub fn is_basic(self) -> bool {
        self.is_numeric() || self.is_complex() || matches!(self, Kind::Bool | Kind::String)
    }

    /// Width in bits for numeric kinds
    pub fn bits(self) -> Option<u32> {
        match self {
            Kind::Int8 | Kind::Uint8 => Some(8),
            Kind::Int16 | Kind::Uint16 => Some(16),
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => Some(32),
            Kind::Int | Kind::Int64 | Kind::Uint | Kind::Uint64 | Kind::Uintptr => Some(64),
            Kind::Float64 | Kind::Complex64 => Some(64),
            Kind::Complex128 => Some(128),
            _ => None,
        }
    }

    /// Lowercase name, as used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Pointer => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nilable_kinds() {
        assert!(Kind::Pointer.is_nilable());
        assert!(Kind::Interface.is_nilable());
        assert!(Kind::Slice.is_nilable());
        assert!(Kind::Map.is_nilable());
        assert!(Kind::Func.is_nilable());
        assert!(Kind::Chan.is_nilable());
        assert!(!Kind::Struct.is_nilable());
        assert!(!Kind::Array.is_nilable());
        assert!(!Kind::Int.is_nilable());
    }

    #[test]
    fn test_numeric_classification() {
        assert!(Kind::Int8.is_signed());
        assert!(Kind::Uintptr.is_unsigned());
        assert!(Kind::Float32.is_numeric());
        assert!(!Kind::Complex64.is_numeric());
        assert!(Kind::Complex64.is_basic());
        assert_eq!(Kind::Int16.bits(), Some(16));
        assert_eq!(Kind::String.bits(), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Pointer.to_string(), "ptr");
        assert_eq!(Kind::Func.to_string(), "func");
        assert_eq!(Kind::Invalid.to_string(), "invalid");
    }
}
