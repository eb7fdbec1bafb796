//! Run-time type tags for tagged values

use std::fmt;
use std::str::FromStr;

/// Element kind of a generic numeric vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericKind {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float,
    Double,
    ComplexFloat,
    ComplexDouble,
}

impl NumericKind {
    pub const ALL: [NumericKind; 12] = [
        NumericKind::Uint8,
        NumericKind::Int8,
        NumericKind::Uint16,
        NumericKind::Int16,
        NumericKind::Uint32,
        NumericKind::Int32,
        NumericKind::Uint64,
        NumericKind::Int64,
        NumericKind::Float,
        NumericKind::Double,
        NumericKind::ComplexFloat,
        NumericKind::ComplexDouble,
    ];

    /// Size of one element in bytes.
    pub fn item_size(self) -> usize {
        match self {
            NumericKind::Uint8 | NumericKind::Int8 => 1,
            NumericKind::Uint16 | NumericKind::Int16 => 2,
            NumericKind::Uint32 | NumericKind::Int32 | NumericKind::Float => 4,
            NumericKind::Uint64
            | NumericKind::Int64
            | NumericKind::Double
            | NumericKind::ComplexFloat => 8,
            NumericKind::ComplexDouble => 16,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, NumericKind::ComplexFloat | NumericKind::ComplexDouble)
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericKind::Uint8 => "UINT8",
            NumericKind::Int8 => "INT8",
            NumericKind::Uint16 => "UINT16",
            NumericKind::Int16 => "INT16",
            NumericKind::Uint32 => "UINT32",
            NumericKind::Int32 => "INT32",
            NumericKind::Uint64 => "UINT64",
            NumericKind::Int64 => "INT64",
            NumericKind::Float => "FLOAT",
            NumericKind::Double => "DOUBLE",
            NumericKind::ComplexFloat => "COMPLEX_FLOAT",
            NumericKind::ComplexDouble => "COMPLEX_DOUBLE",
        }
    }

    /// Tag of a generic vector holding elements of this kind.
    pub fn vector_type(self) -> DataType {
        match self {
            NumericKind::Uint8 => DataType::GvecUint8,
            NumericKind::Int8 => DataType::GvecInt8,
            NumericKind::Uint16 => DataType::GvecUint16,
            NumericKind::Int16 => DataType::GvecInt16,
            NumericKind::Uint32 => DataType::GvecUint32,
            NumericKind::Int32 => DataType::GvecInt32,
            NumericKind::Uint64 => DataType::GvecUint64,
            NumericKind::Int64 => DataType::GvecInt64,
            NumericKind::Float => DataType::GvecFloat,
            NumericKind::Double => DataType::GvecDouble,
            NumericKind::ComplexFloat => DataType::GvecComplexFloat,
            NumericKind::ComplexDouble => DataType::GvecComplexDouble,
        }
    }

    /// Tag of a scalar of this kind.
    pub fn scalar_type(self) -> DataType {
        match self {
            NumericKind::Uint8 => DataType::Uint8,
            NumericKind::Int8 => DataType::Int8,
            NumericKind::Uint16 => DataType::Uint16,
            NumericKind::Int16 => DataType::Int16,
            NumericKind::Uint32 => DataType::Uint32,
            NumericKind::Int32 => DataType::Int32,
            NumericKind::Uint64 => DataType::Uint64,
            NumericKind::Int64 => DataType::Int64,
            NumericKind::Float => DataType::Float,
            NumericKind::Double => DataType::Double,
            NumericKind::ComplexFloat => DataType::ComplexFloat,
            NumericKind::ComplexDouble => DataType::ComplexDouble,
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run-time type tag carried by every tagged value and event record.
///
/// The discriminants are the wire codes used in logs and identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Unknown = 0x00,

    GvecUint8 = 0x01,
    GvecInt8 = 0x02,
    GvecUint16 = 0x03,
    GvecInt16 = 0x04,
    GvecInt32 = 0x05,
    GvecUint32 = 0x06,
    GvecInt64 = 0x07,
    GvecUint64 = 0x08,
    GvecFloat = 0x09,
    GvecDouble = 0x0A,
    GvecComplexFloat = 0x0B,
    GvecComplexDouble = 0x0C,

    Uint8 = 0x21,
    Int8 = 0x22,
    Uint16 = 0x23,
    Int16 = 0x24,
    Int32 = 0x25,
    Uint32 = 0x26,
    Int64 = 0x27,
    Uint64 = 0x28,
    Float = 0x29,
    Double = 0x2A,
    ComplexFloat = 0x2B,
    ComplexDouble = 0x2C,

    Pair = 0x31,
    Vector = 0x32,
    Dict = 0x33,
    Tuple = 0x34,

    Bool = 0x41,
    Symbol = 0x42,
    Blob = 0x43,
}

impl DataType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Element kind if this tag names a generic vector.
    pub fn vector_kind(self) -> Option<NumericKind> {
        NumericKind::ALL
            .into_iter()
            .find(|kind| kind.vector_type() == self)
    }

    /// Numeric kind named by this tag, whether scalar or vector.
    pub fn numeric_kind(self) -> Option<NumericKind> {
        self.vector_kind().or_else(|| {
            NumericKind::ALL
                .into_iter()
                .find(|kind| kind.scalar_type() == self)
        })
    }

    pub fn is_vector(self) -> bool {
        self.vector_kind().is_some()
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "UNKNOWN",
            DataType::GvecUint8 => "GVEC_UINT8",
            DataType::GvecInt8 => "GVEC_INT8",
            DataType::GvecUint16 => "GVEC_UINT16",
            DataType::GvecInt16 => "GVEC_INT16",
            DataType::GvecInt32 => "GVEC_INT32",
            DataType::GvecUint32 => "GVEC_UINT32",
            DataType::GvecInt64 => "GVEC_INT64",
            DataType::GvecUint64 => "GVEC_UINT64",
            DataType::GvecFloat => "GVEC_FLOAT",
            DataType::GvecDouble => "GVEC_DOUBLE",
            DataType::GvecComplexFloat => "GVEC_COMPLEX_FLOAT",
            DataType::GvecComplexDouble => "GVEC_COMPLEX_DOUBLE",
            DataType::Uint8 => "UINT8",
            DataType::Int8 => "INT8",
            DataType::Uint16 => "UINT16",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Uint32 => "UINT32",
            DataType::Int64 => "INT64",
            DataType::Uint64 => "UINT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::ComplexFloat => "COMPLEX_FLOAT",
            DataType::ComplexDouble => "COMPLEX_DOUBLE",
            DataType::Pair => "PAIR",
            DataType::Vector => "VECTOR",
            DataType::Dict => "DICT",
            DataType::Tuple => "TUPLE",
            DataType::Bool => "BOOL",
            DataType::Symbol => "SYMBOL",
            DataType::Blob => "BLOB",
        }
    }

    const NAMED: [DataType; 32] = [
        DataType::Unknown,
        DataType::GvecUint8,
        DataType::GvecInt8,
        DataType::GvecUint16,
        DataType::GvecInt16,
        DataType::GvecInt32,
        DataType::GvecUint32,
        DataType::GvecInt64,
        DataType::GvecUint64,
        DataType::GvecFloat,
        DataType::GvecDouble,
        DataType::GvecComplexFloat,
        DataType::GvecComplexDouble,
        DataType::Uint8,
        DataType::Int8,
        DataType::Uint16,
        DataType::Int16,
        DataType::Int32,
        DataType::Uint32,
        DataType::Int64,
        DataType::Uint64,
        DataType::Float,
        DataType::Double,
        DataType::ComplexFloat,
        DataType::ComplexDouble,
        DataType::Pair,
        DataType::Vector,
        DataType::Dict,
        DataType::Tuple,
        DataType::Bool,
        DataType::Symbol,
        DataType::Blob,
    ];
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    /// Unrecognised names map to `DataType::Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::NAMED
            .into_iter()
            .find(|ty| ty.name() == s)
            .unwrap_or(DataType::Unknown))
    }
}
