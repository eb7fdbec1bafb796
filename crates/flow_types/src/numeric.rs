//! Homogeneous numeric buffers backing generic vectors

use crate::kind::NumericKind;
use num_complex::{Complex32, Complex64};
use rand::Rng;
use std::fmt::Write;

/// Backing store of a generic vector: one `Vec` per element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    C32(Vec<Complex32>),
    C64(Vec<Complex64>),
}

/// Dispatches `$body` with `$v` bound to the inner `Vec` of any variant.
macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::U8($v) => $body,
            NumericData::I8($v) => $body,
            NumericData::U16($v) => $body,
            NumericData::I16($v) => $body,
            NumericData::U32($v) => $body,
            NumericData::I32($v) => $body,
            NumericData::U64($v) => $body,
            NumericData::I64($v) => $body,
            NumericData::F32($v) => $body,
            NumericData::F64($v) => $body,
            NumericData::C32($v) => $body,
            NumericData::C64($v) => $body,
        }
    };
}

impl NumericData {
    /// Zero-filled buffer of `len` elements of `kind`.
    pub fn zeroed(kind: NumericKind, len: usize) -> Self {
        match kind {
            NumericKind::Uint8 => NumericData::U8(vec![0; len]),
            NumericKind::Int8 => NumericData::I8(vec![0; len]),
            NumericKind::Uint16 => NumericData::U16(vec![0; len]),
            NumericKind::Int16 => NumericData::I16(vec![0; len]),
            NumericKind::Uint32 => NumericData::U32(vec![0; len]),
            NumericKind::Int32 => NumericData::I32(vec![0; len]),
            NumericKind::Uint64 => NumericData::U64(vec![0; len]),
            NumericKind::Int64 => NumericData::I64(vec![0; len]),
            NumericKind::Float => NumericData::F32(vec![0.0; len]),
            NumericKind::Double => NumericData::F64(vec![0.0; len]),
            NumericKind::ComplexFloat => NumericData::C32(vec![Complex32::default(); len]),
            NumericKind::ComplexDouble => NumericData::C64(vec![Complex64::default(); len]),
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            NumericData::U8(_) => NumericKind::Uint8,
            NumericData::I8(_) => NumericKind::Int8,
            NumericData::U16(_) => NumericKind::Uint16,
            NumericData::I16(_) => NumericKind::Int16,
            NumericData::U32(_) => NumericKind::Uint32,
            NumericData::I32(_) => NumericKind::Int32,
            NumericData::U64(_) => NumericKind::Uint64,
            NumericData::I64(_) => NumericKind::Int64,
            NumericData::F32(_) => NumericKind::Float,
            NumericData::F64(_) => NumericKind::Double,
            NumericData::C32(_) => NumericKind::ComplexFloat,
            NumericData::C64(_) => NumericKind::ComplexDouble,
        }
    }

    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every element as `"x, "` (or `"(re:im), "` for complex kinds).
    pub fn write_elements(&self, out: &mut String) {
        with_vec!(self, v => {
            for item in v {
                item.write_item(out);
                out.push_str(", ");
            }
        })
    }
}

/// A scalar type that can live in a generic vector.
pub trait Sample: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const KIND: NumericKind;

    fn wrap(data: Vec<Self>) -> NumericData;
    fn slice(data: &NumericData) -> Option<&[Self]>;
    fn slice_mut(data: &mut NumericData) -> Option<&mut [Self]>;

    /// Converts one raw byte of a backing data file into a sample.
    fn from_byte(byte: u8) -> Self;

    /// Element-wise addition; integer kinds wrap on overflow.
    fn add(self, rhs: Self) -> Self;

    /// Uniform sample over `{0, 1}` for integers and `[0, 1)` for reals.
    fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Self;

    fn write_item(&self, out: &mut String);
}

macro_rules! impl_int_sample {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl Sample for $ty {
            const KIND: NumericKind = NumericKind::$kind;

            fn wrap(data: Vec<Self>) -> NumericData {
                NumericData::$variant(data)
            }

            fn slice(data: &NumericData) -> Option<&[Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut NumericData) -> Option<&mut [Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_byte(byte: u8) -> Self {
                byte as $ty
            }

            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen_range(0..=1)
            }

            fn write_item(&self, out: &mut String) {
                let _ = write!(out, "{}", self);
            }
        }
    };
}

macro_rules! impl_real_sample {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl Sample for $ty {
            const KIND: NumericKind = NumericKind::$kind;

            fn wrap(data: Vec<Self>) -> NumericData {
                NumericData::$variant(data)
            }

            fn slice(data: &NumericData) -> Option<&[Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut NumericData) -> Option<&mut [Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_byte(byte: u8) -> Self {
                byte as $ty
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen::<$ty>()
            }

            fn write_item(&self, out: &mut String) {
                let _ = write!(out, "{}", self);
            }
        }
    };
}

macro_rules! impl_complex_sample {
    ($ty:ty, $re:ty, $kind:ident, $variant:ident) => {
        impl Sample for $ty {
            const KIND: NumericKind = NumericKind::$kind;

            fn wrap(data: Vec<Self>) -> NumericData {
                NumericData::$variant(data)
            }

            fn slice(data: &NumericData) -> Option<&[Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut NumericData) -> Option<&mut [Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_byte(byte: u8) -> Self {
                <$ty>::new(byte as $re, 0.0)
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Self {
                <$ty>::new(rng.gen::<$re>(), rng.gen::<$re>())
            }

            fn write_item(&self, out: &mut String) {
                let _ = write!(out, "({}:{})", self.re, self.im);
            }
        }
    };
}

impl_int_sample!(u8, Uint8, U8);
impl_int_sample!(i8, Int8, I8);
impl_int_sample!(u16, Uint16, U16);
impl_int_sample!(i16, Int16, I16);
impl_int_sample!(u32, Uint32, U32);
impl_int_sample!(i32, Int32, I32);
impl_int_sample!(u64, Uint64, U64);
impl_int_sample!(i64, Int64, I64);
impl_real_sample!(f32, Float, F32);
impl_real_sample!(f64, Double, F64);
impl_complex_sample!(Complex32, f32, ComplexFloat, C32);
impl_complex_sample!(Complex64, f64, ComplexDouble, C64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_matches_kind() {
        for kind in NumericKind::ALL {
            let data = NumericData::zeroed(kind, 3);
            assert_eq!(data.kind(), kind);
            assert_eq!(data.len(), 3);
        }
    }

    #[test]
    fn test_integer_add_wraps() {
        assert_eq!(Sample::add(250u8, 10u8), 4);
        assert_eq!(Sample::add(i8::MAX, 1i8), i8::MIN);
    }

    #[test]
    fn test_element_formatting() {
        let mut out = String::new();
        NumericData::U8(vec![1, 2]).write_elements(&mut out);
        assert_eq!(out, "1, 2, ");

        let mut out = String::new();
        NumericData::C32(vec![Complex32::new(1.5, -2.0)]).write_elements(&mut out);
        assert_eq!(out, "(1.5:-2), ");
    }

    #[test]
    fn test_random_unit_integers_are_bits() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let v = <u16 as Sample>::random_unit(&mut rng);
            assert!(v <= 1);
        }
    }
}
