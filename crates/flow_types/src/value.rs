//! Reference-counted, type-tagged values exchanged between nodes
//!
//! A `TaggedValue` is cheap to clone (it shares one allocation) and its
//! `DataType` is fixed when it is built. Only generic numeric vectors carry
//! mutable contents, guarded by a lock and reached through typed accessors.

use crate::error::{ValueError, ValueResult};
use crate::kind::{DataType, NumericKind};
use crate::numeric::{NumericData, Sample};
use num_complex::Complex64;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone)]
pub struct TaggedValue(Arc<Value>);

#[derive(Debug)]
pub enum Value {
    Bool(bool),
    Symbol(Arc<str>),
    /// A single number; the buffer always holds exactly one element.
    Scalar(NumericData),
    Pair(TaggedValue, TaggedValue),
    Tuple(Vec<TaggedValue>),
    Vector(Vec<TaggedValue>),
    Dict(Vec<(TaggedValue, TaggedValue)>),
    Blob(Vec<u8>),
    GenVector(GenVector),
}

/// Homogeneous numeric vector with a fixed element kind.
#[derive(Debug)]
pub struct GenVector {
    kind: NumericKind,
    data: RwLock<NumericData>,
}

impl GenVector {
    fn read(&self) -> RwLockReadGuard<'_, NumericData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NumericData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaggedValue {
    fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn data_type(&self) -> DataType {
        match self.value() {
            Value::Bool(_) => DataType::Bool,
            Value::Symbol(_) => DataType::Symbol,
            Value::Scalar(data) => data.kind().scalar_type(),
            Value::Pair(..) => DataType::Pair,
            Value::Tuple(_) => DataType::Tuple,
            Value::Vector(_) => DataType::Vector,
            Value::Dict(_) => DataType::Dict,
            Value::Blob(_) => DataType::Blob,
            Value::GenVector(vec) => vec.kind.vector_type(),
        }
    }

    fn wrong_type(&self, expected: DataType) -> ValueError {
        ValueError::WrongType {
            expected,
            found: self.data_type(),
        }
    }

    // ---- scalars ----

    pub fn from_bool(value: bool) -> Self {
        Self::new(Value::Bool(value))
    }

    pub fn symbol(name: &str) -> Self {
        Self::new(Value::Symbol(Arc::from(name)))
    }

    pub fn scalar<T: Sample>(value: T) -> Self {
        Self::new(Value::Scalar(T::wrap(vec![value])))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::scalar(value)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::scalar(value)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::scalar(value)
    }

    pub fn from_complex(value: Complex64) -> Self {
        Self::scalar(value)
    }

    pub fn to_bool(&self) -> ValueResult<bool> {
        match self.value() {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.wrong_type(DataType::Bool)),
        }
    }

    pub fn symbol_name(&self) -> ValueResult<&str> {
        match self.value() {
            Value::Symbol(name) => Ok(name),
            _ => Err(self.wrong_type(DataType::Symbol)),
        }
    }

    /// Reads a scalar stored with exactly the kind `T`.
    pub fn scalar_value<T: Sample>(&self) -> ValueResult<T> {
        match self.value() {
            Value::Scalar(data) => T::slice(data)
                .and_then(|s| s.first().copied())
                .ok_or_else(|| self.wrong_type(T::KIND.scalar_type())),
            _ => Err(self.wrong_type(T::KIND.scalar_type())),
        }
    }

    pub fn to_i64(&self) -> ValueResult<i64> {
        self.scalar_value::<i64>()
    }

    pub fn to_u64(&self) -> ValueResult<u64> {
        self.scalar_value::<u64>()
    }

    pub fn to_f64(&self) -> ValueResult<f64> {
        self.scalar_value::<f64>()
    }

    pub fn to_complex(&self) -> ValueResult<Complex64> {
        self.scalar_value::<Complex64>()
    }

    // ---- pairs, tuples, vectors ----

    pub fn cons(car: TaggedValue, cdr: TaggedValue) -> Self {
        Self::new(Value::Pair(car, cdr))
    }

    pub fn car(&self) -> ValueResult<&TaggedValue> {
        match self.value() {
            Value::Pair(car, _) => Ok(car),
            _ => Err(self.wrong_type(DataType::Pair)),
        }
    }

    pub fn cdr(&self) -> ValueResult<&TaggedValue> {
        match self.value() {
            Value::Pair(_, cdr) => Ok(cdr),
            _ => Err(self.wrong_type(DataType::Pair)),
        }
    }

    pub fn tuple(items: Vec<TaggedValue>) -> Self {
        Self::new(Value::Tuple(items))
    }

    pub fn tuple_ref(&self, index: usize) -> ValueResult<&TaggedValue> {
        match self.value() {
            Value::Tuple(items) => items
                .get(index)
                .ok_or(ValueError::OutOfRange { index, len: items.len() }),
            _ => Err(self.wrong_type(DataType::Tuple)),
        }
    }

    pub fn vector(items: Vec<TaggedValue>) -> Self {
        Self::new(Value::Vector(items))
    }

    pub fn vector_ref(&self, index: usize) -> ValueResult<&TaggedValue> {
        match self.value() {
            Value::Vector(items) => items
                .get(index)
                .ok_or(ValueError::OutOfRange { index, len: items.len() }),
            _ => Err(self.wrong_type(DataType::Vector)),
        }
    }

    pub fn blob(bytes: &[u8]) -> Self {
        Self::new(Value::Blob(bytes.to_vec()))
    }

    pub fn blob_data(&self) -> ValueResult<&[u8]> {
        match self.value() {
            Value::Blob(bytes) => Ok(bytes),
            _ => Err(self.wrong_type(DataType::Blob)),
        }
    }

    // ---- dictionaries ----
    //
    // Dictionaries are persistent: every update returns a new value and
    // leaves the receiver untouched. Keys are compared with `eqv`.

    pub fn make_dict() -> Self {
        Self::new(Value::Dict(Vec::new()))
    }

    fn dict_entries(&self) -> ValueResult<&[(TaggedValue, TaggedValue)]> {
        match self.value() {
            Value::Dict(entries) => Ok(entries),
            _ => Err(self.wrong_type(DataType::Dict)),
        }
    }

    pub fn dict_add(&self, key: TaggedValue, value: TaggedValue) -> ValueResult<TaggedValue> {
        let mut entries = self.dict_entries()?.to_vec();
        match entries.iter_mut().find(|(k, _)| k.eqv(&key)) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        Ok(Self::new(Value::Dict(entries)))
    }

    pub fn dict_delete(&self, key: &TaggedValue) -> ValueResult<TaggedValue> {
        let entries = self
            .dict_entries()?
            .iter()
            .filter(|(k, _)| !k.eqv(key))
            .cloned()
            .collect();
        Ok(Self::new(Value::Dict(entries)))
    }

    pub fn dict_has_key(&self, key: &TaggedValue) -> ValueResult<bool> {
        Ok(self.dict_entries()?.iter().any(|(k, _)| k.eqv(key)))
    }

    pub fn dict_ref(&self, key: &TaggedValue) -> ValueResult<&TaggedValue> {
        self.dict_entries()?
            .iter()
            .find(|(k, _)| k.eqv(key))
            .map(|(_, v)| v)
            .ok_or(ValueError::KeyNotFound)
    }

    pub fn dict_keys(&self) -> ValueResult<Vec<TaggedValue>> {
        Ok(self.dict_entries()?.iter().map(|(k, _)| k.clone()).collect())
    }

    pub fn dict_values(&self) -> ValueResult<Vec<TaggedValue>> {
        Ok(self.dict_entries()?.iter().map(|(_, v)| v.clone()).collect())
    }

    // ---- generic numeric vectors ----

    /// Zero-filled generic vector of `len` elements.
    pub fn make_gen_vector(kind: NumericKind, len: usize) -> Self {
        Self::from_numeric(NumericData::zeroed(kind, len))
    }

    pub fn gen_vector_filled<T: Sample>(len: usize, fill: T) -> Self {
        Self::from_numeric(T::wrap(vec![fill; len]))
    }

    /// Copies `items` into a new generic vector.
    pub fn gen_vector_from_slice<T: Sample>(items: &[T]) -> Self {
        Self::from_numeric(T::wrap(items.to_vec()))
    }

    pub fn from_numeric(data: NumericData) -> Self {
        Self::new(Value::GenVector(GenVector {
            kind: data.kind(),
            data: RwLock::new(data),
        }))
    }

    fn gen_vector(&self) -> Option<&GenVector> {
        match self.value() {
            Value::GenVector(vec) => Some(vec),
            _ => None,
        }
    }

    fn typed_gen_vector<T: Sample>(&self) -> ValueResult<&GenVector> {
        match self.gen_vector() {
            Some(vec) if vec.kind == T::KIND => Ok(vec),
            _ => Err(self.wrong_type(T::KIND.vector_type())),
        }
    }

    pub fn is_gen_vector(&self) -> bool {
        self.gen_vector().is_some()
    }

    pub fn vector_kind(&self) -> Option<NumericKind> {
        self.gen_vector().map(|vec| vec.kind)
    }

    /// Element count of a collection value.
    pub fn length(&self) -> ValueResult<usize> {
        match self.value() {
            Value::GenVector(vec) => Ok(vec.read().len()),
            Value::Tuple(items) | Value::Vector(items) => Ok(items.len()),
            Value::Dict(entries) => Ok(entries.len()),
            Value::Blob(bytes) => Ok(bytes.len()),
            _ => Err(self.wrong_type(DataType::Vector)),
        }
    }

    pub fn item_size(&self) -> ValueResult<usize> {
        self.gen_vector()
            .map(|vec| vec.kind.item_size())
            .ok_or_else(|| self.wrong_type(DataType::GvecUint8))
    }

    pub fn ref_at<T: Sample>(&self, index: usize) -> ValueResult<T> {
        let data = self.typed_gen_vector::<T>()?.read();
        let items = T::slice(&data).unwrap_or_default();
        items
            .get(index)
            .copied()
            .ok_or(ValueError::OutOfRange { index, len: items.len() })
    }

    pub fn set<T: Sample>(&self, index: usize, value: T) -> ValueResult<()> {
        let mut data = self.typed_gen_vector::<T>()?.write();
        let items = T::slice_mut(&mut data).unwrap_or_default();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ValueError::OutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn fill<T: Sample>(&self, value: T) -> ValueResult<()> {
        self.with_elements_mut(|items: &mut [T]| items.fill(value))
    }

    /// Copy of all elements.
    pub fn elements<T: Sample>(&self) -> ValueResult<Vec<T>> {
        let data = self.typed_gen_vector::<T>()?.read();
        Ok(T::slice(&data).unwrap_or_default().to_vec())
    }

    /// Overwrites every element; `items` must have the vector's length.
    pub fn write_elements<T: Sample>(&self, items: &[T]) -> ValueResult<()> {
        let mut data = self.typed_gen_vector::<T>()?.write();
        let dest = T::slice_mut(&mut data).unwrap_or_default();
        if dest.len() != items.len() {
            return Err(ValueError::LengthMismatch {
                expected: dest.len(),
                actual: items.len(),
            });
        }
        dest.copy_from_slice(items);
        Ok(())
    }

    pub fn with_elements<T: Sample, R>(&self, f: impl FnOnce(&[T]) -> R) -> ValueResult<R> {
        let data = self.typed_gen_vector::<T>()?.read();
        Ok(f(T::slice(&data).unwrap_or_default()))
    }

    pub fn with_elements_mut<T: Sample, R>(
        &self,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> ValueResult<R> {
        let mut data = self.typed_gen_vector::<T>()?.write();
        Ok(f(T::slice_mut(&mut data).unwrap_or_default()))
    }

    /// Snapshot of the vector buffer, whatever its kind.
    pub fn numeric_data(&self) -> ValueResult<NumericData> {
        match self.value() {
            Value::GenVector(vec) => Ok(vec.read().clone()),
            Value::Scalar(data) => Ok(data.clone()),
            _ => Err(self.wrong_type(DataType::GvecUint8)),
        }
    }

    // ---- comparison ----

    /// Identity, or equal immediates (booleans and symbols).
    pub fn eq(&self, other: &TaggedValue) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.value(), other.value()) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            _ => false,
        }
    }

    /// `eq`, or numbers of the same kind and value.
    pub fn eqv(&self, other: &TaggedValue) -> bool {
        if self.eq(other) {
            return true;
        }
        match (self.value(), other.value()) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            _ => false,
        }
    }

    /// Structural equality; recursive on composites.
    pub fn equal(&self, other: &TaggedValue) -> bool {
        if self.eqv(other) {
            return true;
        }
        match (self.value(), other.value()) {
            (Value::Pair(a1, d1), Value::Pair(a2, d2)) => a1.equal(a2) && d1.equal(d2),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Vector(a), Value::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equal(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((k1, v1), (k2, v2))| k1.equal(k2) && v1.equal(v2))
            }
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::GenVector(a), Value::GenVector(b)) => *a.read() == *b.read(),
            _ => false,
        }
    }
}

impl fmt::Debug for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaggedValue({}: {})", self.data_type(), self)
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TaggedValue]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self.value() {
            Value::Bool(true) => f.write_str("#t"),
            Value::Bool(false) => f.write_str("#f"),
            Value::Symbol(name) => f.write_str(name),
            Value::Scalar(data) => {
                let mut out = String::new();
                data.write_elements(&mut out);
                f.write_str(out.trim_end_matches(", "))
            }
            Value::Pair(car, cdr) => write!(f, "({} . {})", car, cdr),
            Value::Tuple(items) => {
                f.write_str("{")?;
                join(f, items)?;
                f.write_str("}")
            }
            Value::Vector(items) => {
                f.write_str("#(")?;
                join(f, items)?;
                f.write_str(")")
            }
            Value::Dict(entries) => {
                f.write_str("(")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "({} . {})", k, v)?;
                }
                f.write_str(")")
            }
            Value::Blob(bytes) => write!(f, "#<blob {} bytes>", bytes.len()),
            Value::GenVector(vec) => {
                let mut out = String::new();
                vec.read().write_elements(&mut out);
                write!(f, "#[{}]", out.trim_end_matches(", "))
            }
        }
    }
}
