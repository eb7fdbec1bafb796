//! Packed binary identifiers used to stamp every unit of data with its origin
//!
//! An [`ObjectId`] is `run_id[2] | module_type[1] | module_index[1] | paket_index[4]`.
//! Multi-byte fields are stored little-endian.

use crate::error::IdError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

const NIL_TEXT: &str = "NIL_ID";

/// Marker for the family an identifier belongs to.
pub trait IdKind: 'static {
    const NAME: &'static str;
}

#[derive(Debug)]
pub enum RunKind {}

#[derive(Debug)]
pub enum ObjectKind {}

impl IdKind for RunKind {
    const NAME: &'static str = "RunId";
}

impl IdKind for ObjectKind {
    const NAME: &'static str = "ObjectId";
}

/// Fixed-width identifier. All bytes `0xFF` is the nil sentinel.
pub struct Id<K: IdKind, const N: usize> {
    bytes: [u8; N],
    _kind: PhantomData<fn() -> K>,
}

pub type RunId = Id<RunKind, 2>;
pub type ObjectId = Id<ObjectKind, 8>;

impl<K: IdKind, const N: usize> Id<K, N> {
    pub const SIZE: usize = N;

    const fn from_array(bytes: [u8; N]) -> Self {
        Self {
            bytes,
            _kind: PhantomData,
        }
    }

    pub const fn nil() -> Self {
        Self::from_array([0xFF; N])
    }

    pub fn is_nil(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0xFF)
    }

    /// Random bytes from the thread-local CSPRNG.
    pub fn from_random() -> Self {
        let mut bytes = [0u8; N];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_array(bytes)
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, IdError> {
        let array: [u8; N] = bytes.try_into().map_err(|_| IdError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })?;
        Ok(Self::from_array(array))
    }

    /// Parses the text produced by `hex()`; `"NIL_ID"` yields the nil id.
    pub fn from_hex(text: &str) -> Result<Self, IdError> {
        if text == NIL_TEXT {
            return Ok(Self::nil());
        }
        let bytes = hex::decode(text).map_err(|_| IdError::InvalidHex(text.to_string()))?;
        Self::from_binary(&bytes)
    }

    pub fn binary(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn hash64(&self) -> u64 {
        murmur_hash64a(&self.bytes, 0)
    }
}

impl<K: IdKind, const N: usize> Clone for Id<K, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: IdKind, const N: usize> Copy for Id<K, N> {}

impl<K: IdKind, const N: usize> PartialEq for Id<K, N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<K: IdKind, const N: usize> Eq for Id<K, N> {}

impl<K: IdKind, const N: usize> Hash for Id<K, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash64());
    }
}

impl<K: IdKind, const N: usize> Default for Id<K, N> {
    fn default() -> Self {
        Self::nil()
    }
}

impl<K: IdKind, const N: usize> fmt::Display for Id<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            f.write_str(NIL_TEXT)
        } else {
            f.write_str(&self.hex())
        }
    }
}

impl<K: IdKind, const N: usize> fmt::Debug for Id<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", K::NAME, self)
    }
}

impl RunId {
    pub fn from_int(value: u16) -> Self {
        Self::from_array(value.to_le_bytes())
    }

    pub fn value(&self) -> u16 {
        u16::from_le_bytes(self.bytes)
    }

    /// Derives a run id from `SHA-256(seed | parent | counter)`, keeping the
    /// first two digest bytes.
    pub fn from_unique_bytes(seed: &RunId, parent: &ObjectId, counter: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.binary());
        hasher.update(parent.binary());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        Self::from_array([digest[0], digest[1]])
    }
}

impl ObjectId {
    pub const MAX_MODULE_INDEX: u64 = u8::MAX as u64;
    pub const MAX_PAKET_INDEX: u64 = u32::MAX as u64;

    pub fn for_module_index(
        run_id: RunId,
        module_type: ModuleType,
        module_index: u64,
        paket_index: u64,
    ) -> Result<Self, IdError> {
        let index =
            u8::try_from(module_index).map_err(|_| IdError::ModuleIndexOutOfRange(module_index))?;
        let paket =
            u32::try_from(paket_index).map_err(|_| IdError::PaketIndexOutOfRange(paket_index))?;

        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(run_id.binary());
        bytes[2] = module_type.code();
        bytes[3] = index;
        bytes[4..8].copy_from_slice(&paket.to_le_bytes());
        Ok(Self::from_array(bytes))
    }

    pub fn run_id(&self) -> RunId {
        RunId::from_array([self.bytes[0], self.bytes[1]])
    }

    pub fn run_id_value(&self) -> u16 {
        self.run_id().value()
    }

    pub fn module_type_code(&self) -> u8 {
        self.bytes[2]
    }

    pub fn module_type(&self) -> Option<ModuleType> {
        ModuleType::from_code(self.module_type_code())
    }

    pub fn module_index(&self) -> u8 {
        self.bytes[3]
    }

    pub fn paket_index(&self) -> u32 {
        u32::from_le_bytes([self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]])
    }

    pub fn is_unpack_module(&self) -> bool {
        self.module_type_code() == ModuleType::Unpack.code()
    }
}

/// Node-type code carried in byte 2 of an [`ObjectId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModuleType {
    Adder = 0x00,
    BerBf = 0x01,
    Chunks2Symb = 0x02,
    EncoderTrellis = 0x03,
    DecoderLazyViterbi = 0x04,
    Metrics = 0x05,
    SrcNoise = 0x06,
    SrcVec = 0x07,
    SinkVec = 0x08,
    Pack = 0x09,
    Unpack = 0x0A,
}

impl ModuleType {
    pub const ALL: [ModuleType; 11] = [
        ModuleType::Adder,
        ModuleType::BerBf,
        ModuleType::Chunks2Symb,
        ModuleType::EncoderTrellis,
        ModuleType::DecoderLazyViterbi,
        ModuleType::Metrics,
        ModuleType::SrcNoise,
        ModuleType::SrcVec,
        ModuleType::SinkVec,
        ModuleType::Pack,
        ModuleType::Unpack,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            ModuleType::Adder => "ADDER",
            ModuleType::BerBf => "BER_BF",
            ModuleType::Chunks2Symb => "CHUNKS2SYMB",
            ModuleType::EncoderTrellis => "ENCODER_TRELLIS",
            ModuleType::DecoderLazyViterbi => "DECODER_LAZY_VITERBI",
            ModuleType::Metrics => "METRICS",
            ModuleType::SrcNoise => "SRC_NOISE",
            ModuleType::SrcVec => "SRC_VEC",
            ModuleType::SinkVec => "SINK_VEC",
            ModuleType::Pack => "PACK",
            ModuleType::Unpack => "UNPACK",
        }
    }

    /// Name for a raw code; `UNKNOWN` if the code is not assigned.
    pub fn name_of(code: u8) -> &'static str {
        Self::from_code(code).map_or("UNKNOWN", ModuleType::name)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MurmurHash64A over `key`, reading 8-byte blocks little-endian.
pub fn murmur_hash64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (key.len() as u64).wrapping_mul(M);

    let mut blocks = key.chunks_exact(8);
    for block in &mut blocks {
        let mut word = [0u8; 8];
        word.copy_from_slice(block);
        let mut k = u64::from_le_bytes(word);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, byte) in tail.iter().enumerate() {
            h ^= (*byte as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}
