//! Fixed-size element types and their little-endian wire encoding.

use crate::error::{MeshError, Result};
use crate::types::DataType;

mod sealed {
    pub trait Sealed {}
}

/// A plain element that can travel in a message payload.
///
/// Payloads are encoded little-endian regardless of host byte order, so
/// mixed-endian meshes agree on values.
pub trait Element: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    const DTYPE: DataType;
    const SIZE: usize = Self::DTYPE.size_in_bytes();

    fn write_le(self, out: &mut [u8]);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const DTYPE: DataType = DataType::$dtype;

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    Self::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(
    i8 => I8,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

/// Byte length of `count` elements of `T`.
pub(crate) fn byte_len<T: Element>(count: usize) -> usize {
    count * T::SIZE
}

/// Encode a slice of elements into a fresh payload.
pub(crate) fn encode<T: Element>(data: &[T]) -> Vec<u8> {
    let mut out = vec![0u8; byte_len::<T>(data.len())];
    for (v, chunk) in data.iter().zip(out.chunks_exact_mut(T::SIZE)) {
        v.write_le(chunk);
    }
    out
}

/// Decode a payload into the front of `dst`, returning the element count.
///
/// The payload must be a whole number of elements and must fit in `dst`.
pub(crate) fn decode_into<T: Element>(bytes: &[u8], dst: &mut [T]) -> Result<usize> {
    let count = element_count::<T>(bytes.len())?;
    if count > dst.len() {
        return Err(MeshError::Truncated {
            capacity: byte_len::<T>(dst.len()),
            actual: bytes.len(),
        });
    }
    for (slot, chunk) in dst.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        *slot = T::read_le(chunk);
    }
    Ok(count)
}

/// Decode an entire payload into a new vector.
pub(crate) fn decode_vec<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    element_count::<T>(bytes.len())?;
    Ok(bytes.chunks_exact(T::SIZE).map(T::read_le).collect())
}

/// Number of whole `T` elements in `len` bytes.
pub(crate) fn element_count<T: Element>(len: usize) -> Result<usize> {
    if len % T::SIZE != 0 {
        return Err(MeshError::BufferSizeMismatch {
            expected: len - len % T::SIZE,
            actual: len,
        });
    }
    Ok(len / T::SIZE)
}
