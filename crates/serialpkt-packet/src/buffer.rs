//! Fixed-capacity payload buffers and typed field access.
//!
//! Writes past [`MAX_PAYLOAD`] are clamped, not rejected: a field that does
//! not fit is truncated at the end of the buffer and the returned offset
//! stops at the capacity. Callers that care can compare the returned offset
//! with `offset + size`.

use crate::codec::MAX_PAYLOAD;

/// A payload-sized byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct PayloadBuffer {
    bytes: [u8; MAX_PAYLOAD],
}

impl PayloadBuffer {
    /// A zeroed buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0u8; MAX_PAYLOAD],
        }
    }

    /// Buffer capacity (always [`MAX_PAYLOAD`]).
    pub const fn capacity(&self) -> usize {
        MAX_PAYLOAD
    }

    /// Zero every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Copy `value` into the buffer at `offset`, clamped to capacity.
    ///
    /// Returns the offset directly after the written region.
    pub fn write_bytes(&mut self, value: &[u8], offset: usize) -> usize {
        let start = offset.min(MAX_PAYLOAD);
        let end = offset.saturating_add(value.len()).min(MAX_PAYLOAD);
        self.bytes[start..end].copy_from_slice(&value[..end - start]);
        end
    }

    /// Borrow `size` bytes starting at `offset`, clamped to capacity.
    pub fn read_bytes(&self, offset: usize, size: usize) -> &[u8] {
        let start = offset.min(MAX_PAYLOAD);
        let end = offset.saturating_add(size).min(MAX_PAYLOAD);
        &self.bytes[start..end]
    }

    /// Write a typed field at `offset`. See [`write_bytes`](Self::write_bytes).
    pub fn write_field<T: Field>(&mut self, value: &T, offset: usize) -> usize {
        let mut encoded = vec![0u8; T::SIZE];
        value.encode(&mut encoded);
        self.write_bytes(&encoded, offset)
    }

    /// Read a typed field at `offset`.
    ///
    /// Returns the value and the offset after it, or `None` if the field would
    /// extend past the end of the buffer.
    pub fn read_field<T: Field>(&self, offset: usize) -> Option<(T, usize)> {
        let end = offset.checked_add(T::SIZE)?;
        if end > MAX_PAYLOAD {
            return None;
        }
        Some((T::decode(&self.bytes[offset..end]), end))
    }
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PayloadBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        f.debug_struct("PayloadBuffer")
            .field("capacity", &MAX_PAYLOAD)
            .field("nonzero_prefix", &used)
            .finish()
    }
}

/// A fixed-size value that can be copied into and out of a payload.
///
/// Multi-byte numbers use little-endian representation.
pub trait Field: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Write exactly `SIZE` bytes into `out`.
    fn encode(&self, out: &mut [u8]);

    /// Read a value from exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_field_for_numbers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_field_for_numbers!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Field for bool {
    const SIZE: usize = 1;

    fn encode(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl<const N: usize> Field for [u8; N] {
    const SIZE: usize = N;

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(bytes);
        raw
    }
}
