use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::address::{Address, MacAddr};

/// The initial capacity of a [`ByteWriter`] created with [`ByteWriter::new`].
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Offset {offset} out of bounds for {size} bytes")]
    OffsetOutOfBounds { offset: usize, size: usize },
    #[error("Range {offset}+{length} out of bounds for {size} bytes")]
    RangeOutOfBounds { offset: usize, length: usize, size: usize },
    #[error("Bit-level operations are not supported")]
    BitsUnsupported,
}

/// An append-only, in-memory byte output stream.
///
/// All multi-byte scalars are written in network byte order (big-endian), most significant
/// byte first. Any peer decoding the stream must assume the same order.
///
/// The stream never seeks: [`size`](Self::size) and [`position`](Self::position) are always
/// equal, and the only mutation is growth at the end.
///
/// Bit-level writes and reads are rejected with [`Error::BitsUnsupported`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteWriter {
    bytes: BytesMut,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: BytesMut::with_capacity(capacity) }
    }

    /// Returns the number of bytes written so far.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the write position, which is always the end of the stream.
    #[inline]
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a view of everything written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the writer, returning the written bytes.
    #[inline]
    pub fn freeze(self) -> Bytes {
        self.bytes.freeze()
    }

    /// Returns the byte at `offset`.
    pub fn get_byte(&self, offset: usize) -> Result<u8, Error> {
        self.bytes
            .get(offset)
            .copied()
            .ok_or(Error::OffsetOutOfBounds { offset, size: self.size() })
    }

    /// Returns an independent copy of `length` bytes starting at `offset`. A `length` of `None`
    /// copies everything from `offset` to the end of the stream.
    pub fn copy_range(&self, offset: usize, length: Option<usize>) -> Result<Bytes, Error> {
        let range = checked_range(self.size(), offset, length)?;
        Ok(Bytes::copy_from_slice(&self.bytes[range]))
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.bytes.put_u8(byte);
    }

    /// Appends `count` copies of `byte`.
    #[inline]
    pub fn write_byte_repeated(&mut self, byte: u8, count: usize) {
        self.bytes.put_bytes(byte, count);
    }

    /// Appends `length` bytes of `src`, starting at `offset`. A `length` of `None` appends
    /// everything from `offset` to the end of `src`.
    ///
    /// Nothing is written if the range does not fit within `src`.
    pub fn write_bytes(
        &mut self,
        src: &[u8],
        offset: usize,
        length: Option<usize>,
    ) -> Result<(), Error> {
        let range = checked_range(src.len(), offset, length)?;
        self.bytes.extend_from_slice(&src[range]);
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_byte(value);
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.bytes.put_u16(value);
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.put_u32(value);
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.bytes.put_u64(value);
    }

    /// Writes the six octets of a hardware address, left to right.
    pub fn write_mac_address(&mut self, address: MacAddr) {
        for octet in address.octets() {
            self.write_byte(octet);
        }
    }

    /// Writes an IPv4 address as its 32-bit value, which is its natural octet order.
    pub fn write_ipv4_address(&mut self, address: Ipv4Addr) {
        self.write_u32(u32::from(address));
    }

    /// Writes an IPv6 address as four successive 32-bit words.
    pub fn write_ipv6_address(&mut self, address: Ipv6Addr) {
        let octets = address.octets();
        for word in octets.chunks_exact(4) {
            self.write_u32(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
        }
    }

    /// Writes the address bytes only, without any family tag.
    pub fn write_address(&mut self, address: &Address) {
        match address {
            Address::Ipv4(addr) => self.write_ipv4_address(*addr),
            Address::Ipv6(addr) => self.write_ipv6_address(*addr),
            Address::Mac(addr) => self.write_mac_address(*addr),
        }
    }

    pub fn write_bit(&mut self, _bit: bool) -> Result<(), Error> {
        Err(Error::BitsUnsupported)
    }

    pub fn write_bit_repeated(&mut self, _bit: bool, _count: usize) -> Result<(), Error> {
        Err(Error::BitsUnsupported)
    }

    pub fn write_bits(
        &mut self,
        _bits: &[bool],
        _offset: usize,
        _length: Option<usize>,
    ) -> Result<(), Error> {
        Err(Error::BitsUnsupported)
    }

    pub fn get_bit(&self, _offset: usize) -> Result<bool, Error> {
        Err(Error::BitsUnsupported)
    }
}

/// Resolves `offset` and an optional `length` against a buffer of `size` bytes.
fn checked_range(
    size: usize,
    offset: usize,
    length: Option<usize>,
) -> Result<std::ops::Range<usize>, Error> {
    if offset > size {
        return Err(Error::OffsetOutOfBounds { offset, size });
    }

    let length = length.unwrap_or(size - offset);
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(Error::RangeOutOfBounds { offset, length, size }),
    }
}
