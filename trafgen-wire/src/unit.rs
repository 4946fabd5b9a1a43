//! The on-wire representation of generated traffic units.
//!
//! ```text
//! u8   wire id (0x07)
//! u8   protocol id
//! u32  sequence number
//! u8   destination family, followed by the destination address
//! u8   source family (0xFF if absent), followed by the source address
//! u32  payload length
//! ..   payload
//! ```
//!
//! All scalars are big-endian, written through [`ByteWriter`].

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use trafgen_common::constants::MiB;

use crate::{
    address::{Address, AddressFamily},
    writer::{self, ByteWriter},
    ProtocolId,
};

/// The ID of the unit codec on the wire.
const WIRE_ID: u8 = 0x07;

/// Family tag marking an absent source address.
const NO_SOURCE: u8 = 0xFF;

/// Fixed part of the header: wire id, protocol, sequence, two family tags, payload length.
const FIXED_HEADER_LEN: usize = 1 + 1 + 4 + 1 + 1 + 4;

/// Units with a larger payload are rejected by the decoder.
pub const MAX_PAYLOAD_LEN: usize = 64 * MiB as usize;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Invalid wire ID: {0}")]
    WireId(u8),
    #[error("Invalid address family: {0}")]
    AddressFamily(u8),
    #[error("Payload of {0} bytes exceeds the maximum unit size")]
    PayloadTooLarge(usize),
    #[error("Encoding error: {0}")]
    Encode(#[from] writer::Error),
}

/// One discrete piece of generated traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Human-readable name, `appData-<seq>`. Not carried on the wire.
    name: String,
    seq: u32,
    protocol: ProtocolId,
    destination: Address,
    /// Filled in by a lower layer, never by the generator itself.
    source: Option<Address>,
    payload: Bytes,
}

impl Unit {
    /// Creates a unit with a zero-filled payload of `payload_len` bytes and no source address.
    pub fn new(seq: u32, protocol: ProtocolId, destination: Address, payload_len: usize) -> Self {
        let mut payload = ByteWriter::with_capacity(payload_len);
        payload.write_byte_repeated(0, payload_len);

        Self {
            name: unit_name(seq),
            seq,
            protocol,
            destination,
            source: None,
            payload: payload.freeze(),
        }
    }

    /// Sets the source address. Used by layers below the generator.
    pub fn with_source(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn seq(&self) -> u32 {
        self.seq
    }

    #[inline]
    pub fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    #[inline]
    pub fn destination(&self) -> Address {
        self.destination
    }

    #[inline]
    pub fn source(&self) -> Option<Address> {
        self.source
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Returns the encoded size of the unit in bytes.
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN +
            self.destination.family().address_len() +
            self.source.map_or(0, |source| source.family().address_len()) +
            self.payload.len()
    }

    /// Appends the wire representation of this unit to `writer`.
    pub fn encode(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|_| Error::PayloadTooLarge(self.payload.len()))?;

        writer.write_u8(WIRE_ID);
        writer.write_u8(self.protocol.0);
        writer.write_u32(self.seq);

        writer.write_u8(self.destination.family() as u8);
        writer.write_address(&self.destination);

        match self.source {
            Some(source) => {
                writer.write_u8(source.family() as u8);
                writer.write_address(&source);
            }
            None => writer.write_u8(NO_SOURCE),
        }

        writer.write_u32(payload_len);
        writer.write_bytes(&self.payload, 0, None)?;

        Ok(())
    }

    /// Encodes the unit into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut writer = ByteWriter::with_capacity(self.encoded_len());
        self.encode(&mut writer)?;
        Ok(writer.freeze())
    }
}

fn unit_name(seq: u32) -> String {
    format!("appData-{seq}")
}

/// Decoded header fields, kept while waiting for the payload to arrive.
#[derive(Debug, Clone)]
struct Header {
    seq: u32,
    protocol: ProtocolId,
    destination: Address,
    source: Option<Address>,
    payload_len: usize,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Header,
    Payload(Header),
}

/// Frames [`Unit`]s on a byte stream.
#[derive(Debug, Default)]
pub struct Codec {
    /// The current state of the decoder.
    state: State,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reads a family tag and address starting at `cursor`. Returns `Ok(None)` if `src` is too short.
fn peek_address(src: &[u8], cursor: &mut usize) -> Result<Option<Option<Address>>, Error> {
    let Some(&tag) = src.get(*cursor) else {
        return Ok(None);
    };

    if tag == NO_SOURCE {
        *cursor += 1;
        return Ok(Some(None));
    }

    let family = AddressFamily::try_from(tag).map_err(Error::AddressFamily)?;
    let start = *cursor + 1;
    let end = start + family.address_len();
    if src.len() < end {
        return Ok(None);
    }

    let address =
        Address::from_family_bytes(family, &src[start..end]).ok_or(Error::AddressFamily(tag))?;
    *cursor = end;
    Ok(Some(Some(address)))
}

impl Decoder for Codec {
    type Item = Unit;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Taking the state leaves `State::Header` behind, which is what every early return
            // from the header branch wants.
            match std::mem::take(&mut self.state) {
                State::Header => {
                    // Keeps track of the cursor position in the buffer
                    let mut cursor = 0;

                    if src.is_empty() {
                        return Ok(None);
                    }

                    // Wire ID check (without advancing the buffer)
                    let wire_id = src[cursor];
                    cursor += 1;
                    if wire_id != WIRE_ID {
                        return Err(Error::WireId(wire_id));
                    }

                    if src.len() < cursor + 1 + 4 {
                        return Ok(None);
                    }

                    let protocol = ProtocolId(src[cursor]);
                    cursor += 1;
                    let seq = u32::from_be_bytes([
                        src[cursor],
                        src[cursor + 1],
                        src[cursor + 2],
                        src[cursor + 3],
                    ]);
                    cursor += 4;

                    let Some(destination) = peek_address(src, &mut cursor)? else {
                        return Ok(None);
                    };
                    // Only the source may be absent.
                    let Some(destination) = destination else {
                        return Err(Error::AddressFamily(NO_SOURCE));
                    };

                    let Some(source) = peek_address(src, &mut cursor)? else {
                        return Ok(None);
                    };

                    if src.len() < cursor + 4 {
                        return Ok(None);
                    }

                    let payload_len = u32::from_be_bytes([
                        src[cursor],
                        src[cursor + 1],
                        src[cursor + 2],
                        src[cursor + 3],
                    ]) as usize;
                    cursor += 4;

                    if payload_len > MAX_PAYLOAD_LEN {
                        return Err(Error::PayloadTooLarge(payload_len));
                    }

                    src.advance(cursor);

                    self.state = State::Payload(Header {
                        seq,
                        protocol,
                        destination,
                        source,
                        payload_len,
                    });
                }
                State::Payload(header) => {
                    if src.len() < header.payload_len {
                        src.reserve(header.payload_len - src.len());
                        self.state = State::Payload(header);
                        return Ok(None);
                    }

                    let payload = src.split_to(header.payload_len).freeze();

                    return Ok(Some(Unit {
                        name: unit_name(header.seq),
                        seq: header.seq,
                        protocol: header.protocol,
                        destination: header.destination,
                        source: header.source,
                        payload,
                    }));
                }
            }
        }
    }
}

impl Encoder<Unit> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Unit, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // The writer owns its buffer for the duration of one unit.
        let encoded = item.to_bytes()?;
        tracing::trace!(seq = item.seq(), len = encoded.len(), "encoded unit");

        dst.extend_from_slice(&encoded);
        Ok(())
    }
}
