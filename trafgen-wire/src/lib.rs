pub mod address;
pub mod unit;
pub mod writer;

pub use address::{Address, AddressFamily, MacAddr, ParseAddressError};
pub use unit::Unit;
pub use writer::{ByteWriter, Error};

/// Identifies the protocol a unit is tagged with, used by the receiving stack to dispatch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolId(pub u8);

impl ProtocolId {
    /// IANA protocol number reserved for experimentation and testing.
    pub const EXPERIMENTAL: Self = Self(253);
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
