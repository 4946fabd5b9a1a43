use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid address: {0}")]
pub struct ParseAddressError(String);

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}-{b:02X}-{c:02X}-{d:02X}-{e:02X}-{g:02X}")
    }
}

impl FromStr for MacAddr {
    type Err = ParseAddressError;

    /// Parses six hex octets separated by `:` or `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseAddressError(s.to_string());

        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(octets))
    }
}

/// The family tag written in front of an address on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressFamily {
    Mac = 0,
    Ipv4 = 4,
    Ipv6 = 6,
}

impl AddressFamily {
    /// Returns the number of address bytes that follow the family tag.
    pub const fn address_len(self) -> usize {
        match self {
            Self::Mac => 6,
            Self::Ipv4 => 4,
            Self::Ipv6 => 16,
        }
    }
}

impl TryFrom<u8> for AddressFamily {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Mac),
            4 => Ok(Self::Ipv4),
            6 => Ok(Self::Ipv6),
            _ => Err(value),
        }
    }
}

/// A resolved destination (or source) address of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Mac(MacAddr),
}

impl Address {
    #[inline]
    pub const fn family(&self) -> AddressFamily {
        match self {
            Self::Ipv4(_) => AddressFamily::Ipv4,
            Self::Ipv6(_) => AddressFamily::Ipv6,
            Self::Mac(_) => AddressFamily::Mac,
        }
    }

    /// Builds an address from exactly [`AddressFamily::address_len`] bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length for `family`.
    pub fn from_family_bytes(family: AddressFamily, bytes: &[u8]) -> Option<Self> {
        match family {
            AddressFamily::Ipv4 => {
                let octets: [u8; 4] = bytes.try_into().ok()?;
                Some(Self::Ipv4(Ipv4Addr::from(octets)))
            }
            AddressFamily::Ipv6 => {
                let octets: [u8; 16] = bytes.try_into().ok()?;
                Some(Self::Ipv6(Ipv6Addr::from(octets)))
            }
            AddressFamily::Mac => {
                let octets: [u8; 6] = bytes.try_into().ok()?;
                Some(Self::Mac(MacAddr::new(octets)))
            }
        }
    }
}

impl From<IpAddr> for Address {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::Ipv4(v4),
            IpAddr::V6(v6) => Self::Ipv6(v6),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self::Ipv4(addr)
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Self::Ipv6(addr)
    }
}

impl From<MacAddr> for Address {
    fn from(addr: MacAddr) -> Self {
        Self::Mac(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(addr) => addr.fmt(f),
            Self::Ipv6(addr) => addr.fmt(f),
            Self::Mac(addr) => addr.fmt(f),
        }
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    /// Parses a literal IPv4, IPv6 or hardware address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(ip.into());
        }

        s.parse::<MacAddr>().map(Self::Mac).map_err(|_| ParseAddressError(s.to_string()))
    }
}
