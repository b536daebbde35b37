use std::fmt::{Debug, Display, Formatter};
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use nom::bytes::complete::take;
use nom::combinator::{flat_map, map_res};
use nom::number::complete::be_u16;

use crate::error::ParseAddressError;
use crate::SansIo;

/// Longest host accepted when parsing, the DNS limit rounded up to a byte.
pub const MAX_HOST_LEN: usize = 255;

/// The `(host, port)` pair a peer listens on.
///
/// Two addresses are the same peer only if host and port match exactly: `localhost:5000`
/// and `127.0.0.1:5000` are different entries, nothing is resolved or normalized.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for PeerAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseAddressError::MissingPort(s.to_string()))?;
        if host.is_empty() {
            return Err(ParseAddressError::EmptyHost(s.to_string()));
        }
        if host.len() > MAX_HOST_LEN {
            return Err(ParseAddressError::HostTooLong(host.len()));
        }
        let port = port
            .parse()
            .map_err(|source| ParseAddressError::InvalidPort {
                port: port.to_string(),
                source,
            })?;
        Ok(Self::new(host, port))
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl ToSocketAddrs for PeerAddress {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        (self.host.as_str(), self.port).to_socket_addrs()
    }
}

impl SansIo for PeerAddress {
    fn decode(i: &[u8]) -> nom::IResult<&[u8], Self> {
        let (i, host) = map_res(flat_map(be_u16, take), std::str::from_utf8)(i)?;
        let (i, port) = be_u16(i)?;
        Ok((i, Self::new(host, port)))
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.host.len() + 2);
        // Hosts longer than a u16 can describe are not hosts, parsing caps them far below that.
        #[allow(clippy::cast_possible_truncation)]
        buf.extend((self.host.len() as u16).to_be_bytes());
        buf.extend(self.host.as_bytes());
        buf.extend(self.port.to_be_bytes());
        buf
    }
}

impl Display for PeerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// Manually implemented so log lines read `PeerAddress(127.0.0.1:5000)`.
impl Debug for PeerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerAddress({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let address: PeerAddress = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(address, PeerAddress::new("127.0.0.1", 5000));
    }

    #[test]
    fn parse_splits_on_last_colon() {
        let address: PeerAddress = "weird:host:80".parse().unwrap();
        assert_eq!(address.host(), "weird:host");
        assert_eq!(address.port(), 80);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "localhost".parse::<PeerAddress>(),
            Err(ParseAddressError::MissingPort(_))
        ));
        assert!(matches!(
            ":5000".parse::<PeerAddress>(),
            Err(ParseAddressError::EmptyHost(_))
        ));
        assert!(matches!(
            "localhost:99999".parse::<PeerAddress>(),
            Err(ParseAddressError::InvalidPort { .. })
        ));
        let long = format!("{}:1", "a".repeat(MAX_HOST_LEN + 1));
        assert!(matches!(
            long.parse::<PeerAddress>(),
            Err(ParseAddressError::HostTooLong(256))
        ));
    }

    #[test]
    fn no_normalization() {
        assert_ne!(
            PeerAddress::new("localhost", 5000),
            PeerAddress::new("127.0.0.1", 5000)
        );
    }

    #[test]
    fn roundtrip_with_extra_bytes() {
        let address = PeerAddress::new("example.org", 6881);

        let mut encoded = address.encode();
        encoded.extend([1, 2, 3]);
        let (remaining, decoded) = PeerAddress::decode(&encoded).unwrap();

        assert_eq!(address, decoded);
        assert_eq!(remaining, &[1, 2, 3]);
    }

    #[test]
    fn truncated_is_an_error_not_incomplete() {
        let mut encoded = PeerAddress::new("example.org", 6881).encode();
        encoded.pop();

        let err = PeerAddress::decode(&encoded).unwrap_err();
        assert!(matches!(err, nom::Err::Error(_)));
    }

    #[test]
    fn host_length_past_the_end_is_an_error() {
        let err = PeerAddress::decode(&[0x00, 0x10, b'a', b'b']).unwrap_err();
        assert!(matches!(err, nom::Err::Error(_)));
    }

    #[test]
    fn display() {
        let address = PeerAddress::new("10.0.0.1", 8080);
        assert_eq!(format!("{address}"), "10.0.0.1:8080");
        assert_eq!(format!("{address:?}"), "PeerAddress(10.0.0.1:8080)");
    }
}
