use nom::error::{Error, ErrorKind};
use nom::multi::count;
use nom::number::complete::be_u32;

use crate::{PeerAddress, SansIo};

// Two bytes of host length plus two bytes of port, with an empty host.
const MIN_ADDRESS_LEN: usize = 4;

/// The set of peers the sender knows about, in the sender's snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerList {
    pub peers: Vec<PeerAddress>,
}

impl PeerList {
    #[must_use]
    pub fn new(peers: Vec<PeerAddress>) -> Self {
        Self { peers }
    }
}

impl SansIo for PeerList {
    fn decode(i: &[u8]) -> nom::IResult<&[u8], Self> {
        let (i, peer_count) = be_u32(i)?;
        // Refuse counts the remaining bytes can't possibly hold before allocating for them.
        if peer_count as usize > i.len() / MIN_ADDRESS_LEN {
            return Err(nom::Err::Failure(Error::new(i, ErrorKind::TooLarge)));
        }
        let (i, peers) = count(PeerAddress::decode, peer_count as usize)(i)?;
        Ok((i, Self::new(peers)))
    }

    fn encode(&self) -> Vec<u8> {
        let encoded: Vec<Vec<u8>> = self.peers.iter().map(SansIo::encode).collect();
        let mut buf = Vec::with_capacity(4 + encoded.iter().map(Vec::len).sum::<usize>());
        // A list long enough to overflow this is far past the frame size limit anyway.
        #[allow(clippy::cast_possible_truncation)]
        buf.extend((self.peers.len() as u32).to_be_bytes());
        for address in encoded {
            buf.extend(address);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let list = PeerList::new(vec![
            PeerAddress::new("127.0.0.1", 5000),
            PeerAddress::new("example.org", 6881),
        ]);

        let encoded = list.encode();
        let (remaining, decoded) = PeerList::decode(&encoded).unwrap();

        assert_eq!(list, decoded);
        assert_eq!(remaining.len(), 0);
    }

    #[test]
    fn empty_list_is_just_a_count() {
        assert_eq!(PeerList::default().encode(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn count_larger_than_input() {
        let err = PeerList::decode(&[0, 0, 0, 200, 0, 0, 0, 1]).unwrap_err();
        assert!(matches!(err, nom::Err::Failure(_)));
    }
}
