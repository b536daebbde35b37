use nom::bytes::streaming::take;
use nom::combinator::{all_consuming, cut, map, verify};
use nom::error::{Error, ErrorKind};
use nom::number::streaming::be_u32;
use nom::{IResult, Offset};

pub use crate::messages::file_request::FileRequest;
pub use crate::messages::peer_list::PeerList;
use crate::error::DecodeError;
use crate::{PeerAddress, SansIo};

mod file_request;
mod peer_list;

/// Largest frame body (tag plus payload) accepted from a peer.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
/// Largest frame on the wire, body plus its length prefix.
pub const MAX_FRAME_SIZE: usize = LENGTH_PREFIX_SIZE + MAX_MESSAGE_SIZE;

const LENGTH_PREFIX_SIZE: usize = 4;
const PEER_LIST_TAG: u8 = 1;
const FILE_REQUEST_TAG: u8 = 2;

/// Every message a peer can send.
///
/// On the wire each message is a frame: a big-endian `u32` body length, then a one byte tag,
/// then the payload of that variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    PeerList(PeerList),
    FileRequest(FileRequest),
}

/// A message decoded from the start of a buffer, along with how much of the buffer it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub consumed_bytes: usize,
    pub message: Message,
}

impl Message {
    #[must_use]
    pub fn peer_list(peers: Vec<PeerAddress>) -> Self {
        Message::PeerList(PeerList::new(peers))
    }

    #[must_use]
    pub fn file_request(filename: impl Into<String>) -> Self {
        Message::FileRequest(FileRequest::new(filename))
    }

    /// Try to decode one message from a buffer that may hold only part of it.
    ///
    /// Returns `Ok(None)` when more bytes are needed, and an error as soon as the bytes
    /// cannot be the start of a valid frame.
    pub fn from_partial_buffer(buffer: &[u8]) -> Result<Option<DecodedMessage>, DecodeError> {
        match Self::decode(buffer) {
            Ok((remaining, message)) => Ok(Some(DecodedMessage {
                consumed_bytes: buffer.len() - remaining.len(),
                message,
            })),
            Err(nom::Err::Incomplete(_)) => Ok(None),
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(DecodeError::Malformed {
                offset: buffer.offset(e.input),
                kind: e.code,
            }),
        }
    }

    fn decode_body(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, tag) = nom::number::complete::u8(i)?;
        match tag {
            PEER_LIST_TAG => map(PeerList::decode, Message::PeerList)(i),
            FILE_REQUEST_TAG => map(FileRequest::decode, Message::FileRequest)(i),
            _ => Err(nom::Err::Failure(Error::new(i, ErrorKind::Tag))),
        }
    }
}

impl SansIo for Message {
    fn decode(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, length) = cut(verify(be_u32, |&length: &u32| {
            length > 0 && length as usize <= MAX_MESSAGE_SIZE
        }))(i)?;
        let (i, body) = take(length)(i)?;
        // The whole body is here, anything that doesn't parse from it exactly is garbage.
        let (_, message) = cut(all_consuming(Self::decode_body))(body).map_err(|e| match e {
            nom::Err::Incomplete(_) => nom::Err::Failure(Error::new(body, ErrorKind::Eof)),
            e => e,
        })?;
        Ok((i, message))
    }

    fn encode(&self) -> Vec<u8> {
        let (tag, payload) = match self {
            Message::PeerList(peer_list) => (PEER_LIST_TAG, peer_list.encode()),
            Message::FileRequest(file_request) => (FILE_REQUEST_TAG, file_request.encode()),
        };
        let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + 1 + payload.len());
        // Payloads that overflow a u32 are rejected by every receiver anyway.
        #[allow(clippy::cast_possible_truncation)]
        buf.extend(((1 + payload.len()) as u32).to_be_bytes());
        buf.push(tag);
        buf.extend(payload);
        buf
    }
}
