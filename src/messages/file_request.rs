use nom::combinator::{map_res, rest};

use crate::SansIo;

/// Asks a peer to send back the contents of `filename`.
///
/// The filename is the whole rest of the frame body, so it needs no length of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRequest {
    pub filename: String,
}

impl FileRequest {
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

impl SansIo for FileRequest {
    fn decode(i: &[u8]) -> nom::IResult<&[u8], Self> {
        let (i, filename) = map_res(rest, std::str::from_utf8)(i)?;
        Ok((i, Self::new(filename)))
    }

    fn encode(&self) -> Vec<u8> {
        self.filename.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_everything() {
        let (remaining, decoded) = FileRequest::decode(b"dir/sample.txt").unwrap();

        assert_eq!(decoded, FileRequest::new("dir/sample.txt"));
        assert_eq!(remaining.len(), 0);
    }

    #[test]
    fn invalid_utf8() {
        assert!(FileRequest::decode(&[0xff, 0xfe]).is_err());
    }
}
