use nom::IResult;

/// The [SansIo] trait is used to encode and decode wire values without any knowledge of the
/// underlying transport. Sockets, files and in-memory buffers all go through the same code,
/// which keeps the codec testable without opening a single connection.
pub trait SansIo: Sized {
    /// Decode a value from the start of a buffer.
    ///
    /// For framed values ([crate::Message]) the buffer might only contain a part of the frame,
    /// in which case `Err(nom::Err::Incomplete(_))` signals that more data is needed.
    /// Values that only ever appear inside a frame are parsed as complete input, so running
    /// out of bytes there is a plain error.
    ///
    /// Returns `Err(nom::Err::Error(_))` or `Err(nom::Err::Failure(_))` if the format was invalid.
    fn decode(i: &[u8]) -> IResult<&[u8], Self>;

    /// Encode a value into a buffer. This is infallible.
    ///
    /// The API assumes the value is small enough that fitting it in memory is not a problem.
    fn encode(&self) -> Vec<u8>;
}
