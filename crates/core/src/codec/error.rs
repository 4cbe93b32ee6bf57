#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer too short: needed {needed} bytes, had {available}")]
    ShortBuffer { needed: usize, available: usize },
    #[error("length prefix {0} exceeds the maximum allowed size")]
    LengthOverflow(u32),
    #[error("invalid boolean byte {0}")]
    BadBool(u8),
    #[error("invalid optional-presence byte {0}")]
    BadOptionTag(u8),
    #[error("string was not valid utf-8")]
    BadUtf8,
    #[error("unknown packet id {0}")]
    UnknownPacketId(u16),
    #[error("too many elements in a bounded collection: {found} > {max}")]
    Overflow { found: usize, max: usize },
    #[error("malformed MultiColor payload")]
    BadMultiColor,
}
