//! Packet framing: header (`id:u16, encrypted:u8`), the primitive
//! bytebuffer codec, and the encryption envelope. The packet-id registry
//! itself (the compile-time table mapping id -> concrete type) lives in
//! [`crate::packets`], which depends on this module rather than the other
//! way around.

pub mod buffer;
pub mod error;

pub use buffer::{ByteReader, ByteWriter};
pub use error::CodecError;

use crate::crypto::{CryptoError, SymmetricBox};

/// A packet type that knows its own wire id, whether it travels encrypted,
/// and how to encode/decode its body. Implementors are plain structs; there
/// is no macro magic, each type just states these facts directly (the
/// "compile-time packet table" called for instead of registration macros).
pub trait Packet: Sized {
    const ID: u16;
    const ENCRYPTED: bool;

    fn encode_body(&self, w: &mut ByteWriter);
    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("packet is marked encrypted but no session key is established yet")]
    NoSessionKey,
}

/// Encodes a concrete packet into a full wire frame: `id:u16, encrypted:u8,
/// body`. If `P::ENCRYPTED`, `key` must be `Some` and the body is sealed.
pub fn encode_frame<P: Packet>(packet: &P, key: Option<&SymmetricBox>) -> Result<Vec<u8>, FrameError> {
    let mut body_writer = ByteWriter::new();
    packet.encode_body(&mut body_writer);
    let body = body_writer.into_bytes();

    let mut out = ByteWriter::new();
    out.write_u16(P::ID);
    out.write_bool(P::ENCRYPTED);

    if P::ENCRYPTED {
        let key = key.ok_or(FrameError::NoSessionKey)?;
        let sealed = key.seal(&body)?;
        out.write_bytes_raw(&sealed);
    } else {
        out.write_bytes_raw(&body);
    }

    Ok(out.into_bytes())
}

/// Parses the header off a raw frame and returns `(id, body_bytes)`,
/// decrypting the body first if the header's `encrypted` flag is set.
/// Callers (the packet registry) still need to know which concrete type
/// `id` names in order to decode the body further.
pub fn open_frame<'a>(frame: &'a [u8], key: Option<&SymmetricBox>) -> Result<(u16, Vec<u8>), FrameError> {
    let mut r = ByteReader::new(frame);
    let id = r.read_u16()?;
    let encrypted = r.read_bool()?;
    let rest = r.read_bytes_raw(r.remaining())?;

    let body = if encrypted {
        let key = key.ok_or(FrameError::NoSessionKey)?;
        key.open(rest)?
    } else {
        rest.to_vec()
    };

    Ok((id, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping {
        client_time_ms: u64,
    }

    impl Packet for Ping {
        const ID: u16 = 10000;
        const ENCRYPTED: bool = false;

        fn encode_body(&self, w: &mut ByteWriter) {
            w.write_u64(self.client_time_ms);
        }

        fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
            Ok(Ping {
                client_time_ms: r.read_u64()?,
            })
        }
    }

    struct Voice {
        frame: Vec<u8>,
    }

    impl Packet for Voice {
        const ID: u16 = 11010;
        const ENCRYPTED: bool = true;

        fn encode_body(&self, w: &mut ByteWriter) {
            w.write_bytes(&self.frame);
        }

        fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
            Ok(Voice {
                frame: r.read_bytes()?,
            })
        }
    }

    #[test]
    fn plaintext_packet_roundtrips() {
        let packet = Ping { client_time_ms: 42 };
        let frame = encode_frame(&packet, None).unwrap();
        let (id, body) = open_frame(&frame, None).unwrap();
        assert_eq!(id, Ping::ID);
        let decoded = Ping::decode_body(&mut ByteReader::new(&body)).unwrap();
        assert_eq!(decoded.client_time_ms, 42);
    }

    #[test]
    fn encrypted_packet_requires_a_key() {
        let packet = Voice { frame: vec![1, 2, 3] };
        assert!(matches!(encode_frame(&packet, None), Err(FrameError::NoSessionKey)));
    }

    #[test]
    fn encrypted_packet_roundtrips_with_key() {
        let key = SymmetricBox::new([9u8; 32]);
        let packet = Voice {
            frame: vec![1, 2, 3, 4],
        };
        let frame = encode_frame(&packet, Some(&key)).unwrap();
        let (id, body) = open_frame(&frame, Some(&key)).unwrap();
        assert_eq!(id, Voice::ID);
        let decoded = Voice::decode_body(&mut ByteReader::new(&body)).unwrap();
        assert_eq!(decoded.frame, vec![1, 2, 3, 4]);
    }

    #[test]
    fn encrypted_packet_fails_to_open_with_wrong_key() {
        let key = SymmetricBox::new([9u8; 32]);
        let wrong_key = SymmetricBox::new([1u8; 32]);
        let packet = Voice { frame: vec![1, 2] };
        let frame = encode_frame(&packet, Some(&key)).unwrap();
        assert!(open_frame(&frame, Some(&wrong_key)).is_err());
    }
}
