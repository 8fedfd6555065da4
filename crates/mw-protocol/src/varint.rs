//! VarInt and string helpers for the Server List Ping protocol
//!
//! A VarInt stores a 32-bit integer in 1-5 bytes, seven bits per byte,
//! least significant group first, with the high bit marking continuation.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;

/// Maximum encoded size of a VarInt
pub const MAX_VARINT_SIZE: usize = 5;

/// Append a VarInt
pub fn put_varint(dst: &mut BytesMut, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            dst.put_u8(value as u8);
            return;
        }
        dst.put_u8(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }
}

/// Number of bytes `value` occupies as a VarInt
pub fn varint_len(value: i32) -> usize {
    let mut value = value as u32;
    let mut len = 1;
    while value & !0x7F != 0 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Read a VarInt from the front of `src` without consuming it
///
/// Returns `Ok(None)` if more bytes are needed, otherwise the value and the
/// number of bytes it occupied.
pub fn peek_varint(src: &[u8]) -> Result<Option<(i32, usize)>, ProtocolError> {
    let mut result: u32 = 0;
    for (i, byte) in src.iter().take(MAX_VARINT_SIZE).enumerate() {
        result |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((result as i32, i + 1)));
        }
    }
    if src.len() >= MAX_VARINT_SIZE {
        return Err(ProtocolError::VarIntTooLong);
    }
    Ok(None)
}

/// Read and consume a VarInt from a complete packet body
pub fn get_varint<B: Buf>(src: &mut B) -> Result<i32, ProtocolError> {
    match peek_varint(src.chunk())? {
        Some((value, len)) => {
            src.advance(len);
            Ok(value)
        }
        None => Err(ProtocolError::Truncated {
            expected: src.remaining() + 1,
            actual: src.remaining(),
        }),
    }
}

/// Append a VarInt-length-prefixed UTF-8 string
pub fn put_string(dst: &mut BytesMut, value: &str) {
    put_varint(dst, value.len() as i32);
    dst.extend_from_slice(value.as_bytes());
}

/// Read a VarInt-length-prefixed UTF-8 string from a complete packet body
pub fn get_string<B: Buf>(src: &mut B) -> Result<String, ProtocolError> {
    let len = get_varint(src)?;
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len as i64));
    }
    let len = len as usize;
    if src.remaining() < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: src.remaining(),
        });
    }
    let bytes = src.copy_to_bytes(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        let cases: &[(i32, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (255, &[0xff, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (2097151, &[0xff, 0xff, 0x7f]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ];

        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            put_varint(&mut buf, *value);
            assert_eq!(&buf[..], *expected, "encoding {}", value);
            assert_eq!(varint_len(*value), expected.len());
            assert_eq!(peek_varint(expected).unwrap(), Some((*value, expected.len())));
        }
    }

    #[test]
    fn test_peek_incomplete() {
        assert_eq!(peek_varint(&[0x80]).unwrap(), None);
        assert_eq!(peek_varint(&[]).unwrap(), None);
    }

    #[test]
    fn test_varint_too_long() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            peek_varint(&bytes),
            Err(ProtocolError::VarIntTooLong)
        ));
    }

    #[test]
    fn test_string_truncated() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, 10);
        buf.extend_from_slice(b"abc");
        assert!(matches!(
            get_string(&mut buf),
            Err(ProtocolError::Truncated { expected: 10, actual: 3 })
        ));
    }
}
