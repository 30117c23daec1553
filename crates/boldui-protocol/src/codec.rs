//! Wire framing: magic handshake + length-prefixed bincode frames. Grounded
//! on `boldui_python/boldui/boldui_app.py`'s `main_loop` (magic read,
//! `R2AHello` decode, `<I` length prefix) and `boldui_protocol_bindings`'s
//! bincode-based message types.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::CodecError;

/// Magic preambles, one per channel direction.
pub const R2A_MAGIC: &[u8; 7] = b"BOLDUI\x00";
pub const A2R_MAGIC: &[u8; 7] = b"BOLDUI\x01";
pub const R2EA_MAGIC: &[u8; 7] = b"BOLDUI\x02";
pub const EA2R_MAGIC: &[u8; 7] = b"BOLDUI\x03";

/// The protocol version this crate implements.
pub const LATEST_MAJOR_VER: u16 = 0;
pub const LATEST_MINOR_VER: u16 = 1;

/// Renderer → application hello, sent first on every connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R2AHello {
    pub min_major: u16,
    pub min_minor: u16,
    pub max_major: u16,
    /// Trailing bytes reserved for forward-compatible extension; must be
    /// read and ignored.
    pub extra_len: u32,
}

/// Application → renderer reply to [`R2AHello`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2RHelloResponse {
    pub proto_major: u16,
    pub proto_minor: u16,
    pub extra_len: u32,
    pub error: Option<crate::Error>,
}

/// Negotiates a protocol version: succeeds iff `latest_major` is within
/// `[min_major, max_major]`, and when `latest_major == min_major`,
/// `latest_minor >= min_minor`.
pub fn negotiate(hello: &R2AHello, latest_major: u16, latest_minor: u16) -> Result<(u16, u16), CodecError> {
    if latest_major < hello.min_major || latest_major > hello.max_major {
        tracing::warn!(
            min_major = hello.min_major,
            max_major = hello.max_major,
            have_major = latest_major,
            "version negotiation failed: major version out of range"
        );
        return Err(CodecError::VersionMismatch {
            min_major: hello.min_major,
            max_major: hello.max_major,
            have_major: latest_major,
        });
    }
    if latest_major == hello.min_major && latest_minor < hello.min_minor {
        tracing::warn!(
            min_minor = hello.min_minor,
            have_minor = latest_minor,
            "version negotiation failed: minor version below floor"
        );
        return Err(CodecError::VersionMismatch {
            min_major: hello.min_major,
            max_major: hello.max_major,
            have_major: latest_major,
        });
    }
    tracing::debug!(major = latest_major, minor = latest_minor, "negotiated protocol version");
    Ok((latest_major, latest_minor))
}

/// Reads exactly `magic.len()` bytes and checks them against `magic`.
pub fn read_magic(r: &mut impl Read, magic: &[u8; 7]) -> Result<(), CodecError> {
    let mut buf = vec![0u8; magic.len()];
    r.read_exact(&mut buf).map_err(CodecError::Io)?;
    if buf != magic {
        tracing::error!("bad magic preamble");
        return Err(CodecError::BadMagic { expected: magic.to_vec(), got: buf });
    }
    Ok(())
}

/// Reads `extra_len` bytes and discards them, per the forward-compatibility
/// contract on every hello/response.
pub fn skip_extra(r: &mut impl Read, extra_len: u32) -> Result<(), CodecError> {
    if extra_len == 0 {
        return Ok(());
    }
    let mut buf = vec![0u8; extra_len as usize];
    r.read_exact(&mut buf).map_err(CodecError::Io)?;
    Ok(())
}

/// Reads one `u32-LE length` + bincode-payload frame. Returns `Ok(None)` on
/// a clean EOF before any byte of the length prefix is read.
pub fn read_frame<T: for<'de> Deserialize<'de>>(r: &mut impl Read) -> Result<Option<T>, CodecError> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(CodecError::Io(e)),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).map_err(CodecError::Io)?;
    let value = bincode::deserialize(&payload).map_err(|e| {
        tracing::error!(%e, "failed to decode frame");
        CodecError::Decode(e.to_string())
    })?;
    Ok(Some(value))
}

/// Writes one `u32-LE length` + bincode-payload frame, looping on partial
/// writes at every write suspension point.
pub fn write_frame<T: Serialize>(w: &mut impl Write, value: &T) -> Result<(), CodecError> {
    let payload = bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge(payload.len()))?;
    write_all_looping(w, &len.to_le_bytes())?;
    write_all_looping(w, &payload)?;
    Ok(())
}

fn write_all_looping(w: &mut impl Write, mut buf: &[u8]) -> Result<(), CodecError> {
    while !buf.is_empty() {
        let n = w.write(buf).map_err(CodecError::Io)?;
        if n == 0 {
            return Err(CodecError::Io(io::Error::new(io::ErrorKind::WriteZero, "write returned 0")));
        }
        buf = &buf[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrips() {
        let mut buf = Vec::new();
        let msg = crate::R2AMessage::Open(crate::R2AOpen { path: "/".into() });
        write_frame(&mut buf, &msg).unwrap();
        let mut cursor = &buf[..];
        let decoded: Option<crate::R2AMessage> = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, Some(msg));
    }

    #[test]
    fn clean_eof_before_frame_is_not_an_error() {
        let mut cursor: &[u8] = &[];
        let decoded: Option<crate::R2AMessage> = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn truncated_length_prefix_is_an_io_error() {
        let mut cursor: &[u8] = &[1, 2];
        let result: Result<Option<crate::R2AMessage>, _> = read_frame(&mut cursor);
        assert!(result.is_err());
    }

    #[test]
    fn version_negotiation_accepts_in_range() {
        let hello = R2AHello { min_major: 0, min_minor: 1, max_major: 0, extra_len: 0 };
        assert_eq!(negotiate(&hello, 0, 2), Ok((0, 2)));
    }

    #[test]
    fn version_negotiation_rejects_minor_below_min() {
        let hello = R2AHello { min_major: 0, min_minor: 5, max_major: 0, extra_len: 0 };
        assert!(negotiate(&hello, 0, 2).is_err());
    }

    #[test]
    fn version_negotiation_rejects_major_out_of_range() {
        let hello = R2AHello { min_major: 1, min_minor: 0, max_major: 1, extra_len: 0 };
        assert!(negotiate(&hello, 0, 9).is_err());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut cursor: &[u8] = b"NOTBOLD";
        assert!(read_magic(&mut cursor, R2A_MAGIC).is_err());
    }

    #[test]
    fn extra_bytes_are_skipped() {
        let mut cursor: &[u8] = &[1, 2, 3, 4, 5];
        skip_extra(&mut cursor, 3).unwrap();
        assert_eq!(cursor, &[4, 5]);
    }
}
