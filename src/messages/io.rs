use super::Error;

use anyhow::{anyhow, Result};
use bytes::Buf;

/// The maximum length any length field may declare. Anything larger than this will be rejected.
/// Sized so a full-screen Raw rectangle at 32 bits per pixel still fits.
pub(crate) const MAX_MESSAGE_LENGTH: usize = 64 * 1024 * 1024;

pub(crate) fn check_message_length<T>(length: T) -> Result<(), Error>
where
    T: Into<usize>,
{
    let message_length = length.into();
    if message_length > MAX_MESSAGE_LENGTH {
        return Err(Error::Other(anyhow!(
            "message size is larger than the allowed limit: {}",
            message_length,
        )));
    }
    Ok(())
}

pub(crate) fn get_u8(src: &mut std::io::Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }

    Ok(src.get_u8())
}

pub(crate) fn get_u16(src: &mut std::io::Cursor<&[u8]>) -> Result<u16, Error> {
    if src.remaining() < 2 {
        return Err(Error::Incomplete);
    }

    Ok(src.get_u16())
}

pub(crate) fn get_u32(src: &mut std::io::Cursor<&[u8]>) -> Result<u32, Error> {
    if src.remaining() < 4 {
        return Err(Error::Incomplete);
    }

    Ok(src.get_u32())
}

pub(crate) fn get_i32(src: &mut std::io::Cursor<&[u8]>) -> Result<i32, Error> {
    if src.remaining() < 4 {
        return Err(Error::Incomplete);
    }

    Ok(src.get_i32())
}

pub(crate) fn skip(src: &mut std::io::Cursor<&[u8]>, n: usize) -> Result<(), Error> {
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }

    src.advance(n);
    Ok(())
}

/// Consumes the next `n` bytes and returns them as an owned buffer.
pub(crate) fn read_bytes(src: &mut std::io::Cursor<&[u8]>, n: usize) -> Result<Vec<u8>, Error> {
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }

    let bytes = src.chunk()[0..n].to_vec();
    src.advance(n);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_reads() {
        let data = vec![0x12, 0x34];
        let mut cur = std::io::Cursor::new(&data[..]);
        assert!(matches!(get_u32(&mut cur), Err(Error::Incomplete)));
        // A failed read must not consume anything.
        assert_eq!(get_u16(&mut cur).unwrap(), 0x1234);
    }

    #[test]
    fn test_read_bytes_consumes() -> Result<(), Error> {
        let data = vec![1, 2, 3, 4];
        let mut cur = std::io::Cursor::new(&data[..]);
        assert_eq!(read_bytes(&mut cur, 3)?, vec![1, 2, 3]);
        assert_eq!(get_u8(&mut cur)?, 4);
        assert!(matches!(read_bytes(&mut cur, 1), Err(Error::Incomplete)));
        Ok(())
    }

    #[test]
    fn test_check_message_length() {
        assert!(check_message_length(1024usize).is_ok());
        assert!(check_message_length(MAX_MESSAGE_LENGTH + 1).is_err());
    }
}
