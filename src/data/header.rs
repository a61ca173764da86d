/// Shared pieces of the vendor header readers.

use std::io::{self, Read, Seek, SeekFrom};

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a {format} file: {reason}")]
    BadMagic { format: &'static str, reason: String },

    #[error("corrupt header: {0}")]
    Corrupt(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("unsupported variant: {0}")]
    Unsupported(String),
}

/// Upper bound for any metadata block we are willing to load into memory.
pub const MAX_METADATA_BYTES: u64 = 256 * 1024 * 1024;

/// Read `len` bytes at absolute `offset`.
pub fn read_block<R: Read + Seek>(reader: &mut R, offset: u64, len: u64) -> Result<Vec<u8>, HeaderError> {
    if len > MAX_METADATA_BYTES {
        return Err(HeaderError::Corrupt(format!(
            "metadata block of {} bytes at offset {} exceeds limit",
            len, offset
        )));
    }
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Error for a failed magic read. Running out of bytes means the file is not
/// `format`; any other I/O failure is passed through unchanged.
pub fn magic_read_error(format: &'static str, reason: &str, err: io::Error) -> HeaderError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        HeaderError::BadMagic {
            format,
            reason: reason.to_string(),
        }
    } else {
        HeaderError::Io(err)
    }
}

/// Decode a fixed-width ASCII identifier padded with NULs.
pub fn ascii_id(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Decode UTF-16LE bytes, stopping at the first NUL code unit.
pub fn utf16le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_id_stops_at_nul() {
        assert_eq!(ascii_id(b"ZISRAWFILE\0\0\0\0\0\0"), "ZISRAWFILE");
    }

    #[test]
    fn test_utf16le() {
        let bytes: Vec<u8> = "Leica\0junk"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(utf16le_to_string(&bytes), "Leica");
    }

    #[test]
    fn test_magic_read_error_only_for_short_files() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            magic_read_error("CZI", "too short", eof),
            HeaderError::BadMagic { format: "CZI", .. }
        ));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = magic_read_error("CZI", "too short", denied);
        assert!(matches!(err, HeaderError::Io(_)));
        assert!(err.to_string().contains("access denied"), "{}", err);
    }

    #[test]
    fn test_read_block_rejects_huge_lengths() {
        let mut cursor = std::io::Cursor::new(vec![0u8; 16]);
        assert!(matches!(
            read_block(&mut cursor, 0, MAX_METADATA_BYTES + 1),
            Err(HeaderError::Corrupt(_))
        ));
        assert_eq!(read_block(&mut cursor, 4, 4).unwrap().len(), 4);
    }
}
