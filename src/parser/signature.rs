use std::io::{Read, Write};

use crate::error::{Error, Result, Section};

/// Magic bytes opening every native file: `NATIVE\n\xFF\r\n\0`.
pub const SIGNATURE: [u8; 11] = [
    0x4E, 0x41, 0x54, 0x49, 0x56, 0x45, 0x0A, 0xFF, 0x0D, 0x0A, 0x00,
];

/// Reads the 11 signature bytes and reports whether they match [`SIGNATURE`].
///
/// A mismatch is not an error; callers decide how to treat foreign input.
///
/// # Errors
///
/// Returns [`Error::Truncated`] if fewer than 11 bytes are available.
pub fn read_signature<R: Read>(reader: &mut R) -> Result<bool> {
    let mut buf = [0u8; SIGNATURE.len()];
    reader
        .read_exact(&mut buf)
        .map_err(|err| Error::from_read(err, Section::Signature))?;
    Ok(buf == SIGNATURE)
}

/// Reads the signature and fails with [`Error::InvalidSignature`] on mismatch.
///
/// # Errors
///
/// Returns an error on a short read or a signature mismatch.
pub fn expect_signature<R: Read>(reader: &mut R) -> Result<()> {
    if read_signature(reader)? {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

pub(crate) fn write_signature<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(&SIGNATURE).map_err(Error::Sink)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn signature_spells_native() {
        assert_eq!(&SIGNATURE[..6], b"NATIVE");
    }

    #[test]
    fn matching_signature_is_accepted() {
        let mut cursor = Cursor::new(SIGNATURE.to_vec());
        assert!(read_signature(&mut cursor).unwrap());
        assert_eq!(cursor.position(), 11);
    }

    #[test]
    fn foreign_bytes_are_reported_as_mismatch() {
        let mut cursor = Cursor::new(b"NOT A FILE!".to_vec());
        assert!(!read_signature(&mut cursor).unwrap());

        let mut cursor = Cursor::new(b"NOT A FILE!".to_vec());
        assert!(matches!(
            expect_signature(&mut cursor),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn short_signature_is_truncation() {
        let mut cursor = Cursor::new(SIGNATURE[..5].to_vec());
        let err = read_signature(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                section: Section::Signature,
                ..
            }
        ));
    }
}
