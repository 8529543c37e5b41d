//! Conversion between raw octets and their hexadecimal representation.

/// The input was not a valid hexadecimal string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedHexInput {
    #[error("Hex string must have an even length, got {0}")]
    OddLength(usize),

    #[error("Invalid hex character {c:?} at index {index}")]
    InvalidCharacter { c: char, index: usize },
}

/// Renders the octets as uppercase hex digits, two per octet.
pub fn bytes_to_hex(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode_upper(bytes)
}

/// Parses a hex string into octets, most significant nibble first.
/// Digits are accepted in either case.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, MalformedHexInput> {
    ::hex::decode(s).map_err(|e| match e {
        ::hex::FromHexError::InvalidHexCharacter { c, index } => {
            MalformedHexInput::InvalidCharacter { c, index }
        }
        _ => MalformedHexInput::OddLength(s.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!("", bytes_to_hex([0u8; 0]));
        assert_eq!("00A40400", bytes_to_hex([0x00, 0xA4, 0x04, 0x00]));
        assert_eq!("F222222222", bytes_to_hex(vec![0xF2, 0x22, 0x22, 0x22, 0x22]));
    }

    #[test]
    fn test_hex_to_bytes() {
        assert_eq!(Ok(vec![]), hex_to_bytes(""));
        assert_eq!(Ok(vec![0x90, 0x00]), hex_to_bytes("9000"));
        assert_eq!(Ok(vec![0xAB, 0xCD]), hex_to_bytes("abCD"));
    }

    #[test]
    fn test_hex_to_bytes_odd_length() {
        assert_eq!(Err(MalformedHexInput::OddLength(1)), hex_to_bytes("A"));
        assert_eq!(Err(MalformedHexInput::OddLength(5)), hex_to_bytes("00A40"));
    }

    #[test]
    fn test_hex_to_bytes_invalid_character() {
        assert_eq!(
            Err(MalformedHexInput::InvalidCharacter { c: 'G', index: 1 }),
            hex_to_bytes("0G"),
        );
    }
}
