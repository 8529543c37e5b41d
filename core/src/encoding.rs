//! Text encodings carried on the wire.

const BOM_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_LE: [u8; 2] = [0xFF, 0xFE];

/// The octets were not valid in the declared encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {encoding} sequence: {reason}")]
pub struct TextDecodeError {
    pub encoding: TextEncoding,
    pub reason: String,
}

/// Encoding of a text, as selected by bit 7 of an NDEF text status byte.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16 => "UTF-16",
        })
    }
}

impl TextEncoding {
    /// Encodes the text. UTF-16 is written big-endian, without a byte order mark
    /// unless the text itself starts with a character that would be read as one.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16 => {
                let bom = match text.starts_with(['\u{FEFF}', '\u{FFFE}']) {
                    true => &BOM_BE[..],
                    _ => &[],
                };

                bom.iter()
                    .copied()
                    .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                    .collect()
            }
        }
    }

    /// Decodes the octets, failing on anything that is not a valid sequence.
    /// For UTF-16 a leading byte order mark picks the byte order and is dropped;
    /// big-endian is assumed without one.
    pub fn decode(self, bytes: &[u8]) -> Result<String, TextDecodeError> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| TextDecodeError {
                encoding: self,
                reason: e.utf8_error().to_string(),
            }),
            Self::Utf16 => decode_utf16(bytes),
        }
    }
}

fn decode_utf16(bytes: &[u8]) -> Result<String, TextDecodeError> {
    let error = |reason: String| TextDecodeError {
        encoding: TextEncoding::Utf16,
        reason,
    };

    if bytes.len() % 2 != 0 {
        return Err(error(format!("odd number of octets ({})", bytes.len())));
    }

    let (little_endian, body) = match bytes.get(..2) {
        Some(bom) if bom == BOM_BE => (false, &bytes[2..]),
        Some(bom) if bom == BOM_LE => (true, &bytes[2..]),
        _ => (false, bytes),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| match little_endian {
            true => u16::from_le_bytes([pair[0], pair[1]]),
            _ => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .collect();

    String::from_utf16(&units).map_err(|e| error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        assert_eq!(b"hi".to_vec(), TextEncoding::Utf8.encode("hi"));
        assert_eq!(Ok("hi".to_string()), TextEncoding::Utf8.decode(b"hi"));
        assert!(TextEncoding::Utf8.decode(&[0xC3, 0x28]).is_err());
    }

    #[test]
    fn test_utf16_is_big_endian() {
        assert_eq!(vec![0x00, 0x68, 0x00, 0x69], TextEncoding::Utf16.encode("hi"));
        assert_eq!(
            Ok("hi".to_string()),
            TextEncoding::Utf16.decode(&[0x00, 0x68, 0x00, 0x69]),
        );
    }

    #[test]
    fn test_utf16_byte_order_mark() {
        assert_eq!(
            Ok("hi".to_string()),
            TextEncoding::Utf16.decode(&[0xFF, 0xFE, 0x68, 0x00, 0x69, 0x00]),
        );
        assert_eq!(
            Ok("hi".to_string()),
            TextEncoding::Utf16.decode(&[0xFE, 0xFF, 0x00, 0x68, 0x00, 0x69]),
        );
    }

    #[test]
    fn test_utf16_keeps_leading_byte_order_marks() {
        assert_eq!(
            vec![0xFE, 0xFF, 0xFE, 0xFF, 0x00, 0x78],
            TextEncoding::Utf16.encode("\u{FEFF}x"),
        );

        for text in ["\u{FEFF}x", "\u{FFFE}x", "\u{FEFF}", "x\u{FFFE}"] {
            let bytes = TextEncoding::Utf16.encode(text);
            assert_eq!(Ok(text.to_string()), TextEncoding::Utf16.decode(&bytes));
        }
    }

    #[test]
    fn test_utf16_rejects_garbage() {
        // odd length
        assert!(TextEncoding::Utf16.decode(&[0x00, 0x68, 0x00]).is_err());
        // unpaired high surrogate
        assert!(TextEncoding::Utf16.decode(&[0xD8, 0x00, 0x00, 0x68]).is_err());
    }
}
