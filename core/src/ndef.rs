//! NDEF (NFC Data Exchange Format) records and messages.
//!
//! Only the pieces needed to carry text are here: the record framing of
//! [`NdefMessage`] and the well-known text record type ([`TextRecord`]).

mod record;
mod text;

pub use record::{NdefMessage, NdefRecord, Tnf};
pub use text::{decode_text_record, encode_text_record, TextRecord};

use crate::encoding::TextDecodeError;

/// Type of the well-known text record.
pub const RTD_TEXT: &[u8] = b"T";

/// Largest language code the 6-bit length field can describe.
pub const MAX_LANGUAGE_CODE_LEN: usize = 0x3F;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Expected a well-known record, got {0:?}")]
    WrongTypeNameFormat(Tnf),

    #[error("Expected a text record, got type {}", crate::hex::bytes_to_hex(.0))]
    WrongRecordType(Vec<u8>),

    #[error("Language code of {0} octets does not fit in 6 bits")]
    LanguageCodeTooLong(usize),

    #[error("Language code must be US-ASCII")]
    NonAsciiLanguageCode,

    #[error("Text payload needs at least {expected} octets, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("Failed to decode the text: {0}")]
    TextDecode(#[from] TextDecodeError),

    #[error("The {field} of {len} octets does not fit in a single-octet length")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("NDEF record is truncated at offset {offset}")]
    MalformedRecord { offset: usize },

    #[error("Chunked NDEF records are not supported")]
    ChunkedRecord,

    #[error("NDEF message has no records")]
    EmptyMessage,
}
