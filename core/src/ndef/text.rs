//! Well-known text record: `status | language code | text`.
//!
//! Bit 7 of the status octet selects the encoding (0: UTF-8, 1: UTF-16) and bits 0-5
//! hold the length of the language code. Bit 6 is reserved; it is written as zero and
//! ignored when reading.

use crate::encoding::TextEncoding;
use crate::ndef::{Error, NdefRecord, Tnf, MAX_LANGUAGE_CODE_LEN, RTD_TEXT};

const STATUS_UTF16: u8 = 0x80;
const STATUS_LANGUAGE_LEN: u8 = 0x3F;

/// Text read from a well-known text record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TextRecord {
    pub encoding: TextEncoding,
    pub language: String,
    pub text: String,
}

/// Encodes the payload of a text record.
/// The text is written in UTF-8 unless `force_utf16` is set.
pub fn encode_text_record(
    text: &str,
    language_code: &str,
    force_utf16: bool,
) -> Result<Vec<u8>, Error> {
    if !language_code.is_ascii() {
        return Err(Error::NonAsciiLanguageCode);
    }

    let language = language_code.as_bytes();
    if language.len() > MAX_LANGUAGE_CODE_LEN {
        return Err(Error::LanguageCodeTooLong(language.len()));
    }

    let encoding = match force_utf16 {
        true => TextEncoding::Utf16,
        _ => TextEncoding::Utf8,
    };
    let encoding_bit = match encoding {
        TextEncoding::Utf16 => STATUS_UTF16,
        TextEncoding::Utf8 => 0,
    };
    let status = encoding_bit | language.len() as u8;

    let mut payload = Vec::with_capacity(1 + language.len() + text.len() * 2);
    payload.push(status);
    payload.extend_from_slice(language);
    payload.extend(encoding.encode(text));

    Ok(payload)
}

/// Decodes a well-known text record.
pub fn decode_text_record(record: &NdefRecord) -> Result<TextRecord, Error> {
    if record.tnf() != Tnf::WellKnown {
        return Err(Error::WrongTypeNameFormat(record.tnf()));
    }

    if record.record_type() != RTD_TEXT {
        return Err(Error::WrongRecordType(record.record_type().to_vec()));
    }

    let payload = record.payload();
    let status = *payload.first().ok_or(Error::TruncatedPayload {
        expected: 1,
        actual: 0,
    })?;

    let encoding = match status & STATUS_UTF16 != 0 {
        true => TextEncoding::Utf16,
        _ => TextEncoding::Utf8,
    };
    let language_len = (status & STATUS_LANGUAGE_LEN) as usize;

    if payload.len() < 1 + language_len {
        return Err(Error::TruncatedPayload {
            expected: 1 + language_len,
            actual: payload.len(),
        });
    }

    let language = &payload[1..1 + language_len];
    if !language.is_ascii() {
        return Err(Error::NonAsciiLanguageCode);
    }

    Ok(TextRecord {
        encoding,
        language: String::from_utf8_lossy(language).into_owned(),
        text: encoding.decode(&payload[1 + language_len..])?,
    })
}

impl TryFrom<&NdefRecord> for TextRecord {
    type Error = Error;

    fn try_from(record: &NdefRecord) -> Result<Self, Self::Error> {
        decode_text_record(record)
    }
}
