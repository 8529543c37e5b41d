//! ISO 7816-4 command and response frames.
//!
//! Every function here is pure: commands are built from their description,
//! responses are split into payload and status word. Whether a status word means
//! the payload is usable is left to the caller (see [`is_success`]).

mod command;
pub mod ins;
mod response;
mod status;

pub use command::Command;
pub use response::Response;
pub use status::StatusWord;

use crate::encoding::{TextDecodeError, TextEncoding};
use crate::hex::{hex_to_bytes, MalformedHexInput};

pub const CLA_DEFAULT: u8 = 0x00;

/// Largest payload a single-octet Lc can describe.
pub const MAX_PAYLOAD_LEN: usize = 0xFF;

const SELECT_P1_BY_NAME: u8 = 0x04;
const SELECT_P2_FIRST: u8 = 0x00;

// The loyalty service matches this expected length byte for byte.
const LOYALTY_LE: u16 = 0x0FFF;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("AID must be an even-length hex string of at most 255 octets, got {0} characters")]
    InvalidAidLength(usize),

    #[error("AID is not a hex string: {0}")]
    MalformedAid(#[from] MalformedHexInput),

    #[error("Payload of {0} octets does not fit in a single-octet Lc")]
    PayloadTooLarge(usize),

    #[error("Response of {0} octets is shorter than a status word")]
    MalformedResponse(usize),
}

/// Builds a `SELECT` command choosing the application by its AID, given in hex.
pub fn build_select_apdu(aid: &str) -> Result<Command, Error> {
    let name = hex_to_bytes(aid).map_err(|e| match e {
        MalformedHexInput::OddLength(len) => Error::InvalidAidLength(len),
        e => Error::MalformedAid(e),
    })?;

    if name.len() > MAX_PAYLOAD_LEN {
        return Err(Error::InvalidAidLength(aid.len()));
    }

    // Lc is always written, even for an empty AID.
    Command::new_with_payload(
        CLA_DEFAULT,
        ins::SELECT_FILE,
        SELECT_P1_BY_NAME,
        SELECT_P2_FIRST,
        name,
    )
}

/// Builds the `GET DATA` command of the loyalty service.
pub fn build_get_data_apdu() -> Command {
    Command::new_with_le(CLA_DEFAULT, ins::GET_DATA, 0x00, 0x00, LOYALTY_LE)
}

/// Builds the `READ DATA` command of the loyalty service.
pub fn build_read_apdu() -> Command {
    Command::new_with_le(CLA_DEFAULT, ins::READ_DATA, 0x00, 0x00, LOYALTY_LE)
}

/// Builds the `WRITE DATA` command of the loyalty service carrying the payload.
pub fn build_write_apdu(payload: impl Into<Vec<u8>>) -> Result<Command, Error> {
    Command::new_with_payload(CLA_DEFAULT, ins::WRITE_DATA, 0x00, 0x00, payload.into())
}

/// Splits a response into its payload and status word.
pub fn parse_response(bytes: impl Into<Vec<u8>>) -> Result<Response, Error> {
    Response::from_bytes(bytes.into())
}

/// Determines whether the status word reports success (`9000`).
pub fn is_success(status_word: StatusWord) -> bool {
    status_word == StatusWord::OK
}

/// Decodes a response payload as text, failing instead of replacing invalid sequences.
pub fn decode_payload_as_text(
    payload: &[u8],
    encoding: TextEncoding,
) -> Result<String, TextDecodeError> {
    encoding.decode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_select_apdu() {
        assert_eq!(
            vec![0x00, 0xA4, 0x04, 0x00, 0x05, 0xF2, 0x22, 0x22, 0x22, 0x22],
            build_select_apdu("F222222222").unwrap().into_bytes(),
        );
    }

    #[test]
    fn test_build_select_apdu_empty_aid() {
        assert_eq!(
            vec![0x00, 0xA4, 0x04, 0x00, 0x00],
            build_select_apdu("").unwrap().into_bytes(),
        );
    }

    #[test]
    fn test_build_select_apdu_rejects_odd_aid() {
        assert_eq!(Err(Error::InvalidAidLength(9)), build_select_apdu("F22222222"));
        assert_eq!(Err(Error::InvalidAidLength(1)), build_select_apdu("F"));
    }

    #[test]
    fn test_build_select_apdu_rejects_long_aid() {
        let aid = "AB".repeat(256);

        assert_eq!(Err(Error::InvalidAidLength(512)), build_select_apdu(&aid));
        assert!(build_select_apdu(&"AB".repeat(255)).is_ok());
    }

    #[test]
    fn test_build_select_apdu_rejects_non_hex() {
        assert!(matches!(
            build_select_apdu("F2222222ZZ"),
            Err(Error::MalformedAid(_)),
        ));
    }

    #[test]
    fn test_loyalty_commands() {
        assert_eq!(
            vec![0x00, 0xCA, 0x00, 0x00, 0x0F, 0xFF],
            build_get_data_apdu().into_bytes(),
        );
        assert_eq!(
            vec![0x00, 0xEA, 0x00, 0x00, 0x0F, 0xFF],
            build_read_apdu().into_bytes(),
        );
        assert_eq!(
            vec![0x00, 0xDA, 0x00, 0x00, 0x04, b't', b'e', b's', b't'],
            build_write_apdu("test").unwrap().into_bytes(),
        );
    }

    #[test]
    fn test_build_write_apdu_rejects_large_payload() {
        assert_eq!(
            Err(Error::PayloadTooLarge(256)),
            build_write_apdu(vec![0u8; 256]),
        );
        assert_eq!(
            0xFF,
            build_write_apdu(vec![0u8; 255]).unwrap().into_bytes()[4],
        );
    }

    #[test]
    fn test_parse_response_ok() {
        let response = parse_response(vec![0x01, 0x02, 0x90, 0x00]).unwrap();

        assert_eq!(&[0x01, 0x02], response.payload());
        assert_eq!(StatusWord::new(0x9000), response.status_word());
        assert!(is_success(response.status_word()));
    }

    #[test]
    fn test_parse_response_error() {
        let response = parse_response(vec![0x6A, 0x82]).unwrap();

        assert!(response.payload().is_empty());
        assert_eq!(StatusWord::new(0x6A82), response.status_word());
        assert!(!is_success(response.status_word()));
    }

    #[test]
    fn test_parse_response_too_short() {
        assert_eq!(Err(Error::MalformedResponse(1)), parse_response(vec![0x00]));
        assert_eq!(Err(Error::MalformedResponse(0)), parse_response(Vec::new()));
    }

    #[test]
    fn test_decode_payload_as_text() {
        assert_eq!(
            Ok("1234".to_string()),
            decode_payload_as_text(b"1234", TextEncoding::Utf8),
        );
        assert!(decode_payload_as_text(&[0xFF, 0xFE, 0xFD], TextEncoding::Utf8).is_err());
        assert_eq!(Ok(String::new()), decode_payload_as_text(&[], TextEncoding::Utf8));
    }
}
