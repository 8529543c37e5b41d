//! Communicating with the card using NFC technology

use std::fmt::{Display, Formatter};

/// A failure on the transport.
/// This crate never retries; the error is handed back to the caller as is.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Error occurred while communicating with the card: {0}")]
    Nfc(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("The card did not answer in time")]
    Timeout,

    #[error("The card left the field")]
    TagLost,
}

impl HandleError {
    /// Wraps an error of the underlying transport.
    pub fn nfc(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Nfc(e.into())
    }
}

pub type Result<T = Vec<u8>> = std::result::Result<T, HandleError>;

/// An handler to handle an APDU command and receive a response
pub trait HandlerInCtx<Ctx = ()> {
    /// Handles the APDU command.
    /// Implementations must transmit the command to the card through a reader,
    /// then receive the whole response (including the status word) from them.
    fn handle_in_ctx(&self, ctx: Ctx, command: &[u8]) -> Result;
}

/// Read-only metadata of the tag, used for diagnostics only
pub trait TagInfo<Ctx = ()> {
    /// Returns the identifier (UID) of the tag.
    fn tag_id(&self, ctx: Ctx) -> Result<Vec<u8>>;

    /// Returns the technologies the tag supports.
    fn technologies(&self, ctx: Ctx) -> Vec<Technology>;
}

/// Technologies a tag can support
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Technology {
    /// ISO 14443-4
    IsoDep,
    NfcA,
    NfcB,
    /// JIS X 6319-4 (FeliCa)
    NfcF,
    /// ISO 15693
    NfcV,
    Ndef,
    NdefFormatable,
    MifareClassic,
    MifareUltralight,
}

impl Display for Technology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::IsoDep => "ISO-DEP",
            Self::NfcA => "NFC-A",
            Self::NfcB => "NFC-B",
            Self::NfcF => "NFC-F",
            Self::NfcV => "NFC-V",
            Self::Ndef => "NDEF",
            Self::NdefFormatable => "NDEF formatable",
            Self::MifareClassic => "MIFARE Classic",
            Self::MifareUltralight => "MIFARE Ultralight",
        })
    }
}
