//! NDEF AP: the NFC Forum Type 4 Tag application.
//!
//! The tag exposes a capability container (CC) file describing where the NDEF file
//! is, how large it may grow and whether it can be written. The NDEF file starts
//! with a 2-octet length (NLEN) followed by the message itself.

use std::rc::Rc;

use crate::ndef::{self, decode_text_record, NdefMessage, NdefRecord, TextRecord};
use crate::nfc::HandlerInCtx;
use crate::reader::{Reader, Truncated};
use crate::{card, Card};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

const DF_NAME: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
const EF_CC: [u8; 2] = [0xE1, 0x03];

const CC_LEN: u16 = 15;
const NLEN_SIZE: u16 = 2;
const TLV_NDEF_FILE_CONTROL: u8 = 0x04;
const ACCESS_GRANTED: u8 = 0x00;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Card(#[from] card::Error),

    #[error("Failed to process the NDEF message: {0}")]
    Ndef(#[from] ndef::Error),

    #[error("Invalid capability container: {0}")]
    InvalidCapabilityContainer(&'static str),

    #[error("The tag does not grant read access")]
    ReadProtected,

    #[error("The tag is read-only")]
    ReadOnly,

    #[error("NDEF message of {needed} octets exceeds the capacity of {capacity} octets")]
    InsufficientCapacity { needed: usize, capacity: usize },

    #[error("The tag holds no NDEF message")]
    NoMessage,

    #[error("NDEF file ended after {actual} of {expected} octets")]
    TruncatedFile { expected: usize, actual: usize },
}

/// Contents of the CC file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapabilityContainer {
    pub version: u8,
    pub max_le: u16,
    pub max_lc: u16,
    pub file_id: [u8; 2],
    pub max_size: u16,
    pub read_access: u8,
    pub write_access: u8,
}

impl CapabilityContainer {
    /// Parses the CC file.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let truncated = |_: Truncated| Error::InvalidCapabilityContainer("truncated");
        let mut reader = Reader::new(bytes);

        let _cc_len = reader.next_u16().map_err(truncated)?;
        let version = reader.next().map_err(truncated)?;
        let max_le = reader.next_u16().map_err(truncated)?;
        let max_lc = reader.next_u16().map_err(truncated)?;

        if !matches!(version >> 4, 2 | 3) {
            return Err(Error::InvalidCapabilityContainer("unsupported mapping version"));
        }

        if max_le == 0 || max_lc == 0 {
            return Err(Error::InvalidCapabilityContainer("zero MLe or MLc"));
        }

        if reader.next().map_err(truncated)? != TLV_NDEF_FILE_CONTROL {
            return Err(Error::InvalidCapabilityContainer("no NDEF file control TLV"));
        }

        let _tlv_len = reader.next().map_err(truncated)?;
        let id = reader.read(2).map_err(truncated)?;
        let max_size = reader.next_u16().map_err(truncated)?;
        let read_access = reader.next().map_err(truncated)?;
        let write_access = reader.next().map_err(truncated)?;

        Ok(Self {
            version,
            max_le,
            max_lc,
            file_id: [id[0], id[1]],
            max_size,
            read_access,
            write_access,
        })
    }

    pub fn is_readable(&self) -> bool {
        self.read_access == ACCESS_GRANTED
    }

    pub fn is_writable(&self) -> bool {
        self.write_access == ACCESS_GRANTED
    }

    /// Largest message the NDEF file can hold, NLEN excluded.
    pub fn capacity(&self) -> usize {
        (self.max_size as usize).saturating_sub(NLEN_SIZE as usize)
    }
}

pub struct NdefAp<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    card: Rc<Card<T, Ctx>>,
    cc: CapabilityContainer,
}

impl<T, Ctx> NdefAp<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    /// Opens the AP in the card by selecting the DF, then reads the CC file.
    pub fn open(ctx: Ctx, card: Rc<Card<T, Ctx>>) -> Result<Self, Error> {
        card.select_df(ctx, DF_NAME.into())?;
        card.select_ef(ctx, EF_CC)?;

        let cc = CapabilityContainer::parse(&card.read(ctx, 0, CC_LEN, u8::MAX)?)?;
        debug!("Capability container: {:?}", cc);

        Ok(Self { card, cc })
    }

    pub fn capability_container(&self) -> &CapabilityContainer {
        &self.cc
    }

    /// Reads the NDEF message stored on the tag.
    pub fn read_message(&self, ctx: Ctx) -> Result<NdefMessage, Error> {
        if !self.cc.is_readable() {
            return Err(Error::ReadProtected);
        }

        self.card.select_ef(ctx, self.cc.file_id)?;

        let nlen = self.card.read(ctx, 0, NLEN_SIZE, self.max_le())?;
        let len = match nlen.as_slice() {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            _ => {
                return Err(Error::TruncatedFile {
                    expected: NLEN_SIZE as usize,
                    actual: nlen.len(),
                })
            }
        };

        if len == 0 {
            return Err(Error::NoMessage);
        }

        let bytes = self.card.read(ctx, NLEN_SIZE, len, self.max_le())?;
        if bytes.len() < len as usize {
            return Err(Error::TruncatedFile {
                expected: len as usize,
                actual: bytes.len(),
            });
        }

        Ok(NdefMessage::parse(&bytes)?)
    }

    /// Reads the first record on the tag as a text record.
    pub fn read_text(&self, ctx: Ctx) -> Result<TextRecord, Error> {
        let message = self.read_message(ctx)?;

        Ok(decode_text_record(message.first())?)
    }

    /// Replaces the NDEF message stored on the tag.
    /// NLEN stays zero until the whole message has been written.
    pub fn write_message(&self, ctx: Ctx, message: &NdefMessage) -> Result<(), Error> {
        if !self.cc.is_writable() {
            return Err(Error::ReadOnly);
        }

        let bytes = message.to_bytes();
        if bytes.len() > self.cc.capacity() {
            return Err(Error::InsufficientCapacity {
                needed: bytes.len(),
                capacity: self.cc.capacity(),
            });
        }

        self.card.select_ef(ctx, self.cc.file_id)?;
        self.card.write(ctx, 0, &[0x00, 0x00], self.max_lc())?;
        self.card.write(ctx, NLEN_SIZE, &bytes, self.max_lc())?;
        self.card
            .write(ctx, 0, &(bytes.len() as u16).to_be_bytes(), self.max_lc())?;

        info!("Wrote an NDEF message of {} octets", bytes.len());

        Ok(())
    }

    /// Writes a single text record onto the tag.
    pub fn write_text(
        &self,
        ctx: Ctx,
        text: &str,
        language_code: &str,
        force_utf16: bool,
    ) -> Result<(), Error> {
        let record = NdefRecord::text(text, language_code, force_utf16)?;

        self.write_message(ctx, &record.into())
    }

    fn max_le(&self) -> u8 {
        self.cc.max_le.min(u8::MAX as u16) as u8
    }

    fn max_lc(&self) -> usize {
        self.cc.max_lc as usize
    }
}
