//! PC/SC support for loyalty-nfc library.
//! Can be enabled by turning `pcsc` feature on.
//!
//! ## What is PC/SC?
//! PC/SC (Personal Computer/Smart Card) is an abstraction layer for communicating with Smart Cards
//! from Windows. Using this layer, applications can connect to any devices that supports PC/SC,
//! without depending on their driver implementation. Windows and macOS supports PC/SC by themselves,
//! Linux also supports by installing pcsc-lite shared library.
//! Most contactless readers (e.g. ACR122U, PaSoRi) are exposed through PC/SC as well.
//!
//! ## Usage
//! ```rust,no_run
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use loyalty_nfc::ap::LoyaltyAp;
//! use loyalty_nfc::pcsc::Context;
//! use loyalty_nfc::{Card, DEFAULT_AID};
//!
//! let ctx = Context::try_new().unwrap();
//! let device = ctx.open(None).unwrap();
//! let pcsc_card = device.connect(&ctx, Some(Duration::from_secs(30))).unwrap();
//!
//! let card = Rc::new(Card::new(Box::new(pcsc_card)));
//! let loyalty_ap = LoyaltyAp::open((), Rc::clone(&card), DEFAULT_AID).unwrap();
//! println!("{}", loyalty_ap.account());
//! ```

use std::ffi::{CStr, CString};
use std::thread::sleep;
use std::time::{Duration, Instant};

use pcsc::{Attribute, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};

use crate::apdu::parse_response;
use crate::nfc::{self, HandleError, HandlerInCtx, TagInfo, Technology};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pseudo-APDU answered by the reader itself with the UID of the tag.
const GET_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Registered application provider ID of PC/SC, found in ATRs of storage cards.
const PCSC_RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error occurred while communicating with PC/SC: {0}")]
    PcscError(#[from] pcsc::Error),

    #[error("Reader not found on PC/SC service")]
    ReaderNotFound,

    #[error("No card was presented in time")]
    Timeout,
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// PC/SC context.
pub struct Context {
    ctx: pcsc::Context,
}

impl Context {
    /// Creates a PC/SC context in user scope.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            ctx: pcsc::Context::establish(Scope::User)?,
        })
    }

    /// Lists names of the readers connected.
    pub fn readers(&self) -> Result<Vec<String>> {
        let mut buf = [0u8; 2048];

        Ok(self
            .ctx
            .list_readers(&mut buf)?
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Finds a PC/SC device, then opens a connection to them.
    /// If a name is given, the first reader whose name contains it is used.
    pub fn open(&self, reader: Option<&str>) -> Result<Device> {
        let mut buf = [0u8; 2048];
        let mut readers = self.ctx.list_readers(&mut buf)?;

        let found = match reader {
            Some(name) => readers.find(|r| r.to_string_lossy().contains(name)),
            None => readers.next(),
        };

        Ok(Device::new(found.ok_or(Error::ReaderNotFound)?))
    }
}

/// PC/SC device handle.
pub struct Device {
    reader: CString,
}

impl Device {
    fn new(reader: &CStr) -> Self {
        debug!("Using device: {}", reader.to_string_lossy());

        Self {
            reader: reader.to_owned(),
        }
    }

    /// Name of the reader.
    pub fn name(&self) -> String {
        self.reader.to_string_lossy().into_owned()
    }

    /// Connects to the card put on the device after waiting them.
    /// Without a timeout, this waits forever.
    pub fn connect(&self, ctx: &Context, timeout: Option<Duration>) -> Result<PcscCard> {
        let started = Instant::now();

        // Waits for touching card, polling for each seconds.
        debug!("Waiting for a card");

        loop {
            match ctx
                .ctx
                .connect(&self.reader, ShareMode::Shared, Protocols::ANY)
            {
                Ok(card) => {
                    debug!("Connected to your card");

                    return Ok(PcscCard::new(card));
                }
                Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                    if timeout.map_or(false, |t| started.elapsed() >= t) {
                        return Err(Error::Timeout);
                    }

                    info!("Still waiting for your card...");
                    sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(Error::PcscError(e)),
            }
        }
    }
}

/// A card to be communicated through PC/SC.
/// The card is released when this is dropped.
pub struct PcscCard {
    card: pcsc::Card,
}

impl PcscCard {
    fn new(card: pcsc::Card) -> Self {
        Self { card }
    }

    /// Transmits an APDU command to the card, then receives a response from them.
    /// Frames are logged by [`crate::Card`], not here.
    pub fn transmit(&self, tx: &[u8]) -> Result<Vec<u8>> {
        let mut rx = [0u8; MAX_BUFFER_SIZE];
        let rx = self.card.transmit(tx, &mut rx)?;

        Ok(Vec::from(rx))
    }

    /// Answer-to-reset of the card.
    pub fn atr(&self) -> Result<Vec<u8>> {
        Ok(self.card.get_attribute_owned(Attribute::AtrString)?)
    }
}

type Ctx = ();

impl HandlerInCtx<Ctx> for PcscCard {
    fn handle_in_ctx(&self, _: Ctx, command: &[u8]) -> nfc::Result {
        self.transmit(command).map_err(|e| match e {
            Error::PcscError(pcsc::Error::RemovedCard | pcsc::Error::ResetCard) => {
                HandleError::TagLost
            }
            Error::PcscError(pcsc::Error::Timeout) | Error::Timeout => HandleError::Timeout,
            e => HandleError::nfc(e),
        })
    }
}

impl TagInfo<Ctx> for PcscCard {
    fn tag_id(&self, ctx: Ctx) -> nfc::Result<Vec<u8>> {
        let rx = self.handle_in_ctx(ctx, &GET_UID)?;
        let response = parse_response(rx).map_err(HandleError::nfc)?;

        response
            .into_result()
            .map_err(|sw| HandleError::nfc(format!("The reader refused to tell the UID: {}", sw)))
    }

    fn technologies(&self, _: Ctx) -> Vec<Technology> {
        match self.atr() {
            Ok(atr) => technologies_from_atr(&atr),
            Err(_) => vec![],
        }
    }
}

/// Guesses the technologies from an ATR the reader built for a contactless card.
/// Storage cards carry the PC/SC RID with the standard and the card name;
/// ISO 14443-4 cards get a short ATR with their historical bytes instead.
fn technologies_from_atr(atr: &[u8]) -> Vec<Technology> {
    if let Some(pos) = atr.windows(PCSC_RID.len()).position(|w| w == PCSC_RID) {
        let rest = &atr[pos + PCSC_RID.len()..];
        let (standard, name) = match rest {
            [standard, hi, lo, ..] => (*standard, u16::from_be_bytes([*hi, *lo])),
            _ => return vec![],
        };

        let mut technologies = match standard {
            0x01..=0x03 => vec![Technology::NfcA],
            0x05..=0x07 => vec![Technology::NfcB],
            0x09..=0x0B => vec![Technology::NfcV],
            0x11 => vec![Technology::NfcF],
            _ => vec![],
        };

        match name {
            0x0001 | 0x0002 | 0x0026 => technologies.push(Technology::MifareClassic),
            0x0003 | 0x003A => technologies.push(Technology::MifareUltralight),
            _ => {}
        }

        return technologies;
    }

    match atr {
        [0x3B, t0, 0x80, 0x01, ..] if t0 & 0xF0 == 0x80 => vec![Technology::IsoDep],
        _ => vec![],
    }
}
