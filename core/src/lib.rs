//! A crate to talk with loyalty cards and NFC tags through an APDU delegate.
//!
//! The codecs ([`hex`], [`apdu`], [`ndef`]) are pure functions without any I/O.
//! [`Card`] puts them to work over a transport implementing [`nfc::HandlerInCtx`],
//! and the applications in [`ap`] drive the actual exchanges.

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($t: tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($t: tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($t: tt)*) => {};
}

#[cfg(feature = "pcsc")]
pub mod pcsc;

pub mod ap;
pub mod apdu;
pub mod card;
pub mod encoding;
pub mod hex;
pub mod ndef;
pub mod nfc;

mod reader;

pub use card::Card;
pub use encoding::TextEncoding;

/// AID of the loyalty card service emulated on the other side.
pub const DEFAULT_AID: &str = "F222222222";

/// Language code written into text records when the caller gives none.
pub const DEFAULT_LANGUAGE: &str = "en";
