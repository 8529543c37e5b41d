//! Collection of APs (applications) reachable on the card

pub mod loyalty;
pub mod ndef;

pub use self::loyalty::LoyaltyAp;
pub use self::ndef::NdefAp;
