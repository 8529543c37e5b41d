//! Instruction bytes of the commands this crate sends.

pub const SELECT_FILE: u8 = 0xA4;
pub const READ_BINARY: u8 = 0xB0;
pub const UPDATE_BINARY: u8 = 0xD6;
pub const GET_DATA: u8 = 0xCA;

// Proprietary to the loyalty card service.
pub const READ_DATA: u8 = 0xEA;
pub const WRITE_DATA: u8 = 0xDA;
