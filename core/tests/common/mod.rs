#![allow(dead_code)]

use std::cell::RefCell;

use loyalty_nfc::nfc::{self, HandleError, HandlerInCtx};

const SW_OK: [u8; 2] = [0x90, 0x00];
const SW_WRONG_LENGTH: [u8; 2] = [0x67, 0x00];
const SW_SECURITY: [u8; 2] = [0x69, 0x82];
const SW_NOT_FOUND: [u8; 2] = [0x6A, 0x82];
const SW_WRONG_OFFSET: [u8; 2] = [0x6B, 0x00];
const SW_NO_SPACE: [u8; 2] = [0x6A, 0x84];
const SW_UNKNOWN_INS: [u8; 2] = [0x6D, 0x00];

fn respond(payload: &[u8], sw: [u8; 2]) -> Vec<u8> {
    let mut rx = payload.to_vec();
    rx.extend_from_slice(&sw);
    rx
}

/// Splits `CLA INS P1 P2 [Lc data] [Le]`, with Lc assumed present for commands with data.
fn body(command: &[u8]) -> &[u8] {
    match command.get(4) {
        Some(&lc) => command.get(5..5 + lc as usize).unwrap_or(&[]),
        None => &[],
    }
}

/// Loyalty card service as emulated on a phone.
pub struct LoyaltyService {
    pub aid: Vec<u8>,
    pub account: Vec<u8>,
    pub data: Vec<u8>,
    pub message: RefCell<Vec<u8>>,
    pub selected: RefCell<bool>,
    pub commands: RefCell<Vec<Vec<u8>>>,
}

impl LoyaltyService {
    pub fn new(account: &str) -> Self {
        Self {
            aid: vec![0xF2, 0x22, 0x22, 0x22, 0x22],
            account: account.as_bytes().to_vec(),
            data: b"points=120".to_vec(),
            message: RefCell::new(b"welcome".to_vec()),
            selected: RefCell::new(false),
            commands: RefCell::new(vec![]),
        }
    }
}

impl HandlerInCtx for LoyaltyService {
    fn handle_in_ctx(&self, _: (), command: &[u8]) -> nfc::Result {
        self.commands.borrow_mut().push(command.to_vec());

        let rx = match command {
            [0x00, 0xA4, 0x04, 0x00, ..] => match body(command) == self.aid.as_slice() {
                true => {
                    *self.selected.borrow_mut() = true;
                    respond(&self.account, SW_OK)
                }
                _ => respond(&[], SW_NOT_FOUND),
            },
            _ if !*self.selected.borrow() => respond(&[], SW_NOT_FOUND),
            [0x00, 0xCA, 0x00, 0x00, 0x0F, 0xFF] => respond(&self.data, SW_OK),
            [0x00, 0xEA, 0x00, 0x00, 0x0F, 0xFF] => respond(&self.message.borrow(), SW_OK),
            [0x00, 0xDA, 0x00, 0x00, ..] => {
                let message = body(command).to_vec();
                let rx = respond(&message, SW_OK);

                *self.message.borrow_mut() = message;
                rx
            }
            _ => respond(&[], SW_UNKNOWN_INS),
        };

        Ok(rx)
    }
}

const NDEF_AID: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
const CC_FILE: [u8; 2] = [0xE1, 0x03];
const NDEF_FILE: [u8; 2] = [0xE1, 0x04];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Selected {
    Nothing,
    Application,
    CapabilityContainer,
    Ndef,
}

/// NFC Forum Type 4 Tag with a single NDEF file.
pub struct Type4Tag {
    pub cc: Vec<u8>,
    pub ndef: RefCell<Vec<u8>>,
    pub commands: RefCell<Vec<Vec<u8>>>,
    selected: RefCell<Selected>,
}

impl Type4Tag {
    /// Creates a tag accepting `max_le` and `max_lc` octets per command, with an NDEF
    /// file of `max_size` octets.
    pub fn new(max_le: u16, max_lc: u16, max_size: u16, writable: bool) -> Self {
        let [le_hi, le_lo] = max_le.to_be_bytes();
        let [lc_hi, lc_lo] = max_lc.to_be_bytes();
        let [size_hi, size_lo] = max_size.to_be_bytes();
        let write_access = match writable {
            true => 0x00,
            _ => 0xFF,
        };

        Self {
            cc: vec![
                0x00, 0x0F, 0x20, le_hi, le_lo, lc_hi, lc_lo, 0x04, 0x06, 0xE1, 0x04, size_hi,
                size_lo, 0x00, write_access,
            ],
            ndef: RefCell::new(vec![0x00; max_size as usize]),
            commands: RefCell::new(vec![]),
            selected: RefCell::new(Selected::Nothing),
        }
    }

    /// Stores the message in the NDEF file as if it had been written before.
    pub fn with_message(self, message: &[u8]) -> Self {
        {
            let mut ndef = self.ndef.borrow_mut();
            ndef[..2].copy_from_slice(&(message.len() as u16).to_be_bytes());
            ndef[2..2 + message.len()].copy_from_slice(message);
        }

        self
    }

    /// Current value of NLEN.
    pub fn nlen(&self) -> u16 {
        let ndef = self.ndef.borrow();
        u16::from_be_bytes([ndef[0], ndef[1]])
    }

    /// Commands of the instruction received so far.
    pub fn commands_of(&self, ins: u8) -> Vec<Vec<u8>> {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c[1] == ins)
            .cloned()
            .collect()
    }

    fn select(&self, p1: u8, name: &[u8]) -> [u8; 2] {
        let mut selected = self.selected.borrow_mut();

        let next = match (p1, name, *selected) {
            (0x04, n, _) if n == NDEF_AID => Selected::Application,
            (0x00, n, s) if n == CC_FILE && s != Selected::Nothing => {
                Selected::CapabilityContainer
            }
            (0x00, n, s) if n == NDEF_FILE && s != Selected::Nothing => Selected::Ndef,
            _ => return SW_NOT_FOUND,
        };

        *selected = next;
        SW_OK
    }

    fn read(&self, offset: usize, le: usize) -> Vec<u8> {
        let file = match *self.selected.borrow() {
            Selected::CapabilityContainer => self.cc.clone(),
            Selected::Ndef => self.ndef.borrow().clone(),
            _ => return respond(&[], SW_NOT_FOUND),
        };

        if offset > file.len() {
            return respond(&[], SW_WRONG_OFFSET);
        }

        let end = (offset + le).min(file.len());
        respond(&file[offset..end], SW_OK)
    }

    fn update(&self, offset: usize, data: &[u8]) -> [u8; 2] {
        if *self.selected.borrow() != Selected::Ndef {
            return SW_SECURITY;
        }

        let mut ndef = self.ndef.borrow_mut();
        if offset + data.len() > ndef.len() {
            return SW_NO_SPACE;
        }

        ndef[offset..offset + data.len()].copy_from_slice(data);
        SW_OK
    }
}

impl HandlerInCtx for Type4Tag {
    fn handle_in_ctx(&self, _: (), command: &[u8]) -> nfc::Result {
        self.commands.borrow_mut().push(command.to_vec());

        let rx = match *command {
            [0x00, 0xA4, p1, _, ..] => respond(&[], self.select(p1, body(command))),
            [0x00, 0xB0, p1, p2, le] => {
                let offset = u16::from_be_bytes([p1, p2]) as usize;
                self.read(offset, le as usize)
            }
            [0x00, 0xB0, ..] => respond(&[], SW_WRONG_LENGTH),
            [0x00, 0xD6, p1, p2, ..] => {
                let offset = u16::from_be_bytes([p1, p2]) as usize;
                respond(&[], self.update(offset, body(command)))
            }
            _ => respond(&[], SW_UNKNOWN_INS),
        };

        Ok(rx)
    }
}

/// A card that has left the field.
pub struct Gone;

impl HandlerInCtx for Gone {
    fn handle_in_ctx(&self, _: (), _: &[u8]) -> nfc::Result {
        Err(HandleError::TagLost)
    }
}
