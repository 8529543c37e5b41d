use crate::apdu::{self, ins, Error};

/// An APDU command to be transmitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    le: Option<u16>,
    payload: Option<Vec<u8>>,
}

impl Command {
    /// Constructs an command with CLA, INS, P1, and P2.
    /// No payloads will be transmitted or received.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: None,
            payload: None,
        }
    }

    /// Constructs an command with CLA, INS, P1, P2, and Le.
    /// A payload will be received.
    pub fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u16) -> Self {
        Self {
            le: Some(le),
            ..Self::new(cla, ins, p1, p2)
        }
    }

    /// Constructs an command with CLA, INS, P1, P2, and a payload.
    /// No payload will be received.
    pub fn new_with_payload(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        payload: Vec<u8>,
    ) -> Result<Self, Error> {
        if payload.len() > apdu::MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge(payload.len()));
        }

        Ok(Self {
            payload: Some(payload),
            ..Self::new(cla, ins, p1, p2)
        })
    }

    /// Constructs an command with CLA, INS, P1, P2, Le, and a payload.
    /// A payload will be received.
    pub fn new_with_payload_le(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        le: u16,
        payload: Vec<u8>,
    ) -> Result<Self, Error> {
        Self::new_with_payload(cla, ins, p1, p2, payload).map(|c| Self { le: Some(le), ..c })
    }

    /// Constructs a `SELECT FILE` command.
    pub fn select_file(p1: u8, p2: u8, payload: Vec<u8>) -> Result<Self, Error> {
        match payload.len() {
            0 => Ok(Self::new(apdu::CLA_DEFAULT, ins::SELECT_FILE, p1, p2)),
            _ => Self::new_with_payload(apdu::CLA_DEFAULT, ins::SELECT_FILE, p1, p2, payload),
        }
    }

    /// Constructs a `READ BINARY` command.
    pub fn read_binary(p1: u8, p2: u8, le: u8) -> Self {
        Self::new_with_le(apdu::CLA_DEFAULT, ins::READ_BINARY, p1, p2, le.into())
    }

    /// Constructs an `UPDATE BINARY` command.
    pub fn update_binary(p1: u8, p2: u8, payload: Vec<u8>) -> Result<Self, Error> {
        Self::new_with_payload(apdu::CLA_DEFAULT, ins::UPDATE_BINARY, p1, p2, payload)
    }

    /// Appends the expected length to the command.
    pub fn with_le(self, le: u16) -> Self {
        Self { le: Some(le), ..self }
    }

    /// Returns the instruction byte.
    pub fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns the length of the encoded command in octets.
    pub fn len(&self) -> usize {
        let payload = self.payload.as_ref().map_or(0, |p| 1 + p.len());
        let le = match self.le {
            Some(l) if l > 0xFF => 2,
            Some(_) => 1,
            None => 0,
        };

        4 + payload + le
    }

    /// Converts the command into octets.
    /// Expected lengths wider than one octet are written as a bare two-octet field.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::with_capacity(self.len());
        let Self {
            cla,
            ins,
            p1,
            p2,
            le,
            payload,
        } = self;

        buffer.extend_from_slice(&[cla, ins, p1, p2]);
        if let Some(mut p) = payload {
            // Bounded by MAX_PAYLOAD_LEN on construction.
            buffer.push(p.len() as u8);
            buffer.append(&mut p);
        }

        match le {
            Some(l) if l > 0xFF => buffer.extend_from_slice(&l.to_be_bytes()),
            Some(l) => buffer.push(l as u8),
            None => {}
        }

        buffer
    }
}

impl From<Command> for Vec<u8> {
    fn from(command: Command) -> Self {
        command.into_bytes()
    }
}
