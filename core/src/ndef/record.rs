use crate::ndef::{Error, RTD_TEXT};
use crate::reader::{Reader, Truncated};

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const MASK_TNF: u8 = 0x07;

/// Type name format of a record, the lower 3 bits of its header
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Tnf {
    Empty,
    WellKnown,
    Mime,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl Tnf {
    fn from_bits(bits: u8) -> Self {
        match bits & MASK_TNF {
            0 => Self::Empty,
            1 => Self::WellKnown,
            2 => Self::Mime,
            3 => Self::AbsoluteUri,
            4 => Self::External,
            5 => Self::Unknown,
            6 => Self::Unchanged,
            _ => Self::Reserved,
        }
    }

    fn into_bits(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::WellKnown => 1,
            Self::Mime => 2,
            Self::AbsoluteUri => 3,
            Self::External => 4,
            Self::Unknown => 5,
            Self::Unchanged => 6,
            Self::Reserved => 7,
        }
    }
}

/// A single NDEF record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    tnf: Tnf,
    type_: Vec<u8>,
    id: Option<Vec<u8>>,
    payload: Vec<u8>,
}

impl NdefRecord {
    /// Constructs a record without an ID.
    pub fn new(tnf: Tnf, type_: Vec<u8>, payload: Vec<u8>) -> Result<Self, Error> {
        if type_.len() > u8::MAX as usize {
            return Err(Error::FieldTooLong {
                field: "record type",
                len: type_.len(),
            });
        }

        Ok(Self {
            tnf,
            type_,
            id: None,
            payload,
        })
    }

    /// Constructs a well-known text record.
    pub fn text(text: &str, language_code: &str, force_utf16: bool) -> Result<Self, Error> {
        let payload = super::encode_text_record(text, language_code, force_utf16)?;

        Self::new(Tnf::WellKnown, RTD_TEXT.to_vec(), payload)
    }

    /// Attaches an ID to the record.
    pub fn with_id(self, id: Vec<u8>) -> Result<Self, Error> {
        if id.len() > u8::MAX as usize {
            return Err(Error::FieldTooLong {
                field: "record ID",
                len: id.len(),
            });
        }

        Ok(Self {
            id: Some(id),
            ..self
        })
    }

    pub fn tnf(&self) -> Tnf {
        self.tnf
    }

    pub fn record_type(&self) -> &[u8] {
        &self.type_
    }

    pub fn id(&self) -> Option<&[u8]> {
        self.id.as_deref()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn write(&self, first: bool, last: bool, buffer: &mut Vec<u8>) {
        let short = self.payload.len() <= u8::MAX as usize;
        let mut header = self.tnf.into_bits();

        if first {
            header |= FLAG_MB;
        }
        if last {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if self.id.is_some() {
            header |= FLAG_IL;
        }

        buffer.push(header);
        // Type and ID lengths are bounded on construction.
        buffer.push(self.type_.len() as u8);

        match short {
            true => buffer.push(self.payload.len() as u8),
            _ => buffer.extend_from_slice(&(self.payload.len() as u32).to_be_bytes()),
        }

        if let Some(id) = &self.id {
            buffer.push(id.len() as u8);
        }

        buffer.extend_from_slice(&self.type_);
        if let Some(id) = &self.id {
            buffer.extend_from_slice(id);
        }
        buffer.extend_from_slice(&self.payload);
    }

    /// Reads a record at the cursor, returning it with the header flags (MB, ME).
    fn read(reader: &mut Reader) -> Result<(Self, bool, bool), Error> {
        let header = reader.next()?;

        if header & FLAG_CF != 0 {
            return Err(Error::ChunkedRecord);
        }

        let type_length = reader.next()? as usize;
        let payload_length = match header & FLAG_SR != 0 {
            true => reader.next()? as usize,
            _ => reader.next_u32()? as usize,
        };
        let id_length = match header & FLAG_IL != 0 {
            true => Some(reader.next()? as usize),
            _ => None,
        };

        let type_ = reader.read(type_length)?.to_vec();
        let id = match id_length {
            Some(len) => Some(reader.read(len)?.to_vec()),
            None => None,
        };
        let payload = reader.read(payload_length)?.to_vec();

        let record = Self {
            tnf: Tnf::from_bits(header),
            type_,
            id,
            payload,
        };

        Ok((record, header & FLAG_MB != 0, header & FLAG_ME != 0))
    }
}

/// An NDEF message, a non-empty sequence of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefMessage {
    records: Vec<NdefRecord>,
}

impl NdefMessage {
    pub fn new(records: Vec<NdefRecord>) -> Result<Self, Error> {
        match records.is_empty() {
            true => Err(Error::EmptyMessage),
            _ => Ok(Self { records }),
        }
    }

    pub fn records(&self) -> &[NdefRecord] {
        &self.records
    }

    /// The first record, which is the one readers look at.
    pub fn first(&self) -> &NdefRecord {
        &self.records[0]
    }

    pub fn into_records(self) -> Vec<NdefRecord> {
        self.records
    }

    /// Serialises the message, flagging the first and last records.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let last = self.records.len() - 1;

        for (i, record) in self.records.iter().enumerate() {
            record.write(i == 0, i == last, &mut buffer);
        }

        buffer
    }

    /// Parses a message up to the record flagged as the end.
    /// Octets after that record are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(bytes);
        let mut records = Vec::new();

        if bytes.is_empty() {
            return Err(Error::EmptyMessage);
        }

        loop {
            let offset = reader.position();
            let (record, begin, end) = NdefRecord::read(&mut reader)?;

            // Only the first record carries MB.
            if begin != records.is_empty() {
                return Err(Error::MalformedRecord { offset });
            }

            records.push(record);

            if end {
                return Ok(Self { records });
            }
            if reader.remaining() == 0 {
                return Err(Error::MalformedRecord {
                    offset: reader.position(),
                });
            }
        }
    }
}

impl From<NdefRecord> for NdefMessage {
    fn from(record: NdefRecord) -> Self {
        Self {
            records: vec![record],
        }
    }
}

impl From<Truncated> for Error {
    fn from(Truncated { offset }: Truncated) -> Self {
        Error::MalformedRecord { offset }
    }
}
