use std::marker::PhantomData;

use crate::apdu::{self, Command, Response, StatusWord};
use crate::encoding::{TextDecodeError, TextEncoding};
use crate::nfc::{self, HandlerInCtx};

#[cfg(feature = "tracing")]
use crate::hex::bytes_to_hex;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

const SELECT_P1_DF: u8 = 0x04;
const SELECT_P1_EF: u8 = 0x00;
const SELECT_P2_DF: u8 = 0x00;
const SELECT_P2_EF: u8 = 0x0C;

// Bit 15 would turn P1 into a short EF identifier.
const MAX_BINARY_OFFSET: usize = 0x7FFF;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error occurred on communicating with the card: {0}")]
    Transport(#[from] nfc::HandleError),

    #[error("Malformed APDU: {0}")]
    Apdu(#[from] apdu::Error),

    #[error("The card returned an error: {0}")]
    Status(StatusWord),

    #[error("The card sent a text that cannot be decoded: {0}")]
    Text(#[from] TextDecodeError),

    #[error("Offset {0:#06X} is out of the range of binary commands")]
    OffsetOutOfRange(usize),
}

/// An adapter to communicate with the card through the delegate
pub struct Card<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    delegate: Box<T>,
    _ctx: PhantomData<Ctx>,
}

impl<T, Ctx> Card<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    /// Initiates an adapter with the delegate.
    pub fn new(delegate: Box<T>) -> Self {
        Self {
            delegate,
            _ctx: PhantomData,
        }
    }

    /// Borrows the delegate, e.g. to query the tag metadata.
    pub fn delegate(&self) -> &T {
        &self.delegate
    }

    /// Transmits the command and parses the response, whatever its status word is.
    pub fn transmit(&self, ctx: Ctx, command: Command) -> Result<Response, Error> {
        let tx = command.into_bytes();
        debug!("TX: {}", bytes_to_hex(&tx));

        let rx = self.delegate.handle_in_ctx(ctx, &tx)?;
        debug!("RX: {}", bytes_to_hex(&rx));

        Ok(apdu::parse_response(rx)?)
    }

    /// Transmits the command, then returns the payload if the card reported success.
    pub fn handle(&self, ctx: Ctx, command: Command) -> Result<Vec<u8>, Error> {
        self.transmit(ctx, command)?.into_result().map_err(|sw| {
            warn!("The card answered {}", sw);
            Error::Status(sw)
        })
    }

    /// Transmits the command, then decodes the payload as text.
    /// The payload is decoded only when the card reported success.
    pub fn handle_text(
        &self,
        ctx: Ctx,
        command: Command,
        encoding: TextEncoding,
    ) -> Result<String, Error> {
        let payload = self.handle(ctx, command)?;

        Ok(apdu::decode_payload_as_text(&payload, encoding)?)
    }

    /// Selects an application with its AID in hex, returning the payload of the answer.
    pub fn select_aid(&self, ctx: Ctx, aid: &str) -> Result<Vec<u8>, Error> {
        self.handle(ctx, apdu::build_select_apdu(aid)?)
    }

    /// Selects a DF with their name.
    pub fn select_df(&self, ctx: Ctx, name: Vec<u8>) -> Result<(), Error> {
        let command = Command::select_file(SELECT_P1_DF, SELECT_P2_DF, name)?.with_le(0x00);

        self.handle(ctx, command).map(|_| ())
    }

    /// Selects a EF with their identifier.
    pub fn select_ef(&self, ctx: Ctx, id: [u8; 2]) -> Result<(), Error> {
        self.handle(ctx, Command::select_file(SELECT_P1_EF, SELECT_P2_EF, id.into())?)
            .map(|_| ())
    }

    /// Reads `len` octets max from the selected file, starting at `offset`,
    /// asking for at most `max_le` octets per command.
    pub fn read(&self, ctx: Ctx, offset: u16, len: u16, max_le: u8) -> Result<Vec<u8>, Error> {
        let max_le = max_le.max(1) as u16;
        let mut pos: u16 = 0;
        let mut buf: Vec<u8> = Vec::with_capacity(len as usize);

        while pos < len {
            let [p1, p2] = binary_offset(offset as usize + pos as usize)?;
            let le = (len - pos).min(max_le) as u8;

            let mut fragment = self.handle(ctx, Command::read_binary(p1, p2, le))?;
            let length = fragment.len();

            buf.append(&mut fragment);
            pos = pos.saturating_add(length as u16);

            if length < le as usize {
                break;
            }
        }

        buf.truncate(len as usize);

        Ok(buf)
    }

    /// Writes the data into the selected file at `offset`,
    /// sending at most `max_lc` octets per command.
    pub fn write(&self, ctx: Ctx, offset: u16, data: &[u8], max_lc: usize) -> Result<(), Error> {
        let max_lc = max_lc.clamp(1, apdu::MAX_PAYLOAD_LEN);

        for (i, chunk) in data.chunks(max_lc).enumerate() {
            let [p1, p2] = binary_offset(offset as usize + i * max_lc)?;

            self.handle(ctx, Command::update_binary(p1, p2, chunk.to_vec())?)?;
        }

        Ok(())
    }
}

fn binary_offset(offset: usize) -> Result<[u8; 2], Error> {
    match offset > MAX_BINARY_OFFSET {
        true => Err(Error::OffsetOutOfRange(offset)),
        _ => Ok((offset as u16).to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Answers with canned responses, recording the commands.
    struct Scripted {
        responses: RefCell<Vec<Vec<u8>>>,
        commands: RefCell<Vec<Vec<u8>>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Vec<u8>>) -> Self {
            responses.reverse();

            Self {
                responses: RefCell::new(responses),
                commands: RefCell::new(vec![]),
            }
        }
    }

    impl HandlerInCtx for Scripted {
        fn handle_in_ctx(&self, _: (), command: &[u8]) -> nfc::Result {
            self.commands.borrow_mut().push(command.to_vec());
            self.responses
                .borrow_mut()
                .pop()
                .ok_or(nfc::HandleError::TagLost)
        }
    }

    #[test]
    fn test_handle_maps_status() {
        let card = Card::new(Box::new(Scripted::new(vec![vec![0x6A, 0x82]])));

        assert!(matches!(
            card.select_aid((), "F222222222"),
            Err(Error::Status(sw)) if sw == StatusWord::new(0x6A82),
        ));
    }

    #[test]
    fn test_handle_text_decodes_on_success_only() {
        let card = Card::new(Box::new(Scripted::new(vec![
            vec![b'o', b'k', 0x90, 0x00],
            vec![0xC3, 0x28, 0x90, 0x00],
            vec![0xC3, 0x28, 0x6F, 0x00],
        ])));
        let read = || card.handle_text((), apdu::build_read_apdu(), TextEncoding::Utf8);

        assert_eq!("ok", read().unwrap());
        assert!(matches!(read(), Err(Error::Text(_))));
        assert!(matches!(read(), Err(Error::Status(_))));
    }

    #[test]
    fn test_malformed_and_lost() {
        let card = Card::new(Box::new(Scripted::new(vec![vec![0x90]])));

        assert!(matches!(
            card.handle((), apdu::build_get_data_apdu()),
            Err(Error::Apdu(apdu::Error::MalformedResponse(1))),
        ));
        assert!(matches!(
            card.handle((), apdu::build_get_data_apdu()),
            Err(Error::Transport(nfc::HandleError::TagLost)),
        ));
    }

    #[test]
    fn test_read_in_chunks() {
        let card = Card::new(Box::new(Scripted::new(vec![
            vec![1, 2, 3, 0x90, 0x00],
            vec![4, 5, 0x90, 0x00],
        ])));

        assert_eq!(vec![1, 2, 3, 4, 5], card.read((), 0x0002, 5, 3).unwrap());
        assert_eq!(
            vec![
                vec![0x00, 0xB0, 0x00, 0x02, 0x03],
                vec![0x00, 0xB0, 0x00, 0x05, 0x02],
            ],
            *card.delegate().commands.borrow(),
        );
    }

    #[test]
    fn test_read_stops_on_short_fragment() {
        let card = Card::new(Box::new(Scripted::new(vec![vec![1, 0x90, 0x00]])));

        assert_eq!(vec![1], card.read((), 0, 10, 0xFF).unwrap());
    }

    #[test]
    fn test_write_in_chunks() {
        let card = Card::new(Box::new(Scripted::new(vec![
            vec![0x90, 0x00],
            vec![0x90, 0x00],
        ])));

        card.write((), 0x0002, &[1, 2, 3], 2).unwrap();
        assert_eq!(
            vec![
                vec![0x00, 0xD6, 0x00, 0x02, 0x02, 1, 2],
                vec![0x00, 0xD6, 0x00, 0x04, 0x01, 3],
            ],
            *card.delegate().commands.borrow(),
        );
    }

    #[test]
    fn test_offset_out_of_range() {
        let card = Card::new(Box::new(Scripted::new(vec![])));

        assert!(matches!(
            card.write((), 0x8000, &[1], 1),
            Err(Error::OffsetOutOfRange(0x8000)),
        ));
    }
}
