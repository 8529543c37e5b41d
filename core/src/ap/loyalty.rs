//! Loyalty AP: a loyalty card service, usually emulated by a phone (HCE),
//! that hands out an account number and keeps a short message.

use std::rc::Rc;

use crate::apdu;
use crate::card::Error;
use crate::encoding::TextEncoding;
use crate::nfc::HandlerInCtx;
use crate::Card;

#[cfg(feature = "tracing")]
use tracing::info;

pub struct LoyaltyAp<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    card: Rc<Card<T, Ctx>>,
    account: String,
}

impl<T, Ctx> LoyaltyAp<T, Ctx>
where
    T: HandlerInCtx<Ctx>,
    Ctx: Copy,
{
    /// Opens the AP in the card by selecting its AID.
    /// The service answers the selection with the account number.
    pub fn open(ctx: Ctx, card: Rc<Card<T, Ctx>>, aid: &str) -> Result<Self, Error> {
        info!("Requesting remote AID: {}", aid);

        let account = card.handle_text(ctx, apdu::build_select_apdu(aid)?, TextEncoding::Utf8)?;
        info!("Received account: {}", account);

        Ok(Self { card, account })
    }

    /// Account number received on opening.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Fetches the data object of the service with `GET DATA`.
    pub fn get_data(&self, ctx: Ctx) -> Result<String, Error> {
        self.card
            .handle_text(ctx, apdu::build_get_data_apdu(), TextEncoding::Utf8)
    }

    /// Reads the message kept by the service.
    pub fn read_message(&self, ctx: Ctx) -> Result<String, Error> {
        let message = self
            .card
            .handle_text(ctx, apdu::build_read_apdu(), TextEncoding::Utf8)?;
        info!("Received message: {}", message);

        Ok(message)
    }

    /// Stores the message in the service, returning what it answered with.
    pub fn write_message(&self, ctx: Ctx, message: &str) -> Result<String, Error> {
        let command = apdu::build_write_apdu(TextEncoding::Utf8.encode(message))?;
        let answer = self.card.handle_text(ctx, command, TextEncoding::Utf8)?;
        info!("Received payload: {}", answer);

        Ok(answer)
    }
}
