#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString, NulError};
use std::mem::ManuallyDrop;
use std::ptr::{null, null_mut};
use std::rc::Rc;
use std::slice;
use std::str::Utf8Error;

use loyalty_nfc::ap::LoyaltyAp;
use loyalty_nfc::apdu::{self, Command};
use loyalty_nfc::ndef::{self, NdefRecord, Tnf, RTD_TEXT};
use loyalty_nfc::nfc::{self, HandleError, HandlerInCtx};
use loyalty_nfc::{card, Card};

/// Largest response the delegate may write: a 65536-octet payload with the status word.
const MAX_RESPONSE_LEN: usize = 0x10000 + 2;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("A null pointer was given")]
    NullPointer,

    #[error("The string is not a valid UTF-8 sequence: {0}")]
    InvalidString(#[from] Utf8Error),

    #[error("The string cannot be passed as a C string: {0}")]
    Nul(#[from] NulError),

    #[error(transparent)]
    Apdu(#[from] apdu::Error),

    #[error(transparent)]
    Ndef(#[from] ndef::Error),

    #[error(transparent)]
    Card(#[from] card::Error),
}

fn unwrap_or<T, E>(result: Result<T, E>, default: T) -> T
where
    E: ToString,
{
    // If result is an error, sets the message to LAST_ERROR.
    // Clears the last error otherwise.
    LAST_ERROR.with(|last| *last.borrow_mut() = result.as_ref().err().map(|e| e.to_string()));

    match result {
        Ok(value) => value,
        Err(_) => default,
    }
}

fn unwrap<T, E>(result: Result<T, E>) -> T
where
    T: Default,
    E: ToString,
{
    unwrap_or(result, T::default())
}

unsafe fn to_str<'a>(ptr: *const c_char) -> Result<&'a str, Error> {
    match ptr.is_null() {
        true => Err(Error::NullPointer),
        _ => Ok(CStr::from_ptr(ptr).to_str()?),
    }
}

fn to_c_string(s: impl Into<Vec<u8>>) -> Result<*mut c_char, Error> {
    Ok(CString::new(s)?.into_raw())
}

/// A struct represents a byte array allocated by this library.
/// Dependents can read it from ptr to ptr+len, and should ignore about cap.
/// ptr can be null pointer, so dependents must check the ptr is not null.
/// Pass it to loyalty_nfc_byte_array_free after use.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ByteArray {
    ptr: *mut u8,
    len: usize,
    cap: usize,
}

impl Default for ByteArray {
    fn default() -> Self {
        Self {
            ptr: null_mut(),
            len: 0,
            cap: 0,
        }
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(bytes: Vec<u8>) -> Self {
        let mut bytes = ManuallyDrop::new(bytes);

        Self {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
            cap: bytes.capacity(),
        }
    }
}

impl From<Command> for ByteArray {
    fn from(command: Command) -> Self {
        command.into_bytes().into()
    }
}

/// A struct represents a byte array borrowed from the dependent.
/// The library never keeps nor frees it.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ByteSlice {
    ptr: *const u8,
    len: usize,
}

impl ByteSlice {
    unsafe fn as_slice<'a>(&self) -> Result<&'a [u8], Error> {
        match (self.ptr.is_null(), self.len) {
            (_, 0) => Ok(&[]),
            (true, _) => Err(Error::NullPointer),
            _ => Ok(slice::from_raw_parts(self.ptr, self.len)),
        }
    }
}

impl From<&[u8]> for ByteSlice {
    fn from(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        }
    }
}

impl Default for ByteSlice {
    fn default() -> Self {
        Self { ptr: null(), len: 0 }
    }
}

/// Transmits the command to the card, writing the whole response into the buffer.
/// Returns the length of the response, or a negative value if the card was lost.
pub type Delegate = extern "C" fn(command: ByteSlice, response: *mut u8, capacity: usize) -> isize;

pub struct NfcCard {
    delegate: Delegate,
}

impl HandlerInCtx for NfcCard {
    fn handle_in_ctx(&self, _: (), command: &[u8]) -> nfc::Result {
        let mut response = vec![0u8; MAX_RESPONSE_LEN];
        let len = (self.delegate)(command.into(), response.as_mut_ptr(), response.len());

        match usize::try_from(len) {
            Ok(len) if len <= response.len() => {
                response.truncate(len);
                Ok(response)
            }
            Ok(len) => Err(HandleError::nfc(format!(
                "The delegate returned {} octets, more than the buffer",
                len,
            ))),
            Err(_) => Err(HandleError::TagLost),
        }
    }
}

pub type LoyaltyCard = Card<NfcCard, ()>;
pub type LoyaltyCardAp = LoyaltyAp<NfcCard, ()>;

/// Initiates the loyalty-nfc library.
/// Currently this occur no side effects, but it will be added in the future.
/// So dependents should call this before using other functions.
#[no_mangle]
pub extern "C" fn loyalty_nfc_init() {}

/// Returns the latest error occurred on this thread before calling this function.
/// If no error occurred before or failed to get the error, returns null pointer.
/// The string must be freed with loyalty_nfc_string_free.
#[no_mangle]
pub extern "C" fn loyalty_nfc_last_error() -> *mut c_char {
    match LAST_ERROR.with(|last| last.borrow().clone()) {
        Some(e) => to_c_string(e).unwrap_or(null_mut()),
        None => null_mut(),
    }
}

/// Frees a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Frees a byte array returned by this library.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_byte_array_free(bytes: ByteArray) {
    let ByteArray { ptr, len, cap } = bytes;

    if !ptr.is_null() {
        let _ = Vec::from_raw_parts(ptr, len, cap);
    }
}

/// Builds a SELECT command choosing the application by its AID in hex.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_build_select_apdu(aid: *const c_char) -> ByteArray {
    unwrap(to_str(aid).and_then(|aid| Ok(apdu::build_select_apdu(aid)?.into())))
}

/// Builds the GET DATA command of the loyalty service.
#[no_mangle]
pub extern "C" fn loyalty_nfc_build_get_data_apdu() -> ByteArray {
    apdu::build_get_data_apdu().into()
}

/// Builds the READ DATA command of the loyalty service.
#[no_mangle]
pub extern "C" fn loyalty_nfc_build_read_apdu() -> ByteArray {
    apdu::build_read_apdu().into()
}

/// Builds the WRITE DATA command of the loyalty service.
/// Returns null if the payload exceeds 255 octets.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_build_write_apdu(payload: ByteSlice) -> ByteArray {
    unwrap(
        payload
            .as_slice()
            .and_then(|p| Ok(apdu::build_write_apdu(p)?.into())),
    )
}

/// Splits the response into the payload, which is returned, and the status word.
/// The status word is written to status_word unless it is null.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_parse_response(
    response: ByteSlice,
    status_word: *mut u16,
) -> ByteArray {
    let result = response.as_slice().and_then(|r| Ok(apdu::parse_response(r)?));

    unwrap(result.map(|response| {
        if let Some(sw) = status_word.as_mut() {
            *sw = response.status_word().into();
        }

        response.payload().to_vec().into()
    }))
}

/// Determines whether the status word reports success.
#[no_mangle]
pub extern "C" fn loyalty_nfc_is_success(status_word: u16) -> bool {
    apdu::is_success(status_word.into())
}

/// Encodes the payload of a text record.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_encode_text_record(
    text: *const c_char,
    language_code: *const c_char,
    force_utf16: bool,
) -> ByteArray {
    let result = to_str(text).and_then(|text| {
        let language_code = to_str(language_code)?;

        Ok(ndef::encode_text_record(text, language_code, force_utf16)?.into())
    });

    unwrap(result)
}

/// Decodes the payload of a text record, returning the text.
/// Returns null if the text contains a NUL character.
/// The string must be freed with loyalty_nfc_string_free.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_decode_text_record(payload: ByteSlice) -> *mut c_char {
    let result = payload.as_slice().and_then(|payload| {
        let record = NdefRecord::new(Tnf::WellKnown, RTD_TEXT.to_vec(), payload.to_vec())?;

        to_c_string(ndef::decode_text_record(&record)?.text)
    });

    unwrap_or(result, null_mut())
}

/// Creates a new NFC card delegate from the function pointer.
/// This provided function will be called on transmitting APDU commands into the card.
#[no_mangle]
pub extern "C" fn loyalty_nfc_new_nfc_card(delegate: Delegate) -> *mut NfcCard {
    Box::into_raw(Box::new(NfcCard { delegate }))
}

/// Closes the NFC card.
/// Do not call this after passing the NFC card to loyalty_nfc_new_card.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_nfc_card_close(nfc_card: *mut NfcCard) {
    if !nfc_card.is_null() {
        let _ = Box::from_raw(nfc_card);
    }
}

/// Creates a new card from the NFC card, taking the ownership of it.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_new_card(nfc_card: *mut NfcCard) -> *const LoyaltyCard {
    match nfc_card.is_null() {
        true => unwrap_or(Err(Error::NullPointer), null()),
        _ => Rc::into_raw(Rc::new(Card::new(Box::from_raw(nfc_card)))),
    }
}

/// Closes the card.
/// Applications opened on the card keep it alive until they are closed as well.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_card_close(card: *const LoyaltyCard) {
    if !card.is_null() {
        let _ = Rc::from_raw(card);
    }
}

/// Opens the loyalty application on the card, selecting it by the AID in hex.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_new_loyalty_ap(
    card: *const LoyaltyCard,
    aid: *const c_char,
) -> *mut LoyaltyCardAp {
    let result = to_str(aid).and_then(|aid| {
        if card.is_null() {
            return Err(Error::NullPointer);
        }

        Rc::increment_strong_count(card);
        let card = Rc::from_raw(card);

        Ok(Box::into_raw(Box::new(LoyaltyAp::open((), card, aid)?)))
    });

    unwrap_or(result, null_mut())
}

/// Closes the opened loyalty application.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_loyalty_ap_close(loyalty_ap: *mut LoyaltyCardAp) {
    if !loyalty_ap.is_null() {
        let _ = Box::from_raw(loyalty_ap);
    }
}

/// Returns the account number received on opening.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_loyalty_ap_account(
    loyalty_ap: *const LoyaltyCardAp,
) -> *mut c_char {
    let result = loyalty_ap
        .as_ref()
        .ok_or(Error::NullPointer)
        .and_then(|ap| to_c_string(ap.account()));

    unwrap_or(result, null_mut())
}

/// Reads the message kept by the loyalty service.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_loyalty_ap_read_message(
    loyalty_ap: *const LoyaltyCardAp,
) -> *mut c_char {
    let result = loyalty_ap
        .as_ref()
        .ok_or(Error::NullPointer)
        .and_then(|ap| to_c_string(ap.read_message(())?));

    unwrap_or(result, null_mut())
}

/// Fetches the data object of the loyalty service.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_loyalty_ap_get_data(
    loyalty_ap: *const LoyaltyCardAp,
) -> *mut c_char {
    let result = loyalty_ap
        .as_ref()
        .ok_or(Error::NullPointer)
        .and_then(|ap| to_c_string(ap.get_data(())?));

    unwrap_or(result, null_mut())
}

/// Writes the message to the loyalty service, returning what it answered with.
#[no_mangle]
pub unsafe extern "C" fn loyalty_nfc_loyalty_ap_write_message(
    loyalty_ap: *const LoyaltyCardAp,
    message: *const c_char,
) -> *mut c_char {
    let result = to_str(message).and_then(|message| {
        let ap = loyalty_ap.as_ref().ok_or(Error::NullPointer)?;

        to_c_string(ap.write_message((), message)?)
    });

    unwrap_or(result, null_mut())
}
