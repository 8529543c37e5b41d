use crate::apdu::{Error, StatusWord};

/// An response that was received from the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    trailer: StatusWord,
}

impl Response {
    /// Parses a response from the octets.
    /// The last two octets are the status word, anything before them is the payload.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() < 2 {
            return Err(Error::MalformedResponse(bytes.len()));
        }

        let trailer = bytes.split_off(bytes.len() - 2);

        Ok(Self {
            payload: bytes,
            trailer: StatusWord::from_bytes(trailer[0], trailer[1]),
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn status_word(&self) -> StatusWord {
        self.trailer
    }

    /// Determines whether the response indicates success or not.
    pub fn is_ok(&self) -> bool {
        self.trailer.is_success()
    }

    /// Converts the response to a result of octets.
    /// The payload of a failed response is dropped.
    pub fn into_result(self) -> Result<Vec<u8>, StatusWord> {
        let is_ok = self.is_ok();
        let Self { payload, trailer } = self;

        match is_ok {
            true => Ok(payload),
            _ => Err(trailer),
        }
    }
}

impl TryFrom<Vec<u8>> for Response {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let ok = Response::from_bytes(vec![b'4', b'2', 0x90, 0x00]).unwrap();
        assert_eq!(Ok(b"42".to_vec()), ok.into_result());

        let err = Response::try_from(vec![0xFF, 0x6A, 0x82]).unwrap();
        assert_eq!(&[0xFF], err.payload());
        assert_eq!(Err(StatusWord::new(0x6A82)), err.into_result());
    }
}
