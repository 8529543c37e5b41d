//! Bounds-checked cursor over a received buffer.

/// The buffer ended before the requested octets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Truncated {
    pub offset: usize,
}

/// Stateful, simple reader used to walk wire structures.
pub(crate) struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from the buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Current position of the cursor.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Octets left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Reads a next octet and seeks the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<u8, Truncated> {
        self.read(1).map(|bytes| bytes[0])
    }

    /// Reads a big-endian u16 and seeks the cursor.
    pub fn next_u16(&mut self) -> Result<u16, Truncated> {
        self.read(2).map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian u32 and seeks the cursor.
    pub fn next_u32(&mut self) -> Result<u32, Truncated> {
        self.read(4)
            .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads data of specified size and seeks the cursor.
    pub fn read(&mut self, length: usize) -> Result<&'a [u8], Truncated> {
        let end = self
            .cursor
            .checked_add(length)
            .filter(|end| *end <= self.buffer.len())
            .ok_or(Truncated {
                offset: self.cursor,
            })?;

        let bytes = &self.buffer[self.cursor..end];
        self.cursor = end;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let mut reader = Reader::new(&[0x01, 0x00, 0x02, 0x03]);

        assert_eq!(Ok(0x01), reader.next());
        assert_eq!(Ok(0x0002), reader.next_u16());
        assert_eq!(3, reader.position());
        assert_eq!(1, reader.remaining());
        assert_eq!(Err(Truncated { offset: 3 }), reader.read(2));
        assert_eq!(Ok(&[0x03][..]), reader.read(1));
        assert_eq!(Err(Truncated { offset: 4 }), reader.next());
    }
}
