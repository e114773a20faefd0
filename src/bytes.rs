use std::fmt;

use crate::error::Error;

/// Byte reader over one in-memory terminfo entry.
///
/// All multi-byte integers in the format are little-endian two's complement;
/// numeric capability width (2 or 4 bytes) is decided by the file magic and
/// threaded through as `width`.
#[derive(Clone)]
pub(crate) struct Cursor<'input> {
    buffer: &'input [u8],
    offset: usize,
}

impl<'input> Cursor<'input> {
    #[must_use]
    pub fn new(buffer: &'input [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self
            .buffer
            .get(self.offset)
            .ok_or(Error::Format("short read"))?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read one numeric capability at the magic-selected width.
    pub fn read_number(&mut self, width: usize) -> Result<i32, Error> {
        match width {
            4 => self.read_i32(),
            _ => self.read_i16().map(i32::from),
        }
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<&'input [u8], Error> {
        let end = self.offset + length;
        let bytes = self
            .buffer
            .get(self.offset..end)
            .ok_or(Error::Format("short read"))?;
        self.offset = end;
        Ok(bytes)
    }

    /// Skip one alignment byte iff `parity_of` is odd and more data follows.
    /// Entries legitimately end right where a pad byte would go.
    pub fn skip_pad(&mut self, parity_of: usize) {
        if parity_of % 2 == 1 && !self.is_at_end() {
            self.offset += 1;
        }
    }
}

/// NUL-terminated string starting at `offset` into `table`.
/// Returns the string bytes and the position of its terminator.
pub(crate) fn c_string(table: &[u8], offset: usize) -> Result<(&[u8], usize), Error> {
    let tail = table.get(offset..).ok_or(Error::Format("short read"))?;
    let nul = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Format("short read"))?;
    Ok((&tail[..nul], offset + nul))
}

struct CursorDebugBytes<'a>(&'a [u8]);

impl fmt::Debug for CursorDebugBytes<'_> {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[0x")?;
        for &b in self.0.iter().take(64) {
            write!(f, "{b:02x}")?;
        }
        if self.0.len() > 64 {
            f.write_str("...")?;
        }
        write!(f, "; {}]", self.0.len())
    }
}

impl fmt::Debug for Cursor<'_> {
    /// Debug-print only the unread part of the buffer
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest = CursorDebugBytes(self.buffer.get(self.offset..).unwrap_or_default());
        f.debug_struct("Cursor")
            .field("offset", &self.offset)
            .field("rest", &rest)
            .finish()
    }
}

#[test]
fn test_cursor_numbers() {
    let mut c = Cursor::new(&[0x1a, 0x01, 0xff, 0xff, 0x05, 0x00, 0x00, 0x00]);
    assert_eq!(0x011a, c.read_i16().unwrap());
    assert_eq!(-1, c.read_i16().unwrap());
    assert_eq!(5, c.read_i32().unwrap());
    assert!(c.is_at_end());
    assert!(c.read_u8().is_err());

    let mut c = Cursor::new(&[0xfe, 0xff, 0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(-2, c.read_number(2).unwrap());
    assert_eq!(-65538, c.read_number(4).unwrap());
}

#[test]
fn test_cursor_pad() {
    let mut c = Cursor::new(&[0x00, 0x07]);
    c.skip_pad(4); // even, no-op
    c.skip_pad(3);
    assert_eq!(7, c.read_u8().unwrap());
    // pad at the very end of the buffer is not consumed
    c.skip_pad(3);
    assert!(c.is_at_end());
}

#[test]
fn test_c_string() {
    let table = b"vt100\0ansi\0x";
    let (s, end) = c_string(table, 0).unwrap();
    assert_eq!(b"vt100", s);
    assert_eq!(5, end);
    let (s, end) = c_string(table, 6).unwrap();
    assert_eq!(b"ansi", s);
    assert_eq!(10, end);
    assert!(c_string(table, 11).is_err()); // no terminator
    assert!(c_string(table, 40).is_err()); // past the table
}
