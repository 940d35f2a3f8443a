//! Line-oriented reading from the positioning link.

use arrayvec::ArrayVec;
use std::io;

use err::LinkError;

const LINE_LENGTH: usize = 256;

/// Reads `\n`-terminated lines from an already-open, already-configured
/// serial channel (or anything else that implements [`io::Read`]).
pub struct LineReader<R> {
    input: io::Bytes<R>,
}

impl<R: io::Read> LineReader<R> {
    pub fn new(input: R) -> Self {
        LineReader {
            input: input.bytes(),
        }
    }

    /// Block until a full line has arrived and return it without its
    /// terminator. Carriage returns are dropped. A line longer than the
    /// internal buffer fails with [`LinkError::LineOverflow`]; a source
    /// that ends before delivering any data fails with [`LinkError::Eof`].
    pub fn read_line(&mut self) -> Result<String, LinkError> {
        let mut buf = ArrayVec::<[u8; LINE_LENGTH]>::new();
        loop {
            match self.input.next() {
                None => {
                    if buf.is_empty() {
                        return Err(LinkError::Eof);
                    }
                    break;
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(b'\n')) => break,
                Some(Ok(b'\r')) => (),
                Some(Ok(c)) => {
                    if let Err(e) = buf.try_push(c) {
                        return Err((e, buf.capacity()).into());
                    }
                }
            }
        }
        // NMEA is plain ASCII; anything else is replaced, not rejected,
        // so a burst of line noise cannot take the reader down.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use err::LinkError;
    use std::io::Cursor;

    #[test]
    fn reads_lines_and_strips_terminators() {
        let mut reader = LineReader::new(Cursor::new(b"$GNGGA,1\r\n$GNRMC,2\n".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "$GNGGA,1");
        assert_eq!(reader.read_line().unwrap(), "$GNRMC,2");
    }

    #[test]
    fn returns_trailing_data_without_newline() {
        let mut reader = LineReader::new(Cursor::new(b"$GNGGA,1".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "$GNGGA,1");
        assert_matches!(reader.read_line(), Err(LinkError::Eof));
    }

    #[test]
    fn empty_source_is_eof() {
        let mut reader = LineReader::new(Cursor::new(Vec::new()));
        assert_matches!(reader.read_line(), Err(LinkError::Eof));
    }

    #[test]
    fn empty_line_is_not_an_error() {
        let mut reader = LineReader::new(Cursor::new(b"\n$GNGGA,1\n".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "");
        assert_eq!(reader.read_line().unwrap(), "$GNGGA,1");
    }

    #[test]
    fn overlong_line_overflows() {
        let mut long = vec![b'x'; LINE_LENGTH + 1];
        long.push(b'\n');
        let mut reader = LineReader::new(Cursor::new(long));
        assert_matches!(reader.read_line(), Err(LinkError::LineOverflow(_, _)));
    }
}
