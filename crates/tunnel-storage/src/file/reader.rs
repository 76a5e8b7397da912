use std::io::{self, Read, Seek, SeekFrom};

/// Number of bytes read per backward step.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Yields the lines of a seekable source from last to first.
///
/// The reader walks backward from `len` in fixed-size chunks, so a line split
/// across chunk boundaries is reassembled before it is returned. A trailing
/// `\r` is stripped. A final line without a terminating newline is returned
/// like any other line. Blank lines are yielded as empty strings; it is up
/// to the caller to skip them.
#[derive(Debug)]
pub struct ReverseLines<R> {
    reader: R,
    pos: u64,
    chunk_size: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R, len: u64) -> Self {
        Self::with_chunk_size(reader, len, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, len: u64, chunk_size: usize) -> Self {
        Self {
            reader,
            pos: len,
            chunk_size: chunk_size.max(1),
            buf: Vec::new(),
            done: false,
        }
    }

    /// Returns the next line walking backward, or `None` once the start of
    /// the source has been reached.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if let Some(newline) = self.buf.iter().rposition(|b| *b == b'\n') {
                let line = decode(&self.buf[newline + 1..])?;
                self.buf.truncate(newline);
                return Ok(Some(line));
            }

            if !self.read_chunk()? {
                self.done = true;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = decode(&self.buf)?;
                self.buf.clear();
                return Ok(Some(line));
            }
        }
    }

    /// Prepends the chunk ending at the current position to the buffer.
    /// Returns `false` at the start of the source.
    fn read_chunk(&mut self) -> io::Result<bool> {
        if self.pos == 0 {
            return Ok(false);
        }

        let size = self.pos.min(self.chunk_size as u64) as usize;
        self.pos -= size as u64;

        let mut chunk = vec![0u8; size];
        self.reader.seek(SeekFrom::Start(self.pos))?;
        self.reader.read_exact(&mut chunk)?;

        chunk.extend_from_slice(&self.buf);
        self.buf = chunk;
        Ok(true)
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(line) => line.map(Ok),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn decode(bytes: &[u8]) -> io::Result<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(data: &str, chunk_size: usize) -> Vec<String> {
        let len = data.len() as u64;
        ReverseLines::with_chunk_size(Cursor::new(data.as_bytes()), len, chunk_size)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn empty_source_has_no_lines() {
        assert!(lines("", 4).is_empty());
    }

    #[test]
    fn yields_lines_last_first() {
        assert_eq!(lines("one\ntwo\nthree", 1024), vec!["three", "two", "one"]);
    }

    #[test]
    fn trailing_newline_yields_blank_line_first() {
        assert_eq!(lines("one\ntwo\n", 1024), vec!["", "two", "one"]);
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(lines("one\r\ntwo\r\n", 1024), vec!["", "two", "one"]);
    }

    #[test]
    fn reassembles_lines_across_chunks() {
        let long = "x".repeat(50);
        let data = format!("{long}\nshort\n{long}y");
        for chunk_size in [1, 3, 7, 16, 1024] {
            assert_eq!(
                lines(&data, chunk_size),
                vec![format!("{long}y"), "short".to_string(), long.clone()],
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn respects_given_length() {
        let data = b"one\ntwo\nthree-not-yet-visible";
        let all = ReverseLines::new(Cursor::new(&data[..]), 8)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(all, vec!["", "two", "one"]);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let data = b"ok\n\xff\xfe";
        let mut reader = ReverseLines::new(Cursor::new(&data[..]), data.len() as u64);
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(reader.next().is_none());
    }
}
