//! Request feed
//!
//! Reads allocation requests, one per line, in the form
//! `<label> <sizeKB>`, e.g. `A 1000`. The label is the first character of
//! the line and the size is everything after the first space.
//!
//! Lines without a space in their first [`SPACE_SCAN_LIMIT`] characters, or
//! starting with one, are skipped. Bytes that are not valid UTF-8 are read
//! as replacement characters. A size that is not an integer ends the feed:
//! the error is yielded once and nothing after it is read.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error};

/// How far into a line to look for the separating space
pub const SPACE_SCAN_LIMIT: usize = 100;

/// One allocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Request {
    pub label: char,
    pub size_kb: i64,
}

impl Request {
    pub fn new(label: char, size_kb: i64) -> Self {
        Self { label, size_kb }
    }
}

/// Parse one request line.
///
/// Returns `Ok(None)` for lines that should be skipped.
pub fn parse_line(line: &str) -> Result<Option<Request>> {
    let space = line
        .char_indices()
        .take(SPACE_SCAN_LIMIT)
        .find(|&(_, c)| c == ' ')
        .map(|(offset, _)| offset);

    let offset = match space {
        Some(offset) if offset > 0 => offset,
        _ => return Ok(None),
    };

    let label = match line.chars().next() {
        Some(label) => label,
        None => return Ok(None),
    };

    let size = &line[offset + 1..];
    let size_kb = size.parse::<i64>().map_err(|e| {
        Error::Format(format!("size {:?} is not a whole number of KB: {}", size, e))
    })?;

    Ok(Some(Request { label, size_kb }))
}

/// Iterator of requests read from a line source
///
/// Yields `Err` at most once; the feed is finished afterwards.
pub struct RequestReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            done: false,
        }
    }

    /// Read the next raw line without its `\n` or `\r\n` terminator.
    ///
    /// Returns `Ok(false)` at end of input.
    fn read_line(&mut self) -> std::io::Result<bool> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(false);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(true)
    }
}

impl RequestReader<BufReader<File>> {
    /// Open a request file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Input(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for RequestReader<R> {
    type Item = Result<Request>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.read_line() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    self.done = true;
                    error!(line = self.line_no + 1, "Failed to read request: {}", e);
                    return Some(Err(Error::Input(format!(
                        "line {}: {}",
                        self.line_no + 1,
                        e
                    ))));
                }
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            match parse_line(&line) {
                Ok(Some(request)) => return Some(Ok(request)),
                Ok(None) => {
                    debug!(line = self.line_no, "Skipping line without a request");
                }
                Err(e) => {
                    self.done = true;
                    error!(line = self.line_no, "Malformed request: {}", e);
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() -> Result<()> {
        assert_eq!(parse_line("A 1000")?, Some(Request::new('A', 1000)));
        assert_eq!(parse_line("z 0")?, Some(Request::new('z', 0)));
        // label is the first character even when the space comes later
        assert_eq!(parse_line("AB 12")?, Some(Request::new('A', 12)));
        Ok(())
    }

    #[test]
    fn test_parse_line_skips() -> Result<()> {
        assert_eq!(parse_line("")?, None);
        assert_eq!(parse_line("A1000")?, None);
        assert_eq!(parse_line(" 1000")?, None);

        let far = format!("{} 5", "A".repeat(SPACE_SCAN_LIMIT));
        assert_eq!(parse_line(&far)?, None);

        let near = format!("{} 5", "A".repeat(SPACE_SCAN_LIMIT - 1));
        assert_eq!(parse_line(&near)?, Some(Request::new('A', 5)));
        Ok(())
    }

    #[test]
    fn test_parse_line_bad_size() {
        assert!(matches!(parse_line("A ten"), Err(Error::Format(_))));
        assert!(matches!(parse_line("A "), Err(Error::Format(_))));
        assert!(matches!(parse_line("A  5"), Err(Error::Format(_))));
        assert!(matches!(parse_line("A 5.5"), Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_line_signed_size() -> Result<()> {
        assert_eq!(parse_line("A -5")?, Some(Request::new('A', -5)));
        assert_eq!(parse_line("B +7")?, Some(Request::new('B', 7)));
        Ok(())
    }

    #[test]
    fn test_reader_negative_size_keeps_going() {
        let items: Vec<_> = RequestReader::new(Cursor::new("A -5\nB 10\n"))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items, vec![Request::new('A', -5), Request::new('B', 10)]);
    }

    #[test]
    fn test_reader_invalid_utf8() {
        let input: &[u8] = b"A 10\n\xff\xfejunk\n\xfe 4\nB 10\n";
        let items: Vec<_> = RequestReader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            items,
            vec![
                Request::new('A', 10),
                Request::new('\u{FFFD}', 4),
                Request::new('B', 10),
            ]
        );
    }

    #[test]
    fn test_reader_skips_and_stops() {
        let input = "A 10\nnospace\n\nB 20\nC x\nD 30\n";
        let items: Vec<_> = RequestReader::new(Cursor::new(input)).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &Request::new('A', 10));
        assert_eq!(items[1].as_ref().unwrap(), &Request::new('B', 20));
        assert!(matches!(items[2], Err(Error::Format(_))));
    }

    #[test]
    fn test_reader_crlf() {
        let input = "A 10\r\nB 20\r\n";
        let items: Vec<_> = RequestReader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items, vec![Request::new('A', 10), Request::new('B', 20)]);
    }

    #[test]
    fn test_open_missing_file() {
        let path = std::env::temp_dir().join("buddysim_missing_requests.txt");
        assert!(matches!(RequestReader::open(&path), Err(Error::Input(_))));
    }
}
