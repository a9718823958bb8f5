// LogSections - core/lines.rs
//
// Line iteration over any BufRead with lossy UTF-8 decoding.
// Invalid byte sequences become U+FFFD instead of aborting the scan.
// `\n`, `\r\n` and a lone `\r` all end a line.

use std::io::{self, BufRead};

/// Iterator over the lines of a reader, without line terminators.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
    /// The previous line ended in `\r`; a `\n` right after it belongs to it.
    skip_lf: bool,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            skip_lf: false,
        }
    }

    /// Read up to the next terminator into `buf`. Returns `false` at end of
    /// input with nothing read.
    fn read_line(&mut self) -> io::Result<bool> {
        self.buf.clear();
        let mut read_any = false;
        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(read_any);
            }
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }

            read_any = true;
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    self.buf.extend_from_slice(&available[..end]);
                    self.skip_lf = available[end] == b'\r';
                    self.reader.consume(end + 1);
                    return Ok(true);
                }
                None => {
                    let len = available.len();
                    self.buf.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_line() {
            Ok(false) => None,
            Ok(true) => Some(Ok(String::from_utf8_lossy(&self.buf).into_owned())),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8]) -> Vec<String> {
        LossyLines::new(input).map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_splits_lf_and_crlf() {
        assert_eq!(collect(b"a\r\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lone_cr_ends_a_line() {
        assert_eq!(collect(b"a\rb\r\rc\r"), vec!["a", "b", "", "c"]);
        assert_eq!(collect(b"a\r\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_crlf_split_across_buffer_refills() {
        let reader = io::BufReader::with_capacity(1, &b"ab\r\ncd\r\n\r\nef"[..]);
        let lines: Vec<_> = LossyLines::new(reader).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["ab", "cd", "", "ef"]);
    }

    #[test]
    fn test_trailing_newline_adds_no_empty_line() {
        assert_eq!(collect(b"a\nb\n"), vec!["a", "b"]);
        assert_eq!(collect(b"a\n\n"), vec!["a", ""]);
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(collect(b"ok\n\xff\xfe bad\n"), vec!["ok", "\u{fffd}\u{fffd} bad"]);
    }
}
