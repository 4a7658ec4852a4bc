//! Scan input readers
//!
//! Inputs are read line by line and each line is scanned as one block.
//! Lines are yielded as raw bytes, so inputs need not be valid UTF-8.
//!
//! ```rust,no_run
//! use blockscan::input;
//!
//! // gzip inputs are decompressed, "-" reads stdin
//! for block in input::blocks(input::open("access.log.gz")?) {
//!     let block = block?;
//!     println!("{} bytes", block.len());
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, stdin, BufRead, BufReader, Read};
use std::path::Path;

/// Buffer size for input reading (128KB)
const BUFFER_SIZE: usize = 128 * 1024;

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open an input for block scanning
///
/// The path `-` reads stdin. Gzip data is recognised by its magic bytes,
/// whatever the file is called, and concatenated members are read as one
/// stream.
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let source: Box<dyn Read + Send> = if path.as_os_str() == "-" {
        Box::new(stdin())
    } else {
        Box::new(File::open(path)?)
    };

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source);
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        let decoder = MultiGzDecoder::new(reader);
        return Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, decoder)));
    }
    Ok(Box::new(reader))
}

/// Iterate over the lines of `reader` as byte blocks
///
/// The trailing `\n` (and a `\r` before it) is stripped from each block.
pub fn blocks<R: BufRead>(reader: R) -> Blocks<R> {
    Blocks {
        reader,
        done: false,
    }
}

/// Iterator returned by [`blocks`]
pub struct Blocks<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> Iterator for Blocks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn collect<R: BufRead>(reader: R) -> Vec<Vec<u8>> {
        blocks(reader).collect::<io::Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_plain_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "line 1").unwrap();
        writeln!(file, "line 2").unwrap();
        file.flush().unwrap();

        let lines = collect(open(file.path()).unwrap());
        assert_eq!(lines, vec![b"line 1".to_vec(), b"line 2".to_vec()]);
    }

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_detected_by_content() {
        for suffix in [".gz", ".log"] {
            let mut file = NamedTempFile::with_suffix(suffix).unwrap();
            file.write_all(&gzip("compressed\n")).unwrap();
            file.flush().unwrap();

            let lines = collect(open(file.path()).unwrap());
            assert_eq!(lines, vec![b"compressed".to_vec()]);
        }
    }

    #[test]
    fn test_plain_file_named_gz_is_read_as_is() {
        let mut file = NamedTempFile::with_suffix(".gz").unwrap();
        writeln!(file, "not compressed").unwrap();
        file.flush().unwrap();

        let lines = collect(open(file.path()).unwrap());
        assert_eq!(lines, vec![b"not compressed".to_vec()]);
    }

    #[test]
    fn test_concatenated_gzip_members() {
        let mut file = NamedTempFile::with_suffix(".gz").unwrap();
        file.write_all(&gzip("first\n")).unwrap();
        file.write_all(&gzip("second\n")).unwrap();
        file.flush().unwrap();

        let lines = collect(open(file.path()).unwrap());
        assert_eq!(lines, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(collect(open(file.path()).unwrap()).is_empty());
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let lines = collect(Cursor::new(b"one\r\ntwo\n\nthree".to_vec()));
        assert_eq!(
            lines,
            vec![b"one".to_vec(), b"two".to_vec(), Vec::new(), b"three".to_vec()]
        );
    }

    #[test]
    fn test_non_utf8_bytes_preserved() {
        let lines = collect(Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert_eq!(lines, vec![vec![0xff, 0xfe]]);
    }

    #[test]
    fn test_missing_file() {
        assert!(open("/nonexistent/blockscan/input.log").is_err());
    }
}
