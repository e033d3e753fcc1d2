use crate::config::READ_BUFFER_SIZE;
use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Streams a dump one line at a time without ever holding more than a line in memory.
///
/// Lines are decoded leniently: invalid UTF-8 is replaced rather than failing the run,
/// since a handful of corrupt records must not cost the whole pass.
pub struct DumpReader {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    lossy_lines: u64,
}

impl DumpReader {
    /// Opens `path` (or stdin for `-`). `.bz2` inputs are decompressed, as is any input
    /// when `bz2` is set.
    pub fn open(path: &str, bz2: bool) -> Result<Self> {
        let compressed = bz2 || path.ends_with(".bz2");

        if path == "-" {
            let stdin = io::stdin().lock();
            return Ok(if compressed {
                Self::from_reader(MultiBzDecoder::new(stdin))
            } else {
                Self::from_buf_read(Box::new(stdin))
            });
        }

        let file = File::open(Path::new(path))
            .with_context(|| format!("Failed to open dump at: {}", path))?;
        Ok(if compressed {
            Self::from_reader(MultiBzDecoder::new(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                file,
            )))
        } else {
            Self::from_reader(file)
        })
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self::from_buf_read(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, reader)))
    }

    fn from_buf_read(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            lossy_lines: 0,
        }
    }

    /// Number of lines so far that contained invalid UTF-8.
    pub fn lossy_lines(&self) -> u64 {
        self.lossy_lines
    }
}

impl Iterator for DumpReader {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                let line = match String::from_utf8(std::mem::take(&mut self.buf)) {
                    Ok(line) => line,
                    Err(e) => {
                        self.lossy_lines += 1;
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
