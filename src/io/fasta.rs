use anyhow::Result;
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    /// upper-cased, whitespace stripped
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    pending_header: Option<String>,
    done: bool,
}

fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.trim().splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    (id, desc)
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: Vec::new(), pending_header: None, done: false }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        Ok(self.reader.read_until(b'\n', &mut self.line)? > 0)
    }

    fn header_of_line(&self) -> Option<String> {
        self.line
            .strip_prefix(b">")
            .map(|h| String::from_utf8_lossy(h).trim_end().to_string())
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // skip anything before the first header, including ';' comment lines
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                if !self.read_line()? {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(h) = self.header_of_line() {
                    break h;
                }
            },
        };
        let (id, desc) = split_header(&header);

        let mut seq = Vec::new();
        loop {
            if !self.read_line()? {
                self.done = true;
                break;
            }
            if let Some(h) = self.header_of_line() {
                self.pending_header = Some(h);
                break;
            }
            if self.line.first() == Some(&b';') {
                continue;
            }
            seq.extend(
                self.line
                    .iter()
                    .filter(|b| !b.is_ascii_whitespace())
                    .map(u8::to_ascii_uppercase),
            );
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}
