use anyhow::{anyhow, bail, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl FastqRecord {
    /// 去掉 `/1` `/2` 后缀的 read 名
    pub fn template_name(&self) -> &str {
        let id = self.id.as_str();
        id.strip_suffix("/1").or_else(|| id.strip_suffix("/2")).unwrap_or(id)
    }
}

pub struct FastqReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    line_no: u64,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: Vec::new(), line_no: 0, done: false }
    }

    /// 读下一行并去掉换行符，EOF 返回 `None`
    fn next_line(&mut self) -> Result<Option<&[u8]>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(Some(&self.line))
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // header, tolerating blank lines between records
        let header = loop {
            match self.next_line()?.map(<[u8]>::to_vec) {
                None => {
                    self.done = true;
                    return Ok(None);
                }
                Some(l) if l.is_empty() => continue,
                Some(l) => break l,
            }
        };
        let header_line = self.line_no;
        let header = header
            .strip_prefix(b"@")
            .ok_or_else(|| anyhow!("line {}: FASTQ header not starting with '@'", header_line))?;
        let header = String::from_utf8_lossy(header);
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let seq = match self.next_line()?.map(<[u8]>::to_vec) {
            Some(s) => s,
            None => bail!("line {}: unexpected EOF after header of '{}'", header_line, id),
        };

        let has_plus = matches!(self.next_line()?, Some(l) if l.starts_with(b"+"));
        if !has_plus {
            bail!("line {}: missing '+' separator for '{}'", self.line_no, id);
        }

        let qual = match self.next_line()?.map(<[u8]>::to_vec) {
            Some(q) => q,
            None => bail!("line {}: missing quality line for '{}'", self.line_no, id),
        };
        if qual.len() != seq.len() {
            bail!(
                "line {}: '{}' has {} bases but {} quality values",
                self.line_no,
                id,
                seq.len(),
                qual.len()
            );
        }

        Ok(Some(FastqRecord { id, desc, seq, qual }))
    }
}

/// 同步读取两个 FASTQ 文件中的 mate
pub struct PairedFastqReader<R1: BufRead, R2: BufRead> {
    r1: FastqReader<R1>,
    r2: FastqReader<R2>,
    pairs: u64,
}

impl<R1: BufRead, R2: BufRead> PairedFastqReader<R1, R2> {
    pub fn new(r1: R1, r2: R2) -> Self {
        Self { r1: FastqReader::new(r1), r2: FastqReader::new(r2), pairs: 0 }
    }

    pub fn next_pair(&mut self) -> Result<Option<(FastqRecord, FastqRecord)>> {
        match (self.r1.next_record()?, self.r2.next_record()?) {
            (None, None) => Ok(None),
            (Some(a), Some(b)) => {
                if a.template_name() != b.template_name() {
                    bail!(
                        "pair {}: mate names differ ('{}' vs '{}')",
                        self.pairs + 1,
                        a.id,
                        b.id
                    );
                }
                self.pairs += 1;
                Ok(Some((a, b)))
            }
            (Some(_), None) => bail!("second read file ended after {} reads, first has more", self.pairs),
            (None, Some(_)) => bail!("first read file ended after {} reads, second has more", self.pairs),
        }
    }

    /// 至多 `n` 对；返回空批次表示两个文件都已读完
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<(FastqRecord, FastqRecord)>> {
        let mut batch = Vec::with_capacity(n);
        while batch.len() < n {
            match self.next_pair()? {
                Some(p) => batch.push(p),
                None => break,
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_records() {
        let data = b"@r1/1 extra\nACGT\n+\nIIII\n\n@r2\nGG\n+r2\n#I\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        let a = r.next_record().unwrap().unwrap();
        assert_eq!(a.id, "r1/1");
        assert_eq!(a.template_name(), "r1");
        assert_eq!(a.desc.as_deref(), Some("extra"));
        assert_eq!(a.qual, b"IIII");
        let b = r.next_record().unwrap().unwrap();
        assert_eq!(b.seq, b"GG");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn length_mismatch_reports_line() {
        let data = b"@r1\nACGT\n+\nIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        let err = r.next_record().unwrap_err().to_string();
        assert!(err.contains("line 4"), "{}", err);
    }

    #[test]
    fn bad_header_is_error() {
        let mut r = FastqReader::new(Cursor::new(&b">r1\nAC\n+\nII\n"[..]));
        assert!(r.next_record().is_err());
    }

    #[test]
    fn paired_reader_checks_names_and_lengths() {
        let r1 = b"@p1/1\nAC\n+\nII\n@p2/1\nGG\n+\nII\n";
        let r2 = b"@p1/2\nTT\n+\nII\n@p2/2\nCC\n+\nII\n";
        let mut pr = PairedFastqReader::new(Cursor::new(&r1[..]), Cursor::new(&r2[..]));
        let batch = pr.next_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].1.seq, b"CC");
        assert!(pr.next_batch(10).unwrap().is_empty());

        let short = b"@p1/2\nTT\n+\nII\n";
        let mut pr = PairedFastqReader::new(Cursor::new(&r1[..]), Cursor::new(&short[..]));
        assert!(pr.next_pair().unwrap().is_some());
        assert!(pr.next_pair().is_err());

        let other = b"@q1/2\nTT\n+\nII\n";
        let mut pr = PairedFastqReader::new(Cursor::new(&r1[..]), Cursor::new(&other[..]));
        assert!(pr.next_pair().is_err());
    }
}
