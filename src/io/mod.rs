pub mod fasta;
pub mod fastq;
pub mod sam;

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// `-` 表示标准输入
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let fh = std::fs::File::open(path).with_context(|| format!("cannot open '{}'", path.display()))?;
    Ok(Box::new(BufReader::new(fh)))
}

/// 给了路径就写文件，否则写标准输出
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => {
            let fh = std::fs::File::create(p).with_context(|| format!("cannot create '{}'", p.display()))?;
            Box::new(BufWriter::new(fh))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    })
}
