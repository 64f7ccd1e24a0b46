use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::input::InputError;
use crate::input::gz::open_maybe_gz;

fn read_lines(path: &Path) -> Result<Vec<String>, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let mut lines = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

pub fn write_barcodes(path: &Path, barcodes: &[String]) -> Result<(), InputError> {
    let mut w = BufWriter::new(File::create(path)?);
    for barcode in barcodes {
        writeln!(w, "{barcode}")?;
    }
    w.flush()?;
    Ok(())
}

/// Gene indices, one per line or comma separated; `#` starts a comment.
pub fn parse_index_list(path: &Path) -> Result<Vec<usize>, InputError> {
    let mut out = Vec::new();
    for line in read_lines(path)? {
        let content = line.split('#').next().unwrap_or_default();
        out.extend(parse_index_csv(content)?);
    }
    Ok(out)
}

pub fn parse_index_csv(raw: &str) -> Result<Vec<usize>, InputError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| InputError::InvalidInput(format!("invalid gene index: {s}")))
        })
        .collect()
}
