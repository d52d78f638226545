//! A compact Matrix Market (coordinate format) reader: enough of the
//! format to feed the encoder with `real`, `integer` and `pattern`
//! matrices, `general` or `symmetric`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use csx::CooElem;

#[derive(Debug)]
pub struct MmfMatrix {
    pub nr_rows: i64,
    pub nr_cols: i64,
    pub symmetric: bool,
    /// Stored entries, sorted row-major. For symmetric matrices these are
    /// normalized to the lower triangle plus the diagonal.
    pub entries: Vec<CooElem<i64, f64>>,
}

impl MmfMatrix {
    /// The full coordinate list, mirroring the implicit upper triangle of
    /// a symmetric matrix, sorted row-major.
    pub fn expanded(&self) -> Vec<CooElem<i64, f64>> {
        let mut out = self.entries.clone();
        if self.symmetric {
            out.extend(
                self.entries
                    .iter()
                    .filter(|p| p.row != p.col)
                    .map(|p| CooElem::new(p.col, p.row, p.val)),
            );
        }
        out.sort_by(|a, b| (a.row, a.col).cmp(&(b.row, b.col)));
        out
    }
}

pub fn read(path: &Path) -> Result<MmfMatrix> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let banner = lines
        .next()
        .context("empty file")?
        .context("reading the banner")?;
    let fields: Vec<String> = banner.split_whitespace().map(str::to_lowercase).collect();
    ensure!(
        fields.len() == 5 && fields[0] == "%%matrixmarket" && fields[1] == "matrix",
        "not a Matrix Market file"
    );
    ensure!(
        fields[2] == "coordinate",
        "only coordinate format is supported, found '{}'",
        fields[2]
    );
    let pattern = match fields[3].as_str() {
        "real" | "integer" => false,
        "pattern" => true,
        other => bail!("unsupported value type '{other}'"),
    };
    let symmetric = match fields[4].as_str() {
        "general" => false,
        "symmetric" => true,
        other => bail!("unsupported symmetry '{other}'"),
    };

    let mut header: Option<(i64, i64, usize)> = None;
    let mut entries: Vec<CooElem<i64, f64>> = Vec::new();
    for line in lines {
        let line = line.context("reading entries")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let mut tok = line.split_whitespace();
        match header {
            None => {
                let nr_rows: i64 = parse_tok(&mut tok, "row count")?;
                let nr_cols: i64 = parse_tok(&mut tok, "column count")?;
                let nnz: usize = parse_tok(&mut tok, "nonzero count")?;
                entries.reserve(nnz);
                header = Some((nr_rows, nr_cols, nnz));
            }
            Some((nr_rows, nr_cols, _)) => {
                let row: i64 = parse_tok(&mut tok, "row index")?;
                let mut col: i64 = parse_tok(&mut tok, "column index")?;
                let val: f64 = if pattern {
                    1.0
                } else {
                    parse_tok(&mut tok, "value")?
                };
                ensure!(
                    row >= 1 && row <= nr_rows && col >= 1 && col <= nr_cols,
                    "entry ({row}, {col}) outside the {nr_rows}x{nr_cols} matrix"
                );
                let mut row = row;
                if symmetric && col > row {
                    std::mem::swap(&mut row, &mut col);
                }
                entries.push(CooElem::new(row, col, val));
            }
        }
    }

    let (nr_rows, nr_cols, nnz) = header.context("missing size header")?;
    ensure!(
        entries.len() == nnz,
        "expected {nnz} entries, found {}",
        entries.len()
    );
    if symmetric {
        ensure!(nr_rows == nr_cols, "symmetric matrix is not square");
    }
    entries.sort_by(|a, b| (a.row, a.col).cmp(&(b.row, b.col)));

    Ok(MmfMatrix {
        nr_rows,
        nr_cols,
        symmetric,
        entries,
    })
}

fn parse_tok<'a, T: std::str::FromStr>(
    tok: &mut impl Iterator<Item = &'a str>,
    what: &'static str,
) -> Result<T> {
    let s = tok.next().with_context(|| format!("missing {what}"))?;
    s.parse()
        .map_err(|_| anyhow::anyhow!("invalid {what}: '{s}'"))
}
