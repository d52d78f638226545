//! The serialized per-partition CSX blob: the packed `ctl` control stream,
//! the values in emission order, per-row `ctl` offsets and the pattern-id
//! table the SpMV code generator consumes. A decoding iterator is provided
//! so consumers (and the test suite) can recover the encoded triples.

use std::collections::BTreeMap;

use crate::ctl::{
    read_fixed_int, read_variable_int, CtlBuilder, CTL_ID_MASK, CTL_ID_SPARSE, CTL_NR_BIT,
    CTL_RJMP_BIT, CTL_SIZE_MAX,
};
use crate::elems::{ix, us, CooElem, CsxIndex, CsxValue, DeltaRle, ElemKind};
use crate::order::IterOrder;
use crate::partition::SparsePartition;

/// One entry of a partition's pattern table; unit id `n` (n >= 1) refers
/// to `patterns[n - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternEntry {
    pub kind: IterOrder,
    pub delta: u32,
}

/// A fully encoded partition, ready for the SpMV code generator.
#[derive(Clone, Debug)]
pub struct CsxMatrix<I, V> {
    pub row_start: I,
    pub nr_rows: I,
    pub nr_cols: I,
    pub nr_nzeros: usize,
    pub ctl: Box<[u8]>,
    pub values: Box<[V]>,
    /// Starting `ctl` offset of each partition row, for row-parallel
    /// kernels.
    pub rowptr: Box<[usize]>,
    pub patterns: Vec<PatternEntry>,
    pub full_colind: bool,
    pub ucol_size: usize,
}

impl<I: CsxIndex, V: CsxValue> CsxMatrix<I, V> {
    /// Pack an encoded partition into its `ctl`/values form. The partition
    /// must be in HORIZONTAL order.
    pub fn from_partition(
        sp: &SparsePartition<I, V>,
        full_colind: bool,
        ucol_size: usize,
    ) -> Self {
        assert_eq!(
            sp.order(),
            IterOrder::Horizontal,
            "serialization requires HORIZONTAL order"
        );

        let nr_rows = us(sp.nr_rows());
        let mut ctl = CtlBuilder::new(sp.elems_size() * 2);
        let mut values: Vec<V> = Vec::with_capacity(sp.nr_nonzeros());
        let mut patterns: Vec<PatternEntry> = Vec::new();
        let mut ids: BTreeMap<(u8, u32), u8> = BTreeMap::new();
        let mut rowptr: Vec<usize> = Vec::with_capacity(nr_rows);
        let mut last_row: isize = -1;

        for i in 0..nr_rows {
            rowptr.push(ctl.len());
            let row = if i < sp.logical_rows() { sp.row(i) } else { &[] };
            if row.is_empty() {
                continue;
            }
            let jump = (i as isize - last_row) as usize;
            let mut nr = true;
            let mut last_col = 0usize;
            let mut idx = 0;
            while idx < row.len() {
                match &row[idx].kind {
                    ElemKind::Patterned { pattern, vals } => {
                        let id = pattern_id(&mut ids, &mut patterns, pattern);
                        let c = us(row[idx].col);
                        debug_assert!(pattern.size as usize <= CTL_SIZE_MAX);
                        ctl.append_ctl_head(
                            nr,
                            jump,
                            id,
                            pattern.size as u8,
                            (c - last_col) as u64,
                            ucol_size,
                            full_colind,
                        );
                        values.extend_from_slice(vals);
                        last_col = c;
                        idx += 1;
                    }
                    ElemKind::Scalar(_) => {
                        let start = idx;
                        while idx < row.len()
                            && row[idx].pattern().is_none()
                            && idx - start < CTL_SIZE_MAX
                        {
                            idx += 1;
                        }
                        let chunk = &row[start..idx];
                        let c0 = us(chunk[0].col);
                        ctl.append_ctl_head(
                            nr,
                            jump,
                            CTL_ID_SPARSE,
                            chunk.len() as u8,
                            (c0 - last_col) as u64,
                            ucol_size,
                            full_colind,
                        );
                        for e in chunk {
                            if let ElemKind::Scalar(v) = e.kind {
                                values.push(v);
                            }
                        }
                        let mut prev = c0;
                        for e in &chunk[1..] {
                            let c = us(e.col);
                            ctl.append_variable_int((c - prev) as u64);
                            prev = c;
                        }
                        last_col = prev;
                    }
                }
                nr = false;
            }
            last_row = i as isize;
        }

        let nr_nzeros = values.len();
        CsxMatrix {
            row_start: sp.row_start(),
            nr_rows: sp.nr_rows(),
            nr_cols: sp.nr_cols(),
            nr_nzeros,
            ctl: ctl.finalize(),
            values: values.into_boxed_slice(),
            rowptr: rowptr.into_boxed_slice(),
            patterns,
            full_colind,
            ucol_size,
        }
    }

    pub fn ctl_size(&self) -> usize {
        self.ctl.len()
    }

    /// Decode the blob back into its `(row, col, value)` triples,
    /// partition-local and one-based, in emission order.
    pub fn points(&self) -> CsxPoints<'_, I, V> {
        CsxPoints {
            m: self,
            pos: 0,
            vpos: 0,
            row: -1,
            last_col: 0,
            state: UnitState::Idle,
        }
    }
}

fn pattern_id(
    ids: &mut BTreeMap<(u8, u32), u8>,
    patterns: &mut Vec<PatternEntry>,
    p: &DeltaRle,
) -> u8 {
    let key = (u8::from(p.kind), p.delta);
    if let Some(&id) = ids.get(&key) {
        return id;
    }
    let id = patterns.len() as u8 + 1;
    assert!(
        id <= CTL_ID_MASK,
        "partition uses more than {CTL_ID_MASK} distinct patterns"
    );
    patterns.push(PatternEntry {
        kind: p.kind,
        delta: p.delta,
    });
    ids.insert(key, id);
    id
}

/// Horizontal-space offset of a pattern's `i`-th element from its head.
fn pattern_offset(kind: IterOrder, delta: usize, i: usize) -> (usize, isize) {
    match kind {
        IterOrder::Horizontal => (0, (i * delta) as isize),
        IterOrder::Vertical => (i * delta, 0),
        IterOrder::Diagonal => (i * delta, (i * delta) as isize),
        IterOrder::RevDiagonal => (i * delta, -((i * delta) as isize)),
        t if t.is_row_block() => {
            let k = t.block_align();
            (i % k, (i / k) as isize)
        }
        t if t.is_col_block() => {
            let k = t.block_align();
            (i / k, (i % k) as isize)
        }
        _ => unreachable!("sentinel order in a pattern"),
    }
}

enum UnitState {
    Idle,
    Plain {
        remaining: usize,
        prev_col: usize,
        first: bool,
    },
    Pattern {
        kind: IterOrder,
        delta: usize,
        size: usize,
        head_col: usize,
        idx: usize,
    },
}

/// Iterator over the triples encoded in a [`CsxMatrix`].
pub struct CsxPoints<'a, I, V> {
    m: &'a CsxMatrix<I, V>,
    pos: usize,
    vpos: usize,
    row: isize,
    last_col: usize,
    state: UnitState,
}

impl<'a, I: CsxIndex, V: CsxValue> Iterator for CsxPoints<'a, I, V> {
    type Item = CooElem<I, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                UnitState::Plain {
                    ref mut remaining,
                    ref mut prev_col,
                    ref mut first,
                } => {
                    if *remaining == 0 {
                        self.last_col = *prev_col;
                        self.state = UnitState::Idle;
                        continue;
                    }
                    if !*first {
                        let d = read_variable_int(&self.m.ctl, &mut self.pos) as usize;
                        *prev_col += d;
                    }
                    *first = false;
                    *remaining -= 1;
                    let col = *prev_col;
                    let val = self.m.values[self.vpos];
                    self.vpos += 1;
                    return Some(CooElem::new(ix(self.row as usize + 1), ix(col), val));
                }
                UnitState::Pattern {
                    kind,
                    delta,
                    size,
                    head_col,
                    ref mut idx,
                } => {
                    if *idx == size {
                        self.last_col = head_col;
                        self.state = UnitState::Idle;
                        continue;
                    }
                    let (dr, dc) = pattern_offset(kind, delta, *idx);
                    *idx += 1;
                    let row = self.row as usize + 1 + dr;
                    let col = (head_col as isize + dc) as usize;
                    let val = self.m.values[self.vpos];
                    self.vpos += 1;
                    return Some(CooElem::new(ix(row), ix(col), val));
                }
                UnitState::Idle => {
                    if self.pos >= self.m.ctl.len() {
                        return None;
                    }
                    let flags = self.m.ctl[self.pos];
                    let size = self.m.ctl[self.pos + 1] as usize;
                    self.pos += 2;
                    if flags & CTL_NR_BIT != 0 {
                        let jump = if flags & CTL_RJMP_BIT != 0 {
                            read_variable_int(&self.m.ctl, &mut self.pos) as isize
                        } else {
                            1
                        };
                        self.row += jump;
                        self.last_col = 0;
                    }
                    let ucol = if self.m.full_colind {
                        read_fixed_int(&self.m.ctl, &mut self.pos, self.m.ucol_size) as usize
                    } else {
                        read_variable_int(&self.m.ctl, &mut self.pos) as usize
                    };
                    let col = self.last_col + ucol;
                    let id = flags & CTL_ID_MASK;
                    self.state = if id == CTL_ID_SPARSE {
                        UnitState::Plain {
                            remaining: size,
                            prev_col: col,
                            first: true,
                        }
                    } else {
                        let entry = self.m.patterns[id as usize - 1];
                        UnitState::Pattern {
                            kind: entry.kind,
                            delta: entry.delta as usize,
                            size,
                            head_col: col,
                            idx: 0,
                        }
                    };
                }
            }
        }
    }
}
