//! In-core mutable representation of one horizontal slab of a sparse
//! matrix, supporting lossless transforms between iteration orders and
//! sub-window extraction for sampling.

use std::iter::Peekable;
use std::mem;

use num::integer::lcm;

use crate::elems::{ix, us, CsxIndex, CsxValue, Elem, RowElem, RowElement};
use crate::order::IterOrder;
use crate::transform::{convert, Dims};

/// A sparse sub-matrix starting at `row_start` of the original matrix.
///
/// Elements are stored packed in row-major order of the current iteration
/// order; `rowptr[i]` is the index of the first element of logical row `i`.
/// Within a row, columns are strictly increasing.
#[derive(Clone, Debug)]
pub struct SparsePartition<I, V> {
    nr_rows: I,
    nr_cols: I,
    nr_nzeros: usize,
    row_start: I,
    order: IterOrder,
    elems: Vec<Elem<I, V>>,
    rowptr: Vec<usize>,
}

impl<I: CsxIndex, V: CsxValue> SparsePartition<I, V> {
    /// An empty HORIZONTAL partition with the given global dimensions.
    pub fn new(nr_rows: I, nr_cols: I) -> Self {
        SparsePartition {
            nr_rows,
            nr_cols,
            nr_nzeros: 0,
            row_start: I::zero(),
            order: IterOrder::Horizontal,
            elems: Vec::new(),
            rowptr: vec![0],
        }
    }

    pub fn nr_rows(&self) -> I {
        self.nr_rows
    }

    pub fn nr_cols(&self) -> I {
        self.nr_cols
    }

    /// Number of matrix nonzeros (pattern descriptors count the elements
    /// they cover).
    pub fn nr_nonzeros(&self) -> usize {
        self.nr_nzeros
    }

    pub fn row_start(&self) -> I {
        self.row_start
    }

    pub fn order(&self) -> IterOrder {
        self.order
    }

    /// Number of stored elements (pattern descriptors count once).
    pub fn elems_size(&self) -> usize {
        self.elems.len()
    }

    /// Number of logical rows currently materialized in `rowptr`.
    pub fn logical_rows(&self) -> usize {
        self.rowptr.len() - 1
    }

    pub fn rowptr(&self) -> &[usize] {
        &self.rowptr
    }

    /// The elements of logical row `ridx`.
    pub fn row(&self, ridx: usize) -> &[Elem<I, V>] {
        assert!(ridx < self.logical_rows(), "row index out of bounds");
        &self.elems[self.rowptr[ridx]..self.rowptr[ridx + 1]]
    }

    pub(crate) fn set_row_start(&mut self, row_start: I) {
        self.row_start = row_start;
    }

    pub(crate) fn set_nr_nonzeros(&mut self, nnz: usize) {
        self.nr_nzeros = nnz;
    }

    pub(crate) fn set_nr_rows(&mut self, nr_rows: I) {
        self.nr_rows = nr_rows;
    }

    pub(crate) fn dims(&self) -> Dims<I> {
        Dims {
            nr_rows: self.nr_rows,
            nr_cols: self.nr_cols,
        }
    }

    /// Iterate all elements with their one-based logical row.
    pub fn points(&self) -> Points<'_, I, V> {
        Points {
            sp: self,
            row_idx: 0,
            elem_idx: 0,
        }
    }

    /// Consume a sorted row-element stream until it is exhausted or, if
    /// `limit > 0`, the element count reaches `limit` at a row boundary.
    /// The breaking element is left in the iterator. Returns the number of
    /// elements stored. The stream must be row-major with non-decreasing
    /// rows; violations are programmer errors and panic.
    pub fn set_elems_from<T, It>(
        &mut self,
        iter: &mut Peekable<It>,
        first_row: I,
        limit: usize,
        nr_elems_hint: usize,
        nr_rows_hint: usize,
    ) -> usize
    where
        T: RowElement<I, V>,
        It: Iterator<Item = T>,
    {
        let mut bld = Builder::new(nr_rows_hint, nr_elems_hint);
        let mut row_prev = first_row;
        while let Some(item) = iter.peek() {
            let row = item.row();
            if row != row_prev {
                assert!(
                    row > row_prev,
                    "unsorted element stream: row {row} after {row_prev}"
                );
                if limit > 0 && bld.elems_count() >= limit {
                    break;
                }
                bld.new_row(us(row - row_prev));
                row_prev = row;
            }
            let item = iter.next().unwrap();
            bld.push_elem(item.into_elem());
        }

        bld.install(self)
    }

    /// `set_elems_from` over a whole stream, without a limit.
    pub fn set_elems<T, It>(
        &mut self,
        iter: It,
        first_row: I,
        nr_elems_hint: usize,
        nr_rows_hint: usize,
    ) -> usize
    where
        T: RowElement<I, V>,
        It: IntoIterator<Item = T>,
    {
        let mut iter = iter.into_iter().peekable();
        self.set_elems_from(&mut iter, first_row, 0, nr_elems_hint, nr_rows_hint)
    }

    /// Row-pointer length of this partition under iteration order `t`;
    /// `transform` pads its rebuilt `rowptr` out to this length.
    pub fn find_new_rowptr_size(&self, t: IterOrder) -> usize {
        let nr_rows = us(self.nr_rows);
        let nr_cols = us(self.nr_cols);
        match t {
            IterOrder::Horizontal => nr_rows + 1,
            IterOrder::Vertical => nr_cols + 1,
            IterOrder::Diagonal | IterOrder::RevDiagonal => nr_rows + nr_cols + 1,
            t if t.is_row_block() => nr_rows / t.block_align() + 2,
            t if t.is_col_block() => nr_cols / t.block_align() + 2,
            _ => 0,
        }
    }

    /// Losslessly re-order the partition into iteration order `t`.
    ///
    /// Pattern-carrying elements move as a whole: only the head coordinate
    /// is remapped, the descriptor keeps its own coordinate system.
    pub fn transform(&mut self, t: IterOrder) {
        if self.order == t {
            return;
        }

        let from = self.order;
        let dims = self.dims();
        let old_rowptr = mem::replace(&mut self.rowptr, vec![0]);
        let old_elems = mem::take(&mut self.elems);

        let mut buf: Vec<RowElem<I, V>> = Vec::with_capacity(old_elems.len());
        let mut it = old_elems.into_iter();
        for ridx in 0..old_rowptr.len() - 1 {
            let row = ix::<I>(ridx + 1);
            for _ in old_rowptr[ridx]..old_rowptr[ridx + 1] {
                let e = it.next().unwrap();
                let (nrow, ncol) = convert(from, t, row, e.col, dims);
                buf.push(RowElem {
                    row: nrow,
                    elem: Elem {
                        col: ncol,
                        kind: e.kind,
                    },
                });
            }
        }

        // Transforms within one block family preserve the rough ordering,
        // so bounded sorts over groups of lcm-aligned logical rows suffice;
        // cross-family transforms sort globally.
        let same_family = (from.in_row_family() && t.in_row_family())
            || (from.in_col_family() && t.in_col_family());
        let cmp = |a: &RowElem<I, V>, b: &RowElem<I, V>| {
            (a.row, a.elem.col).cmp(&(b.row, b.elem.col))
        };
        if same_family {
            let old_align = from.block_align().max(1);
            let new_align = t.block_align().max(1);
            let k = lcm(old_align, new_align) / old_align;
            let re = old_rowptr.len() - 1;
            let mut es = 0;
            let mut i = k;
            while i < re {
                let ee = es + (old_rowptr[i] - old_rowptr[i - k]);
                buf[es..ee].sort_by(cmp);
                es = ee;
                i += k;
            }
            buf[es..].sort_by(cmp);
        } else {
            buf.sort_by(cmp);
        }

        let nr_elems = buf.len();
        let rowptr_size = self.find_new_rowptr_size(t);
        self.set_elems(buf, I::one(), nr_elems, rowptr_size);
        self.order = t;
        // set_elems stops at the last nonempty row; materialize the
        // trailing empty rows so rowptr always spans the full logical row
        // range of the new order.
        if rowptr_size > 0 {
            self.pad_rows(rowptr_size - 1);
        }
    }

    /// Extend `rowptr` with empty rows up to `nr_rows` logical rows.
    pub(crate) fn pad_rows(&mut self, nr_rows: usize) {
        let end = self.elems.len();
        while self.rowptr.len() < nr_rows + 1 {
            self.rowptr.push(end);
        }
    }

    /// A zero-copy read-only view of logical rows `[rs, rs + length)`.
    pub fn window(&self, rs: usize, length: usize) -> Window<'_, I, V> {
        let length = length.min(self.logical_rows() - rs);
        Window {
            sp: self,
            rs,
            length,
        }
    }

    /// Copy logical rows `[rs, rs + length)` out into an owned
    /// sub-partition. The window keeps this partition's order and column
    /// space; its `row_start` records where it came from.
    pub fn extract_window(&self, rs: usize, length: usize) -> SparsePartition<I, V> {
        let length = length.min(self.logical_rows() - rs);
        let es = self.rowptr[rs];
        let ee = self.rowptr[rs + length];

        let mut w = SparsePartition::new(ix(length), self.nr_cols);
        w.row_start = self.row_start + ix(rs);
        w.order = self.order;
        w.elems = self.elems[es..ee].to_vec();
        w.rowptr = self.rowptr[rs..=rs + length].iter().map(|p| p - es).collect();
        w.nr_nzeros = w.elems.iter().map(Elem::nr_values).sum();
        debug_assert_eq!(*w.rowptr.last().unwrap(), w.elems.len());
        w
    }

    /// Write a (possibly re-encoded) window back over the rows it was
    /// extracted from. The element count may have changed; the tail of the
    /// partition is shifted so the row-pointer prefix sums stay intact.
    pub fn put_window(&mut self, window: &SparsePartition<I, V>) {
        assert_eq!(
            self.order, window.order,
            "window order does not match the partition"
        );
        let rs = us(window.row_start - self.row_start);
        let length = window.logical_rows();
        assert!(rs + length <= self.logical_rows(), "window out of bounds");

        let es = self.rowptr[rs];
        let ee = self.rowptr[rs + length];
        let old_n = ee - es;
        let new_n = window.elems.len();

        self.elems.splice(es..ee, window.elems.iter().cloned());
        for (i, p) in window.rowptr.iter().enumerate() {
            self.rowptr[rs + i] = es + p;
        }
        if new_n > old_n {
            for p in &mut self.rowptr[rs + length + 1..] {
                *p += new_n - old_n;
            }
        } else if new_n < old_n {
            for p in &mut self.rowptr[rs + length + 1..] {
                *p -= old_n - new_n;
            }
        }
    }
}

/// Streaming builder for a partition's element and row-pointer arrays.
/// `install` consumes the builder and replaces the target's storage.
pub(crate) struct Builder<I, V> {
    elems: Vec<Elem<I, V>>,
    rowptr: Vec<usize>,
}

impl<I: CsxIndex, V: CsxValue> Builder<I, V> {
    pub fn new(nr_rows_hint: usize, nr_elems_hint: usize) -> Self {
        let mut rowptr = Vec::with_capacity(nr_rows_hint.max(1) + 1);
        rowptr.push(0);
        Builder {
            elems: Vec::with_capacity(nr_elems_hint),
            rowptr,
        }
    }

    pub fn elems_count(&self) -> usize {
        self.elems.len()
    }

    pub fn push_elem(&mut self, e: Elem<I, V>) {
        self.elems.push(e);
    }

    /// Open the next row, skipping `rdiff - 1` empty rows.
    pub fn new_row(&mut self, rdiff: usize) {
        let cnt = self.elems.len();
        for _ in 0..rdiff {
            self.rowptr.push(cnt);
        }
    }

    pub fn install(mut self, sp: &mut SparsePartition<I, V>) -> usize {
        if *self.rowptr.last().unwrap() != self.elems.len() {
            self.new_row(1);
        }
        let n = self.elems.len();
        sp.elems = self.elems;
        sp.rowptr = self.rowptr;
        n
    }
}

/// Forward iterator over `(one-based logical row, element)` pairs.
pub struct Points<'a, I, V> {
    sp: &'a SparsePartition<I, V>,
    row_idx: usize,
    elem_idx: usize,
}

impl<'a, I: CsxIndex, V: CsxValue> Iterator for Points<'a, I, V> {
    type Item = (I, &'a Elem<I, V>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.elem_idx >= self.sp.elems.len() {
            return None;
        }
        let rp = &self.sp.rowptr;
        while self.row_idx + 1 < rp.len() && rp[self.row_idx + 1] <= self.elem_idx {
            self.row_idx += 1;
        }
        let item = (ix::<I>(self.row_idx + 1), &self.sp.elems[self.elem_idx]);
        self.elem_idx += 1;
        Some(item)
    }
}

/// Borrowed view over a contiguous range of logical rows, used by the
/// sampling statistics pass.
pub struct Window<'a, I, V> {
    sp: &'a SparsePartition<I, V>,
    rs: usize,
    length: usize,
}

impl<'a, I: CsxIndex, V: CsxValue> Window<'a, I, V> {
    pub fn logical_rows(&self) -> usize {
        self.length
    }

    pub fn row(&self, ridx: usize) -> &'a [Elem<I, V>] {
        assert!(ridx < self.length, "window row out of bounds");
        self.sp.row(self.rs + ridx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elems::CooElem;

    type Part = SparsePartition<i64, f64>;

    fn coo(points: &[(i64, i64)]) -> Vec<CooElem<i64, f64>> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(r, c))| CooElem::new(r, c, i as f64 + 1.0))
            .collect()
    }

    fn build(nr_rows: i64, nr_cols: i64, points: &[(i64, i64)]) -> Part {
        let mut sp = Part::new(nr_rows, nr_cols);
        let n = sp.set_elems(coo(points), 1, points.len(), nr_rows as usize + 1);
        sp.set_nr_nonzeros(n);
        sp.pad_rows(nr_rows as usize);
        sp
    }

    fn scalar_triples(sp: &Part) -> Vec<(i64, i64, f64)> {
        sp.points()
            .map(|(r, e)| match e.kind {
                crate::elems::ElemKind::Scalar(v) => (r, e.col, v),
                _ => panic!("patterned element in a scalar-only test"),
            })
            .collect()
    }

    #[test]
    fn set_elems_builds_prefix_sums() {
        let sp = build(4, 4, &[(1, 1), (1, 3), (2, 2), (4, 1), (4, 4)]);
        assert_eq!(sp.rowptr(), &[0, 2, 3, 3, 5]);
        assert_eq!(sp.elems_size(), 5);
        assert_eq!(sp.row(2).len(), 0);
        assert_eq!(sp.row(3).len(), 2);
    }

    #[test]
    #[should_panic(expected = "unsorted element stream")]
    fn set_elems_rejects_unsorted_input() {
        build(3, 3, &[(2, 1), (1, 1)]);
    }

    #[test]
    fn set_elems_respects_the_limit_at_row_boundaries() {
        let mut sp = Part::new(4, 4);
        let mut iter = coo(&[(1, 1), (1, 2), (2, 1), (3, 3)]).into_iter().peekable();
        let n = sp.set_elems_from(&mut iter, 1, 2, 0, 0);
        assert_eq!(n, 2);
        // The breaking element is still available for the next partition.
        assert_eq!(iter.peek().map(|p| p.row), Some(2));
    }

    #[test]
    fn transform_round_trips_through_any_order_pair() {
        let points = [(1, 1), (1, 4), (2, 2), (3, 1), (3, 3), (4, 2), (4, 4)];
        let orig = build(4, 4, &points);
        for a in IterOrder::kinds() {
            for b in IterOrder::kinds() {
                let mut sp = orig.clone();
                sp.transform(a);
                sp.transform(b);
                sp.transform(IterOrder::Horizontal);
                let mut got = scalar_triples(&sp);
                let mut want = scalar_triples(&orig);
                got.sort_by(|x, y| x.partial_cmp(y).unwrap());
                want.sort_by(|x, y| x.partial_cmp(y).unwrap());
                assert_eq!(got, want, "round trip through {a} then {b}");
            }
        }
    }

    #[test]
    fn transform_keeps_rows_sorted_by_column() {
        let points = [(1, 1), (1, 2), (2, 1), (2, 2), (3, 3), (5, 1), (5, 5)];
        for t in IterOrder::kinds() {
            let mut sp = build(5, 5, &points);
            sp.transform(t);
            for i in 0..sp.logical_rows() {
                let row = sp.row(i);
                for pair in row.windows(2) {
                    assert!(pair[0].col < pair[1].col, "row {i} unsorted under {t}");
                }
            }
            assert_eq!(*sp.rowptr().last().unwrap(), sp.elems_size());
        }
    }

    #[test]
    fn transform_materializes_every_logical_row() {
        // A single nonzero that leaves the trailing rows of every order
        // untouched; rowptr must still span the full logical row range.
        for t in IterOrder::kinds() {
            let mut sp = build(4, 6, &[(1, 1)]);
            sp.transform(t);
            assert_eq!(
                sp.rowptr().len(),
                sp.find_new_rowptr_size(t),
                "short rowptr under {t}"
            );
            assert_eq!(*sp.rowptr().last().unwrap(), sp.elems_size());
            sp.transform(IterOrder::Horizontal);
            assert_eq!(sp.logical_rows(), 4);
        }
    }

    #[test]
    fn transform_back_restores_row_count() {
        let mut sp = build(6, 4, &[(1, 2), (3, 1), (6, 4)]);
        sp.transform(IterOrder::Diagonal);
        sp.transform(IterOrder::Horizontal);
        assert_eq!(sp.logical_rows(), 6);
    }

    #[test]
    fn empty_partition_survives_transforms() {
        let mut sp = Part::new(5, 5);
        sp.pad_rows(5);
        for t in IterOrder::kinds() {
            sp.transform(t);
            assert_eq!(sp.elems_size(), 0);
        }
        sp.transform(IterOrder::Horizontal);
        assert_eq!(sp.logical_rows(), 5);
    }

    #[test]
    fn extract_window_is_row_local() {
        let sp = build(5, 5, &[(1, 1), (2, 2), (3, 1), (3, 3), (4, 4)]);
        let w = sp.extract_window(1, 2);
        assert_eq!(w.logical_rows(), 2);
        assert_eq!(w.row_start(), 1);
        assert_eq!(w.elems_size(), 3);
        assert_eq!(w.rowptr(), &[0, 1, 3]);
    }

    #[test]
    fn put_window_only_touches_its_rows() {
        let mut sp = build(5, 5, &[(1, 1), (2, 2), (2, 3), (3, 1), (4, 4), (5, 5)]);
        let before = scalar_triples(&sp);
        let mut w = sp.extract_window(1, 2);
        // Re-encode the window rows into fewer elements.
        let repl = vec![CooElem::new(1i64, 4i64, 9.0)];
        w.set_elems(repl, 1, 1, 3);
        w.pad_rows(2);
        sp.put_window(&w);

        let after = scalar_triples(&sp);
        let outside = |t: &&(i64, i64, f64)| t.0 != 2 && t.0 != 3;
        assert_eq!(
            before.iter().filter(outside).collect::<Vec<_>>(),
            after.iter().filter(outside).collect::<Vec<_>>()
        );
        assert_eq!(*sp.rowptr().last().unwrap(), sp.elems_size());
        assert_eq!(sp.row(1), &[Elem::scalar(4, 9.0)]);
        assert!(sp.row(2).is_empty());
    }

    #[test]
    #[should_panic(expected = "window order does not match")]
    fn put_window_rejects_mismatched_orders() {
        let mut sp = build(4, 4, &[(1, 1), (2, 2), (3, 3)]);
        let mut w = sp.extract_window(0, 2);
        w.transform(IterOrder::Vertical);
        sp.put_window(&w);
    }

    #[test]
    fn single_row_partition_transforms_everywhere() {
        let points = [(1, 1), (1, 2), (1, 3), (1, 5)];
        for t in IterOrder::kinds() {
            let mut sp = build(1, 5, &points);
            sp.transform(t);
            sp.transform(IterOrder::Horizontal);
            assert_eq!(sp.elems_size(), 4);
            assert_eq!(sp.logical_rows(), 1);
        }
    }
}
