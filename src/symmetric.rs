//! Symmetric partitions: the lower triangle stored once, the diagonal as a
//! dense vector, and the remote/local column split used by symmetric SpMV.

use std::iter::Peekable;

use crate::elems::{ix, us, CooElem, CsxIndex, CsxValue, Elem};
use crate::partition::{Builder, SparsePartition};

/// Lifecycle of a symmetric partition. Encoding is only legal on the split
/// halves; merging exists to check the split round-trips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymState {
    Loaded,
    Split,
    SplitEncoded,
    Merged,
}

/// One worker's share of a symmetric matrix.
///
/// `m1` holds the lower-triangle elements whose column lies strictly
/// before the partition's first row (they contribute to another worker's
/// output during symmetric SpMV); `m2` holds the rest.
#[derive(Clone, Debug)]
pub struct SparsePartitionSym<I, V> {
    lower: SparsePartition<I, V>,
    diagonal: Vec<V>,
    m1: Option<SparsePartition<I, V>>,
    m2: Option<SparsePartition<I, V>>,
    state: SymState,
}

impl<I: CsxIndex, V: CsxValue> SparsePartitionSym<I, V> {
    pub fn new(nr_rows: I, nr_cols: I) -> Self {
        SparsePartitionSym {
            lower: SparsePartition::new(nr_rows, nr_cols),
            diagonal: Vec::new(),
            m1: None,
            m2: None,
            state: SymState::Loaded,
        }
    }

    pub fn lower(&self) -> &SparsePartition<I, V> {
        &self.lower
    }

    pub fn diagonal(&self) -> &[V] {
        &self.diagonal
    }

    pub fn state(&self) -> SymState {
        self.state
    }

    pub fn m1(&self) -> Option<&SparsePartition<I, V>> {
        self.m1.as_ref()
    }

    pub fn m2(&self) -> Option<&SparsePartition<I, V>> {
        self.m2.as_ref()
    }

    pub(crate) fn halves_mut(
        &mut self,
    ) -> (&mut SparsePartition<I, V>, &mut SparsePartition<I, V>) {
        assert_eq!(self.state, SymState::Split, "partition is not split");
        (self.m1.as_mut().unwrap(), self.m2.as_mut().unwrap())
    }

    pub(crate) fn mark_encoded(&mut self) {
        assert_eq!(self.state, SymState::Split);
        self.state = SymState::SplitEncoded;
    }

    /// Total elements accounted to this partition: lower triangle plus
    /// diagonal.
    pub fn elems_count(&self) -> usize {
        self.lower.elems_size() + self.diagonal.len()
    }

    /// Consume a sorted coordinate stream, routing strictly-lower elements
    /// into the lower triangle, diagonal elements into the diagonal vector
    /// and dropping the upper triangle. Stops at a row boundary once
    /// `limit > 0` elements have been taken. Returns the number of
    /// elements consumed into this partition.
    pub fn set_elems_from<It>(
        &mut self,
        iter: &mut Peekable<It>,
        first_row: I,
        limit: usize,
        nr_elems_hint: usize,
        nr_rows_hint: usize,
    ) -> usize
    where
        It: Iterator<Item = CooElem<I, V>>,
    {
        let mut bld = Builder::new(nr_rows_hint, nr_elems_hint);
        let mut row_prev = first_row;
        let one = I::one();
        while let Some(p) = iter.peek() {
            let (row, col) = (p.row, p.col);
            if row > col {
                if row != row_prev {
                    assert!(
                        row > row_prev,
                        "unsorted element stream: row {row} after {row_prev}"
                    );
                    if limit > 0
                        && bld.elems_count() + self.diagonal.len() >= limit
                        && row_prev == row - one
                    {
                        break;
                    }
                    bld.new_row(us(row - row_prev));
                    row_prev = row;
                }
                let p = iter.next().unwrap();
                bld.push_elem(Elem::scalar(p.col, p.val));
            } else if row == col {
                let p = iter.next().unwrap();
                self.diagonal.push(p.val);
            } else {
                // Upper triangle is implicit in a symmetric matrix.
                iter.next();
            }
        }

        let nnz = bld.install(&mut self.lower);
        self.lower.set_nr_nonzeros(nnz);
        nnz + self.diagonal.len()
    }

    /// Finish loading: fix the row span to the diagonal length and record
    /// where this partition starts in the original matrix.
    pub(crate) fn finish_load(&mut self, row_start: I) {
        let nr_rows = self.diagonal.len().max(self.lower.logical_rows());
        self.lower.set_nr_rows(ix(nr_rows));
        self.lower.set_row_start(row_start);
        self.lower.pad_rows(nr_rows);
    }

    /// Widen the row span (used by the partitioner when the matrix ends in
    /// rows this partition never saw).
    pub(crate) fn finish_rows(&mut self, nr_rows: usize) {
        self.lower.set_nr_rows(ix(nr_rows));
        self.lower.pad_rows(nr_rows);
    }

    /// Split the lower triangle into `m1` (columns strictly before the
    /// partition's first row) and `m2` (the rest). The diagonal is
    /// untouched.
    pub fn divide_matrix(&mut self) {
        assert_eq!(self.state, SymState::Loaded, "partition already split");

        let row_start = us(self.lower.row_start());
        let nr_rows = self.lower.logical_rows();
        let nr_elems = self.lower.elems_size();
        let mut bld1: Builder<I, V> = Builder::new(nr_rows + 1, nr_elems);
        let mut bld2: Builder<I, V> = Builder::new(nr_rows + 1, nr_elems);
        let mut rows1 = 0;
        let mut rows2 = 0;
        let mut nnz1 = 0;
        let mut nnz2 = 0;

        for i in 0..nr_rows {
            for e in self.lower.row(i) {
                if us(e.col) < row_start + 1 {
                    if rows1 < i {
                        bld1.new_row(i - rows1);
                        rows1 = i;
                    }
                    nnz1 += 1;
                    bld1.push_elem(e.clone());
                } else {
                    if rows2 < i {
                        bld2.new_row(i - rows2);
                        rows2 = i;
                    }
                    nnz2 += 1;
                    bld2.push_elem(e.clone());
                }
            }
        }

        let mut m1 = SparsePartition::new(self.lower.nr_rows(), self.lower.nr_cols());
        let mut m2 = SparsePartition::new(self.lower.nr_rows(), self.lower.nr_cols());
        bld1.install(&mut m1);
        bld2.install(&mut m2);
        for (m, nnz) in [(&mut m1, nnz1), (&mut m2, nnz2)] {
            m.set_row_start(self.lower.row_start());
            m.set_nr_nonzeros(nnz);
            m.pad_rows(nr_rows);
        }
        self.m1 = Some(m1);
        self.m2 = Some(m2);
        self.state = SymState::Split;
    }

    /// Inverse of `divide_matrix`: concatenate `m1` and `m2` row by row
    /// back into the lower triangle. Testing aid.
    pub fn merge_matrix(&mut self) {
        assert!(
            matches!(self.state, SymState::Split | SymState::SplitEncoded),
            "partition is not split"
        );
        let m1 = self.m1.take().unwrap();
        let m2 = self.m2.take().unwrap();
        let nr_rows = self.lower.logical_rows();
        let mut bld: Builder<I, V> = Builder::new(nr_rows + 1, self.lower.elems_size());

        for i in 0..nr_rows {
            if m1.logical_rows() > i {
                for e in m1.row(i) {
                    bld.push_elem(e.clone());
                }
            }
            if m2.logical_rows() > i {
                for e in m2.row(i) {
                    bld.push_elem(e.clone());
                }
            }
            bld.new_row(1);
        }

        let nnz = bld.install(&mut self.lower);
        self.lower.set_nr_nonzeros(nnz);
        self.lower.pad_rows(nr_rows);
        self.state = SymState::Merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type SymPart = SparsePartitionSym<i64, f64>;

    fn coo(points: &[(i64, i64, f64)]) -> Vec<CooElem<i64, f64>> {
        points
            .iter()
            .map(|&(r, c, v)| CooElem::new(r, c, v))
            .collect()
    }

    fn scalar_triples(sp: &SparsePartition<i64, f64>) -> Vec<(i64, i64, f64)> {
        sp.points()
            .map(|(r, e)| match e.kind {
                crate::elems::ElemKind::Scalar(v) => (r, e.col, v),
                _ => panic!("unexpected pattern"),
            })
            .collect()
    }

    #[test]
    fn set_elems_routes_lower_and_diagonal() {
        // The symmetric 4x4 of the end-to-end scenarios.
        let pts = [
            (1, 1, 11.0),
            (2, 1, 21.0),
            (2, 2, 22.0),
            (3, 1, 31.0),
            (3, 2, 32.0),
            (3, 3, 33.0),
            (4, 4, 44.0),
        ];
        let mut sym = SymPart::new(4, 4);
        let mut iter = coo(&pts).into_iter().peekable();
        let n = sym.set_elems_from(&mut iter, 1, 0, pts.len(), 5);
        sym.finish_load(0);
        assert_eq!(n, 7);
        assert_eq!(sym.diagonal(), &[11.0, 22.0, 33.0, 44.0]);
        assert_eq!(
            scalar_triples(sym.lower()),
            vec![(2, 1, 21.0), (3, 1, 31.0), (3, 2, 32.0)]
        );
    }

    #[test]
    fn upper_triangle_is_dropped() {
        let pts = [(1, 1, 1.0), (1, 2, 9.0), (2, 1, 9.0), (2, 2, 2.0)];
        let mut sym = SymPart::new(2, 2);
        let mut iter = coo(&pts).into_iter().peekable();
        let n = sym.set_elems_from(&mut iter, 1, 0, 4, 3);
        sym.finish_load(0);
        assert_eq!(n, 3);
        assert_eq!(sym.lower().elems_size(), 1);
    }

    #[test]
    fn divide_routes_remote_columns_to_m1() {
        // Partition covering rows 3..=4 of a 4x4, row_start = 2: columns
        // 1 and 2 lie before the partition's first row and are remote.
        let pts = [(3, 1, 31.0), (3, 2, 32.0), (3, 3, 33.0), (4, 3, 43.0), (4, 4, 44.0)];
        let mut sym = SymPart::new(2, 4);
        let mut iter = coo(&pts).into_iter().peekable();
        sym.set_elems_from(&mut iter, 3, 0, 5, 3);
        sym.finish_load(2);

        sym.divide_matrix();
        assert_eq!(sym.state(), SymState::Split);
        assert_eq!(
            scalar_triples(sym.m1().unwrap()),
            vec![(1, 1, 31.0), (1, 2, 32.0)]
        );
        assert_eq!(scalar_triples(sym.m2().unwrap()), vec![(2, 3, 43.0)]);
    }

    #[test]
    fn divide_then_merge_restores_the_lower_triangle() {
        // Partition covering rows 3..=7 of a 7x7, row_start = 2.
        let pts = [
            (3, 1, 31.0),
            (4, 2, 42.0),
            (4, 3, 43.0),
            (5, 2, 52.0),
            (6, 1, 61.0),
            (6, 5, 65.0),
            (7, 4, 74.0),
        ];
        let mut sym = SymPart::new(5, 7);
        let mut iter = coo(&pts).into_iter().peekable();
        sym.set_elems_from(&mut iter, 3, 0, pts.len(), 6);
        sym.finish_load(2);
        let before = scalar_triples(sym.lower());

        sym.divide_matrix();
        sym.merge_matrix();
        assert_eq!(sym.state(), SymState::Merged);
        assert_eq!(scalar_triples(sym.lower()), before);
    }

    #[test]
    #[should_panic(expected = "already split")]
    fn divide_twice_is_rejected() {
        let mut sym = SymPart::new(2, 2);
        let mut iter = coo(&[(2, 1, 1.0)]).into_iter().peekable();
        sym.set_elems_from(&mut iter, 1, 0, 1, 2);
        sym.finish_load(0);
        sym.divide_matrix();
        sym.divide_matrix();
    }
}
