//! Pure coordinate remappings between iteration orders.
//!
//! Every order `t` has a forward map (HORIZONTAL -> `t`) and an inverse
//! (`t` -> HORIZONTAL); an arbitrary `from -> to` conversion composes the
//! two. All arithmetic is done one-based in the caller's index type.

use crate::elems::{ix, CsxIndex};
use crate::order::IterOrder;

/// Matrix dimensions, needed by the diagonal maps.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Dims<I> {
    pub nr_rows: I,
    pub nr_cols: I,
}

/// HORIZONTAL -> `order`.
pub(crate) fn map_to<I: CsxIndex>(order: IterOrder, row: I, col: I, dims: Dims<I>) -> (I, I) {
    let one = I::one();
    match order {
        IterOrder::None | IterOrder::Horizontal => (row, col),
        IterOrder::Vertical => (col, row),
        IterOrder::Diagonal => (dims.nr_rows + col - row, row.min(col)),
        IterOrder::RevDiagonal => {
            let r = row + col - one;
            let c = if r <= dims.nr_cols {
                row
            } else {
                dims.nr_cols + one - col
            };
            (r, c)
        }
        t if t.is_row_block() => block_row_map(t.block_align(), row, col),
        t => {
            // Column blocks transpose first, then behave like row blocks.
            debug_assert!(t.is_col_block());
            block_row_map(t.block_align(), col, row)
        }
    }
}

/// `order` -> HORIZONTAL.
pub(crate) fn map_from<I: CsxIndex>(order: IterOrder, row: I, col: I, dims: Dims<I>) -> (I, I) {
    let one = I::one();
    match order {
        IterOrder::None | IterOrder::Horizontal => (row, col),
        IterOrder::Vertical => (col, row),
        IterOrder::Diagonal => {
            if row < dims.nr_rows {
                (dims.nr_rows + col - row, col)
            } else {
                (col, row + col - dims.nr_rows)
            }
        }
        IterOrder::RevDiagonal => {
            let c = if row <= dims.nr_cols {
                row + one - col
            } else {
                dims.nr_cols + one - col
            };
            (row - c + one, c)
        }
        t if t.is_row_block() => block_row_rmap(t.block_align(), row, col),
        t => {
            debug_assert!(t.is_col_block());
            let (r, c) = block_row_rmap(t.block_align(), row, col);
            (c, r)
        }
    }
}

/// `from` -> `to`, dropping identity legs of the composition.
pub(crate) fn convert<I: CsxIndex>(
    from: IterOrder,
    to: IterOrder,
    row: I,
    col: I,
    dims: Dims<I>,
) -> (I, I) {
    let (r, c) = map_from(from, row, col, dims);
    map_to(to, r, c, dims)
}

fn block_row_map<I: CsxIndex>(align: usize, row: I, col: I) -> (I, I) {
    let one = I::one();
    let k = ix::<I>(align);
    let r = (row - one) / k + one;
    let c = (row - one) % k + k * (col - one) + one;
    (r, c)
}

fn block_row_rmap<I: CsxIndex>(align: usize, row: I, col: I) -> (I, I) {
    let one = I::one();
    let k = ix::<I>(align);
    let r = k * (row - one) + (col - one) % k + one;
    let c = (col - one) / k + one;
    (r, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: Dims<i64> = Dims {
        nr_rows: 7,
        nr_cols: 9,
    };

    fn coords() -> impl Iterator<Item = (i64, i64)> {
        (1..=DIMS.nr_rows).flat_map(|r| (1..=DIMS.nr_cols).map(move |c| (r, c)))
    }

    #[test]
    fn every_map_inverts() {
        for order in IterOrder::kinds() {
            for (r, c) in coords() {
                let (tr, tc) = map_to(order, r, c, DIMS);
                assert_eq!(
                    map_from(order, tr, tc, DIMS),
                    (r, c),
                    "{order} does not invert at ({r}, {c})"
                );
            }
        }
    }

    #[test]
    fn conversion_composes_through_horizontal() {
        for from in IterOrder::kinds() {
            for to in IterOrder::kinds() {
                for (r, c) in coords() {
                    let (fr, fc) = map_to(from, r, c, DIMS);
                    let (tr, tc) = convert(from, to, fr, fc, DIMS);
                    assert_eq!((tr, tc), map_to(to, r, c, DIMS));
                }
            }
        }
    }

    #[test]
    fn diagonal_addresses_antidiagonals_of_the_transpose() {
        // Points of the main diagonal collapse into one logical row.
        let rows: Vec<i64> = (1..=5)
            .map(|i| map_to(IterOrder::Diagonal, i, i, DIMS).0)
            .collect();
        assert!(rows.iter().all(|&r| r == DIMS.nr_rows));
    }

    #[test]
    fn rev_diagonal_addresses_antidiagonals() {
        let (r1, _) = map_to(IterOrder::RevDiagonal, 2, 4, DIMS);
        let (r2, _) = map_to(IterOrder::RevDiagonal, 3, 3, DIMS);
        let (r3, _) = map_to(IterOrder::RevDiagonal, 4, 2, DIMS);
        assert_eq!(r1, r2);
        assert_eq!(r2, r3);
    }

    #[test]
    fn block_row_walks_blocks_column_major() {
        // A 2x2 block at the origin flattens to one logical row.
        let pts = [(1, 1), (2, 1), (1, 2), (2, 2)];
        let mapped: Vec<(i64, i64)> = pts
            .iter()
            .map(|&(r, c)| map_to(IterOrder::BlockRow2, r, c, DIMS))
            .collect();
        assert_eq!(mapped, vec![(1, 1), (1, 2), (1, 3), (1, 4)]);
    }

    #[test]
    fn block_col_is_block_row_of_the_transpose() {
        for (r, c) in coords() {
            let direct = map_to(IterOrder::BlockCol3, r, c, DIMS);
            let via_transpose = map_to(IterOrder::BlockRow3, c, r, DIMS);
            assert_eq!(direct, via_transpose);
        }
    }
}
