//! CSR boundary adapter: turns caller-provided CSR arrays (zero- or
//! one-based) into the sorted one-based coordinate stream the partitioner
//! consumes.

use crate::elems::{ix, us, CooElem, CsxIndex, CsxValue};
use crate::error::InputError;

/// Validate CSR arrays and return an iterator over their coordinates,
/// converted to one-based indexing.
pub fn csr_points<'a, I, V>(
    rowptr: &'a [I],
    colind: &'a [I],
    values: &'a [V],
    nr_cols: I,
    zero_based: bool,
) -> Result<impl Iterator<Item = CooElem<I, V>> + 'a, InputError>
where
    I: CsxIndex,
    V: CsxValue,
{
    let base = if zero_based { 0 } else { 1 };
    if rowptr.is_empty() {
        return Err(InputError::RowPtrLength {
            expected: 1,
            found: 0,
        });
    }
    if us(rowptr[0]) != base {
        return Err(InputError::BadIndexBase {
            expected: base,
            found: us(rowptr[0]),
        });
    }
    if colind.len() != values.len() {
        return Err(InputError::NonzeroCountMismatch {
            expected: colind.len(),
            found: values.len(),
        });
    }
    let last = us(rowptr[rowptr.len() - 1]) - base;
    if last != colind.len() {
        return Err(InputError::NonzeroCountMismatch {
            expected: colind.len(),
            found: last,
        });
    }
    for (r, w) in rowptr.windows(2).enumerate() {
        let (start, end) = (us(w[0]) - base, us(w[1]) - base);
        if start > end {
            return Err(InputError::RowPtrNotMonotone { row: r + 1 });
        }
        for &c in &colind[start..end] {
            let c1 = us(c) + 1 - base;
            if c1 < 1 || c1 > us(nr_cols) {
                return Err(InputError::ColumnOutOfBounds { row: r + 1, col: c1 });
            }
        }
    }

    let one_base = ix::<I>(1 - base);
    Ok((0..rowptr.len() - 1).flat_map(move |r| {
        let start = us(rowptr[r]) - base;
        let end = us(rowptr[r + 1]) - base;
        (start..end).map(move |i| CooElem::new(ix(r + 1), colind[i] + one_base, values[i]))
    }))
}
